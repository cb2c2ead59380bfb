mod guard;
mod routes;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::Router;
use buildhook_core::infrastructure::{
    ConfigLoader,
    S3Settings,
    WebhooksConfig,
};
use buildhook_core::{
    ArtifactResolver,
    ArtifactStorage,
    Dispatcher,
    PayloadBuilder,
    WebhooksListener,
};
use buildhook_s3::{
    Credentials,
    S3Config,
    S3ObjectStorage,
};
use tower_http::trace::TraceLayer;

use crate::guard::LocalArtifactsGuard;
use crate::state::AppState;

fn bind_addr(config: &WebhooksConfig) -> anyhow::Result<SocketAddr> {
    let addr = std::env::var("BUILDHOOK_BIND_ADDR")
        .unwrap_or_else(|_| config.server.bind_addr.clone());
    addr.parse()
        .with_context(|| format!("Invalid bind address: {}", addr))
}

fn artifact_storage(config: &WebhooksConfig) -> anyhow::Result<Option<ArtifactStorage>> {
    let Some(path) = config.artifacts.s3_settings_file.as_deref() else {
        tracing::info!("No S3 settings file configured, listing archived artifacts only");
        return Ok(None);
    };

    let settings = S3Settings::load(path).context("Failed to load S3 settings")?;
    let Some(bucket) = settings.bucket() else {
        tracing::info!("No artifact bucket configured, listing archived artifacts only");
        return Ok(None);
    };

    let storage = S3ObjectStorage::new(S3Config {
        credentials: settings
            .credentials()
            .map(|(access_key, secret_key)| Credentials::new(access_key, secret_key)),
        default_chain: true,
        endpoint: std::env::var("BUILDHOOK_S3_ENDPOINT").ok(),
    })
    .context("Failed to create S3 client")?;

    tracing::info!(bucket, "Listing uploaded artifacts from S3");
    Ok(Some(ArtifactStorage::new(bucket, Arc::new(storage))))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    buildhook_core::logging::init();

    let config_path = ConfigLoader::discover_config_path();
    tracing::info!("Loading config from {}", config_path.display());
    let config = ConfigLoader::load_or_default(&config_path).context("Failed to load config")?;

    let bind_addr = bind_addr(&config)?;
    let storage = artifact_storage(&config)?;
    let object_storage_enabled = storage.is_some();

    let guard = Arc::new(LocalArtifactsGuard::new());
    let resolver =
        ArtifactResolver::new(config.server.root_url.clone(), guard).with_storage(storage);
    let dispatcher = Dispatcher::new().context("Failed to create HTTP client")?;

    tracing::info!(
        root_url = %config.server.root_url,
        projects = config.projects.len(),
        "Starting Buildhook"
    );

    let listener =
        WebhooksListener::new(Arc::new(config), PayloadBuilder::new(resolver), dispatcher);
    let app_state = AppState::new(listener, object_storage_enabled);

    let app = Router::new()
        .nest("/api/v1", routes::api_router())
        .layer(TraceLayer::new_for_http())
        .with_state(app_state);

    tracing::info!("Listening on {}", bind_addr);
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
