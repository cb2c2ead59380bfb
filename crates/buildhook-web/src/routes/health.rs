use axum::{
    extract::State,
    Json,
};
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub object_storage: bool,
}

pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        object_storage: state.object_storage_enabled,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use buildhook_core::infrastructure::WebhooksConfig;
    use buildhook_core::{
        ArtifactResolver,
        Dispatcher,
        PayloadBuilder,
        WebhooksListener,
    };

    use super::*;
    use crate::guard::LocalArtifactsGuard;

    #[tokio::test]
    async fn test_health_check() {
        let resolver =
            ArtifactResolver::new("http://ci.local", Arc::new(LocalArtifactsGuard::new()));
        let listener = WebhooksListener::new(
            Arc::new(WebhooksConfig::default()),
            PayloadBuilder::new(resolver),
            Dispatcher::new().unwrap(),
        );

        let Json(health) = health_check(State(AppState::new(listener, true))).await;

        assert_eq!(health.status, "ok");
        assert_eq!(health.version, env!("CARGO_PKG_VERSION"));
        assert!(health.object_storage);
    }
}
