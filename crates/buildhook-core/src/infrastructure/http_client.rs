use std::time::Duration;

use buildhook_api::{
    WebhookError,
    WebhookResult,
};
use reqwest::Client;

const DEFAULT_POOL_SIZE: usize = 4;

/// Builds an HTTP client whose connect phase and whole exchange are both
/// bounded by `timeout`. Redirects are returned to the caller, never followed.
pub fn create_http_client(timeout: Duration) -> WebhookResult<Client> {
    let pool_size = std::env::var("BUILDHOOK_HTTP_POOL_SIZE")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(DEFAULT_POOL_SIZE);

    Client::builder()
        .use_rustls_tls()
        .redirect(reqwest::redirect::Policy::none())
        .pool_max_idle_per_host(pool_size)
        .pool_idle_timeout(Duration::from_secs(90))
        .tcp_keepalive(Duration::from_secs(60))
        .timeout(timeout)
        .connect_timeout(timeout)
        .build()
        .map_err(|e| WebhookError::Internal(format!("Failed to create HTTP client: {}", e)))
}
