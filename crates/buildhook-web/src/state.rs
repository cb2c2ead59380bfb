use std::sync::Arc;

use buildhook_core::WebhooksListener;

#[derive(Clone)]
pub struct AppState {
    pub listener: Arc<WebhooksListener>,
    pub object_storage_enabled: bool,
}

impl AppState {
    pub fn new(listener: WebhooksListener, object_storage_enabled: bool) -> Self {
        Self {
            listener: Arc::new(listener),
            object_storage_enabled,
        }
    }
}
