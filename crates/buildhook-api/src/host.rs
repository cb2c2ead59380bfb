use std::path::Path;

use async_trait::async_trait;

use crate::error::WebhookResult;
use crate::types::BuildEvent;

/// Coordinates readers of a build's artifact directory with the host's writers.
///
/// Every `lock_reading` is paired with exactly one `unlock_reading` for the
/// same directory.
pub trait ArtifactsGuard: Send + Sync {
    fn lock_reading(&self, dir: &Path);

    fn unlock_reading(&self, dir: &Path);
}

/// Destination URLs configured for a project
pub trait WebhookSettings: Send + Sync {
    /// Webhook URLs for the project with the given external id, in delivery order
    fn urls(&self, project_id: &str) -> Vec<String>;
}

/// Read access to an object-storage bucket holding uploaded build artifacts
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    async fn bucket_exists(&self, bucket: &str) -> WebhookResult<bool>;

    /// Region the bucket lives in, e.g. `eu-west-1`
    async fn bucket_region(&self, bucket: &str) -> WebhookResult<String>;

    /// Keys of all objects under `prefix`
    async fn list_objects(&self, bucket: &str, prefix: &str) -> WebhookResult<Vec<String>>;
}

/// Receives build lifecycle events from the host, one method per event kind.
///
/// Implementations never fail: whatever goes wrong is logged and dropped so
/// that build processing is never affected. A dropped event yields `None`.
#[async_trait]
pub trait BuildListener: Send + Sync {
    /// What the listener reports back about one handled event
    type Report: Send;

    async fn build_queued(&self, event: &BuildEvent) -> Option<Self::Report>;

    async fn changes_loaded(&self, event: &BuildEvent) -> Option<Self::Report>;

    async fn build_finished(&self, event: &BuildEvent) -> Option<Self::Report>;

    async fn build_interrupted(&self, event: &BuildEvent) -> Option<Self::Report>;
}
