pub mod error;
pub mod host;
pub mod types;

pub use error::{
    WebhookError,
    WebhookResult,
};
pub use host::{
    ArtifactsGuard,
    BuildListener,
    ObjectStorage,
    WebhookSettings,
};
pub use types::{
    payload_date,
    ArtifactMap,
    ArtifactSource,
    BuildEvent,
    BuildEventKind,
    BuildRevision,
    BuildStatus,
    PayloadBuild,
    ScmInfo,
    VcsRoot,
    WebhookPayload,
};
