pub mod artifacts;
pub mod dispatcher;
pub mod infrastructure;
pub mod listener;
pub mod logging;
pub mod payload;
pub mod scm;
pub mod status;

#[cfg(test)]
mod test_support;

pub use artifacts::{
    ArtifactResolver,
    ArtifactStorage,
};
pub use dispatcher::{
    DeliveryOutcome,
    DeliveryStatus,
    Dispatcher,
    POST_TIMEOUT,
};
pub use listener::{
    EventReport,
    WebhooksListener,
};
pub use payload::{
    serialize_payload,
    PayloadBuilder,
};
pub use scm::resolve_scm;
pub use status::classify_status;
