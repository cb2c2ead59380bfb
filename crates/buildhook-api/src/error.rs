use thiserror::Error;

/// Errors raised while turning a build event into a delivered webhook
#[derive(Error, Debug)]
pub enum WebhookError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Object storage error: {0}")]
    ObjectStorage(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type WebhookResult<T> = Result<T, WebhookError>;

impl From<serde_json::Error> for WebhookError {
    fn from(err: serde_json::Error) -> Self {
        WebhookError::SerializationError(err.to_string())
    }
}
