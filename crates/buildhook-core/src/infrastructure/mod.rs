pub mod config;
pub mod http_client;

pub use config::{
    ConfigLoadError,
    ConfigLoader,
    S3Settings,
    WebhooksConfig,
};
pub use http_client::create_http_client;
