mod interpolation;
mod loader;
mod s3_settings;
mod schema;

pub use interpolation::{
    interpolate,
    InterpolationError,
};
pub use loader::{
    ConfigLoadError,
    ConfigLoadResult,
    ConfigLoader,
};
pub use s3_settings::S3Settings;
pub use schema::{
    ArtifactsConfig,
    ProjectHooks,
    ServerConfig,
    WebhooksConfig,
};
