use std::path::{
    Path,
    PathBuf,
};

use thiserror::Error;

use super::interpolation::{
    interpolate_toml,
    InterpolationError,
};
use super::schema::WebhooksConfig;

#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("Config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Environment variable interpolation failed: {0}")]
    InterpolationError(#[from] InterpolationError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type ConfigLoadResult<T> = Result<T, ConfigLoadError>;

const SERVER_CONFIG_PATH: &str = "/etc/buildhook/config.toml";

pub struct ConfigLoader;

impl ConfigLoader {
    pub fn discover_config_path() -> PathBuf {
        if let Ok(path) = std::env::var("BUILDHOOK_CONFIG_PATH") {
            tracing::debug!("Using config path from BUILDHOOK_CONFIG_PATH: {}", path);
            return PathBuf::from(path);
        }

        let path = PathBuf::from(SERVER_CONFIG_PATH);
        if path.exists() {
            tracing::debug!("Using server config path: {}", path.display());
            return path;
        }

        let fallback = WebhooksConfig::default_config_dir().join("config.toml");
        tracing::debug!("Using fallback config path: {}", fallback.display());
        fallback
    }

    pub fn load(path: &Path) -> ConfigLoadResult<WebhooksConfig> {
        if !path.exists() {
            return Err(ConfigLoadError::FileNotFound(path.to_path_buf()));
        }

        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Loads the config, falling back to defaults (no destinations) when the
    /// file does not exist.
    pub fn load_or_default(path: &Path) -> ConfigLoadResult<WebhooksConfig> {
        match Self::load(path) {
            Err(ConfigLoadError::FileNotFound(_)) => {
                tracing::warn!(
                    "No config at {}, starting without webhook destinations",
                    path.display()
                );
                Ok(WebhooksConfig::default())
            }
            other => other,
        }
    }

    pub fn parse(content: &str) -> ConfigLoadResult<WebhooksConfig> {
        let mut value: toml::Value = toml::from_str(content)?;

        interpolate_toml(&mut value)?;

        let config: WebhooksConfig = value.try_into().map_err(|e| {
            ConfigLoadError::InvalidConfig(format!("Failed to deserialize config: {}", e))
        })?;

        config
            .validate()
            .map_err(|errors| ConfigLoadError::InvalidConfig(errors.join(", ")))?;

        tracing::debug!(projects = config.projects.len(), "Loaded config");

        Ok(config)
    }
}
