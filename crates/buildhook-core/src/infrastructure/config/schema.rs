use std::path::PathBuf;

use buildhook_api::WebhookSettings;
use indexmap::IndexMap;
use serde::{
    Deserialize,
    Serialize,
};

pub(super) const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8111";

pub(super) const DEFAULT_ROOT_URL: &str = "http://localhost:8111";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct WebhooksConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub artifacts: ArtifactsConfig,

    /// Destination URLs keyed by project external id
    #[serde(default)]
    pub projects: IndexMap<String, ProjectHooks>,
}

impl WebhooksConfig {
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .map(|p| p.join("buildhook"))
            .unwrap_or_else(|| PathBuf::from(".buildhook"))
    }

    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.server.root_url.trim().is_empty() {
            errors.push("server.root_url must not be empty".to_string());
        }

        for (project, hooks) in &self.projects {
            for url in &hooks.urls {
                if !(url.starts_with("http://") || url.starts_with("https://")) {
                    errors.push(format!(
                        "projects.{}: '{}' is not an http(s) URL",
                        project, url
                    ));
                }
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

impl WebhookSettings for WebhooksConfig {
    fn urls(&self, project_id: &str) -> Vec<String> {
        self.projects
            .get(project_id)
            .map(|hooks| hooks.urls.clone())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Public root URL of the build server, used in every generated link
    #[serde(default = "default_root_url")]
    pub root_url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            root_url: default_root_url(),
        }
    }
}

fn default_bind_addr() -> String {
    DEFAULT_BIND_ADDR.to_string()
}

fn default_root_url() -> String {
    DEFAULT_ROOT_URL.to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ArtifactsConfig {
    /// JSON file with `artifactBucket`, `awsAccessKey` and `awsSecretKey`
    #[serde(default)]
    pub s3_settings_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProjectHooks {
    #[serde(default)]
    pub urls: Vec<String>,
}
