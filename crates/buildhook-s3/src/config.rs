use std::time::Duration;

use chrono::{
    DateTime,
    Utc,
};

pub(crate) const GLOBAL_ENDPOINT: &str = "https://s3.amazonaws.com";

pub(crate) const DEFAULT_REGION: &str = "us-east-1";

pub(crate) const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub access_key: String,
    pub secret_key: String,
    pub session_token: Option<String>,
    /// Set for temporary credentials handed out by a metadata endpoint
    pub expires_at: Option<DateTime<Utc>>,
}

impl Credentials {
    pub fn new(access_key: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            access_key: access_key.into(),
            secret_key: secret_key.into(),
            session_token: None,
            expires_at: None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct S3Config {
    /// Keys from the settings file; they bypass every other source
    pub credentials: Option<Credentials>,
    /// Look up environment, profile, container and instance credentials
    /// when no explicit keys are given
    pub default_chain: bool,
    /// Replaces the AWS endpoints, e.g. for a local S3-compatible server
    pub endpoint: Option<String>,
}

/// Maps a bucket location constraint onto a region name.
///
/// An empty constraint is the classic US region and `EU` is the legacy alias
/// of Ireland.
pub fn normalize_region(constraint: &str) -> String {
    match constraint.trim() {
        "" | "US" => DEFAULT_REGION.to_string(),
        "EU" => "eu-west-1".to_string(),
        other => other.to_string(),
    }
}
