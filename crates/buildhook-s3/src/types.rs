//! Response bodies of the S3 REST API and the credential endpoints

use chrono::{
    DateTime,
    Utc,
};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct ListBucketResult {
    #[serde(default)]
    pub contents: Vec<ObjectEntry>,
    #[serde(default)]
    pub is_truncated: bool,
    #[serde(default)]
    pub next_continuation_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct ObjectEntry {
    pub key: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct LocationConstraint {
    #[serde(rename = "$text", default)]
    pub region: String,
}

/// JSON returned by the container and instance credential endpoints
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct MetadataCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub expiration: Option<DateTime<Utc>>,
}
