use std::collections::{
    BTreeMap,
    HashMap,
};
use std::fmt;
use std::path::PathBuf;

use chrono::{
    DateTime,
    Utc,
};
use serde::{
    Deserialize,
    Deserializer,
    Serialize,
    Serializer,
};

/// Lifecycle transition reported by the build server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildEventKind {
    Queued,
    /// Changes were loaded and the build is about to run
    Started,
    Finished,
    Interrupted,
}

impl BuildEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Started => "started",
            Self::Finished => "finished",
            Self::Interrupted => "interrupted",
        }
    }
}

impl fmt::Display for BuildEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status reported in the webhook payload.
///
/// `Host` carries the build server's own status text, already lower-cased.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildStatus {
    Queued,
    Pending,
    Cancelled,
    Error,
    Host(String),
}

impl BuildStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Queued => "queued",
            Self::Pending => "pending",
            Self::Cancelled => "cancelled",
            Self::Error => "error",
            Self::Host(text) => text,
        }
    }
}

impl fmt::Display for BuildStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for BuildStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for BuildStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Ok(match text.as_str() {
            "queued" => Self::Queued,
            "pending" => Self::Pending,
            "cancelled" => Self::Cancelled,
            "error" => Self::Error,
            _ => Self::Host(text),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VcsRoot {
    /// VCS kind, e.g. `jetbrains.git` or `svn`
    #[serde(default)]
    pub vcs_name: String,
    #[serde(default)]
    pub properties: HashMap<String, String>,
}

impl VcsRoot {
    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildRevision {
    pub revision: String,
    #[serde(default)]
    pub vcs_branch: Option<String>,
    pub root: VcsRoot,
}

/// Snapshot of a build at the moment a lifecycle event fired
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BuildEvent {
    #[serde(default)]
    pub build_id: i64,
    #[serde(default)]
    pub queue_item_id: i64,
    pub full_name: String,
    pub build_type_id: String,
    pub project_id: String,
    #[serde(default)]
    pub build_number: String,
    /// Raw status text as shown by the build server, e.g. `Success`
    #[serde(default)]
    pub status_text: String,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub finished_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub interrupted: bool,
    /// Whether cancellation info is attached to the build
    #[serde(default)]
    pub cancelled: bool,
    #[serde(default)]
    pub internal_error: bool,
    #[serde(default)]
    pub personal: bool,
    #[serde(default)]
    pub failure_reasons: Vec<String>,
    #[serde(default)]
    pub parameters: HashMap<String, String>,
    #[serde(default)]
    pub revisions: Vec<BuildRevision>,
    /// VCS root entries of the build promotion, available before revisions are
    #[serde(default)]
    pub vcs_roots: Vec<VcsRoot>,
    #[serde(default)]
    pub promotion_branch: Option<String>,
    #[serde(default)]
    pub artifacts_dir: Option<PathBuf>,
}

impl BuildEvent {
    pub fn parameter(&self, key: &str) -> Option<&str> {
        self.parameters.get(key).map(String::as_str)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactSource {
    Archive,
    S3,
}

/// Artifact name to the URLs it can be downloaded from, keyed by source
pub type ArtifactMap = BTreeMap<String, BTreeMap<ArtifactSource, String>>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScmInfo {
    pub url: Option<String>,
    pub branch: Option<String>,
    pub commit: Option<String>,
    /// `None` means the change list was not collected
    pub changes: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookPayload {
    pub name: String,
    pub url: String,
    pub build: PayloadBuild,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayloadBuild {
    pub full_url: String,
    pub build_id: Option<String>,
    pub status: BuildStatus,
    #[serde(default, with = "payload_date")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, with = "payload_date")]
    pub finished_at: Option<DateTime<Utc>>,
    pub scm: Option<ScmInfo>,
    pub artifacts: ArtifactMap,
    pub parameters: BTreeMap<String, String>,
}

/// `yyyy-MM-dd'T'HH:mm:ssZ`, e.g. `2024-05-01T10:20:30+0000`
pub mod payload_date {
    use chrono::{
        DateTime,
        Utc,
    };
    use serde::{
        de::Error,
        Deserialize,
        Deserializer,
        Serializer,
    };

    pub const FORMAT: &str = "%Y-%m-%dT%H:%M:%S%z";

    pub fn serialize<S: Serializer>(
        value: &Option<DateTime<Utc>>, serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(date) => serializer.serialize_str(&date.format(FORMAT).to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<DateTime<Utc>>, D::Error> {
        match Option::<String>::deserialize(deserializer)? {
            Some(text) => DateTime::parse_from_str(&text, FORMAT)
                .map(|date| Some(date.with_timezone(&Utc)))
                .map_err(D::Error::custom),
            None => Ok(None),
        }
    }
}
