//! AWS credential lookup
//!
//! Explicit keys win. Otherwise the standard chain is tried in order:
//! environment, shared credentials file, container endpoint, instance
//! metadata. When nothing is found requests go out unsigned.

use std::path::{
    Path,
    PathBuf,
};
use std::time::Duration;

use chrono::Utc;
use reqwest::Client;
use tokio::sync::Mutex;

use crate::client::{
    checked_body,
    S3Error,
};
use crate::config::Credentials;
use crate::types::MetadataCredentials;

const CONTAINER_ENDPOINT: &str = "http://169.254.170.2";

const INSTANCE_METADATA_ENDPOINT: &str = "http://169.254.169.254";

const METADATA_TIMEOUT: Duration = Duration::from_secs(2);

/// Temporary credentials are refreshed this long before they expire
const EXPIRY_MARGIN_MINUTES: i64 = 5;

const DEFAULT_PROFILE: &str = "default";

pub(crate) struct CredentialsChain {
    explicit: Option<Credentials>,
    default_chain: bool,
    cached: Mutex<Option<Option<Credentials>>>,
}

impl CredentialsChain {
    pub fn new(explicit: Option<Credentials>, default_chain: bool) -> Self {
        Self {
            explicit,
            default_chain,
            cached: Mutex::new(None),
        }
    }

    /// Credentials to sign the next request with, `None` for anonymous access
    pub async fn resolve(&self, client: &Client) -> Option<Credentials> {
        if let Some(explicit) = &self.explicit {
            return Some(explicit.clone());
        }
        if !self.default_chain {
            return None;
        }

        let mut cached = self.cached.lock().await;
        if let Some(entry) = cached.as_ref() {
            if is_fresh(entry.as_ref()) {
                return entry.clone();
            }
        }

        let found = lookup(client).await;
        if found.is_none() {
            tracing::info!("No AWS credentials found, S3 requests will be anonymous");
        }
        *cached = Some(found.clone());
        found
    }
}

/// A cached lookup stays valid unless it holds credentials about to expire
fn is_fresh(entry: Option<&Credentials>) -> bool {
    match entry.and_then(|c| c.expires_at) {
        Some(expires_at) => {
            Utc::now() + chrono::Duration::minutes(EXPIRY_MARGIN_MINUTES) < expires_at
        }
        None => true,
    }
}

async fn lookup(client: &Client) -> Option<Credentials> {
    if let Some(creds) = from_env() {
        tracing::debug!("Using AWS credentials from the environment");
        return Some(creds);
    }

    if let Some(path) = shared_credentials_path() {
        let profile = env_non_blank("AWS_PROFILE").unwrap_or_else(|| DEFAULT_PROFILE.to_string());
        if let Some(creds) = from_profile_file(&path, &profile) {
            tracing::debug!(profile = %profile, "Using AWS credentials from {}", path.display());
            return Some(creds);
        }
    }

    if let Some(url) = container_credentials_url() {
        let token = env_non_blank("AWS_CONTAINER_AUTHORIZATION_TOKEN");
        match fetch_container(client, &url, token.as_deref()).await {
            Ok(creds) => {
                tracing::debug!("Using AWS credentials from the container endpoint");
                return Some(creds);
            }
            Err(e) => tracing::warn!(error = %e, "Failed to fetch container credentials"),
        }
    }

    if env_non_blank("AWS_EC2_METADATA_DISABLED").as_deref() != Some("true") {
        let endpoint = env_non_blank("AWS_EC2_METADATA_SERVICE_ENDPOINT")
            .unwrap_or_else(|| INSTANCE_METADATA_ENDPOINT.to_string());
        match fetch_instance(client, &endpoint).await {
            Ok(creds) => {
                tracing::debug!("Using AWS credentials from instance metadata");
                return Some(creds);
            }
            Err(e) => tracing::debug!(error = %e, "No instance metadata credentials"),
        }
    }

    None
}

fn env_non_blank(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn from_env() -> Option<Credentials> {
    let mut creds = Credentials::new(
        env_non_blank("AWS_ACCESS_KEY_ID")?,
        env_non_blank("AWS_SECRET_ACCESS_KEY")?,
    );
    creds.session_token = env_non_blank("AWS_SESSION_TOKEN");
    Some(creds)
}

fn shared_credentials_path() -> Option<PathBuf> {
    env_non_blank("AWS_SHARED_CREDENTIALS_FILE")
        .map(PathBuf::from)
        .or_else(|| dirs::home_dir().map(|home| home.join(".aws").join("credentials")))
}

fn from_profile_file(path: &Path, profile: &str) -> Option<Credentials> {
    let content = std::fs::read_to_string(path).ok()?;
    parse_profile(&content, profile)
}

/// Reads one `[profile]` section of an INI-style shared credentials file
fn parse_profile(content: &str, profile: &str) -> Option<Credentials> {
    let mut in_profile = false;
    let mut access_key = None;
    let mut secret_key = None;
    let mut session_token = None;

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }

        if let Some(section) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
            in_profile = section.trim() == profile;
            continue;
        }
        if !in_profile {
            continue;
        }

        if let Some((key, value)) = line.split_once('=') {
            let value = Some(value.trim().to_string()).filter(|v| !v.is_empty());
            match key.trim() {
                "aws_access_key_id" => access_key = value,
                "aws_secret_access_key" => secret_key = value,
                "aws_session_token" => session_token = value,
                _ => {}
            }
        }
    }

    let mut creds = Credentials::new(access_key?, secret_key?);
    creds.session_token = session_token;
    Some(creds)
}

fn container_credentials_url() -> Option<String> {
    if let Some(relative) = env_non_blank("AWS_CONTAINER_CREDENTIALS_RELATIVE_URI") {
        return Some(format!("{}{}", CONTAINER_ENDPOINT, relative));
    }
    env_non_blank("AWS_CONTAINER_CREDENTIALS_FULL_URI")
}

async fn fetch_container(
    client: &Client, url: &str, token: Option<&str>,
) -> Result<Credentials, S3Error> {
    let mut request = client.get(url).timeout(METADATA_TIMEOUT);
    if let Some(token) = token {
        request = request.header("authorization", token);
    }

    let body = checked_body("ContainerCredentials", request.send().await?).await?;
    parse_metadata_credentials(&body)
}

/// IMDSv2: session token, role name, then the role's credentials
async fn fetch_instance(client: &Client, endpoint: &str) -> Result<Credentials, S3Error> {
    let endpoint = endpoint.trim_end_matches('/');

    let response = client
        .put(format!("{}/latest/api/token", endpoint))
        .header("x-aws-ec2-metadata-token-ttl-seconds", "21600")
        .timeout(METADATA_TIMEOUT)
        .send()
        .await?;
    let token = checked_body("InstanceMetadataToken", response).await?;

    let roles_url = format!("{}/latest/meta-data/iam/security-credentials/", endpoint);
    let response = client
        .get(&roles_url)
        .header("x-aws-ec2-metadata-token", token.trim())
        .timeout(METADATA_TIMEOUT)
        .send()
        .await?;
    let roles = checked_body("InstanceMetadataRoles", response).await?;
    let role = roles
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .ok_or_else(|| S3Error::Credentials("no instance role attached".to_string()))?;

    let response = client
        .get(format!("{}{}", roles_url, role))
        .header("x-aws-ec2-metadata-token", token.trim())
        .timeout(METADATA_TIMEOUT)
        .send()
        .await?;
    let body = checked_body("InstanceMetadataCredentials", response).await?;
    parse_metadata_credentials(&body)
}

fn parse_metadata_credentials(body: &str) -> Result<Credentials, S3Error> {
    let metadata: MetadataCredentials = serde_json::from_str(body)
        .map_err(|e| S3Error::Credentials(format!("malformed credentials response: {}", e)))?;

    Ok(Credentials {
        access_key: metadata.access_key_id,
        secret_key: metadata.secret_access_key,
        session_token: metadata.token,
        expires_at: metadata.expiration,
    })
}
