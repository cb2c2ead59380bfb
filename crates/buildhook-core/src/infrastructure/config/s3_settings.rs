use std::path::Path;

use serde::{
    Deserialize,
    Serialize,
};

use super::loader::{
    ConfigLoadError,
    ConfigLoadResult,
};

/// Object-storage settings for uploaded artifacts.
///
/// A missing file or a blank bucket disables the object-storage lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct S3Settings {
    #[serde(default)]
    pub artifact_bucket: Option<String>,
    #[serde(default)]
    pub aws_access_key: Option<String>,
    #[serde(default)]
    pub aws_secret_key: Option<String>,
}

impl S3Settings {
    pub fn load(path: &Path) -> ConfigLoadResult<Self> {
        if !path.is_file() {
            tracing::debug!("No S3 settings at {}, object storage disabled", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            ConfigLoadError::InvalidConfig(format!(
                "Failed to parse S3 settings '{}': {}",
                path.display(),
                e
            ))
        })
    }

    pub fn bucket(&self) -> Option<&str> {
        non_blank(self.artifact_bucket.as_deref())
    }

    /// Explicit access/secret key pair, when both are set
    pub fn credentials(&self) -> Option<(&str, &str)> {
        Some((
            non_blank(self.aws_access_key.as_deref())?,
            non_blank(self.aws_secret_key.as_deref())?,
        ))
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_disables_storage() {
        let dir = tempfile::tempdir().unwrap();
        let settings = S3Settings::load(&dir.path().join("s3-settings.json")).unwrap();

        assert_eq!(settings, S3Settings::default());
        assert_eq!(settings.bucket(), None);
    }

    #[test]
    fn test_load_settings_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("s3-settings.json");
        std::fs::write(
            &path,
            r#"{"artifactBucket": "bakery", "awsAccessKey": "AKID", "awsSecretKey": "secret"}"#,
        )
        .unwrap();

        let settings = S3Settings::load(&path).unwrap();
        assert_eq!(settings.bucket(), Some("bakery"));
        assert_eq!(settings.credentials(), Some(("AKID", "secret")));
    }

    #[test]
    fn test_blank_values() {
        let settings = S3Settings {
            artifact_bucket: Some("  ".to_string()),
            aws_access_key: Some("AKID".to_string()),
            aws_secret_key: None,
        };

        assert_eq!(settings.bucket(), None);
        assert_eq!(settings.credentials(), None);
    }

    #[test]
    fn test_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("s3-settings.json");
        std::fs::write(&path, "{not json").unwrap();

        assert!(matches!(
            S3Settings::load(&path),
            Err(ConfigLoadError::InvalidConfig(_))
        ));
    }
}
