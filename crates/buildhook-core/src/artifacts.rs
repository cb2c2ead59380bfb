//! Artifact URL resolution across the local archive and object storage
//!
//! Produces `{"app.jar": {"archive": "<ci url>", "s3": "<bucket url>"}}`. Object
//! storage is best-effort: any failure there leaves the archive result intact.

use std::path::Path;
use std::sync::Arc;

use buildhook_api::{
    ArtifactMap,
    ArtifactSource,
    ArtifactsGuard,
    BuildEvent,
    ObjectStorage,
    WebhookResult,
};

/// Internal metadata directory kept next to the archived artifacts
pub const METADATA_DIR_NAME: &str = ".teamcity";

/// Per-build metadata object uploaded alongside the artifacts
pub const BUILD_METADATA_SUFFIX: &str = "/build.json";

/// Bucket configured for uploaded artifacts, with the client used to read it
#[derive(Clone)]
pub struct ArtifactStorage {
    bucket: String,
    storage: Arc<dyn ObjectStorage>,
}

impl ArtifactStorage {
    pub fn new(bucket: impl Into<String>, storage: Arc<dyn ObjectStorage>) -> Self {
        Self {
            bucket: bucket.into(),
            storage,
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

pub struct ArtifactResolver {
    root_url: String,
    guard: Arc<dyn ArtifactsGuard>,
    storage: Option<ArtifactStorage>,
}

impl ArtifactResolver {
    pub fn new(root_url: impl Into<String>, guard: Arc<dyn ArtifactsGuard>) -> Self {
        Self {
            root_url: root_url.into().trim_end_matches('/').to_string(),
            guard,
            storage: None,
        }
    }

    pub fn with_storage(mut self, storage: Option<ArtifactStorage>) -> Self {
        self.storage = storage;
        self
    }

    pub fn root_url(&self) -> &str {
        &self.root_url
    }

    /// Resolves every artifact of the build to its download URLs.
    ///
    /// Local listing errors propagate; object storage errors are logged and
    /// swallowed.
    pub async fn resolve(&self, event: &BuildEvent) -> WebhookResult<ArtifactMap> {
        let mut artifacts = self.archived_artifacts(event)?;

        if let Some(storage) = &self.storage {
            match self.stored_artifacts(storage, event).await {
                Ok(stored) => {
                    for (name, url) in stored {
                        artifacts
                            .entry(name)
                            .or_default()
                            .insert(ArtifactSource::S3, url);
                    }
                }
                Err(e) => {
                    tracing::error!(
                        bucket = %storage.bucket,
                        build = %event.full_name,
                        error = %e,
                        "Failed to list objects in S3 bucket"
                    );
                }
            }
        }

        Ok(artifacts)
    }

    fn archived_artifacts(&self, event: &BuildEvent) -> WebhookResult<ArtifactMap> {
        let mut artifacts = ArtifactMap::new();

        let Some(dir) = event.artifacts_dir.as_deref() else {
            return Ok(artifacts);
        };
        let names = self.list_directory(dir)?;

        if self.root_url.trim().is_empty() {
            return Ok(artifacts);
        }

        for name in names {
            if name == METADATA_DIR_NAME || name.trim().is_empty() {
                continue;
            }

            // http://ci:8111/repository/download/Echo_Build/37/echo-service-0.0.1.jar
            let url = format!(
                "{}/repository/download/{}/{}/{}",
                self.root_url, event.build_type_id, event.build_number, name
            );
            artifacts
                .entry(name)
                .or_default()
                .insert(ArtifactSource::Archive, url);
        }

        Ok(artifacts)
    }

    fn list_directory(&self, dir: &Path) -> WebhookResult<Vec<String>> {
        if !dir.is_dir() {
            return Ok(Vec::new());
        }

        let _lock = ReadingLock::acquire(self.guard.as_ref(), dir);

        let mut names = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            names.push(entry?.file_name().to_string_lossy().into_owned());
        }

        Ok(names)
    }

    async fn stored_artifacts(
        &self, storage: &ArtifactStorage, event: &BuildEvent,
    ) -> WebhookResult<Vec<(String, String)>> {
        let bucket = storage.bucket.as_str();

        if !storage.storage.bucket_exists(bucket).await? {
            tracing::debug!(bucket = %bucket, "Artifact bucket does not exist");
            return Ok(Vec::new());
        }

        let prefix = storage_prefix(event);
        let keys = storage.storage.list_objects(bucket, &prefix).await?;
        if keys.is_empty() {
            return Ok(Vec::new());
        }

        let region = storage.storage.bucket_region(bucket).await?;

        let mut stored = Vec::with_capacity(keys.len());
        for key in keys {
            if key.trim().is_empty() || key.ends_with(BUILD_METADATA_SUFFIX) {
                continue;
            }

            let name = key.rsplit('/').next().unwrap_or_default();
            if name.trim().is_empty() {
                continue;
            }

            stored.push((name.to_string(), object_url(&region, bucket, &key)));
        }

        Ok(stored)
    }
}

/// `"Echo :: Build"` build #15 is uploaded under `"Echo::Build/15/"`
pub fn storage_prefix(event: &BuildEvent) -> String {
    format!(
        "{}/{}/",
        event.full_name.replace(" :: ", "::"),
        event.build_number
    )
}

/// https://s3-eu-west-1.amazonaws.com/bakery/Echo%3A%3ABuild/45/echo-service.jar
pub fn object_url(region: &str, bucket: &str, key: &str) -> String {
    let encoded_key = key
        .split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/");

    format!("https://s3-{}.amazonaws.com/{}/{}", region, bucket, encoded_key)
}

/// Holds the host's shared read lock on a directory until dropped
struct ReadingLock<'a> {
    guard: &'a dyn ArtifactsGuard,
    dir: &'a Path,
}

impl<'a> ReadingLock<'a> {
    fn acquire(guard: &'a dyn ArtifactsGuard, dir: &'a Path) -> Self {
        guard.lock_reading(dir);
        Self { guard, dir }
    }
}

impl Drop for ReadingLock<'_> {
    fn drop(&mut self) {
        self.guard.unlock_reading(self.dir);
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::path::PathBuf;
    use std::sync::atomic::{
        AtomicUsize,
        Ordering,
    };
    use std::sync::Mutex;

    use async_trait::async_trait;
    use buildhook_api::WebhookError;

    use super::*;

    #[derive(Default)]
    pub(crate) struct CountingGuard {
        pub locks: AtomicUsize,
        pub unlocks: AtomicUsize,
    }

    impl ArtifactsGuard for CountingGuard {
        fn lock_reading(&self, _dir: &Path) {
            self.locks.fetch_add(1, Ordering::SeqCst);
        }

        fn unlock_reading(&self, _dir: &Path) {
            self.unlocks.fetch_add(1, Ordering::SeqCst);
        }
    }

    /// Deletes the directory as soon as it is locked, so the listing fails
    #[derive(Default)]
    pub(crate) struct VanishingGuard {
        pub inner: CountingGuard,
    }

    impl ArtifactsGuard for VanishingGuard {
        fn lock_reading(&self, dir: &Path) {
            self.inner.lock_reading(dir);
            std::fs::remove_dir_all(dir).unwrap();
        }

        fn unlock_reading(&self, dir: &Path) {
            self.inner.unlock_reading(dir);
        }
    }

    pub(crate) struct FakeStorage {
        pub exists: bool,
        pub fail: bool,
        pub keys: Vec<String>,
        pub prefixes: Mutex<Vec<String>>,
    }

    impl FakeStorage {
        pub fn with_keys(keys: &[&str]) -> Self {
            Self {
                exists: true,
                fail: false,
                keys: keys.iter().map(|k| k.to_string()).collect(),
                prefixes: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ObjectStorage for FakeStorage {
        async fn bucket_exists(&self, _bucket: &str) -> WebhookResult<bool> {
            Ok(self.exists)
        }

        async fn bucket_region(&self, _bucket: &str) -> WebhookResult<String> {
            Ok("eu-west-1".to_string())
        }

        async fn list_objects(&self, _bucket: &str, prefix: &str) -> WebhookResult<Vec<String>> {
            self.prefixes.lock().unwrap().push(prefix.to_string());
            if self.fail {
                return Err(WebhookError::ObjectStorage("access denied".to_string()));
            }
            Ok(self.keys.clone())
        }
    }

    fn artifact_dir() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("app.jar"), b"jar").unwrap();
        std::fs::write(dir.path().join("report.txt"), b"ok").unwrap();
        std::fs::create_dir(dir.path().join(METADATA_DIR_NAME)).unwrap();
        dir
    }

    fn event(dir: Option<PathBuf>) -> BuildEvent {
        BuildEvent {
            full_name: "Echo :: Build".to_string(),
            build_type_id: "Echo_Build".to_string(),
            project_id: "Echo".to_string(),
            build_number: "12".to_string(),
            artifacts_dir: dir,
            ..Default::default()
        }
    }

    fn resolver(guard: Arc<CountingGuard>, storage: Option<FakeStorage>) -> ArtifactResolver {
        ArtifactResolver::new("http://ci:8111/", guard).with_storage(
            storage.map(|s| ArtifactStorage::new("bakery", Arc::new(s) as Arc<dyn ObjectStorage>)),
        )
    }

    const S3_KEYS: &[&str] = &[
        "Echo::Build/12/app.jar",
        "Echo::Build/12/extra.zip",
        "Echo::Build/12/build.json",
        "Echo::Build/12/logs/",
        "",
    ];

    #[tokio::test]
    async fn test_local_archive_only() {
        let dir = artifact_dir();
        let guard = Arc::new(CountingGuard::default());

        let artifacts = resolver(guard.clone(), None)
            .resolve(&event(Some(dir.path().to_path_buf())))
            .await
            .unwrap();

        assert_eq!(
            artifacts.keys().cloned().collect::<Vec<_>>(),
            vec!["app.jar", "report.txt"]
        );
        assert_eq!(
            artifacts["app.jar"][&ArtifactSource::Archive],
            "http://ci:8111/repository/download/Echo_Build/12/app.jar"
        );
        assert!(!artifacts["app.jar"].contains_key(&ArtifactSource::S3));
        assert_eq!(guard.locks.load(Ordering::SeqCst), 1);
        assert_eq!(guard.unlocks.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_missing_directory_takes_no_lock() {
        let guard = Arc::new(CountingGuard::default());
        let missing = std::env::temp_dir().join("buildhook-no-such-artifacts-dir");

        let artifacts = resolver(guard.clone(), None)
            .resolve(&event(Some(missing)))
            .await
            .unwrap();
        assert!(artifacts.is_empty());

        let artifacts = resolver(guard.clone(), None)
            .resolve(&event(None))
            .await
            .unwrap();
        assert!(artifacts.is_empty());
        assert_eq!(guard.locks.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_listing_failure_releases_lock() {
        let dir = artifact_dir();
        let path = dir.path().to_path_buf();
        let guard = Arc::new(VanishingGuard::default());

        let result = ArtifactResolver::new("http://ci:8111", guard.clone())
            .resolve(&event(Some(path.clone())))
            .await;

        assert!(matches!(result, Err(WebhookError::Io(_))));
        assert!(!path.exists());
        assert_eq!(guard.inner.locks.load(Ordering::SeqCst), 1);
        assert_eq!(guard.inner.unlocks.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_merges_archive_and_storage() {
        let dir = artifact_dir();
        let guard = Arc::new(CountingGuard::default());

        let artifacts = resolver(guard, Some(FakeStorage::with_keys(S3_KEYS)))
            .resolve(&event(Some(dir.path().to_path_buf())))
            .await
            .unwrap();

        assert_eq!(
            artifacts.keys().cloned().collect::<Vec<_>>(),
            vec!["app.jar", "extra.zip", "report.txt"]
        );

        let app = &artifacts["app.jar"];
        assert_eq!(
            app[&ArtifactSource::Archive],
            "http://ci:8111/repository/download/Echo_Build/12/app.jar"
        );
        assert_eq!(
            app[&ArtifactSource::S3],
            "https://s3-eu-west-1.amazonaws.com/bakery/Echo%3A%3ABuild/12/app.jar"
        );

        let extra = &artifacts["extra.zip"];
        assert_eq!(extra.len(), 1);
        assert!(extra.contains_key(&ArtifactSource::S3));

        assert!(!artifacts["report.txt"].contains_key(&ArtifactSource::S3));
    }

    #[tokio::test]
    async fn test_storage_only_artifacts_without_local_directory() {
        let guard = Arc::new(CountingGuard::default());

        let artifacts = resolver(guard, Some(FakeStorage::with_keys(S3_KEYS)))
            .resolve(&event(None))
            .await
            .unwrap();

        assert_eq!(
            artifacts.keys().cloned().collect::<Vec<_>>(),
            vec!["app.jar", "extra.zip"]
        );
        assert!(artifacts
            .values()
            .all(|sources| sources.len() == 1 && sources.contains_key(&ArtifactSource::S3)));
    }

    #[tokio::test]
    async fn test_storage_prefix_collapses_separator() {
        let storage = Arc::new(FakeStorage::with_keys(&[]));
        let resolver = ArtifactResolver::new("http://ci:8111", Arc::new(CountingGuard::default()))
            .with_storage(Some(ArtifactStorage::new("bakery", storage.clone())));

        resolver.resolve(&event(None)).await.unwrap();

        assert_eq!(
            *storage.prefixes.lock().unwrap(),
            vec!["Echo::Build/12/".to_string()]
        );
    }

    #[tokio::test]
    async fn test_storage_failure_keeps_local_result() {
        let dir = artifact_dir();
        let event = event(Some(dir.path().to_path_buf()));

        let local = resolver(Arc::new(CountingGuard::default()), None)
            .resolve(&event)
            .await
            .unwrap();

        let mut failing = FakeStorage::with_keys(S3_KEYS);
        failing.fail = true;
        let with_failure = resolver(Arc::new(CountingGuard::default()), Some(failing))
            .resolve(&event)
            .await
            .unwrap();

        assert_eq!(local, with_failure);
    }

    #[tokio::test]
    async fn test_missing_bucket_keeps_local_result() {
        let dir = artifact_dir();
        let event = event(Some(dir.path().to_path_buf()));

        let mut missing = FakeStorage::with_keys(S3_KEYS);
        missing.exists = false;
        let storage = Arc::new(missing);
        let resolver = ArtifactResolver::new("http://ci:8111", Arc::new(CountingGuard::default()))
            .with_storage(Some(ArtifactStorage::new("bakery", storage.clone())));

        let artifacts = resolver.resolve(&event).await.unwrap();

        assert_eq!(artifacts.len(), 2);
        assert!(storage.prefixes.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_blank_root_url_skips_archive_urls() {
        let dir = artifact_dir();
        let guard = Arc::new(CountingGuard::default());

        let artifacts = ArtifactResolver::new("", guard.clone())
            .resolve(&event(Some(dir.path().to_path_buf())))
            .await
            .unwrap();

        assert!(artifacts.is_empty());
        assert_eq!(guard.unlocks.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_object_url_encodes_segments() {
        assert_eq!(
            object_url("us-east-1", "bakery", "Echo::Build/3/my app.jar"),
            "https://s3-us-east-1.amazonaws.com/bakery/Echo%3A%3ABuild/3/my%20app.jar"
        );
    }
}
