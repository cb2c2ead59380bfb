use std::path::{
    Path,
    PathBuf,
};

use buildhook_api::ArtifactsGuard;
use dashmap::DashMap;

/// In-process registry of directories currently being read
#[derive(Debug, Default)]
pub struct LocalArtifactsGuard {
    readers: DashMap<PathBuf, usize>,
}

impl LocalArtifactsGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn readers(&self, dir: &Path) -> usize {
        self.readers.get(dir).map(|count| *count).unwrap_or(0)
    }
}

impl ArtifactsGuard for LocalArtifactsGuard {
    fn lock_reading(&self, dir: &Path) {
        *self.readers.entry(dir.to_path_buf()).or_insert(0) += 1;
        tracing::trace!(dir = %dir.display(), "Locked artifacts for reading");
    }

    fn unlock_reading(&self, dir: &Path) {
        let released = self
            .readers
            .remove_if_mut(dir, |_, count| {
                *count = count.saturating_sub(1);
                *count == 0
            })
            .is_some();

        if !released && !self.readers.contains_key(dir) {
            tracing::warn!(dir = %dir.display(), "Unlock without a matching lock");
        }
    }
}
