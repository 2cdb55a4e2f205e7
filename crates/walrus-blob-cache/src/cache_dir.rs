//! Backing directory for the cache

use crate::error::Result;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::debug;

const TEMP_DIR_PREFIX: &str = "walrus_cache_";

/// Directory holding the cached blob files.
///
/// `Owned` directories are private temporaries created by the cache; they are
/// removed on [`CacheDir::teardown`] and, failing that, when dropped.
#[derive(Debug)]
pub enum CacheDir {
    Owned(TempDir),
    Provided(PathBuf),
}

impl CacheDir {
    /// Use `dir` when given (created if absent), otherwise a fresh temp directory
    pub async fn open(dir: Option<PathBuf>) -> Result<Self> {
        match dir {
            Some(path) => {
                tokio::fs::create_dir_all(&path).await?;
                Ok(CacheDir::Provided(path))
            }
            None => {
                let temp = tempfile::Builder::new()
                    .prefix(TEMP_DIR_PREFIX)
                    .tempdir()?;
                Ok(CacheDir::Owned(temp))
            }
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            CacheDir::Owned(temp) => temp.path(),
            CacheDir::Provided(path) => path,
        }
    }

    /// Whether the directory was created by the cache itself
    pub fn is_owned(&self) -> bool {
        matches!(self, CacheDir::Owned(_))
    }

    /// Remove the directory and everything in it. Failures are ignored.
    pub async fn teardown(&self) {
        let path = self.path();
        if let Err(e) = tokio::fs::remove_dir_all(path).await {
            debug!(dir = ?path, error = %e, "Failed to remove cache directory");
        }
    }
}
