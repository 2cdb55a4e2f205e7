//! File-based blob caching with an in-memory index

use crate::cache_dir::CacheDir;
use crate::error::Result;
use crate::policy::{CachePolicy, EvictionPolicy};
use crate::types::{CacheEntry, CacheStats, CacheUsage};
use bytes::Bytes;
use chrono::Utc;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::fs;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// In-memory index of the cached files
#[derive(Debug, Default)]
struct CacheIndex {
    entries: HashMap<String, CacheEntry>,
    total_size: u64,
    next_seq: u64,
}

impl CacheIndex {
    fn usage(&self) -> CacheUsage {
        CacheUsage {
            entries: self.entries.len(),
            total_size: self.total_size,
        }
    }

    fn tick(&mut self) -> u64 {
        self.next_seq += 1;
        self.next_seq
    }

    fn take(&mut self, blob_id: &str) -> Option<CacheEntry> {
        let entry = self.entries.remove(blob_id)?;
        self.total_size = self.total_size.saturating_sub(entry.size);
        Some(entry)
    }
}

/// A blob cache with in-memory metadata and file-based storage
pub struct BlobCache {
    index: Mutex<CacheIndex>,
    dir: CacheDir,
    policy: Box<dyn EvictionPolicy>,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl BlobCache {
    /// Open a cache in `dir`, or in a private temporary directory when `None`
    pub async fn open(dir: Option<PathBuf>, policy: CachePolicy) -> Result<Self> {
        let policy = policy.build()?;
        let dir = CacheDir::open(dir).await?;
        Ok(Self::with_policy(dir, policy))
    }

    /// Build a cache from an already opened directory and any policy
    pub fn with_policy(dir: CacheDir, policy: Box<dyn EvictionPolicy>) -> Self {
        info!(cache_dir = ?dir.path(), owned = dir.is_owned(), ?policy, "Cache initialized");
        Self {
            index: Mutex::new(CacheIndex::default()),
            dir,
            policy,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    /// File name used for a blob id: hex SHA-256 of the id
    pub fn cache_file_name(blob_id: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(blob_id.as_bytes());
        hex::encode(hasher.finalize())
    }

    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    /// Whether the backing directory is a temporary created by the cache
    pub fn owns_dir(&self) -> bool {
        self.dir.is_owned()
    }

    /// Get a blob from the cache.
    ///
    /// Expired entries and entries whose file can no longer be read are
    /// dropped from the index and reported as a miss.
    pub async fn get(&self, blob_id: &str) -> Option<Bytes> {
        let mut index = self.index.lock().await;
        let now = Instant::now();

        let (path, expired) = match index.entries.get(blob_id) {
            Some(entry) => (entry.path.clone(), self.policy.is_expired(entry, now)),
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                debug!(blob_id, "Cache miss");
                return None;
            }
        };

        if expired {
            debug!(blob_id, "Cache entry expired");
            self.remove_locked(&mut index, blob_id).await;
            self.misses.fetch_add(1, Ordering::Relaxed);
            return None;
        }

        match fs::read(&path).await {
            Ok(data) => {
                let seq = index.tick();
                if let Some(entry) = index.entries.get_mut(blob_id) {
                    entry.last_access = now;
                    entry.seq = seq;
                }
                self.hits.fetch_add(1, Ordering::Relaxed);
                debug!(blob_id, size = data.len(), "Cache hit");
                Some(Bytes::from(data))
            }
            Err(e) => {
                warn!(blob_id, path = ?path, error = %e, "Failed to read cached file, removing entry");
                self.remove_locked(&mut index, blob_id).await;
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Store a blob in the cache.
    ///
    /// Returns `Ok(None)` when the policy refuses the blob. On a write
    /// failure nothing is indexed, no file is left behind, and the error is
    /// returned.
    pub async fn put(&self, blob_id: &str, data: &[u8]) -> Result<Option<PathBuf>> {
        let size = data.len() as u64;
        if !self.policy.admits(size) {
            debug!(blob_id, size, "Blob exceeds cache capacity, not caching");
            return Ok(None);
        }

        let mut index = self.index.lock().await;

        // The file is overwritten below; only the accounting is released here.
        index.take(blob_id);

        self.evict_if_needed(&mut index, size).await;

        let path = self.dir.path().join(Self::cache_file_name(blob_id));
        write_atomic(&path, data).await.inspect_err(|e| {
            warn!(blob_id, path = ?path, error = %e, "Failed to write cache file");
        })?;

        let now = Instant::now();
        let seq = index.tick();
        index.entries.insert(
            blob_id.to_string(),
            CacheEntry {
                blob_id: blob_id.to_string(),
                path: path.clone(),
                size,
                written_at: now,
                last_access: now,
                cached_at: Utc::now(),
                seq,
                write_seq: seq,
            },
        );
        index.total_size += size;
        debug!(blob_id, size, "Cached blob");

        Ok(Some(path))
    }

    /// Remove an entry from the cache. Removing an absent entry is a no-op.
    pub async fn remove(&self, blob_id: &str) {
        let mut index = self.index.lock().await;
        self.remove_locked(&mut index, blob_id).await;
    }

    /// Whether an entry is currently indexed (expiry is not checked)
    pub async fn contains(&self, blob_id: &str) -> bool {
        self.index.lock().await.entries.contains_key(blob_id)
    }

    pub async fn len(&self) -> usize {
        self.index.lock().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn total_size(&self) -> u64 {
        self.index.lock().await.total_size
    }

    /// Drop every entry and its file
    pub async fn clear(&self) {
        let mut index = self.index.lock().await;
        let ids: Vec<String> = index.entries.keys().cloned().collect();
        for blob_id in ids {
            self.remove_locked(&mut index, &blob_id).await;
        }
    }

    /// Remove the backing directory and forget every entry. Best effort.
    pub async fn teardown(&self) {
        let mut index = self.index.lock().await;
        index.entries.clear();
        index.total_size = 0;
        self.dir.teardown().await;
        debug!(cache_dir = ?self.dir.path(), "Cache torn down");
    }

    /// Get current cache statistics
    pub async fn stats(&self) -> CacheStats {
        let index = self.index.lock().await;
        CacheStats {
            entries: index.entries.len(),
            total_size: index.total_size,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            oldest_entry: index.entries.values().map(|e| e.cached_at).min(),
            newest_entry: index.entries.values().map(|e| e.cached_at).max(),
        }
    }

    /// Evict entries chosen by the policy until `incoming` bytes may be added
    async fn evict_if_needed(&self, index: &mut CacheIndex, incoming: u64) {
        while self.policy.should_evict(index.usage(), incoming) {
            let Some(victim) = self.policy.select_victim(&index.entries).map(str::to_owned) else {
                break;
            };
            self.remove_locked(index, &victim).await;
            self.evictions.fetch_add(1, Ordering::Relaxed);
            debug!(blob_id = %victim, "Evicted cache entry");
        }
    }

    async fn remove_locked(&self, index: &mut CacheIndex, blob_id: &str) {
        if let Some(entry) = index.take(blob_id) {
            remove_file_if_exists(&entry.path).await;
        }
    }
}

/// Write through a staging file and rename it into place
async fn write_atomic(path: &Path, data: &[u8]) -> io::Result<()> {
    let staging = path.with_extension("tmp");

    let result = async {
        fs::write(&staging, data).await?;
        fs::rename(&staging, path).await
    }
    .await;

    if result.is_err() {
        remove_file_if_exists(&staging).await;
        remove_file_if_exists(path).await;
    }
    result
}

async fn remove_file_if_exists(path: &Path) {
    match fs::remove_file(path).await {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = ?path, error = %e, "Failed to remove cache file"),
    }
}
