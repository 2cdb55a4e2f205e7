//! Eviction policies
//!
//! A policy never touches the filesystem or the index itself. The cache asks
//! it four questions: may this blob be stored at all, must room be made
//! before inserting, which entry goes first, and has an entry gone stale.

use crate::error::{CacheError, Result};
use crate::types::{CacheEntry, CacheUsage};
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;
use tokio::time::Instant;

/// Admission and eviction decisions for a [`crate::BlobCache`]
pub trait EvictionPolicy: fmt::Debug + Send + Sync {
    /// Whether a blob of `size` bytes may be cached at all
    fn admits(&self, _size: u64) -> bool {
        true
    }

    /// Whether an entry must be evicted before inserting `incoming` bytes
    fn should_evict(&self, usage: CacheUsage, incoming: u64) -> bool;

    /// The entry to evict next, or `None` when the index is empty
    fn select_victim<'a>(&self, entries: &'a HashMap<String, CacheEntry>) -> Option<&'a str>;

    /// Whether an entry is stale at `now` and must be treated as a miss
    fn is_expired(&self, _entry: &CacheEntry, _now: Instant) -> bool {
        false
    }
}

/// Holds at most `max_entries` blobs, evicting the least recently accessed
#[derive(Debug, Clone, Copy)]
pub struct CountBounded {
    max_entries: usize,
}

impl CountBounded {
    pub fn new(max_entries: usize) -> Result<Self> {
        if max_entries == 0 {
            return Err(CacheError::Config(
                "max_entries must be greater than zero".to_string(),
            ));
        }
        Ok(Self { max_entries })
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }
}

impl EvictionPolicy for CountBounded {
    fn should_evict(&self, usage: CacheUsage, _incoming: u64) -> bool {
        usage.entries >= self.max_entries
    }

    fn select_victim<'a>(&self, entries: &'a HashMap<String, CacheEntry>) -> Option<&'a str> {
        entries
            .values()
            .min_by_key(|e| (e.last_access, e.seq))
            .map(|e| e.blob_id.as_str())
    }
}

/// Holds at most `max_bytes` in total; entries expire `ttl` after being written
#[derive(Debug, Clone, Copy)]
pub struct ByteBoundedTtl {
    max_bytes: u64,
    ttl: Duration,
}

impl ByteBoundedTtl {
    pub fn new(max_bytes: u64, ttl: Duration) -> Result<Self> {
        if max_bytes == 0 {
            return Err(CacheError::Config(
                "max_bytes must be greater than zero".to_string(),
            ));
        }
        if ttl.is_zero() {
            return Err(CacheError::Config(
                "ttl must be greater than zero".to_string(),
            ));
        }
        Ok(Self { max_bytes, ttl })
    }

    pub fn max_bytes(&self) -> u64 {
        self.max_bytes
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}

impl EvictionPolicy for ByteBoundedTtl {
    fn admits(&self, size: u64) -> bool {
        size <= self.max_bytes
    }

    fn should_evict(&self, usage: CacheUsage, incoming: u64) -> bool {
        usage.total_size.saturating_add(incoming) > self.max_bytes
    }

    // Reads do not refresh an entry here: the oldest write goes first.
    fn select_victim<'a>(&self, entries: &'a HashMap<String, CacheEntry>) -> Option<&'a str> {
        entries
            .values()
            .min_by_key(|e| (e.written_at, e.write_seq))
            .map(|e| e.blob_id.as_str())
    }

    fn is_expired(&self, entry: &CacheEntry, now: Instant) -> bool {
        now.saturating_duration_since(entry.written_at) > self.ttl
    }
}

/// Cache bounds as chosen by configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CachePolicy {
    /// Count-bounded LRU
    MaxEntries(usize),
    /// Byte-bounded LRU with per-entry TTL
    MaxBytes { max_bytes: u64, ttl: Duration },
}

impl CachePolicy {
    pub const DEFAULT_MAX_ENTRIES: usize = 100;

    /// Validate the bounds and build the matching policy
    pub fn build(self) -> Result<Box<dyn EvictionPolicy>> {
        match self {
            CachePolicy::MaxEntries(max_entries) => Ok(Box::new(CountBounded::new(max_entries)?)),
            CachePolicy::MaxBytes { max_bytes, ttl } => {
                Ok(Box::new(ByteBoundedTtl::new(max_bytes, ttl)?))
            }
        }
    }
}

impl Default for CachePolicy {
    fn default() -> Self {
        CachePolicy::MaxEntries(Self::DEFAULT_MAX_ENTRIES)
    }
}
