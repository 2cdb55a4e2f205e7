//! Cache types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::time::Instant;

/// Metadata for a cached blob entry
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub blob_id: String,
    pub path: PathBuf,
    pub size: u64,
    /// When the blob was written to disk; drives TTL and byte-bounded eviction
    pub written_at: Instant,
    /// Last successful write or read hit; drives count-bounded eviction
    pub last_access: Instant,
    /// Wall-clock time of the write, reported through [`CacheStats`]
    pub cached_at: DateTime<Utc>,
    /// Logical clock bumped on every write and hit. Breaks ties between
    /// entries whose instants compare equal.
    pub seq: u64,
    /// Value of the logical clock at write time
    pub write_seq: u64,
}

/// Current occupancy of the cache, as seen by an eviction policy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheUsage {
    pub entries: usize,
    pub total_size: u64,
}

/// Statistics about the cache
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheStats {
    pub entries: usize,
    pub total_size: u64,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    /// Write time of the oldest entry still indexed
    pub oldest_entry: Option<DateTime<Utc>>,
    /// Write time of the newest entry
    pub newest_entry: Option<DateTime<Utc>>,
}
