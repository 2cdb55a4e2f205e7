//! Disk-backed blob cache
//!
//! Stores opaque blob payloads on disk, one file per blob id, with an
//! in-memory index that decides hits, misses and evictions. Two eviction
//! disciplines are available through [`CachePolicy`]: a count-bounded LRU
//! and a byte-bounded LRU whose entries also expire after a fixed TTL.

mod cache;
mod cache_dir;
mod error;
pub mod policy;
mod types;

pub use cache::BlobCache;
pub use cache_dir::CacheDir;
pub use error::{CacheError, Result};
pub use policy::{ByteBoundedTtl, CachePolicy, CountBounded, EvictionPolicy};
pub use types::{CacheEntry, CacheStats, CacheUsage};
