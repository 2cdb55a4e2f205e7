use std::env;
use std::path::PathBuf;
use std::time::Duration;
use walrus_blob_cache::CachePolicy;

pub const DEFAULT_PUBLISHER_URL: &str = "http://127.0.0.1:31415";
pub const DEFAULT_AGGREGATOR_URL: &str = "http://127.0.0.1:31415";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CACHE_TTL_SECS: u64 = 60 * 60;

/// Where and how blobs are cached
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheConfig {
    /// Cache directory; a private temporary directory when `None`
    pub dir: Option<PathBuf>,
    pub policy: CachePolicy,
}

/// Client configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub publisher_url: String,
    pub aggregator_url: String,
    /// Bound on network calls. Cache filesystem operations are not timed.
    pub timeout: Duration,
    pub cache: CacheConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            publisher_url: DEFAULT_PUBLISHER_URL.to_string(),
            aggregator_url: DEFAULT_AGGREGATOR_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            cache: CacheConfig::default(),
        }
    }
}

impl ClientConfig {
    pub fn new(publisher_url: impl Into<String>, aggregator_url: impl Into<String>) -> Self {
        Self {
            publisher_url: publisher_url.into(),
            aggregator_url: aggregator_url.into(),
            ..Self::default()
        }
    }

    /// Parse configuration from environment variables.
    ///
    /// Setting `WALRUS_CACHE_MAX_BYTES` selects the byte-bounded policy
    /// (with `WALRUS_CACHE_TTL_SECS`); otherwise the cache is bounded by
    /// `WALRUS_CACHE_MAX_ENTRIES`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let parse_u64 = |key: &str| lookup(key).and_then(|v| v.trim().parse::<u64>().ok());

        let publisher_url =
            lookup("WALRUS_PUBLISHER_URL").unwrap_or_else(|| DEFAULT_PUBLISHER_URL.to_string());

        let aggregator_url =
            lookup("WALRUS_AGGREGATOR_URL").unwrap_or_else(|| DEFAULT_AGGREGATOR_URL.to_string());

        let timeout =
            Duration::from_secs(parse_u64("WALRUS_TIMEOUT_SECS").unwrap_or(DEFAULT_TIMEOUT_SECS));

        let dir = lookup("WALRUS_CACHE_DIR")
            .filter(|d| !d.is_empty())
            .map(PathBuf::from);

        let policy = match parse_u64("WALRUS_CACHE_MAX_BYTES") {
            Some(max_bytes) => CachePolicy::MaxBytes {
                max_bytes,
                ttl: Duration::from_secs(
                    parse_u64("WALRUS_CACHE_TTL_SECS").unwrap_or(DEFAULT_CACHE_TTL_SECS),
                ),
            },
            None => CachePolicy::MaxEntries(
                parse_u64("WALRUS_CACHE_MAX_ENTRIES")
                    .and_then(|n| usize::try_from(n).ok())
                    .unwrap_or(CachePolicy::DEFAULT_MAX_ENTRIES),
            ),
        };

        Self {
            publisher_url,
            aggregator_url,
            timeout,
            cache: CacheConfig { dir, policy },
        }
    }
}
