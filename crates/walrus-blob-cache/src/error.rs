//! Error types for the blob cache

use std::fmt;

#[derive(Debug)]
pub enum CacheError {
    /// Filesystem failure while writing or preparing the cache
    Io(Box<std::io::Error>),
    /// Invalid cache bounds
    Config(String),
}

impl fmt::Display for CacheError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheError::Io(err) => write!(f, "Cache IO error: {}", err),
            CacheError::Config(msg) => write!(f, "Cache configuration error: {}", msg),
        }
    }
}

impl std::error::Error for CacheError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CacheError::Io(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

impl From<std::io::Error> for CacheError {
    fn from(err: std::io::Error) -> Self {
        CacheError::Io(Box::new(err))
    }
}

pub type Result<T> = std::result::Result<T, CacheError>;
