//! Walrus Client
//!
//! Uploads blobs to a Walrus publisher and reads them back from an
//! aggregator. Reads by blob id go through a disk-backed
//! [`walrus_blob_cache::BlobCache`]; uploads are never cached.

mod client;
mod config;
mod error;
mod http;
mod reader;
mod transport;
mod types;

pub use client::{ProgressFn, WalrusClient};
pub use config::{CacheConfig, ClientConfig};
pub use error::{ApiError, Result, WalrusError};
pub use http::HttpTransport;
pub use reader::BlobReader;
pub use transport::{BlobDownload, BlobTransport, ByteStream, UploadBody, UploadStream};
pub use types::{BlobStoreResponse, UploadOptions};
pub use walrus_blob_cache::{BlobCache, CachePolicy, CacheStats};
