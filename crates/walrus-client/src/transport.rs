//! The network side of the client

use crate::error::Result;
use crate::types::{BlobStoreResponse, UploadOptions};
use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use std::collections::HashMap;
use std::pin::Pin;

pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

/// Body of an upload taken from a caller-supplied source
pub type UploadStream = Pin<Box<dyn Stream<Item = std::io::Result<Bytes>> + Send + Sync>>;

/// An in-flight blob download
pub struct BlobDownload {
    pub stream: ByteStream,
    /// Total size, when the aggregator announced it
    pub content_length: Option<u64>,
}

pub enum UploadBody {
    Bytes(Bytes),
    Stream(UploadStream),
}

/// Publisher and aggregator calls the client issues.
///
/// Every method fails with [`crate::WalrusError::Api`] when the service
/// answers with an error status or cannot be reached.
#[async_trait]
pub trait BlobTransport: Send + Sync {
    /// Read a whole blob by blob id
    async fn fetch(&self, blob_id: &str) -> Result<Bytes>;

    /// Open a blob by blob id as a chunk stream
    async fn fetch_stream(&self, blob_id: &str) -> Result<BlobDownload>;

    /// Read a whole blob by the id of its Sui object
    async fn fetch_by_object_id(&self, object_id: &str) -> Result<Bytes>;

    /// Response headers the aggregator reports for a blob
    async fn fetch_metadata(&self, blob_id: &str) -> Result<HashMap<String, String>>;

    /// Store a blob through the publisher
    async fn upload(&self, body: UploadBody, options: &UploadOptions)
        -> Result<BlobStoreResponse>;
}
