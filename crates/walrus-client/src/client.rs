//! Walrus client: cached reads from the aggregator, uploads to the publisher

use crate::config::ClientConfig;
use crate::error::{Result, WalrusError};
use crate::http::HttpTransport;
use crate::reader::BlobReader;
use crate::transport::{BlobTransport, ByteStream, UploadBody};
use crate::types::{BlobStoreResponse, UploadOptions};
use bytes::Bytes;
use futures::{Stream, StreamExt};
use std::collections::HashMap;
use std::io;
use std::path::Path;
use std::sync::Arc;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};
use walrus_blob_cache::BlobCache;

/// Progress callback for streamed reads: `(bytes_so_far, total_bytes)`.
///
/// Only invoked when the total size is known.
pub type ProgressFn = Arc<dyn Fn(u64, u64) + Send + Sync>;

const STAGING_PREFIX: &str = ".walrus-download-";

/// Client for the Walrus publisher and aggregator with a local blob cache.
///
/// Reads by blob id consult the cache first and populate it after a
/// successful download. Uploads never touch the cache.
pub struct WalrusClient {
    transport: Arc<dyn BlobTransport>,
    cache: Arc<BlobCache>,
}

impl WalrusClient {
    /// Create a client talking HTTP to the configured publisher and aggregator
    pub async fn new(config: ClientConfig) -> Result<Self> {
        let transport = HttpTransport::new(
            &config.publisher_url,
            &config.aggregator_url,
            config.timeout,
        )?;
        let cache = BlobCache::open(config.cache.dir, config.cache.policy).await?;
        Ok(Self::with_transport(Arc::new(transport), cache))
    }

    /// Create a client over any transport
    pub fn with_transport(transport: Arc<dyn BlobTransport>, cache: BlobCache) -> Self {
        Self {
            transport,
            cache: Arc::new(cache),
        }
    }

    pub fn cache(&self) -> &BlobCache {
        &self.cache
    }

    /// Retrieve a blob by blob id, from the cache when possible
    pub async fn get_blob(&self, blob_id: &str) -> Result<Bytes> {
        self.read(blob_id, false).await
    }

    /// Retrieve a blob by blob id.
    ///
    /// With `bypass_cache` the aggregator is always asked, and the cache is
    /// refreshed with the answer. Cache failures never fail the read.
    pub async fn read(&self, blob_id: &str, bypass_cache: bool) -> Result<Bytes> {
        if !bypass_cache {
            if let Some(data) = self.cache.get(blob_id).await {
                return Ok(data);
            }
        }

        let data = self.transport.fetch(blob_id).await?;
        populate_cache(&self.cache, blob_id, &data).await;
        Ok(data)
    }

    /// Retrieve a blob by blob id as a chunk stream.
    ///
    /// The blob is cached once the stream has been read to the end without
    /// error. A stream that ends short of its announced length yields an
    /// `UnexpectedEof` error instead of a clean end. Dropping the stream
    /// early closes the download and caches nothing.
    pub async fn get_blob_as_stream(
        &self,
        blob_id: &str,
        progress: Option<ProgressFn>,
    ) -> Result<ByteStream> {
        if let Some(data) = self.cache.get(blob_id).await {
            if let Some(progress) = &progress {
                let len = data.len() as u64;
                progress(len, len);
            }
            return Ok(Box::pin(futures::stream::once(async move { Ok(data) })));
        }

        self.download_stream(blob_id, progress).await
    }

    /// Open a download that populates the cache once read to the end
    async fn download_stream(
        &self,
        blob_id: &str,
        progress: Option<ProgressFn>,
    ) -> Result<ByteStream> {
        let download = self.transport.fetch_stream(blob_id).await?;
        let state = CachingStream {
            inner: download.stream,
            total: download.content_length,
            received: 0,
            buffer: Vec::new(),
            progress,
            cache: Arc::clone(&self.cache),
            blob_id: blob_id.to_string(),
        };

        Ok(Box::pin(futures::stream::try_unfold(state, CachingStream::pull)))
    }

    /// Retrieve a blob by blob id as an [`tokio::io::AsyncRead`]
    pub async fn get_blob_as_reader(
        &self,
        blob_id: &str,
        progress: Option<ProgressFn>,
    ) -> Result<BlobReader> {
        Ok(BlobReader::new(self.get_blob_as_stream(blob_id, progress).await?))
    }

    /// Retrieve a blob by blob id and save it to `path`.
    ///
    /// The download goes to a staging file next to `path` that is moved into
    /// place only once complete; it is removed on any failure.
    pub async fn get_blob_as_file(
        &self,
        blob_id: &str,
        path: impl AsRef<Path>,
        progress: Option<ProgressFn>,
    ) -> Result<()> {
        let path = path.as_ref();

        if let Some(data) = self.cache.get(blob_id).await {
            fs::write(path, &data).await?;
            return Ok(());
        }

        let mut stream = self.download_stream(blob_id, progress).await?;

        let parent = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let staging = tempfile::Builder::new()
            .prefix(STAGING_PREFIX)
            .tempfile_in(parent)?;
        let mut file = fs::File::from_std(staging.as_file().try_clone()?);

        while let Some(chunk) = stream.next().await {
            file.write_all(&chunk?).await?;
        }
        file.flush().await?;
        drop(file);

        staging
            .persist(path)
            .map_err(|e| WalrusError::from(e.error))?;
        debug!(blob_id, path = ?path, "Saved blob to file");
        Ok(())
    }

    /// Retrieve a blob by the id of its Sui object. Not cached.
    pub async fn get_blob_by_object_id(&self, object_id: &str) -> Result<Bytes> {
        self.transport.fetch_by_object_id(object_id).await
    }

    /// Response headers the aggregator reports for a blob
    pub async fn get_blob_metadata(&self, blob_id: &str) -> Result<HashMap<String, String>> {
        self.transport.fetch_metadata(blob_id).await
    }

    /// Upload a blob to the publisher
    pub async fn put_blob(
        &self,
        data: impl Into<Bytes>,
        options: &UploadOptions,
    ) -> Result<BlobStoreResponse> {
        self.transport
            .upload(UploadBody::Bytes(data.into()), options)
            .await
    }

    /// Upload the contents of a file to the publisher
    pub async fn put_blob_from_file(
        &self,
        path: impl AsRef<Path>,
        options: &UploadOptions,
    ) -> Result<BlobStoreResponse> {
        let path = path.as_ref();
        let is_file = fs::metadata(path)
            .await
            .map(|m| m.is_file())
            .unwrap_or(false);
        if !is_file {
            return Err(WalrusError::FileNotFound(path.to_path_buf()));
        }

        let data = fs::read(path).await?;
        self.put_blob(data, options).await
    }

    /// Upload a blob from a byte stream to the publisher
    pub async fn put_blob_from_stream<S>(
        &self,
        stream: S,
        options: &UploadOptions,
    ) -> Result<BlobStoreResponse>
    where
        S: Stream<Item = std::io::Result<Bytes>> + Send + Sync + 'static,
    {
        self.transport
            .upload(UploadBody::Stream(Box::pin(stream)), options)
            .await
    }

    /// Shut the client down, removing the cache directory if the cache
    /// created it
    pub async fn shutdown(self) {
        if self.cache.owns_dir() {
            self.cache.teardown().await;
        }
    }
}

/// Stream state that forwards chunks and caches the whole blob at the end
struct CachingStream {
    inner: ByteStream,
    total: Option<u64>,
    received: u64,
    buffer: Vec<u8>,
    progress: Option<ProgressFn>,
    cache: Arc<BlobCache>,
    blob_id: String,
}

impl CachingStream {
    async fn pull(mut self) -> Result<Option<(Bytes, Self)>> {
        match self.inner.next().await {
            Some(chunk) => {
                let chunk = chunk?;
                self.received += chunk.len() as u64;
                self.buffer.extend_from_slice(&chunk);
                if let (Some(total), Some(progress)) = (self.total, &self.progress) {
                    progress(self.received, total);
                }
                Ok(Some((chunk, self)))
            }
            None => {
                if let Some(total) = self.total.filter(|&total| total != self.received) {
                    warn!(
                        blob_id = %self.blob_id,
                        expected = total,
                        received = self.received,
                        "Stream length mismatch, not caching"
                    );
                    return Err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        format!(
                            "blob {} ended after {} of {} bytes",
                            self.blob_id, self.received, total
                        ),
                    )
                    .into());
                }
                populate_cache(&self.cache, &self.blob_id, &self.buffer).await;
                Ok(None)
            }
        }
    }
}

/// Cache a downloaded blob; failures are logged and swallowed
async fn populate_cache(cache: &BlobCache, blob_id: &str, data: &[u8]) {
    if let Err(e) = cache.put(blob_id, data).await {
        warn!(blob_id, error = %e, "Failed to cache blob");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiError;
    use crate::transport::BlobDownload;
    use async_trait::async_trait;
    use reqwest::StatusCode;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tempfile::tempdir;
    use tokio::io::AsyncReadExt;
    use walrus_blob_cache::CachePolicy;

    /// In-memory aggregator/publisher that counts calls
    #[derive(Default)]
    struct FakeTransport {
        blobs: Mutex<HashMap<String, Bytes>>,
        fetches: AtomicUsize,
        uploads: AtomicUsize,
        chunk_size: usize,
        hide_length: bool,
        fail_after_first_chunk: bool,
        /// Cut the body to this many bytes while announcing the full length
        truncate_to: Option<usize>,
    }

    impl FakeTransport {
        fn with_blob(blob_id: &str, data: &[u8]) -> Self {
            let transport = Self {
                chunk_size: 4,
                ..Default::default()
            };
            transport.insert(blob_id, data);
            transport
        }

        fn insert(&self, blob_id: &str, data: &[u8]) {
            self.blobs
                .lock()
                .unwrap()
                .insert(blob_id.to_string(), Bytes::copy_from_slice(data));
        }

        fn fetches(&self) -> usize {
            self.fetches.load(Ordering::SeqCst)
        }

        fn lookup(&self, blob_id: &str) -> Result<Bytes> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            self.blobs
                .lock()
                .unwrap()
                .get(blob_id)
                .cloned()
                .ok_or_else(|| {
                    ApiError::from_response(StatusCode::NOT_FOUND, b"", "Error retrieving blob")
                        .into()
                })
        }
    }

    #[async_trait]
    impl BlobTransport for FakeTransport {
        async fn fetch(&self, blob_id: &str) -> Result<Bytes> {
            self.lookup(blob_id)
        }

        async fn fetch_stream(&self, blob_id: &str) -> Result<BlobDownload> {
            let mut data = self.lookup(blob_id)?;
            let content_length = (!self.hide_length).then_some(data.len() as u64);
            if let Some(len) = self.truncate_to {
                data.truncate(len);
            }

            let mut chunks: Vec<Result<Bytes>> = data
                .chunks(self.chunk_size)
                .map(|c| Ok(Bytes::copy_from_slice(c)))
                .collect();
            if self.fail_after_first_chunk {
                chunks.truncate(1);
                chunks.push(Err(WalrusError::Config("connection reset".to_string())));
            }

            Ok(BlobDownload {
                stream: Box::pin(futures::stream::iter(chunks)),
                content_length,
            })
        }

        async fn fetch_by_object_id(&self, object_id: &str) -> Result<Bytes> {
            self.lookup(object_id)
        }

        async fn fetch_metadata(&self, blob_id: &str) -> Result<HashMap<String, String>> {
            let data = self.lookup(blob_id)?;
            Ok(HashMap::from([(
                "content-length".to_string(),
                data.len().to_string(),
            )]))
        }

        async fn upload(
            &self,
            body: UploadBody,
            _options: &UploadOptions,
        ) -> Result<BlobStoreResponse> {
            self.uploads.fetch_add(1, Ordering::SeqCst);
            let data = match body {
                UploadBody::Bytes(data) => data.to_vec(),
                UploadBody::Stream(mut stream) => {
                    let mut data = Vec::new();
                    while let Some(chunk) = stream.next().await {
                        data.extend_from_slice(&chunk?);
                    }
                    data
                }
            };
            let blob_id = format!("blob-{}", data.len());
            self.insert(&blob_id, &data);
            Ok(BlobStoreResponse(serde_json::json!({
                "newlyCreated": { "blobObject": { "blobId": blob_id } }
            })))
        }
    }

    async fn client_with(
        transport: Arc<FakeTransport>,
        dir: &Path,
        policy: CachePolicy,
    ) -> WalrusClient {
        let cache = BlobCache::open(Some(dir.to_path_buf()), policy).await.unwrap();
        WalrusClient::with_transport(transport, cache)
    }

    fn recorder() -> (ProgressFn, Arc<Mutex<Vec<(u64, u64)>>>) {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&calls);
        let progress: ProgressFn = Arc::new(move |so_far: u64, total: u64| {
            sink.lock().unwrap().push((so_far, total));
        });
        (progress, calls)
    }

    #[tokio::test]
    async fn test_get_blob_caches_download() {
        let dir = tempdir().unwrap();
        let transport = Arc::new(FakeTransport::with_blob("blob-1", b"hello walrus"));
        let client = client_with(transport.clone(), dir.path(), CachePolicy::default()).await;

        assert_eq!(&client.get_blob("blob-1").await.unwrap()[..], b"hello walrus");
        assert_eq!(&client.get_blob("blob-1").await.unwrap()[..], b"hello walrus");

        assert_eq!(transport.fetches(), 1);
        assert_eq!(client.cache().stats().await.hits, 1);
    }

    #[tokio::test]
    async fn test_bypass_cache_always_fetches() {
        let dir = tempdir().unwrap();
        let transport = Arc::new(FakeTransport::with_blob("blob-1", b"v1"));
        let client = client_with(transport.clone(), dir.path(), CachePolicy::default()).await;

        client.get_blob("blob-1").await.unwrap();
        transport.insert("blob-1", b"v2");

        assert_eq!(&client.read("blob-1", true).await.unwrap()[..], b"v2");
        assert_eq!(transport.fetches(), 2);
        // The bypassing read refreshed the cache
        assert_eq!(&client.get_blob("blob-1").await.unwrap()[..], b"v2");
        assert_eq!(transport.fetches(), 2);
    }

    #[tokio::test]
    async fn test_remote_error_is_propagated_and_not_cached() {
        let dir = tempdir().unwrap();
        let transport = Arc::new(FakeTransport::default());
        let client = client_with(transport.clone(), dir.path(), CachePolicy::default()).await;

        let err = client.get_blob("missing").await.unwrap_err();
        assert_eq!(err.api().map(|e| e.code), Some(404));
        assert!(client.cache().is_empty().await);
    }

    #[tokio::test]
    async fn test_eviction_triggers_new_fetch() {
        let dir = tempdir().unwrap();
        let transport = Arc::new(FakeTransport::with_blob("a", b"1"));
        transport.insert("b", b"2");
        let client = client_with(transport.clone(), dir.path(), CachePolicy::MaxEntries(1)).await;

        client.get_blob("a").await.unwrap();
        client.get_blob("b").await.unwrap();
        assert!(!client.cache().contains("a").await);

        client.get_blob("a").await.unwrap();
        assert_eq!(transport.fetches(), 3);
    }

    #[tokio::test]
    async fn test_cache_write_failure_does_not_fail_read() {
        let dir = tempdir().unwrap();
        let cache_dir = dir.path().join("cache");
        let transport = Arc::new(FakeTransport::with_blob("blob-1", b"data"));
        let client = client_with(transport.clone(), &cache_dir, CachePolicy::default()).await;

        std::fs::remove_dir_all(&cache_dir).unwrap();

        assert_eq!(&client.get_blob("blob-1").await.unwrap()[..], b"data");
        assert!(client.cache().is_empty().await);
    }

    #[tokio::test]
    async fn test_corrupted_cache_file_falls_back_to_network() {
        let dir = tempdir().unwrap();
        let transport = Arc::new(FakeTransport::with_blob("blob-1", b"data"));
        let client = client_with(transport.clone(), dir.path(), CachePolicy::default()).await;

        client.get_blob("blob-1").await.unwrap();
        std::fs::remove_file(dir.path().join(BlobCache::cache_file_name("blob-1"))).unwrap();

        assert_eq!(&client.get_blob("blob-1").await.unwrap()[..], b"data");
        assert_eq!(transport.fetches(), 2);
        assert!(client.cache().contains("blob-1").await);
    }

    #[tokio::test]
    async fn test_oversize_blob_is_returned_but_not_cached() {
        let dir = tempdir().unwrap();
        let transport = Arc::new(FakeTransport::with_blob("big", &[1u8; 64]));
        let policy = CachePolicy::MaxBytes {
            max_bytes: 16,
            ttl: std::time::Duration::from_secs(60),
        };
        let client = client_with(transport.clone(), dir.path(), policy).await;

        assert_eq!(client.get_blob("big").await.unwrap().len(), 64);
        assert!(client.cache().is_empty().await);
    }

    #[tokio::test]
    async fn test_uploads_bypass_cache() {
        let dir = tempdir().unwrap();
        let transport = Arc::new(FakeTransport::default());
        let client = client_with(transport.clone(), dir.path(), CachePolicy::default()).await;

        let response = client
            .put_blob(b"payload".to_vec(), &UploadOptions::default())
            .await
            .unwrap();
        assert_eq!(response.blob_id(), Some("blob-7"));

        let chunks: Vec<std::io::Result<Bytes>> = vec![Ok(Bytes::from_static(b"abc"))];
        client
            .put_blob_from_stream(futures::stream::iter(chunks), &UploadOptions::default())
            .await
            .unwrap();

        assert!(client.cache().is_empty().await);
        assert_eq!(transport.uploads.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_put_blob_from_file() {
        let dir = tempdir().unwrap();
        let transport = Arc::new(FakeTransport::default());
        let client = client_with(transport.clone(), &dir.path().join("cache"), CachePolicy::default()).await;

        let path = dir.path().join("upload.bin");
        std::fs::write(&path, b"file contents").unwrap();

        let response = client
            .put_blob_from_file(&path, &UploadOptions::default())
            .await
            .unwrap();
        assert_eq!(response.blob_id(), Some("blob-13"));

        let err = client
            .put_blob_from_file(dir.path().join("missing.bin"), &UploadOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, WalrusError::FileNotFound(_)));

        // A directory is not an uploadable file
        let err = client
            .put_blob_from_file(dir.path(), &UploadOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, WalrusError::FileNotFound(_)));
        assert_eq!(transport.uploads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_stream_caches_after_completion() {
        let dir = tempdir().unwrap();
        let transport = Arc::new(FakeTransport::with_blob("blob-1", b"0123456789"));
        let client = client_with(transport.clone(), dir.path(), CachePolicy::default()).await;
        let (progress, calls) = recorder();

        let mut stream = client
            .get_blob_as_stream("blob-1", Some(progress))
            .await
            .unwrap();

        let first = stream.next().await.unwrap().unwrap();
        assert_eq!(&first[..], b"0123");
        // Nothing is cached while the download is still in progress
        assert!(!client.cache().contains("blob-1").await);

        let mut data = first.to_vec();
        while let Some(chunk) = stream.next().await {
            data.extend_from_slice(&chunk.unwrap());
        }

        assert_eq!(data, b"0123456789");
        assert!(client.cache().contains("blob-1").await);
        assert_eq!(*calls.lock().unwrap(), vec![(4, 10), (8, 10), (10, 10)]);
    }

    #[tokio::test]
    async fn test_stream_hit_skips_network() {
        let dir = tempdir().unwrap();
        let transport = Arc::new(FakeTransport::with_blob("blob-1", b"cached"));
        let client = client_with(transport.clone(), dir.path(), CachePolicy::default()).await;

        client.get_blob("blob-1").await.unwrap();

        let chunks: Vec<Bytes> = client
            .get_blob_as_stream("blob-1", None)
            .await
            .unwrap()
            .map(|c| c.unwrap())
            .collect()
            .await;
        assert_eq!(chunks.concat(), b"cached");
        assert_eq!(transport.fetches(), 1);
    }

    #[tokio::test]
    async fn test_dropped_stream_caches_nothing() {
        let dir = tempdir().unwrap();
        let transport = Arc::new(FakeTransport::with_blob("blob-1", b"0123456789"));
        let client = client_with(transport.clone(), dir.path(), CachePolicy::default()).await;

        let mut stream = client.get_blob_as_stream("blob-1", None).await.unwrap();
        stream.next().await.unwrap().unwrap();
        drop(stream);

        assert!(!client.cache().contains("blob-1").await);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_failed_stream_caches_nothing() {
        let dir = tempdir().unwrap();
        let transport = Arc::new(FakeTransport {
            chunk_size: 4,
            fail_after_first_chunk: true,
            ..Default::default()
        });
        transport.insert("blob-1", b"0123456789");
        let client = client_with(transport.clone(), dir.path(), CachePolicy::default()).await;

        let results: Vec<Result<Bytes>> = client
            .get_blob_as_stream("blob-1", None)
            .await
            .unwrap()
            .collect()
            .await;

        assert_eq!(results.len(), 2);
        assert!(results[1].is_err());
        assert!(!client.cache().contains("blob-1").await);
    }

    #[tokio::test]
    async fn test_unknown_length_skips_progress() {
        let dir = tempdir().unwrap();
        let transport = Arc::new(FakeTransport {
            chunk_size: 3,
            hide_length: true,
            ..Default::default()
        });
        transport.insert("blob-1", b"abcdefg");
        let client = client_with(transport.clone(), dir.path(), CachePolicy::default()).await;
        let (progress, calls) = recorder();

        let mut reader = client
            .get_blob_as_reader("blob-1", Some(progress))
            .await
            .unwrap();
        let mut data = Vec::new();
        reader.read_to_end(&mut data).await.unwrap();

        assert_eq!(data, b"abcdefg");
        assert!(calls.lock().unwrap().is_empty());
        assert!(client.cache().contains("blob-1").await);
    }

    #[tokio::test]
    async fn test_get_blob_as_file() {
        let dir = tempdir().unwrap();
        let transport = Arc::new(FakeTransport::with_blob("blob-1", b"file body"));
        let client = client_with(transport.clone(), &dir.path().join("cache"), CachePolicy::default()).await;

        let out_dir = dir.path().join("out");
        std::fs::create_dir(&out_dir).unwrap();
        let first = out_dir.join("first.bin");
        let second = out_dir.join("second.bin");

        client.get_blob_as_file("blob-1", &first, None).await.unwrap();
        client.get_blob_as_file("blob-1", &second, None).await.unwrap();

        assert_eq!(std::fs::read(&first).unwrap(), b"file body");
        assert_eq!(std::fs::read(&second).unwrap(), b"file body");
        assert_eq!(transport.fetches(), 1);
        // No staging files left next to the destinations
        assert_eq!(std::fs::read_dir(&out_dir).unwrap().count(), 2);
    }

    #[tokio::test]
    async fn test_get_blob_as_file_failure_cleans_up() {
        let dir = tempdir().unwrap();
        let transport = Arc::new(FakeTransport {
            chunk_size: 2,
            fail_after_first_chunk: true,
            ..Default::default()
        });
        transport.insert("blob-1", b"0123456789");
        let client = client_with(transport.clone(), &dir.path().join("cache"), CachePolicy::default()).await;

        let out_dir = dir.path().join("out");
        std::fs::create_dir(&out_dir).unwrap();
        let target = out_dir.join("blob.bin");

        assert!(client.get_blob_as_file("blob-1", &target, None).await.is_err());
        assert!(!target.exists());
        assert_eq!(std::fs::read_dir(&out_dir).unwrap().count(), 0);
        assert!(!client.cache().contains("blob-1").await);
    }

    #[tokio::test]
    async fn test_short_stream_is_an_error() {
        let dir = tempdir().unwrap();
        let transport = Arc::new(FakeTransport {
            chunk_size: 4,
            truncate_to: Some(4),
            ..Default::default()
        });
        transport.insert("blob-1", b"0123456789");
        let client = client_with(transport.clone(), dir.path(), CachePolicy::default()).await;

        let results: Vec<Result<Bytes>> = client
            .get_blob_as_stream("blob-1", None)
            .await
            .unwrap()
            .collect()
            .await;

        assert_eq!(results.len(), 2);
        assert_eq!(&results[0].as_ref().unwrap()[..], b"0123");
        match &results[1] {
            Err(WalrusError::Io(err)) => assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof),
            other => panic!("unexpected result: {:?}", other),
        }
        assert!(!client.cache().contains("blob-1").await);
    }

    #[tokio::test]
    async fn test_get_blob_as_file_rejects_short_stream() {
        let dir = tempdir().unwrap();
        let transport = Arc::new(FakeTransport {
            chunk_size: 4,
            truncate_to: Some(4),
            ..Default::default()
        });
        transport.insert("blob-1", b"0123456789");
        let client = client_with(transport.clone(), &dir.path().join("cache"), CachePolicy::default()).await;

        let out_dir = dir.path().join("out");
        std::fs::create_dir(&out_dir).unwrap();
        let target = out_dir.join("blob.bin");

        assert!(client.get_blob_as_file("blob-1", &target, None).await.is_err());
        assert!(!target.exists());
        assert_eq!(std::fs::read_dir(&out_dir).unwrap().count(), 0);
        assert!(!client.cache().contains("blob-1").await);
    }

    #[tokio::test]
    async fn test_object_id_and_metadata_are_not_cached() {
        let dir = tempdir().unwrap();
        let transport = Arc::new(FakeTransport::with_blob("0xobject", b"by object"));
        let client = client_with(transport.clone(), dir.path(), CachePolicy::default()).await;

        assert_eq!(
            &client.get_blob_by_object_id("0xobject").await.unwrap()[..],
            b"by object"
        );
        let metadata = client.get_blob_metadata("0xobject").await.unwrap();
        assert_eq!(metadata.get("content-length").map(String::as_str), Some("9"));

        assert!(client.cache().is_empty().await);
    }

    #[tokio::test]
    async fn test_shutdown_removes_owned_cache_dir() {
        let transport = Arc::new(FakeTransport::with_blob("blob-1", b"data"));
        let cache = BlobCache::open(None, CachePolicy::default()).await.unwrap();
        let cache_dir = cache.dir().to_path_buf();
        let client = WalrusClient::with_transport(transport, cache);

        client.get_blob("blob-1").await.unwrap();
        assert!(cache_dir.is_dir());

        client.shutdown().await;
        assert!(!cache_dir.exists());
    }

    #[tokio::test]
    async fn test_shutdown_keeps_provided_cache_dir() {
        let dir = tempdir().unwrap();
        let transport = Arc::new(FakeTransport::with_blob("blob-1", b"data"));
        let client = client_with(transport, dir.path(), CachePolicy::default()).await;

        client.get_blob("blob-1").await.unwrap();
        client.shutdown().await;

        assert!(dir.path().is_dir());
    }
}
