//! reqwest-backed transport for the publisher and aggregator

use crate::error::{ApiError, Result, WalrusError};
use crate::transport::{BlobDownload, BlobTransport, UploadBody};
use crate::types::{BlobStoreResponse, UploadOptions};
use async_trait::async_trait;
use bytes::Bytes;
use futures::TryStreamExt;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Body, Client, RequestBuilder, Response};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};

/// HTTP client for the Walrus publisher and aggregator
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    publisher_url: String,
    aggregator_url: String,
    timeout: Duration,
}

impl HttpTransport {
    /// Create a transport. Trailing slashes on the base URLs are ignored.
    ///
    /// `timeout` bounds whole requests. Streamed transfers have no overall
    /// deadline but fail once the peer sends nothing for `timeout`.
    pub fn new(publisher_url: &str, aggregator_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(timeout)
            .read_timeout(timeout)
            .build()
            .map_err(|e| WalrusError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            publisher_url: publisher_url.trim_end_matches('/').to_string(),
            aggregator_url: aggregator_url.trim_end_matches('/').to_string(),
            timeout,
        })
    }

    pub fn publisher_url(&self) -> &str {
        &self.publisher_url
    }

    pub fn aggregator_url(&self) -> &str {
        &self.aggregator_url
    }

    fn blob_url(&self, blob_id: &str) -> String {
        format!(
            "{}/v1/blobs/{}",
            self.aggregator_url,
            urlencoding::encode(blob_id)
        )
    }

    fn object_url(&self, object_id: &str) -> String {
        format!(
            "{}/v1/blobs/by-object-id/{}",
            self.aggregator_url,
            urlencoding::encode(object_id)
        )
    }

    fn upload_url(&self) -> String {
        format!("{}/v1/blobs", self.publisher_url)
    }

    /// Send a request, turning error statuses into [`ApiError`]s
    async fn send(&self, request: RequestBuilder, context: &str) -> Result<Response> {
        let response = request
            .send()
            .await
            .map_err(|e| ApiError::request_failed(&e, context))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.bytes().await.unwrap_or_default();
        warn!(status = %status, context, "Walrus request failed");
        Err(ApiError::from_response(status, &body, context).into())
    }

    async fn read_body(response: Response, context: &str) -> Result<Bytes> {
        response
            .bytes()
            .await
            .map_err(|e| ApiError::request_failed(&e, context).into())
    }
}

#[async_trait]
impl BlobTransport for HttpTransport {
    async fn fetch(&self, blob_id: &str) -> Result<Bytes> {
        let context = format!("Error retrieving blob by blob ID: {}", blob_id);
        let url = self.blob_url(blob_id);
        debug!(url = %url, "Fetching blob");

        let request = self.client.get(&url).timeout(self.timeout);
        let response = self.send(request, &context).await?;
        let data = Self::read_body(response, &context).await?;

        debug!(blob_id, size = data.len(), "Fetched blob");
        Ok(data)
    }

    async fn fetch_stream(&self, blob_id: &str) -> Result<BlobDownload> {
        let context = format!("Error retrieving blob as stream by blob ID: {}", blob_id);
        let url = self.blob_url(blob_id);
        debug!(url = %url, "Opening blob stream");

        let response = self.send(self.client.get(&url), &context).await?;
        let content_length = response.content_length();

        let stream = response
            .bytes_stream()
            .map_err(move |e| WalrusError::from(ApiError::request_failed(&e, &context)));

        Ok(BlobDownload {
            stream: Box::pin(stream),
            content_length,
        })
    }

    async fn fetch_by_object_id(&self, object_id: &str) -> Result<Bytes> {
        let context = format!("Error retrieving blob by object ID: {}", object_id);
        let url = self.object_url(object_id);
        debug!(url = %url, "Fetching blob by object id");

        let request = self.client.get(&url).timeout(self.timeout);
        let response = self.send(request, &context).await?;
        Self::read_body(response, &context).await
    }

    async fn fetch_metadata(&self, blob_id: &str) -> Result<HashMap<String, String>> {
        let context = format!("Error retrieving metadata for blob ID: {}", blob_id);
        let request = self.client.head(self.blob_url(blob_id)).timeout(self.timeout);
        let response = self.send(request, &context).await?;

        Ok(response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect())
    }

    async fn upload(
        &self,
        body: UploadBody,
        options: &UploadOptions,
    ) -> Result<BlobStoreResponse> {
        let request = self
            .client
            .put(self.upload_url())
            .header(CONTENT_TYPE, "application/octet-stream")
            .query(&options.query_params());

        let (request, context) = match body {
            UploadBody::Bytes(data) => {
                debug!(size = data.len(), ?options, "Uploading blob");
                (
                    request.timeout(self.timeout).body(data),
                    "Error uploading blob",
                )
            }
            UploadBody::Stream(stream) => {
                debug!(?options, "Uploading blob from stream");
                (
                    request.body(Body::wrap_stream(stream)),
                    "Error uploading blob from stream",
                )
            }
        };

        let response = self.send(request, context).await?;
        response
            .json::<BlobStoreResponse>()
            .await
            .map_err(|e| ApiError::request_failed(&e, context).into())
    }
}
