//! Request and response types for the publisher and aggregator

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Options recognized by blob uploads. Unset options are left to the publisher.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadOptions {
    /// Storage encoding hint
    pub encoding_type: Option<String>,
    /// Number of epochs ahead of the current one to store the blob
    pub epochs: Option<u32>,
    /// Create a deletable blob instead of a permanent one
    pub deletable: Option<bool>,
    /// Sui address that receives the resulting blob object
    pub send_object_to: Option<String>,
}

impl UploadOptions {
    /// Query parameters for `PUT /v1/blobs`
    pub fn query_params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(encoding_type) = &self.encoding_type {
            params.push(("encoding_type", encoding_type.clone()));
        }
        if let Some(epochs) = self.epochs {
            params.push(("epochs", epochs.to_string()));
        }
        if let Some(deletable) = self.deletable {
            params.push(("deletable", deletable.to_string()));
        }
        if let Some(send_object_to) = &self.send_object_to {
            params.push(("send_object_to", send_object_to.clone()));
        }
        params
    }
}

/// Publisher response to a blob upload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlobStoreResponse(pub Value);

impl BlobStoreResponse {
    /// Blob id of a newly created or an already certified blob
    pub fn blob_id(&self) -> Option<&str> {
        self.0
            .pointer("/newlyCreated/blobObject/blobId")
            .or_else(|| self.0.pointer("/alreadyCertified/blobId"))
            .and_then(Value::as_str)
    }

    /// Whether the publisher reported the blob as already stored
    pub fn already_certified(&self) -> bool {
        self.0.get("alreadyCertified").is_some()
    }

    pub fn as_json(&self) -> &Value {
        &self.0
    }
}
