//! Error types for the Walrus client

use serde::Deserialize;
use serde_json::Value;
use std::fmt;
use std::path::PathBuf;
use walrus_blob_cache::CacheError;

/// A failed call to the publisher or aggregator
#[derive(Debug, Clone, PartialEq)]
pub struct ApiError {
    pub code: u16,
    pub status: String,
    pub message: String,
    pub details: Vec<Value>,
    /// What the client was doing when the call failed
    pub context: String,
}

/// Structured error body returned by the Walrus services
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    code: Option<u16>,
    status: Option<String>,
    message: Option<String>,
    #[serde(default)]
    details: Vec<Value>,
}

impl ApiError {
    /// Build from a non-success response, preferring the structured error body
    pub fn from_response(status: reqwest::StatusCode, body: &[u8], context: &str) -> Self {
        if let Ok(envelope) = serde_json::from_slice::<ErrorEnvelope>(body) {
            let err = envelope.error;
            return Self {
                code: err.code.unwrap_or(status.as_u16()),
                status: err.status.unwrap_or_else(|| "UNKNOWN".to_string()),
                message: err.message.unwrap_or_default(),
                details: err.details,
                context: context.to_string(),
            };
        }

        let reason = status.canonical_reason().unwrap_or("UNKNOWN");
        Self {
            code: status.as_u16(),
            status: reason.to_string(),
            message: format!("HTTP {}: {}", status.as_u16(), reason),
            details: Vec::new(),
            context: context.to_string(),
        }
    }

    /// Build from a transport failure that produced no response
    pub fn request_failed(err: &reqwest::Error, context: &str) -> Self {
        Self {
            code: 500,
            status: "REQUEST_FAILED".to_string(),
            message: err.to_string(),
            details: Vec::new(),
            context: context.to_string(),
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.context.is_empty() {
            write!(f, "{}: ", self.context)?;
        }
        write!(f, "HTTP {} - {}: {}", self.code, self.status, self.message)?;
        if !self.details.is_empty() {
            write!(f, " (Details: {})", Value::Array(self.details.clone()))?;
        }
        Ok(())
    }
}

impl std::error::Error for ApiError {}

#[derive(Debug)]
pub enum WalrusError {
    Api(Box<ApiError>),
    Cache(CacheError),
    Io(Box<std::io::Error>),
    FileNotFound(PathBuf),
    Config(String),
}

impl WalrusError {
    /// The remote error, if this failure came from the publisher or aggregator
    pub fn api(&self) -> Option<&ApiError> {
        match self {
            WalrusError::Api(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

impl fmt::Display for WalrusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WalrusError::Api(err) => write!(f, "Walrus API error: {}", err),
            WalrusError::Cache(err) => write!(f, "{}", err),
            WalrusError::Io(err) => write!(f, "IO error: {}", err),
            WalrusError::FileNotFound(path) => write!(f, "File not found: {}", path.display()),
            WalrusError::Config(msg) => write!(f, "Configuration error: {}", msg),
        }
    }
}

impl std::error::Error for WalrusError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            WalrusError::Api(err) => Some(err.as_ref()),
            WalrusError::Cache(err) => Some(err),
            WalrusError::Io(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

impl From<ApiError> for WalrusError {
    fn from(err: ApiError) -> Self {
        WalrusError::Api(Box::new(err))
    }
}

impl From<CacheError> for WalrusError {
    fn from(err: CacheError) -> Self {
        WalrusError::Cache(err)
    }
}

impl From<std::io::Error> for WalrusError {
    fn from(err: std::io::Error) -> Self {
        WalrusError::Io(Box::new(err))
    }
}

pub type Result<T> = std::result::Result<T, WalrusError>;
