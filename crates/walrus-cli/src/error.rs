//! Error types for the Walrus CLI

use std::fmt;

#[derive(Debug)]
pub enum CliError {
    Walrus(walrus_client::WalrusError),
    Io(Box<std::io::Error>),
    Json(serde_json::Error),
    Config(String),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Walrus(err) => write!(f, "{}", err),
            CliError::Io(err) => write!(f, "IO error: {}", err),
            CliError::Json(err) => write!(f, "JSON error: {}", err),
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Walrus(err) => Some(err),
            CliError::Io(err) => Some(err.as_ref()),
            CliError::Json(err) => Some(err),
            _ => None,
        }
    }
}

impl From<walrus_client::WalrusError> for CliError {
    fn from(err: walrus_client::WalrusError) -> Self {
        CliError::Walrus(err)
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        CliError::Io(Box::new(err))
    }
}

impl From<serde_json::Error> for CliError {
    fn from(err: serde_json::Error) -> Self {
        CliError::Json(err)
    }
}

impl From<tracing_subscriber::filter::ParseError> for CliError {
    fn from(err: tracing_subscriber::filter::ParseError) -> Self {
        CliError::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CliError>;
