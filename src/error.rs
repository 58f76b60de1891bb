//! Error types for every stage of a subtitle run
//!
//! Each stage has its own error kind so callers can tell retryable remote
//! failures apart from fatal ones.

use std::path::PathBuf;

/// Failure to compute the content fingerprint of a video
#[derive(Debug, thiserror::Error)]
pub enum FingerprintError {
    #[error("file is too small to be hashed ({size} bytes, need at least {min})")]
    TooSmall { size: u64, min: u64 },

    #[error("IO error while hashing: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure of a single remote procedure call
#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    #[error("network error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("server answered with HTTP status {0}")]
    HttpStatus(u16),

    #[error("invalid XML in response: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("server fault {code}: {message}")]
    Fault { code: i64, message: String },

    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

impl RpcError {
    /// Whether a second attempt may succeed where this one failed
    pub fn is_transient(&self) -> bool {
        matches!(self, RpcError::Transport(_) | RpcError::HttpStatus(_))
    }
}

/// Failure to open a session with the subtitle service (always fatal)
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    #[error("the server refused the connection: {0}")]
    Refused(String),

    #[error("unable to reach the subtitle server: {0}")]
    Unreachable(#[source] RpcError),
}

/// Failure of one language search (non-fatal)
#[derive(Debug, thiserror::Error)]
#[error("search for language '{language}' failed: {source}")]
pub struct SearchError {
    pub language: String,
    #[source]
    pub source: RpcError,
}

/// Failure to fetch and write a subtitle file (fatal for the run)
#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    #[error("transfer failed: {0}")]
    Transfer(String),

    #[error("could not decompress the subtitle payload: {0}")]
    Decompress(#[source] std::io::Error),

    #[error("could not write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("subtitle file {0} is missing after download")]
    Missing(PathBuf),

    #[error("download worker stopped unexpectedly")]
    WorkerPanicked,
}

impl From<reqwest::Error> for DownloadError {
    fn from(err: reqwest::Error) -> Self {
        DownloadError::Transfer(err.to_string())
    }
}

/// Invalid or unreadable settings
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("at least one subtitle language must be configured")]
    NoLanguages,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Top-level error of the binary
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
}
