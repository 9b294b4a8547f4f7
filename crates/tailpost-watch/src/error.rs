//! Error types for the watch pipeline.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur in the watch loop and its pipeline.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// File system watching error.
    #[error("File watching error: {0}")]
    Watch(String),

    /// New content of a file could not be read.
    #[error(transparent)]
    Read(#[from] ReadError),

    /// A file disappeared while it was being processed.
    #[error("File vanished during processing: {}", .0.display())]
    Vanished(PathBuf),

    /// The remote append was rejected or did not complete.
    #[error(transparent)]
    Append(#[from] AppendError),

    /// The line cache could not be loaded or saved.
    #[error(transparent)]
    Cache(#[from] CacheError),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type for watch operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Failure to produce the text appended to a file.
#[derive(Error, Debug)]
pub enum ReadError {
    /// The file could not be opened, sized or read.
    #[error("failed to read {}: {source}", path.display())]
    Io {
        /// File being read.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// None of the candidate encodings decoded the bytes.
    #[error("no candidate encoding could decode {} from offset {offset}", path.display())]
    Undecodable {
        /// File being read.
        path: PathBuf,
        /// Byte offset the read started at.
        offset: u64,
    },
}

impl ReadError {
    /// Whether the underlying file no longer exists.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ReadError::Io { source, .. } if source.kind() == std::io::ErrorKind::NotFound)
    }
}

/// Failure of a remote append, categorised for diagnosis.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AppendError {
    /// Credentials were missing, expired or rejected.
    #[error("authentication failed: {0}")]
    Unauthorized(String),

    /// The API quota or rate limit was exhausted.
    #[error("quota exceeded: {0}")]
    QuotaExceeded(String),

    /// The target document does not exist or is not visible.
    #[error("document not found: {0}")]
    DocumentNotFound(String),

    /// The request did not complete at the transport level.
    #[error("network error: {0}")]
    Network(String),

    /// The service answered with something that could not be interpreted.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Any other non-success status.
    #[error("API error (status {status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error message from the response body.
        message: String,
    },

    /// Any other failure raised by the service implementation.
    #[error("{0}")]
    Other(String),
}

impl AppendError {
    /// Short category label used in status lines.
    pub fn category(&self) -> &'static str {
        match self {
            AppendError::Unauthorized(_) => "auth",
            AppendError::QuotaExceeded(_) => "quota",
            AppendError::DocumentNotFound(_) => "not-found",
            AppendError::Network(_) => "network",
            AppendError::InvalidResponse(_) => "malformed-response",
            AppendError::Api { .. } => "api",
            AppendError::Other(_) => "other",
        }
    }
}

/// Failure to load or persist the line cache.
#[derive(Error, Debug)]
pub enum CacheError {
    /// The cache file could not be read or written.
    #[error("cache file {}: {source}", path.display())]
    Io {
        /// Cache file.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The cache file is not a JSON array of strings.
    #[error("cache file {} is corrupt: {source}", path.display())]
    Corrupt {
        /// Cache file.
        path: PathBuf,
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },
}
