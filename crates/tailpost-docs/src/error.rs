//! Error types for the Google Docs integration.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while building the Google Docs service.
#[derive(Error, Debug)]
pub enum DocsError {
    /// The HTTP client could not be constructed.
    #[error("HTTP client setup failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The token file could not be read.
    #[error("cannot read token file {}: {source}", path.display())]
    TokenIo {
        /// Token file.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The token file is not valid JSON.
    #[error("token file {} is not valid JSON: {source}", path.display())]
    TokenParse {
        /// Token file.
        path: PathBuf,
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// The token file holds no access token.
    #[error("token file {} has no access token", .0.display())]
    TokenMissing(PathBuf),
}
