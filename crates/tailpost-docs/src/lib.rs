//! Google Docs backed [`DocumentService`](tailpost_watch::DocumentService)
//! and the [`ServiceProvider`](tailpost_watch::ServiceProvider) that builds it
//! from an existing access token.

#![warn(missing_docs)]
#![deny(unsafe_code)]

mod client;
mod error;
mod provider;

pub use client::GoogleDocsClient;
pub use error::DocsError;
pub use provider::{load_token_file, GoogleServiceProvider};
