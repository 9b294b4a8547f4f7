//! Credential lookup and service construction.

use crate::client::GoogleDocsClient;
use crate::error::DocsError;
use async_trait::async_trait;
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;
use tailpost_config::{DocsSettings, ENV_ACCESS_TOKEN};
use tailpost_watch::{ServiceProvider, Services, StatusSink};
use tracing::{debug, info, warn};

/// Token file as written by Google's client libraries (authorized user).
#[derive(Debug, Deserialize)]
struct TokenFile {
    token: Option<String>,
    access_token: Option<String>,
}

/// Read the access token from an authorized-user token file.
pub async fn load_token_file(path: &Path) -> Result<String, DocsError> {
    let raw = tokio::fs::read_to_string(path).await.map_err(|source| DocsError::TokenIo {
        path: path.to_path_buf(),
        source,
    })?;
    let parsed: TokenFile = serde_json::from_str(&raw).map_err(|source| DocsError::TokenParse {
        path: path.to_path_buf(),
        source,
    })?;

    parsed
        .token
        .or(parsed.access_token)
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty())
        .ok_or_else(|| DocsError::TokenMissing(path.to_path_buf()))
}

/// Builds a [`GoogleDocsClient`] from an existing access token.
///
/// The token comes from `TAILPOST_ACCESS_TOKEN` or, failing that, the
/// configured token file. Without a token the provider returns `None` and
/// the monitor runs degraded.
#[derive(Debug, Clone)]
pub struct GoogleServiceProvider {
    settings: DocsSettings,
}

impl GoogleServiceProvider {
    /// Create a provider for the given docs settings.
    pub fn new(settings: DocsSettings) -> Self {
        Self { settings }
    }

    async fn resolve_token(&self) -> Result<Option<String>, DocsError> {
        if let Ok(token) = std::env::var(ENV_ACCESS_TOKEN) {
            let token = token.trim();
            if !token.is_empty() {
                debug!("using access token from {}", ENV_ACCESS_TOKEN);
                return Ok(Some(token.to_string()));
            }
        }

        match self.settings.token_file {
            Some(ref path) => load_token_file(path).await.map(Some),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl ServiceProvider for GoogleServiceProvider {
    async fn get_services(&self, sink: &dyn StatusSink) -> Option<Services> {
        let token = match self.resolve_token().await {
            Ok(Some(token)) => token,
            Ok(None) => {
                warn!("no Google access token configured");
                sink.record(&format!(
                    "No Google credentials: set {} or docs.token_file",
                    ENV_ACCESS_TOKEN
                ));
                return None;
            }
            Err(e) => {
                warn!(error = %e, "failed to load Google credentials");
                sink.record(&format!("Google credentials unavailable: {e}"));
                return None;
            }
        };

        match GoogleDocsClient::new(&self.settings, token) {
            Ok(client) => {
                info!(api_base = %self.settings.api_base, "Google Docs service ready");
                sink.record("Connected to Google Docs");
                Some(Services {
                    docs: Some(Arc::new(client)),
                })
            }
            Err(e) => {
                warn!(error = %e, "failed to build Google Docs client");
                sink.record(&format!("Google Docs client unavailable: {e}"));
                None
            }
        }
    }
}
