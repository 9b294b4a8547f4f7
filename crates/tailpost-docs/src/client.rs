//! Google Docs `batchUpdate` client.

use crate::error::DocsError;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use tailpost_config::{DocsSettings, InsertAnchor};
use tailpost_watch::{AppendError, DocumentService};
use tracing::{debug, warn};

/// Appends text to Google Docs documents with a bearer token.
#[derive(Debug, Clone)]
pub struct GoogleDocsClient {
    client: Client,
    api_base: String,
    token: String,
    anchor: InsertAnchor,
}

impl GoogleDocsClient {
    /// Create a client from docs settings and an access token.
    pub fn new(settings: &DocsSettings, token: impl Into<String>) -> Result<Self, DocsError> {
        let client = Client::builder().timeout(settings.timeout()).build()?;
        Ok(Self::with_client(client, settings, token))
    }

    /// Create a client around an existing `reqwest` client.
    #[must_use]
    pub fn with_client(client: Client, settings: &DocsSettings, token: impl Into<String>) -> Self {
        Self {
            client,
            api_base: settings.api_base.trim_end_matches('/').to_string(),
            token: token.into(),
            anchor: settings.anchor,
        }
    }

    fn batch_update_url(&self, document_id: &str) -> String {
        format!(
            "{}/v1/documents/{}:batchUpdate",
            self.api_base,
            urlencoding::encode(document_id)
        )
    }

    fn insert_request(&self, text: &str) -> Value {
        let insert = match self.anchor {
            InsertAnchor::End => json!({
                "text": text,
                "endOfSegmentLocation": { "segmentId": "" }
            }),
            InsertAnchor::Start => json!({
                "text": text,
                "location": { "index": 1 }
            }),
        };
        json!({ "requests": [ { "insertText": insert } ] })
    }
}

#[async_trait]
impl DocumentService for GoogleDocsClient {
    async fn append_text(&self, document_id: &str, text: &str) -> Result<(), AppendError> {
        let url = self.batch_update_url(document_id);
        debug!(document_id, bytes = text.len(), "sending batchUpdate");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .json(&self.insert_request(text))
            .send()
            .await
            .map_err(|e| AppendError::Network(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AppendError::Network(e.to_string()))?;

        if !status.is_success() {
            let err = classify_failure(status, &body);
            warn!(document_id, status = status.as_u16(), category = err.category(), "batchUpdate rejected");
            return Err(err);
        }

        serde_json::from_str::<Value>(&body)
            .map(|_| ())
            .map_err(|e| AppendError::InvalidResponse(e.to_string()))
    }
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: String,
}

/// Map a non-success response to an [`AppendError`] category.
fn classify_failure(status: StatusCode, body: &str) -> AppendError {
    let (message, api_status) = match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => (envelope.error.message, envelope.error.status),
        Err(_) => (body.chars().take(200).collect(), String::new()),
    };
    let message = if message.is_empty() {
        status.to_string()
    } else {
        message
    };

    match status {
        StatusCode::UNAUTHORIZED => AppendError::Unauthorized(message),
        StatusCode::FORBIDDEN if mentions_quota(body, &api_status) => {
            AppendError::QuotaExceeded(message)
        }
        StatusCode::FORBIDDEN => AppendError::Unauthorized(message),
        StatusCode::TOO_MANY_REQUESTS => AppendError::QuotaExceeded(message),
        StatusCode::NOT_FOUND => AppendError::DocumentNotFound(message),
        other => AppendError::Api {
            status: other.as_u16(),
            message,
        },
    }
}

fn mentions_quota(body: &str, api_status: &str) -> bool {
    let lowered = body.to_ascii_lowercase();
    api_status == "RESOURCE_EXHAUSTED"
        || lowered.contains("quota")
        || lowered.contains("ratelimit")
        || lowered.contains("rate limit")
}
