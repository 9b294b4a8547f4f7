//! Fake collaborators for tests.
//!
//! Enabled for this crate's own tests and, through the `test-utils`
//! feature, for downstream crates.

use crate::error::AppendError;
use crate::traits::{DocumentService, ServiceProvider, Services, StatusSink};
use async_trait::async_trait;
use std::sync::{Arc, Mutex, MutexGuard};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// One call made to a [`MockDocumentService`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppendCall {
    /// Target document.
    pub document_id: String,
    /// Text sent.
    pub text: String,
    /// Whether the call was answered with success.
    pub succeeded: bool,
}

/// Document service that records calls and fails on demand.
#[derive(Debug, Default)]
pub struct MockDocumentService {
    calls: Mutex<Vec<AppendCall>>,
    failure: Mutex<Option<AppendError>>,
}

impl MockDocumentService {
    /// Create a service that accepts every append.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Create a service that rejects every append with `error`.
    pub fn failing(error: AppendError) -> Arc<Self> {
        let service = Self::new();
        service.fail_with(Some(error));
        service
    }

    /// Reject subsequent appends with `error`, or accept them again with `None`.
    pub fn fail_with(&self, error: Option<AppendError>) {
        *lock(&self.failure) = error;
    }

    /// Every call, successful or not.
    pub fn calls(&self) -> Vec<AppendCall> {
        lock(&self.calls).clone()
    }

    /// Texts of successful calls.
    pub fn appended(&self) -> Vec<String> {
        lock(&self.calls)
            .iter()
            .filter(|call| call.succeeded)
            .map(|call| call.text.clone())
            .collect()
    }

    /// Number of calls made.
    pub fn attempts(&self) -> usize {
        lock(&self.calls).len()
    }
}

#[async_trait]
impl DocumentService for MockDocumentService {
    async fn append_text(&self, document_id: &str, text: &str) -> Result<(), AppendError> {
        let failure = lock(&self.failure).clone();
        lock(&self.calls).push(AppendCall {
            document_id: document_id.to_string(),
            text: text.to_string(),
            succeeded: failure.is_none(),
        });
        match failure {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

/// Provider returning a fixed set of services.
#[derive(Debug, Clone, Default)]
pub struct StaticServiceProvider {
    services: Option<Services>,
}

impl StaticServiceProvider {
    /// Provider handing out `docs`.
    pub fn with_docs(docs: Arc<dyn DocumentService>) -> Self {
        Self {
            services: Some(Services { docs: Some(docs) }),
        }
    }

    /// Provider that never authenticates.
    pub fn degraded() -> Self {
        Self { services: None }
    }
}

#[async_trait]
impl ServiceProvider for StaticServiceProvider {
    async fn get_services(&self, sink: &dyn StatusSink) -> Option<Services> {
        if self.services.is_none() {
            sink.record("No credentials available");
        }
        self.services.clone()
    }
}

/// Status sink that keeps every line.
#[derive(Debug, Default)]
pub struct CollectingSink {
    lines: Mutex<Vec<String>>,
}

impl CollectingSink {
    /// Create an empty sink.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Lines recorded so far.
    pub fn lines(&self) -> Vec<String> {
        lock(&self.lines).clone()
    }

    /// Whether any recorded line contains `needle`.
    pub fn contains(&self, needle: &str) -> bool {
        lock(&self.lines).iter().any(|line| line.contains(needle))
    }
}

impl StatusSink for CollectingSink {
    fn record(&self, line: &str) {
        lock(&self.lines).push(line.to_string());
    }
}
