//! Core traits: the watch backend seam and the collaborators the pipeline
//! depends on.

use crate::{
    error::{AppendError, Result},
    events::{EventFilter, FileEvent},
};
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Watch backend for the single directory the monitor follows.
#[async_trait]
pub trait FileWatcher: Send + Sync {
    /// Set the event sender for this watcher.
    /// This must be called before [`watch`](Self::watch).
    fn set_event_sender(&mut self, sender: mpsc::UnboundedSender<FileEvent>);

    /// Start watching the files directly inside `dir`.
    ///
    /// Fails when `dir` is not a directory or a watch is already active.
    async fn watch(&mut self, dir: PathBuf, config: WatchConfig) -> Result<()>;

    /// Stop the backend entirely, waiting at most `timeout` for it to quiesce.
    ///
    /// No events are delivered after this returns `Ok`.
    async fn shutdown(&mut self, timeout: Duration) -> Result<()>;
}

/// Configuration for the directory watch.
#[derive(Debug, Clone)]
pub struct WatchConfig {
    /// Event filter applied before events are forwarded.
    pub filter: Option<EventFilter>,

    /// Notification debounce tick.
    pub debounce: Duration,
}

impl WatchConfig {
    /// Create a watch configuration with no filter and a 100ms tick.
    pub fn new() -> Self {
        Self {
            filter: None,
            debounce: Duration::from_millis(100),
        }
    }

    /// Set event filter.
    pub fn with_filter(mut self, filter: EventFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Set the notification debounce tick.
    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Remote document that accepts appended text.
#[async_trait]
pub trait DocumentService: Send + Sync {
    /// Insert `text` into the document as one atomic request.
    async fn append_text(&self, document_id: &str, text: &str)
        -> std::result::Result<(), AppendError>;
}

/// Services produced by an authenticated provider.
#[derive(Clone, Default)]
pub struct Services {
    /// Remote document service, absent when it could not be built.
    pub docs: Option<Arc<dyn DocumentService>>,
}

impl std::fmt::Debug for Services {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Services")
            .field("docs", &self.docs.as_ref().map(|_| "<document service>"))
            .finish()
    }
}

/// Builds authenticated services. `None` means degraded mode.
#[async_trait]
pub trait ServiceProvider: Send + Sync {
    /// Acquire credentials and construct services.
    async fn get_services(&self, sink: &dyn StatusSink) -> Option<Services>;
}

/// Receives human-readable status lines.
///
/// Called synchronously from the monitor task; implementations must be cheap.
pub trait StatusSink: Send + Sync {
    /// Record one status line.
    fn record(&self, line: &str);
}

impl<F> StatusSink for F
where
    F: Fn(&str) + Send + Sync,
{
    fn record(&self, line: &str) {
        self(line)
    }
}

/// Status sink that forwards lines to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl StatusSink for TracingSink {
    fn record(&self, line: &str) {
        tracing::info!(target: "tailpost::status", "{line}");
    }
}
