//! Notify-based file watching backend.

use crate::{
    error::{Error, Result},
    events::{EventFilter, FileEvent, FileEventKind},
    traits::{FileWatcher, WatchConfig},
};

use async_trait::async_trait;
use notify::{EventKind, RecommendedWatcher, RecursiveMode};
use notify_debouncer_full::{
    new_debouncer, DebounceEventResult, DebouncedEvent, Debouncer, RecommendedCache,
};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, trace, warn};

/// The watched directory and its filter.
#[derive(Debug, Clone)]
struct WatchedDir {
    /// Path as passed to `watch`.
    given: PathBuf,
    /// Canonical form; some backends report events under it.
    canonical: PathBuf,
    filter: Option<EventFilter>,
}

impl WatchedDir {
    fn new(dir: PathBuf, filter: Option<EventFilter>) -> Self {
        let canonical = std::fs::canonicalize(&dir).unwrap_or_else(|_| dir.clone());
        Self {
            given: dir,
            canonical,
            filter,
        }
    }

    fn contains(&self, path: &Path) -> bool {
        path.starts_with(&self.given) || path.starts_with(&self.canonical)
    }
}

type SharedDir = Arc<RwLock<Option<WatchedDir>>>;

/// Notify-based file watcher with debouncing support.
///
/// Events are converted and filtered on the notify thread; only accepted
/// create/modify events for files are forwarded to the event sender.
pub struct NotifyWatcher {
    /// Debounced file system watcher
    debouncer: Option<Debouncer<RecommendedWatcher, RecommendedCache>>,
    /// Event sender
    event_sender: Option<mpsc::UnboundedSender<FileEvent>>,
    /// Watched directory, shared with the notify callback
    watched: SharedDir,
}

impl NotifyWatcher {
    /// Create a new notify-based watcher.
    pub fn new() -> Self {
        Self {
            debouncer: None,
            event_sender: None,
            watched: Arc::new(RwLock::new(None)),
        }
    }

    fn start_debouncer(
        &self,
        sender: mpsc::UnboundedSender<FileEvent>,
        tick: Duration,
    ) -> Result<Debouncer<RecommendedWatcher, RecommendedCache>> {
        let watched = Arc::clone(&self.watched);

        new_debouncer(tick, None, move |result: DebounceEventResult| match result {
            Ok(events) => {
                for file_event in events.into_iter().flat_map(Self::convert_notify_event) {
                    if !Self::accepts(&watched, &file_event) {
                        continue;
                    }
                    debug!(
                        path = %file_event.path.display(),
                        kind = file_event.kind.as_str(),
                        "file change detected"
                    );
                    if let Err(e) = sender.send(file_event) {
                        error!("Failed to send file event: {}", e);
                    }
                }
            }
            Err(errors) => {
                for error in errors {
                    error!("Notify error: {:?}", error);
                }
            }
        })
        .map_err(|e| Error::Watch(format!("Failed to create notify watcher: {}", e)))
    }

    /// Convert a notify event to file events, one per path.
    ///
    /// Only creations and modifications are kept.
    fn convert_notify_event(event: DebouncedEvent) -> Vec<FileEvent> {
        let kind = match event.event.kind {
            EventKind::Create(_) => FileEventKind::Created,
            EventKind::Modify(_) => FileEventKind::Modified,
            other => {
                trace!("Ignoring notify event kind {:?}", other);
                return Vec::new();
            }
        };

        event
            .event
            .paths
            .into_iter()
            .map(|path| FileEvent::new(kind, path))
            .collect()
    }

    fn accepts(watched: &SharedDir, event: &FileEvent) -> bool {
        let guard = watched.read().unwrap_or_else(|poisoned| poisoned.into_inner());
        let Some(dir) = guard.as_ref() else {
            return false;
        };

        if !dir.contains(&event.path) {
            trace!(path = %event.path.display(), "event outside watched directory");
            return false;
        }

        match dir.filter {
            Some(ref filter) => filter.matches(event),
            None => !event.is_dir,
        }
    }
}

impl Default for NotifyWatcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FileWatcher for NotifyWatcher {
    fn set_event_sender(&mut self, sender: mpsc::UnboundedSender<FileEvent>) {
        self.event_sender = Some(sender);
    }

    async fn watch(&mut self, dir: PathBuf, config: WatchConfig) -> Result<()> {
        debug!("Adding watch for: {}", dir.display());

        if self.debouncer.is_some() {
            return Err(Error::Watch(format!(
                "Already watching a directory, cannot add {}",
                dir.display()
            )));
        }

        if !dir.is_dir() {
            return Err(Error::Watch(format!(
                "Watch target is not a directory: {}",
                dir.display()
            )));
        }

        let sender = self.event_sender.clone().ok_or_else(|| {
            Error::Internal("Event sender not set before calling watch".to_string())
        })?;

        *self.watched.write().unwrap_or_else(|p| p.into_inner()) =
            Some(WatchedDir::new(dir.clone(), config.filter));

        let mut debouncer = match self.start_debouncer(sender, config.debounce) {
            Ok(debouncer) => debouncer,
            Err(e) => {
                *self.watched.write().unwrap_or_else(|p| p.into_inner()) = None;
                return Err(e);
            }
        };

        if let Err(e) = debouncer.watch(&dir, RecursiveMode::NonRecursive) {
            *self.watched.write().unwrap_or_else(|p| p.into_inner()) = None;
            return Err(Error::Watch(format!("Failed to watch path: {}", e)));
        }

        self.debouncer = Some(debouncer);
        info!("Watching {}", dir.display());
        Ok(())
    }

    async fn shutdown(&mut self, timeout: Duration) -> Result<()> {
        *self.watched.write().unwrap_or_else(|p| p.into_inner()) = None;
        self.event_sender = None;

        let Some(debouncer) = self.debouncer.take() else {
            return Ok(());
        };

        let stop = tokio::task::spawn_blocking(move || debouncer.stop());
        match tokio::time::timeout(timeout, stop).await {
            Ok(Ok(())) => {
                info!("Notify watcher stopped");
                Ok(())
            }
            Ok(Err(e)) => Err(Error::Internal(format!("Notify stop task failed: {}", e))),
            Err(_) => {
                warn!(
                    "Notify watcher did not stop within {}ms",
                    timeout.as_millis()
                );
                Ok(())
            }
        }
    }
}
