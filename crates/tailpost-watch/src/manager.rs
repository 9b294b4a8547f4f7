//! Monitoring loop: owns the work queue and drives the append pipeline.

use crate::{
    backends::NotifyWatcher,
    cache::LineCache,
    error::{Error, Result},
    events::{EventFilter, FileEvent, FileEventKind},
    pipeline::{AppendPipeline, PassOutcome},
    traits::{FileWatcher, ServiceProvider, StatusSink, WatchConfig},
};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tailpost_config::{ConfigValidator, TailpostConfig};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Lifecycle of the monitoring loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MonitorState {
    /// Loading the cache, acquiring services, registering the watch.
    Starting,
    /// Draining the work queue.
    Watching,
    /// Stop requested; shutting the watch down.
    Stopping,
    /// Cache persisted, loop finished.
    Stopped,
}

/// Snapshot of loop counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MonitorStats {
    /// Events taken off the queue.
    pub events: u64,
    /// Passes that ran past the debounce check.
    pub passes: u64,
    /// Batches appended.
    pub appended_batches: u64,
    /// Lines appended.
    pub appended_lines: u64,
    /// Batches skipped for lack of a document service.
    pub skipped_batches: u64,
    /// Passes that failed (read, vanished, append).
    pub failures: u64,
}

#[derive(Debug, Default)]
struct Counters {
    events: AtomicU64,
    passes: AtomicU64,
    appended_batches: AtomicU64,
    appended_lines: AtomicU64,
    skipped_batches: AtomicU64,
    failures: AtomicU64,
}

impl Counters {
    fn record(&self, result: &Result<PassOutcome>) {
        match result {
            Ok(PassOutcome::Debounced) => return,
            Ok(PassOutcome::Appended { lines }) => {
                self.appended_batches.fetch_add(1, Ordering::Relaxed);
                self.appended_lines
                    .fetch_add(*lines as u64, Ordering::Relaxed);
            }
            Ok(PassOutcome::Skipped { .. }) => {
                self.skipped_batches.fetch_add(1, Ordering::Relaxed);
            }
            Ok(_) => {}
            Err(_) => {
                self.failures.fetch_add(1, Ordering::Relaxed);
            }
        }
        self.passes.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> MonitorStats {
        MonitorStats {
            events: self.events.load(Ordering::Relaxed),
            passes: self.passes.load(Ordering::Relaxed),
            appended_batches: self.appended_batches.load(Ordering::Relaxed),
            appended_lines: self.appended_lines.load(Ordering::Relaxed),
            skipped_batches: self.skipped_batches.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
        }
    }
}

/// Watches one directory and appends new lines of matching files.
pub struct Monitor {
    config: TailpostConfig,
    provider: Arc<dyn ServiceProvider>,
    sink: Arc<dyn StatusSink>,
    watcher: Box<dyn FileWatcher>,
}

impl Monitor {
    /// Create a monitor using the notify backend.
    pub fn new(
        config: TailpostConfig,
        provider: Arc<dyn ServiceProvider>,
        sink: Arc<dyn StatusSink>,
    ) -> Self {
        Self {
            config,
            provider,
            sink,
            watcher: Box::new(NotifyWatcher::new()),
        }
    }

    /// Validate the configuration and start the loop on a tokio task.
    pub fn spawn(self) -> Result<MonitorHandle> {
        ConfigValidator::validate_for_run(&self.config)
            .map_err(|e| Error::Config(e.to_string()))?;

        let cancel = CancellationToken::new();
        let (state_tx, state_rx) = watch::channel(MonitorState::Starting);
        let (queue_tx, queue_rx) = mpsc::unbounded_channel();
        let counters = Arc::new(Counters::default());

        let run = MonitorRun {
            cancel: cancel.clone(),
            state: state_tx,
            counters: Arc::clone(&counters),
            queue_tx: queue_tx.clone(),
            queue_rx,
        };
        let task = tokio::spawn(self.run(run));

        Ok(MonitorHandle {
            cancel,
            state: state_rx,
            counters,
            queue: queue_tx,
            task,
        })
    }

    async fn run(mut self, mut run: MonitorRun) -> Result<()> {
        let sink = Arc::clone(&self.sink);
        let cache_path = self.config.cache.path.clone();

        // STARTING
        let cache = LineCache::load_or_empty(&cache_path, &self.config.cache).await;
        sink.record(&format!("Loaded {} cached line(s)", cache.len()));

        let mut pipeline = match AppendPipeline::from_config(&self.config, cache) {
            Ok(pipeline) => pipeline,
            Err(e) => {
                error!(error = %e, "invalid configuration");
                run.state.send_replace(MonitorState::Stopped);
                return Err(e);
            }
        };

        let services = self.provider.get_services(sink.as_ref()).await;
        if services.as_ref().and_then(|s| s.docs.as_ref()).is_none() {
            warn!("no document service, running in degraded mode");
            sink.record("Document service unavailable; new lines will be skipped");
        }
        pipeline.set_services(services);
        if self.config.docs.document_id().is_none() {
            sink.record("No document configured; new lines will be skipped");
        }

        let dir = self.config.watch.dir.clone();
        let watch_config = WatchConfig::new()
            .with_filter(EventFilter::from_settings(&self.config.watch))
            .with_debounce(self.config.watch.event_debounce());
        self.watcher.set_event_sender(run.queue_tx.clone());
        drop(run.queue_tx);

        if let Err(e) = self.watcher.watch(dir.clone(), watch_config).await {
            error!(dir = %dir.display(), error = %e, "failed to register watch");
            sink.record(&format!("Cannot watch {}: {}", dir.display(), e));
            persist(&pipeline, &cache_path).await;
            run.state.send_replace(MonitorState::Stopped);
            return Err(e);
        }

        info!(dir = %dir.display(), "watching");
        sink.record(&format!("Watching {}", dir.display()));
        run.state.send_replace(MonitorState::Watching);

        // WATCHING
        loop {
            tokio::select! {
                biased;
                _ = run.cancel.cancelled() => break,
                event = run.queue_rx.recv() => {
                    let Some(event) = event else {
                        debug!("work queue closed");
                        break;
                    };
                    run.counters.events.fetch_add(1, Ordering::Relaxed);
                    let result = pipeline.process_path(&event.path, sink.as_ref()).await;
                    run.counters.record(&result);
                    if let Err(ref e) = result {
                        debug!(path = %event.path.display(), error = %e, "pass failed");
                    }
                }
            }
        }

        // STOPPING
        run.state.send_replace(MonitorState::Stopping);
        sink.record("Stopping");
        run.queue_rx.close();
        if let Err(e) = self
            .watcher
            .shutdown(self.config.watch.stop_timeout())
            .await
        {
            warn!(error = %e, "watch backend did not shut down cleanly");
        }

        // STOPPED
        persist(&pipeline, &cache_path).await;
        let stats = run.counters.snapshot();
        info!(
            passes = stats.passes,
            appended_batches = stats.appended_batches,
            appended_lines = stats.appended_lines,
            skipped_batches = stats.skipped_batches,
            failures = stats.failures,
            "monitor stopped"
        );
        sink.record(&format!(
            "Stopped: {} batch(es), {} line(s) appended",
            stats.appended_batches, stats.appended_lines
        ));
        run.state.send_replace(MonitorState::Stopped);
        Ok(())
    }
}

struct MonitorRun {
    cancel: CancellationToken,
    state: watch::Sender<MonitorState>,
    counters: Arc<Counters>,
    queue_tx: mpsc::UnboundedSender<FileEvent>,
    queue_rx: mpsc::UnboundedReceiver<FileEvent>,
}

async fn persist(pipeline: &AppendPipeline, path: &Path) {
    if let Err(e) = pipeline.save_cache(path).await {
        error!(error = %e, "failed to persist line cache");
    }
}

/// Control handle for a spawned [`Monitor`].
pub struct MonitorHandle {
    cancel: CancellationToken,
    state: watch::Receiver<MonitorState>,
    counters: Arc<Counters>,
    queue: mpsc::UnboundedSender<FileEvent>,
    task: JoinHandle<Result<()>>,
}

impl MonitorHandle {
    /// Request a stop. The current pass finishes first.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    /// Token that stops the loop when cancelled.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Current lifecycle state.
    pub fn state(&self) -> MonitorState {
        *self.state.borrow()
    }

    /// Wait until the loop reaches `target` or a later state.
    pub async fn wait_for(&mut self, target: MonitorState) -> MonitorState {
        let reached = self
            .state
            .wait_for(|state| state_rank(*state) >= state_rank(target))
            .await
            .map(|state| *state);
        reached.unwrap_or(MonitorState::Stopped)
    }

    /// Counter snapshot.
    pub fn stats(&self) -> MonitorStats {
        self.counters.snapshot()
    }

    /// Queue a path for processing, bypassing the event filter.
    pub fn enqueue(&self, path: impl Into<PathBuf>) -> Result<()> {
        self.queue
            .send(FileEvent::new(FileEventKind::Modified, path.into()))
            .map_err(|_| Error::Internal("work queue closed".to_string()))
    }

    /// Stop the loop and wait for it to finish.
    pub async fn shutdown(self) -> Result<()> {
        self.stop();
        self.join().await
    }

    /// Wait for the loop to finish on its own.
    pub async fn join(self) -> Result<()> {
        self.task
            .await
            .map_err(|e| Error::Internal(format!("monitor task failed: {e}")))?
    }
}

fn state_rank(state: MonitorState) -> u8 {
    match state {
        MonitorState::Starting => 0,
        MonitorState::Watching => 1,
        MonitorState::Stopping => 2,
        MonitorState::Stopped => 3,
    }
}
