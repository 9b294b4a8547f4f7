//! Append pipeline: one processing pass over one file.
//!
//! A pass reads what was appended since the last committed offset, keeps the
//! lines the [`LineCache`] has not seen, and sends them to the document
//! service as a single batch. Cache and file state only advance after the
//! service confirms the append, so a failed batch is re-read on the next pass.

use crate::{
    cache::LineCache,
    error::{Error, ReadError, Result},
    reader::IncrementalReader,
    state::{FileStateTracker, ReadPlan},
    traits::{DocumentService, Services, StatusSink},
};
use chrono::{DateTime, Local};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tailpost_config::{ConfigValidator, TailpostConfig};
use tracing::{debug, info, warn};

const HEADER_RULE_WIDTH: usize = 60;

/// Result of a pass that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassOutcome {
    /// Dropped because the previous pass on this path was too recent.
    Debounced,
    /// File size unchanged since the last pass.
    Unchanged,
    /// New content held no lines missing from the cache.
    NothingNew {
        /// Non-empty lines in the new content.
        lines_seen: usize,
    },
    /// New lines found but no document service or document id is available.
    Skipped {
        /// Lines that would have been appended.
        lines: usize,
    },
    /// Batch appended and committed.
    Appended {
        /// Lines in the appended batch.
        lines: usize,
    },
}

/// Owns the reader, line cache and file state and runs passes over them.
///
/// Not shared: the monitor task drives it one path at a time.
pub struct AppendPipeline {
    reader: IncrementalReader,
    cache: LineCache,
    states: FileStateTracker,
    docs: Option<Arc<dyn DocumentService>>,
    document_id: Option<String>,
    cache_path: Option<PathBuf>,
}

impl AppendPipeline {
    /// Create a pipeline with no document service and no cache file.
    pub fn new(reader: IncrementalReader, cache: LineCache, states: FileStateTracker) -> Self {
        Self {
            reader,
            cache,
            states,
            docs: None,
            document_id: None,
            cache_path: None,
        }
    }

    /// Build a pipeline from configuration around an already loaded cache.
    pub fn from_config(config: &TailpostConfig, cache: LineCache) -> Result<Self> {
        ConfigValidator::validate(config).map_err(|e| Error::Config(e.to_string()))?;
        let reader = IncrementalReader::from_settings(&config.reader)
            .map_err(|e| Error::Config(e.to_string()))?;

        let mut pipeline = Self::new(
            reader,
            cache,
            FileStateTracker::new(config.watch.debounce()),
        )
        .with_document_id(config.docs.document_id());

        if config.cache.persist_on_append {
            pipeline = pipeline.with_cache_file(config.cache.path.clone());
        }
        Ok(pipeline)
    }

    /// Set the target document. `None` disables appending.
    pub fn with_document_id(mut self, document_id: Option<String>) -> Self {
        self.document_id = document_id.filter(|id| !id.is_empty());
        self
    }

    /// Persist the cache to `path` after every confirmed append.
    pub fn with_cache_file(mut self, path: PathBuf) -> Self {
        self.cache_path = Some(path);
        self
    }

    /// Install (or clear) the services used for appending.
    pub fn set_services(&mut self, services: Option<Services>) {
        self.docs = services.and_then(|s| s.docs);
    }

    /// Whether passes can currently append.
    pub fn can_append(&self) -> bool {
        self.docs.is_some() && self.document_id.is_some()
    }

    /// The line cache.
    pub fn cache(&self) -> &LineCache {
        &self.cache
    }

    /// The per-file state.
    pub fn states(&self) -> &FileStateTracker {
        &self.states
    }

    /// Mutable per-file state, for seeding.
    pub fn states_mut(&mut self) -> &mut FileStateTracker {
        &mut self.states
    }

    /// Give back the cache, e.g. to persist it on shutdown.
    pub fn into_cache(self) -> LineCache {
        self.cache
    }

    /// Run one full pass over `path`.
    ///
    /// Errors are local to this path: a read failure leaves state untouched,
    /// a vanished file has its state dropped, a failed append leaves both the
    /// cache and the state as they were.
    pub async fn process_path(
        &mut self,
        path: &Path,
        sink: &dyn StatusSink,
    ) -> Result<PassOutcome> {
        let now = Instant::now();
        if self.states.is_debounced(path, now) {
            debug!(path = %path.display(), "pass debounced");
            return Ok(PassOutcome::Debounced);
        }

        let size = match tokio::fs::metadata(path).await {
            Ok(meta) => meta.len(),
            Err(source) => {
                return Err(self.read_failed(
                    path,
                    ReadError::Io {
                        path: path.to_path_buf(),
                        source,
                    },
                    sink,
                ))
            }
        };

        let (offset, hint) = match self.states.plan(path, size, now) {
            ReadPlan::Unchanged => {
                debug!(path = %path.display(), size, "file unchanged");
                return Ok(PassOutcome::Unchanged);
            }
            ReadPlan::Read {
                offset,
                hint,
                truncated,
            } => {
                if truncated {
                    sink.record(&format!(
                        "{} was truncated, re-reading from the start",
                        display_name(path)
                    ));
                }
                (offset, hint)
            }
        };

        let chunk = match self.reader.read_from(path, offset, hint).await {
            Ok(chunk) => chunk,
            Err(e) => return Err(self.read_failed(path, e, sink)),
        };

        let candidates = extract_lines(&chunk.content);
        let lines_seen = candidates.len();
        let new_lines = self.filter_new(candidates);

        if new_lines.is_empty() {
            debug!(path = %path.display(), lines_seen, end_offset = chunk.end_offset, "no new lines");
            self.states.commit(path, chunk.end_offset, chunk.encoding, now);
            return Ok(PassOutcome::NothingNew { lines_seen });
        }

        let (docs, document_id) = match (&self.docs, &self.document_id) {
            (Some(docs), Some(id)) => (Arc::clone(docs), id.clone()),
            _ => {
                info!(path = %path.display(), lines = new_lines.len(), "append skipped, no document service");
                sink.record(&format!(
                    "Skipped {} new line(s) from {}: document service unavailable",
                    new_lines.len(),
                    display_name(path)
                ));
                return Ok(PassOutcome::Skipped {
                    lines: new_lines.len(),
                });
            }
        };

        let block = format_batch(&new_lines, Local::now());
        if let Err(e) = docs.append_text(&document_id, &block).await {
            warn!(
                path = %path.display(),
                category = e.category(),
                error = %e,
                lines = new_lines.len(),
                "append failed, batch will be retried"
            );
            sink.record(&format!(
                "Append failed [{}] for {}: {}",
                e.category(),
                display_name(path),
                e
            ));
            return Err(Error::Append(e));
        }

        let appended = new_lines.len();
        self.cache.extend(new_lines);
        if let Some(ref cache_path) = self.cache_path {
            if let Err(e) = self.cache.save(cache_path).await {
                warn!(error = %e, "failed to persist line cache after append");
            }
        }
        self.states.commit(path, chunk.end_offset, chunk.encoding, now);

        info!(path = %path.display(), lines = appended, end_offset = chunk.end_offset, "batch appended");
        sink.record(&format!(
            "Appended {} line(s) from {}",
            appended,
            display_name(path)
        ));
        Ok(PassOutcome::Appended { lines: appended })
    }

    /// Persist the cache to `path` regardless of `persist_on_append`.
    pub async fn save_cache(&self, path: &Path) -> Result<()> {
        Ok(self.cache.save(path).await?)
    }

    /// Drop cached lines and repeats, preserving order.
    fn filter_new(&self, candidates: Vec<String>) -> Vec<String> {
        let mut seen = HashSet::new();
        candidates
            .into_iter()
            .filter(|line| !self.cache.contains(line))
            .filter(|line| seen.insert(line.clone()))
            .collect()
    }

    fn read_failed(&mut self, path: &Path, err: ReadError, sink: &dyn StatusSink) -> Error {
        if err.is_not_found() {
            self.states.remove(path);
            info!(path = %path.display(), "file vanished, state dropped");
            sink.record(&format!("{} disappeared", display_name(path)));
            return Error::Vanished(path.to_path_buf());
        }

        warn!(path = %path.display(), error = %err, "read failed, will retry");
        sink.record(&format!("Could not read {}: {}", display_name(path), err));
        Error::Read(err)
    }
}

/// Split content into trimmed, non-empty lines.
pub fn extract_lines(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect()
}

/// Render a batch: a timestamped header block, the lines, trailing spacing.
pub fn format_batch(lines: &[String], at: DateTime<Local>) -> String {
    let rule = "#".repeat(HEADER_RULE_WIDTH);
    format!(
        "\n{rule}\n# New update: {}\n{rule}\n{}\n\n",
        at.format("%Y-%m-%d %H:%M:%S"),
        lines.join("\n")
    )
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
