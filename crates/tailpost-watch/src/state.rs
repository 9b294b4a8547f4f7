//! Per-file read positions and debounce bookkeeping.

use encoding_rs::Encoding;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::debug;

/// What is known about one watched file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FileState {
    /// Bytes consumed by the last committed pass.
    pub last_size: u64,
    /// Last pass that read the file or found it unchanged.
    pub last_processed_at: Option<Instant>,
    /// Encoding that last decoded this file, tried first next time.
    pub last_encoding: Option<&'static Encoding>,
}

/// How the next pass over a file should proceed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReadPlan {
    /// The file has the same size as last time.
    Unchanged,
    /// Read from `offset`; `truncated` when the file shrank and is re-read whole.
    Read {
        /// Byte offset to read from.
        offset: u64,
        /// Encoding to try first.
        hint: Option<&'static Encoding>,
        /// Whether the file shrank since the last pass.
        truncated: bool,
    },
}

/// In-memory map of [`FileState`] keyed by path, rebuilt every run.
#[derive(Debug, Clone)]
pub struct FileStateTracker {
    states: HashMap<PathBuf, FileState>,
    debounce: Duration,
}

impl FileStateTracker {
    /// Create a tracker with the given per-path debounce window.
    pub fn new(debounce: Duration) -> Self {
        Self {
            states: HashMap::new(),
            debounce,
        }
    }

    /// State of `path`, if it has been seen.
    pub fn get(&self, path: &Path) -> Option<&FileState> {
        self.states.get(path)
    }

    /// Number of tracked files.
    pub fn len(&self) -> usize {
        self.states.len()
    }

    /// Whether no file is tracked.
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Whether a pass at `now` falls inside the debounce window of `path`.
    pub fn is_debounced(&self, path: &Path, now: Instant) -> bool {
        self.states
            .get(path)
            .and_then(|state| state.last_processed_at)
            .is_some_and(|last| now.saturating_duration_since(last) < self.debounce)
    }

    /// Decide how to read `path` given its current size.
    ///
    /// An unchanged size only refreshes the timestamp. A shrunken file has
    /// its remembered size reset to zero and its encoding forgotten, so it is
    /// re-read from the start until a pass commits, even if that pass fails
    /// and the file grows past the old size in the meantime.
    pub fn plan(&mut self, path: &Path, current_size: u64, now: Instant) -> ReadPlan {
        let state = self.states.entry(path.to_path_buf()).or_default();

        if current_size == state.last_size {
            state.last_processed_at = Some(now);
            return ReadPlan::Unchanged;
        }

        if current_size < state.last_size {
            debug!(
                path = %path.display(),
                last_size = state.last_size,
                current_size,
                "file shrank, re-reading from start"
            );
            state.last_size = 0;
            state.last_encoding = None;
            return ReadPlan::Read {
                offset: 0,
                hint: None,
                truncated: true,
            };
        }

        ReadPlan::Read {
            offset: state.last_size,
            hint: state.last_encoding,
            truncated: false,
        }
    }

    /// Record a completed pass that consumed the file up to `end_offset`.
    pub fn commit(
        &mut self,
        path: &Path,
        end_offset: u64,
        encoding: &'static Encoding,
        now: Instant,
    ) {
        let state = self.states.entry(path.to_path_buf()).or_default();
        state.last_size = end_offset;
        state.last_processed_at = Some(now);
        state.last_encoding = Some(encoding);
    }

    /// Forget `path` entirely.
    pub fn remove(&mut self, path: &Path) -> Option<FileState> {
        self.states.remove(path)
    }

    /// Seed the remembered size of `path`.
    pub fn set_last_size(&mut self, path: &Path, last_size: u64) {
        self.states.entry(path.to_path_buf()).or_default().last_size = last_size;
    }
}
