//! File event types and the change event filter.

use regex::Regex;
use std::path::PathBuf;
use tailpost_config::WatchSettings;
use tracing::{trace, warn};

/// A create or modify notification for one path.
#[derive(Debug, Clone, PartialEq)]
pub struct FileEvent {
    /// Kind of file event.
    pub kind: FileEventKind,

    /// Path to the file or directory.
    pub path: PathBuf,

    /// Whether the path was a directory when the event was observed.
    pub is_dir: bool,
}

impl FileEvent {
    /// Create a new file event.
    pub fn new(kind: FileEventKind, path: PathBuf) -> Self {
        let is_dir = path.is_dir();
        Self { kind, path, is_dir }
    }

    /// Get the file name as a string.
    pub fn file_name(&self) -> Option<String> {
        self.path.file_name()?.to_str().map(|s| s.to_string())
    }
}

/// Notifications that can change what a file holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileEventKind {
    /// File was created.
    Created,
    /// File was written to.
    Modified,
}

impl FileEventKind {
    /// Get a string representation of the event kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Modified => "modified",
        }
    }
}

/// Decides which notifications reach the work queue.
///
/// Two independent predicates, both required when configured: a
/// case-insensitive file name suffix list (empty accepts everything) and an
/// optional regular expression searched in the file name.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    /// Accepted suffixes, lowercased.
    extensions: Vec<String>,

    /// Compiled file name pattern, if enabled and valid.
    pattern: Option<Regex>,
}

impl EventFilter {
    /// Create a new empty filter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the filter from watch settings.
    ///
    /// A pattern that fails to compile disables the pattern predicate for
    /// the lifetime of this filter instead of rejecting every file.
    pub fn from_settings(settings: &WatchSettings) -> Self {
        let mut filter = Self::new();
        for ext in &settings.extensions {
            filter = filter.with_extension(ext.as_str());
        }

        if settings.pattern_enabled {
            if let Some(pattern) = settings.pattern.as_deref() {
                filter = filter.with_pattern_str(pattern);
            }
        }
        filter
    }

    /// Add an accepted suffix such as `.txt` (a bare `txt` is treated as `.txt`).
    pub fn with_extension(mut self, ext: impl Into<String>) -> Self {
        let ext = ext.into().trim().to_lowercase();
        if ext.is_empty() {
            return self;
        }
        let ext = if ext.starts_with('.') { ext } else { format!(".{ext}") };
        self.extensions.push(ext);
        self
    }

    /// Set the file name pattern.
    pub fn with_pattern(mut self, pattern: Regex) -> Self {
        self.pattern = Some(pattern);
        self
    }

    /// Compile and set the file name pattern, disabling it on error.
    pub fn with_pattern_str(mut self, pattern: &str) -> Self {
        match Regex::new(pattern) {
            Ok(regex) => self.pattern = Some(regex),
            Err(e) => {
                warn!(pattern, error = %e, "invalid file name pattern, pattern filter disabled");
                self.pattern = None;
            }
        }
        self
    }

    /// Whether a pattern predicate is active.
    pub fn has_pattern(&self) -> bool {
        self.pattern.is_some()
    }

    /// Check if an event passes this filter.
    pub fn matches(&self, event: &FileEvent) -> bool {
        if event.is_dir {
            trace!(path = %event.path.display(), "dropping directory event");
            return false;
        }

        let Some(name) = event.file_name() else {
            return false;
        };

        if !self.extensions.is_empty() {
            let lowered = name.to_lowercase();
            if !self.extensions.iter().any(|ext| lowered.ends_with(ext)) {
                trace!(file = %name, "dropping event: extension not accepted");
                return false;
            }
        }

        if let Some(ref pattern) = self.pattern {
            if !pattern.is_match(&name) {
                trace!(file = %name, "dropping event: pattern did not match");
                return false;
            }
        }

        true
    }
}
