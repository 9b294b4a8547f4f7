//! Persistent set of lines already confirmed appended to the document.

use crate::error::CacheError;
use std::collections::HashSet;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tailpost_config::CacheSettings;
use tracing::{debug, info, warn};

/// Bounded, content-addressed set of appended lines.
///
/// The cache is global across watched files. Entries are only added after a
/// confirmed append; the only removal is size-bound pruning, which evicts in
/// no particular order. A pruned line may be appended again later, but a line
/// that was never appended is never reported as cached.
#[derive(Debug, Clone)]
pub struct LineCache {
    lines: HashSet<String>,
    max_entries: usize,
    prune_target: usize,
}

impl LineCache {
    /// Create an empty cache pruned to `prune_target` once it exceeds `max_entries`.
    pub fn new(max_entries: usize, prune_target: usize) -> Self {
        Self {
            lines: HashSet::new(),
            max_entries,
            prune_target: prune_target.min(max_entries),
        }
    }

    /// Create an empty cache sized from settings.
    pub fn from_settings(settings: &CacheSettings) -> Self {
        Self::new(settings.max_entries, settings.prune_target())
    }

    /// Whether `line` was confirmed appended (and not since evicted).
    pub fn contains(&self, line: &str) -> bool {
        self.lines.contains(line)
    }

    /// Number of cached lines.
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Whether the cache holds no lines.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Maximum entry count before pruning.
    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    /// Iterate over cached lines in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().map(String::as_str)
    }

    /// Record lines of a confirmed append, then prune. Returns the number evicted.
    pub fn extend<I>(&mut self, lines: I) -> usize
    where
        I: IntoIterator<Item = String>,
    {
        self.lines.extend(lines);
        self.prune()
    }

    /// Shrink to the prune target if over `max_entries`. Returns the number evicted.
    pub fn prune(&mut self) -> usize {
        if self.lines.len() <= self.max_entries {
            return 0;
        }

        let excess = self.lines.len() - self.prune_target;
        let evicted: Vec<String> = self.lines.iter().take(excess).cloned().collect();
        for line in &evicted {
            self.lines.remove(line);
        }

        info!(
            evicted = evicted.len(),
            remaining = self.lines.len(),
            "line cache pruned"
        );
        evicted.len()
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// Load the cache from a JSON array file.
    ///
    /// A missing file yields an empty cache. An oversized file is pruned.
    pub async fn load(path: &Path, settings: &CacheSettings) -> Result<Self, CacheError> {
        let mut cache = Self::from_settings(settings);

        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no line cache file yet");
                return Ok(cache);
            }
            Err(source) => {
                return Err(CacheError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        let lines: Vec<String> =
            serde_json::from_slice(&bytes).map_err(|source| CacheError::Corrupt {
                path: path.to_path_buf(),
                source,
            })?;

        cache.lines.extend(lines);
        cache.prune();
        debug!(path = %path.display(), entries = cache.len(), "line cache loaded");
        Ok(cache)
    }

    /// Load the cache, falling back to an empty one on any failure.
    pub async fn load_or_empty(path: &Path, settings: &CacheSettings) -> Self {
        match Self::load(path, settings).await {
            Ok(cache) => cache,
            Err(e) => {
                warn!(error = %e, "starting with an empty line cache");
                Self::from_settings(settings)
            }
        }
    }

    /// Write the cache as a pretty-printed JSON array.
    ///
    /// The file is written to a sibling temp file and renamed into place so a
    /// crash mid-write leaves the previous contents intact.
    pub async fn save(&self, path: &Path) -> Result<(), CacheError> {
        let io_err = |source| CacheError::Io {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
        }

        let mut lines: Vec<&str> = self.iter().collect();
        lines.sort_unstable();
        let json = serde_json::to_vec_pretty(&lines).map_err(|source| CacheError::Corrupt {
            path: path.to_path_buf(),
            source,
        })?;

        let tmp = temp_path(path);
        tokio::fs::write(&tmp, &json).await.map_err(io_err)?;
        tokio::fs::rename(&tmp, path).await.map_err(io_err)?;

        debug!(path = %path.display(), entries = self.len(), "line cache saved");
        Ok(())
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".tmp");
    PathBuf::from(name)
}
