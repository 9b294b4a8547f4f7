//! Configuration schema and loading.

use crate::document::extract_document_id;
use crate::validation::ValidationError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Environment variable naming an alternative config file.
pub const ENV_CONFIG: &str = "TAILPOST_CONFIG";
/// Environment variable overriding `watch.dir`.
pub const ENV_WATCH_DIR: &str = "TAILPOST_WATCH_DIR";
/// Environment variable overriding `docs.document`.
pub const ENV_DOCUMENT: &str = "TAILPOST_DOCUMENT";
/// Environment variable overriding `cache.path`.
pub const ENV_CACHE_FILE: &str = "TAILPOST_CACHE_FILE";
/// Environment variable overriding `docs.token_file`.
pub const ENV_TOKEN_FILE: &str = "TAILPOST_TOKEN_FILE";
/// Environment variable carrying an access token. Never written to disk.
pub const ENV_ACCESS_TOKEN: &str = "TAILPOST_ACCESS_TOKEN";
/// Environment variable overriding `log.dir`.
pub const ENV_LOG_DIR: &str = "TAILPOST_LOG_DIR";

const APP_DIR: &str = "tailpost";

/// Errors raised while loading or writing configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The config file could not be read or written.
    #[error("config file {path}: {source}")]
    Io {
        /// File that failed.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The config file is not valid TOML for this schema.
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        /// File that failed.
        path: PathBuf,
        /// Underlying TOML error.
        #[source]
        source: toml::de::Error,
    },

    /// The configuration could not be rendered as TOML.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// The configuration could not be rendered as JSON.
    #[error("failed to serialize config as JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// No platform config directory is available.
    #[error("could not determine the user config directory")]
    NoConfigDir,

    /// A value failed validation.
    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

/// Complete tailpost configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TailpostConfig {
    /// Folder watching and change filtering.
    pub watch: WatchSettings,
    /// Persistent line cache.
    pub cache: CacheSettings,
    /// Target document and API access.
    pub docs: DocsSettings,
    /// Incremental reader settings.
    pub reader: ReaderSettings,
    /// Persistent log file.
    pub log: LogSettings,
}

/// Folder watching settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WatchSettings {
    /// Directory to watch (non-recursive).
    pub dir: PathBuf,
    /// Accepted filename suffixes, matched case-insensitively. Empty accepts all.
    pub extensions: Vec<String>,
    /// Optional regular expression matched against the file name.
    pub pattern: Option<String>,
    /// Whether `pattern` is applied at all.
    pub pattern_enabled: bool,
    /// Minimum interval between two processing passes of the same file.
    pub debounce_ms: u64,
    /// Tick of the filesystem notification debouncer.
    pub event_debounce_ms: u64,
    /// Upper bound on waiting for the filesystem watch to stop.
    pub stop_timeout_ms: u64,
}

impl Default for WatchSettings {
    fn default() -> Self {
        Self {
            dir: PathBuf::new(),
            extensions: vec![".txt".to_string()],
            pattern: None,
            pattern_enabled: false,
            debounce_ms: 1000,
            event_debounce_ms: 100,
            stop_timeout_ms: 2000,
        }
    }
}

impl WatchSettings {
    /// Per-path processing debounce window.
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Notification debouncer tick.
    pub fn event_debounce(&self) -> Duration {
        Duration::from_millis(self.event_debounce_ms)
    }

    /// Bounded wait for the watch backend to quiesce on stop.
    pub fn stop_timeout(&self) -> Duration {
        Duration::from_millis(self.stop_timeout_ms)
    }
}

/// Line cache settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CacheSettings {
    /// JSON file holding the cached lines.
    pub path: PathBuf,
    /// Entry count above which the cache is pruned.
    pub max_entries: usize,
    /// Fraction of `max_entries` kept after pruning.
    pub prune_ratio: f64,
    /// Rewrite the cache file after every confirmed append.
    pub persist_on_append: bool,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            path: default_cache_path(),
            max_entries: 10_000,
            prune_ratio: 0.7,
            persist_on_append: true,
        }
    }
}

impl CacheSettings {
    /// Number of entries kept when the cache is pruned.
    pub fn prune_target(&self) -> usize {
        ((self.max_entries as f64) * self.prune_ratio).floor() as usize
    }
}

/// Where in the document a batch is inserted.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum InsertAnchor {
    /// Beginning of the document body.
    Start,
    /// End of the document body.
    #[default]
    End,
}

/// Remote document settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DocsSettings {
    /// Document id or full Google Docs URL. Empty disables appending.
    pub document: String,
    /// Base URL of the Docs API.
    pub api_base: String,
    /// Authorized-user token file written by a Google OAuth client.
    pub token_file: Option<PathBuf>,
    /// Insertion point for appended batches.
    pub anchor: InsertAnchor,
    /// Per-request timeout.
    pub timeout_secs: u64,
}

impl Default for DocsSettings {
    fn default() -> Self {
        Self {
            document: String::new(),
            api_base: "https://docs.googleapis.com".to_string(),
            token_file: None,
            anchor: InsertAnchor::End,
            timeout_secs: 30,
        }
    }
}

impl DocsSettings {
    /// Resolved document id, `None` when no document is configured.
    pub fn document_id(&self) -> Option<String> {
        let id = extract_document_id(&self.document);
        (!id.is_empty()).then_some(id)
    }

    /// Request timeout as a duration.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Incremental reader settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ReaderSettings {
    /// Encoding labels tried in order after the per-file hint.
    pub encodings: Vec<String>,
}

impl Default for ReaderSettings {
    fn default() -> Self {
        Self {
            encodings: ["utf-8", "cp949", "utf-8-sig", "euc-kr"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

/// Log file written while watching, rotated daily.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LogSettings {
    /// Whether `tailpost run` writes a log file at all.
    pub file_enabled: bool,
    /// Directory holding the `tailpost.<date>.log` files.
    pub dir: PathBuf,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            file_enabled: true,
            dir: default_log_dir(),
        }
    }
}

/// Command-line overrides, applied last.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    /// Replacement watch directory.
    pub watch_dir: Option<PathBuf>,
    /// Replacement document id or URL.
    pub document: Option<String>,
    /// Replacement cache file.
    pub cache_file: Option<PathBuf>,
}

fn app_dir(base: Option<PathBuf>) -> PathBuf {
    base.unwrap_or_else(|| PathBuf::from(".")).join(APP_DIR)
}

/// Default cache file: `$XDG_DATA_HOME/tailpost/added_lines_cache.json`.
pub fn default_cache_path() -> PathBuf {
    app_dir(dirs::data_local_dir()).join("added_lines_cache.json")
}

/// Default log directory: `$XDG_DATA_HOME/tailpost/logs`.
pub fn default_log_dir() -> PathBuf {
    app_dir(dirs::data_local_dir()).join("logs")
}

impl TailpostConfig {
    /// Load configuration with precedence: defaults < file < env.
    ///
    /// `config_file` wins over `TAILPOST_CONFIG`, which wins over the
    /// default location. A missing file is not an error.
    pub fn load(config_file: Option<PathBuf>) -> Result<Self, ConfigError> {
        let path = match config_file.or_else(|| std::env::var_os(ENV_CONFIG).map(PathBuf::from)) {
            Some(path) => Some(path),
            None => Self::default_config_path().ok(),
        };

        let mut config = match path {
            Some(path) if path.exists() => Self::from_file(&path)?,
            _ => Self::default(),
        };
        config.apply_env();
        Ok(config)
    }

    /// Parse a config file without applying environment overrides.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        debug!(path = %path.display(), "reading config file");
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Apply `TAILPOST_*` environment overrides.
    pub fn apply_env(&mut self) {
        if let Some(dir) = std::env::var_os(ENV_WATCH_DIR) {
            self.watch.dir = PathBuf::from(dir);
        }
        if let Ok(document) = std::env::var(ENV_DOCUMENT) {
            self.docs.document = document;
        }
        if let Some(cache) = std::env::var_os(ENV_CACHE_FILE) {
            self.cache.path = PathBuf::from(cache);
        }
        if let Some(token) = std::env::var_os(ENV_TOKEN_FILE) {
            self.docs.token_file = Some(PathBuf::from(token));
        }
        if let Some(dir) = std::env::var_os(ENV_LOG_DIR) {
            self.log.dir = PathBuf::from(dir);
        }
    }

    /// Apply command-line overrides.
    pub fn with_overrides(mut self, overrides: ConfigOverrides) -> Self {
        if let Some(dir) = overrides.watch_dir {
            self.watch.dir = dir;
        }
        if let Some(document) = overrides.document {
            self.docs.document = document;
        }
        if let Some(cache) = overrides.cache_file {
            self.cache.path = cache;
        }
        self
    }

    /// Default config file: `$XDG_CONFIG_HOME/tailpost/config.toml`.
    pub fn default_config_path() -> Result<PathBuf, ConfigError> {
        let base = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(base.join(APP_DIR).join("config.toml"))
    }

    /// Render as pretty TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Render as pretty JSON.
    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write a commented example config file.
    pub fn create_example(path: &Path) -> Result<(), ConfigError> {
        let io_err = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        std::fs::write(path, EXAMPLE_CONFIG).map_err(io_err)
    }
}

const EXAMPLE_CONFIG: &str = r#"# Tailpost Configuration
# Location: ~/.config/tailpost/config.toml

[watch]
# Folder to watch (not recursive)
dir = "/home/user/chat-logs"

# File name suffixes to pick up, case-insensitive. Empty list accepts every file.
extensions = [".txt"]

# Optional regular expression matched against the file name
# pattern = "^room-.*"
pattern_enabled = false

# Minimum time between two passes over the same file
debounce_ms = 1000

[cache]
# Lines already appended to the document, kept across restarts
# path = "/home/user/.local/share/tailpost/added_lines_cache.json"
max_entries = 10000
prune_ratio = 0.7
persist_on_append = true

[docs]
# Document id or the full URL of the Google Doc
document = ""

# Authorized-user token file (the access token can also come from TAILPOST_ACCESS_TOKEN)
# token_file = "/home/user/.config/tailpost/token.json"

# Insert batches at the "start" or "end" of the document
anchor = "end"
timeout_secs = 30

[reader]
# Encodings tried in order when decoding new content
encodings = ["utf-8", "cp949", "utf-8-sig", "euc-kr"]

[log]
# Daily log file written by `tailpost run`, next to the stderr output
file_enabled = true
# dir = "/home/user/.local/share/tailpost/logs"
"#;
