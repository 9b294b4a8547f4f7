//! # Tailpost Configuration
//!
//! Type-safe configuration for the tailpost watcher: which folder to watch,
//! which document to append to, where the line cache lives and how the
//! incremental reader guesses text encodings.
//!
//! Values are resolved with the precedence `defaults < config file <
//! environment < command line`. The command-line layer is applied by the
//! binary through [`TailpostConfig::with_overrides`].
//!
//! ```rust,no_run
//! use tailpost_config::TailpostConfig;
//!
//! # fn main() -> Result<(), tailpost_config::ConfigError> {
//! let config = TailpostConfig::load(None)?;
//! println!("watching {}", config.watch.dir.display());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

mod config;
mod document;
mod validation;

pub use config::*;
pub use document::extract_document_id;
pub use validation::{resolve_encodings, ConfigValidator, ValidationError};
