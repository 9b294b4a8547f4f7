//! # Tailpost Watch
//!
//! Change detection and deduplicated append for a folder of growing text
//! files.
//!
//! ```text
//! ┌──────────────┐   ┌─────────────┐   ┌──────────────┐   ┌────────────────┐
//! │ NotifyWatcher│──▶│ EventFilter │──▶│  work queue  │──▶│    Monitor     │
//! │  (notify)    │   │ (ext, regex)│   │ (mpsc, FIFO) │   │ (single task)  │
//! └──────────────┘   └─────────────┘   └──────────────┘   └───────┬────────┘
//!                                                                 ▼
//!                    ┌──────────────────────────────────────────────────────┐
//!                    │ AppendPipeline                                       │
//!                    │  FileStateTracker ─▶ IncrementalReader ─▶ LineCache  │
//!                    │                  ─▶ DocumentService::append_text     │
//!                    └──────────────────────────────────────────────────────┘
//! ```
//!
//! Filesystem notifications only ever push paths onto the queue. The
//! [`Monitor`] task processes one path at a time, so at most one append is in
//! flight. A pass commits the line cache and the file offset only after the
//! document service confirms the batch; anything else leaves both untouched
//! and the same bytes are read again on the next pass.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod backends;
pub mod cache;
pub mod error;
mod events;
mod manager;
pub mod pipeline;
pub mod reader;
pub mod state;
pub mod traits;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use backends::NotifyWatcher;
pub use cache::LineCache;
pub use error::*;
pub use events::*;
pub use manager::*;
pub use pipeline::{extract_lines, format_batch, AppendPipeline, PassOutcome};
pub use reader::{IncrementalReader, ReadChunk};
pub use state::{FileState, FileStateTracker, ReadPlan};
pub use traits::{
    DocumentService, FileWatcher, ServiceProvider, Services, StatusSink, TracingSink, WatchConfig,
};

/// Re-export common types for convenience
pub mod prelude {
    pub use crate::{
        AppendError, AppendPipeline, DocumentService, Error, EventFilter, FileEvent,
        FileEventKind, LineCache, Monitor, MonitorHandle, MonitorState, PassOutcome, Result,
        ServiceProvider, Services, StatusSink,
    };
}
