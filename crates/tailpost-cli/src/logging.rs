//! Subscriber setup: stderr always, plus a daily log file while watching.

use std::path::Path;
use tracing::level_filters::LevelFilter;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{InitError, RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Prefix of the daily log files (`tailpost.<date>.log`).
pub const LOG_FILE_PREFIX: &str = "tailpost";

/// Appender rotating `tailpost.<date>.log` under `dir` once a day.
pub fn file_appender(dir: &Path) -> Result<RollingFileAppender, InitError> {
    RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(LOG_FILE_PREFIX)
        .filename_suffix("log")
        .build(dir)
}

/// Install the global subscriber.
///
/// The returned guard flushes the log file when dropped and must live until
/// the process exits.
pub fn init(level: LevelFilter, log_dir: Option<&Path>) -> Option<WorkerGuard> {
    // RUST_LOG wins over the command-line level
    let env_filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();
    let stderr = fmt::layer().with_target(false).with_writer(std::io::stderr);

    let mut file_error = None;
    let (file, guard) = match log_dir.map(file_appender) {
        Some(Ok(appender)) => {
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_ansi(false).with_writer(writer);
            (Some(layer), Some(guard))
        }
        Some(Err(e)) => {
            file_error = Some(e);
            (None, None)
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr)
        .with(file)
        .init();

    if let (Some(dir), Some(e)) = (log_dir, file_error) {
        tracing::warn!(dir = %dir.display(), error = %e, "log file disabled");
    }
    guard
}
