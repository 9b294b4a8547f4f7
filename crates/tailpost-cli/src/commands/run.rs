use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tailpost_config::{ConfigValidator, TailpostConfig};
use tailpost_docs::GoogleServiceProvider;
use tailpost_watch::{Monitor, TracingSink};
use tokio::signal;
use tracing::{info, warn};

use crate::cli::RunArgs;

/// Execute the run command: watch until Ctrl-C or SIGTERM.
pub async fn execute(config_path: Option<PathBuf>, args: RunArgs) -> Result<()> {
    let config = TailpostConfig::load(config_path)
        .context("Failed to load configuration")?
        .with_overrides(args.overrides());
    ConfigValidator::validate_for_run(&config)
        .context("Invalid configuration (set watch.dir or pass --watch-dir)")?;

    info!(
        dir = %config.watch.dir.display(),
        cache = %config.cache.path.display(),
        "starting tailpost"
    );

    let provider = Arc::new(GoogleServiceProvider::new(config.docs.clone()));
    let handle = Monitor::new(config, provider, Arc::new(TracingSink))
        .spawn()
        .context("Failed to start monitor")?;

    let cancel = handle.cancellation_token();
    let signals = tokio::spawn(async move {
        shutdown_signal().await;
        cancel.cancel();
    });

    let result = handle.join().await;
    signals.abort();
    result.context("Monitor stopped with an error")
}

/// Directory for the run log file, `None` when disabled.
///
/// A config that fails to load yields `None`; `execute` reports the error.
pub fn log_dir(config_path: Option<PathBuf>) -> Option<PathBuf> {
    let config = TailpostConfig::load(config_path).ok()?;
    config.log.file_enabled.then_some(config.log.dir)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down"),
            Err(e) => {
                warn!("Failed to install Ctrl+C handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received SIGTERM, shutting down");
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}
