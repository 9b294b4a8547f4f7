use anyhow::{Context, Result};
use colored::Colorize;
use std::path::PathBuf;
use tailpost_config::TailpostConfig;
use tailpost_watch::LineCache;

use crate::cli::CacheCommands;

/// Execute cache subcommand
pub async fn execute(config_path: Option<PathBuf>, cmd: CacheCommands) -> Result<()> {
    let config = TailpostConfig::load(config_path).context("Failed to load configuration")?;

    match cmd {
        CacheCommands::Stats => stats(&config).await,
        CacheCommands::Clear => clear(&config).await,
    }
}

async fn stats(config: &TailpostConfig) -> Result<()> {
    let path = &config.cache.path;
    let cache = LineCache::load(path, &config.cache)
        .await
        .with_context(|| format!("Failed to read line cache at {}", path.display()))?;

    println!("{}", "Line cache".bold());
    println!("  file:        {}", path.display());
    println!(
        "  exists:      {}",
        if path.exists() { "yes".green() } else { "no".yellow() }
    );
    println!("  entries:     {}", cache.len());
    println!("  max entries: {}", cache.max_entries());
    println!("  prune to:    {}", config.cache.prune_target());

    Ok(())
}

async fn clear(config: &TailpostConfig) -> Result<()> {
    let path = &config.cache.path;
    LineCache::from_settings(&config.cache)
        .save(path)
        .await
        .with_context(|| format!("Failed to write line cache at {}", path.display()))?;

    println!(
        "{} Cleared line cache at: {}",
        "Success:".green().bold(),
        path.display()
    );
    Ok(())
}
