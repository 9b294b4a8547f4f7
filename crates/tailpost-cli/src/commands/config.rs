use anyhow::{Context, Result};
use colored::Colorize;
use std::path::PathBuf;
use tailpost_config::TailpostConfig;

use crate::cli::{ConfigCommands, OutputFormat};

/// Execute config subcommand
pub async fn execute(config_path: Option<PathBuf>, cmd: ConfigCommands) -> Result<()> {
    match cmd {
        ConfigCommands::Init { path, force } => init(path.or(config_path), force),
        ConfigCommands::Show { format } => show(config_path, format),
    }
}

/// Initialize a new config file
fn init(path: Option<PathBuf>, force: bool) -> Result<()> {
    let config_path = match path {
        Some(path) => path,
        None => TailpostConfig::default_config_path()
            .context("Could not determine config file path")?,
    };

    if config_path.exists() && !force {
        println!(
            "{} Config file already exists at: {}",
            "Error:".red().bold(),
            config_path.display()
        );
        println!("Use {} to overwrite", "--force".yellow());
        return Ok(());
    }

    TailpostConfig::create_example(&config_path)?;

    println!(
        "{} Created config file at: {}",
        "Success:".green().bold(),
        config_path.display()
    );
    println!(
        "\n{}",
        "Set watch.dir and docs.document, then run `tailpost`.".dimmed()
    );

    Ok(())
}

/// Show the current effective configuration
fn show(config_path: Option<PathBuf>, format: OutputFormat) -> Result<()> {
    let config = TailpostConfig::load(config_path).context("Failed to load configuration")?;

    let rendered = match format {
        OutputFormat::Json => config.to_json()?,
        OutputFormat::Toml => config.to_toml()?,
    };
    println!("{}", rendered);

    Ok(())
}
