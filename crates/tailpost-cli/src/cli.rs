use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tailpost_config::ConfigOverrides;
use tracing_subscriber::filter::LevelFilter;

/// Log level options for CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    /// No logging output
    Off,
    /// Error messages only
    Error,
    /// Warnings and errors
    Warn,
    /// Informational messages and status lines (default)
    Info,
    /// Debug messages
    Debug,
    /// Trace-level messages (most verbose)
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Off => LevelFilter::OFF,
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Trace => LevelFilter::TRACE,
        }
    }
}

/// Output format for `config show`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// TOML, as in the config file
    #[default]
    Toml,
    /// Pretty-printed JSON
    Json,
}

#[derive(Parser)]
#[command(name = "tailpost")]
#[command(about = "tailpost - append new lines from a folder of text files to a Google Doc")]
#[command(version)]
pub struct Cli {
    /// Subcommand to execute (defaults to run if not provided)
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Set log level (off, error, warn, info, debug, trace)
    #[arg(short = 'l', long, global = true, value_enum)]
    pub log_level: Option<LogLevel>,

    /// Enable verbose logging (shortcut for --log-level=debug)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file path (defaults to ~/.config/tailpost/config.toml)
    #[arg(short = 'C', long, global = true, env = "TAILPOST_CONFIG")]
    pub config: Option<PathBuf>,
}

impl Cli {
    /// Level used when `RUST_LOG` is not set.
    pub fn level_filter(&self) -> LevelFilter {
        if self.verbose {
            LevelFilter::DEBUG
        } else {
            self.log_level.map(Into::into).unwrap_or(LevelFilter::INFO)
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Watch the folder and append new lines until interrupted
    Run(RunArgs),

    /// Configuration management
    #[command(subcommand)]
    Config(ConfigCommands),

    /// Line cache maintenance
    #[command(subcommand)]
    Cache(CacheCommands),
}

#[derive(Debug, Clone, Default, Args)]
pub struct RunArgs {
    /// Folder to watch (overrides config file)
    #[arg(short = 'd', long)]
    pub watch_dir: Option<PathBuf>,

    /// Document id or Google Docs URL (overrides config file)
    #[arg(long)]
    pub document: Option<String>,

    /// Line cache file (overrides config file)
    #[arg(long)]
    pub cache_file: Option<PathBuf>,
}

impl RunArgs {
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            watch_dir: self.watch_dir.clone(),
            document: self.document.clone(),
            cache_file: self.cache_file.clone(),
        }
    }
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Initialize a new config file
    Init {
        /// Path for the config file (defaults to ~/.config/tailpost/config.toml)
        #[arg(short, long)]
        path: Option<PathBuf>,

        /// Overwrite existing config file
        #[arg(short = 'F', long)]
        force: bool,
    },

    /// Show the current effective configuration
    Show {
        /// Output format
        #[arg(short = 'f', long, value_enum, default_value_t = OutputFormat::Toml)]
        format: OutputFormat,
    },
}

#[derive(Subcommand)]
pub enum CacheCommands {
    /// Show entry count and location of the line cache
    Stats,

    /// Empty the line cache (previously appended lines may be appended again)
    Clear,
}
