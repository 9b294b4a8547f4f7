use anyhow::Result;
use clap::Parser;

use tailpost_cli::{
    cli::{Cli, Commands},
    commands, logging,
};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_dir = match cli.command {
        None | Some(Commands::Run(_)) => commands::run::log_dir(cli.config.clone()),
        _ => None,
    };
    let _log_guard = logging::init(cli.level_filter(), log_dir.as_deref());

    match cli.command {
        Some(Commands::Run(args)) => commands::run::execute(cli.config, args).await?,

        Some(Commands::Config(cmd)) => commands::config::execute(cli.config, cmd).await?,

        Some(Commands::Cache(cmd)) => commands::cache::execute(cli.config, cmd).await?,

        None => commands::run::execute(cli.config, Default::default()).await?,
    }

    Ok(())
}
