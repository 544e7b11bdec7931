//! `research`: inspect and exercise the research loop from the shell.

mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::Cli;
use crate::cli::Commands;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let crate_level = if cli.verbose { "research=debug" } else { "research=info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive(crate_level.parse()?)
                .add_directive("warn".parse()?),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    match cli.command {
        Commands::Decide(args) => commands::decide::execute(args).await,
        Commands::Templates(args) => commands::templates::execute(args),
        Commands::Notebook(args) => commands::notebook::execute(args).await,
        Commands::Config(args) => commands::config::execute(args).await,
        Commands::Report(args) => commands::report::execute(args).await,
    }
}
