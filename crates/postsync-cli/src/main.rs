//! postsync CLI - Browse a post feed from the terminal
//!
//! Reads the remote feed when reachable and falls back to the local cache,
//! keeping likes in a local database across runs.

mod cli;
mod commands;
mod error;

use clap::Parser;

use crate::cli::{Cli, Commands};
use crate::commands::cached::run_cached;
use crate::commands::common::GlobalOptions;
use crate::commands::completions::run_completions;
use crate::commands::config::run_config;
use crate::commands::feed::{run_browse, run_list, run_refresh};
use crate::commands::like::run_like;
use crate::error::CliError;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    let mut filter = tracing_subscriber::EnvFilter::from_default_env();
    if let Ok(directive) = "postsync=info".parse() {
        filter = filter.add_directive(directive);
    }
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let options = GlobalOptions::resolve(cli.db_path, cli.api_url, cli.offline);

    match cli.command {
        Commands::List { json } => run_list(&options, json).await?,
        Commands::Refresh { json } => run_refresh(&options, json).await?,
        Commands::Browse { pages, json } => run_browse(&options, pages, json).await?,
        Commands::Like { id } => run_like(&options, &id).await?,
        Commands::Cached { json } => run_cached(&options.db_path, json).await?,
        Commands::Config { command } => run_config(command, &options)?,
        Commands::Completions { shell, output } => {
            run_completions(shell, output.as_deref())?;
        }
    }

    Ok(())
}
