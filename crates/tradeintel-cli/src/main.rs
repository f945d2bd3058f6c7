mod search;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "tradeintel-cli")]
#[command(about = "Search trade databases, directories and search engines for buyers")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run one aggregate search and print it as JSON
    Search(search::SearchArgs),
    /// List the registered sources
    Sources,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    dotenvy::dotenv().ok();
    let config = tradeintel_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    // stdout carries the JSON output
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Some(Commands::Search(args)) => search::run_search(&config, args).await?,
        Some(Commands::Sources) => search::run_sources(),
        None => println!("tradeintel-cli: use `search` or `sources` (see --help)"),
    }

    Ok(())
}

#[cfg(test)]
mod tests;
