//! results-resource CLI
//!
//! Reads a JSON request on stdin and writes the JSON response on stdout.
//! Logs and summary reports go to stderr.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use results_core::{CheckRequest, InRequest, LoggingConfig, OutRequest, ResourceConfig, Source};
use results_resource::{Checker, Fetcher, JunitCli, Publisher};
use results_store::ResultStore;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::io::AsyncReadExt;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "results-resource")]
#[command(about = "Track and fetch timestamped test results stored in a blob store")]
struct Cli {
    /// Process config (TOML)
    #[arg(short, long, env = "RESULTS_RESOURCE_CONFIG", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List versions at or after the given one
    Check,

    /// Fetch results up to the given version into a directory
    In {
        /// Destination directory
        dest: PathBuf,
    },

    /// Upload a results file as a new version
    Out {
        /// Directory containing the pipeline's inputs
        sources: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = ResourceConfig::load(cli.config.as_deref())?;
    init_tracing(&config.logging);

    match cli.command {
        Commands::Check => {
            let request: CheckRequest = read_request().await?;
            let store = open_store(&request.source).await?;

            let versions = Checker::new(store)
                .check(request.starting_version())
                .await
                .context("failed to check for new versions")?;
            write_response(&versions)
        }

        Commands::In { dest } => {
            let request: InRequest = read_request().await?;
            let store = open_store(&request.source).await?;
            let viewer = Arc::new(JunitCli::new(config.viewer.program.clone()));

            let response = Fetcher::new(store, viewer)
                .get(&request, &dest)
                .await
                .context("failed to get requested version")?;
            write_response(&response)
        }

        Commands::Out { sources } => {
            let request: OutRequest = read_request().await?;
            let store = open_store(&request.source).await?;

            let response = Publisher::new(store)
                .put(&request, &sources)
                .await
                .context("failed to put results")?;
            write_response(&response)
        }
    }
}

fn init_tracing(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn read_request<T: DeserializeOwned>() -> anyhow::Result<T> {
    let mut input = String::new();
    tokio::io::stdin()
        .read_to_string(&mut input)
        .await
        .context("failed to read input JSON")?;
    serde_json::from_str(&input).context("failed to decode input JSON")
}

async fn open_store(source: &Source) -> anyhow::Result<Arc<dyn ResultStore>> {
    let store = results_store::from_source(source)
        .await
        .context("failed to initialize storage")?;
    Ok(Arc::from(store))
}

fn write_response<T: Serialize>(response: &T) -> anyhow::Result<()> {
    serde_json::to_writer(std::io::stdout(), response).context("failed to encode output JSON")?;
    println!();
    Ok(())
}
