use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use store_locator::config::Config;

mod commands;

#[derive(Parser)]
#[command(
    name = "store-locator",
    version,
    about = "Store directory crawler and rate-limited address geocoder",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log format (text, json)
    #[arg(long, global = true)]
    log_format: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Crawl the store directory into a line-delimited JSON file
    Crawl {
        /// Output file path
        #[arg(short, long)]
        output: PathBuf,

        /// Override the directory root URL
        #[arg(long)]
        start_url: Option<String>,
    },

    /// Attach coordinates to crawled store records
    Geocode {
        /// Input file produced by `crawl`
        #[arg(short, long)]
        input: PathBuf,

        /// Output file path
        #[arg(short, long)]
        output: PathBuf,

        /// Skip malformed input lines instead of aborting
        #[arg(long, default_value = "false")]
        skip_malformed: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    config.apply_env();

    let log_format = cli
        .log_format
        .clone()
        .unwrap_or_else(|| config.logging.format.clone());
    setup_tracing(&log_format, &config.logging.level, cli.verbose)?;

    tracing::info!("store-locator starting");

    match cli.command {
        Commands::Crawl { output, start_url } => {
            if let Some(url) = start_url {
                config.crawler.start_url = url;
            }
            tracing::info!(
                start_url = %config.crawler.start_url,
                output = %output.display(),
                "Starting crawl command"
            );
            commands::crawl(config, output).await?;
        }

        Commands::Geocode {
            input,
            output,
            skip_malformed,
        } => {
            tracing::info!(
                input = %input.display(),
                output = %output.display(),
                skip_malformed = %skip_malformed,
                "Starting geocode command"
            );
            commands::geocode(config, input, output, skip_malformed).await?;
        }
    }

    tracing::info!("store-locator completed successfully");
    Ok(())
}

/// Logs go to stderr so stdout stays free for piping
fn setup_tracing(format: &str, level: &str, verbose: bool) -> Result<()> {
    let env_filter = if verbose {
        tracing_subscriber::EnvFilter::new("store_locator=debug,info")
    } else {
        tracing_subscriber::EnvFilter::try_new(format!("store_locator={level},warn"))
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("store_locator=info,warn"))
    };

    match format {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(std::io::stderr),
                )
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .pretty()
                        .with_writer(std::io::stderr),
                )
                .init();
        }
    }

    Ok(())
}
