//! invguard - operator tooling for the inventory integrity kernel
//!
//! - `classify`: load state of a container for given capacity and contents
//! - `replay`: run a JSON scenario against an in-memory host and print what
//!   the guard and overload monitor did, one JSON record per line

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use inventory_kernel::{init_tracing, KernelConfig};
use inventory_types::LoadState;
use tracing::debug;

mod output;
mod replay;

use output::{print_classification, Classification, OutputFormat};

#[derive(Parser)]
#[command(name = "invguard")]
#[command(about = "Inventory integrity guard tooling", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "INVGUARD_CONFIG")]
    config: Option<String>,

    /// Log level, overrides the configured one
    #[arg(long, env = "INVGUARD_LOG_LEVEL")]
    log_level: Option<String>,

    /// Enable JSON logging
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify a container load as normal, bulging or burst
    Classify {
        #[arg(long)]
        capacity: f64,

        #[arg(long)]
        contents: f64,

        /// Bulging band width, defaults to the configured margin
        #[arg(long)]
        margin: Option<f64>,

        #[arg(short, long, value_enum, default_value = "text")]
        output: OutputFormat,
    },

    /// Replay a scenario file
    Replay {
        scenario: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = KernelConfig::load(cli.config.as_deref()).context("failed to load configuration")?;
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }
    if cli.json {
        config.logging.json = true;
    }
    init_tracing(&config.logging).context("failed to initialize logging")?;

    match cli.command {
        Commands::Classify {
            capacity,
            contents,
            margin,
            output,
        } => {
            let margin = margin.unwrap_or(config.overload.bulge_margin);
            let state = LoadState::classify(contents, capacity, margin);
            debug!(capacity, contents, margin, state = %state, "Classified load");
            print_classification(
                &Classification {
                    capacity,
                    contents,
                    margin,
                    state,
                },
                output,
            )
        }
        Commands::Replay { scenario } => {
            let json = std::fs::read_to_string(&scenario)
                .with_context(|| format!("failed to read {}", scenario.display()))?;
            let scenario = replay::parse(&json)?;
            let stdout = std::io::stdout();
            let mut out = stdout.lock();
            replay::run(scenario, config, &mut out).await
        }
    }
}
