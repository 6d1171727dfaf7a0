//! Output formatting utilities

use colored::*;
use inventory_types::LoadState;
use serde::Serialize;

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human readable text
    #[default]
    Text,
    /// JSON format
    Json,
}

/// Result of `invguard classify`.
#[derive(Debug, Serialize)]
pub struct Classification {
    pub capacity: f64,
    pub contents: f64,
    pub margin: f64,
    pub state: LoadState,
}

pub fn print_classification(result: &Classification, format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Text => {
            let state = match result.state {
                LoadState::Normal => result.state.to_string().green(),
                LoadState::Bulging => result.state.to_string().yellow(),
                LoadState::Burst => result.state.to_string().red().bold(),
            };
            println!(
                "{} / {} (margin {}): {}",
                result.contents, result.capacity, result.margin, state
            );
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(result)?);
        }
    }
    Ok(())
}
