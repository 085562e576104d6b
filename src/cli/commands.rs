// src/cli/commands.rs
use crate::types::PenaltyFactor;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Pool chooser CLI - points a mining rig at the most profitable coin
#[derive(Parser, Debug)]
#[command(name = "pool-chooser-rs")]
#[command(version, about, long_about = None)]
pub struct Commands {
    /// The action to perform (run the loop, print rankings, or generate config)
    #[command(subcommand)]
    pub action: Action,
}

/// Top-level commands for the pool chooser
#[derive(Subcommand, Debug)]
pub enum Action {
    /// Run the switching loop against the rig
    Run(RunOptions),

    /// Print the ranked currency set and exit without contacting the rig
    Data(DataOptions),

    /// Generate configuration file template
    Config(ConfigOptions),
}

/// Options for running the switching loop
#[derive(Parser, Debug)]
pub struct RunOptions {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    /// Run a single successful cycle, then exit
    #[arg(long)]
    pub no_loop: bool,

    /// Compute decisions but never change the rig's pool priority
    #[arg(long)]
    pub no_priority_change: bool,

    /// Ignore cached feed data
    #[arg(short, long)]
    pub fetch: bool,

    /// Penalty factors to apply, in order (overrides config)
    #[arg(short, long)]
    pub penalty: Vec<PenaltyFactor>,

    /// Log debug output, including every rating step
    #[arg(short, long)]
    pub verbose: bool,
}

/// Options for data-only mode
#[derive(Parser, Debug)]
pub struct DataOptions {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    /// Ignore cached feed data
    #[arg(short, long)]
    pub fetch: bool,

    /// Penalty factors to apply, in order (overrides config)
    #[arg(short, long)]
    pub penalty: Vec<PenaltyFactor>,

    /// Hash rate in H/s (overrides the configured fallback)
    #[arg(long)]
    pub hash_rate: Option<f64>,

    /// Print a table instead of JSON
    #[arg(short, long)]
    pub table: bool,

    /// Log debug output, including every rating step
    #[arg(short, long)]
    pub verbose: bool,
}

/// Options for generating configuration files
#[derive(Parser, Debug)]
pub struct ConfigOptions {
    /// Output file path
    #[arg(short, long, default_value = "config.toml")]
    pub output: PathBuf,
}
