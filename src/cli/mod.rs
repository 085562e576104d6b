// src/cli/mod.rs
//! Command-line interface definitions

/// Argument parser and subcommand options
pub mod commands;

pub use commands::{Action, Commands, ConfigOptions, DataOptions, RunOptions};
