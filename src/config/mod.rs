// src/config/mod.rs
//! Configuration management for the pool chooser
//!
//! This module handles all configuration-related functionality including:
//! - Loading, parsing and validating configuration files
//! - Generating configuration templates
//!
//! The configuration uses TOML format. It holds the rig connection, both
//! feed settings, the rating pipeline and the pool URL to currency table.

/// Core configuration implementation
///
/// Contains the [`Config`] struct and related types that define
/// the pool chooser's configuration structure.
pub mod config;

// Re-export key items for easy access
pub use config::{Config, RatingConfig};

use crate::utils::error::SwitchError;
use std::path::PathBuf;

/// Loads configuration from a TOML file
///
/// # Arguments
/// * `path` - Path to the configuration file (anything convertible to PathBuf)
///
/// # Returns
/// * `Ok(Config)` - Successfully loaded configuration
/// * `Err(SwitchError)` - If the file couldn't be read, parsed or validated
pub fn load(path: impl Into<PathBuf>) -> Result<Config, SwitchError> {
    Config::load(path)
}

/// Generates a commented configuration template
pub fn generate_template() -> String {
    Config::generate_template()
}
