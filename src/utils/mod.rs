// src/utils/mod.rs
//! Utilities module for common functionality
//!
//! Error handling and logging infrastructure shared by the library and the
//! binary.

/// Error types and handling utilities
///
/// Contains the [`SwitchError`] enum which defines all possible error conditions
/// for the pool chooser, along with conversion implementations.
pub mod error;

/// Logging configuration and utilities
pub mod logging;

// Re-export for easier access
pub use error::SwitchError;
pub use logging::{init_data_logging, init_logging};
