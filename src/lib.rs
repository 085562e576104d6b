//! Pool chooser - profitability-driven pool switching for mining rigs
//!
//! This crate keeps a CGMiner-compatible rig pointed at the most profitable
//! coin:
//! - Estimates each coin's daily yield from market price, difficulty and the
//!   rig's hash rate
//! - Rates coins through a configurable pipeline of penalty factors
//! - Reorders the rig's pool priority, with hysteresis against thrashing
//! - Keeps running through feed and rig outages

#![warn(missing_docs)]
#![forbid(unsafe_code)]

/// Profitability estimation, feed merging and rating
pub mod profit;

/// Switch policy, control loop and decision observers
pub mod switcher;

/// Rig and data feed clients
pub mod network;

/// Ranking reports
pub mod stats;

/// Utility functions and error handling
pub mod utils;

/// Command-line interface definitions
pub mod cli;

/// Configuration management
pub mod config;

/// Shared type definitions
pub mod types;

// Core exports
pub use cli::Commands;
pub use config::Config;
pub use network::{CgminerClient, CoinwarzClient, CryptsyClient, DataProvider, RigActuator};
pub use profit::{Aggregation, RatingEngine, aggregate, estimate};
pub use stats::RankingReport;
pub use switcher::{
    ControlLoop, Decision, LogObserver, LoopOptions, LoopState, SwitchObserver, SwitchPolicy,
};
pub use types::{CurrencyRecord, PenaltyFactor, PoolRecord};
pub use utils::{SwitchError, init_logging};
