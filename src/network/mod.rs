// src/network/mod.rs
//! Network communication components
//!
//! The two collaborators the control loop depends on, each behind a trait:
//! - [`RigActuator`]: the mining rig's command interface (CGMiner JSON API)
//! - [`DataProvider`]: the market and difficulty feeds (HTTP JSON with an
//!   on-disk cache)

/// Mining rig client implementation
///
/// Sends one JSON command per TCP connection to a CGMiner-compatible API.
pub mod rig;

/// Market and difficulty feed clients
///
/// Fetch JSON documents over HTTP and cache the raw responses on disk.
pub mod feeds;

// Re-export main components for cleaner imports
pub use feeds::{CoinwarzClient, CryptsyClient, DataProvider, FeedCache};
pub use rig::{CgminerClient, RestartOutcome, RigActuator};
