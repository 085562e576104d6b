// src/types.rs
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Ticker of the reference currency every quote is settled in
pub const REFERENCE_CURRENCY: &str = "BTC";

/// Penalty factors the rating engine can apply to a currency's USD yield
///
/// Each factor yields a dimensionless adjustment `f`, applied as `(1 + f)`.
/// The order in which factors are listed is the order they are applied in.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PenaltyFactor {
    /// Low trading volume compared to mined supply
    ///
    /// Coins that trade thinly relative to what the rig would produce tend to
    /// have unstable prices.
    #[clap(name = "exchange-volume")]
    ExchangeVolume,

    /// Profitability spiking above its recent average
    ///
    /// Spikes rarely last; larger spikes are penalized harder.
    #[clap(name = "profit-growth")]
    ProfitGrowth,

    /// High network difficulty
    ///
    /// Slow block discovery makes frequent switching into and out of the coin
    /// costly on PPLNS pools.
    #[clap(name = "difficulty")]
    Difficulty,
}

impl PenaltyFactor {
    /// The full pipeline, in application order
    pub const ALL: [PenaltyFactor; 3] = [
        PenaltyFactor::ExchangeVolume,
        PenaltyFactor::ProfitGrowth,
        PenaltyFactor::Difficulty,
    ];
}

impl fmt::Display for PenaltyFactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PenaltyFactor::ExchangeVolume => write!(f, "exchange-volume"),
            PenaltyFactor::ProfitGrowth => write!(f, "profit-growth"),
            PenaltyFactor::Difficulty => write!(f, "difficulty"),
        }
    }
}

/// Pool health as reported by the rig
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PoolStatus {
    /// Pool is reachable and can receive work
    Alive,
    /// Pool is unreachable
    Dead,
    /// Any other state the rig reports (e.g. "Disabled", "Rejecting")
    Other(String),
}

impl fmt::Display for PoolStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PoolStatus::Alive => write!(f, "Alive"),
            PoolStatus::Dead => write!(f, "Dead"),
            PoolStatus::Other(s) => write!(f, "{}", s),
        }
    }
}

impl From<&str> for PoolStatus {
    fn from(s: &str) -> Self {
        match s {
            "Alive" => PoolStatus::Alive,
            "Dead" => PoolStatus::Dead,
            other => PoolStatus::Other(other.to_string()),
        }
    }
}

/// A pool as listed by the rig, before currency resolution
#[derive(Clone, Debug, PartialEq)]
pub struct RigPool {
    /// Pool URL, used as key into the configured currency table
    pub url: String,
    /// Pool health
    pub status: PoolStatus,
    /// Whether the rig is currently sending work to this pool
    pub stratum_active: bool,
    /// Pool number accepted by the rig's priority command
    pub index: usize,
}

/// A visible pool with its currency resolved
#[derive(Clone, Debug, PartialEq)]
pub struct PoolRecord {
    /// Pool URL
    pub url: String,
    /// Pool health (always `Alive` once resolved)
    pub status: PoolStatus,
    /// Whether the rig is currently sending work to this pool
    pub stratum_active: bool,
    /// Pool number accepted by the rig's priority command
    pub index: usize,
    /// Currency mined on this pool
    pub currency_id: String,
}

/// Per-currency profitability record, rebuilt every cycle
///
/// Only currencies that had both a BTC market quote and a difficulty entry
/// ever become a `CurrencyRecord`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CurrencyRecord {
    /// Currency tag, e.g. "LTC"
    pub id: String,
    /// Display name
    pub name: String,
    /// Last trade price in BTC
    pub price: f64,
    /// Trading volume over the quote period
    pub exchange_volume: f64,
    /// Network difficulty
    pub difficulty: f64,
    /// Coins awarded per block
    pub block_reward: f64,
    /// Current over average profitability; absent when the feed has no average
    pub profit_growth: Option<f64>,
    /// Expected coins mined per day at the cycle's hash rate
    pub coins_per_day: f64,
    /// Expected USD earned per day
    pub usd_per_day: f64,
    /// Exchange volume over coins per day, filled in by the volume penalty
    pub exchange_ratio: Option<f64>,
    /// Comparable score; only meaningful within one cycle
    pub rating: f64,
}
