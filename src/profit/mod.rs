// src/profit/mod.rs
//! Profitability estimation and rating
//!
//! - [`estimator`]: expected coins and USD per day for one currency
//! - [`aggregator`]: merges market and difficulty feeds into currency records
//! - [`rating`]: penalty pipeline turning USD/day into a comparable rating

/// Daily yield estimation
pub mod estimator;

/// Feed merging
pub mod aggregator;

/// Rating pipeline
pub mod rating;

pub use aggregator::{Aggregation, aggregate};
pub use estimator::{Yield, estimate};
pub use rating::{RatingBreakdown, RatingEngine, RatingStep};
