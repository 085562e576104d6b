//! Ranking reports
//!
//! The ranked currency set of a cycle, in a form that can be printed as a
//! table or serialized to JSON. Data-only mode writes it to stdout; the
//! control loop returns it with every successful cycle.
//!

/// Submodule containing the ranking report
pub mod reporter;

// Re-export main components
pub use reporter::RankingReport;
