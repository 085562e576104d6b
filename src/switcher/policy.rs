// src/switcher/policy.rs
//! Switch decision policy
//!
//! Decides whether the rig's pool order should follow the latest ranking.
//! Once a pool is active, a new order is only applied when the best
//! currency beats the active one by at least the configured ratio, so small
//! rating noise does not make the rig hop between pools.

use crate::switcher::observer::{RankEntry, SwitchEvent, SwitchObserver};
use crate::types::{CurrencyRecord, PoolRecord, PoolStatus, RigPool};
use std::collections::{BTreeMap, HashSet};

/// What to do with the rig's pool priority
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    /// Submit a new pool order
    Apply {
        /// Currencies in priority order
        currencies: Vec<String>,
        /// Pool numbers in priority order
        pool_indices: Vec<usize>,
    },
    /// Leave the current order alone
    Keep(KeepReason),
}

/// Why the pool order is left alone
#[derive(Debug, Clone, PartialEq)]
pub enum KeepReason {
    /// No ranked currency has a visible pool
    NoCandidates,
    /// The best currency is not enough better than the active one
    BelowThreshold {
        /// Currently mined currency
        active: String,
        /// Best ranked currency
        candidate: String,
        /// Candidate rating over active rating
        ratio: f64,
    },
}

/// Sorts currencies by rating, best first
///
/// Equal ratings keep their input order; for the aggregator's output that
/// is ascending currency tag. Non-finite ratings sort last.
pub fn rank(currencies: impl IntoIterator<Item = CurrencyRecord>) -> Vec<CurrencyRecord> {
    let mut ranking: Vec<CurrencyRecord> = currencies.into_iter().collect();
    ranking.sort_by(|a, b| rank_key(b.rating).total_cmp(&rank_key(a.rating)));
    ranking
}

fn rank_key(rating: f64) -> f64 {
    if rating.is_finite() {
        rating
    } else {
        f64::NEG_INFINITY
    }
}

/// Candidate rating over active rating
///
/// An active currency with no usable rating (zero, negative or not finite)
/// loses to any candidate that has one. If neither has one the ratio is NaN.
fn switch_ratio(candidate: f64, active: f64) -> f64 {
    let usable = |rating: f64| rating.is_finite() && rating > 0.0;
    match (usable(candidate), usable(active)) {
        (true, true) => candidate / active,
        (true, false) => f64::INFINITY,
        _ => f64::NAN,
    }
}

/// Summarizes a ranking for observers and reports
pub fn rank_entries(ranking: &[CurrencyRecord]) -> Vec<RankEntry> {
    ranking
        .iter()
        .map(|c| RankEntry {
            id: c.id.clone(),
            name: c.name.clone(),
            rating: c.rating,
            usd_per_day: c.usd_per_day,
        })
        .collect()
}

/// Keeps live pools and attaches their currency
///
/// Pools whose URL is missing from `pool_currency` are dropped and reported.
pub fn resolve_pools(
    pools: &[RigPool],
    pool_currency: &BTreeMap<String, String>,
    observer: &dyn SwitchObserver,
) -> Vec<PoolRecord> {
    pools
        .iter()
        .filter(|pool| pool.status == PoolStatus::Alive)
        .filter_map(|pool| match pool_currency.get(&pool.url) {
            Some(currency) => Some(PoolRecord {
                url: pool.url.clone(),
                status: pool.status.clone(),
                stratum_active: pool.stratum_active,
                index: pool.index,
                currency_id: currency.clone(),
            }),
            None => {
                observer.notify(SwitchEvent::UnknownPool {
                    url: pool.url.clone(),
                });
                None
            }
        })
        .collect()
}

/// Currency of the pool currently receiving work, if any
pub fn active_currency(pools: &[PoolRecord]) -> Option<&str> {
    pools
        .iter()
        .find(|pool| pool.stratum_active)
        .map(|pool| pool.currency_id.as_str())
}

/// Hysteresis-based switching rule
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SwitchPolicy {
    threshold: f64,
}

impl SwitchPolicy {
    /// Creates a policy switching once the best currency is `threshold` times
    /// better than the active one
    pub fn new(threshold: f64) -> Self {
        SwitchPolicy { threshold }
    }

    /// Configured threshold ratio
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Decides on a pool order for `ranking` (best first) and visible `pools`
    ///
    /// Pure apart from notifying `observer`: the same inputs always give the
    /// same decision.
    pub fn decide(
        &self,
        ranking: &[CurrencyRecord],
        pools: &[PoolRecord],
        observer: &dyn SwitchObserver,
    ) -> Decision {
        let pooled: HashSet<&str> = pools.iter().map(|p| p.currency_id.as_str()).collect();
        let candidates: Vec<&CurrencyRecord> = ranking
            .iter()
            .filter(|c| pooled.contains(c.id.as_str()))
            .collect();

        let Some(top) = candidates.first() else {
            return Decision::Keep(KeepReason::NoCandidates);
        };

        match active_currency(pools) {
            None => observer.notify(SwitchEvent::Priming {
                top: top.id.clone(),
            }),
            Some(active) => {
                // An active currency missing from the ranking has no rating
                // to defend, so any candidate wins.
                let ratio = candidates
                    .iter()
                    .find(|c| c.id == active)
                    .map(|current| switch_ratio(top.rating, current.rating))
                    .unwrap_or(f64::INFINITY);

                // NaN (nothing worth mining anywhere) compares false and holds.
                if !(ratio >= self.threshold) {
                    observer.notify(SwitchEvent::Held {
                        active: active.to_string(),
                        candidate: top.id.clone(),
                        ratio,
                        threshold: self.threshold,
                    });
                    return Decision::Keep(KeepReason::BelowThreshold {
                        active: active.to_string(),
                        candidate: top.id.clone(),
                        ratio,
                    });
                }
                observer.notify(SwitchEvent::Switching {
                    active: active.to_string(),
                    candidate: top.id.clone(),
                    ratio,
                    threshold: self.threshold,
                });
            }
        }

        let mut pool_indices = Vec::with_capacity(pools.len());
        for currency in &candidates {
            for pool in pools.iter().filter(|p| p.currency_id == currency.id) {
                if !pool_indices.contains(&pool.index) {
                    pool_indices.push(pool.index);
                }
            }
        }

        Decision::Apply {
            currencies: candidates.iter().map(|c| c.id.clone()).collect(),
            pool_indices,
        }
    }
}
