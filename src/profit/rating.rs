// src/profit/rating.rs
//! Currency rating
//!
//! Turns a currency's raw USD/day yield into a rating by running it through
//! an ordered list of penalty factors: `rating = usd_per_day * Π(1 + f_i)`.

use crate::switcher::observer::{SwitchEvent, SwitchObserver};
use crate::types::{CurrencyRecord, PenaltyFactor};
use serde::Serialize;

impl PenaltyFactor {
    /// Computes this factor's adjustment `f` for a currency
    ///
    /// The exchange volume factor also stores the computed exchange ratio on
    /// the record; nothing downstream reads it.
    pub fn adjustment(&self, currency: &mut CurrencyRecord) -> f64 {
        match self {
            PenaltyFactor::ExchangeVolume => {
                // Nothing mined means no ratio to speak of; take the full penalty.
                if !(currency.coins_per_day > 0.0) {
                    currency.exchange_ratio = None;
                    return -0.3;
                }
                let exchange_ratio = currency.exchange_volume / currency.coins_per_day;
                currency.exchange_ratio = Some(exchange_ratio);
                ((-1000.0 / exchange_ratio).exp() - 0.6) / 2.0
            }
            PenaltyFactor::ProfitGrowth => match currency.profit_growth {
                Some(growth) if growth > 1.0 => -(-1.5 / (growth - 1.0)).exp(),
                _ => 0.0,
            },
            PenaltyFactor::Difficulty => -(-200.0 / currency.difficulty).exp() / 5.0,
        }
    }
}

/// One applied penalty step
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RatingStep {
    /// Factor applied
    pub factor: PenaltyFactor,
    /// Adjustment `f`; the rating was multiplied by `1 + f`
    pub change: f64,
    /// Rating after this step
    pub rating: f64,
}

/// How a currency's rating was reached
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RatingBreakdown {
    /// Currency tag
    pub id: String,
    /// Display name
    pub name: String,
    /// Starting point: USD per day
    pub base: f64,
    /// Steps in application order
    pub steps: Vec<RatingStep>,
    /// Final rating
    pub rating: f64,
}

/// Applies a configured penalty pipeline to currencies
#[derive(Debug, Clone, PartialEq)]
pub struct RatingEngine {
    penalties: Vec<PenaltyFactor>,
}

impl Default for RatingEngine {
    fn default() -> Self {
        RatingEngine::new(PenaltyFactor::ALL.to_vec())
    }
}

impl RatingEngine {
    /// Creates an engine applying `penalties` in the given order
    ///
    /// An empty list rates every currency at its raw USD/day yield.
    pub fn new(penalties: Vec<PenaltyFactor>) -> Self {
        RatingEngine { penalties }
    }

    /// Factors this engine applies, in order
    pub fn penalties(&self) -> &[PenaltyFactor] {
        &self.penalties
    }

    /// Rates one currency and stores the result in its `rating` field
    ///
    /// The full breakdown is reported to `observer` and returned.
    pub fn rate(
        &self,
        currency: &mut CurrencyRecord,
        observer: &dyn SwitchObserver,
    ) -> RatingBreakdown {
        let base = currency.usd_per_day;
        let mut rating = base;
        let mut steps = Vec::with_capacity(self.penalties.len());

        for factor in &self.penalties {
            let change = factor.adjustment(currency);
            rating *= 1.0 + change;
            steps.push(RatingStep {
                factor: *factor,
                change,
                rating,
            });
        }

        currency.rating = rating;
        let breakdown = RatingBreakdown {
            id: currency.id.clone(),
            name: currency.name.clone(),
            base,
            steps,
            rating,
        };
        observer.notify(SwitchEvent::Rated(breakdown.clone()));
        breakdown
    }

    /// Rates every currency in place
    pub fn rate_all<'a, I>(&self, currencies: I, observer: &dyn SwitchObserver)
    where
        I: IntoIterator<Item = &'a mut CurrencyRecord>,
    {
        for currency in currencies {
            self.rate(currency, observer);
        }
    }
}
