// src/profit/aggregator.rs
//! Merging of market quotes and difficulty stats
//!
//! The two feeds are keyed independently: markets by pair label, difficulty
//! stats by coin tag. Only currencies present in both, quoted in BTC, and not
//! BTC itself make it into the result.

use crate::network::feeds::{DifficultyData, MarketData};
use crate::profit::estimator;
use crate::types::{CurrencyRecord, REFERENCE_CURRENCY};
use crate::utils::error::SwitchError;
use std::collections::BTreeMap;

/// Merged per-currency data for one cycle
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregation {
    /// BTC price in USD, taken from the difficulty feed
    pub reference_usd_price: f64,
    /// Currencies with both a quote and difficulty stats, keyed by tag
    pub currencies: BTreeMap<String, CurrencyRecord>,
}

struct Quote<'a> {
    name: &'a str,
    price: f64,
    volume: f64,
}

/// Merges both feeds and computes each currency's yield at `hash_rate`
///
/// # Returns
/// * `Ok(Aggregation)` - Unrated records, ready for the rating engine
/// * `Err(SwitchError::MissingReferencePrice)` - The difficulty feed has no BTC entry
/// * `Err(SwitchError::InvalidInput)` - A matched entry carries unusable numbers
pub fn aggregate(
    market: &MarketData,
    difficulty: &DifficultyData,
    hash_rate: f64,
) -> Result<Aggregation, SwitchError> {
    let mut quotes: BTreeMap<&str, Quote<'_>> = BTreeMap::new();
    for (label, quote) in &market.markets {
        if quote.secondary_code != REFERENCE_CURRENCY || quote.primary_code == REFERENCE_CURRENCY {
            continue;
        }
        let Some(price) = quote.last_trade_price else {
            log::debug!("Skipping market {} without a last trade price", label);
            continue;
        };
        quotes.insert(
            quote.primary_code.as_str(),
            Quote {
                name: &quote.primary_name,
                price,
                volume: quote.volume,
            },
        );
    }

    let reference_usd_price = difficulty
        .entries
        .iter()
        .find(|entry| entry.coin_tag == REFERENCE_CURRENCY)
        .map(|entry| entry.exchange_rate)
        .ok_or_else(|| {
            SwitchError::MissingReferencePrice(format!(
                "no {} entry among {} difficulty entries",
                REFERENCE_CURRENCY,
                difficulty.entries.len()
            ))
        })?;

    let mut currencies = BTreeMap::new();
    for entry in &difficulty.entries {
        if entry.coin_tag == REFERENCE_CURRENCY {
            continue;
        }
        let Some(quote) = quotes.get(entry.coin_tag.as_str()) else {
            continue;
        };

        let estimate = estimator::estimate(
            hash_rate,
            entry.block_reward,
            entry.difficulty,
            quote.price,
            reference_usd_price,
        )
        .map_err(|e| match e {
            SwitchError::InvalidInput(msg) => {
                SwitchError::InvalidInput(format!("{}: {}", entry.coin_tag, msg))
            }
            other => other,
        })?;

        let profit_growth = if entry.avg_profit_ratio > 0.0 {
            Some(entry.profit_ratio / entry.avg_profit_ratio)
        } else {
            None
        };

        currencies.insert(
            entry.coin_tag.clone(),
            CurrencyRecord {
                id: entry.coin_tag.clone(),
                name: quote.name.to_string(),
                price: quote.price,
                exchange_volume: quote.volume,
                difficulty: entry.difficulty,
                block_reward: entry.block_reward,
                profit_growth,
                coins_per_day: estimate.coins_per_day,
                usd_per_day: estimate.usd_per_day,
                exchange_ratio: None,
                rating: 0.0,
            },
        );
    }

    Ok(Aggregation {
        reference_usd_price,
        currencies,
    })
}
