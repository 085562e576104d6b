// src/stats/reporter.rs
use crate::types::CurrencyRecord;
use crate::utils::error::SwitchError;
use serde::Serialize;

/// Ranked currency set of one cycle
///
/// This is what data-only mode prints, and what every successful cycle
/// carries in its report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankingReport {
    /// Hash rate the yields were computed for (H/s)
    pub hash_rate: f64,
    /// BTC price in USD used for the conversion
    pub reference_usd_price: f64,
    /// Rated currencies, best first
    pub currencies: Vec<CurrencyRecord>,
}

impl RankingReport {
    /// Best currency, if any was rated
    pub fn best(&self) -> Option<&CurrencyRecord> {
        self.currencies.first()
    }

    /// Pretty-printed JSON rendering
    pub fn to_json(&self) -> Result<String, SwitchError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Fixed-width table, one line per currency
    pub fn to_table(&self) -> String {
        let mut out = format!(
            "{:<6} {:<20} {:>12} {:>14} {:>12} {:>12}\n",
            "ID", "NAME", "RATING", "USD/DAY", "COINS/DAY", "PRICE"
        );
        for c in &self.currencies {
            out.push_str(&format!(
                "{:<6} {:<20} {:>12.4} {:>14.4} {:>12.4} {:>12.8}\n",
                c.id, c.name, c.rating, c.usd_per_day, c.coins_per_day, c.price
            ));
        }
        out
    }
}
