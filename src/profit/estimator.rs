// src/profit/estimator.rs
use crate::utils::error::SwitchError;

/// Seconds per day
const SECONDS_PER_DAY: f64 = 86_400.0;

/// Hashes per difficulty-1 share for scrypt-class proof of work (2^32)
const HASHES_PER_DIFFICULTY: f64 = 4_294_967_296.0;

/// Expected daily yield of one currency
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Yield {
    /// Coins mined per day
    pub coins_per_day: f64,
    /// USD earned per day
    pub usd_per_day: f64,
}

/// Estimates the daily yield of mining one currency
///
/// # Arguments
/// * `hash_rate` - Rig hash rate in H/s
/// * `block_reward` - Coins per block
/// * `difficulty` - Network difficulty, must be positive
/// * `price` - Coin price in BTC
/// * `reference_usd_price` - BTC price in USD
///
/// # Returns
/// * `Ok(Yield)` - `coins_per_day = 86400 * hash_rate * block_reward / (difficulty * 2^32)`
///   and `usd_per_day = coins_per_day * price * reference_usd_price`
/// * `Err(SwitchError::InvalidInput)` - If any input is out of range
pub fn estimate(
    hash_rate: f64,
    block_reward: f64,
    difficulty: f64,
    price: f64,
    reference_usd_price: f64,
) -> Result<Yield, SwitchError> {
    if !difficulty.is_finite() || difficulty <= 0.0 {
        return Err(SwitchError::InvalidInput(format!(
            "difficulty must be positive, got {}",
            difficulty
        )));
    }
    non_negative("hash rate", hash_rate)?;
    non_negative("block reward", block_reward)?;
    non_negative("price", price)?;
    non_negative("reference USD price", reference_usd_price)?;

    let coins_per_day =
        SECONDS_PER_DAY * hash_rate * block_reward / (difficulty * HASHES_PER_DIFFICULTY);

    Ok(Yield {
        coins_per_day,
        usd_per_day: coins_per_day * price * reference_usd_price,
    })
}

fn non_negative(what: &str, value: f64) -> Result<(), SwitchError> {
    if !value.is_finite() || value < 0.0 {
        return Err(SwitchError::InvalidInput(format!(
            "{} must be a non-negative number, got {}",
            what, value
        )));
    }
    Ok(())
}
