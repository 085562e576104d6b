// src/network/feeds.rs

//! Market and difficulty data feeds
//!
//! Both feeds are plain HTTP JSON documents. The raw document of the last
//! successful query is cached on disk and served again until it is older
//! than the configured expiry, unless the caller forces a fetch.
use crate::utils::error::SwitchError;
use reqwest::Client;
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::{Duration, SystemTime};
use url::Url;

/// Source of one parsed feed document
///
/// `get_data(false)` may return a cached copy up to the provider's expiry
/// age; `get_data(true)` always queries the source.
#[allow(async_fn_in_trait)]
pub trait DataProvider {
    /// Parsed document type
    type Feed;

    /// Returns the feed, fetching it if the cache is stale or `force_fetch` is set
    ///
    /// # Errors
    /// `SwitchError::DataUnavailable` if the source cannot be reached or
    /// reports an unsuccessful query.
    async fn get_data(&self, force_fetch: bool) -> Result<Self::Feed, SwitchError>;
}

impl<T: DataProvider + ?Sized> DataProvider for &T {
    type Feed = T::Feed;

    async fn get_data(&self, force_fetch: bool) -> Result<Self::Feed, SwitchError> {
        (**self).get_data(force_fetch).await
    }
}

/// One market pair quote
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketQuote {
    /// Traded currency code, e.g. "LTC"
    #[serde(rename = "primarycode")]
    pub primary_code: String,
    /// Traded currency display name
    #[serde(rename = "primaryname", default)]
    pub primary_name: String,
    /// Currency the price is quoted in, e.g. "BTC"
    #[serde(rename = "secondarycode")]
    pub secondary_code: String,
    /// Last trade price; inactive markets report none
    #[serde(
        rename = "lasttradeprice",
        default,
        deserialize_with = "lenient_f64_opt"
    )]
    pub last_trade_price: Option<f64>,
    /// Volume traded over the quote period
    #[serde(default, deserialize_with = "lenient_f64")]
    pub volume: f64,
}

/// All market quotes, keyed by pair label (e.g. "LTC/BTC")
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MarketData {
    /// Quotes by label
    pub markets: BTreeMap<String, MarketQuote>,
}

/// Difficulty and profitability stats for one coin
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DifficultyEntry {
    /// Coin ticker
    pub coin_tag: String,
    /// Coin display name
    #[serde(default)]
    pub coin_name: Option<String>,
    /// Exchange rate; for BTC this is its USD price
    #[serde(deserialize_with = "lenient_f64")]
    pub exchange_rate: f64,
    /// Network difficulty
    #[serde(deserialize_with = "lenient_f64")]
    pub difficulty: f64,
    /// Coins per block
    #[serde(deserialize_with = "lenient_f64")]
    pub block_reward: f64,
    /// Current profitability ratio
    #[serde(default, deserialize_with = "lenient_f64")]
    pub profit_ratio: f64,
    /// Average profitability ratio
    #[serde(default, deserialize_with = "lenient_f64")]
    pub avg_profit_ratio: f64,
}

/// Difficulty stats for all coins of one algorithm
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DifficultyData {
    /// Entries in feed order
    pub entries: Vec<DifficultyEntry>,
}

/// Market feed settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketFeedConfig {
    /// Endpoint returning the market data document
    #[serde(default = "default_market_url")]
    pub url: String,
    /// Where the raw response is cached
    pub cache_file: PathBuf,
    /// Seconds a cached response stays valid
    #[serde(default = "default_market_expiry")]
    pub cache_expiry: u64,
}

/// Difficulty feed settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DifficultyFeedConfig {
    /// Endpoint returning the profitability document
    #[serde(default = "default_difficulty_url")]
    pub url: String,
    /// Where the raw response is cached
    pub cache_file: PathBuf,
    /// Seconds a cached response stays valid
    #[serde(default = "default_difficulty_expiry")]
    pub cache_expiry: u64,
    /// API key sent with every query
    pub apikey: String,
    /// Hashing algorithm to request stats for
    #[serde(default = "default_algo")]
    pub algo: String,
}

fn default_market_url() -> String {
    "http://pubapi.cryptsy.com/api.php?method=marketdatav2".into()
}

fn default_difficulty_url() -> String {
    "http://www.coinwarz.com/v1/api/profitability/".into()
}

fn default_market_expiry() -> u64 {
    300
}

fn default_difficulty_expiry() -> u64 {
    1800
}

fn default_algo() -> String {
    "scrypt".into()
}

/// On-disk copy of the last successful raw response
#[derive(Debug, Clone)]
pub struct FeedCache {
    path: PathBuf,
    expiry: Duration,
}

impl FeedCache {
    /// Creates a cache at `path` whose entries expire after `expiry`
    pub fn new(path: impl Into<PathBuf>, expiry: Duration) -> Self {
        FeedCache {
            path: path.into(),
            expiry,
        }
    }

    /// Returns the cached document if it exists and has not expired
    ///
    /// Unreadable or corrupt cache files count as a miss.
    pub async fn load_fresh(&self) -> Option<Value> {
        let modified = tokio::fs::metadata(&self.path).await.ok()?.modified().ok()?;
        // An expiry too large to represent never runs out.
        if modified
            .checked_add(self.expiry)
            .is_some_and(|expires| expires <= SystemTime::now())
        {
            return None;
        }
        let raw = tokio::fs::read(&self.path).await.ok()?;
        match serde_json::from_slice(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                log::warn!("Ignoring corrupt cache {}: {}", self.path.display(), e);
                None
            }
        }
    }

    /// Replaces the cached document
    pub async fn store(&self, value: &Value) -> Result<(), SwitchError> {
        let pretty = serde_json::to_string_pretty(value)?;
        tokio::fs::write(&self.path, pretty).await?;
        Ok(())
    }
}

/// Client for the Cryptsy-style `marketdatav2` feed
pub struct CryptsyClient {
    config: MarketFeedConfig,
    client: Client,
    cache: FeedCache,
}

impl CryptsyClient {
    /// Creates a client with its own HTTP connection pool and cache
    pub fn new(config: MarketFeedConfig) -> Self {
        let cache = FeedCache::new(&config.cache_file, Duration::from_secs(config.cache_expiry));
        CryptsyClient {
            config,
            client: Client::new(),
            cache,
        }
    }
}

impl DataProvider for CryptsyClient {
    type Feed = MarketData;

    async fn get_data(&self, force_fetch: bool) -> Result<MarketData, SwitchError> {
        let url = Url::parse(&self.config.url)?;
        let document = load_document(
            "Cryptsy",
            &self.client,
            url,
            &self.cache,
            force_fetch,
            |doc| is_truthy(doc.get("success")),
        )
        .await?;
        parse_market_data(document)
    }
}

/// Client for the Coinwarz-style profitability feed
pub struct CoinwarzClient {
    config: DifficultyFeedConfig,
    client: Client,
    cache: FeedCache,
}

impl CoinwarzClient {
    /// Creates a client with its own HTTP connection pool and cache
    pub fn new(config: DifficultyFeedConfig) -> Self {
        let cache = FeedCache::new(&config.cache_file, Duration::from_secs(config.cache_expiry));
        CoinwarzClient {
            config,
            client: Client::new(),
            cache,
        }
    }

    fn query_url(&self) -> Result<Url, SwitchError> {
        Ok(Url::parse_with_params(
            &self.config.url,
            &[
                ("apikey", self.config.apikey.as_str()),
                ("algo", self.config.algo.as_str()),
            ],
        )?)
    }
}

impl DataProvider for CoinwarzClient {
    type Feed = DifficultyData;

    async fn get_data(&self, force_fetch: bool) -> Result<DifficultyData, SwitchError> {
        let url = self.query_url()?;
        let document = load_document(
            "Coinwarz",
            &self.client,
            url,
            &self.cache,
            force_fetch,
            |doc| is_truthy(doc.get("Success")),
        )
        .await?;
        parse_difficulty_data(document)
    }
}

/// Serves `cache` when fresh, otherwise fetches, validates and re-caches
async fn load_document(
    name: &str,
    client: &Client,
    url: Url,
    cache: &FeedCache,
    force_fetch: bool,
    check: impl Fn(&Value) -> bool,
) -> Result<Value, SwitchError> {
    if !force_fetch {
        if let Some(cached) = cache.load_fresh().await {
            log::debug!("Loading cached {} data", name);
            return Ok(cached);
        }
    }

    log::info!("Fetching {} data...", name);
    let document: Value = client
        .get(url)
        .send()
        .await
        .and_then(|response| response.error_for_status())
        .map_err(|e| SwitchError::DataUnavailable(format!("{} unreachable: {}", name, e)))?
        .json()
        .await
        .map_err(|e| SwitchError::DataUnavailable(format!("{} sent invalid JSON: {}", name, e)))?;

    if !check(&document) {
        let message = document
            .get("Message")
            .or_else(|| document.get("error"))
            .and_then(Value::as_str)
            .unwrap_or("query unsuccessful");
        return Err(SwitchError::DataUnavailable(format!("{}: {}", name, message)));
    }
    log::info!("{} data loaded successfully", name);

    if let Err(e) = cache.store(&document).await {
        log::warn!("Could not cache {} data: {}", name, e);
    }
    Ok(document)
}

/// Extracts market quotes from a `marketdatav2` document
pub fn parse_market_data(document: Value) -> Result<MarketData, SwitchError> {
    let markets = document
        .get("return")
        .and_then(|r| r.get("markets"))
        .cloned()
        .ok_or_else(|| SwitchError::DataUnavailable("market document has no markets".into()))?;
    let markets = serde_json::from_value(markets)
        .map_err(|e| SwitchError::DataUnavailable(format!("malformed market document: {}", e)))?;
    Ok(MarketData { markets })
}

/// Extracts difficulty entries from a profitability document
pub fn parse_difficulty_data(document: Value) -> Result<DifficultyData, SwitchError> {
    let entries = document
        .get("Data")
        .cloned()
        .ok_or_else(|| SwitchError::DataUnavailable("difficulty document has no data".into()))?;
    let entries = serde_json::from_value(entries).map_err(|e| {
        SwitchError::DataUnavailable(format!("malformed difficulty document: {}", e))
    })?;
    Ok(DifficultyData { entries })
}

fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|n| n != 0.0),
        Some(Value::String(s)) => !s.is_empty() && s != "0",
        _ => false,
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum LenientNumber {
    Number(f64),
    Text(String),
}

/// Accepts numbers encoded either as JSON numbers or as strings
fn lenient_f64_opt<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<LenientNumber>::deserialize(deserializer)? {
        None => Ok(None),
        Some(LenientNumber::Number(n)) => Ok(Some(n)),
        Some(LenientNumber::Text(s)) if s.trim().is_empty() => Ok(None),
        Some(LenientNumber::Text(s)) => s.trim().parse().map(Some).map_err(de::Error::custom),
    }
}

fn lenient_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_f64_opt(deserializer)?.unwrap_or(0.0))
}
