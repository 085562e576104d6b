use pool_chooser_rs::network::feeds::{
    DataProvider, DifficultyData, DifficultyEntry, MarketData, MarketQuote,
};
use pool_chooser_rs::network::rig::{
    CoinInfo, PriorityResponse, RestartOutcome, RigActuator, RigSummary, RigVersion,
};
use pool_chooser_rs::switcher::{
    ControlLoop, Decision, KeepReason, LoopOptions, LoopState, RecordingObserver, SwitchEvent,
};
use pool_chooser_rs::types::{PoolRecord, PoolStatus, RigPool};
use pool_chooser_rs::{
    Config, PenaltyFactor, RatingEngine, SwitchError, SwitchPolicy, aggregate,
};
use std::sync::Mutex;

fn quote(code: &str, price: f64, volume: f64) -> (String, MarketQuote) {
    (
        format!("{}/BTC", code),
        MarketQuote {
            primary_code: code.into(),
            primary_name: format!("{} coin", code),
            secondary_code: "BTC".into(),
            last_trade_price: Some(price),
            volume,
        },
    )
}

fn stats(tag: &str, difficulty: f64, block_reward: f64, profit_ratio: f64) -> DifficultyEntry {
    DifficultyEntry {
        coin_tag: tag.into(),
        coin_name: None,
        exchange_rate: 0.0,
        difficulty,
        block_reward,
        profit_ratio,
        avg_profit_ratio: 100.0,
    }
}

/// A: 0.001 BTC, volume 500, difficulty 5000, reward 10, growth 1.0
/// B: 0.002 BTC, volume 50, difficulty 8000, reward 5, growth 1.3
fn scenario() -> (MarketData, DifficultyData) {
    let market = MarketData {
        markets: [
            quote("A", 0.001, 500.0),
            quote("B", 0.002, 50.0),
            quote("C", 0.5, 10.0),
        ]
        .into_iter()
        .collect(),
    };
    let mut btc = stats("BTC", 1e9, 25.0, 100.0);
    btc.exchange_rate = 30_000.0;
    let difficulty = DifficultyData {
        entries: vec![
            btc,
            stats("A", 5000.0, 10.0, 100.0),
            stats("B", 8000.0, 5.0, 130.0),
            stats("D", 100.0, 50.0, 100.0),
        ],
    };
    (market, difficulty)
}

#[test]
fn two_currency_scenario() {
    let (market, difficulty) = scenario();
    let mut merged = aggregate(&market, &difficulty, 2_000_000.0).unwrap();

    // C has no difficulty stats, D has no quote
    assert_eq!(merged.currencies.keys().collect::<Vec<_>>(), vec!["A", "B"]);
    assert_eq!(merged.reference_usd_price, 30_000.0);

    let a = &merged.currencies["A"];
    assert!((a.coins_per_day - 0.080466).abs() < 1e-5);
    assert!((a.usd_per_day - 2.41399).abs() < 1e-4);
    let b = &merged.currencies["B"];
    assert!((b.coins_per_day - 0.025146).abs() < 1e-5);
    assert!((b.usd_per_day - 1.50877).abs() < 1e-4);
    let b_usd = b.usd_per_day;

    let observer = RecordingObserver::default();
    let engine = RatingEngine::default();
    engine.rate_all(merged.currencies.values_mut(), &observer);
    let ranking = pool_chooser_rs::switcher::rank(merged.currencies.into_values());
    assert_eq!(ranking[0].id, "A");
    assert!(ranking[0].rating > ranking[1].rating);

    let b_rated = &ranking[1];
    assert!(b_rated.rating < b_usd);
    assert!(b_rated.exchange_ratio.is_some());

    let breakdown = observer
        .events()
        .into_iter()
        .find_map(|e| match e {
            SwitchEvent::Rated(breakdown) if breakdown.id == "B" => Some(breakdown),
            _ => None,
        })
        .unwrap();
    let growth = breakdown
        .steps
        .iter()
        .position(|s| s.factor == PenaltyFactor::ProfitGrowth)
        .unwrap();
    let before = if growth == 0 {
        breakdown.base
    } else {
        breakdown.steps[growth - 1].rating
    };
    assert!(breakdown.steps[growth].change < 0.0);
    assert!(breakdown.steps[growth].rating < before);

    // Same pipeline without the growth factor rates B strictly higher
    let (market, difficulty) = scenario();
    let mut again = aggregate(&market, &difficulty, 2_000_000.0).unwrap();
    let without_growth =
        RatingEngine::new(vec![PenaltyFactor::ExchangeVolume, PenaltyFactor::Difficulty]);
    let b = again.currencies.get_mut("B").unwrap();
    without_growth.rate(b, &observer);
    assert!(b.rating > b_rated.rating);
}

#[test]
fn rig_leaves_a_coin_with_no_block_reward() {
    let market = MarketData {
        markets: [quote("LTC", 0.02, 1000.0), quote("ZRO", 0.01, 0.0)]
            .into_iter()
            .collect(),
    };
    let mut btc = stats("BTC", 1e9, 25.0, 100.0);
    btc.exchange_rate = 30_000.0;
    let difficulty = DifficultyData {
        entries: vec![
            btc,
            stats("LTC", 5000.0, 50.0, 100.0),
            stats("ZRO", 5000.0, 0.0, 100.0),
        ],
    };

    let mut merged = aggregate(&market, &difficulty, 2_000_000.0).unwrap();
    assert_eq!(merged.currencies["ZRO"].coins_per_day, 0.0);

    RatingEngine::default().rate_all(merged.currencies.values_mut(), &RecordingObserver::default());
    let ranking = pool_chooser_rs::switcher::rank(merged.currencies.into_values());
    assert_eq!(ranking[0].id, "LTC");
    assert!(ranking[0].rating > 0.0);
    assert_eq!(ranking[1].rating, 0.0);

    let pool = |index: usize, currency: &str, active: bool| PoolRecord {
        url: format!("stratum+tcp://{}.pool:3333", currency.to_lowercase()),
        status: PoolStatus::Alive,
        stratum_active: active,
        index,
        currency_id: currency.into(),
    };
    let pools = vec![pool(0, "ZRO", true), pool(1, "LTC", false)];
    let decision = SwitchPolicy::new(1.1).decide(&ranking, &pools, &RecordingObserver::default());
    assert_eq!(
        decision,
        Decision::Apply {
            currencies: vec!["LTC".into(), "ZRO".into()],
            pool_indices: vec![1, 0],
        }
    );
}

struct Feed<T>(T);

impl DataProvider for Feed<MarketData> {
    type Feed = MarketData;

    async fn get_data(&self, _force_fetch: bool) -> Result<MarketData, SwitchError> {
        Ok(self.0.clone())
    }
}

impl DataProvider for Feed<DifficultyData> {
    type Feed = DifficultyData;

    async fn get_data(&self, _force_fetch: bool) -> Result<DifficultyData, SwitchError> {
        Ok(self.0.clone())
    }
}

struct Rig {
    active: usize,
    submitted: Mutex<Vec<Vec<usize>>>,
}

impl RigActuator for Rig {
    async fn version(&self) -> Result<RigVersion, SwitchError> {
        Ok(RigVersion {
            miner: "3.7.2".into(),
            api: "1.32".into(),
        })
    }

    async fn summary(&self) -> Result<RigSummary, SwitchError> {
        Ok(RigSummary {
            hash_rate: 2_000_000.0,
        })
    }

    async fn pools(&self) -> Result<Vec<RigPool>, SwitchError> {
        Ok(["a", "b", "c"]
            .iter()
            .enumerate()
            .map(|(index, name)| RigPool {
                url: format!("stratum+tcp://{}.pool:3333", name),
                status: if *name == "c" {
                    PoolStatus::Dead
                } else {
                    PoolStatus::Alive
                },
                stratum_active: index == self.active,
                index,
            })
            .collect())
    }

    async fn set_pool_priority(&self, indices: &[usize]) -> Result<PriorityResponse, SwitchError> {
        self.submitted.lock().unwrap().push(indices.to_vec());
        Ok(PriorityResponse {
            success: true,
            message: "Changed priorities".into(),
        })
    }

    async fn restart(&self) -> Result<RestartOutcome, SwitchError> {
        Ok(RestartOutcome::Restarted)
    }

    async fn coin(&self) -> Result<CoinInfo, SwitchError> {
        Ok(CoinInfo {
            network_difficulty: 5000.0,
        })
    }
}

fn config() -> Config {
    Config::parse(
        r#"
        fallback_hash_rate = 1000000.0
        switch_threshold = 1.1

        [market]
        cache_file = "market.json"

        [difficulty]
        cache_file = "difficulty.json"
        apikey = "k"

        [pool_currency]
        "stratum+tcp://a.pool:3333" = "A"
        "stratum+tcp://b.pool:3333" = "B"
        "stratum+tcp://c.pool:3333" = "C"
        "#,
    )
    .unwrap()
}

async fn single_cycle(active: usize) -> (pool_chooser_rs::switcher::CycleReport, Vec<Vec<usize>>) {
    let (market, difficulty) = scenario();
    let rig = Rig {
        active,
        submitted: Mutex::new(Vec::new()),
    };
    let options = LoopOptions {
        single_cycle: true,
        ..LoopOptions::default()
    };
    let mut control = ControlLoop::new(
        config(),
        &rig,
        Feed(market),
        Feed(difficulty),
        RecordingObserver::default(),
        options,
    );
    let report = control.run().await;
    assert_eq!(control.state(), LoopState::Done);
    let submitted = rig.submitted.lock().unwrap().clone();
    (report, submitted)
}

#[tokio::test]
async fn switches_away_from_weaker_currency() {
    let (report, submitted) = single_cycle(1).await;
    assert_eq!(
        report.decision,
        Decision::Apply {
            currencies: vec!["A".into(), "B".into()],
            pool_indices: vec![0, 1],
        }
    );
    assert!(report.actuated);
    assert_eq!(submitted, vec![vec![0, 1]]);
    assert_eq!(report.rig.pools.len(), 2);
}

#[tokio::test]
async fn stays_on_best_currency() {
    let (report, submitted) = single_cycle(0).await;
    assert!(matches!(
        report.decision,
        Decision::Keep(KeepReason::BelowThreshold { ref active, .. }) if active == "A"
    ));
    assert!(!report.actuated);
    assert!(submitted.is_empty());
}
