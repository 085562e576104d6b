// src/switcher/control.rs
//! Control loop
//!
//! One cycle: query the rig, fetch and merge the feeds, rate and rank,
//! decide, act, sleep. Rig status failures only degrade the cycle (an older
//! hash rate is used); everything after that aborts the cycle and the loop
//! retries after the shorter retry interval.

use crate::config::Config;
use crate::network::feeds::{DataProvider, DifficultyData, MarketData};
use crate::network::rig::{RestartOutcome, RigActuator};
use crate::profit::aggregator::{Aggregation, aggregate};
use crate::profit::rating::RatingEngine;
use crate::stats::RankingReport;
use crate::switcher::observer::{SwitchEvent, SwitchObserver};
use crate::switcher::policy::{self, Decision, KeepReason, SwitchPolicy};
use crate::types::PoolRecord;
use crate::utils::error::SwitchError;
use std::time::Duration;
use tokio::time::{self, Instant};

/// States of the control loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    /// Querying versions, hash rate and pools
    FetchRigStatus,
    /// Fetching and merging the feeds
    FetchMarketData,
    /// Rating, ranking and running the switch policy
    Decide,
    /// Submitting a new pool order
    Act,
    /// Waiting after a successful cycle
    Sleep,
    /// Waiting after a failed cycle
    ErrorSleep,
    /// Single-cycle mode finished
    Done,
}

/// Run-time switches, mostly from the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopOptions {
    /// Stop after the first successful cycle
    pub single_cycle: bool,
    /// Submit decided pool orders to the rig
    pub allow_priority_change: bool,
    /// Bypass feed caches
    pub force_fetch: bool,
}

impl Default for LoopOptions {
    fn default() -> Self {
        LoopOptions {
            single_cycle: false,
            allow_priority_change: true,
            force_fetch: false,
        }
    }
}

/// What the rig told us at the start of a cycle
#[derive(Debug, Clone, PartialEq)]
pub struct RigStatus {
    /// Hash rate used for the cycle (H/s)
    pub hash_rate: f64,
    /// Whether the rig answered
    pub reachable: bool,
    /// Live pools with a known currency
    pub pools: Vec<PoolRecord>,
}

/// Outcome of a successful cycle
#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    /// Rig state the decision was based on
    pub rig: RigStatus,
    /// Ranked currencies
    pub ranking: RankingReport,
    /// Policy decision
    pub decision: Decision,
    /// Whether a new pool order was accepted by the rig
    pub actuated: bool,
}

/// Fetches both feeds and merges them for `hash_rate`
pub async fn fetch_aggregation<M, D>(
    market: &M,
    difficulty: &D,
    hash_rate: f64,
    force_fetch: bool,
) -> Result<Aggregation, SwitchError>
where
    M: DataProvider<Feed = MarketData>,
    D: DataProvider<Feed = DifficultyData>,
{
    let market_data = market.get_data(force_fetch).await?;
    let difficulty_data = difficulty.get_data(force_fetch).await?;
    aggregate(&market_data, &difficulty_data, hash_rate)
}

/// Rates every merged currency and ranks them, best first
pub fn rate_and_rank(
    aggregation: Aggregation,
    hash_rate: f64,
    engine: &RatingEngine,
    observer: &dyn SwitchObserver,
) -> RankingReport {
    let Aggregation {
        reference_usd_price,
        mut currencies,
    } = aggregation;
    engine.rate_all(currencies.values_mut(), observer);
    let ranked = policy::rank(currencies.into_values());
    observer.notify(SwitchEvent::Ranked(policy::rank_entries(&ranked)));
    RankingReport {
        hash_rate,
        reference_usd_price,
        currencies: ranked,
    }
}

/// Fetches, merges, rates and ranks without touching the rig
pub async fn fetch_ranking<M, D>(
    market: &M,
    difficulty: &D,
    engine: &RatingEngine,
    hash_rate: f64,
    force_fetch: bool,
    observer: &dyn SwitchObserver,
) -> Result<RankingReport, SwitchError>
where
    M: DataProvider<Feed = MarketData>,
    D: DataProvider<Feed = DifficultyData>,
{
    let aggregation = fetch_aggregation(market, difficulty, hash_rate, force_fetch).await?;
    Ok(rate_and_rank(aggregation, hash_rate, engine, observer))
}

/// The pool chooser's main loop
///
/// Owns its collaborators and the only state that outlives a cycle: the
/// last hash rate the rig reported.
pub struct ControlLoop<R, M, D, O> {
    config: Config,
    rig: R,
    market: M,
    difficulty: D,
    observer: O,
    engine: RatingEngine,
    policy: SwitchPolicy,
    options: LoopOptions,
    last_hash_rate: f64,
    state: LoopState,
}

impl<R, M, D, O> ControlLoop<R, M, D, O>
where
    R: RigActuator,
    M: DataProvider<Feed = MarketData>,
    D: DataProvider<Feed = DifficultyData>,
    O: SwitchObserver,
{
    /// Creates a loop with the rating pipeline and threshold from `config`
    pub fn new(
        config: Config,
        rig: R,
        market: M,
        difficulty: D,
        observer: O,
        options: LoopOptions,
    ) -> Self {
        let engine = RatingEngine::new(config.rating.penalties.clone());
        let policy = SwitchPolicy::new(config.switch_threshold);
        let last_hash_rate = config.fallback_hash_rate;
        ControlLoop {
            config,
            rig,
            market,
            difficulty,
            observer,
            engine,
            policy,
            options,
            last_hash_rate,
            state: LoopState::FetchRigStatus,
        }
    }

    /// Replaces the rating pipeline
    pub fn with_engine(mut self, engine: RatingEngine) -> Self {
        self.engine = engine;
        self
    }

    /// Current state
    pub fn state(&self) -> LoopState {
        self.state
    }

    /// Hash rate the next cycle falls back to if the rig is unreachable
    pub fn last_hash_rate(&self) -> f64 {
        self.last_hash_rate
    }

    /// Runs cycles until single-cycle mode completes one successfully
    ///
    /// In continuous mode this never returns.
    pub async fn run(&mut self) -> CycleReport {
        loop {
            if let Ok(report) = self.run_cycle().await {
                if self.options.single_cycle {
                    self.enter(LoopState::Done);
                    return report;
                }
            }
            if let Some(pause) = pause_after(self.state, &self.config) {
                time::sleep(pause).await;
            }
        }
    }

    /// Runs one cycle, leaving the loop in `Sleep` or `ErrorSleep`
    ///
    /// Cycle-fatal errors are reported to the observer before being returned.
    pub async fn run_cycle(&mut self) -> Result<CycleReport, SwitchError> {
        self.enter(LoopState::FetchRigStatus);
        let rig = self.fetch_rig_status().await;

        match self.market_and_decision(rig).await {
            Ok(report) => {
                self.enter(LoopState::Sleep);
                Ok(report)
            }
            Err(error) => {
                self.observer.notify(SwitchEvent::CycleFailed {
                    phase: self.state,
                    error: error.to_string(),
                });
                self.enter(LoopState::ErrorSleep);
                Err(error)
            }
        }
    }

    async fn market_and_decision(&mut self, rig: RigStatus) -> Result<CycleReport, SwitchError> {
        self.enter(LoopState::FetchMarketData);
        let aggregation = fetch_aggregation(
            &self.market,
            &self.difficulty,
            rig.hash_rate,
            self.options.force_fetch,
        )
        .await?;

        self.enter(LoopState::Decide);
        let ranking = rate_and_rank(aggregation, rig.hash_rate, &self.engine, &self.observer);
        let decision = if rig.pools.is_empty() {
            self.observer.notify(SwitchEvent::NoPools);
            Decision::Keep(KeepReason::NoCandidates)
        } else {
            self.policy
                .decide(&ranking.currencies, &rig.pools, &self.observer)
        };

        let actuated = match &decision {
            Decision::Apply { pool_indices, .. } => {
                self.enter(LoopState::Act);
                self.act(pool_indices).await?
            }
            Decision::Keep(_) => false,
        };

        Ok(CycleReport {
            rig,
            ranking,
            decision,
            actuated,
        })
    }

    /// Queries the rig; never fails, falls back to the last hash rate instead
    async fn fetch_rig_status(&mut self) -> RigStatus {
        let query = async {
            let version = self.rig.version().await?;
            let summary = self.rig.summary().await?;
            let pools = self.rig.pools().await?;
            Ok::<_, SwitchError>((version, summary, pools))
        };

        match query.await {
            Ok((version, summary, pools)) => {
                if summary.hash_rate > 0.0 && summary.hash_rate.is_finite() {
                    self.last_hash_rate = summary.hash_rate;
                } else {
                    self.observer.notify(SwitchEvent::HashRateFallback {
                        hash_rate: self.last_hash_rate,
                        reason: format!("rig reports hash rate {}", summary.hash_rate),
                    });
                }
                let network_difficulty = match self.rig.coin().await {
                    Ok(coin) => Some(coin.network_difficulty),
                    Err(e) => {
                        log::debug!("Coin info unavailable: {}", e);
                        None
                    }
                };
                self.observer.notify(SwitchEvent::RigStatus {
                    miner: version.miner,
                    hash_rate: self.last_hash_rate,
                    network_difficulty,
                });
                RigStatus {
                    hash_rate: self.last_hash_rate,
                    reachable: true,
                    pools: policy::resolve_pools(
                        &pools,
                        &self.config.pool_currency,
                        &self.observer,
                    ),
                }
            }
            Err(e) => {
                self.observer.notify(SwitchEvent::HashRateFallback {
                    hash_rate: self.last_hash_rate,
                    reason: e.to_string(),
                });
                RigStatus {
                    hash_rate: self.last_hash_rate,
                    reachable: false,
                    pools: Vec::new(),
                }
            }
        }
    }

    /// Submits `pool_indices`; returns whether the rig accepted a change
    async fn act(&mut self, pool_indices: &[usize]) -> Result<bool, SwitchError> {
        if !self.options.allow_priority_change {
            self.observer.notify(SwitchEvent::PriorityChangeSkipped {
                pool_indices: pool_indices.to_vec(),
            });
            return Ok(false);
        }

        if self.config.restart_on_pool_change {
            self.restart_rig().await?;
        }

        let response = self.rig.set_pool_priority(pool_indices).await?;
        if !response.success {
            return Err(SwitchError::PriorityRejected(response.message));
        }
        self.observer.notify(SwitchEvent::PriorityApplied {
            pool_indices: pool_indices.to_vec(),
            message: response.message,
        });
        Ok(true)
    }

    /// Restarts the rig and waits until it answers again
    async fn restart_rig(&mut self) -> Result<RestartOutcome, SwitchError> {
        self.observer.notify(SwitchEvent::RigRestarting);
        let outcome = self.rig.restart().await?;

        let started = Instant::now();
        let timeout = self.config.restart_timeout();
        let mut attempts = 0u32;
        loop {
            attempts += 1;
            match self.rig.version().await {
                Ok(_) => break,
                Err(e) => {
                    if timeout.is_some_and(|limit| started.elapsed() >= limit) {
                        return Err(SwitchError::RestartTimeout(
                            timeout.map(|t| t.as_secs()).unwrap_or_default(),
                        ));
                    }
                    log::debug!("Rig not back yet: {}", e);
                    time::sleep(self.config.restart_poll_interval()).await;
                }
            }
        }

        self.observer
            .notify(SwitchEvent::RigRestarted { outcome, attempts });
        Ok(outcome)
    }

    fn enter(&mut self, to: LoopState) {
        if self.state != to {
            self.observer.notify(SwitchEvent::StateChanged {
                from: self.state,
                to,
            });
            self.state = to;
        }
    }
}

/// Pause the loop takes after a cycle ended in `state`
pub fn pause_after(state: LoopState, config: &Config) -> Option<Duration> {
    match state {
        LoopState::Sleep => Some(config.cycle_interval()),
        LoopState::ErrorSleep => Some(config.retry_interval()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::feeds::{DifficultyEntry, MarketQuote};
    use crate::network::rig::{CoinInfo, PriorityResponse, RigSummary, RigVersion};
    use crate::switcher::observer::RecordingObserver;
    use crate::types::{PoolStatus, RigPool};
    use std::cell::{Cell, RefCell};

    struct FakeRig {
        reachable: Cell<bool>,
        hash_rate: f64,
        pools: Vec<RigPool>,
        accept: bool,
        down_after_restart: Cell<u32>,
        hang_up_after_pools: bool,
        submitted: RefCell<Vec<Vec<usize>>>,
        restarts: Cell<u32>,
    }

    impl FakeRig {
        fn new(pools: Vec<RigPool>) -> Self {
            FakeRig {
                reachable: Cell::new(true),
                hash_rate: 2_000_000.0,
                pools,
                accept: true,
                down_after_restart: Cell::new(0),
                hang_up_after_pools: false,
                submitted: RefCell::new(Vec::new()),
                restarts: Cell::new(0),
            }
        }

        fn check(&self) -> Result<(), SwitchError> {
            if self.reachable.get() {
                Ok(())
            } else {
                Err(SwitchError::RigUnreachable("connection refused".into()))
            }
        }
    }

    impl RigActuator for FakeRig {
        async fn version(&self) -> Result<RigVersion, SwitchError> {
            let down = self.down_after_restart.get();
            if down > 0 {
                self.down_after_restart.set(down - 1);
                return Err(SwitchError::RigUnreachable("restarting".into()));
            }
            self.check()?;
            Ok(RigVersion {
                miner: "3.7.2".into(),
                api: "1.32".into(),
            })
        }

        async fn summary(&self) -> Result<RigSummary, SwitchError> {
            self.check()?;
            Ok(RigSummary {
                hash_rate: self.hash_rate,
            })
        }

        async fn pools(&self) -> Result<Vec<RigPool>, SwitchError> {
            self.check()?;
            if self.hang_up_after_pools {
                self.reachable.set(false);
            }
            Ok(self.pools.clone())
        }

        async fn set_pool_priority(&self, indices: &[usize]) -> Result<PriorityResponse, SwitchError> {
            self.check()?;
            self.submitted.borrow_mut().push(indices.to_vec());
            Ok(PriorityResponse {
                success: self.accept,
                message: if self.accept { "Changed".into() } else { "Invalid".into() },
            })
        }

        async fn restart(&self) -> Result<RestartOutcome, SwitchError> {
            self.restarts.set(self.restarts.get() + 1);
            self.down_after_restart.set(3);
            Ok(RestartOutcome::AlreadyStopped)
        }

        async fn coin(&self) -> Result<CoinInfo, SwitchError> {
            Err(SwitchError::ProtocolError("coin not supported".into()))
        }
    }

    struct StaticMarket(Result<MarketData, String>);

    impl DataProvider for StaticMarket {
        type Feed = MarketData;

        async fn get_data(&self, _force_fetch: bool) -> Result<MarketData, SwitchError> {
            self.0.clone().map_err(SwitchError::DataUnavailable)
        }
    }

    struct StaticDifficulty(DifficultyData);

    impl DataProvider for StaticDifficulty {
        type Feed = DifficultyData;

        async fn get_data(&self, _force_fetch: bool) -> Result<DifficultyData, SwitchError> {
            Ok(self.0.clone())
        }
    }

    fn market() -> MarketData {
        let quote = |code: &str, price: f64, volume: f64| MarketQuote {
            primary_code: code.into(),
            primary_name: code.into(),
            secondary_code: "BTC".into(),
            last_trade_price: Some(price),
            volume,
        };
        MarketData {
            markets: [
                ("AAA/BTC".to_string(), quote("AAA", 0.001, 500.0)),
                ("BBB/BTC".to_string(), quote("BBB", 0.004, 5000.0)),
            ]
            .into_iter()
            .collect(),
        }
    }

    fn difficulty() -> DifficultyData {
        let entry = |tag: &str, rate: f64, difficulty: f64| DifficultyEntry {
            coin_tag: tag.into(),
            coin_name: None,
            exchange_rate: rate,
            difficulty,
            block_reward: 10.0,
            profit_ratio: 100.0,
            avg_profit_ratio: 100.0,
        };
        DifficultyData {
            entries: vec![
                entry("BTC", 30_000.0, 1e9),
                entry("AAA", 0.001, 5000.0),
                entry("BBB", 0.004, 5000.0),
            ],
        }
    }

    fn pools(active: Option<usize>) -> Vec<RigPool> {
        ["aaa", "bbb"]
            .iter()
            .enumerate()
            .map(|(index, name)| RigPool {
                url: format!("stratum+tcp://{}:3333", name),
                status: PoolStatus::Alive,
                stratum_active: active == Some(index),
                index,
            })
            .collect()
    }

    fn config() -> Config {
        let mut config = Config::parse(
            r#"
            fallback_hash_rate = 1000000.0
            retry_interval = 0
            restart_poll_interval_ms = 1

            [market]
            cache_file = "unused.json"

            [difficulty]
            cache_file = "unused.json"
            apikey = "k"

            [pool_currency]
            "stratum+tcp://aaa:3333" = "AAA"
            "stratum+tcp://bbb:3333" = "BBB"
            "#,
        )
        .unwrap();
        config.restart_timeout = 5;
        config
    }

    fn single() -> LoopOptions {
        LoopOptions {
            single_cycle: true,
            ..LoopOptions::default()
        }
    }

    #[tokio::test]
    async fn primes_idle_rig() {
        let observer = RecordingObserver::default();
        let rig = FakeRig::new(pools(None));
        let mut control = ControlLoop::new(
            config(),
            &rig,
            StaticMarket(Ok(market())),
            StaticDifficulty(difficulty()),
            &observer,
            single(),
        );

        let report = control.run().await;
        assert!(report.actuated);
        assert_eq!(report.rig.hash_rate, 2_000_000.0);
        assert_eq!(report.ranking.best().map(|c| c.id.as_str()), Some("BBB"));
        assert_eq!(*rig.submitted.borrow(), vec![vec![1, 0]]);
        assert_eq!(control.state(), LoopState::Done);
        assert_eq!(control.last_hash_rate(), 2_000_000.0);
        assert!(observer
            .events()
            .iter()
            .any(|e| matches!(e, SwitchEvent::Priming { top } if top == "BBB")));
    }

    #[tokio::test]
    async fn holds_when_active_is_best() {
        let rig = FakeRig::new(pools(Some(1)));
        let mut control = ControlLoop::new(
            config(),
            &rig,
            StaticMarket(Ok(market())),
            StaticDifficulty(difficulty()),
            RecordingObserver::default(),
            single(),
        );

        let report = control.run_cycle().await.unwrap();
        assert!(!report.actuated);
        assert!(matches!(
            report.decision,
            Decision::Keep(KeepReason::BelowThreshold { .. })
        ));
        assert!(rig.submitted.borrow().is_empty());
        assert_eq!(control.state(), LoopState::Sleep);
    }

    #[tokio::test]
    async fn unreachable_rig_uses_fallback_hash_rate() {
        let observer = RecordingObserver::default();
        let rig = FakeRig::new(pools(None));
        rig.reachable.set(false);
        let mut control = ControlLoop::new(
            config(),
            &rig,
            StaticMarket(Ok(market())),
            StaticDifficulty(difficulty()),
            &observer,
            single(),
        );

        let report = control.run_cycle().await.unwrap();
        assert!(!report.rig.reachable);
        assert_eq!(report.rig.hash_rate, 1_000_000.0);
        assert_eq!(report.decision, Decision::Keep(KeepReason::NoCandidates));
        assert!(!report.actuated);

        let events = observer.events();
        assert!(events.iter().any(|e| matches!(e, SwitchEvent::HashRateFallback { .. })));
        assert!(events.iter().any(|e| matches!(e, SwitchEvent::NoPools)));
    }

    #[tokio::test]
    async fn keeps_last_observed_hash_rate() {
        let rig = FakeRig::new(pools(Some(1)));
        let mut control = ControlLoop::new(
            config(),
            &rig,
            StaticMarket(Ok(market())),
            StaticDifficulty(difficulty()),
            RecordingObserver::default(),
            single(),
        );
        control.run_cycle().await.unwrap();

        rig.reachable.set(false);
        let report = control.run_cycle().await.unwrap();
        assert_eq!(report.rig.hash_rate, 2_000_000.0);
    }

    #[tokio::test]
    async fn market_failure_is_cycle_fatal() {
        let observer = RecordingObserver::default();
        let rig = FakeRig::new(pools(None));
        let mut control = ControlLoop::new(
            config(),
            &rig,
            StaticMarket(Err("feed down".into())),
            StaticDifficulty(difficulty()),
            &observer,
            single(),
        );

        let err = control.run_cycle().await.unwrap_err();
        assert!(matches!(err, SwitchError::DataUnavailable(_)));
        assert_eq!(control.state(), LoopState::ErrorSleep);
        assert_eq!(
            pause_after(control.state(), &config()),
            Some(Duration::from_secs(0))
        );
        assert!(observer.events().iter().any(|e| matches!(
            e,
            SwitchEvent::CycleFailed {
                phase: LoopState::FetchMarketData,
                ..
            }
        )));
        assert!(rig.submitted.borrow().is_empty());
    }

    #[tokio::test]
    async fn rejected_priority_is_cycle_fatal() {
        let mut rig = FakeRig::new(pools(None));
        rig.accept = false;
        let mut control = ControlLoop::new(
            config(),
            &rig,
            StaticMarket(Ok(market())),
            StaticDifficulty(difficulty()),
            RecordingObserver::default(),
            single(),
        );
        assert!(matches!(
            control.run_cycle().await,
            Err(SwitchError::PriorityRejected(msg)) if msg == "Invalid"
        ));
    }

    #[tokio::test]
    async fn rig_lost_while_switching_is_cycle_fatal() {
        let observer = RecordingObserver::default();
        let mut rig = FakeRig::new(pools(None));
        rig.hang_up_after_pools = true;
        let mut control = ControlLoop::new(
            config(),
            &rig,
            StaticMarket(Ok(market())),
            StaticDifficulty(difficulty()),
            &observer,
            single(),
        );

        let err = control.run_cycle().await.unwrap_err();
        assert!(matches!(err, SwitchError::RigUnreachable(_)));
        assert_eq!(control.state(), LoopState::ErrorSleep);
        assert!(rig.submitted.borrow().is_empty());
        assert!(observer.events().iter().any(|e| matches!(
            e,
            SwitchEvent::CycleFailed {
                phase: LoopState::Act,
                ..
            }
        )));
    }

    #[tokio::test]
    async fn priority_changes_can_be_disabled() {
        let rig = FakeRig::new(pools(None));
        let options = LoopOptions {
            allow_priority_change: false,
            ..single()
        };
        let mut control = ControlLoop::new(
            config(),
            &rig,
            StaticMarket(Ok(market())),
            StaticDifficulty(difficulty()),
            RecordingObserver::default(),
            options,
        );
        let report = control.run_cycle().await.unwrap();
        assert!(matches!(report.decision, Decision::Apply { .. }));
        assert!(!report.actuated);
        assert!(rig.submitted.borrow().is_empty());
    }

    #[tokio::test]
    async fn restarts_before_switching() {
        let observer = RecordingObserver::default();
        let rig = FakeRig::new(pools(None));
        let mut config = config();
        config.restart_on_pool_change = true;
        let mut control = ControlLoop::new(
            config,
            &rig,
            StaticMarket(Ok(market())),
            StaticDifficulty(difficulty()),
            &observer,
            single(),
        );

        let report = control.run_cycle().await.unwrap();
        assert!(report.actuated);
        assert_eq!(rig.restarts.get(), 1);
        assert!(observer.events().iter().any(|e| matches!(
            e,
            SwitchEvent::RigRestarted {
                outcome: RestartOutcome::AlreadyStopped,
                attempts: 4
            }
        )));
    }

    #[tokio::test]
    async fn restart_wait_is_bounded() {
        let rig = FakeRig::new(pools(None));
        let mut config = config();
        config.restart_on_pool_change = true;
        config.restart_timeout = 1;
        config.restart_poll_interval_ms = 200;
        let mut control = ControlLoop::new(
            config,
            &rig,
            StaticMarket(Ok(market())),
            StaticDifficulty(difficulty()),
            RecordingObserver::default(),
            single(),
        );

        // The rig never comes back after the restart.
        rig.reachable.set(false);
        let err = control.restart_rig().await.unwrap_err();
        assert!(matches!(err, SwitchError::RestartTimeout(1)));
    }

    #[tokio::test]
    async fn single_cycle_retries_until_success() {
        struct Flaky {
            failures: Cell<u32>,
        }

        impl DataProvider for Flaky {
            type Feed = MarketData;

            async fn get_data(&self, _force_fetch: bool) -> Result<MarketData, SwitchError> {
                let left = self.failures.get();
                if left > 0 {
                    self.failures.set(left - 1);
                    return Err(SwitchError::DataUnavailable("flaky".into()));
                }
                Ok(market())
            }
        }

        let observer = RecordingObserver::default();
        let rig = FakeRig::new(pools(None));
        let mut control = ControlLoop::new(
            config(),
            &rig,
            Flaky {
                failures: Cell::new(2),
            },
            StaticDifficulty(difficulty()),
            &observer,
            single(),
        );

        let report = control.run().await;
        assert!(report.actuated);
        let failures = observer
            .events()
            .iter()
            .filter(|e| matches!(e, SwitchEvent::CycleFailed { .. }))
            .count();
        assert_eq!(failures, 2);
    }
}
