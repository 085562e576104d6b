// src/main.rs
use clap::Parser;
use pool_chooser_rs::{
    cli, config,
    network::{CgminerClient, CoinwarzClient, CryptsyClient},
    switcher::{ControlLoop, LogObserver, LoopOptions, fetch_ranking},
    utils, Config, PenaltyFactor, RatingEngine, SwitchError,
};
use tokio::runtime::Runtime;

/// Main entry point for the pool chooser
///
/// # Returns
/// - `Ok(())` on successful execution
/// - `Err(SwitchError)` if configuration or setup fails
///
/// # Flow
/// 1. Parses command line arguments
/// 2. Delegates to appropriate subcommand handler
/// 3. Propagates any errors upward
fn main() -> Result<(), SwitchError> {
    let cli = cli::Commands::parse();

    match cli.action {
        cli::Action::Run(opts) => run_switcher(opts),
        cli::Action::Data(opts) => print_ranking(opts),
        cli::Action::Config(opts) => generate_config(opts),
    }
}

/// Runs the switching loop against the configured rig
///
/// # Operations
/// 1. Initializes logging
/// 2. Loads and validates configuration (failures abort here)
/// 3. Builds the rig and feed clients
/// 4. Runs the control loop, forever unless `--no-loop` is given
fn run_switcher(opts: cli::RunOptions) -> Result<(), SwitchError> {
    utils::init_logging(opts.verbose);

    let config = config::load(&opts.config)?;
    let engine = rating_engine(&config, &opts.penalty);
    log::info!("Rating penalties: {:?}", engine.penalties());

    let rig = CgminerClient::new(config.rig.clone());
    let market = CryptsyClient::new(config.market.clone());
    let difficulty = CoinwarzClient::new(config.difficulty.clone());
    let options = LoopOptions {
        single_cycle: opts.no_loop,
        allow_priority_change: !opts.no_priority_change,
        force_fetch: opts.fetch,
    };

    let rt = Runtime::new()?;
    rt.block_on(async {
        let mut control = ControlLoop::new(config, rig, market, difficulty, LogObserver, options)
            .with_engine(engine);
        let report = control.run().await;
        match report.ranking.best() {
            Some(best) => log::info!(
                "Cycle complete, best currency {} ({:.4} USD/day)",
                best.name,
                best.usd_per_day
            ),
            None => log::info!("Cycle complete, no currency could be rated"),
        }
    });
    Ok(())
}

/// Prints the ranked currency set without contacting the rig
///
/// Uses the configured fallback hash rate unless `--hash-rate` is given.
fn print_ranking(opts: cli::DataOptions) -> Result<(), SwitchError> {
    utils::init_data_logging(opts.verbose);

    let config = config::load(&opts.config)?;
    let engine = rating_engine(&config, &opts.penalty);
    let hash_rate = opts.hash_rate.unwrap_or(config.fallback_hash_rate);
    if !(hash_rate.is_finite() && hash_rate > 0.0) {
        return Err(SwitchError::InvalidInput(format!(
            "hash rate must be positive, got {}",
            hash_rate
        )));
    }

    let market = CryptsyClient::new(config.market.clone());
    let difficulty = CoinwarzClient::new(config.difficulty.clone());

    let rt = Runtime::new()?;
    let report = rt.block_on(fetch_ranking(
        &market,
        &difficulty,
        &engine,
        hash_rate,
        opts.fetch,
        &LogObserver,
    ))?;

    if opts.table {
        print!("{}", report.to_table());
    } else {
        println!("{}", report.to_json()?);
    }
    Ok(())
}

/// Generates configuration template file
///
/// # Arguments
/// * `opts` - Configuration generation options
fn generate_config(opts: cli::ConfigOptions) -> Result<(), SwitchError> {
    std::fs::write(opts.output, config::generate_template())?;
    Ok(())
}

/// Builds the rating engine, command line penalties taking precedence
fn rating_engine(config: &Config, overrides: &[PenaltyFactor]) -> RatingEngine {
    if overrides.is_empty() {
        RatingEngine::new(config.rating.penalties.clone())
    } else {
        RatingEngine::new(overrides.to_vec())
    }
}
