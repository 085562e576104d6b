// src/utils/logging.rs
//! Logging configuration
//!
//! Sets up the `log` facade for the binary. Library components never log
//! directly about switching decisions; they report to a
//! [`SwitchObserver`](crate::switcher::SwitchObserver), whose default
//! implementation forwards to these loggers.
//!
//! Uses `env_logger` under the hood with custom formatting and filtering.

use env_logger::{Builder, Target};
use log::LevelFilter;
use std::env;

/// Initializes the logging subsystem
///
/// # Configuration
/// - Logs to stdout
/// - Default log level: Info, or Debug when `verbose` is set
/// - Respects `RUST_LOG` environment variable if set
pub fn init_logging(verbose: bool) {
    let mut builder = common_log_config();

    if env::var("RUST_LOG").is_ok() {
        builder.parse_env("RUST_LOG");
    } else if verbose {
        builder.filter_level(LevelFilter::Debug);
    } else {
        builder.filter_level(LevelFilter::Info);
    }

    builder.init();
}

/// Configures logging for data-only mode
///
/// # Differences from Standard Logging
/// - Logs to stderr, leaving stdout to the ranking output
/// - Default log level: Warn, or Debug when `verbose` is set
pub fn init_data_logging(verbose: bool) {
    let mut builder = common_log_config();
    builder.target(Target::Stderr);

    if env::var("RUST_LOG").is_ok() {
        builder.parse_env("RUST_LOG");
    } else if verbose {
        builder.filter_level(LevelFilter::Debug);
    } else {
        builder.filter_level(LevelFilter::Warn);
    }

    builder.init();
}

/// Creates a base logger builder with the shared line format
///
/// `[timestamp LEVEL module:line] message`, written to stdout.
fn common_log_config() -> Builder {
    let mut builder = Builder::new();

    builder
        .format(|buf, record| {
            use std::io::Write;
            let ts = buf.timestamp_seconds();
            let level = record.level();
            let module = record.module_path().unwrap_or_default();
            let line = record.line().unwrap_or(0);

            writeln!(
                buf,
                "[{} {} {}:{}] {}",
                ts,
                level,
                module,
                line,
                record.args()
            )
        })
        .target(Target::Stdout);

    builder
}
