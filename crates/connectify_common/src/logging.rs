//! Logging utilities for the Connectify crates.
//!
//! This module provides a standardized approach to logging across all crates:
//! a console layer plus an optional daily rolling file, filtered by the
//! configured level unless `RUST_LOG` is set.

use connectify_config::LoggingConfig;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// File name prefix for rolling log files.
const LOG_FILE_PREFIX: &str = "connectify.log";

/// Initialize the tracing subscriber from the logging configuration.
///
/// When `directory` is set, log lines are also written to a daily rolling
/// file. The returned guard must be kept alive for the lifetime of the
/// program, otherwise buffered file output is lost.
pub fn init_with_config(config: &LoggingConfig) -> Option<WorkerGuard> {
    let filter = build_filter(&config.level);

    match &config.directory {
        Some(directory) => {
            let appender = tracing_appender::rolling::daily(directory, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let result = tracing_subscriber::registry()
                .with(console_layer())
                .with(fmt::layer().with_ansi(false).with_writer(writer))
                .with(filter)
                .try_init();
            if result.is_ok() {
                info!(
                    "Logging initialized at level: {} (files in {})",
                    config.level, directory
                );
            }
            Some(guard)
        }
        None => {
            let result = tracing_subscriber::registry()
                .with(console_layer())
                .with(filter)
                .try_init();
            if result.is_ok() {
                info!("Logging initialized at level: {}", config.level);
            }
            None
        }
    }
}

fn console_layer<S>() -> impl tracing_subscriber::Layer<S>
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    fmt::layer()
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_thread_ids(true)
}

/// `RUST_LOG` wins over the configured level.
fn build_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}
