//! Log output for the CLI.
//!
//! Events go to stderr through a level filter that can be swapped once the
//! configuration file has been read. `RUST_LOG`, when set, always wins.

use std::sync::OnceLock;

use tracing_subscriber::filter::ParseError;
use tracing_subscriber::{EnvFilter, Registry, fmt, prelude::*, reload};

static FILTER_HANDLE: OnceLock<reload::Handle<EnvFilter, Registry>> = OnceLock::new();

#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("invalid log filter '{filter}': {source}")]
    InvalidFilter {
        filter: String,
        #[source]
        source: ParseError,
    },

    #[error("logging has not been initialised")]
    NotInitialised,

    #[error("failed to swap log filter: {0}")]
    Reload(#[from] reload::Error),
}

fn rust_log_is_set() -> bool {
    std::env::var_os("RUST_LOG").is_some()
}

fn level_filter(level: &str) -> Result<EnvFilter, LoggingError> {
    EnvFilter::try_new(level).map_err(|source| LoggingError::InvalidFilter {
        filter: level.to_string(),
        source,
    })
}

fn initial_filter(level: &str) -> EnvFilter {
    if rust_log_is_set()
        && let Ok(filter) = EnvFilter::try_from_default_env()
    {
        return filter;
    }
    level_filter(level).unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Installs the global subscriber. Later calls are no-ops.
pub fn init_tracing(level: &str) {
    FILTER_HANDLE.get_or_init(|| {
        let (filter, handle) = reload::Layer::new(initial_filter(level));
        // stdout carries command output.
        if let Err(e) = tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stderr))
            .try_init()
        {
            eprintln!("Warning: tracing subscriber already installed: {e}");
        }
        handle
    });
}

/// Switches to the configured level unless `RUST_LOG` is set.
pub fn apply_logging_level(level: &str) -> Result<(), LoggingError> {
    if rust_log_is_set() {
        return Ok(());
    }
    let filter = level_filter(level)?;
    FILTER_HANDLE
        .get()
        .ok_or(LoggingError::NotInitialised)?
        .reload(filter)?;
    Ok(())
}
