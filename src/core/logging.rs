//! Tracing subscriber setup.
//!
//! The library itself only emits `tracing` events; binaries and demos call
//! one of these once at startup. `RUST_LOG` overrides the level passed in
//! (e.g. `RUST_LOG=geoptim=debug`).

use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use crate::core::error::{Error, ErrorKind, Result};

fn filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}

/// Human-readable output. Fails if a global subscriber is already set.
pub fn init_logging(level: &str) -> Result<()> {
    tracing_subscriber::registry()
        .with(filter(level))
        .with(fmt::layer().with_target(false))
        .try_init()
        .map_err(|e| Error::new(ErrorKind::Logging, e.to_string()))
}

/// One JSON object per event, for log aggregation
pub fn init_json_logging(level: &str) -> Result<()> {
    tracing_subscriber::registry()
        .with(filter(level))
        .with(fmt::layer().json().with_target(false))
        .try_init()
        .map_err(|e| Error::new(ErrorKind::Logging, e.to_string()))
}
