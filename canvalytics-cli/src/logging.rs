//! Tracing setup for the binary.
//!
//! Logs go to stderr; stdout carries only JSON responses. `RUST_LOG`
//! overrides the default filter.

use tracing_subscriber::{fmt, EnvFilter};

const DEFAULT_FILTER: &str = "info";

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Install the global subscriber. Fails if one is already set.
pub fn init() -> Result<(), BoxError> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .try_init()
}
