//! Diagnostic logging setup.
//!
//! Installs a `tracing` fmt subscriber writing to stderr. `RUST_LOG` takes
//! precedence; otherwise the configured level applies to every target.

use crate::config::model::LoggingConfig;
use tracing_subscriber::EnvFilter;

pub fn init(config: &LoggingConfig) {
    tracing_subscriber::fmt()
        .with_env_filter(filter_for(config))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn filter_for(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

