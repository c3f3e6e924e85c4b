//! Tracing subscriber setup.

use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

/// Install the global subscriber.
///
/// `RUST_LOG` wins over `level`. `format` is "json" for JSON lines, anything
/// else for human-readable text. Returns `false` if a global subscriber was
/// already installed.
pub fn init_logging(level: &str, format: &str) -> bool {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    if format == "json" {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .try_init()
            .is_ok()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_level(true))
            .try_init()
            .is_ok()
    }
}
