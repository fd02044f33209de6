//! Tracing subscriber setup for binaries and tests

use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter (`EnvFilter` syntax)
pub const ENV_LOG: &str = "COMPOSITE_LOG";

const DEFAULT_FILTER: &str = "warn";

/// Install a fmt subscriber filtered by `COMPOSITE_LOG` (default `warn`).
///
/// Safe to call more than once; only the first call installs anything.
/// Returns whether this call installed the subscriber.
pub fn init_logging() -> bool {
    let filter = EnvFilter::try_from_env(ENV_LOG).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .is_ok()
}
