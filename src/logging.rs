//! Logging setup for the command-line tool.
//!
//! Log lines go to stderr so stdout stays free for usage text. The filter
//! comes from `RUST_LOG` when set, otherwise from the given default.

use std::io;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Filter used when `RUST_LOG` is not set
pub const DEFAULT_FILTER: &str = "info";

/// Build the filter: `RUST_LOG` if set and valid, else `default_filter`
pub fn env_filter(default_filter: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter))
}

/// Install the global subscriber
///
/// Returns `false` if a subscriber was already installed (e.g. by an
/// embedding application), in which case that one is left in place.
pub fn init_logging(default_filter: &str) -> bool {
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(io::stderr)
        .with_target(false);

    tracing_subscriber::registry()
        .with(env_filter(default_filter))
        .with(stderr_layer)
        .try_init()
        .is_ok()
}
