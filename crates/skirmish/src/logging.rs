//! Log output setup for binaries.

use tracing_subscriber::EnvFilter;

/// Installs a `tracing` subscriber that writes to stderr.
///
/// The filter comes from `RUST_LOG` when set, otherwise `default_filter`
/// (usually [`ServerConfig::log_filter`](crate::ServerConfig::log_filter)).
/// Calling this twice is harmless; the second call does nothing.
pub fn init(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
