//! Tracing subscriber setup for host applications.

use tracing_subscriber::EnvFilter;

use crate::config;

/// Install the global `fmt` subscriber.
///
/// `RUST_LOG` wins over [`config::default_log_filter`]. Calling this more than
/// once is harmless: later calls leave the first subscriber in place.
pub fn init() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter()));

    if tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .is_ok()
    {
        tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);
    }
}
