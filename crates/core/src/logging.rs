//! Structured logging for serialmesh nodes.
//!
//! Frame-level activity is emitted at `debug`, drops and dead-node alerts at
//! `warn`. The level is taken from `RUST_LOG`.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize the logging system with human-readable output.
///
/// Log level can be configured via the `RUST_LOG` environment variable.
/// If not set, defaults to `info` level.
///
/// # Example
/// ```no_run
/// use serialmesh_core::logging;
///
/// logging::init();
/// tracing::info!("switch started");
/// ```
pub fn init() {
    tracing_subscriber::registry()
        .with(default_filter())
        .with(fmt::layer().with_target(true))
        .init();
}

/// Initialize the logging system with JSON output.
///
/// # Example
/// ```no_run
/// use serialmesh_core::logging;
///
/// logging::init_json();
/// tracing::info!(links = 3, "switch started");
/// ```
pub fn init_json() {
    tracing_subscriber::registry()
        .with(default_filter())
        .with(fmt::layer().json().with_target(true))
        .init();
}

/// Install a test-friendly subscriber, ignoring the error if one is already set.
pub fn try_init_for_tests() {
    let _ = tracing_subscriber::registry()
        .with(default_filter())
        .with(fmt::layer().with_test_writer())
        .try_init();
}

fn default_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_try_init_is_idempotent() {
        try_init_for_tests();
        try_init_for_tests();
        tracing::debug!("logging initialised twice without panicking");
    }

    #[test]
    fn test_default_filter_builds() {
        let _ = default_filter();
    }
}
