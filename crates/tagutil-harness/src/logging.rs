//! Tracing setup for tests and the editor stub.

use tracing_subscriber::EnvFilter;

/// Filter directives for harness diagnostics, e.g. `tagutil_harness=debug`.
pub const LOG_VAR: &str = "TAGUTIL_HARNESS_LOG";

fn filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_env(LOG_VAR).unwrap_or_else(|_| EnvFilter::new(default_level))
}

/// Installs a subscriber that writes through the test output capture.
///
/// Safe to call from every test: only the first call installs anything.
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter("warn"))
        .with_test_writer()
        .with_target(false)
        .try_init();
}

/// Installs a subscriber writing to stderr, for standalone binaries.
pub fn init_stderr_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter("warn"))
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
