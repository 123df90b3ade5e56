//! Tracing subscriber configuration.
//!
//! Level conventions across the workspace:
//! - ERROR: protocol violations, unrecoverable failures
//! - WARN: recoverable faults, dropped datagrams, disconnect causes
//! - INFO: connection lifecycle (established, closed, accepted)
//! - DEBUG: state machine decisions, duplicate/out-of-order handling
//! - TRACE: wire-level packets and raw bytes

use tracing_subscriber::EnvFilter;

/// Initialize the tracing subscriber with sensible defaults.
///
/// `RUST_LOG` takes precedence; `default_level` applies otherwise.
pub fn init(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Initialize the tracing subscriber with JSON output, for containerized
/// deployments. Activated by `RUST_LOG_FORMAT=json`.
pub fn init_json(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .json()
        .with_env_filter(filter)
        .init();
}

/// Initialize the tracing subscriber for tests.
///
/// Uses `try_init` to avoid panicking when called more than once.
pub fn init_for_tests() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}
