//! Tracing subscriber configuration for mesh nodes.
//!
//! Log levels follow these conventions:
//! - ERROR: Unrecoverable failures, bring-up aborts
//! - WARN: Recoverable errors, degraded operation (skipped records, full pools)
//! - INFO: High-level node events (provisioned, advertising mode changes)
//! - DEBUG: Bring-up steps, per-record persistence, skipped slots
//! - TRACE: Raw record bytes, advertising payloads

use tracing_subscriber::EnvFilter;

fn env_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

/// Initialize the tracing subscriber.
///
/// `RUST_LOG` takes precedence when set; otherwise `default_level` applies,
/// which callers usually take from the `[logging]` config section.
pub fn init(default_level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(default_level))
        .init();
}

/// Initialize the tracing subscriber with JSON output.
///
/// Useful for structured logging in containerized environments.
/// Activated by setting `RUST_LOG_FORMAT=json`.
pub fn init_json(default_level: &str) {
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(env_filter(default_level))
        .init();
}

/// Initialize the tracing subscriber for tests.
///
/// Uses `try_init` to avoid panicking if called multiple times.
pub fn init_for_tests() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter("debug"))
        .with_test_writer()
        .try_init();
}
