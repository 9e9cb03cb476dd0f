//! Structured logging setup, built on `tracing` rather than an
//! FFI-backed log ring buffer: every module in this crate emits spans and
//! events through `tracing` directly, so this module's only job is wiring
//! up a subscriber once at startup.

use tracing_subscriber::EnvFilter;

/// Install a global `tracing` subscriber. `default_filter` is used when
/// `RUST_LOG` isn't set in the environment. Safe to call more than once in
/// tests; later calls are no-ops.
pub fn init_tracing(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter.to_string()));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}
