//! Structured logging initialization via `tracing`.

use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber, filtered by `RUST_LOG` and
/// defaulting to `info`.
///
/// Repeated calls are no-ops, so worker threads and tests can each call
/// this without coordinating who goes first.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
