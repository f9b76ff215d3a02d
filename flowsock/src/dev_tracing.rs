//! Tracing setup for tests, examples and benches.

/// Development helper: install a tracing subscriber when `RUST_LOG` is set.
///
/// Tests, examples and benches call `flowsock::dev_tracing::init_tracing()`
/// to see the engine's `[PATTERN]` logs. No-op without `RUST_LOG` or when a
/// global subscriber is already installed.
pub fn init_tracing() {
    if std::env::var_os("RUST_LOG").is_none() {
        return;
    }
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .try_init();
}
