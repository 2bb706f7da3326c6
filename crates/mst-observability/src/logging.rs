//! Structured logging setup. One JSON object per event in production, a
//! human-readable line in local development — both via `tracing_subscriber`,
//! never a hand-rolled formatter.

/// Installs the global `tracing` subscriber. `json` selects the production
/// formatter; the env filter defaults to `info` and honors `RUST_LOG`.
pub fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());

    if json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
