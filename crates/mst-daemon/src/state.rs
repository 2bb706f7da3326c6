//! Shared runtime state for mst-daemon. All types are `Clone`-able (via
//! `Arc`); handlers receive `State<Arc<AppState>>` from Axum.

use std::sync::Arc;

use mst_observability::MetricsCollector;
use mst_scheduler::Scheduler;
use sqlx::PgPool;

#[derive(Clone, Copy)]
pub struct BuildInfo {
    pub service: &'static str,
    pub version: &'static str,
}

pub struct AppState {
    pub build: BuildInfo,
    pub pool: PgPool,
    pub config_hash: String,
    pub metrics: Arc<MetricsCollector>,
    pub scheduler: Arc<Scheduler>,
}

impl AppState {
    pub fn new(pool: PgPool, config_hash: String, metrics: Arc<MetricsCollector>, scheduler: Arc<Scheduler>) -> Self {
        Self {
            build: BuildInfo { service: "mst-daemon", version: env!("CARGO_PKG_VERSION") },
            pool,
            config_hash,
            metrics,
            scheduler,
        }
    }
}

/// Monotonically increasing uptime since first call (process lifetime).
pub fn uptime_secs() -> u64 {
    static START: std::sync::OnceLock<std::time::Instant> = std::sync::OnceLock::new();
    START.get_or_init(std::time::Instant::now).elapsed().as_secs()
}
