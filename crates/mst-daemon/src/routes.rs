//! Axum router for mst-daemon. `build_router` is the single entry point;
//! `main.rs` attaches middleware after this call so tests can use the bare
//! router.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};

use crate::api_types::{HealthResponse, StatusResponse};
use crate::state::{uptime_secs, AppState};

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/v1/health", get(health))
        .route("/v1/status", get(status_handler))
        .route("/v1/metrics", get(metrics_handler))
        .with_state(state)
}

async fn health(State(st): State<Arc<AppState>>) -> impl IntoResponse {
    (StatusCode::OK, Json(HealthResponse { ok: true, service: st.build.service, version: st.build.version }))
}

async fn status_handler(State(st): State<Arc<AppState>>) -> impl IntoResponse {
    let db_ok = mst_db::status(&st.pool).await.map(|s| s.ok).unwrap_or(false);
    let body = StatusResponse {
        uptime_secs: uptime_secs(),
        db_ok,
        scheduler_job_count: st.scheduler.job_count(),
        config_hash: st.config_hash.clone(),
    };
    (StatusCode::OK, Json(body))
}

async fn metrics_handler(State(st): State<Arc<AppState>>) -> impl IntoResponse {
    (StatusCode::OK, Json(st.metrics.snapshot()))
}
