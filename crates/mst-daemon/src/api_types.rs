//! Request/response bodies for the daemon's thin operational HTTP surface.
//! No business logic lives here.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub service: &'static str,
    pub version: &'static str,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub uptime_secs: u64,
    pub db_ok: bool,
    pub scheduler_job_count: usize,
    pub config_hash: String,
}
