//! `GET /health` (no auth) and `GET /api/v1/debug/health` (authenticated).
//! Both are liveness probes — if the process can answer at all, the
//! handler runs and returns `ok`.

use crate::server::envelope::{ok, ApiResult};
use axum::Json;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

pub async fn debug_health() -> ApiResult<HealthResponse> {
    Ok(ok(HealthResponse { status: "ok" }))
}
