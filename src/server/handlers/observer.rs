//! `GET /api/v1/observer/{queue,vikingdb,vlm,transaction,system}` (spec
//! §6.1): read-only introspection over the queue manager, vector backend,
//! VLM provider, transaction journal, and process uptime.

use crate::queue::QueueSnapshot;
use crate::server::envelope::{ok, ApiResult};
use crate::service::VikingService;
use axum::extract::State;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;

pub async fn queue(State(service): State<Arc<VikingService>>) -> ApiResult<Vec<QueueSnapshot>> {
    Ok(ok(service.queues.snapshot().await))
}

#[derive(Debug, Serialize)]
pub struct VikingDbStatus {
    pub backend: &'static str,
    pub dimension: usize,
    pub total: u64,
}

pub async fn vikingdb(State(service): State<Arc<VikingService>>) -> ApiResult<VikingDbStatus> {
    let collection = service.vector_collection();
    let total = match collection.aggregate_count(None, None).await? {
        crate::domain::ports::vector_store::CountResult::Total { _total } => _total,
        crate::domain::ports::vector_store::CountResult::Grouped(groups) => groups.values().sum(),
    };
    Ok(ok(VikingDbStatus { backend: collection.backend_name(), dimension: collection.dimension(), total }))
}

#[derive(Debug, Serialize)]
pub struct VlmStatus {
    pub provider: String,
}

pub async fn vlm(State(service): State<Arc<VikingService>>) -> ApiResult<VlmStatus> {
    Ok(ok(VlmStatus { provider: service.search.vlm().provider_name().to_string() }))
}

#[derive(Debug, Serialize)]
pub struct TransactionStatus {
    pub dangling_count: usize,
    pub dangling: Vec<crate::infrastructure::transaction::TransactionRecord>,
}

pub async fn transaction(State(service): State<Arc<VikingService>>) -> ApiResult<TransactionStatus> {
    let dangling = service.transactions().recover().await?;
    Ok(ok(TransactionStatus { dangling_count: dangling.len(), dangling }))
}

#[derive(Debug, Serialize)]
pub struct SystemStatus {
    pub uptime_seconds: u64,
    pub version: &'static str,
}

static START: std::sync::OnceLock<Instant> = std::sync::OnceLock::new();

pub fn mark_start() {
    START.get_or_init(Instant::now);
}

pub async fn system() -> ApiResult<SystemStatus> {
    let uptime = START.get().map(|s| s.elapsed().as_secs()).unwrap_or(0);
    Ok(ok(SystemStatus { uptime_seconds: uptime, version: env!("CARGO_PKG_VERSION") }))
}
