//! `POST /api/v1/resources` (spec §4.H): dispatch `path` to the parser
//! chain, finalize the result, and optionally block until embedding drains.

use crate::domain::error::{Error, Result as DomainResult};
use crate::domain::ports::parser::ParseInput;
use crate::domain::uri::{sanitize_segment, VikingUri};
use crate::server::envelope::{ok, ApiResult};
use crate::service::VikingService;
use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Deserialize)]
pub struct AddResourceRequest {
    pub path: String,
    #[serde(default)]
    pub target: Option<String>,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub instruction: String,
    #[serde(default)]
    pub wait: bool,
    #[serde(default)]
    pub timeout: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct AddResourceResponse {
    pub root_uri: String,
    pub node_count: usize,
    pub warnings: Vec<String>,
    pub queue_drained: bool,
}

pub async fn add_resource(
    State(service): State<Arc<VikingService>>,
    Json(req): Json<AddResourceRequest>,
) -> ApiResult<AddResourceResponse> {
    let input = resolve_input(&req.path).await?;
    let target_base = match &req.target {
        Some(t) => VikingUri::parse(t)?,
        None => VikingUri::parse(&format!("viking://resources/{}", sanitize_segment(source_name(&req.path))))?,
    };

    let outcome = service.resources.process_resource(input, &target_base).await?;

    let queue_drained = if req.wait {
        wait_with_timeout(&service, req.timeout).await?;
        true
    } else {
        false
    };

    Ok(ok(AddResourceResponse {
        root_uri: outcome.root_uri,
        node_count: outcome.node_count,
        warnings: outcome.warnings,
        queue_drained,
    }))
}

fn source_name(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().filter(|s| !s.is_empty()).unwrap_or(path)
}

async fn resolve_input(path: &str) -> DomainResult<ParseInput> {
    if path.starts_with("http://") || path.starts_with("https://") {
        return Ok(ParseInput::Url(path.to_string()));
    }
    let metadata =
        tokio::fs::metadata(path).await.map_err(|e| Error::invalid_argument(format!("cannot read {path}: {e}")))?;
    if metadata.is_dir() {
        return Ok(ParseInput::DirectoryPath(path.to_string()));
    }
    let bytes = tokio::fs::read(path).await.map_err(|e| Error::invalid_argument(format!("cannot read {path}: {e}")))?;
    Ok(ParseInput::Bytes { bytes, filename: Some(source_name(path).to_string()) })
}

/// Default `wait_complete` deadline when the caller doesn't supply one
/// (spec §5: "default 10s interactive / 10min wait_processed").
const DEFAULT_WAIT_TIMEOUT: Duration = Duration::from_secs(600);

/// Shared by the resources and skills handlers: block on queue drain,
/// bounded by an optional caller timeout (spec §4.G `wait_complete`).
pub(crate) async fn wait_with_timeout(service: &VikingService, timeout: Option<u64>) -> DomainResult<()> {
    let fut = service.queues.wait_complete();
    let deadline = timeout.map(Duration::from_secs).unwrap_or(DEFAULT_WAIT_TIMEOUT);
    tokio::time::timeout(deadline, fut).await.map_err(|_| Error::deadline_exceeded("wait_complete"))?;
    Ok(())
}
