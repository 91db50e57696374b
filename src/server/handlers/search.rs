//! `POST /api/v1/search/{find,search,grep,glob}` (spec §4.K, §4.C).

use crate::domain::types::{Message, MessagePart, Role};
use crate::domain::uri::VikingUri;
use crate::server::envelope::{ok, ApiResult};
use crate::service::{FindResult, VikingService};
use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct FindRequest {
    pub query: String,
    #[serde(default)]
    pub target_uri: Option<String>,
    #[serde(default)]
    pub limit: usize,
    #[serde(default)]
    pub score_threshold: Option<f32>,
}

pub async fn find(State(service): State<Arc<VikingService>>, Json(req): Json<FindRequest>) -> ApiResult<FindResult> {
    let result = service.search.find(&req.query, req.target_uri.as_deref(), req.limit, req.score_threshold, None).await?;
    Ok(ok(result))
}

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    pub current_message: String,
    #[serde(default)]
    pub compression_summary: Option<String>,
    #[serde(default)]
    pub recent_messages: Vec<String>,
    #[serde(default)]
    pub target_uri: Option<String>,
    #[serde(default)]
    pub limit: usize,
}

pub async fn search(State(service): State<Arc<VikingService>>, Json(req): Json<SearchRequest>) -> ApiResult<FindResult> {
    let recent: Vec<Message> =
        req.recent_messages.iter().map(|text| Message::new(Role::User, vec![MessagePart::Text { text: text.clone() }])).collect();
    let result =
        service.search.search(&req.current_message, req.compression_summary.as_deref(), &recent, req.target_uri.as_deref(), req.limit).await?;
    Ok(ok(result))
}

#[derive(Debug, Deserialize)]
pub struct GrepRequest {
    pub uri: String,
    pub pattern: String,
    #[serde(default)]
    pub case_insensitive: bool,
    #[serde(default)]
    pub node_limit: Option<usize>,
}

pub async fn grep(State(service): State<Arc<VikingService>>, Json(req): Json<GrepRequest>) -> ApiResult<crate::fs::GrepResult> {
    let uri = VikingUri::parse(&req.uri)?;
    let result = service.vfs.grep(&uri, &req.pattern, req.case_insensitive, req.node_limit).await?;
    Ok(ok(result))
}

#[derive(Debug, Deserialize)]
pub struct GlobRequest {
    pub pattern: String,
    #[serde(default)]
    pub root: Option<String>,
}

pub async fn glob(State(service): State<Arc<VikingService>>, Json(req): Json<GlobRequest>) -> ApiResult<crate::fs::GlobResult> {
    let root = VikingUri::parse(req.root.as_deref().unwrap_or("viking://resources"))?;
    let result = service.vfs.glob(&req.pattern, &root).await?;
    Ok(ok(result))
}
