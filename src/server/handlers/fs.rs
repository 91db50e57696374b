//! `GET/POST/DELETE /api/v1/fs/*` (spec §4.C): the thin HTTP face of
//! [`VikingFs`]'s `ls/tree/stat/mkdir/rm/mv`.

use crate::domain::uri::VikingUri;
use crate::fs::vikingfs::ListOutput;
use crate::server::envelope::{ok, ApiResult};
use crate::service::VikingService;
use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

fn default_abs_limit() -> usize {
    256
}

#[derive(Debug, Deserialize)]
pub struct LsQuery {
    pub uri: String,
    /// Shorthand for `output=original` when no explicit `output` is given.
    #[serde(default)]
    pub simple: bool,
    #[serde(default)]
    pub recursive: bool,
    #[serde(default)]
    pub output: Option<String>,
    #[serde(default = "default_abs_limit")]
    pub abs_limit: usize,
    /// Accepted for wire compatibility; this layout carries no hidden-entry
    /// concept to filter, so every entry is always listed.
    #[serde(default)]
    pub show_all_hidden: bool,
    #[serde(default)]
    pub node_limit: Option<usize>,
}

impl LsQuery {
    fn list_output(&self) -> ListOutput {
        match self.output.as_deref() {
            Some("original") => ListOutput::Original,
            Some("agent") => ListOutput::Agent,
            _ if self.simple => ListOutput::Original,
            _ => ListOutput::Agent,
        }
    }
}

pub async fn ls(State(service): State<Arc<VikingService>>, Query(q): Query<LsQuery>) -> ApiResult<Vec<crate::fs::vikingfs::ListEntry>> {
    let uri = VikingUri::parse(&q.uri)?;
    let entries = service.vfs.ls(&uri, q.recursive, q.list_output(), q.abs_limit, q.node_limit).await?;
    Ok(ok(entries))
}

pub async fn tree(State(service): State<Arc<VikingService>>, Query(q): Query<LsQuery>) -> ApiResult<Vec<crate::fs::vikingfs::ListEntry>> {
    let uri = VikingUri::parse(&q.uri)?;
    let entries = service.vfs.tree(&uri, q.list_output(), q.abs_limit, q.node_limit).await?;
    Ok(ok(entries))
}

#[derive(Debug, Deserialize)]
pub struct UriQuery {
    pub uri: String,
}

pub async fn stat(State(service): State<Arc<VikingService>>, Query(q): Query<UriQuery>) -> ApiResult<crate::fs::vikingfs::StatResult> {
    let uri = VikingUri::parse(&q.uri)?;
    let result = service.vfs.stat(&uri).await?;
    Ok(ok(result))
}

#[derive(Debug, Deserialize)]
pub struct MkdirRequest {
    pub uri: String,
    #[serde(default)]
    pub exist_ok: bool,
}

#[derive(Debug, Serialize)]
pub struct MkdirResponse {
    pub uri: String,
}

pub async fn mkdir(State(service): State<Arc<VikingService>>, Json(req): Json<MkdirRequest>) -> ApiResult<MkdirResponse> {
    let uri = VikingUri::parse(&req.uri)?;
    service.vfs.mkdir(&uri, req.exist_ok).await?;
    Ok(ok(MkdirResponse { uri: uri.as_str().to_string() }))
}

#[derive(Debug, Deserialize)]
pub struct RmQuery {
    pub uri: String,
    #[serde(default)]
    pub recursive: bool,
}

#[derive(Debug, Serialize)]
pub struct RmResponse {
    pub uri: String,
}

pub async fn rm(State(service): State<Arc<VikingService>>, Query(q): Query<RmQuery>) -> ApiResult<RmResponse> {
    let uri = VikingUri::parse(&q.uri)?;
    service.vfs.rm(&uri, q.recursive).await?;
    Ok(ok(RmResponse { uri: uri.as_str().to_string() }))
}

#[derive(Debug, Deserialize)]
pub struct MvRequest {
    pub from_uri: String,
    pub to_uri: String,
}

#[derive(Debug, Serialize)]
pub struct MvResponse {
    pub uri: String,
}

pub async fn mv(State(service): State<Arc<VikingService>>, Json(req): Json<MvRequest>) -> ApiResult<MvResponse> {
    let src = VikingUri::parse(&req.from_uri)?;
    let dst = VikingUri::parse(&req.to_uri)?;
    service.vfs.mv(&src, &dst).await?;
    Ok(ok(MvResponse { uri: dst.as_str().to_string() }))
}
