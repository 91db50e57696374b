//! `GET /api/v1/relations`, `POST/DELETE /api/v1/relations/link` (spec §4.C
//! `relations`/`link`/`unlink`).

use crate::domain::types::Relation;
use crate::domain::uri::VikingUri;
use crate::server::envelope::{ok, ApiResult};
use crate::service::VikingService;
use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct UriQuery {
    pub uri: String,
}

pub async fn get(State(service): State<Arc<VikingService>>, Query(q): Query<UriQuery>) -> ApiResult<Vec<Relation>> {
    let uri = VikingUri::parse(&q.uri)?;
    let relations = service.vfs.relations(&uri).await?;
    Ok(ok(relations))
}

#[derive(Debug, Deserialize)]
pub struct LinkRequest {
    pub from_uri: String,
    pub to_uris: Vec<String>,
    #[serde(default)]
    pub reason: String,
}

pub async fn link(State(service): State<Arc<VikingService>>, Json(req): Json<LinkRequest>) -> ApiResult<()> {
    let from = VikingUri::parse(&req.from_uri)?;
    let targets: Vec<VikingUri> = req.to_uris.iter().map(|u| VikingUri::parse(u)).collect::<Result<_, _>>()?;
    service.vfs.link(&from, &targets, &req.reason).await?;
    Ok(ok(()))
}

#[derive(Debug, Deserialize)]
pub struct UnlinkRequest {
    pub from_uri: String,
    pub to_uri: String,
}

pub async fn unlink(State(service): State<Arc<VikingService>>, Json(req): Json<UnlinkRequest>) -> ApiResult<()> {
    let from = VikingUri::parse(&req.from_uri)?;
    let to = VikingUri::parse(&req.to_uri)?;
    service.vfs.unlink(&from, &to).await?;
    Ok(ok(()))
}
