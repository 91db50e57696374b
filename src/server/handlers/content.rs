//! `GET /api/v1/content/{read,abstract,overview}` (spec §3.2): the three
//! sidecar reads, each bumping `active_count` via [`VikingFs::touch`].

use crate::domain::uri::VikingUri;
use crate::server::envelope::{ok, ApiResult};
use crate::service::VikingService;
use axum::extract::{Query, State};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct UriQuery {
    pub uri: String,
}

#[derive(Debug, Serialize)]
pub struct ContentResponse {
    pub uri: String,
    pub content: String,
}

pub async fn read(State(service): State<Arc<VikingService>>, Query(q): Query<UriQuery>) -> ApiResult<ContentResponse> {
    let uri = VikingUri::parse(&q.uri)?;
    let bytes = service.vfs.read(&uri).await?;
    service.vfs.touch(&uri).await.ok();
    Ok(ok(ContentResponse { uri: uri.as_str().to_string(), content: String::from_utf8_lossy(&bytes).into_owned() }))
}

pub async fn read_abstract(State(service): State<Arc<VikingService>>, Query(q): Query<UriQuery>) -> ApiResult<ContentResponse> {
    let uri = VikingUri::parse(&q.uri)?;
    let content = service.vfs.r#abstract(&uri).await?;
    Ok(ok(ContentResponse { uri: uri.as_str().to_string(), content }))
}

pub async fn read_overview(State(service): State<Arc<VikingService>>, Query(q): Query<UriQuery>) -> ApiResult<ContentResponse> {
    let uri = VikingUri::parse(&q.uri)?;
    let content = service.vfs.overview(&uri).await?;
    Ok(ok(ContentResponse { uri: uri.as_str().to_string(), content }))
}
