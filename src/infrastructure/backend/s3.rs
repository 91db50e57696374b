//! S3-like `ObjectStore` backend (feature `s3-backend`).
//!
//! Targets an S3-compatible HTTP gateway (e.g. a MinIO deployment behind a
//! reverse proxy) via plain signed-URL-free requests with a bearer token,
//! rather than a full AWS SigV4 client — this crate has no dependency on the
//! AWS SDK (see DESIGN.md).

use crate::domain::error::{Error, Result};
use crate::domain::ports::object_store::{ObjectEntry, ObjectStore};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

pub struct S3LikeObjectStore {
    client: Client,
    base_url: String,
    bucket: String,
    token: Option<String>,
}

impl S3LikeObjectStore {
    pub fn new(base_url: impl Into<String>, bucket: impl Into<String>, token: Option<String>) -> Self {
        Self { client: Client::new(), base_url: base_url.into(), bucket: bucket.into(), token }
    }

    fn object_url(&self, path: &str) -> String {
        format!("{}/{}/{}", self.base_url.trim_end_matches('/'), self.bucket, path.trim_start_matches('/'))
    }

    fn authed(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(t) => builder.bearer_auth(t),
            None => builder,
        }
    }

    fn map_status(path: &str, status: reqwest::StatusCode) -> Error {
        match status.as_u16() {
            404 => Error::not_found(path),
            409 => Error::already_exists(path),
            401 | 403 => Error::permission_denied(path),
            503 => Error::unavailable(path),
            _ => Error::internal(format!("s3-like backend returned {status} for {path}")),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ListEntryDto {
    name: String,
    is_dir: bool,
    size: u64,
    mtime_ms: i64,
}

#[async_trait]
impl ObjectStore for S3LikeObjectStore {
    async fn read_bytes(&self, path: &str) -> Result<Vec<u8>> {
        let resp = self
            .authed(self.client.get(self.object_url(path)))
            .send()
            .await
            .map_err(|e| Error::unavailable(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(Self::map_status(path, resp.status()));
        }
        Ok(resp.bytes().await.map_err(|e| Error::internal_with_cause("reading response body", e))?.to_vec())
    }

    async fn write_bytes(&self, path: &str, bytes: &[u8]) -> Result<()> {
        let resp = self
            .authed(self.client.put(self.object_url(path)))
            .body(bytes.to_vec())
            .send()
            .await
            .map_err(|e| Error::unavailable(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(Self::map_status(path, resp.status()));
        }
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<()> {
        let resp = self
            .authed(self.client.delete(self.object_url(path)))
            .send()
            .await
            .map_err(|e| Error::unavailable(e.to_string()))?;
        if !resp.status().is_success() && resp.status().as_u16() != 404 {
            return Err(Self::map_status(path, resp.status()));
        }
        Ok(())
    }

    async fn list(&self, path: &str) -> Result<Vec<ObjectEntry>> {
        let url = format!("{}?list=1", self.object_url(path));
        let resp = self.authed(self.client.get(url)).send().await.map_err(|e| Error::unavailable(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(Self::map_status(path, resp.status()));
        }
        let dtos: Vec<ListEntryDto> =
            resp.json().await.map_err(|e| Error::internal_with_cause("parsing list response", e))?;
        Ok(dtos.into_iter().map(|d| ObjectEntry { name: d.name, is_dir: d.is_dir, size: d.size, mtime_ms: d.mtime_ms }).collect())
    }

    async fn stat(&self, path: &str) -> Result<ObjectEntry> {
        let url = format!("{}?stat=1", self.object_url(path));
        let resp = self.authed(self.client.get(url)).send().await.map_err(|e| Error::unavailable(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(Self::map_status(path, resp.status()));
        }
        let dto: ListEntryDto = resp.json().await.map_err(|e| Error::internal_with_cause("parsing stat response", e))?;
        Ok(ObjectEntry { name: dto.name, is_dir: dto.is_dir, size: dto.size, mtime_ms: dto.mtime_ms })
    }

    async fn mkdir(&self, path: &str, exist_ok: bool) -> Result<()> {
        let resp = self
            .authed(self.client.put(format!("{}?mkdir=1", self.object_url(path))))
            .send()
            .await
            .map_err(|e| Error::unavailable(e.to_string()))?;
        if resp.status().as_u16() == 409 && !exist_ok {
            return Err(Error::already_exists(path));
        }
        if !resp.status().is_success() && resp.status().as_u16() != 409 {
            return Err(Self::map_status(path, resp.status()));
        }
        Ok(())
    }

    async fn r#move(&self, src: &str, dst: &str) -> Result<()> {
        let resp = self
            .authed(self.client.post(format!("{}?move_to={}", self.object_url(src), dst)))
            .send()
            .await
            .map_err(|e| Error::unavailable(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(Self::map_status(src, resp.status()));
        }
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "s3-like"
    }
}
