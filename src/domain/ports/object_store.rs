//! Backend store adapter port (component A).
//!
//! Polymorphic over raw object operations. Implementations are blocking;
//! callers dispatch them to a worker via [`tokio::task::spawn_blocking`].

use crate::domain::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Directory entry returned by [`ObjectStore::list`].
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ObjectEntry {
    pub name: String,
    pub is_dir: bool,
    pub size: u64,
    pub mtime_ms: i64,
}

/// Raw object operations over a physical backend (local disk, S3-like).
///
/// All paths passed in are already sanitized by VikingFS; implementations
/// perform one further defence: rejecting `..` traversal, absolute paths,
/// and drive-letter prefixes.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn read_bytes(&self, path: &str) -> Result<Vec<u8>>;

    /// Atomic write: observable either completely or not at all.
    async fn write_bytes(&self, path: &str, bytes: &[u8]) -> Result<()>;

    async fn delete(&self, path: &str) -> Result<()>;

    /// Non-recursive directory listing.
    async fn list(&self, path: &str) -> Result<Vec<ObjectEntry>>;

    async fn stat(&self, path: &str) -> Result<ObjectEntry>;

    /// `exist_ok = false` fails `ALREADY_EXISTS` if the directory exists.
    async fn mkdir(&self, path: &str, exist_ok: bool) -> Result<()>;

    /// Backend-native rename/move.
    async fn r#move(&self, src: &str, dst: &str) -> Result<()>;

    fn backend_name(&self) -> &'static str;
}

/// Shared handle type used across the service.
pub type SharedObjectStore = Arc<dyn ObjectStore>;
