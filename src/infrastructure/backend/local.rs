//! Local-disk `ObjectStore` (component A default backend).
//!
//! Writes go through a temp file in the same directory followed by a
//! rename, so a write is observable either completely or not at all
//! (invariant I4). All filesystem work runs inside
//! [`tokio::task::spawn_blocking`] since it is synchronous `std::fs`.

use crate::domain::error::{Error, Result};
use crate::domain::ports::object_store::{ObjectEntry, ObjectStore};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use uuid::Uuid;

pub struct LocalObjectStore {
    root: PathBuf,
}

impl LocalObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolve a caller-supplied path against `root`. Paths above this layer
    /// are already sanitized; this is the one additional defence spec'd for
    /// the adapter itself: reject `..` traversal, absolute paths, and drive
    /// letter prefixes outright rather than silently stripping them.
    fn resolve(&self, path: &str) -> Result<PathBuf> {
        if path.starts_with('/') || path.starts_with('\\') {
            return Err(Error::permission_denied(format!("absolute path rejected: {path}")));
        }
        if is_drive_prefixed(path) {
            return Err(Error::permission_denied(format!("drive-prefixed path rejected: {path}")));
        }
        if path.split(['/', '\\']).any(|seg| seg == "..") {
            return Err(Error::permission_denied(format!("path traversal rejected: {path}")));
        }
        Ok(self.root.join(path))
    }

    async fn blocking<F, T>(f: F) -> Result<T>
    where
        F: FnOnce() -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        tokio::task::spawn_blocking(f).await.map_err(|e| Error::internal_with_cause("blocking task failed", e))?
    }

    fn entry_for(path: &Path) -> Result<ObjectEntry> {
        let meta = std::fs::metadata(path)?;
        let mtime_ms = meta
            .modified()
            .ok()
            .and_then(|m| m.duration_since(std::time::UNIX_EPOCH).ok())
            .map(|d| d.as_millis() as i64)
            .unwrap_or(0);
        Ok(ObjectEntry {
            name: path.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_default(),
            is_dir: meta.is_dir(),
            size: meta.len(),
            mtime_ms,
        })
    }
}

/// `C:`, `D:`, ... — a Windows drive letter prefix.
fn is_drive_prefixed(path: &str) -> bool {
    let mut chars = path.chars();
    matches!((chars.next(), chars.next()), (Some(c), Some(':')) if c.is_ascii_alphabetic())
}

fn map_io_err(path: &str, e: std::io::Error) -> Error {
    match e.kind() {
        std::io::ErrorKind::NotFound => Error::not_found(path),
        std::io::ErrorKind::AlreadyExists => Error::already_exists(path),
        std::io::ErrorKind::PermissionDenied => Error::permission_denied(path),
        _ => Error::Io(e),
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn read_bytes(&self, path: &str) -> Result<Vec<u8>> {
        let full = self.resolve(path)?;
        let path_owned = path.to_string();
        Self::blocking(move || std::fs::read(&full).map_err(|e| map_io_err(&path_owned, e))).await
    }

    async fn write_bytes(&self, path: &str, bytes: &[u8]) -> Result<()> {
        let full = self.resolve(path)?;
        let bytes = bytes.to_vec();
        Self::blocking(move || {
            if let Some(parent) = full.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let tmp = full.with_extension(format!("tmp-{}", Uuid::new_v4()));
            std::fs::write(&tmp, &bytes)?;
            std::fs::rename(&tmp, &full)?;
            Ok(())
        })
        .await
    }

    async fn delete(&self, path: &str) -> Result<()> {
        let full = self.resolve(path)?;
        let path_owned = path.to_string();
        Self::blocking(move || {
            let meta = std::fs::metadata(&full).map_err(|e| map_io_err(&path_owned, e))?;
            if meta.is_dir() {
                std::fs::remove_dir_all(&full).map_err(|e| map_io_err(&path_owned, e))
            } else {
                std::fs::remove_file(&full).map_err(|e| map_io_err(&path_owned, e))
            }
        })
        .await
    }

    async fn list(&self, path: &str) -> Result<Vec<ObjectEntry>> {
        let full = self.resolve(path)?;
        let path_owned = path.to_string();
        Self::blocking(move || {
            let dir = std::fs::read_dir(&full).map_err(|e| map_io_err(&path_owned, e))?;
            let mut entries = Vec::new();
            for entry in dir {
                let entry = entry?;
                entries.push(Self::entry_for(&entry.path())?);
            }
            Ok(entries)
        })
        .await
    }

    async fn stat(&self, path: &str) -> Result<ObjectEntry> {
        let full = self.resolve(path)?;
        let path_owned = path.to_string();
        Self::blocking(move || {
            if !full.exists() {
                return Err(Error::not_found(&path_owned));
            }
            Self::entry_for(&full)
        })
        .await
    }

    async fn mkdir(&self, path: &str, exist_ok: bool) -> Result<()> {
        let full = self.resolve(path)?;
        let path_owned = path.to_string();
        Self::blocking(move || {
            if full.exists() {
                if exist_ok {
                    return Ok(());
                }
                return Err(Error::already_exists(&path_owned));
            }
            std::fs::create_dir_all(&full).map_err(|e| map_io_err(&path_owned, e))
        })
        .await
    }

    async fn r#move(&self, src: &str, dst: &str) -> Result<()> {
        let src_full = self.resolve(src)?;
        let dst_full = self.resolve(dst)?;
        let src_owned = src.to_string();
        Self::blocking(move || {
            if let Some(parent) = dst_full.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::rename(&src_full, &dst_full).map_err(|e| map_io_err(&src_owned, e))
        })
        .await
    }

    fn backend_name(&self) -> &'static str {
        "local"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn write_then_read_roundtrips() {
        let dir = TempDir::new().unwrap();
        let store = LocalObjectStore::new(dir.path());
        store.write_bytes("a/b.txt", b"hello").await.unwrap();
        assert_eq!(store.read_bytes("a/b.txt").await.unwrap(), b"hello");
    }

    #[tokio::test]
    async fn rejects_path_traversal() {
        let dir = TempDir::new().unwrap();
        let store = LocalObjectStore::new(dir.path());
        assert!(store.read_bytes("../escape.txt").await.is_err());
    }

    #[tokio::test]
    async fn rejects_absolute_paths() {
        let dir = TempDir::new().unwrap();
        let store = LocalObjectStore::new(dir.path());
        assert!(store.read_bytes("/etc/passwd").await.is_err());
    }

    #[tokio::test]
    async fn rejects_drive_prefixed_paths() {
        let dir = TempDir::new().unwrap();
        let store = LocalObjectStore::new(dir.path());
        assert!(store.read_bytes("C:/Windows/System32").await.is_err());
    }

    #[tokio::test]
    async fn mkdir_exist_ok_false_conflicts() {
        let dir = TempDir::new().unwrap();
        let store = LocalObjectStore::new(dir.path());
        store.mkdir("a", false).await.unwrap();
        assert!(store.mkdir("a", false).await.is_err());
        store.mkdir("a", true).await.unwrap();
    }

    #[tokio::test]
    async fn move_renames_file() {
        let dir = TempDir::new().unwrap();
        let store = LocalObjectStore::new(dir.path());
        store.write_bytes("a.txt", b"x").await.unwrap();
        store.r#move("a.txt", "b/a.txt").await.unwrap();
        assert_eq!(store.read_bytes("b/a.txt").await.unwrap(), b"x");
        assert!(store.read_bytes("a.txt").await.is_err());
    }
}
