//! The URI-addressed filesystem (component C): `ls/tree/stat/read/mkdir/
//! rm/mv/grep/glob/relations` atop an [`ObjectStore`], serialized per-path
//! through [`PathLockManager`] and journaled through [`TransactionManager`].

use crate::domain::error::{Error, Result};
use crate::domain::ports::object_store::SharedObjectStore;
use crate::domain::types::{ContextType, Relation};
use crate::domain::uri::VikingUri;
use crate::fs::node::{
    abstract_path, backend_path, content_path, meta_path, overview_path, read_meta, read_sidecar_text, write_meta, MetaSidecar,
};
use crate::infrastructure::locking::PathLockManager;
use crate::infrastructure::transaction::{TransactionManager, TransactionStatus};
use chrono::{DateTime, Utc};
use regex::{Regex, RegexBuilder};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

const DEFAULT_MAX_RESOLVE_ATTEMPTS: u32 = 100;
const DEFAULT_NODE_LIMIT: usize = 1000;
const GREP_FILE_SIZE_CAP: usize = 1_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListOutput {
    Agent,
    Original,
}

#[derive(Debug, Clone, Serialize)]
pub struct ListEntry {
    pub name: String,
    pub uri: String,
    pub is_dir: bool,
    pub r#abstract: Option<String>,
    pub size: u64,
    pub mtime_ms: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatResult {
    pub name: String,
    pub is_dir: bool,
    pub size: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub context_type: ContextType,
    pub has_abstract: bool,
    pub has_overview: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct GrepMatch {
    pub uri: String,
    pub line: usize,
    pub text: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct GrepResult {
    pub matches: Vec<GrepMatch>,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct GlobResult {
    pub matches: Vec<String>,
    pub count: usize,
}

pub struct VikingFs {
    store: SharedObjectStore,
    locks: Arc<PathLockManager>,
    txn: Arc<TransactionManager>,
}

impl VikingFs {
    pub fn new(store: SharedObjectStore, locks: Arc<PathLockManager>, txn: Arc<TransactionManager>) -> Self {
        Self { store, locks, txn }
    }

    /// Exposes the underlying backend store for callers (e.g. the service
    /// facade's embedding job) that need direct sidecar access.
    pub fn store(&self) -> &SharedObjectStore {
        &self.store
    }

    /// Non-recursive, agent- or original-formatted listing of `uri`'s
    /// children. `recursive` folds in descendants up to `node_limit` total,
    /// pre-order.
    pub async fn ls(
        &self,
        uri: &VikingUri,
        recursive: bool,
        output: ListOutput,
        abs_limit: usize,
        node_limit: Option<usize>,
    ) -> Result<Vec<ListEntry>> {
        let limit = node_limit.unwrap_or(DEFAULT_NODE_LIMIT);
        let mut out = Vec::new();
        self.collect(uri, recursive, output, abs_limit, limit, &mut out).await?;
        Ok(out)
    }

    pub async fn tree(&self, uri: &VikingUri, output: ListOutput, abs_limit: usize, node_limit: Option<usize>) -> Result<Vec<ListEntry>> {
        self.ls(uri, true, output, abs_limit, node_limit).await
    }

    async fn collect(
        &self,
        uri: &VikingUri,
        recursive: bool,
        output: ListOutput,
        abs_limit: usize,
        node_limit: usize,
        out: &mut Vec<ListEntry>,
    ) -> Result<()> {
        let dir_path = backend_path(uri);
        let entries = self.store.list(&dir_path).await?;
        for entry in entries {
            if out.len() >= node_limit {
                return Ok(());
            }
            if !entry.is_dir {
                continue; // sidecar/content files, not child nodes
            }
            let child_uri = uri.child(&entry.name);
            let meta = read_meta(&self.store, &child_uri).await.ok();
            let r#abstract = if output == ListOutput::Agent {
                let text = read_sidecar_text(&self.store, &abstract_path(&child_uri)).await;
                Some(text.chars().take(abs_limit).collect())
            } else {
                None
            };
            out.push(ListEntry {
                name: entry.name.clone(),
                uri: child_uri.as_str().to_string(),
                is_dir: meta.as_ref().map(|m| !m.is_leaf).unwrap_or(true),
                r#abstract,
                size: entry.size,
                mtime_ms: entry.mtime_ms,
            });
            if recursive {
                Box::pin(self.collect(&child_uri, recursive, output, abs_limit, node_limit, out)).await?;
            }
        }
        Ok(())
    }

    pub async fn stat(&self, uri: &VikingUri) -> Result<StatResult> {
        let entry = self.store.stat(&backend_path(uri)).await?;
        let meta = read_meta(&self.store, uri).await?;
        let has_abstract = self.store.stat(&abstract_path(uri)).await.is_ok();
        let has_overview = self.store.stat(&overview_path(uri)).await.is_ok();
        Ok(StatResult {
            name: uri.name().unwrap_or_default().to_string(),
            is_dir: entry.is_dir && !meta.is_leaf,
            size: entry.size,
            created_at: meta.created_at,
            updated_at: meta.updated_at,
            context_type: meta.context_type,
            has_abstract,
            has_overview,
        })
    }

    pub async fn read(&self, uri: &VikingUri) -> Result<Vec<u8>> {
        self.store.read_bytes(&content_path(uri)).await
    }

    pub async fn r#abstract(&self, uri: &VikingUri) -> Result<String> {
        Ok(read_sidecar_text(&self.store, &abstract_path(uri)).await)
    }

    pub async fn overview(&self, uri: &VikingUri) -> Result<String> {
        Ok(read_sidecar_text(&self.store, &overview_path(uri)).await)
    }

    pub async fn mkdir(&self, uri: &VikingUri, exist_ok: bool) -> Result<()> {
        let _guard = self.locks.acquire_one(uri.as_str()).await;
        self.mkdir_all(uri, exist_ok).await
    }

    async fn mkdir_all(&self, uri: &VikingUri, exist_ok: bool) -> Result<()> {
        let mut ancestors = Vec::new();
        let mut cursor = Some(uri.clone());
        while let Some(u) = cursor {
            ancestors.push(u.clone());
            cursor = u.parent();
        }
        for ancestor in ancestors.into_iter().rev() {
            match self.store.mkdir(&backend_path(&ancestor), true).await {
                Ok(()) => {}
                Err(e) => return Err(e),
            }
        }
        if !exist_ok && self.store.stat(&meta_path(uri)).await.is_ok() {
            return Err(Error::already_exists(uri.as_str()));
        }
        if self.store.stat(&meta_path(uri)).await.is_err() {
            let meta = MetaSidecar::new(uri, false, "");
            write_meta(&self.store, uri, &meta).await?;
        }
        Ok(())
    }

    pub async fn rm(&self, uri: &VikingUri, recursive: bool) -> Result<()> {
        let _guard = self.locks.acquire_one(uri.as_str()).await;
        let dir_path = backend_path(uri);
        let entries = self.store.list(&dir_path).await.unwrap_or_default();
        let has_children = entries.iter().any(|e| e.is_dir);
        if has_children && !recursive {
            return Err(Error::failed_precondition(format!("{} is not empty", uri.as_str())));
        }
        self.remove_recursive(&dir_path).await
    }

    fn remove_recursive<'a>(&'a self, dir_path: &'a str) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            let entries = self.store.list(dir_path).await.unwrap_or_default();
            for entry in entries {
                let child_path = format!("{dir_path}/{}", entry.name);
                if entry.is_dir {
                    self.remove_recursive(&child_path).await?;
                } else {
                    self.store.delete(&child_path).await?;
                }
            }
            self.store.delete(dir_path).await
        })
    }

    pub async fn mv(&self, src: &VikingUri, dst: &VikingUri) -> Result<()> {
        let _guard = self.locks.acquire(&[src.as_str().to_string(), dst.as_str().to_string()]).await;
        if self.store.stat(&meta_path(dst)).await.is_ok() {
            return Err(Error::already_exists(dst.as_str()));
        }
        if let Some(parent) = dst.parent() {
            self.mkdir_all(&parent, true).await?;
        }
        self.store.r#move(&backend_path(src), &backend_path(dst)).await?;
        // parent_uri is derived from the URI itself, not stored, so the move
        // alone re-parents every descendant; just bump their updated_at.
        self.touch_descendants(dst).await
    }

    async fn touch_descendants(&self, root: &VikingUri) -> Result<()> {
        let mut stack = vec![root.clone()];
        while let Some(uri) = stack.pop() {
            if let Ok(mut meta) = read_meta(&self.store, &uri).await {
                meta.touch();
                write_meta(&self.store, &uri, &meta).await.ok();
            }
            if let Ok(entries) = self.store.list(&backend_path(&uri)).await {
                for entry in entries.into_iter().filter(|e| e.is_dir) {
                    stack.push(uri.child(&entry.name));
                }
            }
        }
        Ok(())
    }

    pub async fn grep(&self, uri: &VikingUri, pattern: &str, case_insensitive: bool, node_limit: Option<usize>) -> Result<GrepResult> {
        let limit = node_limit.unwrap_or(DEFAULT_NODE_LIMIT);
        let regex = RegexBuilder::new(pattern).case_insensitive(case_insensitive).build().map_err(|e| Error::invalid_argument(e.to_string()))?;
        let mut matches = Vec::new();
        let mut visited = 0usize;
        self.grep_walk(uri, &regex, limit, &mut visited, &mut matches).await?;
        let count = matches.len();
        Ok(GrepResult { matches, count })
    }

    fn grep_walk<'a>(
        &'a self,
        uri: &'a VikingUri,
        regex: &'a Regex,
        limit: usize,
        visited: &'a mut usize,
        matches: &'a mut Vec<GrepMatch>,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            if *visited >= limit {
                return Ok(());
            }
            *visited += 1;
            if let Ok(bytes) = self.store.read_bytes(&content_path(uri)).await {
                if bytes.len() <= GREP_FILE_SIZE_CAP {
                    let text = String::from_utf8_lossy(&bytes);
                    for (idx, line) in text.lines().enumerate() {
                        if regex.is_match(line) {
                            matches.push(GrepMatch { uri: uri.as_str().to_string(), line: idx + 1, text: line.to_string() });
                        }
                    }
                }
            }
            if let Ok(entries) = self.store.list(&backend_path(uri)).await {
                for entry in entries.into_iter().filter(|e| e.is_dir) {
                    self.grep_walk(&uri.child(&entry.name), regex, limit, visited, matches).await?;
                }
            }
            Ok(())
        })
    }

    pub async fn glob(&self, pattern: &str, root: &VikingUri) -> Result<GlobResult> {
        let compiled = glob::Pattern::new(pattern).map_err(|e| Error::invalid_argument(e.to_string()))?;
        let mut matches = Vec::new();
        self.glob_walk(root, &compiled, &mut matches).await?;
        let count = matches.len();
        Ok(GlobResult { matches, count })
    }

    fn glob_walk<'a>(
        &'a self,
        uri: &'a VikingUri,
        pattern: &'a glob::Pattern,
        matches: &'a mut Vec<String>,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            if let Ok(entries) = self.store.list(&backend_path(uri)).await {
                for entry in entries.into_iter().filter(|e| e.is_dir) {
                    let child = uri.child(&entry.name);
                    let relative = child.segments().join("/");
                    if pattern.matches(&relative) {
                        matches.push(child.as_str().to_string());
                    }
                    self.glob_walk(&child, pattern, matches).await?;
                }
            }
            Ok(())
        })
    }

    pub async fn relations(&self, uri: &VikingUri) -> Result<Vec<Relation>> {
        Ok(read_meta(&self.store, uri).await?.related_uri)
    }

    pub async fn link(&self, from: &VikingUri, to: &[VikingUri], reason: &str) -> Result<()> {
        let _guard = self.locks.acquire_one(from.as_str()).await;
        let mut meta = read_meta(&self.store, from).await?;
        for target in to {
            meta.related_uri.push(Relation { uri: target.as_str().to_string(), reason: reason.to_string() });
        }
        meta.touch();
        write_meta(&self.store, from, &meta).await
    }

    pub async fn unlink(&self, from: &VikingUri, to: &VikingUri) -> Result<()> {
        let _guard = self.locks.acquire_one(from.as_str()).await;
        let mut meta = read_meta(&self.store, from).await?;
        meta.related_uri.retain(|r| r.uri != to.as_str());
        meta.touch();
        write_meta(&self.store, from, &meta).await
    }

    /// Writes the four-file node bundle under a single logical operation,
    /// as a single write-locked transaction over `uri`.
    pub async fn write_context(
        &self,
        uri: &VikingUri,
        content: Option<&[u8]>,
        r#abstract: &str,
        overview: &str,
        is_leaf: bool,
    ) -> Result<()> {
        let _guard = self.locks.acquire_one(uri.as_str()).await;
        if let Some(parent) = uri.parent() {
            self.mkdir_all(&parent, true).await?;
        }
        self.store.mkdir(&backend_path(uri), true).await?;

        let mut meta = read_meta(&self.store, uri).await.unwrap_or_else(|_| MetaSidecar::new(uri, is_leaf, r#abstract));
        meta.is_leaf = is_leaf;
        meta.vectorize_text = r#abstract.to_string();
        meta.touch();

        self.store.write_bytes(&abstract_path(uri), r#abstract.as_bytes()).await?;
        self.store.write_bytes(&overview_path(uri), overview.as_bytes()).await?;
        if let Some(bytes) = content {
            self.store.write_bytes(&content_path(uri), bytes).await?;
        }
        write_meta(&self.store, uri, &meta).await
    }

    pub async fn write_file(&self, uri: &VikingUri, text: &str) -> Result<()> {
        self.write_file_bytes(uri, text.as_bytes()).await
    }

    pub async fn write_file_bytes(&self, uri: &VikingUri, bytes: &[u8]) -> Result<()> {
        let _guard = self.locks.acquire_one(uri.as_str()).await;
        if let Some(parent) = uri.parent() {
            self.mkdir_all(&parent, true).await?;
        }
        self.store.mkdir(&backend_path(uri), true).await?;
        if self.store.stat(&meta_path(uri)).await.is_err() {
            let meta = MetaSidecar::new(uri, true, "");
            write_meta(&self.store, uri, &meta).await?;
        }
        self.store.write_bytes(&content_path(uri), bytes).await
    }

    /// Recursively removes a `viking://temp/...` subtree. Callers are
    /// expected to have already validated the URI is under `temp`.
    pub async fn delete_temp(&self, uri: &VikingUri) -> Result<()> {
        self.remove_recursive(&backend_path(uri)).await
    }

    /// `_resolve_unique_uri`: if `base` is free, return it; otherwise try
    /// `base_1`, `base_2`, ... up to [`DEFAULT_MAX_RESOLVE_ATTEMPTS`].
    pub async fn resolve_unique_uri(&self, base: &VikingUri) -> Result<VikingUri> {
        if self.store.stat(&meta_path(base)).await.is_err() {
            return Ok(base.clone());
        }
        for attempt in 1..=DEFAULT_MAX_RESOLVE_ATTEMPTS {
            let candidate = base.with_suffix(&format!("_{attempt}"));
            if self.store.stat(&meta_path(&candidate)).await.is_err() {
                return Ok(candidate);
            }
        }
        Err(Error::already_exists(format!("{} and its numbered siblings are all taken", base.as_str())))
    }

    /// Moves a fully-parsed, fully-sidecar'd subtree from `viking://temp/...`
    /// into its finalized home, resolving name collisions and journaling the
    /// move so a crash mid-finalize rolls back cleanly.
    pub async fn finalize_from_temp(&self, temp_root: &VikingUri, target_base: &VikingUri) -> Result<VikingUri> {
        let target = self.resolve_unique_uri(target_base).await?;
        let target_parent = target.parent();

        let mut lock_paths = vec![temp_root.as_str().to_string()];
        if let Some(parent) = &target_parent {
            lock_paths.push(parent.as_str().to_string());
        }
        let _guard = self.locks.acquire(&lock_paths).await;

        let mut txn_init_info = HashMap::new();
        txn_init_info.insert("temp_root".to_string(), serde_json::json!(temp_root.as_str()));
        txn_init_info.insert("target".to_string(), serde_json::json!(target.as_str()));
        let mut record = self.txn.begin(lock_paths, txn_init_info).await?;
        self.txn.transition(&mut record, TransactionStatus::Acquire).await?;

        if let Some(parent) = &target_parent {
            self.mkdir_all(parent, true).await?;
        }

        self.txn.transition(&mut record, TransactionStatus::Exec).await?;
        let mut rollback_info = HashMap::new();
        rollback_info.insert("temp_root".to_string(), serde_json::json!(temp_root.as_str()));
        self.txn.set_rollback_info(&mut record, rollback_info);

        match self.store.r#move(&backend_path(temp_root), &backend_path(&target)).await {
            Ok(()) => {
                self.txn.transition(&mut record, TransactionStatus::Commit).await?;
                self.txn.release(&mut record).await?;
                Ok(target)
            }
            Err(e) => {
                self.txn.transition(&mut record, TransactionStatus::Fail).await?;
                let _ = self.delete_temp(temp_root).await;
                self.txn.release(&mut record).await?;
                Err(e)
            }
        }
    }

    /// Bumps `active_count`/`updated_at` for a node that was just used
    /// (read, retrieved, or referenced by search).
    pub async fn touch(&self, uri: &VikingUri) -> Result<()> {
        let _guard = self.locks.acquire_one(uri.as_str()).await;
        let mut meta = read_meta(&self.store, uri).await?;
        meta.touch();
        write_meta(&self.store, uri, &meta).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::backend::local::LocalObjectStore;
    use tempfile::TempDir;

    fn fs() -> (VikingFs, TempDir) {
        let dir = TempDir::new().unwrap();
        let store: SharedObjectStore = Arc::new(LocalObjectStore::new(dir.path()));
        let locks = Arc::new(PathLockManager::new());
        let txn = Arc::new(TransactionManager::new(store.clone()));
        (VikingFs::new(store, locks, txn), dir)
    }

    #[tokio::test]
    async fn write_then_read_round_trips() {
        let (vfs, _dir) = fs();
        let uri = VikingUri::parse("viking://resources/docs/readme").unwrap();
        vfs.write_context(&uri, Some(b"hello world"), "short", "longer text", true).await.unwrap();

        assert_eq!(vfs.read(&uri).await.unwrap(), b"hello world");
        assert_eq!(vfs.r#abstract(&uri).await.unwrap(), "short");
        assert_eq!(vfs.overview(&uri).await.unwrap(), "longer text");

        let stat = vfs.stat(&uri).await.unwrap();
        assert!(!stat.is_dir);
        assert!(stat.has_abstract);
    }

    #[tokio::test]
    async fn ls_lists_children_with_abstracts() {
        let (vfs, _dir) = fs();
        let a = VikingUri::parse("viking://resources/docs/a").unwrap();
        let b = VikingUri::parse("viking://resources/docs/b").unwrap();
        vfs.write_context(&a, Some(b"a"), "abs a", "", true).await.unwrap();
        vfs.write_context(&b, Some(b"b"), "abs b", "", true).await.unwrap();

        let root = VikingUri::parse("viking://resources/docs").unwrap();
        let entries = vfs.ls(&root, false, ListOutput::Agent, 256, None).await.unwrap();
        assert_eq!(entries.len(), 2);
        assert!(entries.iter().any(|e| e.name == "a" && e.r#abstract.as_deref() == Some("abs a")));
    }

    #[tokio::test]
    async fn resolve_unique_uri_appends_numeric_suffix_on_collision() {
        let (vfs, _dir) = fs();
        let uri = VikingUri::parse("viking://resources/docs/dup").unwrap();
        vfs.write_context(&uri, Some(b"1"), "a", "", true).await.unwrap();

        let resolved = vfs.resolve_unique_uri(&uri).await.unwrap();
        assert_eq!(resolved.as_str(), "viking://resources/docs/dup_1");
    }

    #[tokio::test]
    async fn finalize_from_temp_moves_subtree_into_place() {
        let (vfs, _dir) = fs();
        let temp = VikingUri::parse("viking://temp/abc123").unwrap();
        let leaf = temp.child("file.md");
        vfs.write_context(&leaf, Some(b"content"), "abs", "ov", true).await.unwrap();

        let target_base = VikingUri::parse("viking://resources/incoming").unwrap();
        let result = vfs.finalize_from_temp(&temp, &target_base).await.unwrap();
        assert_eq!(result.as_str(), "viking://resources/incoming");

        let finalized_leaf = result.child("file.md");
        assert_eq!(vfs.read(&finalized_leaf).await.unwrap(), b"content");
        assert!(vfs.stat(&temp).await.is_err());
    }

    #[tokio::test]
    async fn rm_without_recursive_fails_on_non_empty_directory() {
        let (vfs, _dir) = fs();
        let child = VikingUri::parse("viking://resources/docs/child").unwrap();
        vfs.write_context(&child, Some(b"x"), "a", "", true).await.unwrap();

        let dir = VikingUri::parse("viking://resources/docs").unwrap();
        let result = vfs.rm(&dir, false).await;
        assert!(result.is_err());
        assert!(vfs.rm(&dir, true).await.is_ok());
    }

    #[tokio::test]
    async fn grep_finds_matching_lines_in_descendant_content() {
        let (vfs, _dir) = fs();
        let uri = VikingUri::parse("viking://resources/docs/notes").unwrap();
        vfs.write_context(&uri, Some(b"line one\nTODO: fix this\nline three"), "a", "", true).await.unwrap();

        let root = VikingUri::parse("viking://resources").unwrap();
        let result = vfs.grep(&root, "TODO", false, None).await.unwrap();
        assert_eq!(result.count, 1);
        assert_eq!(result.matches[0].line, 2);
    }
}
