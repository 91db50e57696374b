//! Session service (component J): an append-only JSONL message log per
//! session, with compress-on-commit archiving.
//!
//! Grounded in `openviking/service/session_service.py` and
//! `openviking/session/__init__.py`: `sessions()` filters pseudo-entries,
//! `delete` surfaces a missing session as `NotFound` rather than a generic
//! internal error, and `commit` mirrors `Session.commit()`'s
//! compress→archive→extract-memories→truncate pipeline. The compression step
//! itself (the VLM call producing the archived summary) lives in the
//! `commit` HTTP handler alongside the existing memory-extraction VLM call,
//! so this service stays VLM-free, taking the finished summary text as a
//! parameter the same way it already takes `memories_extracted`.

use crate::domain::error::{Error, Result};
use crate::domain::ports::object_store::SharedObjectStore;
use crate::domain::types::Message;
use crate::domain::uri::VikingUri;
use serde::Serialize;

const LOG_FILE: &str = "log.jsonl";
const ARCHIVE_DIR: &str = "archive";

pub struct SessionService {
    store: SharedObjectStore,
}

#[derive(Debug, Clone, Serialize)]
pub struct CommitOutcome {
    pub status: &'static str,
    pub session_id: String,
    pub archived: bool,
    pub memories_extracted: u64,
    pub active_count_updated: u64,
}

impl SessionService {
    pub fn new(store: SharedObjectStore) -> Self {
        Self { store }
    }

    fn log_path(session_id: &str) -> String {
        format!("session/{session_id}/{LOG_FILE}")
    }

    /// Lists session directories under `viking://session`, filtering out
    /// `.`/`..` pseudo-entries the way the original explicitly does.
    pub async fn sessions(&self) -> Result<Vec<String>> {
        let entries = self.store.list("session").await.unwrap_or_default();
        Ok(entries
            .into_iter()
            .filter(|e| e.is_dir && e.name != "." && e.name != "..")
            .map(|e| e.name)
            .collect())
    }

    pub async fn append(&self, session_id: &str, message: &Message) -> Result<()> {
        let path = Self::log_path(session_id);
        let mut bytes = self.store.read_bytes(&path).await.unwrap_or_default();
        bytes.extend_from_slice(serde_json::to_string(message)?.as_bytes());
        bytes.push(b'\n');
        self.store.write_bytes(&path, &bytes).await
    }

    pub async fn messages(&self, session_id: &str) -> Result<Vec<Message>> {
        let path = Self::log_path(session_id);
        let bytes = self.store.read_bytes(&path).await?;
        let text = String::from_utf8_lossy(&bytes);
        text.lines().filter(|l| !l.trim().is_empty()).map(|l| Ok(serde_json::from_str(l)?)).collect()
    }

    /// A missing session is `NotFound`, not a generic internal error — the
    /// original raises `NotFoundError` specifically here.
    pub async fn delete(&self, session_id: &str) -> Result<()> {
        let path = format!("session/{session_id}");
        self.store.stat(&path).await.map_err(|_| Error::not_found(format!("session {session_id}")))?;
        self.delete_recursive(&path).await
    }

    fn delete_recursive<'a>(&'a self, path: &'a str) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            let entries = self.store.list(path).await.unwrap_or_default();
            for entry in entries {
                let child = format!("{path}/{}", entry.name);
                if entry.is_dir {
                    self.delete_recursive(&child).await?;
                } else {
                    self.store.delete(&child).await?;
                }
            }
            self.store.delete(path).await
        })
    }

    /// Compress → write archive → extract memories → truncate the live log.
    /// Compression (producing `summary`) and memory extraction are VLM calls
    /// the caller supplies; this method writes the summary as the archive
    /// entry and performs the mechanical truncate step, reporting whatever
    /// memory count the caller found (spec §4.J: `commit()` "calls
    /// compressor → produces a summary written to
    /// `viking://session/<id>/archive/<n>.md`").
    pub async fn commit(&self, session_id: &str, summary: &str, memories_extracted: u64) -> Result<CommitOutcome> {
        let log_path = Self::log_path(session_id);
        match self.store.read_bytes(&log_path).await {
            Ok(b) if !b.is_empty() => {}
            _ => {
                return Ok(CommitOutcome {
                    status: "empty",
                    session_id: session_id.to_string(),
                    archived: false,
                    memories_extracted: 0,
                    active_count_updated: 0,
                });
            }
        };

        let stamp = chrono::Utc::now().format("%Y%m%dT%H%M%S%.3f");
        let archive_path = format!("session/{session_id}/{ARCHIVE_DIR}/{stamp}.md");
        self.store.mkdir(&format!("session/{session_id}/{ARCHIVE_DIR}"), true).await.ok();
        self.store.write_bytes(&archive_path, summary.as_bytes()).await?;
        self.store.write_bytes(&log_path, b"").await?;

        Ok(CommitOutcome {
            status: "committed",
            session_id: session_id.to_string(),
            archived: true,
            memories_extracted,
            active_count_updated: memories_extracted,
        })
    }
}

/// Resolves a session id to its `viking://session/<id>` URI.
pub fn session_uri(session_id: &str) -> Result<VikingUri> {
    VikingUri::parse(&format!("viking://session/{session_id}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::Role;
    use crate::infrastructure::backend::local::LocalObjectStore;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn service() -> (SessionService, TempDir) {
        let dir = TempDir::new().unwrap();
        let store: SharedObjectStore = Arc::new(LocalObjectStore::new(dir.path()));
        (SessionService::new(store), dir)
    }

    #[tokio::test]
    async fn append_then_read_back_messages() {
        let (svc, _dir) = service();
        let msg = Message::new(Role::User, vec![]);
        svc.append("s1", &msg).await.unwrap();
        let messages = svc.messages("s1").await.unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].id, msg.id);
    }

    #[tokio::test]
    async fn delete_missing_session_is_not_found() {
        let (svc, _dir) = service();
        let err = svc.delete("nope").await.unwrap_err();
        assert_eq!(err.code(), crate::domain::error::ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn commit_archives_and_truncates_the_log() {
        let (svc, _dir) = service();
        let msg = Message::new(Role::User, vec![]);
        svc.append("s1", &msg).await.unwrap();

        let outcome = svc.commit("s1", "a short summary", 2).await.unwrap();
        assert_eq!(outcome.status, "committed");
        assert!(outcome.archived);

        let messages = svc.messages("s1").await.unwrap();
        assert!(messages.is_empty());
    }

    #[tokio::test]
    async fn commit_writes_the_summary_as_a_markdown_archive_entry() {
        let (svc, _dir) = service();
        let msg = Message::new(Role::User, vec![]);
        svc.append("s1", &msg).await.unwrap();
        svc.commit("s1", "this session discussed the quarterly report", 0).await.unwrap();

        let entries = svc.store.list("session/s1/archive").await.unwrap();
        assert_eq!(entries.len(), 1);
        assert!(entries[0].name.ends_with(".md"));

        let bytes = svc.store.read_bytes(&format!("session/s1/archive/{}", entries[0].name)).await.unwrap();
        assert_eq!(String::from_utf8(bytes).unwrap(), "this session discussed the quarterly report");
    }

    #[tokio::test]
    async fn commit_on_empty_session_does_not_archive() {
        let (svc, _dir) = service();
        let outcome = svc.commit("s1", "unused", 0).await.unwrap();
        assert_eq!(outcome.status, "empty");
        assert!(!outcome.archived);
    }
}
