//! Transaction journal (component B).
//!
//! Every multi-step mutation (finalize-from-temp, resource processing, skill
//! processing) opens a [`TransactionRecord`], journals it through the backend
//! store at `temp/_txn/<id>.json`, and releases it on completion. Records left
//! behind by a crash are rolled back at startup via [`TransactionManager::recover`].

use crate::domain::error::Result;
use crate::domain::ports::object_store::SharedObjectStore;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use uuid::Uuid;

/// Transaction status machine: `Init -> Acquire -> Exec -> Commit|Fail ->
/// Releasing -> Released`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionStatus {
    Init,
    Acquire,
    Exec,
    Commit,
    Fail,
    Releasing,
    Released,
}

/// A single transaction's lifecycle record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub id: String,
    pub locks: Vec<String>,
    pub status: TransactionStatus,
    #[serde(default)]
    pub init_info: HashMap<String, Value>,
    #[serde(default)]
    pub rollback_info: HashMap<String, Value>,
    pub created_at: f64,
    pub updated_at: f64,
}

impl TransactionRecord {
    fn new(locks: Vec<String>, init_info: HashMap<String, Value>) -> Self {
        let now = Utc::now().timestamp_millis() as f64 / 1000.0;
        Self {
            id: Uuid::new_v4().to_string(),
            locks,
            status: TransactionStatus::Init,
            init_info,
            rollback_info: HashMap::new(),
            created_at: now,
            updated_at: now,
        }
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now().timestamp_millis() as f64 / 1000.0;
    }

    fn journal_path(&self) -> String {
        format!("temp/_txn/{}.json", self.id)
    }
}

/// Journals transaction records through a backend store and recovers
/// dangling transactions at startup.
pub struct TransactionManager {
    store: SharedObjectStore,
}

impl TransactionManager {
    pub fn new(store: SharedObjectStore) -> Self {
        Self { store }
    }

    /// Begin a new transaction, journaling it in `INIT` status.
    pub async fn begin(&self, locks: Vec<String>, init_info: HashMap<String, Value>) -> Result<TransactionRecord> {
        let record = TransactionRecord::new(locks, init_info);
        self.persist(&record).await?;
        Ok(record)
    }

    pub async fn transition(&self, record: &mut TransactionRecord, status: TransactionStatus) -> Result<()> {
        record.status = status;
        record.touch();
        self.persist(record).await
    }

    pub fn set_rollback_info(&self, record: &mut TransactionRecord, info: HashMap<String, Value>) {
        record.rollback_info = info;
        record.touch();
    }

    /// Transition to `RELEASING`, delete the journal entry, then mark
    /// `RELEASED` in memory (the deleted record is never re-persisted).
    pub async fn release(&self, record: &mut TransactionRecord) -> Result<()> {
        self.transition(record, TransactionStatus::Releasing).await?;
        self.store.delete(&record.journal_path()).await?;
        record.status = TransactionStatus::Released;
        record.touch();
        Ok(())
    }

    async fn persist(&self, record: &TransactionRecord) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(record)?;
        self.store.write_bytes(&record.journal_path(), &bytes).await
    }

    /// List every journaled transaction not yet `RELEASED`. Callers roll
    /// each one back using `rollback_info` and then call [`Self::release`].
    pub async fn recover(&self) -> Result<Vec<TransactionRecord>> {
        let entries = match self.store.list("temp/_txn").await {
            Ok(entries) => entries,
            Err(_) => return Ok(Vec::new()),
        };
        let mut dangling = Vec::new();
        for entry in entries {
            if entry.is_dir || !entry.name.ends_with(".json") {
                continue;
            }
            let path = format!("temp/_txn/{}", entry.name);
            let bytes = self.store.read_bytes(&path).await?;
            let record: TransactionRecord = serde_json::from_slice(&bytes)?;
            if record.status != TransactionStatus::Released {
                dangling.push(record);
            }
        }
        Ok(dangling)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::backend::local::LocalObjectStore;
    use std::sync::Arc;
    use tempfile::TempDir;

    async fn manager() -> (TransactionManager, TempDir) {
        let dir = TempDir::new().unwrap();
        let store: SharedObjectStore = Arc::new(LocalObjectStore::new(dir.path()));
        (TransactionManager::new(store), dir)
    }

    #[tokio::test]
    async fn begin_then_release_clears_the_journal() {
        let (mgr, _dir) = manager().await;
        let mut record = mgr.begin(vec!["viking://resources/a".into()], HashMap::new()).await.unwrap();
        assert_eq!(record.status, TransactionStatus::Init);
        mgr.transition(&mut record, TransactionStatus::Acquire).await.unwrap();
        mgr.transition(&mut record, TransactionStatus::Exec).await.unwrap();
        mgr.transition(&mut record, TransactionStatus::Commit).await.unwrap();
        mgr.release(&mut record).await.unwrap();
        assert_eq!(record.status, TransactionStatus::Released);
        assert!(mgr.recover().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn recover_surfaces_dangling_transactions() {
        let (mgr, _dir) = manager().await;
        let mut record = mgr.begin(vec!["viking://resources/a".into()], HashMap::new()).await.unwrap();
        mgr.transition(&mut record, TransactionStatus::Exec).await.unwrap();
        let dangling = mgr.recover().await.unwrap();
        assert_eq!(dangling.len(), 1);
        assert_eq!(dangling[0].id, record.id);
    }
}
