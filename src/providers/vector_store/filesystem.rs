//! Flat-file vector collection: the default backend (feature
//! `filesystem-store`). Suitable for the single-node scale this crate
//! targets; stores the whole index as one JSON file and does a brute-force
//! cosine scan on search.

use crate::domain::error::Result;
use crate::domain::ports::vector_store::{
    CountResult, FetchResult, FieldValue, Filter, SearchHit, VectorCollectionProvider, VectorRecord,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use tokio::sync::RwLock;

pub struct FilesystemVectorCollection {
    dimension: usize,
    index_path: PathBuf,
    records: RwLock<HashMap<u64, VectorRecord>>,
}

impl FilesystemVectorCollection {
    /// Open (or create) the flat-file index at `index_path`.
    pub async fn open(index_path: PathBuf, dimension: usize) -> Result<Self> {
        let records = if index_path.exists() {
            let bytes = tokio::fs::read(&index_path).await?;
            if bytes.is_empty() {
                HashMap::new()
            } else {
                serde_json::from_slice(&bytes)?
            }
        } else {
            HashMap::new()
        };
        Ok(Self { dimension, index_path, records: RwLock::new(records) })
    }

    async fn persist(&self, records: &HashMap<u64, VectorRecord>) -> Result<()> {
        if let Some(parent) = self.index_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let bytes = serde_json::to_vec(records)?;
        let tmp = self.index_path.with_extension("tmp");
        tokio::fs::write(&tmp, &bytes).await?;
        tokio::fs::rename(&tmp, &self.index_path).await?;
        Ok(())
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

fn group_key(value: &FieldValue) -> String {
    match value {
        FieldValue::Str(s) => s.clone(),
        FieldValue::Int(i) => i.to_string(),
        FieldValue::Float(f) => f.to_string(),
        FieldValue::Bool(b) => b.to_string(),
    }
}

#[async_trait]
impl VectorCollectionProvider for FilesystemVectorCollection {
    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn upsert(&self, records: Vec<VectorRecord>) -> Result<()> {
        let mut guard = self.records.write().await;
        for record in records {
            guard.insert(record.id, record);
        }
        self.persist(&guard).await
    }

    async fn fetch(&self, ids: &[u64]) -> Result<FetchResult> {
        let guard = self.records.read().await;
        let mut items = Vec::new();
        let mut missing_ids = Vec::new();
        for id in ids {
            match guard.get(id) {
                Some(r) => items.push(r.clone()),
                None => missing_ids.push(*id),
            }
        }
        Ok(FetchResult { items, missing_ids })
    }

    async fn delete(&self, ids: &[u64]) -> Result<()> {
        let mut guard = self.records.write().await;
        for id in ids {
            guard.remove(id);
        }
        self.persist(&guard).await
    }

    async fn delete_by_filter(&self, filter: &Filter) -> Result<u64> {
        let mut guard = self.records.write().await;
        let matching: Vec<u64> = guard.values().filter(|r| filter.matches(r)).map(|r| r.id).collect();
        for id in &matching {
            guard.remove(id);
        }
        self.persist(&guard).await?;
        Ok(matching.len() as u64)
    }

    async fn search(
        &self,
        query_vector: &[f32],
        filter: Option<&Filter>,
        limit: usize,
        score_threshold: Option<f32>,
    ) -> Result<Vec<SearchHit>> {
        let guard = self.records.read().await;
        let mut hits: Vec<SearchHit> = guard
            .values()
            .filter(|r| filter.map(|f| f.matches(r)).unwrap_or(true))
            .filter_map(|r| {
                let dense = r.dense_vector.as_ref()?;
                let score = cosine_similarity(query_vector, dense);
                Some(SearchHit { record: r.clone(), score })
            })
            .filter(|hit| score_threshold.map(|t| hit.score >= t).unwrap_or(true))
            .collect();

        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        hits.truncate(limit);
        Ok(hits)
    }

    async fn aggregate_count(&self, filter: Option<&Filter>, group_by: Option<&str>) -> Result<CountResult> {
        let guard = self.records.read().await;
        let matching: Vec<&VectorRecord> =
            guard.values().filter(|r| filter.map(|f| f.matches(r)).unwrap_or(true)).collect();

        match group_by {
            None => Ok(CountResult::Total { _total: matching.len() as u64 }),
            Some(field) => {
                let mut grouped: HashMap<String, u64> = HashMap::new();
                for record in matching {
                    let key = match field {
                        "context_type" => record.context_type.clone(),
                        "user" => record.user.clone().unwrap_or_default(),
                        "session_id" => record.session_id.clone().unwrap_or_default(),
                        _ => record.fields.get(field).map(group_key).unwrap_or_default(),
                    };
                    *grouped.entry(key).or_insert(0) += 1;
                }
                Ok(CountResult::Grouped(grouped))
            }
        }
    }

    fn backend_name(&self) -> &'static str {
        "filesystem"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::vector_store::uri_to_id;
    use tempfile::TempDir;

    fn record(uri: &str, dense: Vec<f32>) -> VectorRecord {
        VectorRecord {
            id: uri_to_id(uri),
            uri: uri.to_string(),
            dense_vector: Some(dense),
            sparse_vector: None,
            fields: HashMap::new(),
            created_at_ms: 0,
            context_type: "resource".to_string(),
            user: None,
            session_id: None,
            r#abstract: String::new(),
        }
    }

    #[tokio::test]
    async fn upsert_then_search_ranks_by_cosine_similarity() {
        let dir = TempDir::new().unwrap();
        let store = FilesystemVectorCollection::open(dir.path().join("index.json"), 2).await.unwrap();
        store
            .upsert(vec![
                record("viking://resources/a", vec![1.0, 0.0]),
                record("viking://resources/b", vec![0.0, 1.0]),
            ])
            .await
            .unwrap();

        let hits = store.search(&[1.0, 0.0], None, 10, None).await.unwrap();
        assert_eq!(hits[0].record.uri, "viking://resources/a");
        assert!(hits[0].score > hits[1].score);
    }

    #[tokio::test]
    async fn persists_across_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("index.json");
        {
            let store = FilesystemVectorCollection::open(path.clone(), 2).await.unwrap();
            store.upsert(vec![record("viking://resources/a", vec![1.0, 0.0])]).await.unwrap();
        }
        let reopened = FilesystemVectorCollection::open(path, 2).await.unwrap();
        let result = reopened.fetch(&[uri_to_id("viking://resources/a")]).await.unwrap();
        assert_eq!(result.items.len(), 1);
    }

    #[tokio::test]
    async fn delete_by_filter_removes_matching_records() {
        let dir = TempDir::new().unwrap();
        let store = FilesystemVectorCollection::open(dir.path().join("index.json"), 2).await.unwrap();
        store
            .upsert(vec![
                record("viking://resources/a", vec![1.0, 0.0]),
                record("viking://resources/b", vec![0.0, 1.0]),
            ])
            .await
            .unwrap();
        let filter = Filter::Prefix { field: "uri".into(), value: "viking://resources/a".into() };
        let removed = store.delete_by_filter(&filter).await.unwrap();
        assert_eq!(removed, 1);
        let count = store.aggregate_count(None, None).await.unwrap();
        matches!(count, CountResult::Total { _total: 1 });
    }
}
