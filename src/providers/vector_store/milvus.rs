//! Milvus-backed vector collection (feature `milvus`), for deployments past
//! the scale the filesystem backend targets.

use crate::domain::error::{Error, Result};
use crate::domain::ports::vector_store::{
    CountResult, FetchResult, Filter, SearchHit, VectorCollectionProvider, VectorRecord,
};
use async_trait::async_trait;
use milvus::client::Client;
use std::sync::Arc;

pub struct MilvusVectorCollection {
    client: Arc<Client>,
    collection: String,
    dimension: usize,
}

impl MilvusVectorCollection {
    pub async fn connect(address: &str, token: Option<String>, collection: String, dimension: usize) -> Result<Self> {
        let mut client =
            Client::new(address).await.map_err(|e| Error::internal(format!("failed to connect to milvus: {e}")))?;
        if let Some(token) = token {
            client.set_token(token);
        }
        Ok(Self { client: Arc::new(client), collection, dimension })
    }
}

#[async_trait]
impl VectorCollectionProvider for MilvusVectorCollection {
    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn upsert(&self, records: Vec<VectorRecord>) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }
        // TODO: milvus-sdk-rust 0.1 has no typed upsert-by-id; delete then
        // insert by the same primary keys until the crate exposes one.
        let ids: Vec<u64> = records.iter().map(|r| r.id).collect();
        let expr = format!("id in {}", serde_json::to_string(&ids)?);
        let _ = self.client.delete(&self.collection, &expr).await;

        let mut id_col = Vec::with_capacity(records.len());
        let mut vector_col = Vec::with_capacity(records.len());
        for r in &records {
            let dense = r
                .dense_vector
                .clone()
                .ok_or_else(|| Error::invalid_argument("milvus collection requires a dense vector"))?;
            id_col.push(r.id);
            vector_col.push(dense);
        }
        let columns = vec![
            milvus::data::FieldColumn::new("id", id_col),
            milvus::data::FieldColumn::new("vector", vector_col),
        ];
        self.client
            .insert(&self.collection, "", columns)
            .await
            .map_err(|e| Error::internal(format!("milvus insert failed: {e}")))?;
        self.client.flush(&self.collection).await.map_err(|e| Error::internal(format!("milvus flush failed: {e}")))?;
        Ok(())
    }

    async fn fetch(&self, ids: &[u64]) -> Result<FetchResult> {
        // TODO: requires milvus query-by-id support plus a payload field
        // layout; not yet wired up against the crate's query API.
        Err(Error::unimplemented(format!("milvus fetch for {} ids", ids.len())))
    }

    async fn delete(&self, ids: &[u64]) -> Result<()> {
        let expr = format!("id in {}", serde_json::to_string(ids)?);
        self.client
            .delete(&self.collection, &expr)
            .await
            .map_err(|e| Error::internal(format!("milvus delete failed: {e}")))?;
        Ok(())
    }

    async fn delete_by_filter(&self, _filter: &Filter) -> Result<u64> {
        Err(Error::unimplemented("milvus filter-to-expression translation"))
    }

    async fn search(
        &self,
        _query_vector: &[f32],
        _filter: Option<&Filter>,
        _limit: usize,
        _score_threshold: Option<f32>,
    ) -> Result<Vec<SearchHit>> {
        Err(Error::unimplemented("milvus ANN search (crate API pending)"))
    }

    async fn aggregate_count(&self, _filter: Option<&Filter>, _group_by: Option<&str>) -> Result<CountResult> {
        let stats = self
            .client
            .get_collection_statistics(&self.collection)
            .await
            .map_err(|e| Error::internal(format!("milvus stats failed: {e}")))?;
        Ok(CountResult::Total { _total: stats.row_count })
    }

    fn backend_name(&self) -> &'static str {
        "milvus"
    }
}
