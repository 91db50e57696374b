//! Embedder interface (component E, dense/sparse/hybrid text→vector).

use crate::domain::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

/// Output of an embedding call: a dense vector, a sparse vector, or both.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct EmbeddingOutput {
    pub dense: Option<Vec<f32>>,
    pub sparse: Option<HashMap<String, f32>>,
}

/// Text → vector provider, with batch support.
///
/// Implementations may be dense-only, sparse-only, or hybrid; a
/// [`HybridEmbeddingProvider`] composes one dense and one sparse
/// implementation.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, text: &str) -> Result<EmbeddingOutput>;

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<EmbeddingOutput>> {
        let mut out = Vec::with_capacity(texts.len());
        for t in texts {
            out.push(self.embed(t).await?);
        }
        Ok(out)
    }

    fn dimension(&self) -> usize;

    fn provider_name(&self) -> &str;
}

/// Shared handle type used across the service.
pub type SharedEmbeddingProvider = Arc<dyn EmbeddingProvider>;

/// Combines an independent dense and sparse provider into one hybrid
/// provider, per spec §4.E ("a composite hybrid can combine one dense + one
/// sparse implementation").
pub struct HybridEmbeddingProvider {
    dense: Arc<dyn EmbeddingProvider>,
    sparse: Arc<dyn EmbeddingProvider>,
    name: String,
}

impl HybridEmbeddingProvider {
    pub fn new(dense: Arc<dyn EmbeddingProvider>, sparse: Arc<dyn EmbeddingProvider>) -> Self {
        let name = format!("hybrid({}+{})", dense.provider_name(), sparse.provider_name());
        Self { dense, sparse, name }
    }
}

#[async_trait]
impl EmbeddingProvider for HybridEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<EmbeddingOutput> {
        let dense = self.dense.embed(text).await?;
        let sparse = self.sparse.embed(text).await?;
        Ok(EmbeddingOutput { dense: dense.dense, sparse: sparse.sparse })
    }

    fn dimension(&self) -> usize {
        self.dense.dimension()
    }

    fn provider_name(&self) -> &str {
        &self.name
    }
}
