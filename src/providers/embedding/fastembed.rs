//! Local, network-free embedding via `fastembed` (feature
//! `fastembed-provider`, the default provider).

use crate::domain::error::{Error, Result};
use crate::domain::ports::embedding::{EmbeddingOutput, EmbeddingProvider};
use async_trait::async_trait;
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use std::sync::{Arc, Mutex};

/// BGE-small's output dimension; kept in sync with the model loaded below.
const DEFAULT_DIMENSION: usize = 384;

pub struct FastEmbedProvider {
    model: Arc<Mutex<TextEmbedding>>,
    dimension: usize,
}

impl FastEmbedProvider {
    pub fn try_new() -> Result<Self> {
        let init = InitOptions::new(EmbeddingModel::BGESmallENV15);
        let model = TextEmbedding::try_new(init).map_err(|e| Error::embedding_failed(e.to_string()))?;
        Ok(Self { model: Arc::new(Mutex::new(model)), dimension: DEFAULT_DIMENSION })
    }
}

#[async_trait]
impl EmbeddingProvider for FastEmbedProvider {
    async fn embed(&self, text: &str) -> Result<EmbeddingOutput> {
        let mut out = self.embed_batch(std::slice::from_ref(&text.to_string())).await?;
        out.pop().ok_or_else(|| Error::embedding_failed("fastembed returned no vectors"))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<EmbeddingOutput>> {
        let model = self.model.clone();
        let texts = texts.to_vec();
        tokio::task::spawn_blocking(move || {
            let model = model.lock().expect("fastembed model mutex poisoned");
            let vectors = model.embed(texts, None).map_err(|e| Error::embedding_failed(e.to_string()))?;
            Ok(vectors.into_iter().map(|v| EmbeddingOutput { dense: Some(v), sparse: None }).collect())
        })
        .await
        .map_err(|e| Error::internal_with_cause("fastembed worker task panicked", e))?
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn provider_name(&self) -> &str {
        "fastembed"
    }
}
