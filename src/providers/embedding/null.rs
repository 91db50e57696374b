//! Null embedding provider: fixed test vectors, no external dependency.

use crate::domain::error::Result;
use crate::domain::ports::embedding::{EmbeddingOutput, EmbeddingProvider};
use async_trait::async_trait;

pub struct NullEmbeddingProvider {
    dimension: usize,
}

impl NullEmbeddingProvider {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }
}

impl Default for NullEmbeddingProvider {
    fn default() -> Self {
        Self::new(128)
    }
}

#[async_trait]
impl EmbeddingProvider for NullEmbeddingProvider {
    async fn embed(&self, _text: &str) -> Result<EmbeddingOutput> {
        Ok(EmbeddingOutput { dense: Some(vec![0.1; self.dimension]), sparse: None })
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn provider_name(&self) -> &str {
        "null"
    }
}
