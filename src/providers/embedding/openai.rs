//! OpenAI-compatible embedding endpoint client (component E), grounded in
//! `openviking/models/embedder/openai_embedders.py`'s `OpenAIDenseEmbedder`.
//! Dense-only: the upstream API has no sparse-embedding mode.

use crate::domain::error::{Error, Result};
use crate::domain::ports::embedding::{EmbeddingOutput, EmbeddingProvider};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

const DEFAULT_MODEL: &str = "text-embedding-3-small";
const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";
const DEFAULT_DIMENSION: usize = 1536;

pub struct OpenAiEmbeddingProvider {
    client: Client,
    api_key: String,
    api_base: String,
    model: String,
    dimension: usize,
}

impl OpenAiEmbeddingProvider {
    pub fn new(api_key: String, api_base: Option<String>, model: Option<String>, dimension: Option<usize>) -> Self {
        Self {
            client: Client::new(),
            api_key,
            api_base: api_base.unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
            model: model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            dimension: dimension.unwrap_or(DEFAULT_DIMENSION),
        }
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    input: &'a [String],
    model: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingDatum>,
}

#[derive(Deserialize)]
struct EmbeddingDatum {
    embedding: Vec<f32>,
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<EmbeddingOutput> {
        let mut out = self.embed_batch(std::slice::from_ref(&text.to_string())).await?;
        out.pop().ok_or_else(|| Error::embedding_failed("empty response from embedding endpoint"))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<EmbeddingOutput>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let request = EmbeddingRequest { input: texts, model: &self.model, dimensions: Some(self.dimension) };
        let resp = self
            .client
            .post(format!("{}/embeddings", self.api_base.trim_end_matches('/')))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::embedding_failed(format!("request failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::embedding_failed(format!("embedding endpoint returned {status}: {body}")));
        }

        let parsed: EmbeddingResponse =
            resp.json().await.map_err(|e| Error::embedding_failed(format!("invalid response body: {e}")))?;

        Ok(parsed.data.into_iter().map(|d| EmbeddingOutput { dense: Some(d.embedding), sparse: None }).collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn provider_name(&self) -> &str {
        "openai"
    }
}
