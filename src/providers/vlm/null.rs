//! Null VLM provider: echoes its prompt back, for tests and offline runs.

use crate::domain::error::Result;
use crate::domain::ports::vlm::{CompletionOptions, VlmProvider};
use async_trait::async_trait;

#[derive(Default)]
pub struct NullVlmProvider;

#[async_trait]
impl VlmProvider for NullVlmProvider {
    async fn complete(&self, prompt: &str, _options: &CompletionOptions) -> Result<String> {
        Ok(format!("{{\"echo\": {}}}", serde_json::to_string(prompt)?))
    }

    fn provider_name(&self) -> &str {
        "null"
    }
}
