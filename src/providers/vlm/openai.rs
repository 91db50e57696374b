//! OpenAI-compatible chat-completions client, used for overview/abstract
//! generation, intent analysis, and memory extraction prompts.

use crate::domain::error::{Error, Result};
use crate::domain::ports::vlm::{CompletionOptions, VlmProvider};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

const DEFAULT_MODEL: &str = "gpt-4o-mini";
const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";

pub struct OpenAiVlmProvider {
    client: Client,
    api_key: String,
    api_base: String,
    model: String,
}

impl OpenAiVlmProvider {
    pub fn new(api_key: String, api_base: Option<String>, model: Option<String>) -> Self {
        Self {
            client: Client::new(),
            api_key,
            api_base: api_base.unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
            model: model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
        }
    }
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: String,
}

#[async_trait]
impl VlmProvider for OpenAiVlmProvider {
    async fn complete(&self, prompt: &str, options: &CompletionOptions) -> Result<String> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage { role: "user", content: prompt }],
            temperature: options.temperature,
            max_tokens: options.max_tokens,
        };

        let resp = self
            .client
            .post(format!("{}/chat/completions", self.api_base.trim_end_matches('/')))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::vlm_failed(format!("request failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::vlm_failed(format!("completion endpoint returned {status}: {body}")));
        }

        let parsed: ChatResponse =
            resp.json().await.map_err(|e| Error::vlm_failed(format!("invalid response body: {e}")))?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| Error::vlm_failed("no choices in completion response"))
    }

    fn provider_name(&self) -> &str {
        "openai"
    }
}
