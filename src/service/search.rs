//! Search / retrieve (component K): `find` embeds and searches directly;
//! `search` first runs an intent analyzer over the session context to
//! produce one or more typed sub-queries, then merges their results.
//!
//! Intent analyzer prompt construction and the invalid-`context_type`
//! fallback are grounded in `openviking/retrieve/intent_analyzer.py`.

use crate::domain::error::Result;
use crate::domain::ports::vector_store::{Filter, SearchHit, SharedVectorCollection};
use crate::domain::ports::{SharedEmbeddingProvider, SharedVlmProvider};
use crate::domain::ports::vlm::{complete_structured, CompletionOptions};
use crate::domain::types::Message;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

const DEFAULT_LIMIT: usize = 10;
const MAX_RECENT_MESSAGES: usize = 5;

#[derive(Debug, Clone, Serialize)]
pub struct ResultItem {
    pub uri: String,
    pub score: f32,
    pub r#abstract: String,
    pub context_type: String,
    pub meta: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Default)]
pub struct FindResult {
    pub resources: Vec<ResultItem>,
    pub memories: Vec<ResultItem>,
    pub skills: Vec<ResultItem>,
    pub total: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TypedQuery {
    pub query: String,
    #[serde(default = "default_context_type")]
    pub context_type: String,
    #[serde(default)]
    pub intent: String,
    #[serde(default = "default_priority")]
    pub priority: u8,
}

fn default_context_type() -> String {
    "resource".to_string()
}

fn default_priority() -> u8 {
    3
}

#[derive(Debug, Clone, Deserialize)]
pub struct QueryPlan {
    pub queries: Vec<TypedQuery>,
    #[serde(default)]
    pub session_context: Option<String>,
    #[serde(default)]
    pub reasoning: String,
}

const VALID_CONTEXT_TYPES: [&str; 3] = ["resource", "memory", "skill"];

pub struct SearchService {
    embedder: SharedEmbeddingProvider,
    collection: SharedVectorCollection,
    vlm: SharedVlmProvider,
}

impl SearchService {
    pub fn new(embedder: SharedEmbeddingProvider, collection: SharedVectorCollection, vlm: SharedVlmProvider) -> Self {
        Self { embedder, collection, vlm }
    }

    /// Exposes the VLM for callers outside this service (e.g. session
    /// memory extraction) that need a raw completion, not a search.
    pub fn vlm(&self) -> &dyn crate::domain::ports::vlm::VlmProvider {
        self.vlm.as_ref()
    }

    pub async fn find(
        &self,
        query: &str,
        target_uri_prefix: Option<&str>,
        limit: usize,
        score_threshold: Option<f32>,
        extra_filter: Option<Filter>,
    ) -> Result<FindResult> {
        let embedding = self.embedder.embed(query).await?;
        let Some(dense) = embedding.dense else {
            return Ok(FindResult::default());
        };

        let filter = build_filter(target_uri_prefix, extra_filter);
        let effective_limit = if limit == 0 { DEFAULT_LIMIT } else { limit };
        let hits = self.collection.search(&dense, filter.as_ref(), effective_limit, score_threshold).await?;
        Ok(group_hits(hits))
    }

    /// Runs the intent analyzer over the session context, then one `find`
    /// per generated sub-query, merging by max score per URI.
    pub async fn search(
        &self,
        current_message: &str,
        compression_summary: Option<&str>,
        recent_messages: &[Message],
        target_uri_prefix: Option<&str>,
        limit: usize,
    ) -> Result<FindResult> {
        let plan = self.analyze_intent(current_message, compression_summary, recent_messages).await?;

        let mut merged: HashMap<String, ResultItem> = HashMap::new();
        for typed_query in &plan.queries {
            let context_type = if VALID_CONTEXT_TYPES.contains(&typed_query.context_type.as_str()) {
                typed_query.context_type.as_str()
            } else {
                "resource"
            };
            let filter = Filter::Eq { field: "context_type".to_string(), value: crate::domain::ports::vector_store::FieldValue::Str(context_type.to_string()) };
            let result = self.find(&typed_query.query, target_uri_prefix, limit, None, Some(filter)).await?;
            for item in result.resources.into_iter().chain(result.memories).chain(result.skills) {
                merged
                    .entry(item.uri.clone())
                    .and_modify(|existing| {
                        if item.score > existing.score {
                            *existing = item.clone();
                        }
                    })
                    .or_insert(item);
            }
        }

        let mut found = FindResult::default();
        for item in merged.into_values() {
            match item.context_type.as_str() {
                "memory" => found.memories.push(item),
                "skill" => found.skills.push(item),
                _ => found.resources.push(item),
            }
        }
        found.total = found.resources.len() + found.memories.len() + found.skills.len();
        Ok(found)
    }

    async fn analyze_intent(&self, current_message: &str, compression_summary: Option<&str>, recent: &[Message]) -> Result<QueryPlan> {
        let prompt = build_intent_prompt(current_message, compression_summary, recent);
        let options = CompletionOptions::default();
        let plan = complete_structured::<QueryPlan>(self.vlm.as_ref(), &prompt, &options).await?;
        Ok(plan.unwrap_or_else(|| QueryPlan {
            queries: vec![TypedQuery { query: current_message.to_string(), context_type: "resource".to_string(), intent: String::new(), priority: 3 }],
            session_context: compression_summary.map(str::to_string),
            reasoning: "fallback: structured response could not be parsed".to_string(),
        }))
    }
}

const INTENT_PROMPT_TEMPLATE: &str = "Compression summary:\n{{summary}}\n\nRecent messages:\n{{recent}}\n\n\
Current message:\n{{current}}\n\n\
Respond with JSON: {\"queries\": [{\"query\": str, \"context_type\": \"resource\"|\"memory\"|\"skill\", \
\"intent\": str, \"priority\": 1-5}], \"reasoning\": str}";

/// Compression summary (or `"None"`), the last `MAX_RECENT_MESSAGES`
/// formatted as `[role]: content` (or `"None"`), and the current message
/// (or `"None"`), matching the original's prompt layout exactly.
fn build_intent_prompt(current_message: &str, compression_summary: Option<&str>, recent: &[Message]) -> String {
    let summary = compression_summary.filter(|s| !s.is_empty()).unwrap_or("None");
    let recent_slice = &recent[recent.len().saturating_sub(MAX_RECENT_MESSAGES)..];
    let recent_text = if recent_slice.is_empty() {
        "None".to_string()
    } else {
        recent_slice.iter().map(|m| format!("[{:?}]: {}", m.role, m.text_content())).collect::<Vec<_>>().join("\n")
    };
    let current = if current_message.is_empty() { "None" } else { current_message };

    let reg = handlebars::Handlebars::new();
    reg.render_template(INTENT_PROMPT_TEMPLATE, &serde_json::json!({"summary": summary, "recent": recent_text, "current": current}))
        .unwrap_or_else(|_| format!("Compression summary:\n{summary}\n\nRecent messages:\n{recent_text}\n\nCurrent message:\n{current}"))
}

fn build_filter(target_uri_prefix: Option<&str>, extra: Option<Filter>) -> Option<Filter> {
    let prefix_filter = target_uri_prefix.map(|prefix| Filter::Prefix { field: "uri".to_string(), value: prefix.to_string() });
    match (prefix_filter, extra) {
        (Some(p), Some(e)) => Some(Filter::And { clauses: vec![p, e] }),
        (Some(p), None) => Some(p),
        (None, Some(e)) => Some(e),
        (None, None) => None,
    }
}

fn group_hits(hits: Vec<SearchHit>) -> FindResult {
    let mut found = FindResult::default();
    for hit in hits {
        let item = ResultItem {
            uri: hit.record.uri.clone(),
            score: hit.score,
            r#abstract: hit.record.r#abstract.clone(),
            context_type: hit.record.context_type.clone(),
            meta: HashMap::new(),
        };
        match hit.record.context_type.as_str() {
            "memory" => found.memories.push(item),
            "skill" => found.skills.push(item),
            _ => found.resources.push(item),
        }
    }
    found.total = found.resources.len() + found.memories.len() + found.skills.len();
    found
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intent_prompt_uses_none_placeholders_when_empty() {
        let prompt = build_intent_prompt("", None, &[]);
        assert!(prompt.contains("Compression summary:\nNone"));
        assert!(prompt.contains("Recent messages:\nNone"));
        assert!(prompt.contains("Current message:\nNone"));
    }

    #[test]
    fn build_filter_combines_prefix_and_extra() {
        let extra = Filter::Eq { field: "context_type".into(), value: crate::domain::ports::vector_store::FieldValue::Str("memory".into()) };
        let filter = build_filter(Some("viking://resources/docs"), Some(extra));
        assert!(matches!(filter, Some(Filter::And { .. })));
    }
}
