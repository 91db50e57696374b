//! VLM (language completion) interface (component E).

use crate::domain::error::Result;
use async_trait::async_trait;
use regex::Regex;
use serde::de::DeserializeOwned;
use std::sync::Arc;

/// Options for a completion request.
#[derive(Debug, Clone, Default)]
pub struct CompletionOptions {
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

/// Language completion provider, used for overview/abstract generation,
/// intent analysis, and memory extraction.
#[async_trait]
pub trait VlmProvider: Send + Sync {
    async fn complete(&self, prompt: &str, options: &CompletionOptions) -> Result<String>;

    fn provider_name(&self) -> &str;
}

/// Shared handle type used across the service.
pub type SharedVlmProvider = Arc<dyn VlmProvider>;

/// Call `provider.complete` and parse the response as `T`, trying — in
/// order — direct parse, code-fence stripping, regex object extraction, and
/// a quote-repair pass. Returns `Ok(None)` only if every strategy fails
/// (spec §4.E structured-JSON variant).
pub async fn complete_structured<T: DeserializeOwned>(
    provider: &dyn VlmProvider,
    prompt: &str,
    options: &CompletionOptions,
) -> Result<Option<T>> {
    let raw = provider.complete(prompt, options).await?;
    Ok(parse_json_from_response(&raw))
}

/// Best-effort JSON extraction from a raw LLM response.
pub fn parse_json_from_response<T: DeserializeOwned>(raw: &str) -> Option<T> {
    if let Ok(v) = serde_json::from_str::<T>(raw.trim()) {
        return Some(v);
    }

    let fenced = strip_code_fence(raw);
    if fenced != raw {
        if let Ok(v) = serde_json::from_str::<T>(fenced.trim()) {
            return Some(v);
        }
    }

    if let Some(extracted) = extract_json_object(&fenced) {
        if let Ok(v) = serde_json::from_str::<T>(&extracted) {
            return Some(v);
        }
        let repaired = repair_quotes(&extracted);
        if let Ok(v) = serde_json::from_str::<T>(&repaired) {
            return Some(v);
        }
    }

    None
}

fn strip_code_fence(raw: &str) -> String {
    let trimmed = raw.trim();
    if let Some(rest) = trimmed.strip_prefix("```") {
        let rest = rest.strip_prefix("json").unwrap_or(rest);
        if let Some(end) = rest.rfind("```") {
            return rest[..end].trim().to_string();
        }
    }
    raw.to_string()
}

fn extract_json_object(raw: &str) -> Option<String> {
    let re = Regex::new(r"(?s)\{.*\}").ok()?;
    re.find(raw).map(|m| m.as_str().to_string())
}

/// Repair common single-quote / trailing-comma JSON mistakes.
fn repair_quotes(raw: &str) -> String {
    let trailing_comma = Regex::new(r",\s*([}\]])").unwrap();
    let mut s = trailing_comma.replace_all(raw, "$1").to_string();
    if !s.contains('"') && s.contains('\'') {
        s = s.replace('\'', "\"");
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Sample {
        a: i32,
    }

    #[test]
    fn parses_direct_json() {
        let out: Option<Sample> = parse_json_from_response(r#"{"a": 1}"#);
        assert_eq!(out, Some(Sample { a: 1 }));
    }

    #[test]
    fn strips_code_fence() {
        let out: Option<Sample> = parse_json_from_response("```json\n{\"a\": 2}\n```");
        assert_eq!(out, Some(Sample { a: 2 }));
    }

    #[test]
    fn extracts_object_from_prose() {
        let out: Option<Sample> = parse_json_from_response("Sure, here you go: {\"a\": 3} thanks!");
        assert_eq!(out, Some(Sample { a: 3 }));
    }

    #[test]
    fn repairs_trailing_comma() {
        let out: Option<Sample> = parse_json_from_response(r#"{"a": 4,}"#);
        assert_eq!(out, Some(Sample { a: 4 }));
    }

    #[test]
    fn returns_none_on_total_garbage() {
        let out: Option<Sample> = parse_json_from_response("not json at all");
        assert_eq!(out, None);
    }
}
