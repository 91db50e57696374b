//! `POST/GET/DELETE /api/v1/sessions*` (spec §4.J): message log CRUD, commit
//! (compress → archive → extract memories → truncate), and a standalone
//! `extract` preview of the same extraction step.

use crate::domain::ports::vlm::{complete_structured, CompletionOptions};
use crate::domain::types::{Message, MemoryCategory, MessagePart, Role, ToolStatus};
use crate::domain::uri::{sanitize_segment, VikingUri};
use crate::queue::{EmbeddingJob, ENQUEUE_DEADLINE};
use crate::server::envelope::{ok, ApiResult};
use crate::service::{CommitOutcome, VikingService};
use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Serialize)]
pub struct CreateSessionResponse {
    pub session_id: String,
}

pub async fn create(State(_service): State<Arc<VikingService>>) -> ApiResult<CreateSessionResponse> {
    Ok(ok(CreateSessionResponse { session_id: Uuid::new_v4().to_string() }))
}

pub async fn list(State(service): State<Arc<VikingService>>) -> ApiResult<Vec<String>> {
    let sessions = service.sessions.sessions().await?;
    Ok(ok(sessions))
}

pub async fn get(State(service): State<Arc<VikingService>>, Path(id): Path<String>) -> ApiResult<Vec<Message>> {
    let messages = service.sessions.messages(&id).await?;
    Ok(ok(messages))
}

pub async fn delete(State(service): State<Arc<VikingService>>, Path(id): Path<String>) -> ApiResult<()> {
    service.sessions.delete(&id).await?;
    Ok(ok(()))
}

#[derive(Debug, Deserialize)]
pub struct AppendMessageRequest {
    pub role: Role,
    pub content: String,
}

pub async fn append_message(
    State(service): State<Arc<VikingService>>,
    Path(id): Path<String>,
    Json(req): Json<AppendMessageRequest>,
) -> ApiResult<Message> {
    let message = Message::new(req.role, vec![MessagePart::Text { text: req.content }]);
    service.sessions.append(&id, &message).await?;
    Ok(ok(message))
}

pub async fn commit(State(service): State<Arc<VikingService>>, Path(id): Path<String>) -> ApiResult<CommitOutcome> {
    let summary = compress_session(&service, &id).await?;
    let memories_extracted = extract_memories(&service, &id).await?.len() as u64;
    let outcome = service.sessions.commit(&id, &summary, memories_extracted).await?;
    Ok(ok(outcome))
}

const COMPRESSION_TEMPLATE: &str = "Summarize this conversation transcript into a compact archive entry an agent can \
later skim to recall what was discussed, decided, and done.\n\n{{transcript}}\n\n\
Respond with JSON: {\"summary\": str}";

#[derive(Debug, Deserialize)]
struct CompressionPlan {
    summary: String,
}

/// Produces the summary archived by `commit` (spec §4.J: "calls compressor →
/// produces a summary written to `viking://session/<id>/archive/<n>.md`"),
/// falling back to the raw transcript if the VLM call or its structured-JSON
/// parse fails.
async fn compress_session(service: &VikingService, session_id: &str) -> crate::domain::error::Result<String> {
    let messages = service.sessions.messages(session_id).await?;
    if messages.is_empty() {
        return Ok(String::new());
    }
    let transcript = messages
        .iter()
        .map(|m| format!("[{:?}]: {}", m.role, transcript_line(m)))
        .collect::<Vec<_>>()
        .join("\n");

    let reg = handlebars::Handlebars::new();
    let prompt = reg
        .render_template(COMPRESSION_TEMPLATE, &serde_json::json!({"transcript": transcript}))
        .unwrap_or_else(|_| format!("Summarize this conversation transcript.\n\n{transcript}"));

    let plan: Option<CompressionPlan> = complete_structured(service.search.vlm(), &prompt, &CompletionOptions::default()).await?;
    Ok(plan.map(|p| p.summary).unwrap_or(transcript))
}

#[derive(Debug, Serialize)]
pub struct ExtractResponse {
    pub session_id: String,
    pub memories_extracted: usize,
    pub memory_uris: Vec<String>,
}

pub async fn extract(State(service): State<Arc<VikingService>>, Path(id): Path<String>) -> ApiResult<ExtractResponse> {
    let memory_uris = extract_memories(&service, &id).await?;
    Ok(ok(ExtractResponse { session_id: id, memories_extracted: memory_uris.len(), memory_uris }))
}

#[derive(Debug, Deserialize)]
struct MemoryCandidate {
    text: String,
    category: MemoryCategory,
    confidence: f32,
}

#[derive(Debug, Deserialize)]
struct MemoryPlan {
    candidates: Vec<MemoryCandidate>,
}

const CONFIDENCE_THRESHOLD: f32 = 0.5;

/// Extracts memory candidates from a session's messages via the VLM and
/// writes each above [`CONFIDENCE_THRESHOLD`] as a new node under
/// `viking://user/memories/<category>/...` — no dedup/merge pass yet
/// (spec §4.J's nearest-neighbor merge is tracked as an open question in
/// DESIGN.md).
async fn extract_memories(service: &VikingService, session_id: &str) -> crate::domain::error::Result<Vec<String>> {
    let messages = service.sessions.messages(session_id).await?;
    if messages.is_empty() {
        return Ok(Vec::new());
    }

    let transcript = messages
        .iter()
        .map(|m| format!("[{:?}]: {}", m.role, transcript_line(m)))
        .collect::<Vec<_>>()
        .join("\n");

    const TEMPLATE: &str = "Extract durable long-term memories from this conversation transcript.\n\n{{transcript}}\n\n\
Respond with JSON: {\"candidates\": [{\"text\": str, \"category\": \
\"patterns\"|\"cases\"|\"profile\"|\"preferences\"|\"entities\"|\"events\", \"confidence\": 0.0-1.0}]}";
    let reg = handlebars::Handlebars::new();
    let prompt = reg
        .render_template(TEMPLATE, &serde_json::json!({"transcript": transcript}))
        .unwrap_or_else(|_| format!("Extract durable long-term memories from this conversation transcript.\n\n{transcript}"));

    let plan: Option<MemoryPlan> = complete_structured(service.search.vlm(), &prompt, &CompletionOptions::default()).await?;
    let Some(plan) = plan else {
        return Ok(Vec::new());
    };

    let mut written = Vec::new();
    for candidate in plan.candidates.into_iter().filter(|c| c.confidence >= CONFIDENCE_THRESHOLD) {
        let name = sanitize_segment(&candidate.text.chars().take(40).collect::<String>());
        let base = VikingUri::parse(&format!("viking://user/memories/{}/{name}", candidate.category.as_str()))?;
        let uri = service.vfs.resolve_unique_uri(&base).await?;
        service.vfs.write_context(&uri, None, &candidate.text, &candidate.text, true).await?;
        service
            .queues
            .embedding
            .push_with_timeout(EmbeddingJob { uri: uri.as_str().to_string(), text: candidate.text }, ENQUEUE_DEADLINE)
            .await?;
        written.push(uri.as_str().to_string());
    }
    Ok(written)
}

fn transcript_line(message: &Message) -> String {
    message
        .parts
        .iter()
        .map(|p| match p {
            MessagePart::Text { text } => text.clone(),
            MessagePart::ContextRef { uri, .. } => format!("[context: {uri}]"),
            MessagePart::Tool { tool_name, tool_status, .. } => format!("[tool {tool_name}: {}]", tool_status_label(*tool_status)),
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn tool_status_label(status: ToolStatus) -> &'static str {
    match status {
        ToolStatus::Pending => "pending",
        ToolStatus::Running => "running",
        ToolStatus::Completed => "completed",
        ToolStatus::Error => "error",
    }
}
