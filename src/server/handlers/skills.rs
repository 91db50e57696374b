//! `POST /api/v1/skills` (spec §4.I): renders a skill document — from an MCP
//! tool definition, a directory containing `SKILL.md`, a file path, or a raw
//! string — under `viking://agent/skills/<name>/`, generates its L1 overview
//! through the VLM via a fixed templated prompt, and enqueues it for
//! embedding.

use crate::domain::error::{Error, Result as DomainResult};
use crate::domain::ports::vlm::{complete_structured, CompletionOptions};
use crate::domain::uri::{sanitize_segment, VikingUri};
use crate::queue::{EmbeddingJob, ENQUEUE_DEADLINE};
use crate::server::envelope::{ok, ApiResult};
use crate::server::handlers::resources::wait_with_timeout;
use crate::service::{
    parse_skill_document, render_skill_document, render_skill_markdown, skill_abstract, McpToolDefinition, SkillDocument, VikingService,
};
use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct AddSkillRequest {
    /// A structured MCP tool definition, converted via `inputSchema` →
    /// "## Parameters" (spec §4.I).
    #[serde(default)]
    pub data: Option<McpToolDefinition>,
    /// A raw skill document string (optionally `---`-frontmattered).
    #[serde(default)]
    pub content: Option<String>,
    /// A path to either a single skill file, or a directory containing
    /// `SKILL.md` plus auxiliary files to be copied alongside it.
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub wait: bool,
    #[serde(default)]
    pub timeout: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct AddSkillResponse {
    pub root_uri: String,
    pub queue_drained: bool,
}

const SKILL_MD: &str = "SKILL.md";

pub async fn add_skill(State(service): State<Arc<VikingService>>, Json(req): Json<AddSkillRequest>) -> ApiResult<AddSkillResponse> {
    let (base_name, content_bytes, abstract_text, body, aux_dir) = if let Some(tool) = &req.data {
        let markdown = render_skill_markdown(tool);
        let abstract_text = skill_abstract(tool);
        (sanitize_segment(&tool.name), markdown.clone().into_bytes(), abstract_text, markdown, None)
    } else {
        let (raw, aux_dir) = read_raw_document(&req).await?;
        let fallback_name = aux_dir.as_deref().map(source_name).unwrap_or("skill").to_string();
        let doc = parse_skill_document(&raw, &fallback_name)?;
        let abstract_text = skill_abstract_for(&doc);
        let rendered = render_skill_document(&doc)?;
        (sanitize_segment(&doc.frontmatter.name), rendered.into_bytes(), abstract_text, doc.body, aux_dir)
    };

    let base = VikingUri::parse(&format!("viking://agent/skills/{base_name}"))?;
    let uri = service.vfs.resolve_unique_uri(&base).await?;

    let overview = generate_overview(&service, &base_name, &abstract_text, &body).await?;
    service.vfs.write_context(&uri, Some(&content_bytes), &abstract_text, &overview, true).await?;

    if let Some(dir) = &aux_dir {
        copy_auxiliary_files(&service, dir, &uri).await?;
    }

    service
        .queues
        .embedding
        .push_with_timeout(EmbeddingJob { uri: uri.as_str().to_string(), text: abstract_text }, ENQUEUE_DEADLINE)
        .await?;

    let queue_drained = if req.wait {
        wait_with_timeout(&service, req.timeout).await?;
        true
    } else {
        false
    };

    Ok(ok(AddSkillResponse { root_uri: uri.as_str().to_string(), queue_drained }))
}

/// Reads the raw skill document text for a `content`/`path` request. A
/// directory `path` reads `<path>/SKILL.md` and returns the directory so the
/// caller can copy its other files alongside the finalized skill; a file
/// `path` is read directly.
async fn read_raw_document(req: &AddSkillRequest) -> DomainResult<(String, Option<String>)> {
    if let Some(content) = &req.content {
        return Ok((content.clone(), None));
    }
    let path = req.path.as_ref().ok_or_else(|| Error::invalid_argument("add_skill requires one of data, content, or path"))?;

    let metadata = tokio::fs::metadata(path).await.map_err(|e| Error::invalid_argument(format!("cannot read {path}: {e}")))?;
    if metadata.is_dir() {
        let skill_path = format!("{}/{SKILL_MD}", path.trim_end_matches('/'));
        let text = tokio::fs::read_to_string(&skill_path).await.map_err(|e| Error::invalid_argument(format!("cannot read {skill_path}: {e}")))?;
        Ok((text, Some(path.clone())))
    } else {
        let text = tokio::fs::read_to_string(path).await.map_err(|e| Error::invalid_argument(format!("cannot read {path}: {e}")))?;
        Ok((text, None))
    }
}

fn source_name(path: &str) -> &str {
    path.trim_end_matches('/').rsplit('/').next().filter(|s| !s.is_empty()).unwrap_or(path)
}

fn skill_abstract_for(doc: &SkillDocument) -> String {
    if !doc.frontmatter.description.is_empty() {
        doc.frontmatter.description.chars().take(256).collect()
    } else {
        doc.body.chars().take(256).collect()
    }
}

/// Copies every file in `dir` other than `SKILL.md` into the finalized
/// skill's subtree, preserving relative paths (spec §4.I: "copy auxiliary
/// files preserving relative paths").
async fn copy_auxiliary_files(service: &VikingService, dir: &str, root: &VikingUri) -> DomainResult<()> {
    let mut stack = vec![(dir.to_string(), root.clone())];
    while let Some((current_dir, current_uri)) = stack.pop() {
        let mut entries =
            tokio::fs::read_dir(&current_dir).await.map_err(|e| Error::invalid_argument(format!("cannot read {current_dir}: {e}")))?;
        while let Some(entry) = entries.next_entry().await.map_err(|e| Error::invalid_argument(e.to_string()))? {
            let name = entry.file_name().to_string_lossy().into_owned();
            if current_uri.as_str() == root.as_str() && name == SKILL_MD {
                continue;
            }
            let path = entry.path();
            let child_uri = current_uri.child(&sanitize_segment(&name));
            if entry.file_type().await.map_err(|e| Error::invalid_argument(e.to_string()))?.is_dir() {
                stack.push((path.to_string_lossy().into_owned(), child_uri));
            } else {
                let bytes = tokio::fs::read(&path).await.map_err(|e| Error::invalid_argument(format!("cannot read {}: {e}", path.display())))?;
                service.vfs.write_file_bytes(&child_uri, &bytes).await?;
            }
        }
    }
    Ok(())
}

const SKILL_OVERVIEW_TEMPLATE: &str = "Write a longer overview paragraph (L1) for this skill document, to help an \
agent decide when to invoke it.\n\nName: {{name}}\nAbstract: {{abstract}}\n\nBody:\n{{body}}\n\n\
Respond with JSON: {\"overview\": str}";

#[derive(Debug, Deserialize)]
struct OverviewResponse {
    overview: String,
}

/// Generates the L1 overview through the VLM via a fixed templated prompt
/// (spec §4.I), falling back to the abstract/body text if the VLM call or
/// its structured-JSON parse fails.
async fn generate_overview(service: &VikingService, name: &str, abstract_text: &str, body: &str) -> DomainResult<String> {
    let reg = handlebars::Handlebars::new();
    let prompt = reg
        .render_template(SKILL_OVERVIEW_TEMPLATE, &serde_json::json!({"name": name, "abstract": abstract_text, "body": body}))
        .unwrap_or_else(|_| format!("Write a longer overview paragraph for this skill.\n\nName: {name}\n\nBody:\n{body}"));

    let response: Option<OverviewResponse> = complete_structured(service.search.vlm(), &prompt, &CompletionOptions::default()).await?;
    Ok(response.map(|r| r.overview).unwrap_or_else(|| if abstract_text.is_empty() { body.to_string() } else { abstract_text.to_string() }))
}
