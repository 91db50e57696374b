//! Skill processor (component I): converts an MCP tool definition, or a
//! YAML-frontmattered Markdown document, into a canonical skill document,
//! staged and finalized the same way a resource is (grounded in
//! `openviking/core/mcp_converter.py`'s `inputSchema` → "## Parameters"
//! rendering rule, and spec §4.I's frontmatter shape).

use crate::domain::error::{Error, Result};
use serde_json::Value;
use std::fmt::Write as _;

/// A single MCP tool definition as received from a tool registry.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct McpToolDefinition {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "inputSchema", default)]
    pub input_schema: Option<Value>,
}

/// Renders an MCP tool definition to the Markdown body of a skill document:
/// a title, the description, and — when the tool carries `inputSchema` — a
/// "## Parameters" section with one bullet per property.
pub fn render_skill_markdown(tool: &McpToolDefinition) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# {}", tool.name);
    out.push('\n');
    if !tool.description.is_empty() {
        out.push_str(&tool.description);
        out.push('\n');
    }

    if let Some(schema) = &tool.input_schema {
        let properties = schema.get("properties").and_then(Value::as_object);
        if let Some(properties) = properties {
            let required: Vec<&str> =
                schema.get("required").and_then(Value::as_array).into_iter().flatten().filter_map(Value::as_str).collect();

            out.push_str("\n## Parameters\n\n");
            for (name, spec) in properties {
                let ty = spec.get("type").and_then(Value::as_str).unwrap_or("any");
                let desc = spec.get("description").and_then(Value::as_str).unwrap_or("");
                let marker = if required.contains(&name.as_str()) { "required" } else { "optional" };
                let _ = writeln!(out, "- `{name}` ({ty}, {marker}): {desc}");
            }
        }
    }

    out
}

/// The L0 abstract for a skill document: the tool's description, or its
/// name if no description was given.
pub fn skill_abstract(tool: &McpToolDefinition) -> String {
    if tool.description.is_empty() {
        tool.name.clone()
    } else {
        tool.description.chars().take(256).collect()
    }
}

/// A skill's YAML frontmatter (spec §4.I): `name`, `description`, and the
/// optional `allowed-tools`/`tags` lists.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SkillFrontmatter {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "allowed-tools", default, skip_serializing_if = "Option::is_none")]
    pub allowed_tools: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

/// A parsed `SKILL.md`: the frontmatter plus the Markdown body that follows
/// it.
#[derive(Debug, Clone)]
pub struct SkillDocument {
    pub frontmatter: SkillFrontmatter,
    pub body: String,
}

const FRONTMATTER_DELIMITER: &str = "---";

/// Splits a raw skill document on its leading `---`-delimited YAML
/// frontmatter block and parses it; a document with no frontmatter block is
/// treated as body-only, with `name` taken from `fallback_name` since a bare
/// string or file input carries no name of its own.
pub fn parse_skill_document(raw: &str, fallback_name: &str) -> Result<SkillDocument> {
    let trimmed = raw.trim_start();
    if let Some(rest) = trimmed.strip_prefix(FRONTMATTER_DELIMITER) {
        if let Some(end) = rest.find(FRONTMATTER_DELIMITER) {
            let yaml = &rest[..end];
            let body = rest[end + FRONTMATTER_DELIMITER.len()..].trim_start_matches('\n').to_string();
            let frontmatter: SkillFrontmatter =
                serde_yaml::from_str(yaml).map_err(|e| Error::invalid_argument(format!("invalid skill frontmatter: {e}")))?;
            return Ok(SkillDocument { frontmatter, body });
        }
    }

    Ok(SkillDocument {
        frontmatter: SkillFrontmatter { name: fallback_name.to_string(), description: String::new(), allowed_tools: None, tags: None },
        body: raw.to_string(),
    })
}

/// Renders a [`SkillDocument`] back to its canonical `---`-delimited form.
pub fn render_skill_document(doc: &SkillDocument) -> Result<String> {
    let yaml = serde_yaml::to_string(&doc.frontmatter).map_err(|e| Error::internal(format!("serializing skill frontmatter: {e}")))?;
    Ok(format!("{FRONTMATTER_DELIMITER}\n{yaml}{FRONTMATTER_DELIMITER}\n\n{}", doc.body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn renders_parameters_section_with_required_marker() {
        let tool = McpToolDefinition {
            name: "search_docs".into(),
            description: "Searches documentation".into(),
            input_schema: Some(json!({
                "properties": {
                    "query": {"type": "string", "description": "search text"},
                    "limit": {"type": "integer", "description": "max results"}
                },
                "required": ["query"]
            })),
        };

        let markdown = render_skill_markdown(&tool);
        assert!(markdown.contains("## Parameters"));
        assert!(markdown.contains("`query` (string, required): search text"));
        assert!(markdown.contains("`limit` (integer, optional): max results"));
    }

    #[test]
    fn omits_parameters_section_when_no_schema() {
        let tool = McpToolDefinition { name: "ping".into(), description: "".into(), input_schema: None };
        let markdown = render_skill_markdown(&tool);
        assert!(!markdown.contains("## Parameters"));
    }

    #[test]
    fn parses_frontmatter_and_body() {
        let raw = "---\nname: deploy-helper\ndescription: Deploys a service\ntags:\n  - ops\n---\n\n# Deploy Helper\n\nSteps here.\n";
        let doc = parse_skill_document(raw, "fallback").unwrap();
        assert_eq!(doc.frontmatter.name, "deploy-helper");
        assert_eq!(doc.frontmatter.description, "Deploys a service");
        assert_eq!(doc.frontmatter.tags, Some(vec!["ops".to_string()]));
        assert!(doc.body.contains("# Deploy Helper"));
    }

    #[test]
    fn falls_back_to_body_only_when_no_frontmatter() {
        let doc = parse_skill_document("just some raw text", "raw-skill").unwrap();
        assert_eq!(doc.frontmatter.name, "raw-skill");
        assert_eq!(doc.body, "just some raw text");
    }

    #[test]
    fn round_trips_through_render() {
        let doc = SkillDocument {
            frontmatter: SkillFrontmatter { name: "x".into(), description: "y".into(), allowed_tools: None, tags: None },
            body: "body text".into(),
        };
        let rendered = render_skill_document(&doc).unwrap();
        let reparsed = parse_skill_document(&rendered, "unused").unwrap();
        assert_eq!(reparsed.frontmatter.name, "x");
        assert_eq!(reparsed.body.trim(), "body text");
    }
}
