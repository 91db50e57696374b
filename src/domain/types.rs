//! Core domain model for the context database.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`ContextNode`] | A node in the hierarchical store (L0/L1/L2) |
//! | [`ContextType`] | `resource` / `memory` / `skill` |
//! | [`UserIdentifier`] | account/user/agent triple |
//! | [`Message`] / [`MessagePart`] | session log entries |

use crate::domain::uri::VikingUri;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// `context_type` derived from the URI prefix (spec §3.2, `original_source`
/// `_derive_context_type`): substring match, not prefix match, for `memories`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContextType {
    Resource,
    Memory,
    Skill,
}

impl ContextType {
    /// Derive the context type from a node's URI, exactly as the original
    /// `Context._derive_context_type` does.
    pub fn derive(uri: &str) -> Self {
        if uri.starts_with("viking://agent/skills") {
            ContextType::Skill
        } else if uri.contains("memories") {
            ContextType::Memory
        } else {
            ContextType::Resource
        }
    }
}

/// Free-form memory category, derived from URI substructure
/// (`original_source` `_derive_category`).
pub fn derive_category(uri: &str) -> String {
    if uri.starts_with("viking://agent/memories") {
        if uri.contains("patterns") {
            return "patterns".to_string();
        }
        if uri.contains("cases") {
            return "cases".to_string();
        }
    } else if uri.starts_with("viking://user/memories") {
        if uri.contains("profile") {
            return "profile".to_string();
        }
        if uri.contains("preferences") {
            return "preferences".to_string();
        }
        if uri.contains("entities") {
            return "entities".to_string();
        }
        if uri.contains("events") {
            return "events".to_string();
        }
    }
    String::new()
}

/// Account/user/agent triple attached to user- and agent-scoped nodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentifier {
    pub account_id: String,
    pub user_id: String,
    pub agent_id: String,
}

impl UserIdentifier {
    /// Single-tenant default identity used when no caller identity is set.
    pub fn default_user() -> Self {
        Self {
            account_id: "default".to_string(),
            user_id: "default".to_string(),
            agent_id: "default".to_string(),
        }
    }
}

/// A relation edge to another URI, with a free-text reason.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Relation {
    pub uri: String,
    pub reason: String,
}

/// A node in the hierarchical context tree (spec §3.2).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextNode {
    pub id: String,
    pub uri: String,
    pub parent_uri: Option<String>,
    pub is_leaf: bool,
    /// L0 — short abstract (≤ ~256 chars).
    pub r#abstract: String,
    /// L1 — medium overview.
    pub overview: String,
    pub context_type: ContextType,
    pub category: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub active_count: u64,
    pub related_uri: Vec<Relation>,
    pub meta: HashMap<String, serde_json::Value>,
    pub session_id: Option<String>,
    pub user: Option<UserIdentifier>,
    pub vector: Option<Vec<f32>>,
    /// Text actually given to the embedder; defaults to `abstract`.
    pub vectorize_text: String,
}

impl ContextNode {
    /// Build a new node for `uri`, deriving `context_type`/`category`/`id`
    /// and defaulting `vectorize_text` to `abstract` (spec §3.2).
    pub fn new(uri: VikingUri, is_leaf: bool, r#abstract: String) -> Self {
        let uri_str = uri.as_str().to_string();
        let parent_uri = uri.parent().map(|p| p.as_str().to_string());
        let now = Utc::now();
        let context_type = ContextType::derive(&uri_str);
        let category = derive_category(&uri_str);
        Self {
            id: Uuid::new_v4().to_string(),
            vectorize_text: r#abstract.clone(),
            uri: uri_str,
            parent_uri,
            is_leaf,
            r#abstract,
            overview: String::new(),
            context_type,
            category,
            created_at: now,
            updated_at: now,
            active_count: 0,
            related_uri: Vec::new(),
            meta: HashMap::new(),
            session_id: None,
            user: None,
            vector: None,
        }
    }

    /// Record a usage event: bump `active_count`, refresh `updated_at`.
    /// `active_count` never decreases (invariant I6).
    pub fn touch(&mut self) {
        self.active_count += 1;
        self.updated_at = Utc::now();
    }
}

/// Role of a session message participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// Status of a tool invocation referenced from a session message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolStatus {
    Pending,
    Running,
    Completed,
    Error,
}

/// One part of a (possibly multi-part) session message.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessagePart {
    Text { text: String },
    ContextRef { uri: String, context_type: ContextType, r#abstract: String },
    Tool {
        tool_id: String,
        tool_name: String,
        tool_uri: Option<String>,
        skill_uri: Option<String>,
        #[serde(default)]
        tool_input: Option<serde_json::Value>,
        tool_output: serde_json::Value,
        tool_status: ToolStatus,
    },
}

/// A single entry in a session's append-only message log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub role: Role,
    pub parts: Vec<MessagePart>,
    pub created_at: DateTime<Utc>,
}

impl Message {
    pub fn new(role: Role, parts: Vec<MessagePart>) -> Self {
        Self { id: Uuid::new_v4().to_string(), role, parts, created_at: Utc::now() }
    }

    /// Concatenated text content, used for language detection and prompts.
    pub fn text_content(&self) -> String {
        self.parts
            .iter()
            .filter_map(|p| match p {
                MessagePart::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Memory candidate category (spec §4.J memory extraction).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemoryCategory {
    Patterns,
    Cases,
    Profile,
    Preferences,
    Entities,
    Events,
}

impl MemoryCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Patterns => "patterns",
            Self::Cases => "cases",
            Self::Profile => "profile",
            Self::Preferences => "preferences",
            Self::Entities => "entities",
            Self::Events => "events",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derives_skill_type_from_prefix() {
        assert_eq!(ContextType::derive("viking://agent/skills/foo"), ContextType::Skill);
    }

    #[test]
    fn derives_memory_type_from_substring() {
        assert_eq!(ContextType::derive("viking://user/memories/profile/x"), ContextType::Memory);
        assert_eq!(ContextType::derive("viking://agent/long_term_memories/x"), ContextType::Memory);
    }

    #[test]
    fn derives_resource_type_by_default() {
        assert_eq!(ContextType::derive("viking://resources/docs/readme"), ContextType::Resource);
    }

    #[test]
    fn derives_category_by_substring() {
        assert_eq!(derive_category("viking://agent/memories/patterns/a"), "patterns");
        assert_eq!(derive_category("viking://user/memories/preferences/a"), "preferences");
        assert_eq!(derive_category("viking://resources/docs/readme"), "");
    }

    #[test]
    fn touch_never_decreases_active_count() {
        let uri = VikingUri::parse("viking://resources/a").unwrap();
        let mut node = ContextNode::new(uri, true, "abstract".into());
        assert_eq!(node.active_count, 0);
        node.touch();
        node.touch();
        assert_eq!(node.active_count, 2);
        assert!(node.updated_at >= node.created_at);
    }
}
