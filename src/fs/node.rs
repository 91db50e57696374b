//! Physical layout of a context node (spec §3.2): each node's URI maps to a
//! directory holding up to four sibling files — `content` (L2, leaves
//! only), `.abstract.md` (L0), `.overview.md` (L1), `.meta.json` (the rest).

use crate::domain::error::Result;
use crate::domain::ports::object_store::SharedObjectStore;
use crate::domain::types::{ContextType, Relation, UserIdentifier, derive_category};
use crate::domain::uri::VikingUri;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

pub const CONTENT_FILE: &str = "content";
pub const ABSTRACT_FILE: &str = ".abstract.md";
pub const OVERVIEW_FILE: &str = ".overview.md";
pub const META_FILE: &str = ".meta.json";

/// Maps a [`VikingUri`] to its backend-relative directory path, e.g.
/// `viking://resources/docs/readme` → `resources/docs/readme`.
pub fn backend_path(uri: &VikingUri) -> String {
    if uri.segments().is_empty() {
        uri.scope().to_string()
    } else {
        format!("{}/{}", uri.scope(), uri.segments().join("/"))
    }
}

pub fn content_path(uri: &VikingUri) -> String {
    format!("{}/{}", backend_path(uri), CONTENT_FILE)
}

pub fn abstract_path(uri: &VikingUri) -> String {
    format!("{}/{}", backend_path(uri), ABSTRACT_FILE)
}

pub fn overview_path(uri: &VikingUri) -> String {
    format!("{}/{}", backend_path(uri), OVERVIEW_FILE)
}

pub fn meta_path(uri: &VikingUri) -> String {
    format!("{}/{}", backend_path(uri), META_FILE)
}

/// Everything about a node not held in one of the three physical sidecar
/// files or the content file itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaSidecar {
    pub id: String,
    pub is_leaf: bool,
    pub context_type: ContextType,
    pub category: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub active_count: u64,
    pub related_uri: Vec<Relation>,
    pub meta: HashMap<String, serde_json::Value>,
    pub session_id: Option<String>,
    pub user: Option<UserIdentifier>,
    pub vectorize_text: String,
}

impl MetaSidecar {
    pub fn new(uri: &VikingUri, is_leaf: bool, r#abstract: &str) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            is_leaf,
            context_type: ContextType::derive(uri.as_str()),
            category: derive_category(uri.as_str()),
            created_at: now,
            updated_at: now,
            active_count: 0,
            related_uri: Vec::new(),
            meta: HashMap::new(),
            session_id: None,
            user: None,
            vectorize_text: r#abstract.to_string(),
        }
    }

    pub fn touch(&mut self) {
        self.active_count += 1;
        self.updated_at = Utc::now();
    }
}

pub async fn read_meta(store: &SharedObjectStore, uri: &VikingUri) -> Result<MetaSidecar> {
    let bytes = store.read_bytes(&meta_path(uri)).await?;
    Ok(serde_json::from_slice(&bytes)?)
}

pub async fn write_meta(store: &SharedObjectStore, uri: &VikingUri, meta: &MetaSidecar) -> Result<()> {
    let bytes = serde_json::to_vec_pretty(meta)?;
    store.write_bytes(&meta_path(uri), &bytes).await
}

pub async fn read_sidecar_text(store: &SharedObjectStore, path: &str) -> String {
    store.read_bytes(path).await.ok().map(|b| String::from_utf8_lossy(&b).into_owned()).unwrap_or_default()
}
