//! Parser chain port (component F): source bytes → a [`BuildingTree`] of
//! context-node candidates.

use crate::domain::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One candidate node produced by a parser, prior to URI assignment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedNode {
    /// Path-like segment relative to the parse root, e.g. `"section-1"`.
    pub segment: String,
    pub is_leaf: bool,
    pub r#abstract: String,
    pub overview: String,
    pub content: Option<String>,
    pub children: Vec<ParsedNode>,
    pub meta: HashMap<String, serde_json::Value>,
}

impl ParsedNode {
    pub fn leaf(segment: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            segment: segment.into(),
            is_leaf: true,
            r#abstract: String::new(),
            overview: String::new(),
            content: Some(content.into()),
            children: Vec::new(),
            meta: HashMap::new(),
        }
    }
}

/// Root of the tree produced by a single parse operation (`original_source`
/// `BuildingTree`): a root node plus the source's declared language/mime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildingTree {
    pub root: ParsedNode,
    pub source_mime: Option<String>,
    pub source_language: Option<String>,
}

/// Input handed to a parser: either inline bytes or a location the parser
/// must fetch itself (URL, directory).
#[derive(Debug, Clone)]
pub enum ParseInput {
    Bytes { bytes: Vec<u8>, filename: Option<String> },
    Url(String),
    DirectoryPath(String),
}

/// A single step in the parser chain. Parsers are tried in registration
/// order; the first whose [`Parser::can_handle`] returns `true` wins.
#[async_trait]
pub trait Parser: Send + Sync {
    fn can_handle(&self, input: &ParseInput) -> bool;

    async fn parse(&self, input: &ParseInput) -> Result<BuildingTree>;

    fn name(&self) -> &'static str;
}
