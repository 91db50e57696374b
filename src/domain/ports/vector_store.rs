//! Vector collection port (component D).

use crate::domain::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Scalar values usable in a record's filterable `fields` map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

/// A single vector-collection record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorRecord {
    pub id: u64,
    pub uri: String,
    pub dense_vector: Option<Vec<f32>>,
    pub sparse_vector: Option<HashMap<String, f32>>,
    pub fields: HashMap<String, FieldValue>,
    pub created_at_ms: i64,
    pub context_type: String,
    pub user: Option<String>,
    pub session_id: Option<String>,
    pub r#abstract: String,
}

/// Recursive filter tree evaluated against a record's `fields`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum Filter {
    Eq { field: String, value: FieldValue },
    Ne { field: String, value: FieldValue },
    In { field: String, value: Vec<FieldValue> },
    Range { field: String, min: Option<FieldValue>, max: Option<FieldValue> },
    Prefix { field: String, value: String },
    And { clauses: Vec<Filter> },
    Or { clauses: Vec<Filter> },
}

impl Filter {
    /// Evaluate this filter against a record. Unknown/missing fields fail
    /// the predicate (conservative default).
    pub fn matches(&self, record: &VectorRecord) -> bool {
        match self {
            Filter::Eq { field, value } => field_value(record, field).as_ref() == Some(value),
            Filter::Ne { field, value } => field_value(record, field).as_ref() != Some(value),
            Filter::In { field, value } => {
                field_value(record, field).map(|v| value.contains(&v)).unwrap_or(false)
            }
            Filter::Range { field, min, max } => {
                let Some(FieldValue::Float(v)) = field_value(record, field).map(as_float) else {
                    return false;
                };
                let above_min = min.as_ref().map(as_float).map(|m| v >= m).unwrap_or(true);
                let below_max = max.as_ref().map(as_float).map(|m| v <= m).unwrap_or(true);
                above_min && below_max
            }
            Filter::Prefix { field, value } => {
                if field == "uri" {
                    record.uri.starts_with(value.as_str())
                } else {
                    matches!(field_value(record, field), Some(FieldValue::Str(s)) if s.starts_with(value))
                }
            }
            Filter::And { clauses } => clauses.iter().all(|c| c.matches(record)),
            Filter::Or { clauses } => clauses.iter().any(|c| c.matches(record)),
        }
    }
}

fn field_value(record: &VectorRecord, field: &str) -> Option<FieldValue> {
    match field {
        "uri" => Some(FieldValue::Str(record.uri.clone())),
        "context_type" => Some(FieldValue::Str(record.context_type.clone())),
        "user" => record.user.clone().map(FieldValue::Str),
        "session_id" => record.session_id.clone().map(FieldValue::Str),
        "created_at" => Some(FieldValue::Float(record.created_at_ms as f64)),
        _ => record.fields.get(field).cloned(),
    }
}

fn as_float(v: &FieldValue) -> FieldValue {
    let f = match v {
        FieldValue::Str(s) => s.parse::<f64>().unwrap_or(0.0),
        FieldValue::Int(i) => *i as f64,
        FieldValue::Float(f) => *f,
        FieldValue::Bool(b) => {
            if *b {
                1.0
            } else {
                0.0
            }
        }
    };
    FieldValue::Float(f)
}

/// A single scored hit from [`VectorCollectionProvider::search`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub record: VectorRecord,
    pub score: f32,
}

/// Result of [`VectorCollectionProvider::fetch`].
#[derive(Debug, Clone, Default)]
pub struct FetchResult {
    pub items: Vec<VectorRecord>,
    pub missing_ids: Vec<u64>,
}

/// Either a total count or a per-group-key breakdown.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CountResult {
    Total { _total: u64 },
    Grouped(HashMap<String, u64>),
}

/// Schema-typed vector collection: upsert/fetch/search/aggregate over dense
/// (and optionally sparse) vectors (component D).
#[async_trait]
pub trait VectorCollectionProvider: Send + Sync {
    /// Declared dense dimension for this collection (invariant I3).
    fn dimension(&self) -> usize;

    /// Idempotent by `id`.
    async fn upsert(&self, records: Vec<VectorRecord>) -> Result<()>;

    async fn fetch(&self, ids: &[u64]) -> Result<FetchResult>;

    async fn delete(&self, ids: &[u64]) -> Result<()>;

    async fn delete_by_filter(&self, filter: &Filter) -> Result<u64>;

    async fn search(
        &self,
        query_vector: &[f32],
        filter: Option<&Filter>,
        limit: usize,
        score_threshold: Option<f32>,
    ) -> Result<Vec<SearchHit>>;

    async fn aggregate_count(&self, filter: Option<&Filter>, group_by: Option<&str>) -> Result<CountResult>;

    fn backend_name(&self) -> &'static str;
}

/// Shared handle type used across the service.
pub type SharedVectorCollection = Arc<dyn VectorCollectionProvider>;

/// Deterministic primary key for a URI: xxhash64 of the normalized string,
/// per spec §4.D (`upsert(records): idempotent by id; primary key is a hash
/// (xxhash64 of URI)`).
pub fn uri_to_id(uri: &str) -> u64 {
    xxhash_rust::xxh64::xxh64(uri.as_bytes(), 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(uri: &str, context_type: &str) -> VectorRecord {
        VectorRecord {
            id: uri_to_id(uri),
            uri: uri.to_string(),
            dense_vector: None,
            sparse_vector: None,
            fields: HashMap::new(),
            created_at_ms: 0,
            context_type: context_type.to_string(),
            user: None,
            session_id: None,
            r#abstract: String::new(),
        }
    }

    #[test]
    fn prefix_filter_matches_uri() {
        let filter = Filter::Prefix { field: "uri".into(), value: "viking://resources/docs".into() };
        assert!(filter.matches(&record("viking://resources/docs/a", "resource")));
        assert!(!filter.matches(&record("viking://resources/other", "resource")));
    }

    #[test]
    fn and_filter_requires_all_clauses() {
        let filter = Filter::And {
            clauses: vec![
                Filter::Prefix { field: "uri".into(), value: "viking://resources".into() },
                Filter::Eq { field: "context_type".into(), value: FieldValue::Str("resource".into()) },
            ],
        };
        assert!(filter.matches(&record("viking://resources/x", "resource")));
        assert!(!filter.matches(&record("viking://resources/x", "memory")));
    }

    #[test]
    fn uri_to_id_is_deterministic() {
        assert_eq!(uri_to_id("viking://resources/a"), uri_to_id("viking://resources/a"));
    }
}
