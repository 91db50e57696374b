//! Agent-native context database: a URI-addressed content tree with
//! pluggable storage, vector search, and an ingestion pipeline from raw
//! sources to searchable, embedded context nodes.

pub mod domain;
pub mod fs;
pub mod infrastructure;
pub mod parse;
pub mod providers;
pub mod queue;
pub mod server;
pub mod service;
