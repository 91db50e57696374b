//! Concrete adapters for the domain's port traits.

pub mod embedding;
pub mod vector_store;
pub mod vlm;
