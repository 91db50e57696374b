//! Port traits (hexagonal boundaries) implemented by `crate::providers`.

pub mod embedding;
pub mod object_store;
pub mod parser;
pub mod vector_store;
pub mod vlm;

pub use embedding::{EmbeddingOutput, EmbeddingProvider, HybridEmbeddingProvider, SharedEmbeddingProvider};
pub use object_store::{ObjectEntry, ObjectStore, SharedObjectStore};
pub use parser::{BuildingTree, ParseInput, Parser, ParsedNode};
pub use vector_store::{
    CountResult, FetchResult, Filter, FieldValue, SearchHit, SharedVectorCollection, VectorCollectionProvider,
    VectorRecord, uri_to_id,
};
pub use vlm::{CompletionOptions, SharedVlmProvider, VlmProvider, complete_structured, parse_json_from_response};
