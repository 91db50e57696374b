//! Vector collection provider implementations (component D).

pub mod filesystem;
#[cfg(feature = "milvus")]
pub mod milvus;

pub use filesystem::FilesystemVectorCollection;
#[cfg(feature = "milvus")]
pub use milvus::MilvusVectorCollection;
