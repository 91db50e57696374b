//! Embedding provider implementations (component E, dense/sparse half).

#[cfg(feature = "fastembed-provider")]
pub mod fastembed;
pub mod null;
pub mod openai;

#[cfg(feature = "fastembed-provider")]
pub use fastembed::FastEmbedProvider;
pub use null::NullEmbeddingProvider;
pub use openai::OpenAiEmbeddingProvider;
