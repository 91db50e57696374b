//! Language-completion provider implementations (component E, VLM half).

pub mod null;
pub mod openai;

pub use null::NullVlmProvider;
pub use openai::OpenAiVlmProvider;
