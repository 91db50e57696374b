//! Queue manager: owns the two named queues the service depends on and
//! exposes a combined observability snapshot.

use crate::queue::queue::{Queue, QueueSnapshot};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueueName {
    Embedding,
    SemanticProcessing,
}

/// An embedding job: a node URI and the text to embed.
#[derive(Debug, Clone)]
pub struct EmbeddingJob {
    pub uri: String,
    pub text: String,
}

/// A semantic-processing job: a non-leaf node URI awaiting a VLM-generated
/// overview, seeded with the text the parser staged for it (spec §4.G:
/// "worker calls VLM with a templated prompt, writes sidecars through C,
/// then enqueues an embedding message for the new abstract/overview").
#[derive(Debug, Clone)]
pub struct SemanticJob {
    pub uri: String,
    pub seed_text: String,
}

pub struct QueueManager {
    pub embedding: Queue<EmbeddingJob>,
    pub semantic: Queue<SemanticJob>,
}

impl QueueManager {
    /// Assembles from two already-spawned queues — used when the semantic
    /// handler itself needs a handle to the embedding queue (it re-enqueues
    /// an embedding job once it's generated new sidecar text) and so must be
    /// built after the embedding queue exists, not alongside it.
    pub fn from_queues(embedding: Queue<EmbeddingJob>, semantic: Queue<SemanticJob>) -> Arc<Self> {
        Arc::new(Self { embedding, semantic })
    }

    pub async fn wait_complete(&self) {
        self.embedding.wait_processed().await;
        self.semantic.wait_processed().await;
    }

    pub async fn snapshot(&self) -> Vec<QueueSnapshot> {
        vec![self.embedding.snapshot().await, self.semantic.snapshot().await]
    }
}
