//! Async processing queues (component G): two independent, bounded,
//! named queues — embedding and semantic processing — each with its own
//! worker pool, retry/backoff, and observability snapshot.

pub mod manager;
pub mod queue;

pub use manager::{EmbeddingJob, QueueManager, QueueName, SemanticJob};
pub use queue::{Handler, Queue, QueueError, QueueSnapshot, ENQUEUE_DEADLINE};
