//! Resource processor (component H): the ingest orchestrator. Parses a
//! source, stages its tree under `viking://temp/...`, finalizes it into
//! place, and enqueues the finalized leaves for semantic processing.
//!
//! A directory input that fails to read some of its files still finalizes
//! the rest (`openviking/utils/resource_processor.py`'s partial-success
//! rule) — only a completely empty parse is treated as an error.

use crate::domain::error::Result;
use crate::domain::ports::parser::{BuildingTree, ParseInput, ParsedNode};
use crate::domain::uri::VikingUri;
use crate::fs::VikingFs;
use crate::parse::ParserRegistry;
use crate::queue::{EmbeddingJob, QueueManager, SemanticJob, ENQUEUE_DEADLINE};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize)]
pub struct ProcessResourceOutcome {
    pub root_uri: String,
    pub node_count: usize,
    pub warnings: Vec<String>,
}

pub struct ResourceProcessor {
    registry: Arc<ParserRegistry>,
    vfs: Arc<VikingFs>,
    queues: Arc<QueueManager>,
}

impl ResourceProcessor {
    pub fn new(registry: Arc<ParserRegistry>, vfs: Arc<VikingFs>, queues: Arc<QueueManager>) -> Self {
        Self { registry, vfs, queues }
    }

    /// Five steps: parse, stage under temp, finalize into `target_base`,
    /// enqueue embeddings for every staged leaf, return the outcome.
    pub async fn process_resource(&self, input: ParseInput, target_base: &VikingUri) -> Result<ProcessResourceOutcome> {
        let tree = self.registry.parse(&input).await?;
        let warnings = extract_warnings(&tree);

        let temp_root = VikingUri::parse(&format!("viking://temp/{}", Uuid::new_v4())).expect("well-formed temp URI");
        self.stage(&temp_root, &tree.root).await?;

        let final_root = self.vfs.finalize_from_temp(&temp_root, target_base).await?;

        let mut node_count = 0;
        self.enqueue_embeddings(&final_root, &tree.root).await?;
        count_nodes(&tree.root, &mut node_count);

        Ok(ProcessResourceOutcome { root_uri: final_root.as_str().to_string(), node_count, warnings })
    }

    fn stage<'a>(&'a self, uri: &'a VikingUri, node: &'a ParsedNode) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            let content = node.content.as_deref().map(str::as_bytes);
            self.vfs.write_context(uri, content, &node.r#abstract, &node.overview, node.is_leaf).await?;
            for child in &node.children {
                let child_uri = uri.child(&child.segment);
                self.stage(&child_uri, child).await?;
            }
            Ok(())
        })
    }

    /// For each leaf node, enqueue an embedding message. For each non-leaf
    /// with non-trivial content, enqueue a semantic-processing message for
    /// overview generation instead (spec §4.H step 5).
    fn enqueue_embeddings<'a>(
        &'a self,
        uri: &'a VikingUri,
        node: &'a ParsedNode,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            if node.is_leaf {
                let text = if node.r#abstract.is_empty() { node.overview.clone() } else { node.r#abstract.clone() };
                self.queues.embedding.push_with_timeout(EmbeddingJob { uri: uri.as_str().to_string(), text }, ENQUEUE_DEADLINE).await?;
            } else {
                let seed = if node.overview.is_empty() { node.r#abstract.clone() } else { node.overview.clone() };
                if !seed.is_empty() {
                    self.queues
                        .semantic
                        .push_with_timeout(SemanticJob { uri: uri.as_str().to_string(), seed_text: seed }, ENQUEUE_DEADLINE)
                        .await?;
                }
            }
            for child in &node.children {
                let child_uri = uri.child(&child.segment);
                self.enqueue_embeddings(&child_uri, child).await?;
            }
            Ok(())
        })
    }
}

fn extract_warnings(tree: &BuildingTree) -> Vec<String> {
    tree.root
        .meta
        .get("warnings")
        .and_then(|v| v.as_array())
        .map(|arr| arr.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
        .unwrap_or_default()
}

fn count_nodes(node: &ParsedNode, count: &mut usize) {
    *count += 1;
    for child in &node.children {
        count_nodes(child, count);
    }
}
