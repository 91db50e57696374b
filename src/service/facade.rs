//! Service facade (component L): wires the ports/infrastructure/providers
//! layers into one `VikingService`, and its builder — grounded in
//! `openviking/service/viking_service.py`'s `VikingService`/`McpServerBuilder`
//! split between assembly and lifecycle.

use crate::domain::error::{Error, Result};
use crate::domain::ports::embedding::{EmbeddingOutput, EmbeddingProvider};
use crate::domain::ports::object_store::SharedObjectStore;
use crate::domain::ports::vector_store::{SharedVectorCollection, VectorRecord};
use crate::domain::ports::vlm::{complete_structured, CompletionOptions, SharedVlmProvider, VlmProvider};
use crate::domain::uri::VikingUri;
use crate::fs::VikingFs;
use crate::infrastructure::backend::local::LocalObjectStore;
use crate::infrastructure::config::AppConfig;
use crate::infrastructure::locking::PathLockManager;
use crate::infrastructure::transaction::{TransactionManager, TransactionStatus};
use crate::parse::ParserRegistry;
use crate::providers::embedding::{NullEmbeddingProvider, OpenAiEmbeddingProvider};
use crate::providers::vector_store::FilesystemVectorCollection;
use crate::providers::vlm::{NullVlmProvider, OpenAiVlmProvider};
use crate::queue::{EmbeddingJob, Queue, QueueManager, SemanticJob, ENQUEUE_DEADLINE};
use crate::service::resource_processor::ResourceProcessor;
use crate::service::search::SearchService;
use crate::service::session_service::SessionService;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, warn};

const EMBEDDING_WORKERS: usize = 4;
const SEMANTIC_WORKERS: usize = 2;

/// The assembled service: every component wired together behind one handle.
pub struct VikingService {
    pub vfs: Arc<VikingFs>,
    pub search: Arc<SearchService>,
    pub resources: Arc<ResourceProcessor>,
    pub sessions: Arc<SessionService>,
    pub queues: Arc<QueueManager>,
    txn: Arc<TransactionManager>,
    vector_collection: SharedVectorCollection,
}

impl VikingService {
    /// Roll back any transaction left dangling by a crash (spec §4.B: "on
    /// startup, any record not RELEASED triggers rollback using
    /// rollback_info"), then release its journal entry.
    pub async fn initialize(&self) -> Result<()> {
        let dangling = self.txn.recover().await?;
        for mut record in dangling {
            warn!(transaction_id = %record.id, status = ?record.status, "rolling back dangling transaction");
            if let Some(serde_json::Value::String(temp_root)) = record.rollback_info.get("temp_root") {
                if let Ok(uri) = VikingUri::parse(temp_root) {
                    self.vfs.delete_temp(&uri).await.ok();
                }
            }
            self.txn.transition(&mut record, TransactionStatus::Fail).await.ok();
            self.txn.release(&mut record).await.ok();
        }
        info!("service initialized");
        Ok(())
    }

    /// Wait for every in-flight embedding/semantic job to drain.
    pub async fn close(&self) -> Result<()> {
        self.queues.wait_complete().await;
        Ok(())
    }

    pub fn vector_collection(&self) -> &SharedVectorCollection {
        &self.vector_collection
    }

    /// Exposes the transaction journal for the observer endpoints.
    pub fn transactions(&self) -> &Arc<TransactionManager> {
        &self.txn
    }
}

/// Assembles a [`VikingService`] from an [`AppConfig`], selecting providers
/// by name the way `McpServerBuilder._build_embedder`/`_build_vlm` do.
pub struct VikingServiceBuilder {
    config: AppConfig,
}

impl VikingServiceBuilder {
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }

    pub async fn build(self) -> Result<Arc<VikingService>> {
        let store: SharedObjectStore = self.build_object_store()?;
        let locks = Arc::new(PathLockManager::new());
        let txn = Arc::new(TransactionManager::new(store.clone()));
        let vfs = Arc::new(VikingFs::new(store.clone(), locks.clone(), txn.clone()));

        let embedder: Arc<dyn EmbeddingProvider> = self.build_embedder()?;
        let vlm: SharedVlmProvider = self.build_vlm()?;
        let vector_collection: SharedVectorCollection = self.build_vector_collection(embedder.dimension()).await?;

        let registry = Arc::new(ParserRegistry::new());

        let vfs_for_embed = vfs.clone();
        let embedder_for_embed = embedder.clone();
        let collection_for_embed = vector_collection.clone();
        let embedding_handler: crate::queue::Handler<EmbeddingJob> = Arc::new(move |job: EmbeddingJob| {
            let vfs = vfs_for_embed.clone();
            let embedder = embedder_for_embed.clone();
            let collection = collection_for_embed.clone();
            Box::pin(async move { embed_and_upsert(&vfs, embedder.as_ref(), collection.as_ref(), job).await })
        });
        let embedding_queue: Queue<EmbeddingJob> = Queue::spawn("embedding", EMBEDDING_WORKERS, embedding_handler);

        let vfs_for_semantic = vfs.clone();
        let vlm_for_semantic = vlm.clone();
        let embedding_queue_for_semantic = embedding_queue.clone();
        let semantic_handler: crate::queue::Handler<SemanticJob> = Arc::new(move |job: SemanticJob| {
            let vfs = vfs_for_semantic.clone();
            let vlm = vlm_for_semantic.clone();
            let embedding_queue = embedding_queue_for_semantic.clone();
            Box::pin(async move { process_semantic_job(&vfs, vlm.as_ref(), &embedding_queue, job).await })
        });
        let semantic_queue: Queue<SemanticJob> = Queue::spawn("semantic_processing", SEMANTIC_WORKERS, semantic_handler);

        let queues = QueueManager::from_queues(embedding_queue, semantic_queue);

        let resources = Arc::new(ResourceProcessor::new(registry, vfs.clone(), queues.clone()));
        let sessions = Arc::new(SessionService::new(store.clone()));
        let search = Arc::new(SearchService::new(embedder, vector_collection.clone(), vlm));

        Ok(Arc::new(VikingService { vfs, search, resources, sessions, queues, txn, vector_collection }))
    }

    fn build_object_store(&self) -> Result<SharedObjectStore> {
        match self.config.storage.agfs.backend.as_str() {
            "local" => Ok(Arc::new(LocalObjectStore::new(self.config.agfs_root()))),
            #[cfg(feature = "s3-backend")]
            "s3" => {
                let uri = self.config.storage.vectordb.uri.clone().unwrap_or_default();
                Ok(Arc::new(crate::infrastructure::backend::s3::S3LikeObjectStore::new(uri, "vikingfs", None)))
            }
            other => Err(Error::config(format!("unknown storage.agfs.backend: {other}"))),
        }
    }

    fn build_embedder(&self) -> Result<Arc<dyn EmbeddingProvider>> {
        match self.config.embedding.provider.as_str() {
            "null" => Ok(Arc::new(NullEmbeddingProvider::default())),
            "openai" => {
                let api_key = self
                    .config
                    .embedding
                    .api_key
                    .clone()
                    .ok_or_else(|| Error::config("embedding.api_key required for provider \"openai\""))?;
                Ok(Arc::new(OpenAiEmbeddingProvider::new(
                    api_key,
                    self.config.embedding.base_url.clone(),
                    self.config.embedding.model.clone(),
                    None,
                )))
            }
            #[cfg(feature = "fastembed-provider")]
            "fastembed" => Ok(Arc::new(crate::providers::embedding::FastEmbedProvider::try_new()?)),
            other => Err(Error::config(format!("unknown embedding.provider: {other}"))),
        }
    }

    fn build_vlm(&self) -> Result<SharedVlmProvider> {
        match self.config.vlm.provider.as_str() {
            "null" => Ok(Arc::new(NullVlmProvider)),
            "openai" => {
                let api_key = self
                    .config
                    .vlm
                    .api_key
                    .clone()
                    .ok_or_else(|| Error::config("vlm.api_key required for provider \"openai\""))?;
                Ok(Arc::new(OpenAiVlmProvider::new(api_key, self.config.vlm.base_url.clone(), self.config.vlm.model.clone())))
            }
            other => Err(Error::config(format!("unknown vlm.provider: {other}"))),
        }
    }

    async fn build_vector_collection(&self, dimension: usize) -> Result<SharedVectorCollection> {
        match self.config.storage.vectordb.backend.as_str() {
            "filesystem" => {
                let path = self.config.agfs_root().join("vector_index.json");
                Ok(Arc::new(FilesystemVectorCollection::open(path, dimension).await?))
            }
            #[cfg(feature = "milvus")]
            "milvus" => {
                let uri = self
                    .config
                    .storage
                    .vectordb
                    .uri
                    .clone()
                    .ok_or_else(|| Error::config("storage.vectordb.uri required for backend \"milvus\""))?;
                let collection = self.config.storage.vectordb.collection.clone().unwrap_or_else(|| "viking".to_string());
                Ok(Arc::new(
                    crate::providers::vector_store::MilvusVectorCollection::connect(&uri, None, collection, dimension).await?,
                ))
            }
            other => Err(Error::config(format!("unknown storage.vectordb.backend: {other}"))),
        }
    }
}

const SEMANTIC_PROMPT_TEMPLATE: &str = "Write a short abstract (one or two sentences) and a longer overview \
paragraph for this directory-level content, intended to orient a reader before they look at its children.\n\n\
{{content}}\n\nRespond with JSON: {\"abstract\": str, \"overview\": str}";

#[derive(Debug, Deserialize)]
struct OverviewPlan {
    r#abstract: String,
    overview: String,
}

/// Generates L0/L1 text for a non-leaf node through a fixed templated
/// prompt, writes it back through C, then re-enqueues an embedding job for
/// the new abstract (spec §4.G semantic-processing message, §4.I's "generate
/// L1 overview through E using a fixed templated prompt" applied to
/// directory-level nodes rather than skills).
async fn process_semantic_job(
    vfs: &VikingFs,
    vlm: &dyn VlmProvider,
    embedding_queue: &Queue<EmbeddingJob>,
    job: SemanticJob,
) -> Result<()> {
    let uri = VikingUri::parse(&job.uri)?;

    let reg = handlebars::Handlebars::new();
    let prompt = reg
        .render_template(SEMANTIC_PROMPT_TEMPLATE, &serde_json::json!({"content": job.seed_text}))
        .unwrap_or_else(|_| format!("Write a short abstract and a longer overview for this content.\n\n{}", job.seed_text));

    let plan: Option<OverviewPlan> = complete_structured(vlm, &prompt, &CompletionOptions::default()).await?;
    let (abstract_text, overview_text) = match plan {
        Some(plan) => (plan.r#abstract, plan.overview),
        None => (job.seed_text.clone(), job.seed_text.clone()),
    };

    vfs.write_context(&uri, None, &abstract_text, &overview_text, false).await?;
    embedding_queue.push_with_timeout(EmbeddingJob { uri: job.uri, text: abstract_text }, ENQUEUE_DEADLINE).await
}

/// Embeds a finalized leaf's abstract and upserts it into the vector
/// collection, keyed by `uri_to_id` (spec §4.D primary-key rule).
async fn embed_and_upsert(
    vfs: &VikingFs,
    embedder: &dyn EmbeddingProvider,
    collection: &dyn crate::domain::ports::vector_store::VectorCollectionProvider,
    job: EmbeddingJob,
) -> Result<()> {
    let uri = VikingUri::parse(&job.uri)?;
    let EmbeddingOutput { dense, sparse } = embedder.embed(&job.text).await?;
    let meta = crate::fs::node::read_meta(vfs.store(), &uri).await?;

    let record = VectorRecord {
        id: crate::domain::ports::vector_store::uri_to_id(&job.uri),
        uri: job.uri.clone(),
        dense_vector: dense,
        sparse_vector: sparse,
        fields: std::collections::HashMap::new(),
        created_at_ms: meta.created_at.timestamp_millis(),
        context_type: format!("{:?}", meta.context_type).to_lowercase(),
        user: meta.user.map(|u| u.user_id),
        session_id: meta.session_id,
        r#abstract: vfs.r#abstract(&uri).await.unwrap_or_default(),
    };
    collection.upsert(vec![record]).await
}
