//! Shared fixture: a fully-assembled, initialized `VikingService` backed by
//! a temp directory and the null embedder/VLM providers, so these tests
//! never touch the network or download a model.

use std::sync::Arc;
use tempfile::TempDir;
use vikingfs_context::infrastructure::config::AppConfig;
use vikingfs_context::service::{VikingService, VikingServiceBuilder};

pub async fn test_service() -> (Arc<VikingService>, TempDir) {
    let dir = TempDir::new().unwrap();
    let mut config = AppConfig::default();
    config.storage.agfs.root = dir.path().to_string_lossy().into_owned();
    config.embedding.provider = "null".to_string();

    let service = VikingServiceBuilder::new(config).build().await.unwrap();
    service.initialize().await.unwrap();
    (service, dir)
}
