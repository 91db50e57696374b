//! `POST /api/v1/pack/{export,import}` (spec §6.2): `.ovpack` is a zip with
//! a top-level `manifest.json {root_uri, exported_at, nodes:[{uri, rel_path,
//! is_leaf}]}` plus the physical sidecar bundle for every node, preserved
//! byte-for-byte (round-trip law R1). Entry-path handling mirrors the
//! archive parser's Zip-Slip guard: every path component is routed through
//! [`VikingUri::child`], which sanitizes it the same way a parsed filename
//! would be.

use crate::domain::error::{Error, Result as DomainResult};
use crate::domain::uri::VikingUri;
use crate::fs::node::{abstract_path, content_path, meta_path, overview_path};
use crate::queue::{EmbeddingJob, ENQUEUE_DEADLINE};
use crate::server::envelope::{ok, ApiResult};
use crate::service::VikingService;
use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use std::io::{Cursor, Read, Write};
use std::sync::Arc;

#[derive(Debug, Serialize, Deserialize)]
struct ManifestNode {
    uri: String,
    rel_path: String,
    is_leaf: bool,
}

#[derive(Debug, Serialize, Deserialize)]
struct Manifest {
    root_uri: String,
    exported_at: chrono::DateTime<chrono::Utc>,
    nodes: Vec<ManifestNode>,
}

#[derive(Debug, Deserialize)]
pub struct ExportRequest {
    pub uri: String,
    pub to: String,
}

#[derive(Debug, Serialize)]
pub struct ExportResponse {
    pub to: String,
    pub node_count: usize,
}

pub async fn export(State(service): State<Arc<VikingService>>, Json(req): Json<ExportRequest>) -> ApiResult<ExportResponse> {
    let root = VikingUri::parse(&req.uri)?;
    let store = service.vfs.store().clone();
    let nodes = collect_subtree(&store, &root).await?;

    let mut manifest_nodes = Vec::with_capacity(nodes.len());
    for node in &nodes {
        let is_leaf = crate::fs::node::read_meta(&store, node).await.map(|m| m.is_leaf).unwrap_or(true);
        manifest_nodes.push(ManifestNode { uri: node.as_str().to_string(), rel_path: rel_path(&root, node), is_leaf });
    }
    let manifest = Manifest { root_uri: root.as_str().to_string(), exported_at: chrono::Utc::now(), nodes: manifest_nodes };

    let mut buf = Vec::new();
    {
        let cursor = Cursor::new(&mut buf);
        let mut writer = zip::ZipWriter::new(cursor);
        let options = zip::write::SimpleFileOptions::default();

        writer.start_file("manifest.json", options).map_err(zip_err)?;
        writer.write_all(&serde_json::to_vec_pretty(&manifest)?).map_err(std::io::Error::from)?;

        for node in &nodes {
            let prefix = rel_path(&root, node);
            for (path, suffix) in [
                (meta_path(node), ".meta.json"),
                (abstract_path(node), ".abstract.md"),
                (overview_path(node), ".overview.md"),
                (content_path(node), "content"),
            ] {
                if let Ok(bytes) = store.read_bytes(&path).await {
                    let entry_name = format!("{prefix}/{suffix}");
                    writer.start_file(&entry_name, options).map_err(zip_err)?;
                    writer.write_all(&bytes).map_err(std::io::Error::from)?;
                }
            }
        }
        writer.finish().map_err(zip_err)?;
    }

    tokio::fs::write(&req.to, &buf).await?;
    Ok(ok(ExportResponse { to: req.to, node_count: nodes.len() }))
}

#[derive(Debug, Deserialize)]
pub struct ImportRequest {
    pub file_path: String,
    pub parent: String,
    #[serde(default)]
    pub force: bool,
    #[serde(default)]
    pub vectorize: bool,
}

#[derive(Debug, Serialize)]
pub struct ImportResponse {
    pub root_uri: String,
    pub node_count: usize,
}

pub async fn import(State(service): State<Arc<VikingService>>, Json(req): Json<ImportRequest>) -> ApiResult<ImportResponse> {
    let parent_base = VikingUri::parse(&req.parent)?;
    let target = if req.force { parent_base.clone() } else { service.vfs.resolve_unique_uri(&parent_base).await? };

    let bytes = tokio::fs::read(&req.file_path).await?;
    let (manifest, entries) = tokio::task::spawn_blocking(move || read_pack(&bytes)).await.map_err(|e| Error::internal(e.to_string()))??;

    let store = service.vfs.store().clone();
    for node in &manifest.nodes {
        let dest = join_rel_path(&target, &node.rel_path);
        store.mkdir(&crate::fs::node::backend_path(&dest), true).await?;

        for (suffix, path_fn) in [
            (".meta.json", meta_path as fn(&VikingUri) -> String),
            (".abstract.md", abstract_path),
            (".overview.md", overview_path),
            ("content", content_path),
        ] {
            if let Some(buf) = entries.get(&format!("{}/{suffix}", node.rel_path)) {
                store.write_bytes(&path_fn(&dest), buf).await?;
            }
        }

        if req.vectorize && node.is_leaf {
            let text = service.vfs.r#abstract(&dest).await.unwrap_or_default();
            service.queues.embedding.push_with_timeout(EmbeddingJob { uri: dest.as_str().to_string(), text }, ENQUEUE_DEADLINE).await.ok();
        }
    }

    Ok(ok(ImportResponse { root_uri: target.as_str().to_string(), node_count: manifest.nodes.len() }))
}

/// Parses the whole `.ovpack` into a manifest and a flat map of entry name
/// to bytes. Runs on a blocking thread since zip decompression is CPU work,
/// the same reasoning the archive parser uses for extraction.
fn read_pack(bytes: &[u8]) -> DomainResult<(Manifest, std::collections::HashMap<String, Vec<u8>>)> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).map_err(|e| Error::invalid_argument(format!("not a valid .ovpack: {e}")))?;

    let mut manifest = None;
    let mut entries = std::collections::HashMap::new();
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).map_err(|e| Error::processing(format!("reading .ovpack entry {i}: {e}")))?;
        if entry.is_dir() {
            continue;
        }
        let name = entry.name().to_string();
        let mut buf = Vec::new();
        entry.read_to_end(&mut buf).map_err(std::io::Error::from)?;
        if name == "manifest.json" {
            manifest = Some(serde_json::from_slice(&buf)?);
        } else {
            entries.insert(name, buf);
        }
    }
    let manifest = manifest.ok_or_else(|| Error::invalid_argument("missing manifest.json in .ovpack"))?;
    Ok((manifest, entries))
}

fn join_rel_path(parent: &VikingUri, rel_path: &str) -> VikingUri {
    let mut uri = parent.clone();
    if rel_path != "." {
        for segment in rel_path.split('/').filter(|s| !s.is_empty()) {
            uri = uri.child(segment);
        }
    }
    uri
}

fn rel_path(root: &VikingUri, node: &VikingUri) -> String {
    let suffix = &node.segments()[root.segments().len()..];
    if suffix.is_empty() {
        ".".to_string()
    } else {
        suffix.join("/")
    }
}

async fn collect_subtree(store: &crate::domain::ports::object_store::SharedObjectStore, root: &VikingUri) -> DomainResult<Vec<VikingUri>> {
    let mut out = vec![root.clone()];
    let mut stack = vec![root.clone()];
    while let Some(uri) = stack.pop() {
        if let Ok(entries) = store.list(&crate::fs::node::backend_path(&uri)).await {
            for entry in entries.into_iter().filter(|e| e.is_dir) {
                let child = uri.child(&entry.name);
                out.push(child.clone());
                stack.push(child);
            }
        }
    }
    Ok(out)
}

fn zip_err(e: zip::result::ZipError) -> std::io::Error {
    std::io::Error::other(e)
}
