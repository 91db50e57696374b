//! Configuration loading (spec §6.3).
//!
//! A single JSON config file, resolved in priority order: an explicit path →
//! the `VIKINGFS_CONFIG` environment variable → `~/.vikingfs/config.json`.
//! Unknown keys are ignored; a missing required key produces an actionable
//! [`Error::Config`].

use crate::domain::error::{Error, Result};
use config::{Config as ConfigBuilder, Environment, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use validator::Validate;

/// Embedded defaults, compiled into the binary so it runs from any cwd.
const DEFAULT_CONFIG_JSON: &str = include_str!("../../config/default.json");

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Static API key compared in constant time (spec §6.1 auth).
    #[serde(default)]
    pub api_key: Option<String>,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8420
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: default_host(), port: default_port(), api_key: None }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct VectorDbConfig {
    #[serde(default = "default_vectordb_backend")]
    pub backend: String,
    #[serde(default)]
    pub uri: Option<String>,
    #[serde(default)]
    pub collection: Option<String>,
}

fn default_vectordb_backend() -> String {
    "filesystem".to_string()
}

impl Default for VectorDbConfig {
    fn default() -> Self {
        Self { backend: default_vectordb_backend(), uri: None, collection: None }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AgfsConfig {
    #[serde(default = "default_agfs_backend")]
    pub backend: String,
    #[serde(default = "default_root")]
    pub root: String,
}

fn default_agfs_backend() -> String {
    "local".to_string()
}

fn default_root() -> String {
    "~/.vikingfs/data".to_string()
}

impl Default for AgfsConfig {
    fn default() -> Self {
        Self { backend: default_agfs_backend(), root: default_root() }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct StorageConfig {
    #[serde(default)]
    #[validate(nested)]
    pub vectordb: VectorDbConfig,
    #[serde(default)]
    #[validate(nested)]
    pub agfs: AgfsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct EmbeddingConfig {
    #[serde(default = "default_embedding_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
}

fn default_embedding_provider() -> String {
    "fastembed".to_string()
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self { provider: default_embedding_provider(), model: None, api_key: None, base_url: None }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct VlmConfig {
    #[serde(default = "default_vlm_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
}

fn default_vlm_provider() -> String {
    "null".to_string()
}

impl Default for VlmConfig {
    fn default() -> Self {
        Self { provider: default_vlm_provider(), model: None, api_key: None, base_url: None }
    }
}

/// Top-level configuration (spec §6.3 sections).
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AppConfig {
    #[serde(default)]
    #[validate(nested)]
    pub server: ServerConfig,
    #[serde(default)]
    #[validate(nested)]
    pub storage: StorageConfig,
    #[serde(default)]
    #[validate(nested)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    #[validate(nested)]
    pub vlm: VlmConfig,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_log_output")]
    pub log_output: String,
    #[serde(default = "default_log_format")]
    pub log_format: String,
    #[serde(default = "default_language_fallback")]
    pub language_fallback: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_output() -> String {
    "stderr".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

fn default_language_fallback() -> String {
    "en".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            storage: StorageConfig::default(),
            embedding: EmbeddingConfig::default(),
            vlm: VlmConfig::default(),
            log_level: default_log_level(),
            log_output: default_log_output(),
            log_format: default_log_format(),
            language_fallback: default_language_fallback(),
        }
    }
}

impl AppConfig {
    /// Expand `~` in `storage.agfs.root` to the user's home directory.
    pub fn agfs_root(&self) -> PathBuf {
        let raw = &self.storage.agfs.root;
        if let Some(rest) = raw.strip_prefix("~/") {
            dirs::home_dir().map(|h| h.join(rest)).unwrap_or_else(|| PathBuf::from(raw))
        } else {
            PathBuf::from(raw)
        }
    }
}

/// Loads [`AppConfig`] from embedded defaults, an optional JSON file, and
/// environment variable overrides (`VIKINGFS__SERVER__PORT`-style keys).
#[derive(Debug, Clone, Copy, Default)]
pub struct ConfigLoader;

impl ConfigLoader {
    pub fn new() -> Self {
        Self
    }

    /// Resolve the config file path: explicit path → `VIKINGFS_CONFIG` env
    /// var → `~/.vikingfs/config.json`.
    pub fn resolve_path(explicit: Option<&Path>) -> Option<PathBuf> {
        if let Some(p) = explicit {
            return Some(p.to_path_buf());
        }
        if let Ok(p) = std::env::var("VIKINGFS_CONFIG") {
            return Some(PathBuf::from(p));
        }
        dirs::home_dir().map(|h| h.join(".vikingfs").join("config.json"))
    }

    /// Load configuration, optionally overriding the resolved file path.
    pub fn load(&self, explicit_path: Option<&Path>) -> Result<AppConfig> {
        let mut builder =
            ConfigBuilder::builder().add_source(config::File::from_str(DEFAULT_CONFIG_JSON, FileFormat::Json));

        if let Some(path) = Self::resolve_path(explicit_path) {
            if path.exists() {
                builder = builder.add_source(config::File::from(path).required(false));
            }
        }

        builder = builder.add_source(Environment::with_prefix("VIKINGFS").separator("__").try_parsing(true));

        let raw = builder.build().map_err(|e| Error::config(format!("failed to build configuration: {e}")))?;

        let cfg: AppConfig =
            raw.try_deserialize().map_err(|e| Error::config(format!("failed to deserialize configuration: {e}")))?;

        cfg.validate().map_err(|e| Error::config(format!("configuration validation failed: {e}")))?;

        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_load_without_a_file() {
        let cfg = ConfigLoader::new().load(Some(Path::new("/nonexistent/path.json"))).unwrap();
        assert_eq!(cfg.server.port, 8420);
        assert_eq!(cfg.storage.vectordb.backend, "filesystem");
    }

    #[test]
    fn tilde_root_expands_to_home() {
        let cfg = AppConfig::default();
        let expanded = cfg.agfs_root();
        assert!(!expanded.to_string_lossy().starts_with('~'));
    }
}
