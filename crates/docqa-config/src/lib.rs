use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON5 parse error: {0}")]
    Json5(#[from] json5::Error),
    #[error("Config directory not found")]
    NoDirFound,
}

/// Embedding provider configuration. The same model must be used at index
/// and query time; the index records it and rejects a mismatch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    #[serde(default = "default_embedding_model")]
    pub model: String,
    #[serde(default = "default_embedding_dimensions")]
    pub dimensions: usize,
}

fn default_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}

fn default_embedding_dimensions() -> usize {
    1536
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: default_embedding_model(),
            dimensions: default_embedding_dimensions(),
        }
    }
}

/// Generation provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    #[serde(default = "default_generation_model")]
    pub model: String,
}

fn default_generation_model() -> String {
    "gpt-4o-mini".to_string()
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            model: default_generation_model(),
        }
    }
}

/// Retrieval tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Number of candidates to retrieve per query.
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    /// Minimum similarity a candidate must clear; unset means no floor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_score: Option<f32>,
}

fn default_top_k() -> usize {
    5
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            min_score: None,
        }
    }
}

/// Chunking parameters, recorded alongside the index to detect
/// re-chunking drift.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingConfig {
    /// Target chunk size in characters.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    /// Overlap between consecutive chunks in characters.
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
}

fn default_chunk_size() -> usize {
    1000
}

fn default_chunk_overlap() -> usize {
    200
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
        }
    }
}

/// Memory journal file names, resolved under the data directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    #[serde(default = "default_user_log")]
    pub user_log: String,
    #[serde(default = "default_org_log")]
    pub org_log: String,
}

fn default_user_log() -> String {
    "USER_MEMORY.md".to_string()
}

fn default_org_log() -> String {
    "ORG_MEMORY.md".to_string()
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            user_log: default_user_log(),
            org_log: default_org_log(),
        }
    }
}

/// Top-level docqa configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocqaConfig {
    /// Data directory override; defaults to the config directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub memory: MemoryConfig,
}

impl DocqaConfig {
    /// Directory holding the index and memory journals.
    pub fn data_dir(&self) -> Result<PathBuf, ConfigError> {
        match &self.data_dir {
            Some(dir) => Ok(dir.clone()),
            None => config_dir(),
        }
    }

    /// Path of the persisted vector index.
    pub fn index_path(&self) -> Result<PathBuf, ConfigError> {
        Ok(self.data_dir()?.join("index.db"))
    }

    /// Path of the user-scoped memory journal.
    pub fn user_memory_path(&self) -> Result<PathBuf, ConfigError> {
        Ok(self.data_dir()?.join(&self.memory.user_log))
    }

    /// Path of the org-scoped memory journal.
    pub fn org_memory_path(&self) -> Result<PathBuf, ConfigError> {
        Ok(self.data_dir()?.join(&self.memory.org_log))
    }
}

/// Resolve the docqa config directory (~/.docqa/).
pub fn config_dir() -> Result<PathBuf, ConfigError> {
    dirs::home_dir()
        .map(|h| h.join(".docqa"))
        .ok_or(ConfigError::NoDirFound)
}

/// Resolve the config file path (~/.docqa/config.json5).
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    Ok(config_dir()?.join("config.json5"))
}

/// Load configuration from the default path, falling back to defaults.
pub fn load_config() -> Result<DocqaConfig, ConfigError> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    let path = config_file_path()?;
    load_config_from(&path)
}

/// Load configuration from a specific path, falling back to defaults if not found.
pub fn load_config_from(path: &Path) -> Result<DocqaConfig, ConfigError> {
    if !path.exists() {
        tracing::debug!("Config file not found at {}, using defaults", path.display());
        return Ok(DocqaConfig::default());
    }

    let content = std::fs::read_to_string(path)?;
    let config: DocqaConfig = json5::from_str(&content)?;
    Ok(config)
}

/// Ensure the data directory exists.
pub fn ensure_data_dir(config: &DocqaConfig) -> Result<PathBuf, ConfigError> {
    let dir = config.data_dir()?;
    if !dir.exists() {
        std::fs::create_dir_all(&dir)?;
    }
    Ok(dir)
}

/// Save configuration to the default path.
pub fn save_config(config: &DocqaConfig) -> Result<(), ConfigError> {
    let dir = config_dir()?;
    if !dir.exists() {
        std::fs::create_dir_all(&dir)?;
    }
    let path = dir.join("config.json5");
    let content = serde_json::to_string_pretty(config)
        .map_err(|e| ConfigError::Io(std::io::Error::other(e)))?;
    std::fs::write(path, content)?;
    Ok(())
}
