//! docqa-index: Ingestion, vector storage, and semantic retrieval.
//!
//! Provides:
//! - SQLite-backed vector storage keyed by `(source, chunk_id)`
//! - Character-window chunking with overlap
//! - Incremental document ingestion (hash-based change detection)
//! - Cosine-similarity retrieval with deterministic tie-breaking
//!
//! The index records its embedding model and chunking parameters so a
//! configuration drift is surfaced as an error instead of silently
//! degrading relevance.

pub mod chunking;
pub mod embeddings;
pub mod ingest;
pub mod retrieve;
pub mod store;

#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    /// Embedding provider unreachable or returned malformed output.
    #[error("embedding failed: {0}")]
    Embedding(anyhow::Error),
    /// Persisted index missing or unreadable. Distinct from an empty
    /// retrieval result, which is a valid outcome.
    #[error("index unavailable: {0}")]
    Unavailable(String),
    /// The index was built with a different embedding model than the one
    /// configured for this query or ingest.
    #[error("index was built with embedding model '{indexed}' but '{configured}' is configured")]
    EmbeddingModelMismatch { indexed: String, configured: String },
    /// The index was chunked with different parameters than configured.
    #[error("index was chunked with {indexed} but {configured} is configured; re-ingest with force to rebuild")]
    ChunkingMismatch { indexed: String, configured: String },
    #[error("invalid query: {0}")]
    InvalidQuery(String),
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, IndexError>;
