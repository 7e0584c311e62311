//! SQLite-backed vector storage for document chunks.
//!
//! Chunks are keyed by `(source, chunk_id)` and immutable once written;
//! re-ingesting a document deletes its chunks and inserts fresh ones.
//! The `meta` table records the embedding model and chunking parameters
//! the index was built with.

use std::path::Path;
use std::sync::Mutex;

use rusqlite::{Connection, OptionalExtension};

use crate::{IndexError, Result};

/// Meta key for the embedding model the index was built with.
pub const META_EMBEDDING_MODEL: &str = "embedding_model";
/// Meta key for the embedding vector dimensions.
pub const META_EMBEDDING_DIMENSIONS: &str = "embedding_dimensions";
/// Meta key for the chunk size used at ingest time.
pub const META_CHUNK_SIZE: &str = "chunk_size";
/// Meta key for the chunk overlap used at ingest time.
pub const META_CHUNK_OVERLAP: &str = "chunk_overlap";

/// Vector store backed by SQLite.
///
/// The connection mutex serializes writes against reads, which also makes
/// a re-ingest mutually exclusive with queries as required for concurrent
/// turns sharing one index.
pub struct IndexStore {
    conn: Mutex<Connection>,
}

/// A chunk with its embedding, as persisted in the index.
#[derive(Debug, Clone)]
pub struct IndexedChunk {
    pub source: String,
    pub chunk_id: u32,
    pub locator: String,
    pub text: String,
    pub embedding: Vec<f32>,
    pub model: String,
    pub updated_at: i64,
}

/// Per-document ingestion record.
#[derive(Debug, Clone)]
pub struct DocumentRecord {
    pub source: String,
    pub hash: String,
    pub chunk_count: usize,
    pub indexed_at: i64,
}

impl IndexStore {
    /// Open or create an index store at the given path.
    pub fn open(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(db_path)?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;

             CREATE TABLE IF NOT EXISTS meta (
                 key TEXT PRIMARY KEY,
                 value TEXT NOT NULL
             );

             CREATE TABLE IF NOT EXISTS documents (
                 source TEXT PRIMARY KEY,
                 hash TEXT NOT NULL,
                 chunk_count INTEGER NOT NULL,
                 indexed_at INTEGER NOT NULL
             );

             CREATE TABLE IF NOT EXISTS chunks (
                 source TEXT NOT NULL,
                 chunk_id INTEGER NOT NULL,
                 locator TEXT NOT NULL,
                 text TEXT NOT NULL,
                 embedding BLOB NOT NULL,
                 model TEXT NOT NULL,
                 updated_at INTEGER NOT NULL,
                 PRIMARY KEY (source, chunk_id)
             );",
        )?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an existing index store. A missing file is reported as
    /// `IndexError::Unavailable`, distinct from a valid empty result.
    pub fn open_existing(db_path: &Path) -> Result<Self> {
        if !db_path.exists() {
            return Err(IndexError::Unavailable(format!(
                "no index at {} (run ingest first)",
                db_path.display()
            )));
        }
        Self::open(db_path)
    }

    /// Get a meta value by key.
    pub fn get_meta(&self, key: &str) -> Result<Option<String>> {
        let conn = self.conn.lock().unwrap();
        let value = conn
            .query_row(
                "SELECT value FROM meta WHERE key = ?1",
                rusqlite::params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    /// Set a meta value.
    pub fn set_meta(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT OR REPLACE INTO meta (key, value) VALUES (?1, ?2)",
            rusqlite::params![key, value],
        )?;
        Ok(())
    }

    /// Insert or replace a document record.
    pub fn upsert_document(&self, doc: &DocumentRecord) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT OR REPLACE INTO documents (source, hash, chunk_count, indexed_at)
             VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![doc.source, doc.hash, doc.chunk_count as i64, doc.indexed_at],
        )?;
        Ok(())
    }

    /// Get a document record by source.
    pub fn get_document(&self, source: &str) -> Result<Option<DocumentRecord>> {
        let conn = self.conn.lock().unwrap();
        let result = conn
            .query_row(
                "SELECT source, hash, chunk_count, indexed_at FROM documents WHERE source = ?1",
                rusqlite::params![source],
                |row| {
                    Ok(DocumentRecord {
                        source: row.get(0)?,
                        hash: row.get(1)?,
                        chunk_count: row.get::<_, i64>(2)? as usize,
                        indexed_at: row.get(3)?,
                    })
                },
            )
            .optional()?;
        Ok(result)
    }

    /// Insert a chunk. Replaces any previous chunk at the same
    /// `(source, chunk_id)`.
    pub fn insert_chunk(&self, chunk: &IndexedChunk) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let embedding_bytes = embedding_to_bytes(&chunk.embedding);
        conn.execute(
            "INSERT OR REPLACE INTO chunks (source, chunk_id, locator, text, embedding, model, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            rusqlite::params![
                chunk.source,
                chunk.chunk_id,
                chunk.locator,
                chunk.text,
                embedding_bytes,
                chunk.model,
                chunk.updated_at
            ],
        )?;
        Ok(())
    }

    /// Delete all chunks for a source. Returns the number removed.
    pub fn delete_chunks_for_source(&self, source: &str) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        let count = conn.execute(
            "DELETE FROM chunks WHERE source = ?1",
            rusqlite::params![source],
        )?;
        Ok(count)
    }

    /// Delete every chunk, document record, and meta entry.
    pub fn clear(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch("DELETE FROM chunks; DELETE FROM documents; DELETE FROM meta;")?;
        Ok(())
    }

    /// Get all chunks, ordered by `(source, chunk_id)` for determinism.
    pub fn all_chunks(&self) -> Result<Vec<IndexedChunk>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT source, chunk_id, locator, text, embedding, model, updated_at
             FROM chunks ORDER BY source, chunk_id",
        )?;
        let chunks = stmt
            .query_map([], |row| {
                let embedding_bytes: Vec<u8> = row.get(4)?;
                Ok(IndexedChunk {
                    source: row.get(0)?,
                    chunk_id: row.get::<_, i64>(1)? as u32,
                    locator: row.get(2)?,
                    text: row.get(3)?,
                    embedding: bytes_to_embedding(&embedding_bytes),
                    model: row.get(5)?,
                    updated_at: row.get(6)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(chunks)
    }

    /// Total number of indexed chunks.
    pub fn chunk_count(&self) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM chunks", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
}

fn bytes_to_embedding(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}
