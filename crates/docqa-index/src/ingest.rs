//! Incremental document ingestion: load `.txt` files, chunk, embed, index.
//!
//! Only files whose content hash changed are re-indexed. The embedding
//! model and chunking parameters are recorded in the index `meta` table
//! on first ingest and verified on every later one.

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tracing::{debug, info};

use docqa_types::Chunk;

use crate::chunking::chunk_text;
use crate::embeddings::EmbeddingProvider;
use crate::store::{
    DocumentRecord, IndexStore, IndexedChunk, META_CHUNK_OVERLAP, META_CHUNK_SIZE,
    META_EMBEDDING_DIMENSIONS, META_EMBEDDING_MODEL,
};
use crate::{IndexError, Result};

/// Chunking parameters, recorded alongside the index.
#[derive(Debug, Clone, Copy)]
pub struct ChunkingParams {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl Default for ChunkingParams {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
        }
    }
}

/// Result of an ingest pass.
#[derive(Debug, Default)]
pub struct IngestResult {
    pub files_scanned: usize,
    pub files_indexed: usize,
    pub chunks_indexed: usize,
    pub chunks_removed: usize,
}

/// Ingest all `.txt` files from a directory.
///
/// With `force`, the index is cleared and rebuilt from scratch; otherwise
/// unchanged files are skipped and drift in the embedding model or chunking
/// parameters is an error.
pub async fn ingest_dir(
    store: &IndexStore,
    provider: &dyn EmbeddingProvider,
    docs_dir: &Path,
    params: &ChunkingParams,
    force: bool,
) -> Result<IngestResult> {
    ensure_index_config(store, provider, params, force)?;

    let mut result = IngestResult::default();
    let files = collect_txt_files(docs_dir)?;
    result.files_scanned = files.len();

    for file_path in &files {
        let source = file_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let content = tokio::fs::read_to_string(file_path).await?;
        let hash = hash_content(&content);

        if !force {
            if let Some(existing) = store.get_document(&source)? {
                if existing.hash == hash {
                    debug!(source = %source, "document unchanged, skipping");
                    continue;
                }
            }
        }

        info!(source = %source, "indexing document");

        let removed = store.delete_chunks_for_source(&source)?;
        result.chunks_removed += removed;

        let chunks: Vec<Chunk> = chunk_text(&content, params.chunk_size, params.chunk_overlap)
            .into_iter()
            .enumerate()
            .map(|(i, text)| Chunk::new(source.clone(), i as u32 + 1, text))
            .collect();

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let embeddings = if texts.is_empty() {
            vec![]
        } else {
            provider
                .embed_batch(&texts)
                .await
                .map_err(IndexError::Embedding)?
        };

        let now = chrono::Utc::now().timestamp();
        for (chunk, embedding) in chunks.iter().zip(embeddings.into_iter()) {
            store.insert_chunk(&IndexedChunk {
                source: chunk.source.clone(),
                chunk_id: chunk.chunk_id,
                locator: chunk.locator.clone(),
                text: chunk.text.clone(),
                embedding,
                model: provider.model().to_string(),
                updated_at: now,
            })?;
            result.chunks_indexed += 1;
        }

        store.upsert_document(&DocumentRecord {
            source,
            hash,
            chunk_count: chunks.len(),
            indexed_at: now,
        })?;

        result.files_indexed += 1;
    }

    Ok(result)
}

/// Verify (or with `force`, reset) the recorded embedding model and
/// chunking parameters.
fn ensure_index_config(
    store: &IndexStore,
    provider: &dyn EmbeddingProvider,
    params: &ChunkingParams,
    force: bool,
) -> Result<()> {
    if force {
        store.clear()?;
    } else {
        if let Some(indexed) = store.get_meta(META_EMBEDDING_MODEL)? {
            if indexed != provider.model() {
                return Err(IndexError::EmbeddingModelMismatch {
                    indexed,
                    configured: provider.model().to_string(),
                });
            }
        }
        let recorded_size = store.get_meta(META_CHUNK_SIZE)?;
        let recorded_overlap = store.get_meta(META_CHUNK_OVERLAP)?;
        if let (Some(size), Some(overlap)) = (&recorded_size, &recorded_overlap) {
            if *size != params.chunk_size.to_string() || *overlap != params.chunk_overlap.to_string()
            {
                return Err(IndexError::ChunkingMismatch {
                    indexed: format!("size={size} overlap={overlap}"),
                    configured: format!(
                        "size={} overlap={}",
                        params.chunk_size, params.chunk_overlap
                    ),
                });
            }
        }
    }

    store.set_meta(META_EMBEDDING_MODEL, provider.model())?;
    store.set_meta(META_EMBEDDING_DIMENSIONS, &provider.dimensions().to_string())?;
    store.set_meta(META_CHUNK_SIZE, &params.chunk_size.to_string())?;
    store.set_meta(META_CHUNK_OVERLAP, &params.chunk_overlap.to_string())?;
    Ok(())
}

/// Collect `.txt` files directly under a directory, sorted by name.
fn collect_txt_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(IndexError::Unavailable(format!(
            "document directory not found: {}",
            dir.display()
        )));
    }

    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "txt") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn hash_content(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result as AnyResult;
    use async_trait::async_trait;

    struct CountingEmbedding {
        calls: std::sync::atomic::AtomicUsize,
    }

    impl CountingEmbedding {
        fn new() -> Self {
            Self {
                calls: std::sync::atomic::AtomicUsize::new(0),
            }
        }

        fn batch_calls(&self) -> usize {
            self.calls.load(std::sync::atomic::Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl EmbeddingProvider for CountingEmbedding {
        fn id(&self) -> &str {
            "fake"
        }
        fn model(&self) -> &str {
            "fake-embed-1"
        }
        fn dimensions(&self) -> usize {
            2
        }
        async fn embed_query(&self, _text: &str) -> AnyResult<Vec<f32>> {
            Ok(vec![1.0, 0.0])
        }
        async fn embed_batch(&self, texts: &[String]) -> AnyResult<Vec<Vec<f32>>> {
            self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            Ok(texts.iter().map(|_| vec![1.0, 0.0]).collect())
        }
    }

    fn setup() -> (tempfile::TempDir, IndexStore, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let store = IndexStore::open(&dir.path().join("index.db")).unwrap();
        let docs = dir.path().join("docs");
        std::fs::create_dir(&docs).unwrap();
        (dir, store, docs)
    }

    #[tokio::test]
    async fn test_ingest_assigns_per_source_chunk_ids() {
        let (_dir, store, docs) = setup();
        std::fs::write(docs.join("a.txt"), "first doc body").unwrap();
        std::fs::write(docs.join("b.txt"), "second doc body").unwrap();

        let provider = CountingEmbedding::new();
        let result = ingest_dir(&store, &provider, &docs, &ChunkingParams::default(), false)
            .await
            .unwrap();
        assert_eq!(result.files_indexed, 2);
        assert_eq!(result.chunks_indexed, 2);

        let chunks = store.all_chunks().unwrap();
        assert!(chunks.iter().all(|c| c.chunk_id == 1));
        assert_eq!(chunks[0].source, "a.txt");
        assert_eq!(chunks[0].locator, "chunk 1");
    }

    #[tokio::test]
    async fn test_unchanged_files_skipped() {
        let (_dir, store, docs) = setup();
        std::fs::write(docs.join("a.txt"), "stable content").unwrap();

        let provider = CountingEmbedding::new();
        let params = ChunkingParams::default();
        ingest_dir(&store, &provider, &docs, &params, false).await.unwrap();
        let second = ingest_dir(&store, &provider, &docs, &params, false).await.unwrap();

        assert_eq!(second.files_scanned, 1);
        assert_eq!(second.files_indexed, 0);
        assert_eq!(provider.batch_calls(), 1);
    }

    #[tokio::test]
    async fn test_changed_file_reindexed() {
        let (_dir, store, docs) = setup();
        let path = docs.join("a.txt");
        std::fs::write(&path, "original content").unwrap();

        let provider = CountingEmbedding::new();
        let params = ChunkingParams::default();
        ingest_dir(&store, &provider, &docs, &params, false).await.unwrap();

        std::fs::write(&path, "edited content").unwrap();
        let second = ingest_dir(&store, &provider, &docs, &params, false).await.unwrap();
        assert_eq!(second.files_indexed, 1);
        assert_eq!(second.chunks_removed, 1);

        let chunks = store.all_chunks().unwrap();
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].text.contains("edited"));
    }

    #[tokio::test]
    async fn test_non_txt_files_ignored() {
        let (_dir, store, docs) = setup();
        std::fs::write(docs.join("notes.md"), "markdown").unwrap();
        std::fs::write(docs.join("data.csv"), "a,b").unwrap();

        let provider = CountingEmbedding::new();
        let result = ingest_dir(&store, &provider, &docs, &ChunkingParams::default(), false)
            .await
            .unwrap();
        assert_eq!(result.files_scanned, 0);
        assert_eq!(store.chunk_count().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_chunking_drift_rejected_without_force() {
        let (_dir, store, docs) = setup();
        std::fs::write(docs.join("a.txt"), "content").unwrap();

        let provider = CountingEmbedding::new();
        let params = ChunkingParams {
            chunk_size: 1000,
            chunk_overlap: 200,
        };
        ingest_dir(&store, &provider, &docs, &params, false).await.unwrap();

        let drifted = ChunkingParams {
            chunk_size: 400,
            chunk_overlap: 50,
        };
        let result = ingest_dir(&store, &provider, &docs, &drifted, false).await;
        assert!(matches!(result, Err(IndexError::ChunkingMismatch { .. })));

        // Force rebuilds under the new parameters.
        let result = ingest_dir(&store, &provider, &docs, &drifted, true).await.unwrap();
        assert_eq!(result.files_indexed, 1);
        assert_eq!(
            store.get_meta(META_CHUNK_SIZE).unwrap().as_deref(),
            Some("400")
        );
    }

    #[tokio::test]
    async fn test_missing_dir_unavailable() {
        let (_dir, store, docs) = setup();
        let provider = CountingEmbedding::new();
        let result = ingest_dir(
            &store,
            &provider,
            &docs.join("nope"),
            &ChunkingParams::default(),
            false,
        )
        .await;
        assert!(matches!(result, Err(IndexError::Unavailable(_))));
    }
}
