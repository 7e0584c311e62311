//! Semantic retrieval over the vector index.

use docqa_types::RetrievedCandidate;
use tracing::debug;

use crate::embeddings::EmbeddingProvider;
use crate::store::{IndexStore, META_EMBEDDING_MODEL};
use crate::{IndexError, Result};

/// Default number of candidates per query.
pub const DEFAULT_TOP_K: usize = 5;

/// Maximum snippet length in characters.
const SNIPPET_MAX_CHARS: usize = 500;

/// Retrieve the top `k` chunks most similar to `query`.
///
/// Results are ordered by descending similarity; ties are broken by
/// ascending `(source, chunk_id)` so repeated calls on an unchanged index
/// are reproducible. An empty index, or no candidate clearing `min_score`,
/// yields an empty vector rather than an error. Read-only against the
/// store.
pub async fn retrieve(
    store: &IndexStore,
    provider: &dyn EmbeddingProvider,
    query: &str,
    k: usize,
    min_score: Option<f32>,
) -> Result<Vec<RetrievedCandidate>> {
    if k == 0 {
        return Err(IndexError::InvalidQuery("k must be >= 1".to_string()));
    }
    if query.trim().is_empty() {
        return Err(IndexError::InvalidQuery("query must be non-empty".to_string()));
    }

    // Mixing embedding models silently degrades relevance, so a recorded
    // model that differs from the configured one is a hard error.
    if let Some(indexed) = store.get_meta(META_EMBEDDING_MODEL)? {
        if indexed != provider.model() {
            return Err(IndexError::EmbeddingModelMismatch {
                indexed,
                configured: provider.model().to_string(),
            });
        }
    }

    let query_embedding = provider
        .embed_query(query)
        .await
        .map_err(IndexError::Embedding)?;

    let mut scored: Vec<RetrievedCandidate> = Vec::new();
    for chunk in store.all_chunks()? {
        let score = cosine_similarity(&query_embedding, &chunk.embedding);
        if let Some(floor) = min_score {
            if score < floor {
                continue;
            }
        }
        scored.push(RetrievedCandidate {
            snippet: make_snippet(&chunk.text),
            source: chunk.source,
            chunk_id: chunk.chunk_id,
            locator: chunk.locator,
            text: chunk.text,
            score,
        });
    }

    scored.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| a.source.cmp(&b.source))
            .then_with(|| a.chunk_id.cmp(&b.chunk_id))
    });
    scored.truncate(k);

    debug!(query_len = query.len(), candidates = scored.len(), "retrieval complete");
    Ok(scored)
}

/// Bounded display excerpt of a chunk's text: the first 500 characters,
/// trimmed, with an ellipsis when truncated.
pub fn make_snippet(text: &str) -> String {
    let trimmed = text.trim();
    let mut snippet: String = trimmed.chars().take(SNIPPET_MAX_CHARS).collect();
    if trimmed.chars().count() > SNIPPET_MAX_CHARS {
        snippet = snippet.trim_end().to_string();
        snippet.push_str("...");
    }
    snippet
}

/// Cosine similarity between two vectors. Mismatched or empty vectors
/// score zero.
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::IndexedChunk;
    use anyhow::Result as AnyResult;
    use async_trait::async_trait;

    /// Deterministic embedding fake: maps known words onto fixed axes.
    struct FakeEmbedding;

    fn axis_vector(text: &str) -> Vec<f32> {
        let lowered = text.to_lowercase();
        let mut v = vec![0.0f32; 3];
        if lowered.contains("alpha") {
            v[0] = 1.0;
        }
        if lowered.contains("beta") {
            v[1] = 1.0;
        }
        if lowered.contains("gamma") {
            v[2] = 1.0;
        }
        v
    }

    #[async_trait]
    impl EmbeddingProvider for FakeEmbedding {
        fn id(&self) -> &str {
            "fake"
        }
        fn model(&self) -> &str {
            "fake-embed-1"
        }
        fn dimensions(&self) -> usize {
            3
        }
        async fn embed_query(&self, text: &str) -> AnyResult<Vec<f32>> {
            Ok(axis_vector(text))
        }
        async fn embed_batch(&self, texts: &[String]) -> AnyResult<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|t| axis_vector(t)).collect())
        }
    }

    fn insert(store: &IndexStore, source: &str, chunk_id: u32, text: &str, embedding: Vec<f32>) {
        store
            .insert_chunk(&IndexedChunk {
                source: source.to_string(),
                chunk_id,
                locator: format!("chunk {chunk_id}"),
                text: text.to_string(),
                embedding,
                model: "fake-embed-1".to_string(),
                updated_at: 0,
            })
            .unwrap();
    }

    fn open_store() -> (tempfile::TempDir, IndexStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = IndexStore::open(&dir.path().join("index.db")).unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn test_empty_index_returns_empty() {
        let (_dir, store) = open_store();
        let results = retrieve(&store, &FakeEmbedding, "anything alpha", 5, None)
            .await
            .unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_ranks_by_similarity() {
        let (_dir, store) = open_store();
        insert(&store, "doc.txt", 1, "about beta things", vec![0.0, 1.0, 0.0]);
        insert(&store, "doc.txt", 2, "about alpha things", vec![1.0, 0.0, 0.0]);
        insert(&store, "doc.txt", 3, "about gamma things", vec![0.0, 0.0, 1.0]);

        let results = retrieve(&store, &FakeEmbedding, "tell me about alpha", 5, None)
            .await
            .unwrap();
        assert_eq!(results[0].chunk_id, 2);
        assert!(results[0].score > results[1].score);
    }

    #[tokio::test]
    async fn test_tie_break_by_source_then_chunk_id() {
        let (_dir, store) = open_store();
        // All identical embeddings: pure tie, order must be deterministic.
        insert(&store, "b.txt", 1, "alpha", vec![1.0, 0.0, 0.0]);
        insert(&store, "a.txt", 2, "alpha", vec![1.0, 0.0, 0.0]);
        insert(&store, "a.txt", 1, "alpha", vec![1.0, 0.0, 0.0]);

        for _ in 0..3 {
            let results = retrieve(&store, &FakeEmbedding, "alpha", 5, None)
                .await
                .unwrap();
            let order: Vec<(String, u32)> = results
                .iter()
                .map(|c| (c.source.clone(), c.chunk_id))
                .collect();
            assert_eq!(
                order,
                vec![
                    ("a.txt".to_string(), 1),
                    ("a.txt".to_string(), 2),
                    ("b.txt".to_string(), 1)
                ]
            );
        }
    }

    #[tokio::test]
    async fn test_truncates_to_k() {
        let (_dir, store) = open_store();
        for i in 1..=10 {
            insert(&store, "doc.txt", i, "alpha", vec![1.0, 0.0, 0.0]);
        }
        let results = retrieve(&store, &FakeEmbedding, "alpha", 4, None).await.unwrap();
        assert_eq!(results.len(), 4);
    }

    #[tokio::test]
    async fn test_min_score_floor_filters() {
        let (_dir, store) = open_store();
        insert(&store, "doc.txt", 1, "alpha", vec![1.0, 0.0, 0.0]);
        insert(&store, "doc.txt", 2, "gamma", vec![0.0, 0.0, 1.0]);

        let results = retrieve(&store, &FakeEmbedding, "alpha", 5, Some(0.5))
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].chunk_id, 1);

        // Floor above every score: valid empty result, not an error.
        let results = retrieve(&store, &FakeEmbedding, "delta", 5, Some(0.5))
            .await
            .unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_k_zero_rejected() {
        let (_dir, store) = open_store();
        let result = retrieve(&store, &FakeEmbedding, "alpha", 0, None).await;
        assert!(matches!(result, Err(IndexError::InvalidQuery(_))));
    }

    #[tokio::test]
    async fn test_embedding_model_mismatch_rejected() {
        let (_dir, store) = open_store();
        store.set_meta(META_EMBEDDING_MODEL, "some-other-model").unwrap();
        insert(&store, "doc.txt", 1, "alpha", vec![1.0, 0.0, 0.0]);

        let result = retrieve(&store, &FakeEmbedding, "alpha", 5, None).await;
        assert!(matches!(
            result,
            Err(IndexError::EmbeddingModelMismatch { .. })
        ));
    }

    #[test]
    fn test_snippet_bounded() {
        let long = "word ".repeat(200);
        let snippet = make_snippet(&long);
        assert!(snippet.ends_with("..."));
        assert!(snippet.chars().count() <= SNIPPET_MAX_CHARS + 3);

        let short = "short text";
        assert_eq!(make_snippet(short), "short text");
    }

    #[test]
    fn test_cosine_similarity_identical() {
        let a = vec![1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &a) - 1.0).abs() < 0.001);
    }

    #[test]
    fn test_cosine_similarity_orthogonal() {
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 0.001);
    }

    #[test]
    fn test_cosine_similarity_mismatched_lengths() {
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
    }
}
