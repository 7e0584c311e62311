use std::path::Path;

use anyhow::{Context, Result};

use docqa_index::ingest::{ChunkingParams, ingest_dir};
use docqa_index::store::IndexStore;

/// Index the `.txt` documents in a directory.
pub async fn run_ingest(docs: String, force: bool) -> Result<()> {
    let config = docqa_config::load_config().unwrap_or_default();
    docqa_config::ensure_data_dir(&config)?;

    let store = IndexStore::open(&config.index_path()?)?;
    let provider = docqa_index::embeddings::auto_select_provider(Some((
        config.embedding.model.clone(),
        config.embedding.dimensions,
    )))
    .context("No embedding provider available (set OPENAI_API_KEY)")?;

    let params = ChunkingParams {
        chunk_size: config.chunking.chunk_size,
        chunk_overlap: config.chunking.chunk_overlap,
    };
    let result = ingest_dir(&store, provider.as_ref(), Path::new(&docs), &params, force).await?;

    println!(
        "Indexed {} of {} file(s): {} chunk(s) added, {} removed.",
        result.files_indexed, result.files_scanned, result.chunks_indexed, result.chunks_removed
    );

    Ok(())
}
