use anyhow::{Context, Result};

use docqa_config::DocqaConfig;
use docqa_index::retrieve::retrieve;
use docqa_index::store::IndexStore;
use docqa_llm::GenerationProvider;
use docqa_memory::MemoryJournals;
use docqa_types::{ConversationTurn, MemoryTarget};

/// Run one full turn: retrieve, answer, print, then extract memory.
pub async fn run_ask(question: String, k: Option<usize>, no_memory: bool) -> Result<()> {
    let config = docqa_config::load_config().unwrap_or_default();

    let store = IndexStore::open_existing(&config.index_path()?)?;
    let embedder = docqa_index::embeddings::auto_select_provider(Some((
        config.embedding.model.clone(),
        config.embedding.dimensions,
    )))
    .context("No embedding provider available (set OPENAI_API_KEY)")?;
    let generator = docqa_llm::auto_select_provider(Some(config.generation.model.clone()))
        .context("No generation provider available (set OPENAI_API_KEY)")?;

    let k = k.unwrap_or(config.retrieval.top_k);
    let candidates = retrieve(
        &store,
        embedder.as_ref(),
        &question,
        k,
        config.retrieval.min_score,
    )
    .await?;

    let answer = docqa_answer::answer(generator.as_ref(), &question, &candidates).await?;

    println!("{}", answer.text);
    if !answer.citations.is_empty() {
        println!("\nCitations:");
        for (i, citation) in answer.citations.iter().enumerate() {
            let snippet = display_snippet(&citation.snippet);
            println!("  {}. {} ({}): {}", i + 1, citation.source, citation.locator, snippet);
        }
    }

    // A failed extraction must not fail a turn that already answered.
    if !no_memory {
        let turn = ConversationTurn {
            user_message: question,
            assistant_message: answer.text.clone(),
        };
        match write_memory(&config, generator.as_ref(), &turn).await {
            Ok(written) => {
                for (target, summary) in written {
                    eprintln!("(memory: {target:?} <- {summary})");
                }
            }
            Err(e) => tracing::warn!("memory extraction failed: {e}"),
        }
    }

    Ok(())
}

/// Extract candidate facts from the turn and run each through the write
/// gate. Returns what was actually persisted.
async fn write_memory(
    config: &DocqaConfig,
    provider: &dyn GenerationProvider,
    turn: &ConversationTurn,
) -> Result<Vec<(MemoryTarget, String)>> {
    let journals = MemoryJournals::new(config.user_memory_path()?, config.org_memory_path()?);
    let facts = docqa_memory::extract(provider, turn).await?;

    let mut written = Vec::new();
    for fact in facts {
        if journals.maybe_write(&fact)? {
            written.push((fact.target, fact.summary));
        }
    }
    Ok(written)
}

/// Citations are shown with a shorter excerpt than the stored snippet.
fn display_snippet(snippet: &str) -> String {
    const MAX: usize = 200;
    if snippet.chars().count() <= MAX {
        return snippet.to_string();
    }
    let mut short: String = snippet.chars().take(MAX).collect();
    short = short.trim_end().to_string();
    short.push_str("...");
    short
}
