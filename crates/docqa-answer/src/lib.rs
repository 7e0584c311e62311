//! docqa-answer: Grounded question answering with verifiable citations.
//!
//! The answer is synthesized only from retrieved chunk content, and the
//! citation list is built from the retrieval output itself — never parsed
//! out of the generated prose. With no evidence, the fixed refusal string
//! is returned before any generative step runs.

use docqa_types::{Citation, RetrievedCandidate};
use docqa_llm::GenerationProvider;
use tracing::debug;

/// Fixed response when retrieval produced no grounding evidence.
pub const NO_EVIDENCE_ANSWER: &str = "I cannot find this in the uploaded documents";

const GROUNDING_SYSTEM_PROMPT: &str = "\
You are an assistant that answers questions based ONLY on the provided context from uploaded documents.

Rules:
- Answer using ONLY the information in the context. Do not use outside knowledge.
- If the context does not contain enough information to answer, reply exactly: \"I cannot find this in the uploaded documents\"
- When you use information from the context, mention its source (e.g. \"According to report.txt...\").
- Never invent facts and never cite sources that are not in the context.
- Be concise and accurate.";

/// A grounded answer with its citation list.
#[derive(Debug, Clone)]
pub struct GroundedAnswer {
    pub text: String,
    pub citations: Vec<Citation>,
}

#[derive(Debug, thiserror::Error)]
pub enum AnswerError {
    /// Generation provider error or timeout. Kept distinct from the
    /// no-evidence response so callers can tell "nothing relevant was
    /// indexed" apart from "the system broke".
    #[error("generation failed: {0}")]
    Generation(anyhow::Error),
}

/// Answer a question from the supplied candidates.
///
/// Empty candidates short-circuit to the fixed no-evidence response with
/// no citations. Otherwise the answer is generated from the candidates'
/// text and every supplied candidate becomes a citation, in relevance
/// order.
pub async fn answer(
    provider: &dyn GenerationProvider,
    question: &str,
    candidates: &[RetrievedCandidate],
) -> Result<GroundedAnswer, AnswerError> {
    if candidates.is_empty() {
        debug!("no candidates, returning no-evidence response");
        return Ok(GroundedAnswer {
            text: NO_EVIDENCE_ANSWER.to_string(),
            citations: vec![],
        });
    }

    let context = build_context(candidates);
    let user_prompt = format!(
        "Context from documents:\n\n{context}\n\n---\n\nUser question: {question}\n\n\
         Answer (grounded in the context above, or refuse if not found):"
    );

    let text = provider
        .generate(GROUNDING_SYSTEM_PROMPT, &user_prompt)
        .await
        .map_err(AnswerError::Generation)?;

    let citations = candidates.iter().map(Citation::from).collect();

    Ok(GroundedAnswer {
        text: text.trim().to_string(),
        citations,
    })
}

/// Format candidates as a numbered context block:
/// `[n] (Source: {source}, {locator})` followed by the chunk text.
fn build_context(candidates: &[RetrievedCandidate]) -> String {
    candidates
        .iter()
        .enumerate()
        .map(|(i, c)| {
            format!(
                "[{}] (Source: {}, {})\n{}",
                i + 1,
                c.source,
                c.locator,
                c.text
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n---\n\n")
}
