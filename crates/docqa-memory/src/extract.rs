//! Memory extraction: classify a conversation turn for durable facts.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};

use docqa_llm::GenerationProvider;
use docqa_types::{ConversationTurn, MemoryCandidateFact};

use crate::{MemoryError, Result};

const EXTRACTION_SYSTEM_PROMPT: &str = "\
You decide whether to store high-signal facts from a conversation.

Rules:
- Store ONLY reusable, high-signal facts (e.g. \"User is a Project Finance Analyst\", \"Prefers weekly summaries on Mondays\").
- Do NOT store: raw transcripts, personally identifiable information, secrets or credentials, trivial chitchat.
- Target USER for user-specific facts (role, preferences, workflows).
- Target ORG for org-wide learnings (interfaces, bottlenecks, patterns useful to colleagues).
- Be selective. Only mark should_write when confident.

Respond with a JSON object or array. Each item: {\"should_write\": true, \"target\": \"USER\"|\"ORG\", \"summary\": \"...\", \"confidence\": 0.0-1.0}
If nothing is worth storing: {\"should_write\": false}";

// Summaries that look like credentials or personal identifiers are never
// persisted, regardless of what the classifier decided.
static EXCLUSION_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)\b(password|passphrase|secret|credential|api[ _-]?key|access[ _-]?token|private[ _-]?key)\b",
        r"\bsk-[A-Za-z0-9]{16,}\b",
        r"-----BEGIN ",
        r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}",
        r"\b\d{3}-\d{2}-\d{4}\b",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

/// Extract zero or more candidate facts from a conversation turn.
///
/// Output the classifier produces that cannot be parsed yields no facts
/// rather than an error; a provider failure is `MemoryError::Extraction`.
/// Re-running extraction has no side effects.
pub async fn extract(
    provider: &dyn GenerationProvider,
    turn: &ConversationTurn,
) -> Result<Vec<MemoryCandidateFact>> {
    let user_prompt = format!(
        "Conversation excerpt:\nUser: {}\nAssistant: {}\n\n\
         Any high-signal fact to store? Output JSON only.",
        turn.user_message, turn.assistant_message
    );

    let response = provider
        .generate(EXTRACTION_SYSTEM_PROMPT, &user_prompt)
        .await
        .map_err(MemoryError::Extraction)?;

    let facts = parse_extraction(&response);
    debug!(count = facts.len(), "extraction produced candidate facts");
    Ok(facts.into_iter().map(screen).collect())
}

/// Parse the classifier output: a single JSON object or an array of them,
/// optionally wrapped in a code fence. Anything unparseable yields no
/// facts.
pub fn parse_extraction(text: &str) -> Vec<MemoryCandidateFact> {
    let text = strip_code_fence(text.trim());

    let value: serde_json::Value = match serde_json::from_str(text) {
        Ok(value) => value,
        Err(_) => {
            debug!("extraction output was not valid JSON, storing nothing");
            return vec![];
        }
    };

    let items = match value {
        serde_json::Value::Array(items) => items,
        obj @ serde_json::Value::Object(_) => vec![obj],
        _ => return vec![],
    };

    items
        .into_iter()
        .filter_map(|item| serde_json::from_value::<MemoryCandidateFact>(item).ok())
        .map(normalize)
        .collect()
}

/// Clamp confidence into [0, 1] and drop writes with an empty summary.
fn normalize(mut fact: MemoryCandidateFact) -> MemoryCandidateFact {
    fact.confidence = fact.confidence.clamp(0.0, 1.0);
    if fact.summary.trim().is_empty() {
        fact.should_write = false;
    }
    fact
}

/// Deterministic exclusion screen in front of the write gate: a summary
/// matching a credential or PII shape is forced to `should_write = false`.
fn screen(mut fact: MemoryCandidateFact) -> MemoryCandidateFact {
    if !fact.should_write {
        return fact;
    }
    if EXCLUSION_PATTERNS.iter().any(|re| re.is_match(&fact.summary)) {
        warn!("excluded a candidate fact matching a sensitive pattern");
        fact.should_write = false;
    }
    fact
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    // Skip an optional language tag on the opening fence.
    let rest = match rest.split_once('\n') {
        Some((_lang, body)) => body,
        None => rest,
    };
    rest.strip_suffix("```").map(str::trim).unwrap_or(text)
}
