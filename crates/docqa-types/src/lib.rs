use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ──────────────────── Document Types ────────────────────

/// A contiguous slice of one source document, the unit of indexing and
/// citation. `(source, chunk_id)` uniquely identifies a chunk; chunks are
/// immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    /// Originating document identifier (filename).
    pub source: String,
    /// 1-based position within the source; stable across re-indexing of
    /// the same document version.
    pub chunk_id: u32,
    /// Chunk content, non-empty.
    pub text: String,
    /// Human-readable citation anchor, e.g. "chunk 2".
    pub locator: String,
}

impl Chunk {
    /// Build a chunk, deriving the locator from its position.
    pub fn new(source: impl Into<String>, chunk_id: u32, text: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            chunk_id,
            text: text.into(),
            locator: format!("chunk {chunk_id}"),
        }
    }
}

/// A chunk surfaced by retrieval, with its relevance score and a bounded
/// display snippet. Ephemeral: created per query and discarded once the
/// answer is produced, except for the citation fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievedCandidate {
    pub source: String,
    pub chunk_id: u32,
    pub locator: String,
    pub text: String,
    /// Bounded excerpt of `text` suitable for display.
    pub snippet: String,
    /// Similarity score, higher is more relevant.
    pub score: f32,
}

/// A verifiable citation attached to an answer. Always derived from a
/// `RetrievedCandidate` that grounded the answer, never from free-text
/// model output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    pub source: String,
    pub locator: String,
    pub snippet: String,
}

impl From<&RetrievedCandidate> for Citation {
    fn from(candidate: &RetrievedCandidate) -> Self {
        Self {
            source: candidate.source.clone(),
            locator: candidate.locator.clone(),
            snippet: candidate.snippet.clone(),
        }
    }
}

// ──────────────────── Memory Types ────────────────────

/// Which durable store a fact belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MemoryTarget {
    /// User-specific facts: role, preferences, workflows.
    User,
    /// Org-wide learnings: interfaces, bottlenecks, recurring issues.
    Org,
}

/// Output of memory extraction. Transient; exists only during the
/// write-decision step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryCandidateFact {
    /// Whether the extractor judged this fact worth persisting.
    #[serde(default)]
    pub should_write: bool,
    /// Destination store.
    #[serde(default = "default_target")]
    pub target: MemoryTarget,
    /// One-line durable fact.
    #[serde(default)]
    pub summary: String,
    /// Extractor's self-assessed certainty, in [0, 1].
    #[serde(default)]
    pub confidence: f32,
}

fn default_target() -> MemoryTarget {
    MemoryTarget::User
}

/// A single line of a durable memory journal. Never mutated or deleted;
/// ordering is insertion order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryRecord {
    pub date: NaiveDate,
    pub summary: String,
}

// ──────────────────── Conversation Types ────────────────────

/// One user turn plus the assistant's reply, the input to memory
/// extraction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub user_message: String,
    pub assistant_message: String,
}
