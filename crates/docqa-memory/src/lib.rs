//! docqa-memory: Selective long-term memory.
//!
//! A conversation turn is classified for durable, high-signal facts
//! (user preferences and roles, org-wide learnings). Facts that clear a
//! confidence threshold are appended to target-scoped, append-only
//! journal files; everything else is discarded. The threshold comparison
//! lives in exactly one place (`MemoryJournals::maybe_write`) so the
//! write gate cannot drift between callers.

pub mod extract;
pub mod journal;

pub use extract::extract;
pub use journal::{Journal, MemoryJournals, WRITE_CONFIDENCE_THRESHOLD};

#[derive(Debug, thiserror::Error)]
pub enum MemoryError {
    /// Extraction provider unreachable or errored.
    #[error("extraction failed: {0}")]
    Extraction(anyhow::Error),
    /// A journal append could not complete. Previously written records
    /// remain intact and readable.
    #[error("memory write failed: {0}")]
    Write(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, MemoryError>;
