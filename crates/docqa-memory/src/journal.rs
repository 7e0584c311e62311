//! Append-only memory journals with atomic rename-on-write.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::NaiveDate;
use tracing::info;

use docqa_types::{MemoryCandidateFact, MemoryRecord, MemoryTarget};

use crate::Result;

/// Minimum extractor confidence for a fact to be persisted. The single,
/// centrally-enforced comparison guarding memory writes.
pub const WRITE_CONFIDENCE_THRESHOLD: f32 = 0.7;

/// One append-only journal file. Lines have the form
/// `- [YYYY-MM-DD] <summary>`; records are never mutated or deleted.
pub struct Journal {
    path: PathBuf,
    // Serializes appends so concurrent turns cannot interleave a line.
    lock: Mutex<()>,
}

impl Journal {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one record. The full journal contents plus the new line are
    /// written to a temp file in the same directory, synced, and renamed
    /// over the journal, so an interruption can never leave a truncated
    /// last line.
    pub fn append(&self, record: &MemoryRecord) -> Result<()> {
        let _guard = self.lock.lock().unwrap();

        let mut content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(e) => return Err(e.into()),
        };
        if !content.is_empty() && !content.ends_with('\n') {
            content.push('\n');
        }
        content.push_str(&format_line(record));

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let tmp_path = tmp_path_for(&self.path);
        {
            let mut file = std::fs::File::create(&tmp_path)?;
            file.write_all(content.as_bytes())?;
            file.sync_all()?;
        }
        std::fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }

    /// Read all records back. Lines that do not match the journal format
    /// are skipped; the file is the source of truth.
    pub fn records(&self) -> Result<Vec<MemoryRecord>> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(vec![]),
            Err(e) => return Err(e.into()),
        };
        Ok(content.lines().filter_map(parse_line).collect())
    }
}

/// The two durable memory stores. Independent journals; appends to one
/// never lock the other.
pub struct MemoryJournals {
    user: Journal,
    org: Journal,
}

impl MemoryJournals {
    pub fn new(user_path: impl Into<PathBuf>, org_path: impl Into<PathBuf>) -> Self {
        Self {
            user: Journal::new(user_path),
            org: Journal::new(org_path),
        }
    }

    /// The journal backing a target.
    pub fn journal(&self, target: MemoryTarget) -> &Journal {
        match target {
            MemoryTarget::User => &self.user,
            MemoryTarget::Org => &self.org,
        }
    }

    /// Apply the write gate: persist the fact iff the extractor marked it
    /// for writing and its confidence clears the threshold. Returns
    /// whether a record was appended.
    pub fn maybe_write(&self, fact: &MemoryCandidateFact) -> Result<bool> {
        if !fact.should_write || fact.confidence < WRITE_CONFIDENCE_THRESHOLD {
            return Ok(false);
        }

        let record = MemoryRecord {
            date: chrono::Local::now().date_naive(),
            summary: flatten(&fact.summary),
        };
        self.journal(fact.target).append(&record)?;
        info!(store = ?fact.target, confidence = fact.confidence, "memory record written");
        Ok(true)
    }
}

fn format_line(record: &MemoryRecord) -> String {
    format!("- [{}] {}\n", record.date.format("%Y-%m-%d"), record.summary)
}

fn parse_line(line: &str) -> Option<MemoryRecord> {
    let rest = line.strip_prefix("- [")?;
    let (date_str, rest) = rest.split_once("] ")?;
    let date = NaiveDate::parse_from_str(date_str, "%Y-%m-%d").ok()?;
    let summary = rest.trim();
    if summary.is_empty() {
        return None;
    }
    Some(MemoryRecord {
        date,
        summary: summary.to_string(),
    })
}

/// Collapse a summary onto one line so it cannot break the journal format.
fn flatten(summary: &str) -> String {
    summary.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn tmp_path_for(path: &Path) -> PathBuf {
    let mut os = path.as_os_str().to_owned();
    os.push(".tmp");
    PathBuf::from(os)
}
