//! Character-window text chunking for document ingestion.

/// Split plain text into chunks of at most `max_chars` characters with
/// `overlap_chars` of trailing context carried into the next chunk.
///
/// Break points are chosen at the largest natural boundary available in
/// the back half of the window: paragraph, then line, then sentence, then
/// word. Whitespace-only chunks are dropped, so every returned chunk is
/// non-empty.
pub fn chunk_text(content: &str, max_chars: usize, overlap_chars: usize) -> Vec<String> {
    let chars: Vec<char> = content.chars().collect();
    if chars.is_empty() || max_chars == 0 {
        return vec![];
    }
    // Overlap must leave room to make progress.
    let overlap = overlap_chars.min(max_chars / 2);

    let mut chunks = Vec::new();
    let mut start = 0usize;
    while start < chars.len() {
        let window_end = (start + max_chars).min(chars.len());
        let cut = if window_end < chars.len() {
            find_break(&chars, start, window_end)
        } else {
            window_end
        };

        let text: String = chars[start..cut].iter().collect();
        let trimmed = text.trim();
        if !trimmed.is_empty() {
            chunks.push(trimmed.to_string());
        }

        if cut >= chars.len() {
            break;
        }
        start = cut.saturating_sub(overlap).max(start + 1);
    }

    chunks
}

/// Find the best break position in `chars[start..end]`, scanning backwards
/// from `end`. Only the back half of the window is considered so chunks
/// stay near the target size.
fn find_break(chars: &[char], start: usize, end: usize) -> usize {
    let floor = start + (end - start) / 2;
    let separators: [&[char]; 4] = [&['\n', '\n'], &['\n'], &['.', ' '], &[' ']];

    for sep in separators {
        if end < sep.len() {
            continue;
        }
        let mut pos = end - sep.len();
        while pos > floor {
            if chars[pos..pos + sep.len()] == *sep {
                return pos + sep.len();
            }
            pos -= 1;
        }
    }

    end
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_content_single_chunk() {
        let chunks = chunk_text("just one small paragraph", 1000, 200);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0], "just one small paragraph");
    }

    #[test]
    fn test_empty_content() {
        assert!(chunk_text("", 1000, 200).is_empty());
        assert!(chunk_text("   \n\n  ", 1000, 200).is_empty());
    }

    #[test]
    fn test_splits_at_paragraph_boundary() {
        let para = "word ".repeat(15).trim_end().to_string();
        let content = format!("{para}\n\n{para}\n\n{para}");
        let chunks = chunk_text(&content, 100, 0);
        assert!(chunks.len() >= 2);
        // No chunk straddles a paragraph break mid-word
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 100);
        }
    }

    #[test]
    fn test_overlap_carries_context() {
        let content = "alpha beta gamma delta ".repeat(20);
        let chunks = chunk_text(&content, 60, 20);
        assert!(chunks.len() > 1);
        // The second chunk re-covers part of the first chunk's tail
        let tail: String = chunks[0].chars().skip(chunks[0].chars().count() - 15).collect();
        assert!(chunks[1].contains(tail.split_whitespace().next().unwrap()));
    }

    #[test]
    fn test_unbreakable_run_still_progresses() {
        let content = "x".repeat(250);
        let chunks = chunk_text(&content, 100, 20);
        assert!(chunks.len() >= 3);
        let total: usize = chunks.iter().map(|c| c.chars().count()).sum();
        assert!(total >= 250);
    }

    #[test]
    fn test_multibyte_safe() {
        let content = "日本語のテキスト。".repeat(50);
        let chunks = chunk_text(&content, 80, 10);
        assert!(!chunks.is_empty());
        for chunk in chunks {
            assert!(chunk.chars().count() <= 80);
        }
    }
}
