//! Boundary-seeking text chunker.
//!
//! Splits extracted document text into overlapping segments for embedding.
//! Windows are `chunk_size` characters; each window end is pulled back to the
//! nearest paragraph, sentence, newline or whitespace boundary in the tail of
//! the window, and the next window starts `chunk_overlap` characters before
//! the adjusted end. Consecutive chunks therefore always share exactly
//! `chunk_overlap` characters, so context spanning a boundary is never lost
//! to retrieval.

use serde::{Deserialize, Serialize};

use crate::core::errors::ChatError;

/// Configuration for the chunker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkerConfig {
    /// Maximum chunk size in characters
    pub chunk_size: usize,
    /// Overlap between consecutive chunks
    pub chunk_overlap: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
        }
    }
}

/// A text segment with source attribution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentChunk {
    /// The text content
    pub text: String,
    /// Aggregated document-name label shared by the whole ingestion batch
    pub source_label: String,
    /// Character offset in the joined document text
    pub start_offset: usize,
    /// Chunk position within the batch
    pub chunk_index: usize,
}

/// Split `raw_text` into ordered overlapping chunks.
///
/// Every emitted chunk carries the same `source_label`. Empty or
/// whitespace-only input yields [`ChatError::EmptyInput`].
pub fn chunk(
    raw_text: &str,
    source_label: &str,
    config: &ChunkerConfig,
) -> Result<Vec<DocumentChunk>, ChatError> {
    if raw_text.trim().is_empty() {
        return Err(ChatError::EmptyInput);
    }

    let chars: Vec<char> = raw_text.chars().collect();
    let size = config.chunk_size.max(1);
    let overlap = config.chunk_overlap.min(size.saturating_sub(1));

    let mut chunks = Vec::new();
    let mut start = 0;
    let mut chunk_index = 0;

    loop {
        let hard_end = (start + size).min(chars.len());
        let end = if hard_end < chars.len() {
            seek_boundary(&chars, start, hard_end)
        } else {
            hard_end
        };

        chunks.push(DocumentChunk {
            text: chars[start..end].iter().collect(),
            source_label: source_label.to_string(),
            start_offset: start,
            chunk_index,
        });
        chunk_index += 1;

        if end >= chars.len() {
            break;
        }

        let next = end.saturating_sub(overlap);
        start = if next > start { next } else { start + 1 };
    }

    Ok(chunks)
}

/// Find a good boundary in the last 20% of the window: paragraph break first,
/// then sentence ending, then newline, then whitespace. Falls back to the raw
/// character offset when none is found.
fn seek_boundary(chars: &[char], start: usize, end: usize) -> usize {
    let window = end - start;
    let search_from = start + window * 4 / 5;

    if let Some(cut) = rfind_pair(chars, search_from, end, '\n', '\n') {
        return cut;
    }

    for (a, b) in [
        ('.', ' '),
        ('!', ' '),
        ('?', ' '),
        ('.', '\n'),
        ('!', '\n'),
        ('?', '\n'),
    ] {
        if let Some(cut) = rfind_pair(chars, search_from, end, a, b) {
            return cut;
        }
    }

    if let Some(cut) = rfind_char(chars, search_from, end, '\n') {
        return cut;
    }
    if let Some(cut) = rfind_char(chars, search_from, end, ' ') {
        return cut;
    }

    end
}

/// Rightmost occurrence of the two-character separator `a`,`b` fully inside
/// `[from, end)`; returns the offset just past the separator.
fn rfind_pair(chars: &[char], from: usize, end: usize, a: char, b: char) -> Option<usize> {
    let mut pos = end.checked_sub(2)?;
    loop {
        if pos < from {
            return None;
        }
        if chars[pos] == a && chars[pos + 1] == b {
            return Some(pos + 2);
        }
        if pos == from {
            return None;
        }
        pos -= 1;
    }
}

fn rfind_char(chars: &[char], from: usize, end: usize, needle: char) -> Option<usize> {
    let mut pos = end.checked_sub(1)?;
    loop {
        if pos < from {
            return None;
        }
        if chars[pos] == needle {
            return Some(pos + 1);
        }
        if pos == from {
            return None;
        }
        pos -= 1;
    }
}
