//! Overlapping-window document splitter.
//!
//! Window sizes are measured in characters; each emitted [`Chunk`] records
//! the byte offset of its start so callers can slice the source directly.

use crate::config::ChunkingConfig;
use crate::types::{Chunk, QaError};

/// Splits `document` into overlapping windows.
///
/// The scan walks left to right, taking up to `max_chunk_size` characters
/// per window. When a window ends strictly inside the document and a
/// configured separator occurs inside it, the boundary is pulled back to
/// just past the last occurrence of the highest-priority separator, so
/// chunks preferentially end at a natural breakpoint instead of mid-token.
/// The final window is never trimmed and may be shorter than
/// `max_chunk_size`.
///
/// The cursor then advances to `window_end - overlap`, clamped so it always
/// moves forward even when a breakpoint lands close to the window start.
pub fn split(document: &str, config: &ChunkingConfig) -> Result<Vec<Chunk>, QaError> {
    config.validate()?;
    if document.is_empty() {
        return Ok(Vec::new());
    }

    // Byte offset of every char boundary, with a sentinel for the end, so
    // char-measured windows can slice the source without re-walking it.
    let mut offsets: Vec<usize> = document.char_indices().map(|(at, _)| at).collect();
    offsets.push(document.len());
    let total = offsets.len() - 1;

    let mut chunks = Vec::new();
    let mut cursor = 0usize;
    loop {
        let hard_end = (cursor + config.max_chunk_size).min(total);
        let end = if hard_end < total {
            break_at_separator(document, &offsets, cursor, hard_end, &config.separators)
        } else {
            hard_end
        };

        chunks.push(Chunk {
            index: chunks.len(),
            start: offsets[cursor],
            text: document[offsets[cursor]..offsets[end]].to_string(),
        });

        if end == total {
            break;
        }
        // re-read `overlap` characters, but never let the cursor stall
        cursor = end.saturating_sub(config.overlap).max(cursor + 1);
    }
    Ok(chunks)
}

/// The highest-priority separator present in the window wins; within it,
/// the last occurrence. Returns `hard_end` untouched when none occurs.
fn break_at_separator(
    document: &str,
    offsets: &[usize],
    cursor: usize,
    hard_end: usize,
    separators: &[String],
) -> usize {
    let window = &document[offsets[cursor]..offsets[hard_end]];
    for separator in separators {
        if let Some(at) = window.rfind(separator.as_str()) {
            let boundary = at + separator.len();
            return cursor + window[..boundary].chars().count();
        }
    }
    hard_end
}
