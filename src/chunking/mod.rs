//! Content chunking for long-form generation.
//!
//! Splits extracted source text into ordered chunks, one generation call
//! each. Chunks break only at sentence or paragraph boundaries, and the
//! concatenation of all chunk texts is exactly the input text.

mod boundary;

use crate::error::{PodweaveError, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

pub use boundary::split_units;

/// A piece of source text handled by one generation call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentChunk {
    /// Position of this chunk, starting at 0.
    pub index: usize,
    /// Raw text, including the whitespace that followed it in the source.
    pub text: String,
    /// Length of `text` in characters.
    pub char_count: usize,
}

impl ContentChunk {
    /// Create a new content chunk.
    pub fn new(index: usize, text: String) -> Self {
        let char_count = text.chars().count();
        Self {
            index,
            text,
            char_count,
        }
    }

    /// Text with boundary whitespace removed, as sent to the generator.
    pub fn content(&self) -> &str {
        self.text.trim()
    }
}

/// Split `text` into at most `max_num_chunks` chunks of at least
/// `min_chunk_size` characters (the last chunk may be shorter).
///
/// Fails with [`PodweaveError::ContentTooShort`] when the text is shorter than
/// `min_chunk_size`, which tells the caller to use short-form generation.
pub fn segment(text: &str, min_chunk_size: usize, max_num_chunks: usize) -> Result<Vec<ContentChunk>> {
    if min_chunk_size == 0 {
        return Err(PodweaveError::Config("min_chunk_size must be positive".into()));
    }
    if max_num_chunks == 0 {
        return Err(PodweaveError::Config("max_num_chunks must be positive".into()));
    }

    let length = text.trim().chars().count();
    if length < min_chunk_size {
        return Err(PodweaveError::ContentTooShort {
            length,
            min_chunk_size,
        });
    }

    let total = text.chars().count();
    let target = min_chunk_size.max(total / max_num_chunks);
    debug!(
        "Segmenting {} characters (target {} per chunk, max {} chunks)",
        total, target, max_num_chunks
    );

    let mut pieces = accumulate(split_units(text), target);
    absorb_short_tail(&mut pieces, min_chunk_size);
    merge_to_cap(&mut pieces, max_num_chunks);

    Ok(pieces
        .into_iter()
        .enumerate()
        .map(|(index, text)| ContentChunk::new(index, text))
        .collect())
}

/// Greedily pack units into pieces of at least `target` characters.
fn accumulate(units: Vec<&str>, target: usize) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for unit in units {
        current.push_str(unit);
        current_len += unit.chars().count();
        if current_len >= target {
            pieces.push(std::mem::take(&mut current));
            current_len = 0;
        }
    }

    if !current.is_empty() {
        pieces.push(current);
    }
    pieces
}

/// Fold a trailing crumb (under half the minimum) into the previous piece.
fn absorb_short_tail(pieces: &mut Vec<String>, min_chunk_size: usize) {
    if pieces.len() < 2 {
        return;
    }
    let tail_len = pieces.last().map(|p| p.trim().chars().count()).unwrap_or(0);
    if tail_len < min_chunk_size / 2 {
        if let Some(tail) = pieces.pop() {
            if let Some(last) = pieces.last_mut() {
                last.push_str(&tail);
            }
        }
    }
}

/// Merge adjacent pieces, smallest combined pair first, until the cap holds.
fn merge_to_cap(pieces: &mut Vec<String>, max_num_chunks: usize) {
    while pieces.len() > max_num_chunks {
        let lengths: Vec<usize> = pieces.iter().map(|p| p.chars().count()).collect();
        let best = (0..pieces.len() - 1)
            .min_by_key(|&i| lengths[i] + lengths[i + 1])
            .unwrap_or(0);

        let next = pieces.remove(best + 1);
        pieces[best].push_str(&next);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sentences(count: usize, words_each: usize) -> String {
        (0..count)
            .map(|i| {
                let body = (0..words_each)
                    .map(|w| format!("word{}x{}", i, w))
                    .collect::<Vec<_>>()
                    .join(" ");
                format!("Sentence {} says {}.", i, body)
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Deterministic pseudo-random text with paragraphs and punctuation.
    fn pseudo_text(seed: u64, sentences: usize) -> String {
        let mut state = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        let mut next = move || {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            (state >> 33) as usize
        };
        let mut out = String::new();
        for _ in 0..sentences {
            let words = 3 + next() % 25;
            for w in 0..words {
                if w > 0 {
                    out.push(' ');
                }
                out.push_str(&"lorem".repeat(1 + next() % 3));
            }
            out.push_str([".", "!", "?", "…"][next() % 4]);
            out.push_str(["  ", " ", "\n\n", "\n"][next() % 4]);
        }
        out
    }

    #[test]
    fn test_too_short_for_long_form() {
        let text = "a".repeat(500);
        let err = segment(&text, 600, 5).unwrap_err();
        assert!(matches!(
            err,
            PodweaveError::ContentTooShort { length: 500, min_chunk_size: 600 }
        ));
    }

    #[test]
    fn test_invalid_parameters() {
        assert!(matches!(segment("text", 0, 3), Err(PodweaveError::Config(_))));
        assert!(matches!(segment("text", 1, 0), Err(PodweaveError::Config(_))));
    }

    #[test]
    fn test_exactly_min_size_is_one_chunk() {
        let text = sentences(3, 10);
        let len = text.chars().count();
        let chunks = segment(&text, len, 5).unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, text);
        assert_eq!(chunks[0].char_count, len);
    }

    #[test]
    fn test_chunks_cover_input_and_respect_bounds() {
        for seed in 0..25 {
            let text = pseudo_text(seed, 40 + (seed as usize * 7) % 120);
            for (min, max) in [(100, 3), (250, 10), (50, 2), (400, 7)] {
                if text.trim().chars().count() < min {
                    continue;
                }
                let chunks = segment(&text, min, max).unwrap();

                let rebuilt: String = chunks.iter().map(|c| c.text.as_str()).collect();
                assert_eq!(rebuilt, text, "seed {} min {} max {}", seed, min, max);
                assert!(chunks.len() <= max);

                for chunk in &chunks[..chunks.len() - 1] {
                    assert!(chunk.char_count >= min, "seed {} chunk {} too short", seed, chunk.index);
                }
                for (i, chunk) in chunks.iter().enumerate() {
                    assert_eq!(chunk.index, i);
                }
            }
        }
    }

    #[test]
    fn test_never_splits_mid_word() {
        let text = sentences(30, 12);
        let chunks = segment(&text, 200, 6).unwrap();
        for chunk in &chunks[..chunks.len() - 1] {
            let last = chunk.text.chars().last().unwrap();
            assert!(last.is_whitespace(), "chunk {} ends mid-sentence", chunk.index);
            assert!(chunk.text.trim_end().ends_with('.'));
        }
    }

    #[test]
    fn test_cap_merges_adjacent_pieces_balanced() {
        let mut pieces: Vec<String> = vec!["aaaa ", "b ", "c ", "dd ", "eeee "]
            .into_iter()
            .map(String::from)
            .collect();
        merge_to_cap(&mut pieces, 3);
        assert_eq!(pieces, vec!["aaaa ", "b c dd ", "eeee "]);
    }

    #[test]
    fn test_three_chunks_from_even_text() {
        let text = sentences(30, 10);
        let len = text.chars().count();
        let chunks = segment(&text, len / 3 - 20, 3).unwrap();
        assert_eq!(chunks.len(), 3);
    }

    #[test]
    fn test_short_tail_is_absorbed() {
        let mut pieces = vec!["x".repeat(120), "tail.".to_string()];
        absorb_short_tail(&mut pieces, 100);
        assert_eq!(pieces.len(), 1);
        assert!(pieces[0].ends_with("tail."));
    }
}
