//! Sentence-aligned greedy text chunking.
//!
//! Documents are split into sentences and accumulated into chunks whose size
//! approximates a token budget (4 characters per token). The packing is a
//! single greedy pass: the bound is "approximately respected", not exact, and
//! a lone sentence longer than the budget is passed through unsplit rather
//! than truncated.

/// Default token budget per chunk.
pub const DEFAULT_MAX_TOKENS: usize = 500;

/// Rough character-per-token ratio for English text.
const CHARS_PER_TOKEN: usize = 4;

/// Splits `text` into sentence-aligned chunks of at most
/// `max_tokens * 4` characters each.
///
/// A sentence boundary is a `.`, `!`, or `?` immediately followed by
/// whitespace; the terminator stays with its sentence and the whitespace run
/// is consumed. Sentences are appended greedily: when appending would
/// overflow a non-empty buffer, the buffer is flushed (trimmed) first. The
/// sentence is appended regardless, so a single oversized sentence becomes an
/// oversized chunk of its own.
///
/// Empty input yields no chunks. Pure function, no failure modes.
pub fn split_into_chunks(text: &str, max_tokens: usize) -> Vec<String> {
    let max_chars = max_tokens * CHARS_PER_TOKEN;

    let mut chunks = Vec::new();
    let mut current = String::new();

    for sentence in split_sentences(text) {
        if current.len() + sentence.len() > max_chars && !current.is_empty() {
            chunks.push(current.trim().to_string());
            current.clear();
        }
        current.push_str(sentence);
        current.push(' ');
    }

    if !current.trim().is_empty() {
        chunks.push(current.trim().to_string());
    }

    chunks
}

/// Splits text at sentence terminators (`.`, `!`, `?`) that are immediately
/// followed by whitespace. The whitespace run between sentences is dropped;
/// any other whitespace is preserved inside its sentence.
fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut chars = text.char_indices().peekable();
    let mut start = 0usize;

    while let Some((idx, ch)) = chars.next() {
        if matches!(ch, '.' | '!' | '?')
            && chars.peek().is_some_and(|&(_, next)| next.is_whitespace())
        {
            sentences.push(&text[start..idx + ch.len_utf8()]);
            start = text.len();
            while let Some(&(ws_idx, ws)) = chars.peek() {
                if ws.is_whitespace() {
                    chars.next();
                } else {
                    start = ws_idx;
                    break;
                }
            }
        }
    }

    if start < text.len() {
        sentences.push(&text[start..]);
    }

    sentences
}
