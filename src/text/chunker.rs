//! Greedy word-boundary chunking under a character budget.

use super::TextChunk;

/// Split text into chunks at word boundaries, each at or under `max_chars`
/// characters.
///
/// Words are accumulated greedily; a word joins the current chunk when it
/// fits together with a separating space, otherwise the chunk is closed and
/// the word starts a new one. A single word longer than `max_chars` is kept
/// whole in its own chunk rather than split mid-word. Lengths are counted in
/// characters, not bytes. Empty or whitespace-only input produces no chunks.
pub fn chunk_text(text: &str, max_chars: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    for word in text.split_whitespace() {
        let word_len = word.chars().count();

        if current.is_empty() {
            current.push_str(word);
            current_len = word_len;
        } else if current_len + word_len + 1 > max_chars {
            chunks.push(std::mem::take(&mut current));
            current.push_str(word);
            current_len = word_len;
        } else {
            current.push(' ');
            current.push_str(word);
            current_len += word_len + 1;
        }
    }

    if !current.is_empty() {
        chunks.push(current);
    }

    chunks
}

/// Chunk a document's extracted text into 1-indexed `TextChunk`s.
pub fn chunk_document(text: &str, max_chars: usize) -> Vec<TextChunk> {
    chunk_text(text, max_chars)
        .into_iter()
        .enumerate()
        .map(|(i, text)| TextChunk::new(i + 1, text))
        .collect()
}
