//! Text processing for TTS: word-boundary chunking under a character budget.

pub mod chunker;

pub use chunker::{chunk_document, chunk_text};

/// A chunk of text ready for TTS processing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChunk {
    /// 1-based position of this chunk within the document
    pub index: usize,
    /// The text content
    pub text: String,
}

impl TextChunk {
    /// Create a new text chunk.
    pub fn new(index: usize, text: String) -> Self {
        Self { index, text }
    }
}
