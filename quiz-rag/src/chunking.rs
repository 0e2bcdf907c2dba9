//! Splitting section text into overlapping word windows.

/// A strategy for splitting section text into chunk texts.
///
/// Implementations return chunk texts only. Ids, sources and embeddings are
/// attached by the [`Indexer`](crate::Indexer).
pub trait Chunker: Send + Sync {
    /// Split `text` into chunk texts, in document order.
    ///
    /// Returns an empty `Vec` for empty or whitespace-only input.
    fn chunk(&self, text: &str) -> Vec<String>;
}

/// Splits text into fixed-size windows of whitespace-separated words.
///
/// Each window holds `chunk_size` words; the window start advances by
/// `chunk_size - chunk_overlap` words, so consecutive windows share exactly
/// `chunk_overlap` words. The final window may be shorter. Words inside a
/// window are re-joined with a single space.
///
/// # Example
///
/// ```rust
/// use quiz_rag::{Chunker, WordWindowChunker};
///
/// let chunker = WordWindowChunker::new(3, 1);
/// let chunks = chunker.chunk("a b c d e");
/// assert_eq!(chunks, vec!["a b c", "c d e", "e"]);
/// ```
#[derive(Debug, Clone)]
pub struct WordWindowChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl WordWindowChunker {
    /// Create a new `WordWindowChunker`.
    ///
    /// # Arguments
    ///
    /// * `chunk_size` - number of words per window
    /// * `chunk_overlap` - number of words shared by consecutive windows;
    ///   expected to be smaller than `chunk_size`
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self { chunk_size, chunk_overlap }
    }

    /// Build a chunker from a validated [`RagConfig`](crate::RagConfig).
    pub fn from_config(config: &crate::RagConfig) -> Self {
        Self::new(config.chunk_size, config.chunk_overlap)
    }

    /// Number of words the window start advances per step.
    fn step(&self) -> usize {
        self.chunk_size.saturating_sub(self.chunk_overlap)
    }
}

impl Chunker for WordWindowChunker {
    fn chunk(&self, text: &str) -> Vec<String> {
        let words: Vec<&str> = text.split_whitespace().collect();
        if words.is_empty() || self.chunk_size == 0 {
            return Vec::new();
        }

        let step = self.step();
        let mut chunks = Vec::new();
        let mut start = 0;

        while start < words.len() {
            let end = (start + self.chunk_size).min(words.len());
            chunks.push(words[start..end].join(" "));
            if step == 0 {
                break;
            }
            start += step;
        }

        chunks
    }
}
