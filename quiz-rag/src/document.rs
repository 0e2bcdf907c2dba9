//! Data types for document sections, stored chunks, and retrieval results.

use serde::{Deserialize, Serialize};

/// One logical unit extracted from a source document (a page, a slide, or a
/// whole scraped page).
///
/// `source` is a human-readable label such as `"notes.pdf (Page 3)"` or a URL.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DocumentSection {
    /// Label identifying where the text came from.
    pub source: String,
    /// The extracted text.
    pub text: String,
}

impl DocumentSection {
    /// Create a new section.
    pub fn new(source: impl Into<String>, text: impl Into<String>) -> Self {
        Self { source: source.into(), text: text.into() }
    }
}

/// A windowed slice of a document, stored with its vector embedding.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chunk {
    /// `"{document_id}_{sequence_index}"`.
    pub id: String,
    /// The ID of the parent document.
    pub document_id: String,
    /// Source label of the section this chunk was cut from.
    pub source: String,
    /// The text content of the chunk.
    pub text: String,
    /// The vector embedding for this chunk's text.
    pub embedding: Vec<f32>,
}

impl Chunk {
    /// Build the id of the chunk at `index` within a document.
    pub fn chunk_id(document_id: &str, index: usize) -> String {
        format!("{document_id}_{index}")
    }
}

/// A read-only projection of a [`Chunk`] handed to generation.
///
/// Embeddings never travel on the read path.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RetrievedChunk {
    /// The text content of the chunk.
    pub text: String,
    /// Source label of the chunk.
    pub source: String,
}

impl RetrievedChunk {
    /// Create a new retrieved chunk.
    pub fn new(source: impl Into<String>, text: impl Into<String>) -> Self {
        Self { text: text.into(), source: source.into() }
    }
}

impl From<Chunk> for RetrievedChunk {
    fn from(chunk: Chunk) -> Self {
        Self { text: chunk.text, source: chunk.source }
    }
}

/// Exact-match filter used when reading chunks back from a store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkFilter {
    /// Only chunks of this document match.
    pub document_id: String,
}

impl ChunkFilter {
    /// Match every chunk of `document_id`.
    pub fn document(document_id: impl Into<String>) -> Self {
        Self { document_id: document_id.into() }
    }

    /// Whether `chunk` passes this filter.
    pub fn matches(&self, chunk: &Chunk) -> bool {
        chunk.document_id == self.document_id
    }
}

/// Mint a fresh document id for an upload.
pub fn new_document_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
