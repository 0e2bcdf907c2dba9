//! Error types for the `quiz-rag` crate.

use thiserror::Error;

/// Errors that can occur while chunking, indexing, or retrieving.
#[derive(Debug, Error)]
pub enum RagError {
    /// An error occurred during embedding generation.
    #[error("Embedding error ({provider}): {message}")]
    EmbeddingError {
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// An error occurred in the vector store backend.
    #[error("Vector store error ({backend}): {message}")]
    VectorStoreError {
        /// The vector store backend that produced the error.
        backend: String,
        /// A description of the failure.
        message: String,
    },

    /// A configuration validation error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Indexing a document was aborted part-way through.
    ///
    /// Chunks written before the failure stay in the store.
    #[error("Indexing failed for document '{document_id}' at chunk {chunk_id}: {message}")]
    IndexError {
        /// The document being indexed.
        document_id: String,
        /// The id of the chunk whose embedding or write failed.
        chunk_id: String,
        /// A description of the failure.
        message: String,
    },

    /// Reading chunks back from the store failed.
    #[error("Retrieval failed for document '{document_id}': {message}")]
    RetrievalError {
        /// The document being retrieved.
        document_id: String,
        /// A description of the failure.
        message: String,
    },
}

/// A convenience result type for RAG operations.
pub type Result<T> = std::result::Result<T, RagError>;
