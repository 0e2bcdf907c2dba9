//! Document indexing: chunk → embed → store.
//!
//! The [`Indexer`] drives a [`Chunker`] and an [`EmbeddingProvider`] over a
//! document's sections and writes one [`Chunk`] record per window to the
//! [`VectorStore`].
//!
//! # Example
//!
//! ```rust,ignore
//! use quiz_rag::{DocumentSection, InMemoryVectorStore, Indexer, RagConfig};
//!
//! let indexer = Indexer::builder()
//!     .config(RagConfig::default())
//!     .embedding_provider(Arc::new(my_embedder))
//!     .vector_store(Arc::new(InMemoryVectorStore::new()))
//!     .build()?;
//!
//! indexer.ensure_collection().await?;
//! let report = indexer.index_document("doc-1", &sections).await?;
//! ```

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, error, info};

use crate::chunking::{Chunker, WordWindowChunker};
use crate::config::RagConfig;
use crate::document::{Chunk, ChunkFilter, DocumentSection};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::vectorstore::VectorStore;

/// Summary of one [`Indexer::index_document`] call.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct IndexReport {
    /// The indexed document.
    pub document_id: String,
    /// Number of sections received.
    pub section_count: usize,
    /// Number of chunks written; ids run `0..chunk_count`.
    pub chunk_count: usize,
}

/// Writes document sections into the vector store as embedded chunks.
///
/// Chunk ids are `"{document_id}_{idx}"`, where `idx` is a single counter
/// shared by every section of one call, starting at 0. The same input always
/// produces the same ids in the same order.
pub struct Indexer {
    config: RagConfig,
    embedding_provider: Arc<dyn EmbeddingProvider>,
    vector_store: Arc<dyn VectorStore>,
    chunker: Arc<dyn Chunker>,
}

impl Indexer {
    /// Create a new [`IndexerBuilder`].
    pub fn builder() -> IndexerBuilder {
        IndexerBuilder::default()
    }

    /// Return a reference to the indexer configuration.
    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    /// Return a reference to the vector store.
    pub fn vector_store(&self) -> &Arc<dyn VectorStore> {
        &self.vector_store
    }

    /// Create the configured collection, sized for the embedding provider.
    pub async fn ensure_collection(&self) -> Result<()> {
        let name = &self.config.collection;
        let dimensions = self.embedding_provider.dimensions();
        self.vector_store.create_collection(name, dimensions).await.map_err(|e| {
            error!(collection = %name, error = %e, "failed to create collection");
            e
        })
    }

    /// Chunk, embed and store every section of a document, in order.
    ///
    /// One store write is issued per chunk. The first embedding or store
    /// failure aborts the call; chunks written before it stay written.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::IndexError`] naming the chunk that failed.
    pub async fn index_document(
        &self,
        document_id: &str,
        sections: &[DocumentSection],
    ) -> Result<IndexReport> {
        let collection = &self.config.collection;
        let mut idx = 0usize;

        for section in sections {
            let texts = self.chunker.chunk(&section.text);
            debug!(
                document.id = document_id,
                source = %section.source,
                chunk_count = texts.len(),
                "chunked section"
            );

            for text in texts {
                let chunk_id = Chunk::chunk_id(document_id, idx);
                let fail = |message: String| RagError::IndexError {
                    document_id: document_id.to_string(),
                    chunk_id: chunk_id.clone(),
                    message,
                };

                let embedding = self.embedding_provider.embed(&text).await.map_err(|e| {
                    error!(document.id = document_id, chunk.id = %chunk_id, error = %e, "embedding failed during indexing");
                    fail(e.to_string())
                })?;

                let chunk = Chunk {
                    id: chunk_id.clone(),
                    document_id: document_id.to_string(),
                    source: section.source.clone(),
                    text,
                    embedding,
                };

                self.vector_store.upsert(collection, std::slice::from_ref(&chunk)).await.map_err(
                    |e| {
                        error!(document.id = document_id, chunk.id = %chunk_id, error = %e, "store write failed during indexing");
                        fail(e.to_string())
                    },
                )?;

                idx += 1;
            }
        }

        info!(document.id = document_id, section_count = sections.len(), chunk_count = idx, "indexed document");

        Ok(IndexReport {
            document_id: document_id.to_string(),
            section_count: sections.len(),
            chunk_count: idx,
        })
    }

    /// Remove every chunk of a document from the store.
    pub async fn delete_document(&self, document_id: &str) -> Result<Option<usize>> {
        let removed = self
            .vector_store
            .delete(&self.config.collection, &ChunkFilter::document(document_id))
            .await?;
        info!(document.id = document_id, removed, "deleted document chunks");
        Ok(removed)
    }
}

/// Builder for constructing an [`Indexer`].
///
/// `embedding_provider` and `vector_store` are required. The config defaults
/// to [`RagConfig::default()`] and the chunker to a [`WordWindowChunker`]
/// sized from the config.
#[derive(Default)]
pub struct IndexerBuilder {
    config: Option<RagConfig>,
    embedding_provider: Option<Arc<dyn EmbeddingProvider>>,
    vector_store: Option<Arc<dyn VectorStore>>,
    chunker: Option<Arc<dyn Chunker>>,
}

impl IndexerBuilder {
    /// Set the configuration.
    pub fn config(mut self, config: RagConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the embedding provider.
    pub fn embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedding_provider = Some(provider);
        self
    }

    /// Set the vector store backend.
    pub fn vector_store(mut self, store: Arc<dyn VectorStore>) -> Self {
        self.vector_store = Some(store);
        self
    }

    /// Replace the default word-window chunker.
    pub fn chunker(mut self, chunker: Arc<dyn Chunker>) -> Self {
        self.chunker = Some(chunker);
        self
    }

    /// Build the [`Indexer`], validating that all required fields are set.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if a required field is missing or
    /// the config is invalid.
    pub fn build(self) -> Result<Indexer> {
        let config = self.config.unwrap_or_default();
        config.validate()?;
        let embedding_provider = self
            .embedding_provider
            .ok_or_else(|| RagError::ConfigError("embedding_provider is required".to_string()))?;
        let vector_store = self
            .vector_store
            .ok_or_else(|| RagError::ConfigError("vector_store is required".to_string()))?;
        let chunker =
            self.chunker.unwrap_or_else(|| Arc::new(WordWindowChunker::from_config(&config)));

        Ok(Indexer { config, embedding_provider, vector_store, chunker })
    }
}
