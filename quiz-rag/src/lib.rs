//! # quiz-rag
//!
//! Chunking, indexing and representative retrieval for quiz generation.
//!
//! ## Overview
//!
//! Documents arrive as ordered [`DocumentSection`]s (pages, slides, scraped
//! pages). The [`Indexer`] splits each section into overlapping word windows
//! with a [`Chunker`], embeds every window through an [`EmbeddingProvider`],
//! and writes it to a [`VectorStore`] under the id `"{document_id}_{n}"`.
//!
//! Later the [`Retriever`] reads a document's chunks back and returns a small
//! sample that spans the whole document, ready to be used as LLM context.
//!
//! ## Backends
//!
//! - [`InMemoryVectorStore`] - always available
//! - `chroma::ChromaVectorStore` - Chroma REST API (feature `chroma`)
//! - `openai::OpenAIEmbeddingProvider` - OpenAI embeddings (feature `openai`)
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use quiz_rag::{DocumentSection, InMemoryVectorStore, Indexer, RagConfig, Retriever};
//!
//! let config = RagConfig::default();
//! let store = Arc::new(InMemoryVectorStore::new());
//! let indexer = Indexer::builder()
//!     .config(config.clone())
//!     .embedding_provider(Arc::new(my_embedder))
//!     .vector_store(store.clone())
//!     .build()?;
//! indexer.ensure_collection().await?;
//! indexer.index_document("doc-1", &[DocumentSection::new("notes.pdf (Page 1)", text)]).await?;
//!
//! let chunks = Retriever::new(config, store).retrieve("doc-1", 6).await?;
//! ```

pub mod chunking;
pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod indexer;
pub mod inmemory;
pub mod retriever;
pub mod vectorstore;

#[cfg(feature = "chroma")]
pub mod chroma;
#[cfg(feature = "openai")]
pub mod openai;

pub use chunking::{Chunker, WordWindowChunker};
pub use config::{RagConfig, RagConfigBuilder, RetrievalStrategy};
pub use document::{Chunk, ChunkFilter, DocumentSection, RetrievedChunk, new_document_id};
pub use embedding::EmbeddingProvider;
pub use error::{RagError, Result};
pub use indexer::{IndexReport, Indexer, IndexerBuilder};
pub use inmemory::InMemoryVectorStore;
pub use retriever::{Retriever, representative_sample};
pub use vectorstore::VectorStore;
