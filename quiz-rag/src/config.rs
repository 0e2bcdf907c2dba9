//! Configuration for chunking and retrieval.

use serde::{Deserialize, Serialize};

use crate::error::{RagError, Result};

/// How the [`Retriever`](crate::Retriever) picks chunks for a document.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum RetrievalStrategy {
    /// Spread the sample evenly across source-sorted chunks.
    #[default]
    RepresentativeSample,
    /// Return the first `k` chunks the store yields, unsampled.
    PlainFetch,
}

/// Configuration parameters for indexing and retrieval.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RagConfig {
    /// Chunk window size in whitespace-separated words.
    pub chunk_size: usize,
    /// Number of words shared by consecutive windows.
    pub chunk_overlap: usize,
    /// Upper bound on chunks returned per retrieval.
    pub sample_size: usize,
    /// Sampled chunks whose trimmed text is not longer than this are skipped.
    pub min_chunk_chars: usize,
    /// Sampling strategy used by the retriever.
    pub strategy: RetrievalStrategy,
    /// Vector store collection holding every document's chunks.
    pub collection: String,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            chunk_size: 500,
            chunk_overlap: 50,
            sample_size: 6,
            min_chunk_chars: 50,
            strategy: RetrievalStrategy::RepresentativeSample,
            collection: "documents".to_string(),
        }
    }
}

impl RagConfig {
    /// Create a new builder for constructing a [`RagConfig`].
    pub fn builder() -> RagConfigBuilder {
        RagConfigBuilder::default()
    }

    /// Check the invariants the builder enforces.
    ///
    /// Useful for configs that were deserialized rather than built.
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(RagError::ConfigError("chunk_size must be greater than zero".to_string()));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(RagError::ConfigError(format!(
                "chunk_overlap ({}) must be less than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        if self.sample_size == 0 {
            return Err(RagError::ConfigError("sample_size must be greater than zero".to_string()));
        }
        if self.collection.trim().is_empty() {
            return Err(RagError::ConfigError("collection must not be empty".to_string()));
        }
        Ok(())
    }
}

/// Builder for constructing a validated [`RagConfig`].
#[derive(Debug, Clone, Default)]
pub struct RagConfigBuilder {
    config: RagConfig,
}

impl RagConfigBuilder {
    /// Set the chunk window size in words.
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.config.chunk_size = size;
        self
    }

    /// Set the overlap between consecutive windows in words.
    pub fn chunk_overlap(mut self, overlap: usize) -> Self {
        self.config.chunk_overlap = overlap;
        self
    }

    /// Set the number of chunks returned per retrieval.
    pub fn sample_size(mut self, k: usize) -> Self {
        self.config.sample_size = k;
        self
    }

    /// Set the minimum trimmed length a sampled chunk must exceed.
    pub fn min_chunk_chars(mut self, chars: usize) -> Self {
        self.config.min_chunk_chars = chars;
        self
    }

    /// Set the retrieval strategy.
    pub fn strategy(mut self, strategy: RetrievalStrategy) -> Self {
        self.config.strategy = strategy;
        self
    }

    /// Set the vector store collection name.
    pub fn collection(mut self, name: impl Into<String>) -> Self {
        self.config.collection = name.into();
        self
    }

    /// Build the [`RagConfig`], validating that parameters are consistent.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if:
    /// - `chunk_size == 0`
    /// - `chunk_overlap >= chunk_size`
    /// - `sample_size == 0`
    /// - `collection` is blank
    pub fn build(self) -> Result<RagConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
