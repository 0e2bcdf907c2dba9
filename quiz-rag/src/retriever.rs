//! Representative retrieval of a document's chunks.
//!
//! Generation works from a small, fixed-size context window, so the
//! [`Retriever`] returns a bounded sample of a document's chunks spread across
//! the whole document instead of its first few pages.

use std::sync::Arc;

use tracing::{debug, info};

use crate::config::{RagConfig, RetrievalStrategy};
use crate::document::{Chunk, ChunkFilter, RetrievedChunk};
use crate::error::{RagError, Result};
use crate::vectorstore::VectorStore;

/// Reads chunks for a document and selects a bounded sample of them.
pub struct Retriever {
    config: RagConfig,
    vector_store: Arc<dyn VectorStore>,
}

impl Retriever {
    /// Create a retriever over `vector_store` using `config`.
    pub fn new(config: RagConfig, vector_store: Arc<dyn VectorStore>) -> Self {
        Self { config, vector_store }
    }

    /// Return a reference to the retriever configuration.
    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    /// Retrieve up to the configured `sample_size` chunks of a document.
    pub async fn retrieve_default(&self, document_id: &str) -> Result<Vec<RetrievedChunk>> {
        self.retrieve(document_id, self.config.sample_size).await
    }

    /// Retrieve up to `k` chunks of a document.
    ///
    /// With [`RetrievalStrategy::RepresentativeSample`] every chunk of the
    /// document is fetched and, when there are more than `k`, sampled with
    /// [`representative_sample`]. With [`RetrievalStrategy::PlainFetch`]
    /// the store is asked for at most `k` chunks and they are returned as-is.
    ///
    /// An unknown document yields an empty result, not an error.
    pub async fn retrieve(&self, document_id: &str, k: usize) -> Result<Vec<RetrievedChunk>> {
        let filter = ChunkFilter::document(document_id);
        let limit = match self.config.strategy {
            RetrievalStrategy::RepresentativeSample => None,
            RetrievalStrategy::PlainFetch => Some(k),
        };

        let chunks = self
            .vector_store
            .get(&self.config.collection, &filter, limit)
            .await
            .map_err(|e| RagError::RetrievalError {
                document_id: document_id.to_string(),
                message: e.to_string(),
            })?;
        let total = chunks.len();

        let selected = match self.config.strategy {
            RetrievalStrategy::RepresentativeSample => {
                representative_sample(chunks, k, self.config.min_chunk_chars)
            }
            RetrievalStrategy::PlainFetch => chunks.into_iter().map(RetrievedChunk::from).collect(),
        };

        info!(
            document.id = document_id,
            total,
            k,
            selected = selected.len(),
            strategy = ?self.config.strategy,
            "retrieved chunks"
        );
        Ok(selected)
    }
}

/// Select at most `k` chunks spread evenly over the source-sorted sequence.
///
/// `k == 0` selects nothing. If `chunks.len() <= k` every chunk is returned
/// in the given order.
/// Otherwise chunks are stably sorted by `source`, indices
/// `0, step, …, (k-1)*step` with `step = len / k` are picked, and any pick
/// whose trimmed text is not longer than `min_chars` characters is dropped
/// without replacement.
pub fn representative_sample(
    chunks: Vec<Chunk>,
    k: usize,
    min_chars: usize,
) -> Vec<RetrievedChunk> {
    if k == 0 {
        return Vec::new();
    }
    if chunks.len() <= k {
        return chunks.into_iter().map(RetrievedChunk::from).collect();
    }

    let mut sorted = chunks;
    sorted.sort_by(|a, b| a.source.cmp(&b.source));

    let step = sorted.len() / k;
    let mut selected = Vec::with_capacity(k);
    for i in (0..k).map(|n| n * step) {
        let Some(chunk) = sorted.get(i) else { continue };
        if chunk.text.trim().chars().count() > min_chars {
            selected.push(RetrievedChunk::new(chunk.source.clone(), chunk.text.clone()));
        } else {
            debug!(chunk.id = %chunk.id, "skipping sampled chunk below content threshold");
        }
    }
    selected
}
