//! Vector store trait for persisting chunks and reading them back by document.

use async_trait::async_trait;

use crate::document::{Chunk, ChunkFilter};
use crate::error::Result;

/// A storage backend for embedded chunks with exact-match filtered reads.
///
/// The pipeline never searches by similarity; it writes chunks with their
/// embeddings and later reads every chunk of a document back. Backends
/// must make a write visible to a read issued after it returns.
///
/// # Example
///
/// ```rust,ignore
/// use quiz_rag::{ChunkFilter, InMemoryVectorStore, VectorStore};
///
/// let store = InMemoryVectorStore::new();
/// store.create_collection("documents", 384).await?;
/// store.upsert("documents", &chunks).await?;
/// let stored = store.get("documents", &ChunkFilter::document("doc-1"), None).await?;
/// ```
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Create a named collection. No-op if it already exists.
    async fn create_collection(&self, name: &str, dimensions: usize) -> Result<()>;

    /// Delete a named collection and all its data.
    async fn delete_collection(&self, name: &str) -> Result<()>;

    /// Upsert chunks into a collection. Chunks must have embeddings set.
    async fn upsert(&self, collection: &str, chunks: &[Chunk]) -> Result<()>;

    /// Read chunks matching `filter`, in the store's iteration order.
    ///
    /// At most `limit` chunks are returned when a limit is given. Backends
    /// may leave `embedding` empty on read.
    async fn get(
        &self,
        collection: &str,
        filter: &ChunkFilter,
        limit: Option<usize>,
    ) -> Result<Vec<Chunk>>;

    /// Delete every chunk matching `filter`. Returns how many were removed
    /// when the backend reports it.
    async fn delete(&self, collection: &str, filter: &ChunkFilter) -> Result<Option<usize>>;

    /// Short backend name used in logs and errors.
    fn backend(&self) -> &str {
        "vector_store"
    }
}
