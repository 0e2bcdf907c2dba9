//! In-memory vector store.
//!
//! This module provides [`InMemoryVectorStore`], a zero-dependency vector store
//! backed by per-collection vectors protected by a `tokio::sync::RwLock`. It is
//! suitable for development, testing, and small deployments.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::document::{Chunk, ChunkFilter};
use crate::error::{RagError, Result};
use crate::vectorstore::VectorStore;

const BACKEND: &str = "InMemory";

/// One collection: chunks in insertion order plus an id → position index.
#[derive(Debug, Default)]
struct Collection {
    chunks: Vec<Chunk>,
    positions: HashMap<String, usize>,
}

impl Collection {
    fn upsert(&mut self, chunk: Chunk) {
        match self.positions.get(&chunk.id) {
            Some(&pos) => self.chunks[pos] = chunk,
            None => {
                self.positions.insert(chunk.id.clone(), self.chunks.len());
                self.chunks.push(chunk);
            }
        }
    }

    fn retain(&mut self, keep: impl Fn(&Chunk) -> bool) -> usize {
        let before = self.chunks.len();
        self.chunks.retain(|c| keep(c));
        self.positions =
            self.chunks.iter().enumerate().map(|(pos, c)| (c.id.clone(), pos)).collect();
        before - self.chunks.len()
    }
}

/// An in-memory vector store that preserves insertion order.
///
/// Reads return chunks in the order they were first written, which keeps
/// retrieval of small documents reproducible. Re-upserting an existing id
/// replaces it in place.
///
/// # Example
///
/// ```rust,ignore
/// use quiz_rag::{InMemoryVectorStore, VectorStore};
///
/// let store = InMemoryVectorStore::new();
/// store.create_collection("documents", 384).await?;
/// ```
#[derive(Debug, Default)]
pub struct InMemoryVectorStore {
    collections: RwLock<HashMap<String, Collection>>,
}

impl InMemoryVectorStore {
    /// Create a new empty in-memory vector store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of chunks held in `collection`.
    pub async fn len(&self, collection: &str) -> usize {
        self.collections.read().await.get(collection).map_or(0, |c| c.chunks.len())
    }

    /// Whether `collection` is missing or holds no chunks.
    pub async fn is_empty(&self, collection: &str) -> bool {
        self.len(collection).await == 0
    }

    fn missing(collection: &str) -> RagError {
        RagError::VectorStoreError {
            backend: BACKEND.to_string(),
            message: format!("collection '{collection}' does not exist"),
        }
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn create_collection(&self, name: &str, _dimensions: usize) -> Result<()> {
        let mut collections = self.collections.write().await;
        collections.entry(name.to_string()).or_default();
        Ok(())
    }

    async fn delete_collection(&self, name: &str) -> Result<()> {
        let mut collections = self.collections.write().await;
        collections.remove(name);
        Ok(())
    }

    async fn upsert(&self, collection: &str, chunks: &[Chunk]) -> Result<()> {
        let mut collections = self.collections.write().await;
        let store = collections.get_mut(collection).ok_or_else(|| Self::missing(collection))?;
        for chunk in chunks {
            if chunk.embedding.is_empty() {
                return Err(RagError::VectorStoreError {
                    backend: BACKEND.to_string(),
                    message: format!("chunk '{}' has no embedding", chunk.id),
                });
            }
            store.upsert(chunk.clone());
        }
        Ok(())
    }

    async fn get(
        &self,
        collection: &str,
        filter: &ChunkFilter,
        limit: Option<usize>,
    ) -> Result<Vec<Chunk>> {
        let collections = self.collections.read().await;
        let store = collections.get(collection).ok_or_else(|| Self::missing(collection))?;
        let matching = store.chunks.iter().filter(|c| filter.matches(c)).cloned();
        Ok(match limit {
            Some(limit) => matching.take(limit).collect(),
            None => matching.collect(),
        })
    }

    async fn delete(&self, collection: &str, filter: &ChunkFilter) -> Result<Option<usize>> {
        let mut collections = self.collections.write().await;
        let store = collections.get_mut(collection).ok_or_else(|| Self::missing(collection))?;
        Ok(Some(store.retain(|c| !filter.matches(c))))
    }

    fn backend(&self) -> &str {
        BACKEND
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(document_id: &str, index: usize) -> Chunk {
        Chunk {
            id: Chunk::chunk_id(document_id, index),
            document_id: document_id.to_string(),
            source: format!("{document_id}.pdf (Page {})", index + 1),
            text: format!("text {index}"),
            embedding: vec![1.0, 0.0],
        }
    }

    #[tokio::test]
    async fn get_preserves_insertion_order_and_filters() {
        let store = InMemoryVectorStore::new();
        store.create_collection("c", 2).await.unwrap();
        store.upsert("c", &[chunk("a", 0), chunk("b", 0), chunk("a", 1)]).await.unwrap();

        let got = store.get("c", &ChunkFilter::document("a"), None).await.unwrap();
        let ids: Vec<_> = got.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["a_0", "a_1"]);

        let limited = store.get("c", &ChunkFilter::document("a"), Some(1)).await.unwrap();
        assert_eq!(limited.len(), 1);
    }

    #[tokio::test]
    async fn upsert_replaces_in_place() {
        let store = InMemoryVectorStore::new();
        store.create_collection("c", 2).await.unwrap();
        store.upsert("c", &[chunk("a", 0), chunk("a", 1)]).await.unwrap();
        let mut replacement = chunk("a", 0);
        replacement.text = "replaced".into();
        store.upsert("c", &[replacement]).await.unwrap();

        let got = store.get("c", &ChunkFilter::document("a"), None).await.unwrap();
        assert_eq!(got[0].text, "replaced");
        assert_eq!(got.len(), 2);
    }

    #[tokio::test]
    async fn delete_by_document() {
        let store = InMemoryVectorStore::new();
        store.create_collection("c", 2).await.unwrap();
        store.upsert("c", &[chunk("a", 0), chunk("b", 0), chunk("a", 1)]).await.unwrap();

        let removed = store.delete("c", &ChunkFilter::document("a")).await.unwrap();
        assert_eq!(removed, Some(2));
        assert_eq!(store.len("c").await, 1);
        let rest = store.get("c", &ChunkFilter::document("b"), None).await.unwrap();
        assert_eq!(rest[0].id, "b_0");
    }

    #[tokio::test]
    async fn missing_collection_is_an_error() {
        let store = InMemoryVectorStore::new();
        let err = store.get("nope", &ChunkFilter::document("a"), None).await.unwrap_err();
        assert!(matches!(err, RagError::VectorStoreError { .. }));
    }

    #[tokio::test]
    async fn rejects_chunks_without_embeddings() {
        let store = InMemoryVectorStore::new();
        store.create_collection("c", 2).await.unwrap();
        let mut bare = chunk("a", 0);
        bare.embedding.clear();
        assert!(store.upsert("c", &[bare]).await.is_err());
    }
}
