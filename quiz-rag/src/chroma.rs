//! Chroma vector store backend.
//!
//! Provides [`ChromaVectorStore`] which implements [`VectorStore`] against
//! Chroma's REST API using `reqwest` directly.
//!
//! This module is only available when the `chroma` feature is enabled.
//!
//! # Example
//!
//! ```rust,ignore
//! use quiz_rag::chroma::ChromaVectorStore;
//!
//! let store = ChromaVectorStore::new("http://localhost:8000");
//! store.create_collection("documents", 1536).await?;
//! ```

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use crate::document::{Chunk, ChunkFilter};
use crate::error::{RagError, Result};
use crate::vectorstore::VectorStore;

const BACKEND: &str = "chroma";

#[derive(Debug, Deserialize)]
struct CollectionInfo {
    id: String,
    name: String,
}

#[derive(Debug, Deserialize)]
struct GetResult {
    ids: Vec<String>,
    documents: Option<Vec<Option<String>>>,
    metadatas: Option<Vec<Option<Value>>>,
}

/// A [`VectorStore`] backed by a [Chroma](https://www.trychroma.com/) server.
///
/// Chunk text is stored as the Chroma document, `document_id` and `source`
/// as metadata. Reads do not fetch embeddings back.
pub struct ChromaVectorStore {
    http: reqwest::Client,
    base_url: String,
    tenant: String,
    database: String,
    /// collection name → Chroma collection id
    ids: RwLock<HashMap<String, String>>,
}

impl ChromaVectorStore {
    /// Create a store talking to the Chroma server at `base_url`.
    pub fn new(base_url: &str) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(5))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            tenant: "default_tenant".to_string(),
            database: "default_database".to_string(),
            ids: RwLock::new(HashMap::new()),
        }
    }

    /// Create a store from `CHROMA_URL`, defaulting to `http://localhost:8000`.
    pub fn from_env() -> Self {
        let url = std::env::var("CHROMA_URL").unwrap_or_else(|_| "http://localhost:8000".into());
        Self::new(&url)
    }

    /// Use a tenant/database pair other than Chroma's defaults.
    pub fn with_database(mut self, tenant: impl Into<String>, database: impl Into<String>) -> Self {
        self.tenant = tenant.into();
        self.database = database.into();
        self
    }

    fn collections_url(&self) -> String {
        format!(
            "{}/api/v1/tenants/{}/databases/{}/collections",
            self.base_url, self.tenant, self.database
        )
    }

    fn map_err(e: reqwest::Error) -> RagError {
        RagError::VectorStoreError { backend: BACKEND.to_string(), message: e.to_string() }
    }

    fn http_err(action: &str, status: reqwest::StatusCode, body: &str) -> RagError {
        error!(status = %status, body = %body, action, "chroma request failed");
        RagError::VectorStoreError {
            backend: BACKEND.to_string(),
            message: format!("{action} failed ({status}): {body}"),
        }
    }

    /// Resolve (and cache) the Chroma id of a collection created earlier.
    async fn collection_id(&self, name: &str) -> Result<String> {
        if let Some(id) = self.ids.read().await.get(name) {
            return Ok(id.clone());
        }

        let resp = self.http.get(self.collections_url()).send().await.map_err(Self::map_err)?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Self::http_err("list collections", status, &body));
        }
        let collections: Vec<CollectionInfo> = resp.json().await.map_err(Self::map_err)?;
        let info = collections.into_iter().find(|c| c.name == name).ok_or_else(|| {
            RagError::VectorStoreError {
                backend: BACKEND.to_string(),
                message: format!("collection '{name}' does not exist"),
            }
        })?;

        self.ids.write().await.insert(name.to_string(), info.id.clone());
        Ok(info.id)
    }

    async fn post(&self, collection_id: &str, op: &str, body: &Value) -> Result<reqwest::Response> {
        let resp = self
            .http
            .post(format!("{}/api/v1/collections/{collection_id}/{op}", self.base_url))
            .json(body)
            .send()
            .await
            .map_err(Self::map_err)?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Self::http_err(op, status, &body));
        }
        Ok(resp)
    }

    fn where_clause(filter: &ChunkFilter) -> Value {
        json!({ "document_id": filter.document_id })
    }
}

/// Rebuild chunks from a Chroma `get` response.
fn chunks_from_result(result: GetResult) -> Vec<Chunk> {
    let documents = result.documents.unwrap_or_default();
    let metadatas = result.metadatas.unwrap_or_default();

    result
        .ids
        .into_iter()
        .enumerate()
        .map(|(i, id)| {
            let text = documents.get(i).cloned().flatten().unwrap_or_default();
            let meta = metadatas.get(i).cloned().flatten().unwrap_or(Value::Null);
            let field = |key: &str| meta.get(key).and_then(Value::as_str).unwrap_or("").to_string();
            Chunk {
                id,
                document_id: field("document_id"),
                source: field("source"),
                text,
                embedding: Vec::new(),
            }
        })
        .collect()
}

#[async_trait]
impl VectorStore for ChromaVectorStore {
    async fn create_collection(&self, name: &str, dimensions: usize) -> Result<()> {
        let body = json!({
            "name": name,
            "get_or_create": true,
            "metadata": { "dimensions": dimensions },
        });
        let resp =
            self.http.post(self.collections_url()).json(&body).send().await.map_err(Self::map_err)?;
        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(Self::http_err("create collection", status, &text));
        }

        let info: CollectionInfo = resp.json().await.map_err(Self::map_err)?;
        info!(collection = %info.name, id = %info.id, "chroma collection ready");
        self.ids.write().await.insert(name.to_string(), info.id);
        Ok(())
    }

    async fn delete_collection(&self, name: &str) -> Result<()> {
        let resp = self
            .http
            .delete(format!("{}/{name}", self.collections_url()))
            .send()
            .await
            .map_err(Self::map_err)?;
        self.ids.write().await.remove(name);

        let status = resp.status();
        if status.as_u16() == 404 {
            warn!(collection = name, "chroma collection already deleted");
            return Ok(());
        }
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(Self::http_err("delete collection", status, &text));
        }
        debug!(collection = name, "deleted chroma collection");
        Ok(())
    }

    async fn upsert(&self, collection: &str, chunks: &[Chunk]) -> Result<()> {
        if chunks.is_empty() {
            return Ok(());
        }
        let id = self.collection_id(collection).await?;

        let body = json!({
            "ids": chunks.iter().map(|c| c.id.as_str()).collect::<Vec<_>>(),
            "documents": chunks.iter().map(|c| c.text.as_str()).collect::<Vec<_>>(),
            "embeddings": chunks.iter().map(|c| c.embedding.as_slice()).collect::<Vec<_>>(),
            "metadatas": chunks
                .iter()
                .map(|c| json!({ "document_id": c.document_id, "source": c.source }))
                .collect::<Vec<_>>(),
        });
        self.post(&id, "upsert", &body).await?;
        debug!(collection, count = chunks.len(), "upserted chunks");
        Ok(())
    }

    async fn get(
        &self,
        collection: &str,
        filter: &ChunkFilter,
        limit: Option<usize>,
    ) -> Result<Vec<Chunk>> {
        let id = self.collection_id(collection).await?;

        let mut body = json!({
            "where": Self::where_clause(filter),
            "include": ["documents", "metadatas"],
        });
        if let Some(limit) = limit {
            body["limit"] = json!(limit);
        }

        let resp = self.post(&id, "get", &body).await?;
        let result: GetResult = resp.json().await.map_err(Self::map_err)?;
        let chunks = chunks_from_result(result);
        debug!(collection, document.id = %filter.document_id, count = chunks.len(), "fetched chunks");
        Ok(chunks)
    }

    async fn delete(&self, collection: &str, filter: &ChunkFilter) -> Result<Option<usize>> {
        let id = self.collection_id(collection).await?;
        self.post(&id, "delete", &json!({ "where": Self::where_clause(filter) })).await?;
        info!(collection, document.id = %filter.document_id, "deleted document chunks");
        Ok(None)
    }

    fn backend(&self) -> &str {
        BACKEND
    }
}
