//! Shared test doubles for the integration tests.

#![allow(dead_code)]

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use quiz_rag::{EmbeddingProvider, RagError};

/// Deterministic hash-based embeddings; records every text it embeds.
pub struct HashEmbedder {
    dimensions: usize,
    pub seen: Mutex<Vec<String>>,
}

impl HashEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions, seen: Mutex::new(Vec::new()) }
    }
}

#[async_trait]
impl EmbeddingProvider for HashEmbedder {
    async fn embed(&self, text: &str) -> quiz_rag::Result<Vec<f32>> {
        self.seen.lock().unwrap().push(text.to_string());
        let hash = text.bytes().fold(0u64, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u64));
        Ok((0..self.dimensions).map(|i| ((hash.wrapping_add(i as u64)) as f32).sin()).collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

/// Succeeds for the first `ok_calls` embeddings, then fails.
pub struct FlakyEmbedder {
    ok_calls: usize,
    calls: AtomicUsize,
}

impl FlakyEmbedder {
    pub fn new(ok_calls: usize) -> Self {
        Self { ok_calls, calls: AtomicUsize::new(0) }
    }
}

#[async_trait]
impl EmbeddingProvider for FlakyEmbedder {
    async fn embed(&self, _text: &str) -> quiz_rag::Result<Vec<f32>> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        if n >= self.ok_calls {
            return Err(RagError::EmbeddingError {
                provider: "flaky".into(),
                message: "service unavailable".into(),
            });
        }
        Ok(vec![0.5, 0.5])
    }

    fn dimensions(&self) -> usize {
        2
    }
}

/// `n` space-separated numbered words: `"w0 w1 … w{n-1}"`.
pub fn words(prefix: &str, n: usize) -> String {
    (0..n).map(|i| format!("{prefix}{i}")).collect::<Vec<_>>().join(" ")
}
