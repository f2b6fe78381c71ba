//! Ollama embedding provider implementation.
//!
//! Provides asynchronous embedding calls to an Ollama server using
//! `reqwest::Client`, with semaphore-bounded concurrency for batches.

use std::sync::Arc;

use crate::embed::{EmbedFuture, EmbeddingProvider};
use crate::errors::MemoryError;

use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;

/// Configuration for the Ollama embedding backend.
#[derive(Clone, Debug)]
pub struct OllamaConfig {
    /// Base URL, e.g. `http://localhost:11434`.
    pub url: String,
    /// Model name, e.g. `nomic-embed-text`.
    pub model: String,
    /// Expected embedding dimension size.
    pub dim: usize,
    /// Named-vector identifier reported to the collection layer.
    pub vector_name: Option<String>,
    /// Max in-flight embedding requests.
    pub concurrency: usize,
}

#[derive(Serialize)]
struct EmbedReq<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Deserialize)]
struct EmbedResp {
    embedding: Option<Vec<f32>>,
    embeddings: Option<Vec<Vec<f32>>>,
}

/// Ollama embedding provider (async).
pub struct OllamaEmbedder {
    client: reqwest::Client,
    base: String,
    model: String,
    dim: usize,
    vector_name: Option<String>,
    sem: Arc<Semaphore>,
}

impl OllamaEmbedder {
    /// Construct a new embedder from configuration.
    pub fn new(cfg: OllamaConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            base: cfg.url.trim_end_matches('/').to_string(),
            model: cfg.model,
            dim: cfg.dim,
            vector_name: cfg.vector_name,
            sem: Arc::new(Semaphore::new(cfg.concurrency.max(1))),
        }
    }

    async fn embed_one(&self, text: &str) -> Result<Vec<f32>, MemoryError> {
        let _permit = self
            .sem
            .acquire()
            .await
            .map_err(|e| MemoryError::Embedding(e.to_string()))?;
        let url = format!("{}/api/embed", self.base);
        let body = EmbedReq {
            model: &self.model,
            input: text,
        };

        let resp = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| MemoryError::Embedding(format!("POST {url} failed: {e}")))?
            .error_for_status()
            .map_err(|e| MemoryError::Embedding(format!("non-2xx from {url}: {e}")))?
            .json::<EmbedResp>()
            .await
            .map_err(|e| MemoryError::Embedding(format!("invalid embed response: {e}")))?;

        let vector = if let Some(v) = resp.embedding {
            v
        } else if let Some(vs) = resp.embeddings {
            vs.into_iter()
                .next()
                .ok_or_else(|| MemoryError::Embedding("empty embeddings".into()))?
        } else {
            return Err(MemoryError::Embedding("no embedding returned".into()));
        };

        if vector.len() != self.dim {
            return Err(MemoryError::VectorSizeMismatch {
                got: vector.len(),
                want: self.dim,
            });
        }
        Ok(vector)
    }
}

impl EmbeddingProvider for OllamaEmbedder {
    fn embed_documents<'a>(&'a self, texts: &'a [String]) -> EmbedFuture<'a, Vec<Vec<f32>>> {
        Box::pin(async move {
            let par = self.sem.available_permits().max(1);
            let futs: Vec<_> = texts.iter().map(|t| self.embed_one(t)).collect();
            let results = stream::iter(futs)
                .buffered(par)
                .collect::<Vec<_>>()
                .await;

            let mut out = Vec::with_capacity(results.len());
            for r in results {
                out.push(r?);
            }
            Ok(out)
        })
    }

    fn embed_query<'a>(&'a self, text: &'a str) -> EmbedFuture<'a, Vec<f32>> {
        Box::pin(self.embed_one(text))
    }

    fn vector_size(&self) -> usize {
        self.dim
    }

    fn vector_name(&self) -> Option<String> {
        self.vector_name.clone()
    }
}
