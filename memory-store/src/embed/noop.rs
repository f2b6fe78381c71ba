//! Deterministic stand-in provider for tests and dry runs.

use crate::embed::{EmbedFuture, EmbeddingProvider};

/// Produces fixed-size zero vectors and never performs I/O.
#[derive(Clone)]
pub struct NoopEmbedder {
    dim: usize,
    vector_name: Option<String>,
}

impl NoopEmbedder {
    pub fn new(dim: usize, vector_name: Option<String>) -> Self {
        Self { dim, vector_name }
    }
}

impl EmbeddingProvider for NoopEmbedder {
    fn embed_documents<'a>(&'a self, texts: &'a [String]) -> EmbedFuture<'a, Vec<Vec<f32>>> {
        let out = vec![vec![0.0; self.dim]; texts.len()];
        Box::pin(async move { Ok(out) })
    }

    fn embed_query<'a>(&'a self, _text: &'a str) -> EmbedFuture<'a, Vec<f32>> {
        let dim = self.dim;
        Box::pin(async move { Ok(vec![0.0; dim]) })
    }

    fn vector_size(&self) -> usize {
        self.dim
    }

    fn vector_name(&self) -> Option<String> {
        self.vector_name.clone()
    }
}
