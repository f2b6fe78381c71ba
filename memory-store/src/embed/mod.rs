use crate::errors::MemoryError;
use std::{future::Future, pin::Pin};

/// Boxed future used at the provider seam.
///
/// Async is required because most real providers (Ollama, OpenAI, etc.)
/// perform HTTP requests.
pub type EmbedFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, MemoryError>> + Send + 'a>>;

/// Provider interface for embedding generation.
///
/// Implement this trait to plug in your own embedding backend
/// (e.g., Ollama, OpenAI, local models).
pub trait EmbeddingProvider: Send + Sync {
    /// Embeds a batch of documents, one vector per input text.
    fn embed_documents<'a>(&'a self, texts: &'a [String]) -> EmbedFuture<'a, Vec<Vec<f32>>>;

    /// Embeds a single query text.
    fn embed_query<'a>(&'a self, text: &'a str) -> EmbedFuture<'a, Vec<f32>>;

    /// Dimensionality of the vectors this provider produces.
    fn vector_size(&self) -> usize;

    /// Named-vector identifier, if the provider uses one. `None` means the
    /// collection is created with a single unnamed vector (legacy layout).
    fn vector_name(&self) -> Option<String>;
}

pub mod noop;
pub mod ollama;
