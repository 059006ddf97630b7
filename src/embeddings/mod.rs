// Embeddings module
// Content chunking plus the embedding model seam and its Ollama implementation

pub mod chunking;
pub mod ollama;

pub use chunking::{
    ChunkingConfig, ContentChunk, chunk_document, chunk_documents, estimate_token_count,
};
pub use ollama::OllamaClient;

use crate::Result;

/// Maps text to a fixed-dimension vector.
///
/// Implementations must be deterministic: identical input text always yields
/// the same vector, and every vector from one embedder has the same length.
pub trait Embedder: Send + Sync {
    /// Identity of the underlying model, recorded on every index it builds
    fn model_id(&self) -> &str;

    fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed several texts, returning vectors in input order
    #[inline]
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        texts.iter().map(|text| self.embed(text)).collect()
    }
}
