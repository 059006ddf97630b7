// Vector index module
// In-memory nearest-neighbour index over embedded chunks, built at most once per cache


use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info};

use crate::config::SourcesConfig;
use crate::documents::{Document, configured_sources, load_documents};
use crate::embeddings::{ChunkingConfig, ContentChunk, Embedder, chunk_documents};
use crate::{FaqError, Result};

/// Search result from vector similarity search
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    pub chunk: ContentChunk,
    /// Cosine distance, `1 - cosine_similarity`; lower is closer
    pub distance: f32,
}

/// Read-only collection of embedded chunks supporting exact k-NN lookup
#[derive(Debug, Clone, PartialEq)]
pub struct VectorIndex {
    model_id: String,
    dimension: usize,
    chunks: Vec<ContentChunk>,
    vectors: Vec<Vec<f32>>,
}

impl VectorIndex {
    /// Pair chunks with their vectors. Every vector must have the same length.
    #[inline]
    pub fn new(
        model_id: impl Into<String>,
        chunks: Vec<ContentChunk>,
        vectors: Vec<Vec<f32>>,
    ) -> Result<Self> {
        if chunks.len() != vectors.len() {
            return Err(FaqError::Embedding(format!(
                "{} chunks but {} embeddings",
                chunks.len(),
                vectors.len()
            )));
        }

        let dimension = vectors.first().map_or(0, Vec::len);
        if let Some(bad) = vectors.iter().find(|v| v.len() != dimension) {
            return Err(FaqError::DimensionMismatch {
                expected: dimension,
                actual: bad.len(),
            });
        }

        Ok(Self {
            model_id: model_id.into(),
            dimension,
            chunks,
            vectors,
        })
    }

    #[inline]
    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    /// Vector length, zero for an index without chunks
    #[inline]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    #[inline]
    pub fn chunks(&self) -> &[ContentChunk] {
        &self.chunks
    }

    /// Reject queries embedded by a different model than the index
    #[inline]
    pub fn check_model(&self, model_id: &str) -> Result<()> {
        if self.model_id != model_id {
            return Err(FaqError::ModelMismatch {
                index: self.model_id.clone(),
                query: model_id.to_string(),
            });
        }
        Ok(())
    }

    /// Up to `k` nearest chunks in ascending distance. Ties keep insertion order.
    #[inline]
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchResult>> {
        if self.is_empty() || k == 0 {
            return Ok(Vec::new());
        }

        if query.len() != self.dimension {
            return Err(FaqError::DimensionMismatch {
                expected: self.dimension,
                actual: query.len(),
            });
        }

        let mut scored: Vec<(usize, f32)> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(i, vector)| (i, 1.0 - cosine_similarity(query, vector)))
            .collect();
        scored.sort_by(|a, b| a.1.total_cmp(&b.1));

        Ok(scored
            .into_iter()
            .take(k)
            .map(|(i, distance)| SearchResult {
                chunk: self.chunks[i].clone(),
                distance,
            })
            .collect())
    }
}

/// Compute cosine similarity between two vectors of equal length.
///
/// Returns a value in [-1, 1]; zero vectors score 0.
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a * norm_b)
}

/// Chunk, embed and index `documents`.
///
/// Returns `Ok(None)` when there are no documents, without touching the
/// embedder.
#[inline]
pub fn build_index(
    documents: &[Document],
    embedder: &dyn Embedder,
    chunking: &ChunkingConfig,
) -> Result<Option<VectorIndex>> {
    if documents.is_empty() {
        info!("No documents loaded, knowledge base unavailable");
        return Ok(None);
    }

    let chunks = chunk_documents(documents, chunking)?;
    let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();

    debug!(
        "Embedding {} chunks with {}",
        texts.len(),
        embedder.model_id()
    );
    let vectors = if texts.is_empty() {
        Vec::new()
    } else {
        embedder.embed_batch(&texts)?
    };

    let index = VectorIndex::new(embedder.model_id(), chunks, vectors)?;
    info!(
        "Built index with {} chunks ({} dimensions) from {} documents",
        index.len(),
        index.dimension(),
        documents.len()
    );

    Ok(Some(index))
}

type BuildFn = dyn Fn() -> Result<Option<VectorIndex>> + Send + Sync;

/// Lazily built, memoized knowledge base index.
///
/// The build closure runs at most once per cache, even when several threads
/// ask for the index at the same time. Failed builds are not cached.
pub struct IndexCache {
    build: Box<BuildFn>,
    slot: Mutex<Option<Option<Arc<VectorIndex>>>>,
}

impl IndexCache {
    #[inline]
    pub fn new<F>(build: F) -> Self
    where
        F: Fn() -> Result<Option<VectorIndex>> + Send + Sync + 'static,
    {
        Self {
            build: Box::new(build),
            slot: Mutex::new(None),
        }
    }

    /// Cache that loads the configured sources and indexes them with `embedder`
    #[inline]
    pub fn for_sources(
        sources: SourcesConfig,
        chunking: ChunkingConfig,
        embedder: Arc<dyn Embedder>,
    ) -> Self {
        Self::new(move || {
            let report = load_documents(&configured_sources(&sources), sources.max_file_size);
            build_index(&report.documents, embedder.as_ref(), &chunking)
        })
    }

    #[inline]
    pub fn get_or_build(&self) -> Result<Option<Arc<VectorIndex>>> {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(cached) = slot.as_ref() {
            debug!("Using cached knowledge base index");
            return Ok(cached.clone());
        }

        let built = (self.build)()?.map(Arc::new);
        *slot = Some(built.clone());
        Ok(built)
    }

    #[inline]
    pub fn is_built(&self) -> bool {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Drop the cached result so the next access rebuilds
    #[inline]
    pub fn reset(&self) {
        info!("Resetting knowledge base index cache");
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}
