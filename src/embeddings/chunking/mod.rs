
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::documents::{Document, DocumentMetadata};
use crate::{FaqError, Result};

/// Represents a chunk of a document ready for embedding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentChunk {
    /// The chunk text
    pub content: String,
    /// Metadata of the document this chunk was cut from
    pub metadata: DocumentMetadata,
    /// The index of this chunk within its document
    pub chunk_index: usize,
    /// Estimated token count
    pub token_count: usize,
}

/// Configuration for content chunking. Sizes are measured in characters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Maximum chunk length
    pub chunk_size: usize,
    /// Characters shared by adjacent chunks of the same document
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    #[inline]
    fn default() -> Self {
        Self {
            chunk_size: 500,
            chunk_overlap: 100,
        }
    }
}

impl ChunkingConfig {
    #[inline]
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(FaqError::Config("chunk size must be positive".to_string()));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(FaqError::Config(format!(
                "chunk overlap ({}) must be smaller than chunk size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        Ok(())
    }
}

/// Chunk every document, preserving document order
#[inline]
pub fn chunk_documents(
    documents: &[Document],
    config: &ChunkingConfig,
) -> Result<Vec<ContentChunk>> {
    config.validate()?;

    let mut chunks = Vec::new();
    for document in documents {
        chunks.extend(chunk_document(document, config)?);
    }

    debug!(
        "Chunked {} documents into {} chunks (avg {} tokens)",
        documents.len(),
        chunks.len(),
        chunks.iter().map(|c| c.token_count).sum::<usize>() / chunks.len().max(1)
    );

    Ok(chunks)
}

/// Chunk a single document into fixed-size windows.
///
/// Each chunk after the first starts `chunk_overlap` characters before the
/// end of its predecessor. Only the last chunk may be shorter than
/// `chunk_size`.
#[inline]
pub fn chunk_document(document: &Document, config: &ChunkingConfig) -> Result<Vec<ContentChunk>> {
    config.validate()?;

    let chunks = split_chars(&document.content, config.chunk_size, config.chunk_overlap)
        .into_iter()
        .enumerate()
        .map(|(chunk_index, content)| ContentChunk {
            token_count: estimate_token_count(&content),
            content,
            metadata: document.metadata.clone(),
            chunk_index,
        })
        .collect();

    Ok(chunks)
}

fn split_chars(text: &str, chunk_size: usize, overlap: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let step = chunk_size - overlap;
    let mut splits = Vec::new();
    let mut start = 0;

    while start < chars.len() {
        let end = (start + chunk_size).min(chars.len());
        splits.push(chars[start..end].iter().collect());
        if end == chars.len() {
            break;
        }
        start += step;
    }

    splits
}

/// Estimate token count using a simple heuristic
/// This is a rough approximation - actual tokenization would be more accurate
#[inline]
pub fn estimate_token_count(text: &str) -> usize {
    // Rough heuristic: 1 token ≈ 0.75 words for English text
    // Add extra tokens for punctuation and special characters
    let word_count = text.split_whitespace().count();
    let punct_count = text.chars().filter(|c| c.is_ascii_punctuation()).count();

    (punct_count as f64).mul_add(0.1, word_count as f64 / 0.75) as usize
}
