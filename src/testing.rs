// Deterministic stand-ins for the embedding and generation models

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::answer::Generator;
use crate::documents::{Document, DocumentMetadata};
use crate::embeddings::Embedder;
use crate::{FaqError, Result};

const BUCKETS: usize = 256;

/// Bag-of-words embedder hashing lowercase words into fixed buckets
pub(crate) struct WordHashEmbedder {
    model: String,
    calls: AtomicUsize,
}

impl WordHashEmbedder {
    pub(crate) fn new(model: &str) -> Self {
        Self {
            model: model.to_string(),
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of texts embedded so far
    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Embedder for WordHashEmbedder {
    fn model_id(&self) -> &str {
        &self.model
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut vector = vec![0.0; BUCKETS];
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            let bucket = fnv1a(&word.to_lowercase()) as usize % BUCKETS;
            vector[bucket] += 1.0;
        }
        Ok(vector)
    }
}

fn fnv1a(word: &str) -> u64 {
    word.bytes().fold(0xcbf2_9ce4_8422_2325, |hash, byte| {
        (hash ^ u64::from(byte)).wrapping_mul(0x0100_0000_01b3)
    })
}

/// Embedder that always fails
pub(crate) struct BrokenEmbedder;

impl Embedder for BrokenEmbedder {
    fn model_id(&self) -> &str {
        "broken"
    }

    fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Err(FaqError::Embedding("connection refused".to_string()))
    }
}

/// Generator that records its inputs and replies with the first context line
#[derive(Default)]
pub(crate) struct RecordingGenerator {
    pub(crate) calls: Mutex<Vec<(String, String)>>,
}

impl Generator for RecordingGenerator {
    fn generate(&self, context: &str, question: &str) -> Result<String> {
        self.calls
            .lock()
            .expect("lock is not poisoned")
            .push((context.to_string(), question.to_string()));
        Ok(context.lines().next().unwrap_or_default().to_string())
    }
}

/// Generator that fails on every call, counting attempts
#[derive(Default)]
pub(crate) struct FailingGenerator {
    pub(crate) calls: AtomicUsize,
}

impl Generator for FailingGenerator {
    fn generate(&self, _context: &str, _question: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(FaqError::Generation("model ran out of memory".to_string()))
    }
}

pub(crate) fn faq_document(content: &str) -> Document {
    Document {
        content: content.to_string(),
        metadata: DocumentMetadata {
            source: "faq.txt".to_string(),
            content_type: "text/plain".to_string(),
            page: None,
        },
    }
}
