// Answer engine module
// Retrieves the closest chunks for a question and asks the generator to answer from them


use std::sync::Arc;
use tracing::{debug, error};

use crate::{FaqError, Result};
use crate::embeddings::Embedder;
use crate::index::{SearchResult, VectorIndex};

/// Reply used for every question while no knowledge base is loaded
pub const KNOWLEDGE_BASE_UNAVAILABLE: &str =
    "⚠️ Knowledge base not loaded. Please upload FAQ/Resume.";

/// Prefix of the reply produced when answering a question fails
pub const GENERATION_ERROR_PREFIX: &str = "⚠️ Error generating response";

pub const DEFAULT_TOP_K: usize = 3;

/// Writes a natural-language answer from retrieved context
pub trait Generator: Send + Sync {
    fn generate(&self, context: &str, question: &str) -> Result<String>;
}

/// Question answering prompt that stuffs all retrieved context in front of the question
#[inline]
pub fn build_prompt(context: &str, question: &str) -> String {
    format!(
        "Use the following pieces of context to answer the question at the end. \
         If you don't know the answer, just say that you don't know, \
         don't try to make up an answer.\n\n{context}\n\nQuestion: {question}\nHelpful Answer:"
    )
}

pub struct AnswerEngine {
    embedder: Arc<dyn Embedder>,
    generator: Arc<dyn Generator>,
    top_k: usize,
}

impl AnswerEngine {
    /// `embedder` must be the one the index was built with
    #[inline]
    pub fn new(embedder: Arc<dyn Embedder>, generator: Arc<dyn Generator>) -> Self {
        Self {
            embedder,
            generator,
            top_k: DEFAULT_TOP_K,
        }
    }

    #[inline]
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    #[inline]
    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// Answer `question` from `index`.
    ///
    /// Never fails: a missing index yields [`KNOWLEDGE_BASE_UNAVAILABLE`] and
    /// any error along the way becomes a reply starting with
    /// [`GENERATION_ERROR_PREFIX`]. Failed generations are not retried.
    #[inline]
    pub fn answer(&self, question: &str, index: Option<&VectorIndex>) -> String {
        self.answer_with_sources(question, index).0
    }

    /// Like [`AnswerEngine::answer`], also returning the chunks the answer was
    /// generated from. Sources are empty when retrieval did not happen or failed.
    #[inline]
    pub fn answer_with_sources(
        &self,
        question: &str,
        index: Option<&VectorIndex>,
    ) -> (String, Vec<SearchResult>) {
        let Some(index) = index else {
            debug!("No knowledge base, returning advisory answer");
            return (KNOWLEDGE_BASE_UNAVAILABLE.to_string(), Vec::new());
        };

        let results = match self.retrieve(question, index) {
            Ok(results) => results,
            Err(e) => return (failure_reply(&e), Vec::new()),
        };

        match self.generate_from(question, &results) {
            Ok(answer) => {
                debug!(stage = "done", "Answered question");
                (answer, results)
            }
            Err(e) => (failure_reply(&e), results),
        }
    }

    /// Embed `question` and return the closest chunks from `index`
    #[inline]
    pub fn retrieve(&self, question: &str, index: &VectorIndex) -> Result<Vec<SearchResult>> {
        debug!(stage = "embedding_query", "Embedding question");
        index.check_model(self.embedder.model_id())?;
        let query = self.embedder.embed(question)?;

        debug!(stage = "retrieving", top_k = self.top_k, "Searching index");
        index.search(&query, self.top_k)
    }

    fn generate_from(&self, question: &str, results: &[SearchResult]) -> Result<String> {
        let context = results
            .iter()
            .map(|r| r.chunk.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");

        debug!(
            stage = "generating",
            chunks = results.len(),
            "Generating answer"
        );
        self.generator.generate(&context, question)
    }
}

fn failure_reply(error: &FaqError) -> String {
    error!(stage = "failed", "Failed to answer question: {}", error);
    format!("{GENERATION_ERROR_PREFIX}: {error}")
}
