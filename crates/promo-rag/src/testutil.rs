//! Deterministic test doubles for the pipeline.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::PathBuf;
use std::sync::Mutex;

use tempfile::TempDir;

use promo_embeddings::{Embedding, EmbeddingError, EmbeddingModel, ModelInfo};
use promo_generate::{GenerateError, TextGenerator};
use promo_types::OfferRecord;

/// Embedder that hashes words into vector buckets.
///
/// Texts sharing words land near each other, which is enough signal for
/// retrieval-ordering tests without any model download.
pub(crate) struct MockEmbedder {
    info: ModelInfo,
}

impl MockEmbedder {
    pub(crate) fn new(dimension: usize) -> Self {
        Self {
            info: ModelInfo {
                name: "mock".to_string(),
                dimension,
                max_sequence_length: 256,
            },
        }
    }
}

impl EmbeddingModel for MockEmbedder {
    fn info(&self) -> &ModelInfo {
        &self.info
    }

    fn embed(&self, text: &str) -> Result<Embedding, EmbeddingError> {
        let dim = self.info.dimension;
        let mut values = vec![0.0f32; dim];
        for word in text
            .to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            let mut hasher = DefaultHasher::new();
            word.hash(&mut hasher);
            values[(hasher.finish() % dim as u64) as usize] += 1.0;
        }
        // Guarantee a nonzero vector even for wordless input.
        values[0] += 0.01;
        Ok(Embedding::new(values))
    }
}

/// Embedder that always fails, for error-propagation tests.
pub(crate) struct FailingEmbedder {
    info: ModelInfo,
}

impl FailingEmbedder {
    pub(crate) fn new(dimension: usize) -> Self {
        Self {
            info: ModelInfo {
                name: "failing".to_string(),
                dimension,
                max_sequence_length: 256,
            },
        }
    }
}

impl EmbeddingModel for FailingEmbedder {
    fn info(&self) -> &ModelInfo {
        &self.info
    }

    fn embed(&self, _text: &str) -> Result<Embedding, EmbeddingError> {
        Err(EmbeddingError::Download("embedding backend unavailable".to_string()))
    }

    fn embed_batch(&self, _texts: &[&str]) -> Result<Vec<Embedding>, EmbeddingError> {
        Err(EmbeddingError::Download("embedding backend unavailable".to_string()))
    }
}

/// Generator that records every prompt and returns a fixed reply.
pub(crate) struct RecordingGenerator {
    prompts: Mutex<Vec<String>>,
    reply: String,
}

impl RecordingGenerator {
    pub(crate) fn new(reply: &str) -> Self {
        Self {
            prompts: Mutex::new(Vec::new()),
            reply: reply.to_string(),
        }
    }

    pub(crate) fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    pub(crate) fn last_prompt(&self) -> Option<String> {
        self.prompts.lock().unwrap().last().cloned()
    }
}

impl TextGenerator for RecordingGenerator {
    fn generate(&self, prompt: &str) -> Result<String, GenerateError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        Ok(self.reply.clone())
    }
}

/// Generator that always fails, for error-propagation tests.
pub(crate) struct FailingGenerator;

impl TextGenerator for FailingGenerator {
    fn generate(&self, _prompt: &str) -> Result<String, GenerateError> {
        Err(GenerateError::Tokenizer("model unavailable".to_string()))
    }
}

/// Build an offer record with the fields the tests care about.
pub(crate) fn offer(title: &str, description: &str, brand: &str, link: &str) -> OfferRecord {
    OfferRecord {
        title: title.to_string(),
        description: description.to_string(),
        brand: brand.to_string(),
        link: link.to_string(),
        ..Default::default()
    }
}

/// Write an offers snapshot into a temp dir and return its path.
pub(crate) fn offers_file(temp: &TempDir, json: &str) -> PathBuf {
    let path = temp.path().join("offers.json");
    std::fs::write(&path, json).unwrap();
    path
}
