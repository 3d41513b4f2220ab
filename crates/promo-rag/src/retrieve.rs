//! Top-K offer retrieval.

use std::sync::Arc;

use tracing::debug;

use promo_embeddings::EmbeddingModel;
use promo_index::{OfferIndex, RetrievedOffer};

use crate::error::RagError;

/// Embeds a question and fetches the nearest offers from the index.
///
/// Results come back exactly as the index ranks them; there is no re-ranking
/// layer.
pub struct Retriever<E: EmbeddingModel> {
    embedder: Arc<E>,
    index: Arc<OfferIndex>,
    top_k: usize,
}

impl<E: EmbeddingModel> Retriever<E> {
    pub fn new(embedder: Arc<E>, index: Arc<OfferIndex>, top_k: usize) -> Self {
        Self {
            embedder,
            index,
            top_k,
        }
    }

    /// Retrieve the configured top-K offers for a question.
    pub fn retrieve(&self, question: &str) -> Result<Vec<RetrievedOffer>, RagError> {
        self.retrieve_k(question, self.top_k)
    }

    /// Retrieve with an explicit K.
    pub fn retrieve_k(&self, question: &str, k: usize) -> Result<Vec<RetrievedOffer>, RagError> {
        let embedding = self.embedder.embed(question)?;
        let results = self.index.query(&embedding, k)?;
        debug!(question = %question, k = k, found = results.len(), "Retrieved offers");
        Ok(results)
    }
}
