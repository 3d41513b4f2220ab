//! Deduplicating offer ingestion.
//!
//! Offers arrive as a JSON snapshot written by the scraping layer. Ingestion
//! filters out records without a link (no identity), records whose link is
//! already indexed, and intra-batch duplicates, then embeds the remainder in
//! one batch and upserts them. Because `OfferIndex::exists` reads persistent
//! storage, re-running ingestion after a restart or refresh only adds links
//! never seen in any process lifetime.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info, warn};

use promo_embeddings::EmbeddingModel;
use promo_index::OfferIndex;
use promo_types::{OfferMetadata, OfferRecord};

use crate::error::RagError;

/// Load an offer snapshot from a JSON file.
///
/// A missing or unparseable file is not fatal: ingestion is best-effort at
/// startup, so both cases degrade to an empty snapshot with a warning.
pub fn load_offers(path: &Path) -> Vec<OfferRecord> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) => {
            warn!(path = ?path, error = %e, "Offers file unreadable, treating as empty");
            return Vec::new();
        }
    };

    match serde_json::from_str::<Vec<OfferRecord>>(&raw) {
        Ok(offers) => {
            debug!(path = ?path, count = offers.len(), "Loaded offer snapshot");
            offers
        }
        Err(e) => {
            warn!(path = ?path, error = %e, "Offers file malformed, treating as empty");
            Vec::new()
        }
    }
}

/// Accepted offer waiting for its embedding.
struct PendingOffer {
    link: String,
    document: String,
    metadata: OfferMetadata,
}

/// Deduplicating ingestor.
pub struct OfferIngestor<E: EmbeddingModel> {
    embedder: Arc<E>,
    index: Arc<OfferIndex>,
}

impl<E: EmbeddingModel> OfferIngestor<E> {
    pub fn new(embedder: Arc<E>, index: Arc<OfferIndex>) -> Self {
        Self { embedder, index }
    }

    /// Index every offer not seen before. Returns the number newly added.
    ///
    /// The whole batch is embedded in a single call; if embedding fails,
    /// nothing is upserted. A crash mid-upsert can leave a partial batch
    /// committed, which the next run simply skips over.
    pub fn ingest_new(&self, offers: &[OfferRecord]) -> Result<usize, RagError> {
        let mut pending: Vec<PendingOffer> = Vec::new();
        let mut batch_links: HashSet<String> = HashSet::new();

        for offer in offers {
            if !offer.is_indexable() {
                debug!(title = %offer.title, "Offer without link, skipping");
                continue;
            }
            let link = offer.link.trim();
            if batch_links.contains(link) {
                debug!(link = %link, "Duplicate within snapshot, skipping");
                continue;
            }
            if self.index.exists(link)? {
                debug!(link = %link, "Already indexed, skipping");
                continue;
            }

            batch_links.insert(link.to_string());
            pending.push(PendingOffer {
                link: link.to_string(),
                document: offer.embed_text(),
                metadata: offer.metadata(),
            });
        }

        if pending.is_empty() {
            debug!("No new offers to ingest");
            return Ok(0);
        }

        info!(count = pending.len(), "Embedding new offers");
        let documents: Vec<&str> = pending.iter().map(|p| p.document.as_str()).collect();
        let embeddings = self.embedder.embed_batch(&documents)?;

        for (offer, embedding) in pending.iter().zip(embeddings.iter()) {
            self.index
                .upsert(&offer.link, embedding, &offer.document, &offer.metadata)?;
        }
        self.index.save()?;

        info!(added = pending.len(), total = self.index.len(), "Ingest complete");
        Ok(pending.len())
    }
}
