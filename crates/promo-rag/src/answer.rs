//! The PromoSensei answering service.
//!
//! Construction wires the injected embedder, index, and generator together
//! and runs the one-time startup ingest against the current offer snapshot.
//! After that the service is ready; `answer` never mutates the index.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{error, info};

use promo_embeddings::EmbeddingModel;
use promo_generate::TextGenerator;
use promo_index::OfferIndex;
use promo_types::PromoConfig;

use crate::error::RagError;
use crate::ingest::{load_offers, OfferIngestor};
use crate::prompt::PromptBuilder;
use crate::retrieve::Retriever;

/// Fixed reply when retrieval finds nothing. Reserved strictly for the
/// zero-results case; infrastructure failures surface as errors instead.
pub const NO_OFFERS_MESSAGE: &str = "Sorry, I couldn't find any relevant offers right now.";

/// The retrieval-augmented answering service.
pub struct PromoSensei<E: EmbeddingModel, G: TextGenerator> {
    ingestor: OfferIngestor<E>,
    retriever: Retriever<E>,
    prompt: PromptBuilder,
    generator: Arc<G>,
    offers_path: PathBuf,
}

impl<E: EmbeddingModel, G: TextGenerator> PromoSensei<E, G> {
    /// Build the service and run the startup ingest.
    ///
    /// Startup ingestion is best-effort: a missing or malformed snapshot
    /// means zero offers, and even an embedding failure here only logs an
    /// error. Query-time failures are never absorbed.
    pub fn new(
        embedder: Arc<E>,
        index: Arc<OfferIndex>,
        generator: Arc<G>,
        config: &PromoConfig,
    ) -> Self {
        let service = Self {
            ingestor: OfferIngestor::new(embedder.clone(), index.clone()),
            retriever: Retriever::new(embedder, index, config.top_k),
            prompt: PromptBuilder::default(),
            generator,
            offers_path: config.offers_path.clone(),
        };

        match service.refresh() {
            Ok(added) => info!(added = added, "Startup ingest complete"),
            Err(e) => error!(error = %e, "Startup ingest failed, continuing with existing index"),
        }

        service
    }

    /// Re-ingest the current offer snapshot.
    ///
    /// Only links never seen before are added, including across process
    /// restarts; the external refresh collaborator rewrites the snapshot
    /// file before calling this.
    pub fn refresh(&self) -> Result<usize, RagError> {
        let offers = load_offers(&self.offers_path);
        self.ingestor.ingest_new(&offers)
    }

    /// Answer a free-text question from the indexed offers.
    pub fn answer(&self, question: &str) -> Result<String, RagError> {
        let retrieved = self.retriever.retrieve(question)?;
        if retrieved.is_empty() {
            info!(question = %question, "No relevant offers retrieved");
            return Ok(NO_OFFERS_MESSAGE.to_string());
        }

        let prompt = self.prompt.build(&retrieved, question);
        let generated = self.generator.generate(&prompt)?;
        Ok(generated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{offers_file, MockEmbedder, RecordingGenerator};
    use promo_index::IndexConfig;
    use tempfile::TempDir;

    fn service(
        temp: &TempDir,
        offers_json: &str,
    ) -> PromoSensei<MockEmbedder, RecordingGenerator> {
        let config = PromoConfig {
            offers_path: offers_file(temp, offers_json),
            data_dir: temp.path().join("data"),
            top_k: 3,
            refresh_command: None,
        };
        let index = Arc::new(
            OfferIndex::open_or_create(IndexConfig::new(64, config.index_dir())).unwrap(),
        );
        PromoSensei::new(
            Arc::new(MockEmbedder::new(64)),
            index,
            Arc::new(RecordingGenerator::new("Brand X has 50% off shoes!")),
            &config,
        )
    }

    #[test]
    fn test_empty_index_returns_apology_without_generating() {
        let temp = TempDir::new().unwrap();
        let service = service(&temp, "[]");

        let reply = service.answer("any shoe deals?").unwrap();
        assert_eq!(reply, NO_OFFERS_MESSAGE);
        assert_eq!(service.generator.calls(), 0);
    }

    #[test]
    fn test_missing_snapshot_is_not_fatal() {
        let temp = TempDir::new().unwrap();
        let config = PromoConfig {
            offers_path: temp.path().join("nonexistent.json"),
            data_dir: temp.path().join("data"),
            top_k: 3,
            refresh_command: None,
        };
        let index = Arc::new(
            OfferIndex::open_or_create(IndexConfig::new(64, config.index_dir())).unwrap(),
        );
        let service = PromoSensei::new(
            Arc::new(MockEmbedder::new(64)),
            index,
            Arc::new(RecordingGenerator::new("reply")),
            &config,
        );

        assert_eq!(service.answer("anything?").unwrap(), NO_OFFERS_MESSAGE);
    }

    #[test]
    fn test_end_to_end_shoe_deal() {
        let temp = TempDir::new().unwrap();
        let service = service(
            &temp,
            r#"[{"title":"Flat 50% off","description":"on shoes","brand":"X","link":"https://a/1","discount":"50%","expiry":""}]"#,
        );

        let reply = service.answer("any shoe deals?").unwrap();
        assert!(!reply.is_empty());
        assert_eq!(service.generator.calls(), 1);

        // The constructed prompt must ground the answer in the offer.
        let prompt = service.generator.last_prompt().unwrap();
        assert!(prompt.contains("Flat 50% off. on shoes"));
        assert!(prompt.contains("Brand: X"));
        assert!(prompt.contains("Discount: 50%"));
        assert!(prompt.contains("Expiry: N/A"));
        assert!(prompt.contains("User asked: any shoe deals?"));
    }

    #[test]
    fn test_refresh_adds_only_unseen_links() {
        let temp = TempDir::new().unwrap();
        let service = service(
            &temp,
            r#"[{"title":"Flat 50% off","description":"on shoes","brand":"X","link":"https://a/1"}]"#,
        );

        // Same snapshot: nothing new.
        assert_eq!(service.refresh().unwrap(), 0);

        // Refreshed snapshot with one old and one new link.
        std::fs::write(
            &service.offers_path,
            r#"[{"title":"Flat 50% off","description":"on shoes","brand":"X","link":"https://a/1"},
               {"title":"New deal","description":"on bags","brand":"Y","link":"https://a/2"}]"#,
        )
        .unwrap();
        assert_eq!(service.refresh().unwrap(), 1);
    }

    #[test]
    fn test_answer_propagates_embedder_failure() {
        use crate::testutil::FailingEmbedder;

        let temp = TempDir::new().unwrap();
        let config = PromoConfig {
            offers_path: temp.path().join("nonexistent.json"),
            data_dir: temp.path().join("data"),
            top_k: 3,
            refresh_command: None,
        };
        let index = Arc::new(
            OfferIndex::open_or_create(IndexConfig::new(64, config.index_dir())).unwrap(),
        );
        let service = PromoSensei::new(
            Arc::new(FailingEmbedder::new(64)),
            index,
            Arc::new(RecordingGenerator::new("reply")),
            &config,
        );

        // Query-time embedding failure surfaces as an error, and nothing
        // reaches the generator.
        assert!(matches!(
            service.answer("any shoe deals?"),
            Err(RagError::Embedding(_))
        ));
        assert_eq!(service.generator.calls(), 0);
    }

    #[test]
    fn test_answer_propagates_generator_failure() {
        use crate::testutil::FailingGenerator;

        let temp = TempDir::new().unwrap();
        let config = PromoConfig {
            offers_path: offers_file(
                &temp,
                r#"[{"title":"Flat 50% off","description":"on shoes","brand":"X","link":"https://a/1"}]"#,
            ),
            data_dir: temp.path().join("data"),
            top_k: 3,
            refresh_command: None,
        };
        let index = Arc::new(
            OfferIndex::open_or_create(IndexConfig::new(64, config.index_dir())).unwrap(),
        );
        let service = PromoSensei::new(
            Arc::new(MockEmbedder::new(64)),
            index,
            Arc::new(FailingGenerator),
            &config,
        );

        // Model failure surfaces as an error, never as the canned message.
        assert!(matches!(
            service.answer("any shoe deals?"),
            Err(RagError::Generate(_))
        ));
    }
}
