//! # promo-rag
//!
//! The PromoSensei retrieval-augmented answering pipeline.
//!
//! Wires the embedder, offer index, and generator into one service:
//! - [`ingest::OfferIngestor`] deduplicates and indexes scraped offers
//! - [`retrieve::Retriever`] fetches the top-K offers for a question
//! - [`prompt::PromptBuilder`] renders retrieved offers into a bounded prompt
//! - [`answer::PromoSensei`] orchestrates the whole answer flow
//!
//! Dependencies are injected explicitly so tests can substitute doubles for
//! the embedding and generation models.

pub mod answer;
pub mod error;
pub mod ingest;
pub mod prompt;
pub mod retrieve;

#[cfg(test)]
pub(crate) mod testutil;

pub use answer::{PromoSensei, NO_OFFERS_MESSAGE};
pub use error::RagError;
pub use ingest::{load_offers, OfferIngestor};
pub use prompt::PromptBuilder;
pub use retrieve::Retriever;
