//! # promo-index
//!
//! Persistent vector index for PromoSensei offers.
//!
//! Combines a usearch HNSW index (similarity search over embeddings) with a
//! RocksDB document store (offer text + metadata, keyed by offer link). The
//! document store is the system of record for identity: `exists(link)` reads
//! it directly, so deduplication survives process restarts.

pub mod error;
pub mod index;

pub use error::IndexError;
pub use index::{IndexConfig, IndexStats, OfferIndex, RetrievedOffer};
