//! # promo-embeddings
//!
//! Local sentence embeddings for PromoSensei.
//!
//! Maps offer text and user questions to 384-dimensional vectors using
//! all-MiniLM-L6-v2 running on Candle. The [`EmbeddingModel`] trait is the
//! seam the rest of the pipeline depends on, so tests can substitute a
//! deterministic double.

pub mod candle;
pub mod error;
pub mod hub;
pub mod model;

pub use candle::{CandleEmbedder, EMBEDDING_DIM};
pub use error::EmbeddingError;
pub use hub::HubModel;
pub use model::{Embedding, EmbeddingModel, ModelInfo};
