//! Pipeline error types.

use thiserror::Error;

/// Errors surfaced by the answering pipeline.
///
/// Ingestion-time source problems (missing or malformed offers file) are not
/// errors at all; they degrade to an empty snapshot and a warning. Model and
/// index failures always propagate.
#[derive(Debug, Error)]
pub enum RagError {
    /// Embedding model failure
    #[error("Embedding error: {0}")]
    Embedding(#[from] promo_embeddings::EmbeddingError),

    /// Vector index failure
    #[error("Index error: {0}")]
    Index(#[from] promo_index::IndexError),

    /// Generation model failure
    #[error("Generation error: {0}")]
    Generate(#[from] promo_generate::GenerateError),
}
