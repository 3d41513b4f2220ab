//! Candle-based embedder using all-MiniLM-L6-v2.
//!
//! Runs the BERT encoder on CPU, mean-pools token embeddings under the
//! attention mask, and L2-normalizes the result.

use std::path::Path;

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config as BertConfig};
use tokenizers::Tokenizer;
use tracing::{debug, info};

use crate::error::EmbeddingError;
use crate::hub::HubModel;
use crate::model::{Embedding, EmbeddingModel, ModelInfo};

/// Embedding model repository on HuggingFace.
pub const EMBED_MODEL_REPO: &str = "sentence-transformers/all-MiniLM-L6-v2";

/// Files required to run the embedder locally.
pub const EMBED_MODEL_FILES: &[&str] = &["config.json", "tokenizer.json", "model.safetensors"];

/// Embedding dimension for all-MiniLM-L6-v2.
pub const EMBEDDING_DIM: usize = 384;

/// Maximum sequence length in tokens; longer inputs are truncated.
pub const MAX_SEQ_LENGTH: usize = 256;

/// Candle-based sentence embedder.
pub struct CandleEmbedder {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
    info: ModelInfo,
}

impl CandleEmbedder {
    /// Load the embedder, downloading model files on first use.
    pub fn load_default() -> Result<Self, EmbeddingError> {
        let hub = HubModel::new(EMBED_MODEL_REPO, EMBED_MODEL_FILES);
        Self::load(&hub)
    }

    /// Load the embedder from a hub cache.
    pub fn load(hub: &HubModel) -> Result<Self, EmbeddingError> {
        let model_dir = hub.fetch()?;
        Self::load_from_dir(&model_dir)
    }

    /// Load from a directory containing config.json, tokenizer.json and
    /// model.safetensors.
    pub fn load_from_dir(model_dir: &Path) -> Result<Self, EmbeddingError> {
        info!(path = ?model_dir, "Loading embedding model...");

        let device = Device::Cpu;

        let config_str = std::fs::read_to_string(model_dir.join("config.json"))?;
        let config: BertConfig = serde_json::from_str(&config_str)
            .map_err(|e| EmbeddingError::ModelNotFound(format!("Invalid config: {}", e)))?;

        let tokenizer = Tokenizer::from_file(model_dir.join("tokenizer.json"))
            .map_err(|e| EmbeddingError::Tokenizer(e.to_string()))?;

        let weights = model_dir.join("model.safetensors");
        let vb = unsafe { VarBuilder::from_mmaped_safetensors(&[weights], DType::F32, &device)? };
        let model = BertModel::load(vb, &config)?;

        info!(dim = EMBEDDING_DIM, max_seq = MAX_SEQ_LENGTH, "Embedder ready");

        Ok(Self {
            model,
            tokenizer,
            device,
            info: ModelInfo {
                name: "all-MiniLM-L6-v2".to_string(),
                dimension: EMBEDDING_DIM,
                max_sequence_length: MAX_SEQ_LENGTH,
            },
        })
    }

    /// Mean pooling over token embeddings, ignoring padding positions.
    fn mean_pool(
        &self,
        token_embeddings: &Tensor,
        attention_mask: &Tensor,
    ) -> Result<Tensor, EmbeddingError> {
        let mask = attention_mask
            .unsqueeze(2)?
            .broadcast_as(token_embeddings.shape())?
            .to_dtype(DType::F32)?;

        let summed = token_embeddings.broadcast_mul(&mask)?.sum(1)?;

        // Avoid dividing by zero on fully padded rows.
        let counts = mask.sum(1)?.clamp(1e-9, f64::MAX)?;

        Ok(summed.broadcast_div(&counts)?)
    }
}

impl EmbeddingModel for CandleEmbedder {
    fn info(&self) -> &ModelInfo {
        &self.info
    }

    fn embed(&self, text: &str) -> Result<Embedding, EmbeddingError> {
        let mut embeddings = self.embed_batch(&[text])?;
        Ok(embeddings.remove(0))
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        debug!(count = texts.len(), "Embedding batch");

        let encodings = self
            .tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(|e| EmbeddingError::Tokenizer(e.to_string()))?;

        // Pad every row to the longest sequence in the batch, capped at the
        // model's maximum length.
        let max_len = encodings
            .iter()
            .map(|e| e.get_ids().len())
            .max()
            .unwrap_or(0)
            .min(MAX_SEQ_LENGTH);

        let mut ids = Vec::with_capacity(texts.len() * max_len);
        let mut mask = Vec::with_capacity(texts.len() * max_len);

        for encoding in &encodings {
            let row_ids = encoding.get_ids();
            let row_mask = encoding.get_attention_mask();
            let keep = row_ids.len().min(max_len);

            ids.extend_from_slice(&row_ids[..keep]);
            ids.extend(std::iter::repeat(0u32).take(max_len - keep));
            mask.extend_from_slice(&row_mask[..keep]);
            mask.extend(std::iter::repeat(0u32).take(max_len - keep));
        }

        let batch = texts.len();
        let input_ids = Tensor::from_vec(ids, (batch, max_len), &self.device)?;
        let attention_mask = Tensor::from_vec(mask, (batch, max_len), &self.device)?;
        let token_type_ids = Tensor::zeros_like(&input_ids)?;

        let output = self
            .model
            .forward(&input_ids, &token_type_ids, Some(&attention_mask))?;

        let pooled = self.mean_pool(&output, &attention_mask)?;
        let rows: Vec<Vec<f32>> = pooled.to_vec2()?;

        debug!(count = rows.len(), dim = EMBEDDING_DIM, "Batch complete");

        Ok(rows.into_iter().map(Embedding::new).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Model-touching tests are ignored by default; run with:
    // cargo test -p promo-embeddings -- --ignored

    #[test]
    #[ignore = "requires model download"]
    fn test_load_model() {
        let embedder = CandleEmbedder::load_default().unwrap();
        assert_eq!(embedder.info().dimension, EMBEDDING_DIM);
    }

    #[test]
    #[ignore = "requires model download"]
    fn test_embed_deterministic() {
        let embedder = CandleEmbedder::load_default().unwrap();
        let a = embedder.embed("flat 50% off shoes").unwrap();
        let b = embedder.embed("flat 50% off shoes").unwrap();
        assert_eq!(a.values, b.values);
        assert_eq!(a.dimension(), EMBEDDING_DIM);
    }

    #[test]
    #[ignore = "requires model download"]
    fn test_similar_offers_rank_higher() {
        let embedder = CandleEmbedder::load_default().unwrap();
        let query = embedder.embed("any shoe deals?").unwrap();
        let shoes = embedder.embed("Flat 50% off. on shoes").unwrap();
        let lipstick = embedder.embed("Buy one get one. lipstick shades").unwrap();
        assert!(query.cosine_similarity(&shoes) > query.cosine_similarity(&lipstick));
    }
}
