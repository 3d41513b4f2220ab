//! Flan-T5 generator with beam-search decoding.
//!
//! The KV cache is disabled because beams interleave on a single model
//! instance; every step re-decodes each beam's full prefix. Slow but correct,
//! and flan-t5-small prefixes stay short (max_length caps them).

use std::path::Path;
use std::sync::Mutex;

use candle_core::{DType, Device, Tensor, D};
use candle_nn::VarBuilder;
use candle_transformers::models::t5::{Config as T5Config, T5ForConditionalGeneration};
use tokenizers::Tokenizer;
use tracing::{debug, info};

use promo_embeddings::HubModel;

use crate::error::GenerateError;
use crate::generator::{GenerationConfig, TextGenerator};

/// Generation model repository on HuggingFace.
pub const GEN_MODEL_REPO: &str = "google/flan-t5-small";

/// Files required to run the generator locally.
pub const GEN_MODEL_FILES: &[&str] = &["config.json", "tokenizer.json", "model.safetensors"];

/// Maximum prompt length in tokens; longer prompts are truncated.
const MAX_INPUT_TOKENS: usize = 512;

/// A partial decoder sequence under beam search.
#[derive(Debug, Clone)]
struct Hypothesis {
    /// Decoder token ids, starting with the decoder start token.
    tokens: Vec<u32>,
    /// Sum of log-probabilities of the generated tokens.
    score: f32,
}

impl Hypothesis {
    /// Length-normalized score used for final ranking, so longer answers are
    /// not punished for accumulating more log-probability terms.
    fn normalized_score(&self) -> f32 {
        let generated = (self.tokens.len().saturating_sub(1)).max(1);
        self.score / generated as f32
    }
}

/// Flan-T5 text generator.
pub struct FlanT5Generator {
    model: Mutex<T5ForConditionalGeneration>,
    tokenizer: Tokenizer,
    device: Device,
    config: GenerationConfig,
    start_token: u32,
    eos_token: u32,
}

impl FlanT5Generator {
    /// Load the generator, downloading model files on first use.
    pub fn load_default(config: GenerationConfig) -> Result<Self, GenerateError> {
        let hub = HubModel::new(GEN_MODEL_REPO, GEN_MODEL_FILES);
        Self::load(&hub, config)
    }

    /// Load the generator from a hub cache.
    pub fn load(hub: &HubModel, config: GenerationConfig) -> Result<Self, GenerateError> {
        let model_dir = hub.fetch()?;
        Self::load_from_dir(&model_dir, config)
    }

    /// Load from a directory containing config.json, tokenizer.json and
    /// model.safetensors.
    pub fn load_from_dir(
        model_dir: &Path,
        config: GenerationConfig,
    ) -> Result<Self, GenerateError> {
        config.validate().map_err(GenerateError::InvalidConfig)?;

        info!(path = ?model_dir, "Loading generation model...");

        let device = Device::Cpu;

        let config_str = std::fs::read_to_string(model_dir.join("config.json"))?;
        let mut t5_config: T5Config = serde_json::from_str(&config_str)
            .map_err(|e| GenerateError::ModelNotFound(format!("Invalid config: {}", e)))?;
        // Full-prefix decoding; see module docs.
        t5_config.use_cache = false;

        let tokenizer = Tokenizer::from_file(model_dir.join("tokenizer.json"))
            .map_err(|e| GenerateError::Tokenizer(e.to_string()))?;

        let weights = model_dir.join("model.safetensors");
        let vb = unsafe { VarBuilder::from_mmaped_safetensors(&[weights], DType::F32, &device)? };
        let model = T5ForConditionalGeneration::load(vb, &t5_config)?;

        let start_token = t5_config
            .decoder_start_token_id
            .unwrap_or(t5_config.pad_token_id) as u32;
        let eos_token = t5_config.eos_token_id as u32;

        info!(
            beams = config.num_beams,
            max_length = config.max_length,
            "Generator ready"
        );

        Ok(Self {
            model: Mutex::new(model),
            tokenizer,
            device,
            config,
            start_token,
            eos_token,
        })
    }

    /// Run beam search against an encoded prompt, returning the best token
    /// sequence (without the decoder start token).
    fn beam_search(
        &self,
        model: &mut T5ForConditionalGeneration,
        encoder_output: &Tensor,
    ) -> Result<Vec<u32>, GenerateError> {
        let num_beams = self.config.num_beams;
        let mut beams = vec![Hypothesis {
            tokens: vec![self.start_token],
            score: 0.0,
        }];
        let mut finished: Vec<Hypothesis> = Vec::new();

        for _step in 0..self.config.max_length {
            let mut candidates: Vec<Hypothesis> = Vec::with_capacity(beams.len() * num_beams * 2);

            for beam in &beams {
                model.clear_kv_cache();
                let decoder_ids =
                    Tensor::new(beam.tokens.as_slice(), &self.device)?.unsqueeze(0)?;
                let logits = model.decode(&decoder_ids, encoder_output)?.squeeze(0)?;

                let logits = if self.config.repetition_penalty == 1.0 {
                    logits
                } else {
                    candle_transformers::utils::apply_repeat_penalty(
                        &logits,
                        self.config.repetition_penalty,
                        &beam.tokens[1..],
                    )?
                };

                let log_probs: Vec<f32> =
                    candle_nn::ops::log_softmax(&logits, D::Minus1)?.to_vec1()?;

                // Two candidates per slot keeps enough live continuations even
                // when the top expansions hit end-of-sequence.
                for (token, log_prob) in top_candidates(&log_probs, num_beams * 2) {
                    let mut tokens = beam.tokens.clone();
                    tokens.push(token);
                    candidates.push(Hypothesis {
                        tokens,
                        score: beam.score + log_prob,
                    });
                }
            }

            candidates.sort_by(|a, b| b.score.total_cmp(&a.score));

            let mut next_beams = Vec::with_capacity(num_beams);
            for candidate in candidates {
                if *candidate.tokens.last().unwrap() == self.eos_token {
                    if finished.len() < num_beams {
                        finished.push(candidate);
                    }
                } else if next_beams.len() < num_beams {
                    next_beams.push(candidate);
                }
                if next_beams.len() == num_beams && finished.len() >= num_beams {
                    break;
                }
            }

            beams = next_beams;

            let done = beams.is_empty()
                || (self.config.early_stopping && finished.len() >= num_beams);
            if done {
                break;
            }
        }

        // Unfinished beams still compete when max_length cut decoding short.
        finished.extend(beams);
        let best = finished
            .into_iter()
            .max_by(|a, b| a.normalized_score().total_cmp(&b.normalized_score()))
            .ok_or_else(|| GenerateError::Tokenizer("beam search produced no output".to_string()))?;

        // Strip the start token; EOS is a special token and dropped at decode.
        Ok(best.tokens[1..].to_vec())
    }
}

impl TextGenerator for FlanT5Generator {
    fn generate(&self, prompt: &str) -> Result<String, GenerateError> {
        let encoding = self
            .tokenizer
            .encode(prompt, true)
            .map_err(|e| GenerateError::Tokenizer(e.to_string()))?;

        let input_ids = encoding.get_ids();
        let keep = input_ids.len().min(MAX_INPUT_TOKENS);
        debug!(prompt_tokens = keep, "Generating");

        let mut model = self.model.lock().unwrap();

        let input = Tensor::new(&input_ids[..keep], &self.device)?.unsqueeze(0)?;
        model.clear_kv_cache();
        let encoder_output = model.encode(&input)?;

        let tokens = self.beam_search(&mut model, &encoder_output)?;

        let text = self
            .tokenizer
            .decode(&tokens, true)
            .map_err(|e| GenerateError::Tokenizer(e.to_string()))?;

        debug!(generated_tokens = tokens.len(), "Generation complete");
        Ok(text.trim().to_string())
    }
}

/// The `n` highest-scoring token ids with their log-probabilities.
fn top_candidates(log_probs: &[f32], n: usize) -> Vec<(u32, f32)> {
    let mut indexed: Vec<(u32, f32)> = log_probs
        .iter()
        .enumerate()
        .map(|(i, &lp)| (i as u32, lp))
        .collect();
    indexed.sort_by(|a, b| b.1.total_cmp(&a.1));
    indexed.truncate(n);
    indexed
}
