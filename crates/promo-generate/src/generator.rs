//! Text generator trait and decoding configuration.

use crate::error::GenerateError;

/// Fixed decoding configuration.
///
/// Beam search with a fixed beam count is reproducible, so the pipeline's
/// answers are deterministic for a given prompt and configuration.
#[derive(Debug, Clone)]
pub struct GenerationConfig {
    /// Number of beams to track during decoding (>= 1)
    pub num_beams: usize,
    /// Maximum number of generated tokens
    pub max_length: usize,
    /// Penalty applied to already-emitted tokens (> 1 suppresses loops)
    pub repetition_penalty: f32,
    /// Stop once `num_beams` hypotheses have reached end-of-sequence
    pub early_stopping: bool,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            num_beams: 4,
            max_length: 256,
            repetition_penalty: 1.2,
            early_stopping: true,
        }
    }
}

impl GenerationConfig {
    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.num_beams == 0 {
            return Err("num_beams must be >= 1".to_string());
        }
        if self.max_length == 0 {
            return Err("max_length must be > 0".to_string());
        }
        if self.repetition_penalty < 1.0 {
            return Err(format!(
                "repetition_penalty must be >= 1.0, got {}",
                self.repetition_penalty
            ));
        }
        Ok(())
    }
}

/// Trait for text generators.
///
/// Implementations must be deterministic for identical prompt and
/// configuration, and return output trimmed of surrounding whitespace.
pub trait TextGenerator: Send + Sync {
    /// Generate text for the given prompt.
    fn generate(&self, prompt: &str) -> Result<String, GenerateError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = GenerationConfig::default();
        assert_eq!(config.num_beams, 4);
        assert_eq!(config.max_length, 256);
        assert!(config.repetition_penalty > 1.0);
        assert!(config.early_stopping);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_configs_rejected() {
        let mut config = GenerationConfig::default();
        config.num_beams = 0;
        assert!(config.validate().is_err());

        let mut config = GenerationConfig::default();
        config.repetition_penalty = 0.5;
        assert!(config.validate().is_err());
    }
}
