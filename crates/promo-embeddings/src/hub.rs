//! HuggingFace Hub model file caching.
//!
//! Downloads model files on first use and keeps them under a local cache
//! directory so subsequent startups are offline.

use std::path::PathBuf;

use tracing::{debug, info};

use crate::error::EmbeddingError;

/// A model to fetch from the hub: a repo id plus the files it needs locally.
#[derive(Debug, Clone)]
pub struct HubModel {
    /// Cache directory path
    pub cache_dir: PathBuf,
    /// Model repository ID (e.g. "sentence-transformers/all-MiniLM-L6-v2")
    pub repo_id: String,
    /// Files required from the repository
    pub files: Vec<&'static str>,
}

impl HubModel {
    /// A model cached under the default PromoSensei cache directory.
    pub fn new(repo_id: impl Into<String>, files: &[&'static str]) -> Self {
        let cache_dir = dirs::cache_dir()
            .unwrap_or_else(|| PathBuf::from(".cache"))
            .join("promo-sensei")
            .join("models");
        Self {
            cache_dir,
            repo_id: repo_id.into(),
            files: files.to_vec(),
        }
    }

    /// Override the cache directory (used by tests).
    pub fn with_cache_dir(mut self, cache_dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = cache_dir.into();
        self
    }

    /// Directory where this model's files live.
    pub fn model_dir(&self) -> PathBuf {
        self.cache_dir.join(self.repo_id.replace('/', "_"))
    }

    /// Whether every required file is already cached.
    pub fn is_cached(&self) -> bool {
        let model_dir = self.model_dir();
        self.files.iter().all(|f| model_dir.join(f).exists())
    }

    /// Path to a specific model file within the cache.
    pub fn file_path(&self, filename: &str) -> PathBuf {
        self.model_dir().join(filename)
    }

    /// Ensure all files are present locally, downloading any that are missing.
    ///
    /// Returns the local model directory.
    pub fn fetch(&self) -> Result<PathBuf, EmbeddingError> {
        let model_dir = self.model_dir();

        if self.is_cached() {
            debug!(path = ?model_dir, "Using cached model");
            return Ok(model_dir);
        }

        use hf_hub::api::sync::Api;

        info!(repo = %self.repo_id, "Downloading model files...");
        let api = Api::new().map_err(|e| EmbeddingError::Download(e.to_string()))?;
        let repo = api.model(self.repo_id.clone());

        std::fs::create_dir_all(&model_dir)?;

        for filename in &self.files {
            info!(file = filename, "Downloading...");
            let source = repo
                .get(filename)
                .map_err(|e| EmbeddingError::Download(format!("{}: {}", filename, e)))?;
            std::fs::copy(&source, self.file_path(filename))?;
            debug!(file = filename, "Cached");
        }

        Ok(model_dir)
    }
}
