//! Configuration loading for PromoSensei.
//!
//! Layered config: defaults -> config file -> env vars.
//! Config file lives at `~/.config/promo-sensei/config.toml`; environment
//! variables use the `PROMO_` prefix (e.g. `PROMO_TOP_K=5`).

use std::path::{Path, PathBuf};

use config::{Config, Environment, File};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::error::PromoError;

/// Configuration for the PromoSensei pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromoConfig {
    /// Path to the scraped offers JSON file (a JSON array of offer records).
    #[serde(default = "default_offers_path")]
    pub offers_path: PathBuf,

    /// Directory holding the persistent vector index and document store.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// How many offers to retrieve per question.
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Optional shell command that re-scrapes offers, run by `refresh`.
    /// The core only re-ingests afterwards; scraping stays out of process.
    #[serde(default)]
    pub refresh_command: Option<String>,
}

fn default_offers_path() -> PathBuf {
    PathBuf::from("master_offers.json")
}

fn default_data_dir() -> PathBuf {
    ProjectDirs::from("", "", "promo-sensei")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from(".promo-sensei"))
}

fn default_top_k() -> usize {
    3
}

impl Default for PromoConfig {
    fn default() -> Self {
        Self {
            offers_path: default_offers_path(),
            data_dir: default_data_dir(),
            top_k: default_top_k(),
            refresh_command: None,
        }
    }
}

impl PromoConfig {
    /// Load configuration from the default file location and environment.
    pub fn load() -> Result<Self, PromoError> {
        let config_path = ProjectDirs::from("", "", "promo-sensei")
            .map(|dirs| dirs.config_dir().join("config.toml"));
        Self::load_from(config_path.as_deref())
    }

    /// Load configuration from an explicit file path (missing file is fine).
    pub fn load_from(path: Option<&Path>) -> Result<Self, PromoError> {
        let mut builder = Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(File::with_name(&path.to_string_lossy()).required(false));
        }

        // Format: PROMO_OFFERS_PATH, PROMO_TOP_K, PROMO_DATA_DIR, etc.
        let settings = builder
            .add_source(Environment::with_prefix("PROMO").try_parsing(true))
            .build()
            .map_err(|e| PromoError::Config(e.to_string()))?;

        let config: PromoConfig = settings
            .try_deserialize()
            .map_err(|e| PromoError::Config(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    /// Directory for the vector index and document store.
    pub fn index_dir(&self) -> PathBuf {
        self.data_dir.join("index")
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), PromoError> {
        if self.top_k == 0 {
            return Err(PromoError::Config("top_k must be > 0".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PromoConfig::default();
        assert_eq!(config.top_k, 3);
        assert!(config.refresh_command.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_index_dir_under_data_dir() {
        let config = PromoConfig {
            data_dir: PathBuf::from("/tmp/promo"),
            ..Default::default()
        };
        assert_eq!(config.index_dir(), PathBuf::from("/tmp/promo/index"));
    }

    #[test]
    fn test_zero_top_k_rejected() {
        let config = PromoConfig {
            top_k: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(&path, "top_k = 5\noffers_path = \"offers.json\"\n").unwrap();

        let config = PromoConfig::load_from(Some(&path)).unwrap();
        assert_eq!(config.top_k, 5);
        assert_eq!(config.offers_path, PathBuf::from("offers.json"));
    }

    #[test]
    fn test_load_from_missing_file_uses_defaults() {
        let config = PromoConfig::load_from(Some(Path::new("/nonexistent/config.toml"))).unwrap();
        assert_eq!(config.top_k, 3);
    }
}
