//! Configuration management for Cosmos
//!
//! Configuration is loaded with the following priority (highest to lowest):
//! 1. CLI flags
//! 2. Environment variables (COSMOS_*)
//! 3. Config file (~/.config/cosmos/config.toml)
//! 4. Default values

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Default text model for orchestration, huddles and document rewrites
pub const DEFAULT_TEXT_MODEL: &str = "gemini-2.5-flash";

/// Default image generation model
pub const DEFAULT_IMAGE_MODEL: &str = "imagen-4.0-generate-001";

/// Default Gemini API endpoint
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Generative model configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Model used for text and JSON generation
    pub text_model: String,

    /// Model used for image generation
    pub image_model: String,

    /// API base URL
    pub base_url: String,

    /// Timeout applied to every HTTP request
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,

    /// Maximum gap between two stream fragments
    #[serde(with = "humantime_serde")]
    pub stream_idle_timeout: Duration,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            text_model: DEFAULT_TEXT_MODEL.to_string(),
            image_model: DEFAULT_IMAGE_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout: Duration::from_secs(60),
            stream_idle_timeout: Duration::from_secs(30),
        }
    }
}

/// Which key-value backend to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// SQLite file on disk
    #[default]
    Sqlite,
    /// Process-local memory, lost on exit
    Memory,
}

/// Storage configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Storage backend
    pub backend: StorageBackend,

    /// Database file path (defaults to the platform data directory)
    pub path: Option<PathBuf>,
}

impl StorageConfig {
    /// Resolve the database path, falling back to `<data_dir>/cosmos/cosmos.db`
    pub fn resolved_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.path {
            return Ok(path.clone());
        }
        dirs::data_dir()
            .map(|p| p.join("cosmos").join("cosmos.db"))
            .ok_or_else(|| Error::Config("Could not determine data directory".to_string()))
    }
}

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Model configuration
    pub model: ModelConfig,

    /// Storage configuration
    pub storage: StorageConfig,
}

impl Config {
    /// Load configuration from the default config file location
    ///
    /// Returns default config if file doesn't exist
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path();

        if let Some(path) = config_path {
            if path.exists() {
                return Self::load_from_file(&path);
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: &PathBuf) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(Error::Io)?;
        toml::from_str(&contents)
            .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))
    }

    /// Get the default config file path
    ///
    /// Returns `~/.config/cosmos/config.toml` on Unix
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("cosmos").join("config.toml"))
    }

    /// Apply environment variable overrides
    ///
    /// Supported variables:
    /// - COSMOS_MODEL: Text model
    /// - COSMOS_IMAGE_MODEL: Image model
    /// - COSMOS_BASE_URL: API base URL
    /// - COSMOS_DB_PATH: Database file
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(model) = std::env::var("COSMOS_MODEL") {
            self.model.text_model = model;
        }

        if let Ok(model) = std::env::var("COSMOS_IMAGE_MODEL") {
            self.model.image_model = model;
        }

        if let Ok(url) = std::env::var("COSMOS_BASE_URL") {
            self.model.base_url = url;
        }

        if let Ok(path) = std::env::var("COSMOS_DB_PATH") {
            self.storage.path = Some(PathBuf::from(path));
        }

        self
    }

    /// Apply CLI flag overrides
    pub fn with_cli_overrides(
        mut self,
        model: Option<String>,
        db_path: Option<PathBuf>,
        in_memory: bool,
    ) -> Self {
        if let Some(m) = model {
            self.model.text_model = m;
        }

        if let Some(path) = db_path {
            self.storage.path = Some(path);
        }

        if in_memory {
            self.storage.backend = StorageBackend::Memory;
        }

        self
    }

    /// Load configuration with all overrides applied
    ///
    /// Priority: CLI > env > config file > defaults
    pub fn load_with_overrides(
        model: Option<String>,
        db_path: Option<PathBuf>,
        in_memory: bool,
    ) -> Result<Self> {
        Ok(Self::load()?
            .with_env_overrides()
            .with_cli_overrides(model, db_path, in_memory))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.model.text_model, "gemini-2.5-flash");
        assert_eq!(config.model.image_model, "imagen-4.0-generate-001");
        assert_eq!(config.model.request_timeout, Duration::from_secs(60));
        assert_eq!(config.storage.backend, StorageBackend::Sqlite);
        assert!(config.storage.path.is_none());
    }

    #[test]
    fn test_cli_overrides() {
        let config = Config::default().with_cli_overrides(
            Some("gemini-2.5-pro".to_string()),
            Some(PathBuf::from("/tmp/cosmos.db")),
            true,
        );

        assert_eq!(config.model.text_model, "gemini-2.5-pro");
        assert_eq!(config.storage.path, Some(PathBuf::from("/tmp/cosmos.db")));
        assert_eq!(config.storage.backend, StorageBackend::Memory);
    }

    #[test]
    fn test_parse_toml() {
        let toml = r#"
[model]
text_model = "gemini-2.5-pro"
request_timeout = "2m"
stream_idle_timeout = "45s"

[storage]
backend = "memory"
path = "/var/lib/cosmos/cosmos.db"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.model.text_model, "gemini-2.5-pro");
        assert_eq!(config.model.request_timeout, Duration::from_secs(120));
        assert_eq!(config.model.stream_idle_timeout, Duration::from_secs(45));
        assert_eq!(config.storage.backend, StorageBackend::Memory);
        assert_eq!(
            config.storage.resolved_path().unwrap(),
            PathBuf::from("/var/lib/cosmos/cosmos.db")
        );
    }

    #[test]
    fn test_partial_toml() {
        let toml = r#"
[model]
image_model = "imagen-3.0"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        // text_model should use default
        assert_eq!(config.model.text_model, DEFAULT_TEXT_MODEL);
        assert_eq!(config.model.image_model, "imagen-3.0");
        assert_eq!(config.model.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[model\ntext_model = ").unwrap();

        let err = Config::load_from_file(&path).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
