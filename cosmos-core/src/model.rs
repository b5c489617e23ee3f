//! Generative model port
//!
//! Everything that talks to a model goes through [`GenerativeModel`], so the
//! orchestrator, huddle and document editor can be driven by the Gemini
//! client in production and by scripted fakes in tests.

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};

use crate::config::{ModelConfig, DEFAULT_IMAGE_MODEL, DEFAULT_TEXT_MODEL};
use crate::Result;

/// Ordered text fragments of one streamed completion
pub type TextStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// A completion request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub model: String,
    pub prompt: String,
    pub system_instruction: Option<String>,
    /// JSON schema the response must conform to; requests JSON output when set
    pub response_schema: Option<serde_json::Value>,
}

impl CompletionRequest {
    /// Create a plain text request
    pub fn new(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            system_instruction: None,
            response_schema: None,
        }
    }

    /// Set the system instruction
    pub fn with_system_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.system_instruction = Some(instruction.into());
        self
    }

    /// Request JSON output conforming to `schema`
    pub fn with_schema(mut self, schema: serde_json::Value) -> Self {
        self.response_schema = Some(schema);
        self
    }
}

/// Image generation options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageConfig {
    pub count: u32,
    pub mime_type: String,
    pub aspect_ratio: String,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            count: 1,
            mime_type: "image/png".to_string(),
            aspect_ratio: "1:1".to_string(),
        }
    }
}

/// An image generation request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRequest {
    pub model: String,
    pub prompt: String,
    pub config: ImageConfig,
}

impl ImageRequest {
    /// Create a request for one square PNG
    pub fn new(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            config: ImageConfig::default(),
        }
    }
}

/// A generated image
#[derive(Clone, PartialEq, Eq)]
pub struct GeneratedImage {
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl std::fmt::Debug for GeneratedImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeneratedImage")
            .field("mime_type", &self.mime_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// A generative model backend
#[async_trait]
pub trait GenerativeModel: Send + Sync {
    /// Run a completion and return the full response text
    async fn generate(&self, request: &CompletionRequest) -> Result<String>;

    /// Run a completion and stream the response text as it is produced
    async fn generate_stream(&self, request: &CompletionRequest) -> Result<TextStream>;

    /// Generate images for a prompt
    async fn generate_images(&self, request: &ImageRequest) -> Result<Vec<GeneratedImage>>;
}

/// Which model serves which kind of call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSettings {
    pub text_model: String,
    pub image_model: String,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            text_model: DEFAULT_TEXT_MODEL.to_string(),
            image_model: DEFAULT_IMAGE_MODEL.to_string(),
        }
    }
}

impl From<&ModelConfig> for ModelSettings {
    fn from(config: &ModelConfig) -> Self {
        Self {
            text_model: config.text_model.clone(),
            image_model: config.image_model.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completion_request_builder() {
        let request = CompletionRequest::new("gemini-2.5-flash", "hi")
            .with_system_instruction("be brief")
            .with_schema(serde_json::json!({"type": "OBJECT"}));
        assert_eq!(request.system_instruction.as_deref(), Some("be brief"));
        assert!(request.response_schema.is_some());
    }

    #[test]
    fn test_default_image_config() {
        let request = ImageRequest::new("imagen-4.0-generate-001", "a fox");
        assert_eq!(request.config.count, 1);
        assert_eq!(request.config.mime_type, "image/png");
        assert_eq!(request.config.aspect_ratio, "1:1");
    }

    #[test]
    fn test_settings_from_config() {
        let mut config = ModelConfig::default();
        config.text_model = "gemini-2.5-pro".to_string();
        let settings = ModelSettings::from(&config);
        assert_eq!(settings.text_model, "gemini-2.5-pro");
        assert_eq!(settings.image_model, DEFAULT_IMAGE_MODEL);
    }

    #[test]
    fn test_generated_image_debug_hides_bytes() {
        let image = GeneratedImage {
            mime_type: "image/png".to_string(),
            bytes: vec![1, 2, 3],
        };
        assert_eq!(
            format!("{:?}", image),
            "GeneratedImage { mime_type: \"image/png\", len: 3 }"
        );
    }
}
