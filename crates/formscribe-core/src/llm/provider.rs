//! LLM provider trait and request/response types.
//!
//! Defines the interface that every inference backend implements: the
//! OpenAI-compatible hosted and secondary services, and a local Ollama.

use crate::error::PipelineError;
use async_trait::async_trait;
use base64::Engine;
use std::time::Duration;

/// Base64-encoded image ready to send to an LLM API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageInput {
    /// Base64-encoded image bytes
    pub data: String,
    /// MIME type (e.g., "image/jpeg", "image/png")
    pub media_type: String,
}

impl ImageInput {
    /// Create an `ImageInput` from raw bytes and format string.
    ///
    /// The format is the image format identifier (e.g., "jpeg", "png", "webp").
    pub fn from_bytes(bytes: &[u8], format: &str) -> Self {
        let media_type = match format {
            "jpeg" | "jpg" => "image/jpeg",
            "png" => "image/png",
            "webp" => "image/webp",
            "gif" => "image/gif",
            "bmp" => "image/bmp",
            "tiff" | "tif" => "image/tiff",
            other => {
                tracing::warn!("Unknown image format '{other}', defaulting to image/jpeg");
                "image/jpeg"
            }
        };

        Self {
            data: base64::engine::general_purpose::STANDARD.encode(bytes),
            media_type: media_type.to_string(),
        }
    }

    /// Return a data URL suitable for OpenAI-style APIs.
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.media_type, self.data)
    }
}

/// A single generation request, with or without an image.
#[derive(Debug, Clone)]
pub struct LlmRequest {
    /// Optional system instruction
    pub system: Option<String>,
    /// Text prompt for the model
    pub prompt: String,
    /// Image to read, absent for text-only calls
    pub image: Option<ImageInput>,
    /// Maximum tokens to generate
    pub max_tokens: u32,
    /// Sampling temperature
    pub temperature: f32,
    /// Ask the backend to constrain output to JSON where it supports that
    pub json_mode: bool,
}

impl LlmRequest {
    /// Build a handwriting extraction request for an image.
    pub fn extract_handwriting(image: ImageInput, prompt: String) -> Self {
        Self {
            system: None,
            prompt,
            image: Some(image),
            max_tokens: 2048,
            temperature: 0.1,
            json_mode: true,
        }
    }

    /// Build a text-only translation request.
    pub fn translate(system: String, prompt: String, temperature: f32, max_tokens: u32) -> Self {
        Self {
            system: Some(system),
            prompt,
            image: None,
            max_tokens,
            temperature,
            json_mode: false,
        }
    }
}

/// The response from an LLM call.
#[derive(Debug, Clone)]
pub struct LlmResponse {
    /// Generated text
    pub text: String,
    /// Model identifier used
    pub model: String,
    /// Number of tokens used (input + output), if reported
    pub tokens_used: Option<u32>,
    /// Round-trip latency in milliseconds
    pub latency_ms: u64,
}

/// Trait that all LLM providers implement.
///
/// Declared with `async_trait` so adapters can hold `Arc<dyn LlmProvider>`.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Provider name for logging (e.g., "huggingface", "ollama").
    fn name(&self) -> &str;

    /// Generate a completion for the given request.
    async fn generate(&self, request: &LlmRequest) -> Result<LlmResponse, PipelineError>;

    /// Per-request timeout for this provider.
    fn timeout(&self) -> Duration;
}

/// Resolve `${ENV_VAR}` references in config strings.
///
/// Empty values and unset or empty variables resolve to `None`.
pub fn resolve_env_var(value: &str) -> Option<String> {
    if value.starts_with("${") && value.ends_with('}') {
        let var_name = &value[2..value.len() - 1];
        std::env::var(var_name).ok().filter(|v| !v.trim().is_empty())
    } else if value.trim().is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}
