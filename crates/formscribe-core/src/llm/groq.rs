//! Groq provider (OpenAI-compatible API).
//!
//! Used both as the secondary vision backend and as the text-only
//! translation backend.

use super::openai::OpenAiProvider;
use super::provider::{LlmProvider, LlmRequest, LlmResponse};
use crate::error::PipelineError;
use async_trait::async_trait;
use std::time::Duration;

/// Groq provider wrapping an OpenAI-compatible endpoint.
pub struct GroqProvider {
    inner: OpenAiProvider,
}

impl GroqProvider {
    pub fn new(endpoint: &str, api_key: &str, model: &str, timeout: Duration) -> Self {
        Self {
            inner: OpenAiProvider::new("groq", endpoint, api_key, model, timeout),
        }
    }
}

#[async_trait]
impl LlmProvider for GroqProvider {
    fn name(&self) -> &str {
        "groq"
    }

    async fn generate(&self, request: &LlmRequest) -> Result<LlmResponse, PipelineError> {
        self.inner.generate(request).await
    }

    fn timeout(&self) -> Duration {
        self.inner.timeout()
    }
}
