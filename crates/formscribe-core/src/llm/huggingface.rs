//! HuggingFace inference router provider (OpenAI-compatible API).
//!
//! The router speaks the Chat Completions format, so this delegates to
//! `OpenAiProvider` with the router endpoint.

use super::openai::OpenAiProvider;
use super::provider::{LlmProvider, LlmRequest, LlmResponse};
use crate::error::PipelineError;
use async_trait::async_trait;
use std::time::Duration;

/// Hosted-inference provider wrapping an OpenAI-compatible endpoint.
pub struct HuggingFaceProvider {
    inner: OpenAiProvider,
}

impl HuggingFaceProvider {
    pub fn new(endpoint: &str, api_key: &str, model: &str, timeout: Duration) -> Self {
        Self {
            inner: OpenAiProvider::new("huggingface", endpoint, api_key, model, timeout),
        }
    }
}

#[async_trait]
impl LlmProvider for HuggingFaceProvider {
    fn name(&self) -> &str {
        "huggingface"
    }

    async fn generate(&self, request: &LlmRequest) -> Result<LlmResponse, PipelineError> {
        self.inner.generate(request).await
    }

    fn timeout(&self) -> Duration {
        self.inner.timeout()
    }
}
