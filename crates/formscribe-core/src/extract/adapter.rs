//! Provider adapters: one inference backend behind a uniform extraction call.
//!
//! Every adapter runs the same steps (normalize, prompt, call, parse,
//! translate, trace) and always returns a [`ResultEnvelope`].

use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

use super::prompt::extraction_prompt;
use crate::config::{Config, ResponseFormat};
use crate::error::PipelineError;
use crate::llm::provider::{resolve_env_var, LlmProvider, LlmRequest};
use crate::llm::{GroqProvider, HuggingFaceProvider, OllamaProvider};
use crate::parse::{extract_fields, parse_response};
use crate::pipeline::ImageNormalizer;
use crate::trace::{TraceLevel, TraceRecord, Tracer};
use crate::translate::{Translation, Translator};
use crate::types::{ExtractionRequest, ResultEnvelope, StructuredResult};

/// Which inference family an adapter belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdapterKind {
    /// HuggingFace router
    Hosted,
    /// Groq
    Secondary,
    /// Ollama
    Local,
}

impl AdapterKind {
    /// Provider name shown in envelope messages.
    pub fn label(&self) -> &'static str {
        match self {
            AdapterKind::Hosted => "HuggingFace",
            AdapterKind::Secondary => "Groq",
            AdapterKind::Local => "Ollama",
        }
    }

    /// Short name used in trace names.
    pub fn slug(&self) -> &'static str {
        match self {
            AdapterKind::Hosted => "hf",
            AdapterKind::Secondary => "groq",
            AdapterKind::Local => "ollama",
        }
    }
}

/// Shared stages every adapter uses around its provider call.
#[derive(Clone)]
pub struct AdapterContext {
    pub normalizer: ImageNormalizer,
    pub translator: Translator,
    pub tracer: Tracer,
}

/// An inference backend bound to an output format.
#[derive(Clone)]
pub struct ExtractionAdapter {
    kind: AdapterKind,
    provider: Arc<dyn LlmProvider>,
    format: ResponseFormat,
}

impl ExtractionAdapter {
    pub fn new(kind: AdapterKind, provider: Arc<dyn LlmProvider>, format: ResponseFormat) -> Self {
        Self {
            kind,
            provider,
            format,
        }
    }

    pub fn kind(&self) -> AdapterKind {
        self.kind
    }

    pub fn label(&self) -> &'static str {
        self.kind.label()
    }

    pub fn format(&self) -> ResponseFormat {
        self.format
    }

    /// Extract handwriting from one image. Never fails; errors become a
    /// failure envelope.
    pub async fn extract(&self, ctx: &AdapterContext, request: &ExtractionRequest) -> ResultEnvelope {
        tracing::debug!(
            provider = self.label(),
            file = %request.filename,
            language = %request.language,
            "Extracting handwriting"
        );

        let mut level = None;
        let envelope = match self.run(ctx, request).await {
            Ok(translation) => {
                let mut message = format!("Handwriting extracted successfully using {}", self.label());
                if translation.applied {
                    message.push_str(" and translated to English");
                }
                ResultEnvelope::success(&request.filename, translation.data, message)
            }
            Err(PipelineError::Llm {
                status_code: Some(503),
                ..
            }) if self.kind == AdapterKind::Hosted => {
                tracing::warn!(provider = self.label(), "Hosted model is still loading");
                level = Some(TraceLevel::Warning);
                ResultEnvelope::success(
                    &request.filename,
                    StructuredResult::model_loading(),
                    format!("{} model is loading", self.label()),
                )
            }
            Err(e) => {
                tracing::warn!(provider = self.label(), file = %request.filename, "Extraction failed: {e}");
                ResultEnvelope::failure(
                    &request.filename,
                    e.to_string(),
                    format!("Failed to extract handwriting using {}", self.label()),
                )
            }
        };

        ctx.tracer.record(self.trace_record(request, &envelope, level)).await;
        envelope
    }

    async fn run(
        &self,
        ctx: &AdapterContext,
        request: &ExtractionRequest,
    ) -> Result<Translation, PipelineError> {
        let image = ctx.normalizer.normalize(&request.path).await?;
        let prompt = extraction_prompt(&request.language, self.format);
        let llm_request = LlmRequest::extract_handwriting(image, prompt);

        let timeout = self.provider.timeout();
        let response = tokio::time::timeout(timeout, self.provider.generate(&llm_request))
            .await
            .map_err(|_| PipelineError::Timeout {
                stage: "inference".to_string(),
                timeout_ms: timeout.as_millis() as u64,
            })??;

        tracing::debug!(
            provider = self.label(),
            model = %response.model,
            latency_ms = response.latency_ms,
            tokens = ?response.tokens_used,
            "Model responded"
        );

        let data = match self.format {
            ResponseFormat::Structured => parse_response(&response.text),
            ResponseFormat::Fields => extract_fields(&response.text),
        };
        Ok(ctx.translator.translate(&data, &request.language).await)
    }

    fn trace_record(
        &self,
        request: &ExtractionRequest,
        envelope: &ResultEnvelope,
        level: Option<TraceLevel>,
    ) -> TraceRecord {
        let mut input = json!({
            "filename": request.filename,
            "language": request.language,
            "provider": self.label(),
        });
        if let Some(task_id) = &request.task_id {
            input["task_id"] = json!(task_id);
        }
        if let Some(page) = request.page {
            input["page_number"] = json!(page.number);
            input["total_pages"] = json!(page.total);
        }

        if envelope.success {
            TraceRecord {
                name: format!("handwriting_extraction_{}", self.kind.slug()),
                input,
                output: json!({
                    "extracted_data": envelope.extracted_data,
                    "message": envelope.message,
                }),
                level,
            }
        } else {
            TraceRecord {
                name: format!("handwriting_extraction_{}_error", self.kind.slug()),
                input,
                output: json!({ "error": envelope.error }),
                level: Some(TraceLevel::Error),
            }
        }
    }
}

/// Builds adapters in priority order from configuration.
pub struct AdapterFactory;

impl AdapterFactory {
    /// Hosted (token configured), then secondary (key configured), then local
    /// (unless disabled). Adapters whose credentials do not resolve are skipped.
    pub fn from_config(config: &Config) -> Vec<ExtractionAdapter> {
        let remote_timeout = Duration::from_secs(config.limits.remote_timeout_secs);
        let local_timeout = Duration::from_secs(config.limits.local_timeout_secs);
        let providers = &config.providers;
        let mut adapters = Vec::with_capacity(3);

        match resolve_env_var(&providers.hosted.api_key) {
            Some(token) => adapters.push(ExtractionAdapter::new(
                AdapterKind::Hosted,
                Arc::new(HuggingFaceProvider::new(
                    &providers.hosted.endpoint,
                    &token,
                    &providers.hosted.model,
                    remote_timeout,
                )),
                providers.hosted.response_format,
            )),
            None => tracing::debug!("Hosted provider skipped: no token configured"),
        }

        match resolve_env_var(&providers.secondary.api_key) {
            Some(key) => adapters.push(ExtractionAdapter::new(
                AdapterKind::Secondary,
                Arc::new(GroqProvider::new(
                    &providers.secondary.endpoint,
                    &key,
                    &providers.secondary.model,
                    remote_timeout,
                )),
                ResponseFormat::Structured,
            )),
            None => tracing::debug!("Secondary provider skipped: no API key configured"),
        }

        if providers.local.enabled {
            adapters.push(ExtractionAdapter::new(
                AdapterKind::Local,
                Arc::new(OllamaProvider::new(
                    &providers.local.endpoint,
                    &providers.local.model,
                    local_timeout,
                )),
                ResponseFormat::Structured,
            ));
        }

        adapters
    }
}
