//! Best-effort translation of extracted data into English.
//!
//! Translation never fails the extraction: every failure path returns the
//! input data unchanged.

use std::sync::Arc;

use crate::config::TranslationConfig;
use crate::extract::prompt::{translation_prompt, translation_system};
use crate::llm::provider::{resolve_env_var, LlmProvider, LlmRequest};
use crate::llm::GroqProvider;
use crate::parse::parse_response;
use crate::types::{is_english, StructuredResult};

/// Outcome of a translation attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct Translation {
    pub data: StructuredResult,
    /// Whether the backend produced a usable translation
    pub applied: bool,
}

impl Translation {
    fn unchanged(data: &StructuredResult) -> Self {
        Self {
            data: data.clone(),
            applied: false,
        }
    }
}

/// Translates structured results through a text-completion backend.
#[derive(Clone)]
pub struct Translator {
    backend: Option<Arc<dyn LlmProvider>>,
    temperature: f32,
    max_tokens: u32,
}

impl Translator {
    pub fn new(backend: Option<Arc<dyn LlmProvider>>, temperature: f32, max_tokens: u32) -> Self {
        Self {
            backend,
            temperature,
            max_tokens,
        }
    }

    /// Translator with no backend; every call returns its input.
    pub fn disabled() -> Self {
        Self::new(None, 0.3, 2000)
    }

    /// Build from config. An unresolved API key leaves translation disabled.
    pub fn from_config(config: &TranslationConfig, timeout: std::time::Duration) -> Self {
        let backend = resolve_env_var(&config.api_key).map(|key| {
            Arc::new(GroqProvider::new(&config.endpoint, &key, &config.model, timeout))
                as Arc<dyn LlmProvider>
        });
        if backend.is_none() {
            tracing::debug!("Translation backend not configured");
        }
        Self::new(backend, config.temperature, config.max_tokens)
    }

    pub fn is_enabled(&self) -> bool {
        self.backend.is_some()
    }

    /// Translate keys and string values of `data` from `source_language` to English.
    pub async fn translate(&self, data: &StructuredResult, source_language: &str) -> Translation {
        if is_english(source_language) {
            return Translation::unchanged(data);
        }
        let Some(backend) = &self.backend else {
            return Translation::unchanged(data);
        };

        let json = match serde_json::to_string_pretty(data.as_value()) {
            Ok(json) => json,
            Err(e) => {
                tracing::warn!("Cannot serialize data for translation: {e}");
                return Translation::unchanged(data);
            }
        };

        let request = LlmRequest::translate(
            translation_system(source_language),
            translation_prompt(&json),
            self.temperature,
            self.max_tokens,
        );

        let response = match tokio::time::timeout(backend.timeout(), backend.generate(&request)).await
        {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                tracing::warn!(backend = backend.name(), "Translation failed: {e}");
                return Translation::unchanged(data);
            }
            Err(_) => {
                tracing::warn!(backend = backend.name(), "Translation timed out");
                return Translation::unchanged(data);
            }
        };

        let translated = parse_response(&response.text);
        if translated.is_raw_text() && !data.is_raw_text() {
            tracing::warn!(
                backend = backend.name(),
                "Translation did not return JSON, keeping original data"
            );
            return Translation::unchanged(data);
        }

        tracing::debug!(
            source_language,
            latency_ms = response.latency_ms,
            "Translated extracted data to English"
        );
        Translation {
            data: translated,
            applied: true,
        }
    }
}
