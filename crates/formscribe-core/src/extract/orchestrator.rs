//! Document-level extraction over a priority-ordered adapter chain.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use super::adapter::{AdapterContext, AdapterFactory, ExtractionAdapter};
use crate::config::Config;
use crate::error::{ConfigError, PipelineError};
use crate::pipeline::{ImageNormalizer, PdftocairoRasterizer, Rasterizer};
use crate::trace::Tracer;
use crate::translate::Translator;
use crate::types::{ExtractionRequest, FormField, ResultEnvelope, StructuredResult};

/// Runs extraction for images and PDFs.
pub struct Orchestrator {
    adapters: Vec<ExtractionAdapter>,
    ctx: AdapterContext,
    rasterizer: Arc<dyn Rasterizer>,
    pdf_dpi: u32,
    fallback_on_failure: bool,
}

impl Orchestrator {
    /// Create an orchestrator. At least one adapter is required.
    pub fn new(
        adapters: Vec<ExtractionAdapter>,
        ctx: AdapterContext,
        rasterizer: Arc<dyn Rasterizer>,
        pdf_dpi: u32,
        fallback_on_failure: bool,
    ) -> Result<Self, ConfigError> {
        if adapters.is_empty() {
            return Err(ConfigError::NoProvider);
        }
        Ok(Self {
            adapters,
            ctx,
            rasterizer,
            pdf_dpi,
            fallback_on_failure,
        })
    }

    /// Build adapters, translator, tracer and rasterizer from configuration.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let adapters = AdapterFactory::from_config(config);
        let ctx = AdapterContext {
            normalizer: ImageNormalizer::new(config.preprocessing.clone(), &config.limits),
            translator: Translator::from_config(
                &config.translation,
                Duration::from_secs(config.limits.remote_timeout_secs),
            ),
            tracer: Tracer::from_config(&config.tracing),
        };
        let rasterizer: Arc<dyn Rasterizer> =
            Arc::new(PdftocairoRasterizer::new(config.pdf.rasterizer.clone()));

        let orchestrator = Self::new(
            adapters,
            ctx,
            rasterizer,
            config.pdf.dpi,
            config.providers.fallback_on_failure,
        )?;
        tracing::info!(
            providers = ?orchestrator.provider_labels(),
            translation = orchestrator.ctx.translator.is_enabled(),
            tracing = orchestrator.ctx.tracer.is_enabled(),
            "Extraction pipeline ready"
        );
        Ok(orchestrator)
    }

    pub fn adapters(&self) -> &[ExtractionAdapter] {
        &self.adapters
    }

    /// Provider names in priority order.
    pub fn provider_labels(&self) -> Vec<&'static str> {
        self.adapters.iter().map(ExtractionAdapter::label).collect()
    }

    /// Extract one image with the first adapter, moving down the chain on
    /// failure only when fallback is enabled.
    pub async fn extract(&self, request: &ExtractionRequest) -> ResultEnvelope {
        let mut last = None;
        for adapter in &self.adapters {
            let envelope = adapter.extract(&self.ctx, request).await;
            if envelope.success || !self.fallback_on_failure {
                return envelope;
            }
            tracing::info!(provider = adapter.label(), "Falling back to next provider");
            last = Some(envelope);
        }
        // The chain is never empty, so `last` is always set here.
        last.unwrap_or_else(|| {
            ResultEnvelope::failure(
                &request.filename,
                ConfigError::NoProvider.to_string(),
                "Failed to extract handwriting",
            )
        })
    }

    /// Extract a whole document, fanning PDFs out to one request per page.
    pub async fn extract_document(
        &self,
        path: &Path,
        task_id: Option<&str>,
        language: &str,
    ) -> StructuredResult {
        if is_pdf(path) {
            return self.extract_pdf(path, task_id, language).await;
        }
        let request = ExtractionRequest::new(path).language(language).task_id(task_id);
        self.extract(&request).await.into_result()
    }

    async fn extract_pdf(&self, path: &Path, task_id: Option<&str>, language: &str) -> StructuredResult {
        let pages = match self.rasterizer.rasterize(path, self.pdf_dpi).await {
            Ok(pages) => pages,
            Err(PipelineError::RasterizerUnavailable { program }) => {
                tracing::warn!(program = %program, "PDF rasterizer not installed");
                return StructuredResult::from_fields(vec![
                    FormField::new("PDF Error", "PDF rasterizer not available"),
                    FormField::new(
                        "Solution",
                        "Install poppler-utils (pdftocairo) to enable PDF support",
                    ),
                ]);
            }
            Err(e) => {
                tracing::warn!(pdf = %path.display(), "PDF rasterization failed: {e}");
                return StructuredResult::from_fields(vec![
                    FormField::new("PDF Processing Error", e.to_string()),
                    FormField::new("Error Type", e.kind()),
                ]);
            }
        };

        if pages.is_empty() {
            return StructuredResult::from_fields(vec![FormField::new(
                "PDF Error",
                "No pages found in PDF",
            )]);
        }

        let total = pages.len();
        let document = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        tracing::info!(pdf = %document, pages = total, "Extracting PDF pages");

        let mut fields = Vec::new();
        for (index, page_path) in pages.pages().iter().enumerate() {
            let number = index + 1;
            let request = ExtractionRequest::new(page_path)
                .filename(format!("{document} (page {number})"))
                .language(language)
                .task_id(task_id)
                .page(number, total);
            let envelope = self.extract(&request).await;
            fields.extend(
                envelope
                    .to_fields()
                    .into_iter()
                    .map(|f| FormField::new(format!("Page {number} - {}", f.label), f.value)),
            );
        }

        if fields.is_empty() {
            fields.push(FormField::new("No Data", "No text extracted from PDF"));
        }
        StructuredResult::from_fields(fields)
    }
}

fn is_pdf(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("pdf"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{LimitsConfig, PreprocessingConfig, ResponseFormat};
    use crate::extract::adapter::AdapterKind;
    use crate::llm::provider::LlmProvider;
    use crate::testing::{write_png, FailingRasterizer, FakeRasterizer, MockProvider};

    fn context() -> AdapterContext {
        AdapterContext {
            normalizer: ImageNormalizer::new(PreprocessingConfig::default(), &LimitsConfig::default()),
            translator: Translator::disabled(),
            tracer: Tracer::disabled(),
        }
    }

    fn orchestrator(
        providers: Vec<(AdapterKind, Arc<MockProvider>)>,
        rasterizer: Arc<dyn Rasterizer>,
        fallback: bool,
    ) -> Orchestrator {
        let adapters = providers
            .into_iter()
            .map(|(kind, p)| {
                ExtractionAdapter::new(kind, p as Arc<dyn LlmProvider>, ResponseFormat::Structured)
            })
            .collect();
        Orchestrator::new(adapters, context(), rasterizer, 200, fallback).unwrap()
    }

    #[test]
    fn test_no_adapters_is_config_error() {
        let result = Orchestrator::new(
            Vec::new(),
            context(),
            Arc::new(FakeRasterizer::with_pages(1)),
            200,
            false,
        );
        assert!(matches!(result, Err(ConfigError::NoProvider)));
    }

    #[test]
    fn test_is_pdf_case_insensitive() {
        assert!(is_pdf(Path::new("scan.PDF")));
        assert!(is_pdf(Path::new("scan.pdf")));
        assert!(!is_pdf(Path::new("scan.png")));
        assert!(!is_pdf(Path::new("pdf")));
    }

    #[tokio::test]
    async fn test_two_page_pdf_prefixes_and_cleanup() {
        let rasterizer = Arc::new(FakeRasterizer::with_pages(2));
        let provider = MockProvider::ok("{\"fields\": [{\"label\": \"Name\", \"value\": \"Asha\"}]}");
        let orch = orchestrator(
            vec![(AdapterKind::Local, provider.clone())],
            rasterizer.clone(),
            false,
        );

        let result = orch
            .extract_document(Path::new("/tmp/form.pdf"), Some("task-1"), "English")
            .await;
        let fields = result.fields().unwrap();
        assert_eq!(
            fields,
            vec![
                FormField::new("Page 1 - Name", "Asha"),
                FormField::new("Page 2 - Name", "Asha"),
            ]
        );
        assert_eq!(provider.call_count(), 2);

        let dir = rasterizer.last_dir().unwrap();
        assert!(!dir.exists());
    }

    #[tokio::test]
    async fn test_pdf_pages_flatten_mappings() {
        let provider = MockProvider::ok("{\"applicant\": {\"name\": \"Ravi\"}}");
        let orch = orchestrator(
            vec![(AdapterKind::Local, provider)],
            Arc::new(FakeRasterizer::with_pages(1)),
            false,
        );
        let result = orch
            .extract_document(Path::new("form.pdf"), None, "English")
            .await;
        assert_eq!(
            result.fields().unwrap(),
            vec![FormField::new("Page 1 - applicant > name", "Ravi")]
        );
    }

    #[tokio::test]
    async fn test_pdf_page_failure_becomes_fields() {
        let orch = orchestrator(
            vec![(AdapterKind::Local, MockProvider::http_error(500))],
            Arc::new(FakeRasterizer::with_pages(1)),
            false,
        );
        let fields = orch
            .extract_document(Path::new("form.pdf"), None, "English")
            .await
            .fields()
            .unwrap();
        assert_eq!(fields[0].label, "Page 1 - Extraction Error");
        assert_eq!(
            fields[1],
            FormField::new("Page 1 - Message", "Failed to extract handwriting using Ollama")
        );
    }

    #[tokio::test]
    async fn test_zero_page_pdf() {
        let provider = MockProvider::ok("{}");
        let orch = orchestrator(
            vec![(AdapterKind::Local, provider.clone())],
            Arc::new(FakeRasterizer::with_pages(0)),
            false,
        );
        let result = orch
            .extract_document(Path::new("empty.pdf"), None, "English")
            .await;
        assert_eq!(
            result.fields().unwrap(),
            vec![FormField::new("PDF Error", "No pages found in PDF")]
        );
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn test_pages_without_fields_report_no_data() {
        let orch = orchestrator(
            vec![(AdapterKind::Local, MockProvider::ok("{}"))],
            Arc::new(FakeRasterizer::with_pages(2)),
            false,
        );
        let result = orch
            .extract_document(Path::new("blank.pdf"), None, "English")
            .await;
        assert_eq!(
            result.fields().unwrap(),
            vec![FormField::new("No Data", "No text extracted from PDF")]
        );
    }

    #[tokio::test]
    async fn test_rasterizer_unavailable() {
        let orch = orchestrator(
            vec![(AdapterKind::Local, MockProvider::ok("{}"))],
            Arc::new(FailingRasterizer(|| PipelineError::RasterizerUnavailable {
                program: "pdftocairo".to_string(),
            })),
            false,
        );
        let fields = orch
            .extract_document(Path::new("form.pdf"), None, "English")
            .await
            .fields()
            .unwrap();
        assert_eq!(fields[0], FormField::new("PDF Error", "PDF rasterizer not available"));
        assert_eq!(fields[1].label, "Solution");
    }

    #[tokio::test]
    async fn test_rasterizer_failure() {
        let orch = orchestrator(
            vec![(AdapterKind::Local, MockProvider::ok("{}"))],
            Arc::new(FailingRasterizer(|| PipelineError::Rasterize {
                path: "form.pdf".into(),
                message: "Syntax Error: Couldn't find trailer dictionary".to_string(),
            })),
            false,
        );
        let fields = orch
            .extract_document(Path::new("form.pdf"), None, "English")
            .await
            .fields()
            .unwrap();
        assert_eq!(fields[0].label, "PDF Processing Error");
        assert!(fields[0].value.contains("trailer dictionary"));
        assert_eq!(fields[1], FormField::new("Error Type", "RasterizeError"));
    }

    #[tokio::test]
    async fn test_image_success_returns_extracted_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("form.png");
        write_png(&path, 32, 32);
        let orch = orchestrator(
            vec![(AdapterKind::Local, MockProvider::ok("{\"date\": \"12/03/2024\"}"))],
            Arc::new(FakeRasterizer::with_pages(1)),
            false,
        );
        let result = orch.extract_document(&path, None, "English").await;
        assert_eq!(result.as_value()["date"], "12/03/2024");
    }

    #[tokio::test]
    async fn test_first_adapter_only_without_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("form.png");
        write_png(&path, 32, 32);
        let first = MockProvider::http_error(500);
        let second = MockProvider::ok("{\"a\": \"b\"}");
        let orch = orchestrator(
            vec![
                (AdapterKind::Hosted, first.clone()),
                (AdapterKind::Local, second.clone()),
            ],
            Arc::new(FakeRasterizer::with_pages(1)),
            false,
        );

        let envelope = orch.extract(&ExtractionRequest::new(&path)).await;
        assert!(!envelope.success);
        assert_eq!(first.call_count(), 1);
        assert_eq!(second.call_count(), 0);
    }

    #[tokio::test]
    async fn test_fallback_moves_down_chain() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("form.png");
        write_png(&path, 32, 32);
        let first = MockProvider::http_error(500);
        let second = MockProvider::ok("{\"a\": \"b\"}");
        let orch = orchestrator(
            vec![
                (AdapterKind::Hosted, first.clone()),
                (AdapterKind::Local, second.clone()),
            ],
            Arc::new(FakeRasterizer::with_pages(1)),
            true,
        );

        let envelope = orch.extract(&ExtractionRequest::new(&path)).await;
        assert!(envelope.success);
        assert_eq!(envelope.message, "Handwriting extracted successfully using Ollama");
        assert_eq!(first.call_count(), 1);
        assert_eq!(second.call_count(), 1);
    }

    #[test]
    fn test_from_config_with_local_only() {
        let mut config = Config::default();
        config.providers.hosted.api_key = String::new();
        config.providers.secondary.api_key = String::new();
        let orch = Orchestrator::from_config(&config).unwrap();
        assert_eq!(orch.provider_labels(), vec!["Ollama"]);

        config.providers.local.enabled = false;
        assert!(matches!(
            Orchestrator::from_config(&config),
            Err(ConfigError::NoProvider)
        ));
    }
}
