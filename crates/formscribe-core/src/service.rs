//! Upload and record operations over one orchestrator and one record store.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::Config;
use crate::error::{ConfigError, ScribeError, ServiceError, StoreError};
use crate::extract::Orchestrator;
use crate::store::{RecordStore, SqliteRecordStore};
use crate::types::{PersistedRecord, RecordList, StructuredResult, UploadReceipt};

const MIB: u64 = 1024 * 1024;

/// Extensions accepted for upload (compared case-insensitively).
pub const ALLOWED_EXTENSIONS: &[&str] = &[".png", ".jpg", ".jpeg", ".pdf"];

/// Entry point for uploads and stored-record management.
///
/// A service opened with [`FormService::records`] has no extraction pipeline;
/// its record operations work as usual and `upload` reports
/// [`ServiceError::Extraction`].
pub struct FormService {
    orchestrator: Option<Orchestrator>,
    store: Arc<dyn RecordStore>,
    uploads_dir: PathBuf,
    results_dir: PathBuf,
    max_file_size_mb: u64,
}

impl FormService {
    pub fn new(
        orchestrator: Orchestrator,
        store: Arc<dyn RecordStore>,
        uploads_dir: PathBuf,
        results_dir: PathBuf,
        max_file_size_mb: u64,
    ) -> Self {
        Self {
            orchestrator: Some(orchestrator),
            ..Self::with_store(store, uploads_dir, results_dir, max_file_size_mb)
        }
    }

    /// Build the pipeline and open the record store described by `config`.
    pub fn from_config(config: &Config) -> Result<Self, ScribeError> {
        let orchestrator = Orchestrator::from_config(config)?;
        let mut service = Self::records(config)?;
        service.orchestrator = Some(orchestrator);
        Ok(service)
    }

    /// Open only the record store; no inference provider is needed.
    pub fn records(config: &Config) -> Result<Self, StoreError> {
        let store: Arc<dyn RecordStore> = Arc::new(SqliteRecordStore::open(&config.database_path())?);
        Ok(Self::with_store(
            store,
            config.uploads_dir(),
            config.results_dir(),
            config.limits.max_file_size_mb,
        ))
    }

    fn with_store(
        store: Arc<dyn RecordStore>,
        uploads_dir: PathBuf,
        results_dir: PathBuf,
        max_file_size_mb: u64,
    ) -> Self {
        Self {
            orchestrator: None,
            store,
            uploads_dir,
            results_dir,
            max_file_size_mb,
        }
    }

    pub fn orchestrator(&self) -> Option<&Orchestrator> {
        self.orchestrator.as_ref()
    }

    /// Store an uploaded file, extract it, and persist the result.
    ///
    /// The file type is checked before any pipeline work happens.
    pub async fn upload(
        &self,
        filename: &str,
        bytes: &[u8],
        language: &str,
    ) -> Result<UploadReceipt, ServiceError> {
        let extension = validate_extension(filename)?;

        let size = bytes.len() as u64;
        if size > self.max_file_size_mb * MIB {
            return Err(ServiceError::FileTooLarge {
                size_mb: size.div_ceil(MIB),
                max_mb: self.max_file_size_mb,
            });
        }
        let orchestrator = self.orchestrator.as_ref().ok_or(ConfigError::NoProvider)?;

        let task_id = uuid::Uuid::new_v4().to_string();
        tokio::fs::create_dir_all(&self.uploads_dir).await?;
        let upload_path = self.uploads_dir.join(format!("{task_id}{extension}"));
        tokio::fs::write(&upload_path, bytes).await?;
        tracing::info!(task_id = %task_id, file = filename, "Upload stored");

        let result = orchestrator
            .extract_document(&upload_path, Some(&task_id), language)
            .await;

        self.write_result_file(&task_id, &result).await?;

        let record = self
            .blocking({
                let task_id = task_id.clone();
                move |store| store.insert(&task_id, &result)
            })
            .await?;

        tracing::info!(task_id = %task_id, record_id = record.id, "Upload processed");
        Ok(UploadReceipt {
            task_id,
            record_id: record.id,
            status: "success".to_string(),
            message: "File uploaded and processed successfully".to_string(),
        })
    }

    /// Record produced by the upload with `task_id`.
    pub async fn result_by_task(&self, task_id: &str) -> Result<PersistedRecord, ServiceError> {
        let task = task_id.to_string();
        self.blocking(move |store| store.get_by_task_id(&task))
            .await?
            .ok_or_else(|| not_found("Result"))
    }

    pub async fn record(&self, id: i64) -> Result<PersistedRecord, ServiceError> {
        self.blocking(move |store| store.get(id))
            .await?
            .ok_or_else(|| not_found("Record"))
    }

    /// All records, newest first.
    pub async fn list_records(&self) -> Result<RecordList, ServiceError> {
        let records = self.blocking(|store| store.list()).await?;
        Ok(RecordList::from(records))
    }

    /// Replace a record's data wholesale.
    pub async fn update_record(
        &self,
        id: i64,
        raw_json: StructuredResult,
    ) -> Result<PersistedRecord, ServiceError> {
        self.blocking(move |store| store.update(id, &raw_json))
            .await?
            .ok_or_else(|| not_found("Record"))
    }

    pub async fn delete_record(&self, id: i64) -> Result<(), ServiceError> {
        if self.blocking(move |store| store.delete(id)).await? {
            Ok(())
        } else {
            Err(not_found("Record"))
        }
    }

    /// Probe the record store.
    pub async fn health(&self) -> Result<(), ServiceError> {
        self.blocking(|store| store.ping()).await
    }

    async fn write_result_file(&self, task_id: &str, result: &StructuredResult) -> Result<(), ServiceError> {
        tokio::fs::create_dir_all(&self.results_dir).await?;
        let path = self.results_dir.join(format!("{task_id}.json"));
        let json = serde_json::to_vec_pretty(result).map_err(StoreError::from)?;
        tokio::fs::write(&path, json).await?;
        tracing::debug!(path = %path.display(), "Result file written");
        Ok(())
    }

    /// Run a store call on the blocking pool.
    async fn blocking<T, F>(&self, f: F) -> Result<T, ServiceError>
    where
        T: Send + 'static,
        F: FnOnce(&dyn RecordStore) -> Result<T, StoreError> + Send + 'static,
    {
        let store = Arc::clone(&self.store);
        tokio::task::spawn_blocking(move || f(store.as_ref()))
            .await
            .map_err(|e| StoreError::Unavailable(format!("store task failed: {e}")))?
            .map_err(ServiceError::from)
    }
}

fn not_found(what: &str) -> ServiceError {
    ServiceError::NotFound {
        what: what.to_string(),
    }
}

/// Lower-cased extension of `filename` including the dot, if allowed.
pub fn validate_extension(filename: &str) -> Result<String, ServiceError> {
    let name = filename.trim();
    if name.is_empty() {
        return Err(ServiceError::MissingFile);
    }
    let extension = Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e.to_ascii_lowercase()))
        .unwrap_or_default();
    if ALLOWED_EXTENSIONS.contains(&extension.as_str()) {
        Ok(extension)
    } else {
        Err(ServiceError::UnsupportedFileType {
            extension,
            allowed: ALLOWED_EXTENSIONS.join(", "),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{LimitsConfig, PreprocessingConfig, ResponseFormat};
    use crate::extract::{AdapterContext, AdapterKind, ExtractionAdapter};
    use crate::llm::provider::LlmProvider;
    use crate::pipeline::ImageNormalizer;
    use crate::testing::{FakeRasterizer, MockProvider};
    use crate::trace::Tracer;
    use crate::translate::Translator;
    use image::{ImageFormat, Rgb, RgbImage};
    use serde_json::json;
    use std::io::Cursor;

    struct Fixture {
        service: FormService,
        provider: Arc<MockProvider>,
        dir: tempfile::TempDir,
    }

    fn fixture(answer: &str) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let provider = MockProvider::ok(answer);
        let adapter = ExtractionAdapter::new(
            AdapterKind::Local,
            provider.clone() as Arc<dyn LlmProvider>,
            ResponseFormat::Structured,
        );
        let ctx = AdapterContext {
            normalizer: ImageNormalizer::new(PreprocessingConfig::default(), &LimitsConfig::default()),
            translator: Translator::disabled(),
            tracer: Tracer::disabled(),
        };
        let orchestrator =
            Orchestrator::new(vec![adapter], ctx, Arc::new(FakeRasterizer::with_pages(2)), 200, false)
                .unwrap();
        let store: Arc<dyn RecordStore> = Arc::new(SqliteRecordStore::open_in_memory().unwrap());
        let service = FormService::new(
            orchestrator,
            store,
            dir.path().join("uploads"),
            dir.path().join("results"),
            1,
        );
        Fixture {
            service,
            provider,
            dir,
        }
    }

    fn png_bytes() -> Vec<u8> {
        let mut bytes = Vec::new();
        RgbImage::from_pixel(40, 20, Rgb([240, 240, 240]))
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        bytes
    }

    #[test]
    fn test_validate_extension() {
        assert_eq!(validate_extension("scan.JPG").unwrap(), ".jpg");
        assert_eq!(validate_extension("form.pdf").unwrap(), ".pdf");
        assert!(matches!(validate_extension("  "), Err(ServiceError::MissingFile)));
        assert!(matches!(
            validate_extension("notes.txt"),
            Err(ServiceError::UnsupportedFileType { .. })
        ));
        assert!(matches!(
            validate_extension("README"),
            Err(ServiceError::UnsupportedFileType { .. })
        ));
    }

    #[tokio::test]
    async fn test_text_upload_rejected_without_provider_call() {
        let fx = fixture("{}");
        let err = fx
            .service
            .upload("notes.txt", b"hello", "English")
            .await
            .unwrap_err();
        assert!(err.is_client_error());
        assert!(matches!(err, ServiceError::UnsupportedFileType { .. }));
        assert_eq!(fx.provider.call_count(), 0);
        assert!(!fx.dir.path().join("uploads").exists());
    }

    #[tokio::test]
    async fn test_oversized_upload_rejected() {
        let fx = fixture("{}");
        let bytes = vec![0u8; 3 * 1024 * 1024 / 2];
        let err = fx.service.upload("big.png", &bytes, "English").await.unwrap_err();
        assert!(matches!(
            err,
            ServiceError::FileTooLarge {
                size_mb: 2,
                max_mb: 1
            }
        ));
        assert_eq!(err.to_string(), "File too large: 2MB > 1MB");
        assert_eq!(fx.provider.call_count(), 0);
    }

    fn providerless_config(dir: &tempfile::TempDir) -> Config {
        let mut config = Config::default();
        config.providers.hosted.api_key = String::new();
        config.providers.secondary.api_key = String::new();
        config.providers.local.enabled = false;
        config.storage.database_path = dir.path().join("forms.db");
        config.general.uploads_dir = dir.path().join("uploads");
        config.general.results_dir = dir.path().join("results");
        config
    }

    #[tokio::test]
    async fn test_records_open_without_provider() {
        let dir = tempfile::tempdir().unwrap();
        let config = providerless_config(&dir);
        assert!(FormService::from_config(&config).is_err());

        let service = FormService::records(&config).unwrap();
        assert!(service.orchestrator().is_none());
        service.health().await.unwrap();
        assert_eq!(service.list_records().await.unwrap().count, 0);
        assert!(matches!(
            service.record(1).await,
            Err(ServiceError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_upload_without_provider_is_server_error() {
        let dir = tempfile::tempdir().unwrap();
        let service = FormService::records(&providerless_config(&dir)).unwrap();

        let err = service.upload("form.png", &png_bytes(), "English").await.unwrap_err();
        assert!(matches!(err, ServiceError::Extraction(ConfigError::NoProvider)));
        assert!(!err.is_client_error());
        assert!(!dir.path().join("uploads").exists());

        let err = service.upload("notes.txt", b"hi", "English").await.unwrap_err();
        assert!(err.is_client_error());
    }

    #[tokio::test]
    async fn test_image_upload_persists_everything() {
        let fx = fixture("{\"name\": \"Asha\"}");
        let receipt = fx
            .service
            .upload("Form.PNG", &png_bytes(), "English")
            .await
            .unwrap();

        assert_eq!(receipt.status, "success");
        assert_eq!(receipt.message, "File uploaded and processed successfully");
        assert!(uuid::Uuid::parse_str(&receipt.task_id).is_ok());
        assert!(fx
            .dir
            .path()
            .join("uploads")
            .join(format!("{}.png", receipt.task_id))
            .exists());

        let result_file = fx
            .dir
            .path()
            .join("results")
            .join(format!("{}.json", receipt.task_id));
        let written: serde_json::Value =
            serde_json::from_slice(&std::fs::read(result_file).unwrap()).unwrap();
        assert_eq!(written, json!({"name": "Asha"}));

        let record = fx.service.result_by_task(&receipt.task_id).await.unwrap();
        assert_eq!(record.id, receipt.record_id);
        assert_eq!(record.raw_json.as_value(), &json!({"name": "Asha"}));
    }

    #[tokio::test]
    async fn test_pdf_upload_fans_out_pages() {
        let fx = fixture("{\"name\": \"Asha\"}");
        let receipt = fx
            .service
            .upload("scan.pdf", b"%PDF-1.4", "English")
            .await
            .unwrap();
        let record = fx.service.record(receipt.record_id).await.unwrap();
        let labels: Vec<_> = record
            .raw_json
            .fields()
            .unwrap()
            .into_iter()
            .map(|f| f.label)
            .collect();
        assert_eq!(labels, vec!["Page 1 - name", "Page 2 - name"]);
        assert_eq!(fx.provider.call_count(), 2);
    }

    #[tokio::test]
    async fn test_record_crud() {
        let fx = fixture("{\"name\": \"Asha\"}");
        let receipt = fx
            .service
            .upload("form.jpg", &png_bytes(), "English")
            .await
            .unwrap();

        let list = fx.service.list_records().await.unwrap();
        assert_eq!(list.count, 1);

        let updated = fx
            .service
            .update_record(
                receipt.record_id,
                StructuredResult::from_value(json!({"name": "Asha K"})),
            )
            .await
            .unwrap();
        assert_eq!(updated.raw_json.as_value()["name"], "Asha K");

        fx.service.delete_record(receipt.record_id).await.unwrap();
        let err = fx.service.record(receipt.record_id).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound { .. }));
        let err = fx.service.delete_record(receipt.record_id).await.unwrap_err();
        assert!(err.is_client_error());
    }

    #[tokio::test]
    async fn test_unknown_task_and_health() {
        let fx = fixture("{}");
        let err = fx.service.result_by_task("missing").await.unwrap_err();
        assert_eq!(err.to_string(), "Result not found");
        fx.service.health().await.unwrap();
    }
}
