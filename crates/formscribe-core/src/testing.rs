//! Test doubles shared by the unit tests.

use async_trait::async_trait;
use image::{Rgb, RgbImage};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::error::PipelineError;
use crate::llm::provider::{LlmProvider, LlmRequest, LlmResponse};
use crate::pipeline::{RasterPages, Rasterizer};
use crate::trace::{TraceRecord, TraceSink};

/// Provider returning a fixed answer (or HTTP error) and counting calls.
pub(crate) struct MockProvider {
    name: String,
    answer: Result<String, u16>,
    pub calls: AtomicUsize,
    pub requests: Mutex<Vec<LlmRequest>>,
}

impl MockProvider {
    pub fn ok(answer: &str) -> Arc<Self> {
        Self::build(Ok(answer.to_string()))
    }

    /// Every call fails with the given HTTP status.
    pub fn http_error(status: u16) -> Arc<Self> {
        Self::build(Err(status))
    }

    fn build(answer: Result<String, u16>) -> Arc<Self> {
        Arc::new(Self {
            name: "mock".to_string(),
            answer,
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LlmProvider for MockProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate(&self, request: &LlmRequest) -> Result<LlmResponse, PipelineError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());
        match &self.answer {
            Ok(text) => Ok(LlmResponse {
                text: text.clone(),
                model: "mock-model".to_string(),
                tokens_used: Some(42),
                latency_ms: 1,
            }),
            Err(status) => Err(PipelineError::Llm {
                message: format!("mock HTTP {status}"),
                status_code: Some(*status),
            }),
        }
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(5)
    }
}

/// Sink that keeps records in memory, or fails every call.
#[derive(Default)]
pub(crate) struct MemorySink {
    pub fail: bool,
    pub calls: AtomicUsize,
    pub records: Mutex<Vec<TraceRecord>>,
}

impl MemorySink {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn names(&self) -> Vec<String> {
        self.records
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.name.clone())
            .collect()
    }

    pub fn records(&self) -> Vec<TraceRecord> {
        self.records.lock().unwrap().clone()
    }
}

#[async_trait]
impl TraceSink for MemorySink {
    async fn record(&self, record: &TraceRecord) -> Result<(), PipelineError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(PipelineError::Trace("collector unreachable".to_string()));
        }
        self.records.lock().unwrap().push(record.clone());
        Ok(())
    }
}

/// Rasterizer writing `pages` small PNGs into a fresh temp dir.
///
/// The directory of the last call is remembered so tests can check cleanup.
#[derive(Default)]
pub(crate) struct FakeRasterizer {
    pub pages: usize,
    pub last_dir: Mutex<Option<PathBuf>>,
}

impl FakeRasterizer {
    pub fn with_pages(pages: usize) -> Self {
        Self {
            pages,
            last_dir: Mutex::new(None),
        }
    }

    pub fn last_dir(&self) -> Option<PathBuf> {
        self.last_dir.lock().unwrap().clone()
    }
}

#[async_trait]
impl Rasterizer for FakeRasterizer {
    async fn rasterize(&self, _pdf: &Path, _dpi: u32) -> Result<RasterPages, PipelineError> {
        let dir = tempfile::tempdir().unwrap();
        for n in 1..=self.pages {
            write_png(&dir.path().join(format!("page-{n}.png")), 40, 20);
        }
        *self.last_dir.lock().unwrap() = Some(dir.path().to_path_buf());
        Ok(RasterPages::from_dir(dir).unwrap())
    }
}

/// Rasterizer that always fails with the given error builder.
pub(crate) struct FailingRasterizer(pub fn() -> PipelineError);

#[async_trait]
impl Rasterizer for FailingRasterizer {
    async fn rasterize(&self, _pdf: &Path, _dpi: u32) -> Result<RasterPages, PipelineError> {
        Err((self.0)())
    }
}

/// Write a flat light-grey PNG.
pub(crate) fn write_png(path: &Path, width: u32, height: u32) {
    RgbImage::from_pixel(width, height, Rgb([220, 220, 220]))
        .save(path)
        .unwrap();
}
