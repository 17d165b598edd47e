//! PDF rasterization through an external tool.
//!
//! Pages are rendered into a temporary directory owned by [`RasterPages`];
//! dropping it removes the rendered files.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tokio::process::Command;

use crate::error::PipelineError;

/// Rendered pages of one document, in page order.
#[derive(Debug)]
pub struct RasterPages {
    /// Held for its `Drop`, which deletes the page images.
    dir: TempDir,
    pages: Vec<PathBuf>,
}

impl RasterPages {
    /// Collect the images in `dir`, ordered by their trailing page number.
    pub fn from_dir(dir: TempDir) -> std::io::Result<Self> {
        let mut pages = std::fs::read_dir(dir.path())?
            .map(|entry| entry.map(|e| e.path()))
            .collect::<std::io::Result<Vec<_>>>()?;
        pages.retain(|p| p.is_file());
        pages.sort_by_key(|p| (page_number(p), p.clone()));
        Ok(Self { dir, pages })
    }

    pub fn pages(&self) -> &[PathBuf] {
        &self.pages
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Directory holding the page images.
    pub fn dir(&self) -> &Path {
        self.dir.path()
    }
}

/// Trailing number in a file stem such as `page-07`.
fn page_number(path: &Path) -> u64 {
    path.file_stem()
        .and_then(|s| s.to_str())
        .map(|stem| {
            let digits: String = stem
                .chars()
                .rev()
                .take_while(char::is_ascii_digit)
                .collect::<Vec<_>>()
                .into_iter()
                .rev()
                .collect();
            digits.parse().unwrap_or(u64::MAX)
        })
        .unwrap_or(u64::MAX)
}

/// Converts a PDF into one raster image per page.
#[async_trait]
pub trait Rasterizer: Send + Sync {
    async fn rasterize(&self, pdf: &Path, dpi: u32) -> Result<RasterPages, PipelineError>;
}

/// Rasterizer backed by poppler's `pdftocairo`.
#[derive(Debug, Clone)]
pub struct PdftocairoRasterizer {
    program: String,
}

impl PdftocairoRasterizer {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for PdftocairoRasterizer {
    fn default() -> Self {
        Self::new("pdftocairo")
    }
}

#[async_trait]
impl Rasterizer for PdftocairoRasterizer {
    async fn rasterize(&self, pdf: &Path, dpi: u32) -> Result<RasterPages, PipelineError> {
        let rasterize_err = |message: String| PipelineError::Rasterize {
            path: pdf.to_path_buf(),
            message,
        };

        let dir = tempfile::Builder::new()
            .prefix("formscribe-pages")
            .tempdir()
            .map_err(|e| rasterize_err(format!("Cannot create temporary directory: {e}")))?;

        // pdftocairo appends "-<page>.png" to this prefix.
        let out_prefix = dir.path().join("page");
        tracing::debug!(pdf = %pdf.display(), dpi, program = %self.program, "Rasterizing PDF");

        let output = Command::new(&self.program)
            .arg("-png")
            .arg("-r")
            .arg(dpi.to_string())
            .arg(pdf)
            .arg(&out_prefix)
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    PipelineError::RasterizerUnavailable {
                        program: self.program.clone(),
                    }
                } else {
                    rasterize_err(format!("Failed to run {}: {e}", self.program))
                }
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(rasterize_err(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )));
        }

        let pages = RasterPages::from_dir(dir)
            .map_err(|e| rasterize_err(format!("Cannot list rendered pages: {e}")))?;
        tracing::debug!(pdf = %pdf.display(), pages = pages.len(), "PDF rasterized");
        Ok(pages)
    }
}
