//! Image normalization before an image is sent to a vision model.
//!
//! The enhancement chain is contrast, sharpness, median denoise, minimum-size
//! upscale and JPEG re-encode. It is best-effort: if any step fails the
//! original file bytes are sent instead.

use image::codecs::jpeg::JpegEncoder;
use image::imageops::{self, FilterType};
use image::{Rgb, RgbImage};
use imageproc::filter::median_filter;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

use super::sniff::sniff_format_or_jpeg;
use crate::config::{LimitsConfig, PreprocessingConfig};
use crate::error::PipelineError;
use crate::llm::provider::ImageInput;

/// 3x3 smoothing kernel used as the blur reference for sharpening.
const SMOOTH_KERNEL: [f32; 9] = [1.0, 1.0, 1.0, 1.0, 5.0, 1.0, 1.0, 1.0, 1.0];

/// Prepares images for model consumption.
#[derive(Debug, Clone)]
pub struct ImageNormalizer {
    preprocessing: PreprocessingConfig,
    decode_timeout_ms: u64,
}

impl ImageNormalizer {
    pub fn new(preprocessing: PreprocessingConfig, limits: &LimitsConfig) -> Self {
        Self {
            preprocessing,
            decode_timeout_ms: limits.decode_timeout_ms,
        }
    }

    /// Read and normalize the image at `path`.
    ///
    /// Only a failure to read the file is an error. Decode, filter or encode
    /// failures fall back to the original bytes.
    pub async fn normalize(&self, path: &Path) -> Result<ImageInput, PipelineError> {
        let bytes = tokio::fs::read(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                PipelineError::FileNotFound(path.to_path_buf())
            } else {
                PipelineError::Normalize {
                    path: path.to_path_buf(),
                    message: format!("Cannot read file: {e}"),
                }
            }
        })?;

        if !self.preprocessing.enabled {
            tracing::debug!(path = %path.display(), "Preprocessing disabled, sending original bytes");
            return Ok(passthrough(&bytes));
        }

        let bytes: Arc<[u8]> = Arc::from(bytes);
        match self.enhance(Arc::clone(&bytes), path).await {
            Ok(jpeg) => {
                tracing::debug!(
                    path = %path.display(),
                    original_bytes = bytes.len(),
                    normalized_bytes = jpeg.len(),
                    "Image normalized"
                );
                Ok(ImageInput::from_bytes(&jpeg, "jpeg"))
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    "Preprocessing failed, using original image: {e}"
                );
                Ok(passthrough(&bytes))
            }
        }
    }

    /// Run the enhancement chain on a blocking thread under the decode timeout.
    async fn enhance(&self, bytes: Arc<[u8]>, path: &Path) -> Result<Vec<u8>, PipelineError> {
        let settings = self.preprocessing.clone();
        let path_owned = path.to_path_buf();
        let timeout_duration = Duration::from_millis(self.decode_timeout_ms);

        let result = timeout(timeout_duration, async {
            tokio::task::spawn_blocking(move || enhance_sync(&bytes, &settings, &path_owned)).await
        })
        .await;

        match result {
            Ok(Ok(inner)) => inner,
            Ok(Err(e)) => Err(PipelineError::Normalize {
                path: path.to_path_buf(),
                message: format!("Task join error: {e}"),
            }),
            Err(_) => Err(PipelineError::Timeout {
                stage: "normalize".to_string(),
                timeout_ms: self.decode_timeout_ms,
            }),
        }
    }
}

fn passthrough(bytes: &[u8]) -> ImageInput {
    ImageInput::from_bytes(bytes, sniff_format_or_jpeg(bytes))
}

fn enhance_sync(
    bytes: &[u8],
    settings: &PreprocessingConfig,
    path: &PathBuf,
) -> Result<Vec<u8>, PipelineError> {
    let normalize_err = |message: String| PipelineError::Normalize {
        path: path.clone(),
        message,
    };

    let image = image::load_from_memory(bytes)
        .map_err(|e| normalize_err(format!("Cannot decode image: {e}")))?
        .to_rgb8();

    let image = adjust_contrast(&image, settings.contrast);
    let image = adjust_sharpness(&image, settings.sharpness);

    let radius = settings.median_kernel / 2;
    let image = if radius > 0 {
        median_filter(&image, radius, radius)
    } else {
        image
    };

    let image = match upscale_dimensions(image.width(), image.height(), settings.min_dimension) {
        Some((width, height)) => imageops::resize(&image, width, height, FilterType::Lanczos3),
        None => image,
    };

    let mut buffer = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut buffer, settings.jpeg_quality);
    encoder
        .encode_image(&image)
        .map_err(|e| normalize_err(format!("Cannot encode JPEG: {e}")))?;
    Ok(buffer)
}

/// Mean luminance (ITU-R 601-2) over all pixels.
fn mean_luminance(image: &RgbImage) -> f32 {
    let count = u64::from(image.width()) * u64::from(image.height());
    if count == 0 {
        return 0.0;
    }
    let total: f64 = image
        .pixels()
        .map(|Rgb([r, g, b])| 0.299 * f64::from(*r) + 0.587 * f64::from(*g) + 0.114 * f64::from(*b))
        .sum();
    (total / count as f64) as f32
}

#[inline]
fn blend(base: f32, value: u8, factor: f32) -> u8 {
    (base + factor * (f32::from(value) - base)).round().clamp(0.0, 255.0) as u8
}

/// Scale each channel's distance from the mean luminance by `factor`.
fn adjust_contrast(image: &RgbImage, factor: f32) -> RgbImage {
    let mean = mean_luminance(image).round();
    let mut out = image.clone();
    for pixel in out.pixels_mut() {
        for channel in pixel.0.iter_mut() {
            *channel = blend(mean, *channel, factor);
        }
    }
    out
}

/// Scale each pixel's distance from its smoothed neighbourhood by `factor`.
///
/// The one-pixel border has no full neighbourhood and is left unchanged.
fn adjust_sharpness(image: &RgbImage, factor: f32) -> RgbImage {
    let (width, height) = image.dimensions();
    if width < 3 || height < 3 {
        return image.clone();
    }
    let smooth: RgbImage = imageops::filter3x3(image, &SMOOTH_KERNEL);
    let mut out = image.clone();
    for y in 1..height - 1 {
        for x in 1..width - 1 {
            let reference = smooth.get_pixel(x, y);
            let pixel = out.get_pixel_mut(x, y);
            for (channel, base) in pixel.0.iter_mut().zip(reference.0.iter()) {
                *channel = blend(f32::from(*base), *channel, factor);
            }
        }
    }
    out
}

/// Target size when the longer side is below `min_dimension`.
///
/// Scales isotropically so the longer side is exactly `min_dimension`; the
/// shorter side is floored and never drops below 1.
pub fn upscale_dimensions(width: u32, height: u32, min_dimension: u32) -> Option<(u32, u32)> {
    let longer = width.max(height);
    if longer == 0 || longer >= min_dimension {
        return None;
    }
    let scale = |side: u32| -> u32 {
        let scaled = u64::from(side) * u64::from(min_dimension) / u64::from(longer);
        (scaled as u32).max(1)
    };
    if width >= height {
        Some((min_dimension, scale(height)))
    } else {
        Some((scale(width), min_dimension))
    }
}
