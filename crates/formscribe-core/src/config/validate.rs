//! Configuration validation with range checks.

use crate::error::ConfigError;

use super::Config;

impl Config {
    /// Validate configuration values are within acceptable ranges.
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        let pre = &self.preprocessing;
        if pre.contrast <= 0.0 {
            return Err(ConfigError::ValidationError(
                "preprocessing.contrast must be > 0".into(),
            ));
        }
        if pre.sharpness <= 0.0 {
            return Err(ConfigError::ValidationError(
                "preprocessing.sharpness must be > 0".into(),
            ));
        }
        if pre.median_kernel == 0 || pre.median_kernel % 2 == 0 {
            return Err(ConfigError::ValidationError(
                "preprocessing.median_kernel must be an odd number >= 1".into(),
            ));
        }
        if pre.min_dimension == 0 {
            return Err(ConfigError::ValidationError(
                "preprocessing.min_dimension must be > 0".into(),
            ));
        }
        if pre.jpeg_quality == 0 || pre.jpeg_quality > 100 {
            return Err(ConfigError::ValidationError(
                "preprocessing.jpeg_quality must be between 1 and 100".into(),
            ));
        }
        if self.limits.max_file_size_mb == 0 {
            return Err(ConfigError::ValidationError(
                "limits.max_file_size_mb must be > 0".into(),
            ));
        }
        if self.limits.decode_timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "limits.decode_timeout_ms must be > 0".into(),
            ));
        }
        if self.limits.remote_timeout_secs == 0 || self.limits.local_timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "limits.remote_timeout_secs and limits.local_timeout_secs must be > 0".into(),
            ));
        }
        if !(72..=600).contains(&self.pdf.dpi) {
            return Err(ConfigError::ValidationError(
                "pdf.dpi must be between 72 and 600".into(),
            ));
        }
        if self.pdf.rasterizer.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "pdf.rasterizer must not be empty".into(),
            ));
        }
        if !(0.0..=2.0).contains(&self.translation.temperature) {
            return Err(ConfigError::ValidationError(
                "translation.temperature must be between 0.0 and 2.0".into(),
            ));
        }
        Ok(())
    }
}
