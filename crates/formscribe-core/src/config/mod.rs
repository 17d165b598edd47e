//! Configuration management for formscribe.
//!
//! Configuration is loaded from the platform config directory
//! (`formscribe/config.toml`) with defaults for every value, then overlaid
//! with the conventional environment variables of the inference providers.

mod types;
mod validate;

pub use types::*;

use crate::error::ConfigError;
use crate::llm::provider::resolve_env_var;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Root configuration structure for formscribe.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Record store settings
    pub storage: StorageConfig,

    /// Image preprocessing settings
    pub preprocessing: PreprocessingConfig,

    /// Resource limits
    pub limits: LimitsConfig,

    /// PDF rasterization settings
    pub pdf: PdfConfig,

    /// Inference provider settings
    pub providers: ProvidersConfig,

    /// Translation backend settings
    pub translation: TranslationConfig,

    /// Trace ingestion settings
    pub tracing: TracingConfig,

    /// Logging settings
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from the default location, then apply environment overrides.
    ///
    /// Returns default configuration if the file doesn't exist.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::default_path();
        let mut config = if path.exists() {
            Self::load_from(&path)?
        } else {
            Self::default()
        };
        config.apply_env();
        Ok(config)
    }

    /// Load configuration from a specific file path.
    ///
    /// Environment overrides are not applied; call [`Config::apply_env`] for that.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default config file path.
    ///
    /// - macOS: ~/Library/Application Support/com.formscribe.formscribe/config.toml
    /// - Linux: ~/.config/formscribe/config.toml
    /// - Windows: C:\Users\<User>\AppData\Roaming\formscribe\config\config.toml
    ///
    /// Falls back to ~/.formscribe/config.toml if directory detection fails.
    pub fn default_path() -> PathBuf {
        directories::ProjectDirs::from("com", "formscribe", "formscribe")
            .map(|dirs| dirs.config_dir().to_path_buf().join("config.toml"))
            .unwrap_or_else(|| {
                let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
                PathBuf::from(home).join(".formscribe").join("config.toml")
            })
    }

    /// Overlay the process environment on top of file values.
    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    /// Overlay environment values provided by `lookup`.
    ///
    /// Only set, non-empty variables override. API keys written as
    /// `${VAR}` are resolved later, when providers are built.
    pub fn apply_env_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(flag) = get("ENABLE_IMAGE_PREPROCESSING") {
            self.preprocessing.enabled = flag.eq_ignore_ascii_case("true");
        }
        if let Some(host) = get("OLLAMA_HOST") {
            self.providers.local.endpoint = host;
        }
        if let Some(model) = get("OLLAMA_MODEL") {
            self.providers.local.model = model;
        }
        if let Some(host) = get("LANGFUSE_HOST") {
            self.tracing.host = host;
        }
        if let Some(db) = get("FORMSCRIBE_DATABASE") {
            self.storage.database_path = PathBuf::from(db);
        }

        // Alternate names for the hosted token, used only when the configured one is unset.
        let hosted_key_missing = match self.providers.hosted.api_key.strip_prefix("${") {
            Some(rest) => rest
                .strip_suffix('}')
                .map(|var| get(var).is_none())
                .unwrap_or(false),
            None => self.providers.hosted.api_key.is_empty(),
        };
        if hosted_key_missing {
            if let Some(token) = get("HUGGINGFACE_API_KEY").or_else(|| get("HUGGING_FACE_API_KEY"))
            {
                self.providers.hosted.api_key = token;
            }
        }
    }

    /// Whether trace ingestion credentials resolve.
    pub fn tracing_enabled(&self) -> bool {
        resolve_env_var(&self.tracing.public_key).is_some()
            && resolve_env_var(&self.tracing.secret_key).is_some()
    }

    /// Resolved uploads directory (with ~ expansion).
    pub fn uploads_dir(&self) -> PathBuf {
        expand(&self.general.uploads_dir)
    }

    /// Resolved results directory (with ~ expansion).
    pub fn results_dir(&self) -> PathBuf {
        expand(&self.general.results_dir)
    }

    /// Resolved database path (with ~ expansion).
    pub fn database_path(&self) -> PathBuf {
        expand(&self.storage.database_path)
    }

    /// Serialize the config to a pretty TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::ValidationError(e.to_string()))
    }
}

fn expand(path: &Path) -> PathBuf {
    let path_str = path.to_string_lossy();
    PathBuf::from(shellexpand::tilde(&path_str).into_owned())
}
