//! Sub-configuration structs with defaults for every section.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// General settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Directory where uploaded files are kept, one per task id
    pub uploads_dir: PathBuf,

    /// Directory where each task's result JSON is written
    pub results_dir: PathBuf,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            uploads_dir: PathBuf::from("~/.formscribe/uploads"),
            results_dir: PathBuf::from("~/.formscribe/results"),
        }
    }
}

/// Record store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// SQLite database file
    pub database_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("~/.formscribe/forms.db"),
        }
    }
}

/// Image preprocessing applied before an image is sent to a model.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessingConfig {
    /// When false, original file bytes are sent unmodified
    pub enabled: bool,

    /// Contrast enhancement factor (1.0 = unchanged)
    pub contrast: f32,

    /// Sharpness enhancement factor (1.0 = unchanged)
    pub sharpness: f32,

    /// Median filter kernel size (odd; 1 disables denoising)
    pub median_kernel: u32,

    /// Images whose longer side is below this are upscaled to it
    pub min_dimension: u32,

    /// JPEG re-encoding quality (1-100)
    pub jpeg_quality: u8,
}

impl Default for PreprocessingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            contrast: 1.5,
            sharpness: 1.3,
            median_kernel: 3,
            min_dimension: 512,
            jpeg_quality: 95,
        }
    }
}

/// Resource limits to protect against problematic inputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum upload size in megabytes
    pub max_file_size_mb: u64,

    /// Image decode + preprocessing timeout in milliseconds
    pub decode_timeout_ms: u64,

    /// Timeout for hosted and secondary inference calls, in seconds
    pub remote_timeout_secs: u64,

    /// Timeout for local inference calls, in seconds
    pub local_timeout_secs: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_file_size_mb: 50,
            decode_timeout_ms: 10_000,
            remote_timeout_secs: 60,
            local_timeout_secs: 120,
        }
    }
}

/// PDF rasterization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PdfConfig {
    /// Rendering resolution for each page
    pub dpi: u32,

    /// Rasterizer program (poppler's pdftocairo)
    pub rasterizer: String,
}

impl Default for PdfConfig {
    fn default() -> Self {
        Self {
            dpi: 200,
            rasterizer: "pdftocairo".to_string(),
        }
    }
}

/// How an adapter asks the model to shape its answer, and how it is parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseFormat {
    /// Free-form nested JSON object with keys derived from the form
    #[default]
    Structured,
    /// `{"fields": [{"label", "value"}]}` list of pairs
    Fields,
}

/// Inference provider settings, in priority order.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ProvidersConfig {
    /// Try the next configured provider when one returns a failure
    pub fallback_on_failure: bool,

    /// Hosted inference (HuggingFace router)
    pub hosted: HostedConfig,

    /// Secondary inference (Groq)
    pub secondary: SecondaryConfig,

    /// Local inference (Ollama)
    pub local: LocalConfig,
}

/// Hosted inference configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HostedConfig {
    /// OpenAI-compatible API base URL
    pub endpoint: String,

    /// API token (supports ${ENV_VAR} syntax)
    pub api_key: String,

    /// Model name
    pub model: String,

    /// Response shape requested from the model
    pub response_format: ResponseFormat,
}

impl Default for HostedConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://router.huggingface.co/v1".to_string(),
            api_key: "${HF_TOKEN}".to_string(),
            model: "Qwen/Qwen2.5-VL-7B-Instruct".to_string(),
            response_format: ResponseFormat::Fields,
        }
    }
}

/// Secondary inference configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SecondaryConfig {
    /// OpenAI-compatible API base URL
    pub endpoint: String,

    /// API key (supports ${ENV_VAR} syntax)
    pub api_key: String,

    /// Model name
    pub model: String,
}

impl Default for SecondaryConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.groq.com/openai/v1".to_string(),
            api_key: "${GROQ_API_KEY}".to_string(),
            model: "llama-3.2-11b-vision-preview".to_string(),
        }
    }
}

/// Local inference configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalConfig {
    /// Last-resort provider; disabling it can leave no usable provider
    pub enabled: bool,

    /// Ollama API endpoint
    pub endpoint: String,

    /// Model name
    pub model: String,
}

impl Default for LocalConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: "http://localhost:11434".to_string(),
            model: "llava".to_string(),
        }
    }
}

/// Translation backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslationConfig {
    /// OpenAI-compatible API base URL
    pub endpoint: String,

    /// API key (supports ${ENV_VAR} syntax); unset disables translation
    pub api_key: String,

    /// Text-completion model name
    pub model: String,

    /// Sampling temperature
    pub temperature: f32,

    /// Maximum tokens to generate
    pub max_tokens: u32,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.groq.com/openai/v1".to_string(),
            api_key: "${GROQ_API_KEY}".to_string(),
            model: "mixtral-8x7b-32768".to_string(),
            temperature: 0.3,
            max_tokens: 2000,
        }
    }
}

/// Trace ingestion settings (Langfuse-compatible).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TracingConfig {
    /// Ingestion host
    pub host: String,

    /// Public key (supports ${ENV_VAR} syntax)
    pub public_key: String,

    /// Secret key (supports ${ENV_VAR} syntax)
    pub secret_key: String,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            host: "https://cloud.langfuse.com".to_string(),
            public_key: "${LANGFUSE_PUBLIC_KEY}".to_string(),
            secret_key: "${LANGFUSE_SECRET_KEY}".to_string(),
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: error, warn, info, debug, trace
    pub level: String,

    /// Log format: "pretty" or "json"
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}
