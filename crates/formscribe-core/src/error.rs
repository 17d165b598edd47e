//! Error types for the formscribe extraction pipeline.
//!
//! Errors are organized by stage so callers can tell a missing credential
//! apart from a failed network call or a broken record store.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for formscribe operations.
#[derive(Error, Debug)]
pub enum ScribeError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Pipeline processing errors
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// Record storage errors
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    /// General I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the config file from disk
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse TOML configuration
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Configuration values are invalid
    #[error("Invalid configuration: {0}")]
    ValidationError(String),

    /// Every inference provider is unconfigured or disabled
    #[error("No inference provider is usable: configure a hosted token, a secondary key, or enable the local provider")]
    NoProvider,
}

/// Pipeline processing errors, organized by stage.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Reading or preparing an image failed
    #[error("Normalization failed for {path}: {message}")]
    Normalize { path: PathBuf, message: String },

    /// PDF rasterization failed
    #[error("Rasterization failed for {path}: {message}")]
    Rasterize { path: PathBuf, message: String },

    /// The external rasterizer binary is not installed
    #[error("PDF rasterizer '{program}' is not available")]
    RasterizerUnavailable { program: String },

    /// LLM request failed (network, HTTP status, or malformed response)
    #[error("LLM error: {message}")]
    Llm {
        message: String,
        status_code: Option<u16>,
    },

    /// Operation timed out
    #[error("Timeout in {stage} stage after {timeout_ms}ms")]
    Timeout { stage: String, timeout_ms: u64 },

    /// Trace ingestion failed
    #[error("Trace error: {0}")]
    Trace(String),

    /// File not found
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),
}

impl PipelineError {
    /// Short, stable name of the error variant, used in diagnostic fields.
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::Normalize { .. } => "NormalizeError",
            PipelineError::Rasterize { .. } => "RasterizeError",
            PipelineError::RasterizerUnavailable { .. } => "RasterizerUnavailable",
            PipelineError::Llm { .. } => "LlmError",
            PipelineError::Timeout { .. } => "Timeout",
            PipelineError::Trace(_) => "TraceError",
            PipelineError::FileNotFound(_) => "FileNotFound",
        }
    }
}

/// Record storage errors.
#[derive(Error, Debug)]
pub enum StoreError {
    /// SQLite returned an error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Stored JSON could not be encoded or decoded
    #[error("Stored JSON is invalid: {0}")]
    Json(#[from] serde_json::Error),

    /// Creating the database directory failed
    #[error("Failed to prepare database location: {0}")]
    Io(#[from] std::io::Error),

    /// The connection mutex was poisoned by a panicking writer
    #[error("Database connection is unavailable: {0}")]
    Unavailable(String),
}

/// Errors surfaced at the upload / record boundary.
#[derive(Error, Debug)]
pub enum ServiceError {
    /// No filename (or an empty one) was supplied
    #[error("No file provided")]
    MissingFile,

    /// Extension outside the accepted set
    #[error("Invalid file type '{extension}'. Allowed: {allowed}")]
    UnsupportedFileType { extension: String, allowed: String },

    /// Upload exceeds the configured size limit
    #[error("File too large: {size_mb}MB > {max_mb}MB")]
    FileTooLarge { size_mb: u64, max_mb: u64 },

    /// Record lookup failed
    #[error("{what} not found")]
    NotFound { what: String },

    /// The extraction pipeline could not be built (no usable provider)
    #[error("Extraction unavailable: {0}")]
    Extraction(#[from] ConfigError),

    /// Persisting, updating or deleting a record failed
    #[error("Storage failure: {0}")]
    Store(#[from] StoreError),

    /// Writing the upload or result file failed
    #[error("Processing error: {0}")]
    Io(#[from] std::io::Error),
}

impl ServiceError {
    /// Whether the caller is at fault (the HTTP 4xx family).
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ServiceError::MissingFile
                | ServiceError::UnsupportedFileType { .. }
                | ServiceError::FileTooLarge { .. }
                | ServiceError::NotFound { .. }
        )
    }
}

/// Convenience type alias for formscribe results.
pub type Result<T> = std::result::Result<T, ScribeError>;

/// Convenience type alias for pipeline-specific results.
pub type PipelineResult<T> = std::result::Result<T, PipelineError>;
