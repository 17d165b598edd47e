//! Formscribe Core - handwritten form extraction library.
//!
//! Formscribe turns photographed or scanned handwritten forms into structured
//! JSON by asking a vision-language model to read them:
//!
//! ```text
//! Upload → Normalize (or rasterize PDF pages) → Provider → Parse → Translate → Store
//! ```
//!
//! Three provider adapters are supported: a hosted HuggingFace endpoint, Groq
//! as a secondary, and a local Ollama server. Results are persisted in SQLite.
//!
//! # Usage
//!
//! ```rust,ignore
//! use formscribe_core::{Config, FormService};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load()?;
//!     let service = FormService::from_config(&config)?;
//!
//!     let bytes = std::fs::read("./form.jpg")?;
//!     let receipt = service.upload("form.jpg", &bytes, "English").await?;
//!     println!("Stored record {}", receipt.record_id);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod extract;
pub mod llm;
pub mod parse;
pub mod pipeline;
pub mod service;
pub mod store;
pub mod trace;
pub mod translate;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use config::{Config, ResponseFormat};
pub use error::{
    ConfigError, PipelineError, PipelineResult, Result, ScribeError, ServiceError, StoreError,
};
pub use extract::{AdapterKind, ExtractionAdapter, Orchestrator};
pub use service::FormService;
pub use store::{RecordStore, SqliteRecordStore};
pub use trace::{TraceRecord, Tracer};
pub use translate::Translator;
pub use types::{
    ExtractionRequest, FormField, PersistedRecord, RecordList, ResultEnvelope, StructuredResult,
    UploadReceipt, DEFAULT_LANGUAGE,
};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
