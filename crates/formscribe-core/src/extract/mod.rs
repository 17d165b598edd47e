//! Handwriting extraction: prompts, provider adapters and the orchestrator.

pub mod adapter;
pub mod orchestrator;
pub mod prompt;

pub use adapter::{AdapterContext, AdapterFactory, AdapterKind, ExtractionAdapter};
pub use orchestrator::Orchestrator;
