//! LLM integration for handwriting extraction and translation.
//!
//! Provides a provider abstraction over the inference backends: the
//! HuggingFace router and Groq (both OpenAI-compatible) and a local Ollama.

pub(crate) mod groq;
pub(crate) mod huggingface;
pub(crate) mod ollama;
pub(crate) mod openai;
pub mod provider;

pub use groq::GroqProvider;
pub use huggingface::HuggingFaceProvider;
pub use ollama::OllamaProvider;
pub use openai::OpenAiProvider;
pub use provider::{resolve_env_var, ImageInput, LlmProvider, LlmRequest, LlmResponse};
