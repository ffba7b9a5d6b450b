//! Embedding backend implementations.

pub mod gemini;
pub mod ollama;
pub mod trigram;

pub use gemini::GeminiEmbedder;
pub use ollama::OllamaEmbedder;
pub use trigram::TrigramEmbedder;
