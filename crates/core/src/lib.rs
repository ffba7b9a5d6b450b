//! Compass Core Library
//!
//! This crate provides the foundational utilities shared by every Compass crate:
//! - Error handling (`AppError`, `AppResult`)
//! - Logging infrastructure
//! - Configuration management (one explicit `AppConfig`, passed into constructors)

pub mod config;
pub mod error;
pub mod logging;

// Re-export commonly used types
pub use config::{
    AppConfig, DimensionPolicy, EmbeddingSettings, LlmSettings, MemorySettings, RetrievalSettings,
};
pub use error::{AppError, AppResult};
