//! Error types for InsightForge.
//!
//! Uses `thiserror` for public API error types with structured variants
//! covering ingestion, text generation, rendering, and configuration.

use std::path::PathBuf;

/// Top-level error type for the InsightForge libraries.
#[derive(Debug, thiserror::Error)]
pub enum ForgeError {
    #[error("Ingestion error: {0}")]
    Ingest(#[from] IngestError),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while reading tabular input.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("No data files found or loaded in {}", dir.display())]
    NoData { dir: PathBuf },

    #[error("Failed to read {}: {message}", path.display())]
    Read { path: PathBuf, message: String },

    #[error("Failed to parse {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },
}

impl IngestError {
    pub fn read(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        Self::Read {
            path: path.into(),
            message: message.to_string(),
        }
    }

    pub fn parse(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        Self::Parse {
            path: path.into(),
            message: message.to_string(),
        }
    }
}

/// Errors from the text-generation collaborator.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Text generation is not configured: {reason}")]
    NotConfigured { reason: String },

    #[error("API request failed: {message}")]
    ApiRequest { message: String },

    #[error("API response parse error: {message}")]
    ResponseParse { message: String },

    #[error("Authentication failed for provider {provider}")]
    AuthFailed { provider: String },

    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },
}

/// Errors from chart and document rendering.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("Chart '{name}' failed: {message}")]
    Chart { name: String, message: String },

    #[error("PDF assembly failed: {message}")]
    Pdf { message: String },

    #[error("Slide deck assembly failed: {message}")]
    Slides { message: String },
}

impl RenderError {
    pub fn chart(name: impl Into<String>, message: impl ToString) -> Self {
        Self::Chart {
            name: name.into(),
            message: message.to_string(),
        }
    }

    pub fn pdf(message: impl ToString) -> Self {
        Self::Pdf {
            message: message.to_string(),
        }
    }

    pub fn slides(message: impl ToString) -> Self {
        Self::Slides {
            message: message.to_string(),
        }
    }
}

/// Errors from configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] Box<figment::Error>),

    #[error("Invalid configuration value for '{key}': {message}")]
    Invalid { key: String, message: String },
}

/// Convenience result alias.
pub type Result<T> = std::result::Result<T, ForgeError>;
