//! # insightforge-core
//!
//! Shared foundation for the InsightForge reporting pipeline: layered
//! configuration, error types, and the text-generation provider interface
//! used by the insight deriver.

pub mod config;
pub mod error;
pub mod providers;

pub use config::{ForgeConfig, LlmConfig, config_exists, load_config};
pub use error::{ConfigError, ForgeError, IngestError, LlmError, RenderError};
pub use providers::{MockTextGenerator, TextGenerator, create_generator};
