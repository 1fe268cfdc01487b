//! Text-generation providers.
//!
//! The insight deriver talks to a [`TextGenerator`]; the only production
//! implementation is the OpenAI-compatible chat-completions client.

pub mod openai_compat;

pub use openai_compat::OpenAiCompatibleClient;

use crate::config::LlmConfig;
use crate::error::LlmError;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use tracing::debug;

/// A single-shot text-generation backend.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Send a system + user prompt pair and return the raw response text.
    async fn generate(&self, system: &str, prompt: &str) -> Result<String, LlmError>;

    /// Model identifier, for logging.
    fn model_name(&self) -> &str;
}

/// Build the configured generator, or explain why none is available.
pub fn create_generator(config: &LlmConfig) -> Result<Box<dyn TextGenerator>, LlmError> {
    if !config.enabled {
        return Err(LlmError::NotConfigured {
            reason: "llm.enabled is false".into(),
        });
    }
    match config.provider.as_str() {
        "openai" | "openai-compatible" | "ollama" | "vllm" => {
            let client = OpenAiCompatibleClient::new(config)?;
            debug!(model = %config.model, "Created OpenAI-compatible generator");
            Ok(Box::new(client))
        }
        other => Err(LlmError::NotConfigured {
            reason: format!("unknown provider '{other}'"),
        }),
    }
}

/// A scripted generator for tests and offline runs.
///
/// Queued replies are served first in, first out. Once the queue is empty
/// every call gets the fallback reply, if one was set.
pub struct MockTextGenerator {
    model: String,
    responses: Mutex<VecDeque<Result<String, String>>>,
    fallback: Option<Result<String, String>>,
}

impl MockTextGenerator {
    pub fn new() -> Self {
        Self {
            model: "mock-model".to_string(),
            responses: Mutex::new(VecDeque::new()),
            fallback: None,
        }
    }

    /// A generator that answers every call with `text`.
    pub fn with_response(text: &str) -> Self {
        Self {
            fallback: Some(Ok(text.to_string())),
            ..Self::new()
        }
    }

    /// A generator whose every call fails with an API error.
    pub fn failing(message: &str) -> Self {
        Self {
            fallback: Some(Err(message.to_string())),
            ..Self::new()
        }
    }

    pub fn queue_response(&self, text: &str) {
        if let Ok(mut queue) = self.responses.lock() {
            queue.push_back(Ok(text.to_string()));
        }
    }

    pub fn queue_failure(&self, message: &str) {
        if let Ok(mut queue) = self.responses.lock() {
            queue.push_back(Err(message.to_string()));
        }
    }
}

impl Default for MockTextGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TextGenerator for MockTextGenerator {
    async fn generate(&self, _system: &str, _prompt: &str) -> Result<String, LlmError> {
        let next = self
            .responses
            .lock()
            .map_err(|e| LlmError::ApiRequest {
                message: format!("mock lock poisoned: {e}"),
            })?
            .pop_front()
            .or_else(|| self.fallback.clone());
        match next {
            Some(Ok(text)) => Ok(text),
            Some(Err(message)) => Err(LlmError::ApiRequest { message }),
            None => Err(LlmError::ApiRequest {
                message: "mock has no queued responses".into(),
            }),
        }
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
