//! OpenAI-compatible chat-completions client.
//!
//! Works with OpenAI, Azure OpenAI, Ollama, vLLM, LM Studio, and any endpoint
//! that follows the chat completions API format.

use super::TextGenerator;
use crate::config::LlmConfig;
use crate::error::LlmError;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::{Value, json};
use std::time::Duration;
use tracing::debug;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Client issuing one chat completion per call.
pub struct OpenAiCompatibleClient {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
    timeout_secs: u64,
}

impl OpenAiCompatibleClient {
    /// Create a client from configuration.
    ///
    /// Local endpoints (localhost / 127.0.0.1) do not need an API key.
    pub fn new(config: &LlmConfig) -> Result<Self, LlmError> {
        let is_local = config
            .base_url
            .as_ref()
            .map(|u| u.contains("localhost") || u.contains("127.0.0.1"))
            .unwrap_or(false);

        let api_key = config
            .resolve_api_key()
            .or_else(|| is_local.then(|| "ollama".to_string()))
            .ok_or_else(|| LlmError::NotConfigured {
                reason: format!("env var '{}' not set", config.api_key_env),
            })?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| LlmError::ApiRequest {
                message: format!("Failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            client,
            base_url: config
                .base_url
                .clone()
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            api_key,
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            timeout_secs: config.timeout_secs,
        })
    }

    fn request_body(&self, system: &str, prompt: &str) -> Value {
        json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": system },
                { "role": "user", "content": prompt },
            ],
            "temperature": self.temperature,
            "max_tokens": self.max_tokens,
            "response_format": { "type": "json_object" },
            "stream": false,
        })
    }

    /// Extract the assistant text from a chat-completions response body.
    fn parse_response(body: &Value) -> Result<String, LlmError> {
        let choice = body
            .get("choices")
            .and_then(|c| c.get(0))
            .ok_or_else(|| LlmError::ResponseParse {
                message: "No choices in response".to_string(),
            })?;

        choice
            .get("message")
            .and_then(|m| m.get("content"))
            .and_then(|c| c.as_str())
            .map(str::to_string)
            .ok_or_else(|| LlmError::ResponseParse {
                message: "No text content in choice".to_string(),
            })
    }

    fn map_http_error(&self, status: StatusCode, body: &str) -> LlmError {
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => LlmError::AuthFailed {
                provider: format!("OpenAI-compatible ({})", self.base_url),
            },
            StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => LlmError::Timeout {
                timeout_secs: self.timeout_secs,
            },
            _ => LlmError::ApiRequest {
                message: format!("HTTP {status}: {}", truncate(body, 300)),
            },
        }
    }
}

fn truncate(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[async_trait]
impl TextGenerator for OpenAiCompatibleClient {
    async fn generate(&self, system: &str, prompt: &str) -> Result<String, LlmError> {
        let url = format!("{}/chat/completions", self.base_url);
        debug!(url = %url, model = %self.model, "Sending chat completion request");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&self.request_body(system, prompt))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LlmError::Timeout {
                        timeout_secs: self.timeout_secs,
                    }
                } else {
                    LlmError::ApiRequest {
                        message: format!("Request failed: {e}"),
                    }
                }
            })?;

        let status = response.status();
        let response_body = response.text().await.map_err(|e| LlmError::ApiRequest {
            message: format!("Failed to read response body: {e}"),
        })?;

        if !status.is_success() {
            return Err(self.map_http_error(status, &response_body));
        }

        let json: Value =
            serde_json::from_str(&response_body).map_err(|e| LlmError::ResponseParse {
                message: format!("Invalid JSON: {e}"),
            })?;

        Self::parse_response(&json)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> LlmConfig {
        LlmConfig {
            api_key: Some("sk-test".into()),
            api_key_env: "INSIGHTFORGE_TEST_OPENAI_KEY".into(),
            ..LlmConfig::default()
        }
    }

    #[test]
    fn test_new_requires_key_for_remote() {
        let config = LlmConfig {
            api_key: None,
            api_key_env: "INSIGHTFORGE_TEST_SURELY_UNSET".into(),
            ..LlmConfig::default()
        };
        assert!(matches!(
            OpenAiCompatibleClient::new(&config),
            Err(LlmError::NotConfigured { .. })
        ));
    }

    #[test]
    fn test_local_endpoint_needs_no_key() {
        let config = LlmConfig {
            api_key: None,
            api_key_env: "INSIGHTFORGE_TEST_SURELY_UNSET".into(),
            base_url: Some("http://localhost:11434/v1/".into()),
            ..LlmConfig::default()
        };
        let client = OpenAiCompatibleClient::new(&config).unwrap();
        assert_eq!(client.base_url, "http://localhost:11434/v1");
    }

    #[test]
    fn test_request_body_shape() {
        let client = OpenAiCompatibleClient::new(&test_config()).unwrap();
        let body = client.request_body("system text", "user text");
        assert_eq!(body["model"], "gpt-4o-mini");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "user text");
        assert_eq!(body["max_tokens"], 600);
        assert_eq!(body["response_format"]["type"], "json_object");
    }

    #[test]
    fn test_parse_response_text() {
        let body = json!({
            "choices": [{ "message": { "role": "assistant", "content": "{\"summary\": []}" } }]
        });
        let text = OpenAiCompatibleClient::parse_response(&body).unwrap();
        assert_eq!(text, "{\"summary\": []}");
    }

    #[test]
    fn test_parse_response_missing_choices() {
        let body = json!({ "error": "nope" });
        assert!(matches!(
            OpenAiCompatibleClient::parse_response(&body),
            Err(LlmError::ResponseParse { .. })
        ));
    }

    #[test]
    fn test_map_http_error() {
        let client = OpenAiCompatibleClient::new(&test_config()).unwrap();
        assert!(matches!(
            client.map_http_error(StatusCode::UNAUTHORIZED, ""),
            LlmError::AuthFailed { .. }
        ));
        let err = client.map_http_error(StatusCode::INTERNAL_SERVER_ERROR, "overloaded");
        assert!(err.to_string().contains("overloaded"));
    }
}
