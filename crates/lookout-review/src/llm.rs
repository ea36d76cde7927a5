use std::time::Duration;

use lookout_core::{LlmConfig, LookoutError};

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Anthropic Messages API client.
///
/// Sends a system prompt plus a single user message to `/v1/messages` with
/// temperature 0 and returns the concatenated text blocks of the response.
///
/// # Examples
///
/// ```
/// use lookout_core::LlmConfig;
/// use lookout_review::llm::AnthropicClient;
///
/// let config = LlmConfig {
///     api_key: Some("test-key".into()),
///     ..LlmConfig::default()
/// };
/// let client = AnthropicClient::new(&config).unwrap();
/// assert_eq!(client.model(), "claude-sonnet-4-20250514");
/// ```
#[derive(Debug)]
pub struct AnthropicClient {
    client: reqwest::Client,
    config: LlmConfig,
    api_key: String,
}

/// A completion returned by the model, with token accounting when the API
/// reports it.
#[derive(Debug, Clone)]
pub struct Completion {
    /// Concatenated text content of the response.
    pub content: String,
    /// Tokens consumed by the request, if reported.
    pub input_tokens: Option<u64>,
    /// Tokens generated by the response, if reported.
    pub output_tokens: Option<u64>,
}

impl AnthropicClient {
    /// Create a new client from configuration.
    ///
    /// The API key comes from the configuration or the `ANTHROPIC_API_KEY`
    /// environment variable; a missing or empty key is a configuration error
    /// raised here, before any request is made.
    ///
    /// # Errors
    ///
    /// Returns [`LookoutError::Config`] if no API key is available, or
    /// [`LookoutError::Llm`] if the HTTP client cannot be built.
    pub fn new(config: &LlmConfig) -> Result<Self, LookoutError> {
        let api_key = match config.api_key.as_deref() {
            Some(key) if !key.trim().is_empty() => key.to_string(),
            _ => match std::env::var("ANTHROPIC_API_KEY") {
                Ok(key) if !key.trim().is_empty() => key,
                _ => {
                    return Err(LookoutError::Config(
                        "ANTHROPIC_API_KEY not set. Export it or set api_key in .lookout.toml"
                            .into(),
                    ))
                }
            },
        };

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| LookoutError::Llm(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            config: config.clone(),
            api_key,
        })
    }

    /// Return the model name from the configuration.
    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// Send a completion request and return the text response.
    ///
    /// Builds a request to `{base_url}/v1/messages` with the given system
    /// prompt and user message, temperature 0, and the configured output
    /// token cap.
    ///
    /// # Errors
    ///
    /// Returns [`LookoutError::Llm`] on HTTP errors, non-success status
    /// codes, or an empty/unrecognized response body.
    pub async fn complete(&self, system: &str, prompt: &str) -> Result<Completion, LookoutError> {
        let base_url = self
            .config
            .base_url
            .as_deref()
            .unwrap_or(DEFAULT_BASE_URL)
            .trim_end_matches('/');
        let url = format!("{base_url}/v1/messages");

        let body = serde_json::json!({
            "model": self.config.model,
            "max_tokens": self.config.max_output_tokens,
            "temperature": 0,
            "system": system,
            "messages": [
                { "role": "user", "content": prompt }
            ],
        });

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| LookoutError::Llm(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(LookoutError::Llm(format!(
                "Anthropic API error {status}: {body_text}"
            )));
        }

        let response_body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| LookoutError::Llm(format!("failed to parse response: {e}")))?;

        let content = collect_text(&response_body);
        if content.is_empty() {
            return Err(LookoutError::Llm(format!(
                "unexpected response structure: {response_body}"
            )));
        }

        Ok(Completion {
            content,
            input_tokens: response_body
                .pointer("/usage/input_tokens")
                .and_then(serde_json::Value::as_u64),
            output_tokens: response_body
                .pointer("/usage/output_tokens")
                .and_then(serde_json::Value::as_u64),
        })
    }
}

// Messages API responses carry content as a list of typed blocks; only the
// text blocks matter here.
fn collect_text(response: &serde_json::Value) -> String {
    let Some(blocks) = response.get("content").and_then(|c| c.as_array()) else {
        return String::new();
    };

    let mut text = String::new();
    for block in blocks {
        if block.get("type").and_then(|t| t.as_str()) == Some("text") {
            if let Some(chunk) = block.get("text").and_then(|t| t.as_str()) {
                text.push_str(chunk);
            }
        }
    }
    text.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use lookout_core::LlmConfig;

    fn config_with_key() -> LlmConfig {
        LlmConfig {
            api_key: Some("test-key".into()),
            ..LlmConfig::default()
        }
    }

    #[test]
    fn client_construction_succeeds_with_key() {
        let client = AnthropicClient::new(&config_with_key());
        assert!(client.is_ok());
    }

    #[test]
    fn empty_configured_key_is_rejected() {
        // An empty api_key in the config must not mask a missing credential
        let config = LlmConfig {
            api_key: Some("   ".into()),
            ..LlmConfig::default()
        };
        if std::env::var("ANTHROPIC_API_KEY").is_err() {
            let err = AnthropicClient::new(&config).unwrap_err();
            assert!(err.to_string().contains("ANTHROPIC_API_KEY"));
        }
    }

    #[test]
    fn model_returns_config_model() {
        let config = LlmConfig {
            model: "claude-opus-4-20250514".into(),
            ..config_with_key()
        };
        let client = AnthropicClient::new(&config).unwrap();
        assert_eq!(client.model(), "claude-opus-4-20250514");
    }

    #[test]
    fn collect_text_joins_text_blocks() {
        let response = serde_json::json!({
            "content": [
                { "type": "text", "text": "first " },
                { "type": "tool_use", "id": "x" },
                { "type": "text", "text": "second" },
            ]
        });
        assert_eq!(collect_text(&response), "first second");
    }

    #[test]
    fn collect_text_empty_on_missing_content() {
        let response = serde_json::json!({ "id": "msg_123" });
        assert_eq!(collect_text(&response), "");
    }
}
