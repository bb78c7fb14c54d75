//! Chat-completion client
//!
//! Async HTTP client for OpenAI-compatible `/v1/chat/completions` endpoints
//! (DeepSeek by default).

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::agent::Agent;
use crate::core::config::LlmConfig;
use crate::core::{MultichatError, Result, Turn};
use crate::llm::traits::ResponseGenerator;

/// OpenAI-compatible chat-completion client
#[derive(Clone)]
pub struct ChatCompletionClient {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

/// Chat-completion request
#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<WireTurn<'a>>,
    temperature: f32,
    max_tokens: u32,
}

/// Message in request format
#[derive(Debug, Serialize)]
struct WireTurn<'a> {
    role: &'static str,
    content: &'a str,
}

/// Chat-completion response
#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

impl ChatCompletionClient {
    /// Create a new client from configuration
    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(30))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| MultichatError::with_context("Failed to create HTTP client", e))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/chat/completions", self.base_url)
    }

    fn build_request<'a>(&'a self, history: &'a [Turn], message: &'a str) -> CompletionRequest<'a> {
        let mut messages: Vec<WireTurn<'a>> = history
            .iter()
            .map(|turn| WireTurn {
                role: turn.role.as_str(),
                content: &turn.content,
            })
            .collect();
        messages.push(WireTurn {
            role: "user",
            content: message,
        });

        CompletionRequest {
            model: &self.model,
            messages,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }

    fn extract_content(body: &str) -> Result<String> {
        let response: CompletionResponse = serde_json::from_str(body)
            .map_err(|e| MultichatError::generation(format!("Failed to parse response: {}", e)))?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| MultichatError::generation("Response contained no choices"))
    }
}

#[async_trait]
impl ResponseGenerator for ChatCompletionClient {
    async fn generate(&self, agent: &Agent, history: &[Turn], message: &str) -> Result<String> {
        let request = self.build_request(history, message);
        tracing::debug!(agent = %agent.id(), turns = request.messages.len(), "chat completion request");

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() || e.is_timeout() {
                    MultichatError::generation(format!(
                        "Cannot reach {}: {}",
                        self.base_url, e
                    ))
                } else {
                    MultichatError::generation(format!("Request failed: {}", e))
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            tracing::warn!(agent = %agent.id(), %status, "chat completion API error: {}", error_text);
            return Err(MultichatError::generation(format!("API error ({})", status)));
        }

        let body = response
            .text()
            .await
            .map_err(|e| MultichatError::generation(format!("Failed to read response: {}", e)))?;

        Self::extract_content(&body)
    }

    fn name(&self) -> &str {
        "chat-completion"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> ChatCompletionClient {
        let config = LlmConfig {
            api_key: "key".into(),
            base_url: "https://api.example.com/".into(),
            model: "test-model".into(),
            temperature: 0.8,
            max_tokens: 2000,
            timeout_secs: 5,
        };
        ChatCompletionClient::from_config(&config).unwrap()
    }

    #[test]
    fn test_request_appends_new_message() {
        let client = client();
        let history = vec![Turn::system("persona"), Turn::user("a"), Turn::assistant("b")];
        let request = client.build_request(&history, "c");

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "test-model");
        assert_eq!(json["max_tokens"], 2000);
        let messages = json["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0]["role"], "system");
        assert_eq!(messages[3]["role"], "user");
        assert_eq!(messages[3]["content"], "c");
    }

    #[test]
    fn test_endpoint_trims_slash() {
        assert_eq!(
            client().endpoint(),
            "https://api.example.com/v1/chat/completions"
        );
    }

    #[test]
    fn test_extract_content() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":"hey"}}]}"#;
        assert_eq!(ChatCompletionClient::extract_content(body).unwrap(), "hey");

        let empty = r#"{"choices":[]}"#;
        assert!(matches!(
            ChatCompletionClient::extract_content(empty),
            Err(MultichatError::Generation(_))
        ));
        assert!(ChatCompletionClient::extract_content("not json").is_err());
    }
}
