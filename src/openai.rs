//! OpenAI-compatible chat completions client
//!
//! Both the DeepSeek prompt expander and the FLUX provider speak this
//! protocol; each gets its own client bound to a base URL, key, and model.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::ProviderConfig;

/// Chat API errors
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("API error: {0}")]
    Api(reqwest::StatusCode),

    #[error("no response from API")]
    EmptyResponse,
}

/// Chat message for the completions API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: &str) -> Self {
        Self {
            role: "system".to_string(),
            content: content.to_string(),
        }
    }

    pub fn user(content: &str) -> Self {
        Self {
            role: "user".to_string(),
            content: content.to_string(),
        }
    }
}

/// Chat completion request
#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

/// Chat completion response
#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

/// Sampling parameters for a chat request
#[derive(Debug, Clone, Copy, Default)]
pub struct ChatOptions {
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

/// Chat client bound to one provider
#[derive(Debug, Clone)]
pub struct ChatClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl ChatClient {
    /// Create a client for the given provider entry
    pub fn new(provider: &ProviderConfig) -> Result<Self, ChatError> {
        Ok(Self {
            client: Client::builder()
                .timeout(Duration::from_secs(60))
                .build()?,
            api_key: provider.key.clone(),
            base_url: provider.base_url.trim_end_matches('/').to_string(),
            model: provider.models.clone(),
        })
    }

    /// Model identifier this client sends
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Send a chat completion request and return the first choice's content
    pub async fn chat(
        &self,
        messages: Vec<ChatMessage>,
        options: ChatOptions,
    ) -> Result<String, ChatError> {
        let request = ChatRequest {
            model: self.model.clone(),
            messages,
            max_tokens: options.max_tokens,
            temperature: options.temperature,
        };

        debug!("Sending chat request to {} ({})", self.base_url, request.model);

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!("Chat API error: {} - {}", status, body);
            return Err(ChatError::Api(status));
        }

        let chat_response: ChatResponse = response.json().await?;

        chat_response
            .choices
            .first()
            .map(|c| c.message.content.trim().to_string())
            .ok_or(ChatError::EmptyResponse)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_message_creation() {
        let system = ChatMessage::system("You are a prompt engineer");
        assert_eq!(system.role, "system");

        let user = ChatMessage::user("a cat");
        assert_eq!(user.role, "user");
        assert_eq!(user.content, "a cat");
    }

    #[test]
    fn test_request_omits_unset_options() {
        let request = ChatRequest {
            model: "test-model".to_string(),
            messages: vec![ChatMessage::user("hello")],
            max_tokens: None,
            temperature: None,
        };

        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("max_tokens").is_none());
        assert!(json.get("temperature").is_none());
        assert_eq!(json["model"], "test-model");
    }

    #[test]
    fn test_request_includes_set_options() {
        let request = ChatRequest {
            model: "test-model".to_string(),
            messages: vec![ChatMessage::user("hello")],
            max_tokens: Some(300),
            temperature: Some(0.5),
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["max_tokens"], 300);
        assert_eq!(json["temperature"], 0.5);
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let provider = ProviderConfig {
            key: "k".to_string(),
            base_url: "https://api.example.com/".to_string(),
            models: "m".to_string(),
        };
        let client = ChatClient::new(&provider).unwrap();
        assert_eq!(client.base_url, "https://api.example.com");
        assert_eq!(client.model(), "m");
    }
}
