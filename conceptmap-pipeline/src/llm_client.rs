// Copyright 2025 Sushanth (https://github.com/sushanthpy)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! LLM client abstraction for the concept map stages
//!
//! Every stage issues one text-in/text-out request per call through
//! [`LLMClient::complete`]. The optional `context` carries source text (an
//! extraction batch); the client decides how to frame it for its provider.

use crate::config::{LlmConfig, Provider};
use crate::error::ConfigError;
use crate::cache::CachedClient;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_SYSTEM_PROMPT: &str =
    "You are an expert teacher who identifies concepts in study material and how they build on each other.";

/// Trait for model clients used by the pipeline
#[async_trait]
pub trait LLMClient: Send + Sync {
    /// Send a prompt, optionally with source context, and return the reply
    async fn complete(&self, prompt: &str, context: Option<&str>) -> Result<LLMResponse, LLMError>;

    /// Get model name
    fn model_name(&self) -> &str;
}

/// Response from LLM
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMResponse {
    pub content: String,
    pub usage: TokenUsage,
    pub model: String,
}

/// Token usage information
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Errors from LLM clients
#[derive(Debug, Error)]
pub enum LLMError {
    #[error("API error: {0}")]
    ApiError(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Issue one request bounded by `timeout`, independent of whatever timeout
/// the underlying transport applies.
pub async fn complete_with_timeout(
    client: &dyn LLMClient,
    prompt: &str,
    context: Option<&str>,
    timeout: Duration,
) -> Result<LLMResponse, LLMError> {
    tokio::time::timeout(timeout, client.complete(prompt, context))
        .await
        .map_err(|_| LLMError::Timeout(timeout))?
}

/// Construct the client described by `config`, wrapped in a response cache
/// when enabled.
pub fn build_client(config: &LlmConfig) -> Result<Arc<dyn LLMClient>, ConfigError> {
    let api_key = config
        .api_key
        .clone()
        .filter(|k| !k.trim().is_empty())
        .ok_or(ConfigError::MissingApiKey(config.provider))?;
    let timeout = Duration::from_secs(config.request_timeout_secs);

    let client: Arc<dyn LLMClient> = match config.provider {
        Provider::OpenAI => {
            let mut client = OpenAIClient::new(api_key, config.model.clone()).with_timeout(timeout);
            if let Some(base_url) = &config.base_url {
                client = client.with_base_url(base_url.clone());
            }
            Arc::new(client)
        }
        Provider::Anthropic => {
            let mut client = AnthropicClient::new(api_key, config.model.clone())
                .with_timeout(timeout)
                .with_max_tokens(config.max_tokens);
            if let Some(base_url) = &config.base_url {
                client = client.with_base_url(base_url.clone());
            }
            Arc::new(client)
        }
    };

    if config.cache_responses {
        Ok(Arc::new(CachedClient::new(client, config.cache_capacity)))
    } else {
        Ok(client)
    }
}

fn user_message(prompt: &str, context: Option<&str>) -> String {
    match context {
        Some(context) => format!("Context:\n{}\n\n{}", context, prompt),
        None => prompt.to_string(),
    }
}

fn http_client(timeout: Option<Duration>) -> reqwest::Client {
    let mut builder = reqwest::Client::builder();
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }
    builder.build().unwrap_or_else(|_| reqwest::Client::new())
}

/// OpenAI client implementation
pub struct OpenAIClient {
    api_key: String,
    model: String,
    base_url: String,
    system_prompt: String,
    client: reqwest::Client,
}

impl OpenAIClient {
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            api_key,
            model,
            base_url: "https://api.openai.com/v1".to_string(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            client: reqwest::Client::new(),
        }
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.client = http_client(Some(timeout));
        self
    }

    pub fn with_system_prompt(mut self, system_prompt: String) -> Self {
        self.system_prompt = system_prompt;
        self
    }
}

#[async_trait]
impl LLMClient for OpenAIClient {
    async fn complete(&self, prompt: &str, context: Option<&str>) -> Result<LLMResponse, LLMError> {
        let request = serde_json::json!({
            "model": self.model,
            "messages": [
                {
                    "role": "system",
                    "content": self.system_prompt
                },
                {
                    "role": "user",
                    "content": user_message(prompt, context)
                }
            ],
            "temperature": 0.0
        });

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await?;
            if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                return Err(LLMError::RateLimitExceeded);
            }
            return Err(LLMError::ApiError(error_text));
        }

        let response_data: serde_json::Value = response.json().await?;

        let content = response_data["choices"][0]["message"]["content"]
            .as_str()
            .ok_or(LLMError::InvalidResponse("Missing content".to_string()))?
            .to_string();

        let usage_data = &response_data["usage"];
        let usage = TokenUsage {
            prompt_tokens: usage_data["prompt_tokens"].as_u64().unwrap_or(0) as u32,
            completion_tokens: usage_data["completion_tokens"].as_u64().unwrap_or(0) as u32,
            total_tokens: usage_data["total_tokens"].as_u64().unwrap_or(0) as u32,
        };

        Ok(LLMResponse {
            content,
            usage,
            model: self.model.clone(),
        })
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Anthropic Claude client implementation
pub struct AnthropicClient {
    api_key: String,
    model: String,
    base_url: String,
    system_prompt: String,
    max_tokens: u32,
    client: reqwest::Client,
}

impl AnthropicClient {
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            api_key,
            model,
            base_url: "https://api.anthropic.com/v1".to_string(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            max_tokens: 4096,
            client: reqwest::Client::new(),
        }
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.client = http_client(Some(timeout));
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

#[async_trait]
impl LLMClient for AnthropicClient {
    async fn complete(&self, prompt: &str, context: Option<&str>) -> Result<LLMResponse, LLMError> {
        let request = serde_json::json!({
            "model": self.model,
            "max_tokens": self.max_tokens,
            "messages": [
                {
                    "role": "user",
                    "content": user_message(prompt, context)
                }
            ],
            "system": self.system_prompt,
            "temperature": 0.0
        });

        let response = self
            .client
            .post(format!("{}/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await?;
            if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                return Err(LLMError::RateLimitExceeded);
            }
            return Err(LLMError::ApiError(error_text));
        }

        let response_data: serde_json::Value = response.json().await?;

        let content = response_data["content"][0]["text"]
            .as_str()
            .ok_or(LLMError::InvalidResponse("Missing content".to_string()))?
            .to_string();

        let usage_data = &response_data["usage"];
        let input_tokens = usage_data["input_tokens"].as_u64().unwrap_or(0);
        let output_tokens = usage_data["output_tokens"].as_u64().unwrap_or(0);
        let usage = TokenUsage {
            prompt_tokens: input_tokens as u32,
            completion_tokens: output_tokens as u32,
            total_tokens: (input_tokens + output_tokens) as u32,
        };

        Ok(LLMResponse {
            content,
            usage,
            model: self.model.clone(),
        })
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    fn openai_body(content: &str) -> String {
        serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": content}}],
            "usage": {"prompt_tokens": 12, "completion_tokens": 3, "total_tokens": 15}
        })
        .to_string()
    }

    #[tokio::test]
    async fn test_openai_complete_parses_content_and_usage() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .match_header("authorization", "Bearer test-key")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(openai_body("Energy\nWork"))
            .create_async()
            .await;

        let client = OpenAIClient::new("test-key".to_string(), "gpt-4o".to_string())
            .with_base_url(server.url());
        let response = client.complete("List concepts", Some("text")).await.unwrap();

        mock.assert_async().await;
        assert_eq!(response.content, "Energy\nWork");
        assert_eq!(response.usage.total_tokens, 15);
        assert_eq!(response.model, "gpt-4o");
    }

    #[tokio::test]
    async fn test_openai_rate_limit() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/chat/completions")
            .with_status(429)
            .with_body("slow down")
            .create_async()
            .await;

        let client = OpenAIClient::new("k".to_string(), "gpt-4o".to_string())
            .with_base_url(server.url());
        let err = client.complete("prompt", None).await.unwrap_err();
        assert!(matches!(err, LLMError::RateLimitExceeded));
    }

    #[tokio::test]
    async fn test_anthropic_complete_parses_content() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/messages")
            .match_header("x-api-key", "test-key")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                serde_json::json!({
                    "content": [{"type": "text", "text": "Force"}],
                    "usage": {"input_tokens": 10, "output_tokens": 2}
                })
                .to_string(),
            )
            .create_async()
            .await;

        let client = AnthropicClient::new("test-key".to_string(), "claude".to_string())
            .with_base_url(server.url());
        let response = client.complete("prompt", None).await.unwrap();
        assert_eq!(response.content, "Force");
        assert_eq!(response.usage.total_tokens, 12);
    }

    #[tokio::test]
    async fn test_missing_content_is_invalid_response() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"choices": []}"#)
            .create_async()
            .await;

        let client = OpenAIClient::new("k".to_string(), "gpt-4o".to_string())
            .with_base_url(server.url());
        let err = client.complete("prompt", None).await.unwrap_err();
        assert!(matches!(err, LLMError::InvalidResponse(_)));
    }

    struct SlowClient;

    #[async_trait]
    impl LLMClient for SlowClient {
        async fn complete(&self, _prompt: &str, _context: Option<&str>) -> Result<LLMResponse, LLMError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Err(LLMError::ApiError("unreachable".to_string()))
        }

        fn model_name(&self) -> &str {
            "slow"
        }
    }

    #[tokio::test]
    async fn test_complete_with_timeout() {
        let err = complete_with_timeout(&SlowClient, "p", None, Duration::from_millis(20))
            .await
            .unwrap_err();
        assert!(matches!(err, LLMError::Timeout(_)));
    }

    #[test]
    fn test_build_client_requires_api_key() {
        let config = LlmConfig {
            api_key: None,
            ..LlmConfig::default()
        };
        assert!(matches!(
            build_client(&config),
            Err(ConfigError::MissingApiKey(Provider::OpenAI))
        ));
    }

    #[test]
    fn test_user_message_frames_context() {
        assert_eq!(user_message("Task", None), "Task");
        assert_eq!(user_message("Task", Some("Body")), "Context:\nBody\n\nTask");
    }
}
