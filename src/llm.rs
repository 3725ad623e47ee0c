//! Completion provider boundary.
//!
//! The engine only needs one operation: prompt in, bounded completion out.
//! The shipped client speaks the OpenAI-compatible chat-completions shape
//! against a local inference server (llama.cpp / ollama style), so no
//! traffic ever leaves the machine. Tests substitute scripted providers.

use crate::error::{EngineError, Result};
use async_trait::async_trait;
use tracing::debug;

/// A generative text completion source. One blocking request/response per
/// call; no streaming requirement.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    async fn complete(&self, prompt: &str, max_tokens: u32) -> Result<String>;
}

/// HTTP client for a local OpenAI-compatible completion endpoint.
#[derive(Clone)]
pub struct LlmClient {
    base_url: String,
    model: String,
    client: reqwest::Client,
}

impl LlmClient {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            model: model.into(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl CompletionProvider for LlmClient {
    async fn complete(&self, prompt: &str, max_tokens: u32) -> Result<String> {
        debug!("Requesting completion ({} max tokens)", max_tokens);

        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                {"role": "user", "content": prompt}
            ],
            "temperature": 0.1,
            "max_tokens": max_tokens
        });

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| EngineError::Llm(format!("Completion request failed: {}", e)))?;

        let response_json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| EngineError::Llm(format!("Failed to parse completion response: {}", e)))?;

        let content = response_json["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| EngineError::Llm("No content in completion response".to_string()))?;

        Ok(content.to_string())
    }
}
