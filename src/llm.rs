//! Thin adapter over an OpenAI-compatible chat completion endpoint, shared
//! between C8's context generation and the `/settings/ai/test` probe.

use crate::error::{AppError, AppResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[async_trait]
pub trait LlmAdapter: Send + Sync {
    async fn complete(&self, endpoint: &str, api_key: &str, model: &str, prompt: &str) -> AppResult<String>;
}

/// Production adapter: a single POST to an OpenAI-compatible
/// `/chat/completions`-shaped endpoint.
pub struct HttpLlmAdapter {
    client: reqwest::Client,
}

impl HttpLlmAdapter {
    pub fn new(timeout_secs: u64) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .expect("reqwest client");
        Self { client }
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

#[async_trait]
impl LlmAdapter for HttpLlmAdapter {
    async fn complete(&self, endpoint: &str, api_key: &str, model: &str, prompt: &str) -> AppResult<String> {
        let request = ChatRequest { model, messages: vec![ChatMessage { role: "user", content: prompt }] };

        let response = self
            .client
            .post(endpoint)
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::UpstreamUnavailable(format!("LLM request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(AppError::UpstreamUnavailable(format!(
                "LLM endpoint returned {}",
                response.status()
            )));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| AppError::UpstreamUnavailable(format!("LLM response malformed: {e}")))?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| AppError::UpstreamUnavailable("LLM returned no choices".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StubAdapter;

    #[async_trait]
    impl LlmAdapter for StubAdapter {
        async fn complete(&self, _endpoint: &str, _api_key: &str, _model: &str, prompt: &str) -> AppResult<String> {
            Ok(format!("stub response for: {prompt}"))
        }
    }

    #[tokio::test]
    async fn stub_adapter_echoes_prompt() {
        let adapter = StubAdapter;
        let result = adapter.complete("http://example", "key", "model", "hello").await.unwrap();
        assert!(result.contains("hello"));
    }
}
