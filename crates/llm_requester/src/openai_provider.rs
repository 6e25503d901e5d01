use log::{debug, error, info};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::LlmError;
use crate::llm_provider_trait::ChatCompletion;

/// Client for any OpenAI-compatible `/chat/completions` endpoint.
pub struct OpenAIProvider {
    client: Client,
    base_url: String,
    api_key: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAIProvider {
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Result<Self, LlmError> {
        if api_key.trim().is_empty() {
            return Err(LlmError::Configuration(
                "API key must not be empty".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LlmError::Configuration(format!("Failed to create HTTP client: {}", e)))?;

        info!(
            "Created completion client for {} (key {})",
            base_url,
            mask_key(api_key)
        );

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

#[async_trait::async_trait]
impl ChatCompletion for OpenAIProvider {
    async fn complete(
        &self,
        prompt: &str,
        model: &str,
        temperature: f32,
    ) -> Result<String, LlmError> {
        debug!(
            "Sending completion request: model={}, prompt length={} chars",
            model,
            prompt.len()
        );

        let request = ChatRequest {
            model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature,
        };

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                error!("Completion request failed: {}", e);
                LlmError::Transient(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("Completion service returned {}: {}", status, body);
            return Err(LlmError::from_status(status.as_u16(), body));
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Transient(format!("error decoding response body: {}", e)))?;

        let text = body
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.is_empty())
            .ok_or(LlmError::EmptyResponse)?;

        info!("Completion received, response length: {} chars", text.len());
        Ok(text)
    }

    fn provider_name(&self) -> &str {
        "openai-compatible"
    }
}

fn mask_key(key: &str) -> String {
    let visible: String = key.chars().rev().take(4).collect::<Vec<_>>().into_iter().rev().collect();
    format!("****{}", visible)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;

    fn provider(url: &str) -> OpenAIProvider {
        OpenAIProvider::new(url, "sk-test", Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_complete_sends_single_user_message() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .match_header("authorization", "Bearer sk-test")
            .match_body(Matcher::PartialJson(json!({
                "model": "deepseek-v3",
                "temperature": 0.0,
                "messages": [{"role": "user", "content": "translate this"}]
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({"choices": [{"message": {"role": "assistant", "content": "```rust\nfn f() {}\n```"}}]})
                    .to_string(),
            )
            .create_async()
            .await;

        let text = provider(&server.url())
            .complete("translate this", "deepseek-v3", 0.0)
            .await
            .unwrap();

        assert_eq!(text, "```rust\nfn f() {}\n```");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_empty_content_is_empty_response() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_body(json!({"choices": [{"message": {"content": null}}]}).to_string())
            .create_async()
            .await;

        let err = provider(&server.url())
            .complete("x", "deepseek-v3", 0.0)
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::EmptyResponse));
    }

    #[tokio::test]
    async fn test_no_choices_is_empty_response() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_body(json!({"choices": []}).to_string())
            .create_async()
            .await;

        let err = provider(&server.url())
            .complete("x", "deepseek-v3", 0.0)
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::EmptyResponse));
    }

    #[tokio::test]
    async fn test_rate_limit_is_transient() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(429)
            .with_body("rate limit exceeded")
            .create_async()
            .await;

        let err = provider(&server.url())
            .complete("x", "deepseek-v3", 0.0)
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::Transient(_)));
    }

    #[tokio::test]
    async fn test_unauthorized_is_rejected() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(401)
            .with_body("invalid api key")
            .create_async()
            .await;

        let err = provider(&server.url())
            .complete("x", "deepseek-v3", 0.0)
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::Rejected { status: 401, .. }));
    }

    #[test]
    fn test_empty_key_is_configuration_error() {
        let result = OpenAIProvider::new("http://localhost", " ", Duration::from_secs(1));
        assert!(matches!(result, Err(LlmError::Configuration(_))));
    }

    #[test]
    fn test_mask_key() {
        assert_eq!(mask_key("sk-abcdef1234"), "****1234");
        assert_eq!(mask_key("ab"), "****ab");
    }
}
