use super::{ChatRequest, LlmClient};
use crate::error::{AppError, Result};
use crate::metrics::{LLM_REQUESTS_TOTAL, LLM_REQUEST_DURATION_SECONDS};
use crate::retry::RetryPolicy;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::{Duration, Instant};
use tracing::{debug, error};

/// Client for any OpenAI-compatible `/chat/completions` endpoint
#[derive(Clone)]
pub struct OpenAiCompatibleClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    timeout_secs: u64,
    retry: RetryPolicy,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAiCompatibleClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        timeout_secs: u64,
        retry: RetryPolicy,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| AppError::Configuration(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            timeout_secs,
            retry,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    async fn send_once(&self, request: &ChatRequest) -> Result<String> {
        let mut builder = self
            .client
            .post(self.endpoint())
            .header("Content-Type", "application/json")
            .header("User-Agent", "eng-rec-helper/0.3");
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key.trim());
        }

        let response = builder.json(request).send().await.map_err(|e| {
            if e.is_timeout() {
                AppError::Timeout(format!(
                    "LLM request timed out after {} seconds",
                    self.timeout_secs
                ))
            } else if e.is_connect() {
                AppError::Network(format!("Failed to connect to LLM endpoint: {}", e))
            } else {
                AppError::Network(format!("LLM request failed: {}", e))
            }
        })?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(AppError::RateLimit);
        }
        if status.is_server_error() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Network(format!(
                "LLM endpoint returned {}: {}",
                status, body
            )));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Generation(format!(
                "LLM endpoint returned {}: {}",
                status, body
            )));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| AppError::Generation(format!("Failed to parse LLM response: {}", e)))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| AppError::Generation("LLM returned no content".to_string()))
    }
}

#[async_trait]
impl LlmClient for OpenAiCompatibleClient {
    async fn complete(&self, request: &ChatRequest) -> Result<String> {
        let start = Instant::now();
        let result = self
            .retry
            .run("llm_completion", || self.send_once(request))
            .await;

        LLM_REQUEST_DURATION_SECONDS
            .with_label_values(&[&request.model])
            .observe(start.elapsed().as_secs_f64());

        let status = match &result {
            Ok(_) => "success",
            Err(AppError::RateLimit) => "rate_limited",
            Err(AppError::Timeout(_)) => "timeout",
            Err(_) => "error",
        };
        LLM_REQUESTS_TOTAL
            .with_label_values(&[&request.model, status])
            .inc();

        match &result {
            Ok(content) => debug!(
                model = %request.model,
                response_length = content.len(),
                "LLM completion received"
            ),
            Err(e) => error!(model = %request.model, error = %e, "LLM completion failed"),
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn client_for(url: &str, retries: u32) -> OpenAiCompatibleClient {
        OpenAiCompatibleClient::new(
            url,
            Some("secret".to_string()),
            5,
            RetryPolicy::new(retries, Duration::from_millis(1)),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_complete_returns_first_choice() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .match_header("authorization", "Bearer secret")
            .match_body(mockito::Matcher::PartialJson(json!({
                "model": "test-model",
                "temperature": 0.0,
                "messages": [{"role": "user", "content": "hello"}]
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"choices":[{"message":{"role":"assistant","content":"hi there"}}]}"#)
            .create_async()
            .await;

        let client = client_for(&server.url(), 0);
        let request = ChatRequest::user("test-model", "hello").with_temperature(0.0);
        let content = client.complete(&request).await.unwrap();

        assert_eq!(content, "hi there");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_rate_limit_is_retried() {
        let mut server = mockito::Server::new_async().await;
        let limited = server
            .mock("POST", "/chat/completions")
            .with_status(429)
            .expect(3)
            .create_async()
            .await;

        let client = client_for(&server.url(), 2);
        let result = client.complete(&ChatRequest::user("m", "p")).await;

        assert!(matches!(result, Err(AppError::RateLimit)));
        limited.assert_async().await;
    }

    #[tokio::test]
    async fn test_client_error_is_generation_error() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .with_status(400)
            .with_body("bad request")
            .expect(1)
            .create_async()
            .await;

        let client = client_for(&server.url(), 3);
        let result = client.complete(&ChatRequest::user("m", "p")).await;

        assert!(matches!(result, Err(AppError::Generation(_))));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_empty_choices_is_generation_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_body(r#"{"choices":[]}"#)
            .create_async()
            .await;

        let client = client_for(&server.url(), 0);
        let result = client.complete(&ChatRequest::user("m", "p")).await;
        assert!(matches!(result, Err(AppError::Generation(_))));
    }

    #[test]
    fn test_endpoint_trims_trailing_slash() {
        let client = client_for("http://localhost:9999/serving-endpoints/", 0);
        assert_eq!(
            client.endpoint(),
            "http://localhost:9999/serving-endpoints/chat/completions"
        );
    }
}
