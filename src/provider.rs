//! Minimal client for an OpenAI-compatible chat API (Groq by default).

use std::time::{Duration, Instant};

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProviderError {
    /// Provider answered with a non-success status
    #[error("Error code: {status} - {body}")]
    Http { status: StatusCode, body: String },

    #[error("request timed out")]
    Timeout,

    #[error("connection error: {0}")]
    Transport(#[source] reqwest::Error),

    /// Success status, but the body was not the expected shape
    #[error("unexpected response body: {0}")]
    Decode(String),
}

impl ProviderError {
    fn from_reqwest(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ProviderError::Timeout
        } else {
            ProviderError::Transport(e)
        }
    }

    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ProviderError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
    pub temperature: f32,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: Vec<ContentPart>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    ImageUrl { image_url: ImageUrl },
    Text { text: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct ImageUrl {
    pub url: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ModelList {
    #[serde(default)]
    data: Vec<serde_json::Value>,
}

/// Shared HTTP client; the API key is supplied per call.
#[derive(Clone)]
pub struct ProviderClient {
    http: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl ProviderClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// List available models. Costs no tokens, so it doubles as a key check.
    pub async fn list_models(&self, api_key: &str) -> Result<usize, ProviderError> {
        let response = self
            .http
            .get(format!("{}/models", self.base_url))
            .bearer_auth(api_key)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(ProviderError::from_reqwest)?;

        let body = read_success_body(response).await?;
        let models: ModelList =
            serde_json::from_str(&body).map_err(|e| ProviderError::Decode(e.to_string()))?;
        Ok(models.data.len())
    }

    /// Run one chat completion and return the assistant's text.
    pub async fn chat_completion(
        &self,
        api_key: &str,
        request: &ChatCompletionRequest,
    ) -> Result<String, ProviderError> {
        let start = Instant::now();
        tracing::debug!(model = %request.model, "Sending chat completion request");

        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(api_key)
            .timeout(self.timeout)
            .json(request)
            .send()
            .await
            .map_err(ProviderError::from_reqwest)?;

        let body = read_success_body(response).await?;
        let elapsed_ms = start.elapsed().as_millis() as u64;
        tracing::info!(model = %request.model, elapsed_ms, "Chat completion finished");

        let completion: ChatCompletionResponse =
            serde_json::from_str(&body).map_err(|e| ProviderError::Decode(e.to_string()))?;
        completion
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| ProviderError::Decode("completion has no content".to_string()))
    }
}

async fn read_success_body(response: reqwest::Response) -> Result<String, ProviderError> {
    let status = response.status();
    let body = response.text().await.map_err(ProviderError::from_reqwest)?;
    if !status.is_success() {
        return Err(ProviderError::Http { status, body });
    }
    Ok(body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request() -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: "vision-model".into(),
            messages: vec![ChatMessage {
                role: "user".into(),
                content: vec![
                    ContentPart::ImageUrl {
                        image_url: ImageUrl { url: "data:image/png;base64,AAAA".into() },
                    },
                    ContentPart::Text { text: "describe".into() },
                ],
            }],
            max_tokens: 1024,
            temperature: 0.8,
        }
    }

    #[test]
    fn content_parts_serialize_with_type_tags() {
        let value = serde_json::to_value(request()).unwrap();
        assert_eq!(value["messages"][0]["content"][0]["type"], "image_url");
        assert_eq!(
            value["messages"][0]["content"][0]["image_url"]["url"],
            "data:image/png;base64,AAAA"
        );
        assert_eq!(value["messages"][0]["content"][1]["type"], "text");
        assert_eq!(value["max_tokens"], 1024);
    }

    #[tokio::test]
    async fn chat_completion_returns_first_choice_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer gsk_test"))
            .and(body_partial_json(json!({"model": "vision-model"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"index": 0, "message": {"role": "assistant", "content": "hello"}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = ProviderClient::new(server.uri(), Duration::from_secs(5));
        let text = client.chat_completion("gsk_test", &request()).await.unwrap();
        assert_eq!(text, "hello");
    }

    #[tokio::test]
    async fn error_status_keeps_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "error": {"message": "Invalid API Key", "code": "invalid_api_key"}
            })))
            .mount(&server)
            .await;

        let client = ProviderClient::new(server.uri(), Duration::from_secs(5));
        let err = client.chat_completion("gsk_bad", &request()).await.unwrap_err();
        assert_eq!(err.status(), Some(StatusCode::UNAUTHORIZED));
        assert!(err.to_string().contains("invalid_api_key"));
    }

    #[tokio::test]
    async fn empty_choices_is_a_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
            .mount(&server)
            .await;

        let client = ProviderClient::new(server.uri(), Duration::from_secs(5));
        let err = client.chat_completion("gsk_test", &request()).await.unwrap_err();
        assert!(matches!(err, ProviderError::Decode(_)));
    }

    #[tokio::test]
    async fn slow_provider_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/models"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"data": []}))
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        let client = ProviderClient::new(server.uri(), Duration::from_millis(100));
        let err = client.list_models("gsk_test").await.unwrap_err();
        assert!(matches!(err, ProviderError::Timeout));
    }

    #[tokio::test]
    async fn list_models_counts_entries() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/models"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "object": "list",
                "data": [{"id": "a"}, {"id": "b"}]
            })))
            .mount(&server)
            .await;

        let client = ProviderClient::new(format!("{}/", server.uri()), Duration::from_secs(5));
        assert_eq!(client.list_models("gsk_test").await.unwrap(), 2);
    }
}
