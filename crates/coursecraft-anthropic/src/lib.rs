//! Anthropic Claude provider adapter: a custom `reqwest` client against
//! the Messages API rather than a vendor SDK crate.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use async_trait::async_trait;
use coursecraft_llm::provider::{parse_structured, strip_markdown_fence};
use coursecraft_llm::{LlmRequest, LlmResponse, Provider};
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

const MESSAGES_ENDPOINT: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Debug, Clone, Serialize)]
struct AnthropicRequest {
    model: String,
    max_tokens: u32,
    temperature: f32,
    messages: Vec<AnthropicMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct AnthropicMessage {
    role: String,
    content: String,
}

#[derive(Debug, Clone, Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicContentBlock>,
    usage: AnthropicUsage,
}

#[derive(Debug, Clone, Deserialize)]
struct AnthropicContentBlock {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Clone, Deserialize)]
struct AnthropicUsage {
    input_tokens: u32,
    output_tokens: u32,
}

#[derive(Debug, Clone, Deserialize)]
struct AnthropicErrorEnvelope {
    error: AnthropicErrorBody,
}

#[derive(Debug, Clone, Deserialize)]
struct AnthropicErrorBody {
    #[serde(rename = "type")]
    error_type: String,
    message: String,
}

/// Anthropic Claude provider. Structured output is prompt-embedded:
/// the JSON schema is appended to the system prompt and the response is
/// parsed after stripping markdown fences, since Claude has no native
/// JSON-constrained decoding mode equivalent to OpenAI's.
pub struct AnthropicProvider {
    client: reqwest::Client,
    api_key: String,
    default_model: String,
    base_url: String,
    enabled: AtomicBool,
}

impl AnthropicProvider {
    pub fn new(api_key: impl Into<String>, default_model: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            default_model: default_model.into(),
            base_url: MESSAGES_ENDPOINT.to_string(),
            enabled: AtomicBool::new(true),
        }
    }

    /// Overrides the endpoint, for tests against a mock server.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn send(&self, body: &AnthropicRequest) -> anyhow::Result<AnthropicResponse> {
        let response = self
            .client
            .post(&self.base_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            let reason = serde_json::from_str::<AnthropicErrorEnvelope>(&text)
                .map(|env| format!("{}: {}", env.error.error_type, env.error.message))
                .unwrap_or(text);
            anyhow::bail!("anthropic request failed ({status}): {reason}");
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl Provider for AnthropicProvider {
    fn name(&self) -> &str {
        "anthropic"
    }

    fn enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    fn disable(&self, reason: &str) {
        tracing::warn!(reason, provider = "anthropic", "provider disabled");
        self.enabled.store(false, Ordering::Relaxed);
    }

    fn enable(&self) {
        self.enabled.store(true, Ordering::Relaxed);
    }

    async fn complete(&self, request: &LlmRequest) -> anyhow::Result<LlmResponse> {
        let model = request.model_id.clone().unwrap_or_else(|| self.default_model.clone());
        let body = AnthropicRequest {
            model: model.clone(),
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            messages: vec![AnthropicMessage {
                role: "user".to_string(),
                content: request.prompt.clone(),
            }],
            system: request.system_prompt.clone(),
        };

        let start = Instant::now();
        let response = self.send(&body).await?;
        let elapsed = start.elapsed();

        Ok(LlmResponse {
            content: response.content.first().map(|b| b.text.clone()).unwrap_or_default(),
            provider: self.name().to_string(),
            model_id: model,
            tokens_in: Some(response.usage.input_tokens),
            tokens_out: Some(response.usage.output_tokens),
            latency_ms: elapsed.as_millis() as u64,
            cost_usd: None,
            action: request.action.clone(),
            strategy: request.strategy.clone(),
            timestamp: chrono::Utc::now(),
        })
    }

    async fn complete_structured<T>(
        &self,
        request: &LlmRequest,
        schema_name: &str,
    ) -> anyhow::Result<(T, LlmResponse)>
    where
        T: DeserializeOwned + JsonSchema + Send,
    {
        let schema = serde_json::to_string(&schemars::schema_for!(T))?;
        let structured_system = format!(
            "{}\n\nRespond ONLY with raw JSON matching this schema, no markdown fences:\n{}",
            request.system_prompt.clone().unwrap_or_default(),
            schema
        );
        let mut structured_request = request.clone();
        structured_request.system_prompt = Some(structured_system);

        let response = self.complete(&structured_request).await?;
        let candidate = strip_markdown_fence(&response.content);
        let parsed = parse_structured(self.name(), candidate, schema_name)?;
        Ok((parsed, response))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coursecraft_llm::Provider as _;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request() -> LlmRequest {
        LlmRequest {
            prompt: "summarize this chapter".to_string(),
            system_prompt: None,
            model_id: None,
            temperature: 0.2,
            max_tokens: 256,
            action: "course_structuring".to_string(),
            strategy: "default".to_string(),
        }
    }

    #[tokio::test]
    async fn complete_parses_usage_and_content() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "content": [{"type": "text", "text": "hello there"}],
                "usage": {"input_tokens": 12, "output_tokens": 4}
            })))
            .mount(&server)
            .await;

        let provider =
            AnthropicProvider::new("test-key", "claude-3-5-sonnet-latest").with_base_url(server.uri());
        let response = provider.complete(&request()).await.unwrap();
        assert_eq!(response.content, "hello there");
        assert_eq!(response.tokens_in, Some(12));
        assert_eq!(response.tokens_out, Some(4));
    }

    #[tokio::test]
    async fn complete_surfaces_api_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(429).set_body_json(serde_json::json!({
                "error": {"type": "rate_limit_error", "message": "slow down"}
            })))
            .mount(&server)
            .await;

        let provider =
            AnthropicProvider::new("test-key", "claude-3-5-sonnet-latest").with_base_url(server.uri());
        let err = provider.complete(&request()).await.unwrap_err();
        assert!(err.to_string().contains("rate_limit_error"));
    }

    #[test]
    fn disable_then_enable_round_trips() {
        let provider = AnthropicProvider::new("test-key", "claude-3-5-sonnet-latest");
        assert!(provider.enabled());
        provider.disable("quota exhausted");
        assert!(!provider.enabled());
        provider.enable();
        assert!(provider.enabled());
    }
}
