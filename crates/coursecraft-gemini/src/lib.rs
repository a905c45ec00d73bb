//! Google Gemini provider adapter: REST `generateContent` via a custom
//! `reqwest` client rather than a vendor SDK crate.
//!
//! Structured output uses Gemini's native `response_mime_type:
//! "application/json"` plus an embedded `response_schema`, so unlike
//! Anthropic no markdown-fence stripping is needed.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use async_trait::async_trait;
use coursecraft_llm::provider::parse_structured;
use coursecraft_llm::{LlmRequest, LlmResponse, Provider};
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

const GENERATE_CONTENT_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

#[derive(Debug, Clone, Serialize)]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(rename = "generationConfig")]
    generation_config: GeminiGenerationConfig,
    #[serde(rename = "systemInstruction", skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct GeminiContent {
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct GeminiPart {
    text: String,
}

#[derive(Debug, Clone, Serialize)]
struct GeminiGenerationConfig {
    temperature: f32,
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
    #[serde(rename = "responseMimeType", skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<String>,
    #[serde(rename = "responseSchema", skip_serializing_if = "Option::is_none")]
    response_schema: Option<Value>,
}

#[derive(Debug, Clone, Deserialize)]
struct GeminiResponse {
    candidates: Vec<GeminiCandidate>,
    #[serde(rename = "usageMetadata")]
    usage_metadata: Option<GeminiUsage>,
}

#[derive(Debug, Clone, Deserialize)]
struct GeminiCandidate {
    content: GeminiContent,
}

#[derive(Debug, Clone, Deserialize)]
struct GeminiUsage {
    #[serde(rename = "promptTokenCount")]
    prompt_token_count: u32,
    #[serde(rename = "candidatesTokenCount")]
    candidates_token_count: u32,
}

#[derive(Debug, Clone, Deserialize)]
struct GeminiErrorEnvelope {
    error: GeminiErrorBody,
}

#[derive(Debug, Clone, Deserialize)]
struct GeminiErrorBody {
    status: String,
    message: String,
}

/// Google Gemini provider.
pub struct GeminiProvider {
    client: reqwest::Client,
    api_key: String,
    default_model: String,
    base_url: String,
    enabled: AtomicBool,
}

impl GeminiProvider {
    pub fn new(api_key: impl Into<String>, default_model: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            default_model: default_model.into(),
            base_url: GENERATE_CONTENT_BASE.to_string(),
            enabled: AtomicBool::new(true),
        }
    }

    /// Overrides the endpoint root, for tests against a mock server.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn endpoint(&self, model: &str) -> String {
        format!("{}/{}:generateContent?key={}", self.base_url, model, self.api_key)
    }

    async fn send(&self, model: &str, body: &GeminiRequest) -> anyhow::Result<GeminiResponse> {
        let response = self.client.post(self.endpoint(model)).json(body).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            let reason = serde_json::from_str::<GeminiErrorEnvelope>(&text)
                .map(|env| format!("{}: {}", env.error.status, env.error.message))
                .unwrap_or(text);
            anyhow::bail!("gemini request failed ({status}): {reason}");
        }

        Ok(response.json().await?)
    }

    fn extract_text(response: &GeminiResponse) -> String {
        response
            .candidates
            .first()
            .and_then(|c| c.content.parts.first())
            .map(|p| p.text.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Provider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    fn enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    fn disable(&self, reason: &str) {
        tracing::warn!(reason, provider = "gemini", "provider disabled");
        self.enabled.store(false, Ordering::Relaxed);
    }

    fn enable(&self) {
        self.enabled.store(true, Ordering::Relaxed);
    }

    async fn complete(&self, request: &LlmRequest) -> anyhow::Result<LlmResponse> {
        let model = request.model_id.clone().unwrap_or_else(|| self.default_model.clone());
        let body = GeminiRequest {
            contents: vec![GeminiContent {
                parts: vec![GeminiPart { text: request.prompt.clone() }],
            }],
            generation_config: GeminiGenerationConfig {
                temperature: request.temperature,
                max_output_tokens: request.max_tokens,
                response_mime_type: None,
                response_schema: None,
            },
            system_instruction: request.system_prompt.clone().map(|text| GeminiContent {
                parts: vec![GeminiPart { text }],
            }),
        };

        let start = Instant::now();
        let response = self.send(&model, &body).await?;
        let elapsed = start.elapsed();

        Ok(LlmResponse {
            content: Self::extract_text(&response),
            provider: self.name().to_string(),
            model_id: model,
            tokens_in: response.usage_metadata.as_ref().map(|u| u.prompt_token_count),
            tokens_out: response.usage_metadata.as_ref().map(|u| u.candidates_token_count),
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
        let model = request.model_id.clone().unwrap_or_else(|| self.default_model.clone());
        let schema = serde_json::to_value(schemars::schema_for!(T))?;
        let body = GeminiRequest {
            contents: vec![GeminiContent {
                parts: vec![GeminiPart { text: request.prompt.clone() }],
            }],
            generation_config: GeminiGenerationConfig {
                temperature: request.temperature,
                max_output_tokens: request.max_tokens,
                response_mime_type: Some("application/json".to_string()),
                response_schema: Some(schema),
            },
            system_instruction: request.system_prompt.clone().map(|text| GeminiContent {
                parts: vec![GeminiPart { text }],
            }),
        };

        let start = Instant::now();
        let raw_response = self.send(&model, &body).await?;
        let elapsed = start.elapsed();
        let content = Self::extract_text(&raw_response);
        let parsed = parse_structured(self.name(), &content, schema_name)?;

        let response = LlmResponse {
            content,
            provider: self.name().to_string(),
            model_id: model,
            tokens_in: raw_response.usage_metadata.as_ref().map(|u| u.prompt_token_count),
            tokens_out: raw_response.usage_metadata.as_ref().map(|u| u.candidates_token_count),
            latency_ms: elapsed.as_millis() as u64,
            cost_usd: None,
            action: request.action.clone(),
            strategy: request.strategy.clone(),
            timestamp: chrono::Utc::now(),
        };
        Ok((parsed, response))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coursecraft_llm::Provider as _;
    use wiremock::matchers::method;
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
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "candidates": [{"content": {"parts": [{"text": "hello there"}]}}],
                "usageMetadata": {"promptTokenCount": 12, "candidatesTokenCount": 4}
            })))
            .mount(&server)
            .await;

        let provider = GeminiProvider::new("test-key", "gemini-1.5-pro").with_base_url(server.uri());
        let response = provider.complete(&request()).await.unwrap();
        assert_eq!(response.content, "hello there");
        assert_eq!(response.tokens_in, Some(12));
    }

    #[tokio::test]
    async fn complete_surfaces_api_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_json(serde_json::json!({
                "error": {"status": "RESOURCE_EXHAUSTED", "message": "quota exceeded"}
            })))
            .mount(&server)
            .await;

        let provider = GeminiProvider::new("test-key", "gemini-1.5-pro").with_base_url(server.uri());
        let err = provider.complete(&request()).await.unwrap_err();
        assert!(err.to_string().contains("RESOURCE_EXHAUSTED"));
    }
}
