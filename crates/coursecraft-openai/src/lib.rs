//! OpenAI-compatible provider adapter, built on the `async-openai` SDK
//! client. The same adapter serves DeepSeek and other OpenAI-API-
//! compatible services by pointing `base_url` elsewhere and supplying
//! a distinct provider name.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use async_openai::config::OpenAIConfig;
use async_openai::types::{
    ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
    CreateChatCompletionRequestArgs, ResponseFormat,
};
use async_openai::Client;
use async_trait::async_trait;
use coursecraft_llm::{LlmRequest, LlmResponse, Provider};
use schemars::JsonSchema;
use serde::de::DeserializeOwned;

/// OpenAI and OpenAI-API-compatible provider (OpenAI proper, DeepSeek).
/// Structured output uses native `response_format: json_object`;
/// OpenAI enforces valid JSON syntax but not schema conformance, so the
/// schema is still embedded in the system prompt as an instruction.
pub struct OpenAiProvider {
    client: Client<OpenAIConfig>,
    provider_name: String,
    default_model: String,
    enabled: AtomicBool,
}

impl OpenAiProvider {
    pub fn new(api_key: impl Into<String>, default_model: impl Into<String>) -> Self {
        let config = OpenAIConfig::new().with_api_key(api_key.into());
        Self {
            client: Client::with_config(config),
            provider_name: "openai".to_string(),
            default_model: default_model.into(),
            enabled: AtomicBool::new(true),
        }
    }

    /// Builds an adapter pointed at an OpenAI-API-compatible service
    /// (e.g. DeepSeek) under a distinct provider name.
    pub fn compatible(
        provider_name: impl Into<String>,
        api_key: impl Into<String>,
        default_model: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        let config = OpenAIConfig::new()
            .with_api_key(api_key.into())
            .with_api_base(base_url.into());
        Self {
            client: Client::with_config(config),
            provider_name: provider_name.into(),
            default_model: default_model.into(),
            enabled: AtomicBool::new(true),
        }
    }

    fn model_for(&self, request: &LlmRequest) -> String {
        request.model_id.clone().unwrap_or_else(|| self.default_model.clone())
    }
}

#[async_trait]
impl Provider for OpenAiProvider {
    fn name(&self) -> &str {
        &self.provider_name
    }

    fn enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    fn disable(&self, reason: &str) {
        tracing::warn!(reason, provider = %self.provider_name, "provider disabled");
        self.enabled.store(false, Ordering::Relaxed);
    }

    fn enable(&self) {
        self.enabled.store(true, Ordering::Relaxed);
    }

    async fn complete(&self, request: &LlmRequest) -> anyhow::Result<LlmResponse> {
        let model = self.model_for(request);
        let mut messages = Vec::new();
        if let Some(system) = &request.system_prompt {
            messages.push(ChatCompletionRequestSystemMessageArgs::default().content(system.as_str()).build()?.into());
        }
        messages.push(
            ChatCompletionRequestUserMessageArgs::default()
                .content(request.prompt.as_str())
                .build()?
                .into(),
        );

        let body = CreateChatCompletionRequestArgs::default()
            .model(&model)
            .messages(messages)
            .temperature(request.temperature)
            .max_tokens(request.max_tokens)
            .build()?;

        let start = Instant::now();
        let response = self.client.chat().create(body).await?;
        let elapsed = start.elapsed();

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| anyhow::anyhow!("openai response had no choices"))?;

        Ok(LlmResponse {
            content: choice.message.content.unwrap_or_default(),
            provider: self.provider_name.clone(),
            model_id: model,
            tokens_in: response.usage.as_ref().map(|u| u.prompt_tokens),
            tokens_out: response.usage.as_ref().map(|u| u.completion_tokens),
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
        let model = self.model_for(request);
        let schema = serde_json::to_string(&schemars::schema_for!(T))?;
        let system = format!(
            "{}\n\nRespond ONLY with valid JSON matching this schema:\n{}",
            request.system_prompt.clone().unwrap_or_default(),
            schema
        );

        let messages = vec![
            ChatCompletionRequestSystemMessageArgs::default().content(system).build()?.into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(request.prompt.as_str())
                .build()?
                .into(),
        ];

        let body = CreateChatCompletionRequestArgs::default()
            .model(&model)
            .messages(messages)
            .temperature(request.temperature)
            .max_tokens(request.max_tokens)
            .response_format(ResponseFormat::JsonObject)
            .build()?;

        let start = Instant::now();
        let raw_response = self.client.chat().create(body).await?;
        let elapsed = start.elapsed();
        let choice = raw_response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| anyhow::anyhow!("openai response had no choices"))?;
        let content = choice.message.content.unwrap_or_default();

        let parsed = coursecraft_llm::provider::parse_structured(&self.provider_name, &content, schema_name)?;
        let response = LlmResponse {
            content,
            provider: self.provider_name.clone(),
            model_id: model,
            tokens_in: raw_response.usage.as_ref().map(|u| u.prompt_tokens),
            tokens_out: raw_response.usage.as_ref().map(|u| u.completion_tokens),
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
                "id": "chatcmpl-1",
                "object": "chat.completion",
                "created": 0,
                "model": "gpt-4o",
                "choices": [{
                    "index": 0,
                    "message": {"role": "assistant", "content": "hello there"},
                    "finish_reason": "stop"
                }],
                "usage": {"prompt_tokens": 12, "completion_tokens": 4, "total_tokens": 16}
            })))
            .mount(&server)
            .await;

        let provider =
            OpenAiProvider::compatible("openai", "test-key", "gpt-4o", server.uri());
        let response = provider.complete(&request()).await.unwrap();
        assert_eq!(response.content, "hello there");
        assert_eq!(response.tokens_in, Some(12));
    }

    #[test]
    fn compatible_provider_carries_its_own_name() {
        let provider = OpenAiProvider::compatible(
            "deepseek",
            "key",
            "deepseek-chat",
            "https://api.deepseek.com/v1",
        );
        assert_eq!(provider.name(), "deepseek");
        assert!(provider.enabled());
    }

    #[test]
    fn disable_then_enable_round_trips() {
        let provider = OpenAiProvider::new("key", "gpt-4o");
        provider.disable("rate limited");
        assert!(!provider.enabled());
        provider.enable();
        assert!(provider.enabled());
    }
}
