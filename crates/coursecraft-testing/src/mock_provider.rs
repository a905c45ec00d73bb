//! A configurable mock [`Provider`] for exercising [`ModelRouter`]
//! fallback and retry logic without a real backing API.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;

use coursecraft_llm::{LlmRequest, LlmResponse, Provider};

/// Handler function type for mock completions.
pub type MockHandler = Arc<dyn Fn(&LlmRequest) -> anyhow::Result<String> + Send + Sync>;

/// A mock provider whose responses are either a fixed string, or the
/// output of a handler closure, with optional one-shot failure
/// injection.
#[derive(Clone)]
pub struct MockProvider {
    name: String,
    handler: Option<MockHandler>,
    fixed_response: String,
    enabled: Arc<AtomicBool>,
    call_count: Arc<AtomicUsize>,
    should_fail: Arc<AtomicBool>,
    error_message: Arc<Mutex<String>>,
}

impl MockProvider {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            handler: None,
            fixed_response: "{}".to_string(),
            enabled: Arc::new(AtomicBool::new(true)),
            call_count: Arc::new(AtomicUsize::new(0)),
            should_fail: Arc::new(AtomicBool::new(false)),
            error_message: Arc::new(Mutex::new("mock provider error".to_string())),
        }
    }

    pub fn with_response(mut self, response: impl Into<String>) -> Self {
        self.fixed_response = response.into();
        self
    }

    pub fn with_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&LlmRequest) -> anyhow::Result<String> + Send + Sync + 'static,
    {
        self.handler = Some(Arc::new(handler));
        self
    }

    /// Fail the next `complete` call, then resume succeeding.
    pub fn fail_next(&self) {
        self.should_fail.store(true, Ordering::SeqCst);
    }

    pub fn with_error_message(self, message: impl Into<String>) -> Self {
        *self.error_message.lock() = message.into();
        self
    }

    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Provider for MockProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    fn disable(&self, _reason: &str) {
        self.enabled.store(false, Ordering::SeqCst);
    }

    fn enable(&self) {
        self.enabled.store(true, Ordering::SeqCst);
    }

    async fn complete(&self, request: &LlmRequest) -> anyhow::Result<LlmResponse> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        if self.should_fail.swap(false, Ordering::SeqCst) {
            anyhow::bail!(self.error_message.lock().clone());
        }
        let content = match &self.handler {
            Some(handler) => handler(request)?,
            None => self.fixed_response.clone(),
        };
        Ok(LlmResponse {
            content,
            provider: self.name.clone(),
            model_id: request.model_id.clone().unwrap_or_else(|| "mock-model".to_string()),
            tokens_in: Some(10),
            tokens_out: Some(10),
            latency_ms: 0,
            cost_usd: Some(0.0),
            action: request.action.clone(),
            strategy: request.strategy.clone(),
            timestamp: chrono::DateTime::from_timestamp(0, 0).unwrap(),
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
        let response = self.complete(request).await?;
        let parsed = coursecraft_llm::provider::parse_structured(&self.name, &response.content, schema_name)?;
        Ok((parsed, response))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> LlmRequest {
        LlmRequest {
            prompt: "hi".to_string(),
            system_prompt: None,
            model_id: None,
            temperature: 0.0,
            max_tokens: 10,
            action: "greet".to_string(),
            strategy: "default".to_string(),
        }
    }

    #[tokio::test]
    async fn fixed_response_round_trips() {
        let provider = MockProvider::new("mock").with_response("hello");
        let response = provider.complete(&request()).await.unwrap();
        assert_eq!(response.content, "hello");
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test]
    async fn handler_overrides_fixed_response() {
        let provider =
            MockProvider::new("mock").with_handler(|req| Ok(format!("echo:{}", req.prompt)));
        let response = provider.complete(&request()).await.unwrap();
        assert_eq!(response.content, "echo:hi");
    }

    #[tokio::test]
    async fn fail_next_fails_exactly_once() {
        let provider = MockProvider::new("mock").with_response("ok");
        provider.fail_next();
        assert!(provider.complete(&request()).await.is_err());
        assert!(provider.complete(&request()).await.is_ok());
    }

    #[tokio::test]
    async fn disable_then_enable_round_trips() {
        let provider = MockProvider::new("mock");
        assert!(provider.enabled());
        provider.disable("maintenance");
        assert!(!provider.enabled());
        provider.enable();
        assert!(provider.enabled());
    }
}
