//! Resolves an action/strategy pair to a model chain and drives provider
//! fallback, retries, and cost accounting across it.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use schemars::JsonSchema;
use serde::de::DeserializeOwned;

use crate::error::{ModelFailure, RouterError, RouterResult, StructuredOutputError};
use crate::provider::Provider;
use crate::registry::ModelRegistry;
use crate::schemas::{LlmRequest, LlmResponse};

/// Per-attempt record handed to the audit callback. Never blocks or
/// panics the router: a callback failure is logged and swallowed.
#[derive(Debug, Clone)]
pub struct CallRecord {
    pub action: String,
    pub strategy: String,
    pub model_id: String,
    pub provider: String,
    pub succeeded: bool,
    pub cost_usd: Option<f64>,
    pub latency_ms: u64,
}

/// Best-effort audit sink invoked after every attempt, successful or not.
pub trait LogCallback: Send + Sync {
    fn log_call(&self, record: &CallRecord);
}

/// A [`LogCallback`] that does nothing, for routers that don't need
/// call auditing.
pub struct NoopLogCallback;

impl LogCallback for NoopLogCallback {
    fn log_call(&self, _record: &CallRecord) {}
}

/// Attempts per model before the router advances to the next one in
/// the chain.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 2;

/// Resolves action/strategy to a model chain via the registry, and
/// drives the provider fallback/retry loop across it.
pub struct ModelRouter {
    registry: ModelRegistry,
    providers: HashMap<String, Arc<dyn Provider>>,
    max_attempts: u32,
    log_callback: Arc<dyn LogCallback>,
}

impl ModelRouter {
    pub fn new(registry: ModelRegistry, providers: Vec<Arc<dyn Provider>>) -> Self {
        let providers = providers
            .into_iter()
            .map(|p| (p.name().to_string(), p))
            .collect();
        Self {
            registry,
            providers,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            log_callback: Arc::new(NoopLogCallback),
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn with_log_callback(mut self, callback: Arc<dyn LogCallback>) -> Self {
        self.log_callback = callback;
        self
    }

    /// Free-form completion, walking the chain for `(action, strategy)`
    /// until one model succeeds or all are exhausted.
    pub async fn complete(
        &self,
        action: &str,
        strategy: &str,
        request: LlmRequest,
    ) -> RouterResult<LlmResponse> {
        let chain = self.registry.get_chain(action, strategy)?;
        let mut failures = Vec::new();

        for model in &chain {
            let Some(provider) = self.providers.get(&model.provider) else {
                failures.push(ModelFailure {
                    model_id: model.model_id.clone(),
                    reason: format!("no provider registered for '{}'", model.provider),
                });
                continue;
            };
            if !provider.enabled() {
                failures.push(ModelFailure {
                    model_id: model.model_id.clone(),
                    reason: "provider disabled".to_string(),
                });
                continue;
            }

            let mut model_request = request.clone();
            model_request.model_id = Some(model.model_id.clone());

            let mut last_reason = String::new();
            for _attempt in 0..self.max_attempts {
                let start = Instant::now();
                match provider.complete(&model_request).await {
                    Ok(mut response) => {
                        response.cost_usd = response.cost_usd.or_else(|| {
                            match (response.tokens_in, response.tokens_out) {
                                (Some(tin), Some(tout)) => {
                                    Some(model.estimate_cost(tin, tout))
                                }
                                _ => None,
                            }
                        });
                        self.log_callback.log_call(&CallRecord {
                            action: action.to_string(),
                            strategy: strategy.to_string(),
                            model_id: model.model_id.clone(),
                            provider: provider.name().to_string(),
                            succeeded: true,
                            cost_usd: response.cost_usd,
                            latency_ms: start.elapsed().as_millis() as u64,
                        });
                        return Ok(response);
                    }
                    Err(err) => {
                        last_reason = err.to_string();
                        self.log_callback.log_call(&CallRecord {
                            action: action.to_string(),
                            strategy: strategy.to_string(),
                            model_id: model.model_id.clone(),
                            provider: provider.name().to_string(),
                            succeeded: false,
                            cost_usd: None,
                            latency_ms: start.elapsed().as_millis() as u64,
                        });
                    }
                }
            }
            failures.push(ModelFailure {
                model_id: model.model_id.clone(),
                reason: last_reason,
            });
        }

        Err(RouterError::AllModelsFailed {
            action: action.to_string(),
            strategy: strategy.to_string(),
            failures,
        })
    }

    /// Like [`Self::complete`] but parses the winning response into `T`.
    /// A [`StructuredOutputError`] counts as a model failure and
    /// advances the chain rather than propagating immediately. Returns
    /// the parsed value alongside the [`LlmResponse`] it was parsed from,
    /// so callers keep the same cost/token provenance [`Self::complete`]
    /// provides.
    pub async fn complete_structured<T>(
        &self,
        action: &str,
        strategy: &str,
        request: LlmRequest,
        schema_name: &str,
    ) -> RouterResult<(T, LlmResponse)>
    where
        T: DeserializeOwned + JsonSchema + Send,
    {
        let chain = self.registry.get_chain(action, strategy)?;
        let mut failures = Vec::new();

        for model in &chain {
            let Some(provider) = self.providers.get(&model.provider) else {
                failures.push(ModelFailure {
                    model_id: model.model_id.clone(),
                    reason: format!("no provider registered for '{}'", model.provider),
                });
                continue;
            };
            if !provider.enabled() {
                failures.push(ModelFailure {
                    model_id: model.model_id.clone(),
                    reason: "provider disabled".to_string(),
                });
                continue;
            }

            let mut model_request = request.clone();
            model_request.model_id = Some(model.model_id.clone());

            let mut last_reason = String::new();
            let mut succeeded = false;
            let mut result = None;
            for _attempt in 0..self.max_attempts {
                let start = Instant::now();
                match provider
                    .complete_structured::<T>(&model_request, schema_name)
                    .await
                {
                    Ok((parsed, mut response)) => {
                        response.cost_usd = response.cost_usd.or_else(|| {
                            match (response.tokens_in, response.tokens_out) {
                                (Some(tin), Some(tout)) => {
                                    Some(model.estimate_cost(tin, tout))
                                }
                                _ => None,
                            }
                        });
                        succeeded = true;
                        result = Some((parsed, response, start.elapsed().as_millis() as u64));
                        break;
                    }
                    Err(err) => {
                        last_reason = if err.downcast_ref::<StructuredOutputError>().is_some() {
                            "structured output did not match schema".to_string()
                        } else {
                            err.to_string()
                        };
                        self.log_callback.log_call(&CallRecord {
                            action: action.to_string(),
                            strategy: strategy.to_string(),
                            model_id: model.model_id.clone(),
                            provider: provider.name().to_string(),
                            succeeded: false,
                            cost_usd: None,
                            latency_ms: start.elapsed().as_millis() as u64,
                        });
                    }
                }
            }
            if let Some((parsed, response, latency_ms)) = result {
                self.log_callback.log_call(&CallRecord {
                    action: action.to_string(),
                    strategy: strategy.to_string(),
                    model_id: model.model_id.clone(),
                    provider: provider.name().to_string(),
                    succeeded,
                    cost_usd: response.cost_usd,
                    latency_ms,
                });
                return Ok((parsed, response));
            }
            failures.push(ModelFailure {
                model_id: model.model_id.clone(),
                reason: last_reason,
            });
        }

        Err(RouterError::AllModelsFailed {
            action: action.to_string(),
            strategy: strategy.to_string(),
            failures,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use serde::{Deserialize, Serialize};

    const YAML: &str = r#"
models:
  primary:
    provider: alpha
    capabilities: [structured_output]
    max_context: 1000
    cost_per_1k: { input: 1.0, output: 1.0 }
  backup:
    provider: beta
    capabilities: [structured_output]
    max_context: 1000
    cost_per_1k: { input: 1.0, output: 1.0 }
actions:
  greet:
    requires: [structured_output]
routing:
  greet:
    default: [primary, backup]
"#;

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

    fn response(provider: &str, model_id: &str) -> LlmResponse {
        LlmResponse {
            content: "ok".to_string(),
            provider: provider.to_string(),
            model_id: model_id.to_string(),
            tokens_in: Some(10),
            tokens_out: Some(5),
            latency_ms: 1,
            cost_usd: None,
            action: "greet".to_string(),
            strategy: "default".to_string(),
            timestamp: chrono::DateTime::from_timestamp(0, 0).unwrap(),
        }
    }

    struct FlakyProvider {
        name: String,
        enabled: Mutex<bool>,
        should_fail: bool,
    }

    #[async_trait]
    impl Provider for FlakyProvider {
        fn name(&self) -> &str {
            &self.name
        }
        fn enabled(&self) -> bool {
            *self.enabled.lock()
        }
        fn disable(&self, _reason: &str) {
            *self.enabled.lock() = false;
        }
        fn enable(&self) {
            *self.enabled.lock() = true;
        }
        async fn complete(&self, request: &LlmRequest) -> anyhow::Result<LlmResponse> {
            if self.should_fail {
                anyhow::bail!("simulated provider failure");
            }
            Ok(response(&self.name, request.model_id.as_deref().unwrap_or("?")))
        }
    }

    #[tokio::test]
    async fn falls_back_to_next_model_on_failure() {
        let registry = ModelRegistry::load_from_str(YAML).unwrap();
        let alpha = Arc::new(FlakyProvider {
            name: "alpha".to_string(),
            enabled: Mutex::new(true),
            should_fail: true,
        });
        let beta = Arc::new(FlakyProvider {
            name: "beta".to_string(),
            enabled: Mutex::new(true),
            should_fail: false,
        });
        let router = ModelRouter::new(registry, vec![alpha, beta]);
        let result = router.complete("greet", "default", request()).await.unwrap();
        assert_eq!(result.model_id, "backup");
    }

    #[tokio::test]
    async fn all_models_failed_reports_every_reason() {
        let registry = ModelRegistry::load_from_str(YAML).unwrap();
        let alpha = Arc::new(FlakyProvider {
            name: "alpha".to_string(),
            enabled: Mutex::new(true),
            should_fail: true,
        });
        let beta = Arc::new(FlakyProvider {
            name: "beta".to_string(),
            enabled: Mutex::new(true),
            should_fail: true,
        });
        let router = ModelRouter::new(registry, vec![alpha, beta]);
        let err = router.complete("greet", "default", request()).await.unwrap_err();
        match err {
            RouterError::AllModelsFailed { failures, .. } => assert_eq!(failures.len(), 2),
            other => panic!("expected AllModelsFailed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn disabled_provider_is_skipped_without_attempt() {
        let registry = ModelRegistry::load_from_str(YAML).unwrap();
        let alpha = Arc::new(FlakyProvider {
            name: "alpha".to_string(),
            enabled: Mutex::new(false),
            should_fail: true,
        });
        let beta = Arc::new(FlakyProvider {
            name: "beta".to_string(),
            enabled: Mutex::new(true),
            should_fail: false,
        });
        let router = ModelRouter::new(registry, vec![alpha, beta]);
        let result = router.complete("greet", "default", request()).await.unwrap();
        assert_eq!(result.model_id, "backup");
    }

    #[derive(Debug, Serialize, Deserialize, JsonSchema)]
    struct Greeting {
        text: String,
    }
}
