//! The adapter contract every backing LLM provider implements.

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;

use crate::error::StructuredOutputError;
use crate::schemas::{LlmRequest, LlmResponse};

/// One provider's native completion methods for structured output.
///
/// `NativeJsonMode` relies on the provider's own constrained-decoding
/// support; `PromptEmbedded` asks for JSON in the system prompt and
/// strips markdown code fences before parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StructuredOutputMethod {
    NativeJsonMode,
    PromptEmbedded,
}

/// A single backing LLM provider (OpenAI, Anthropic, Gemini, ...).
///
/// Implementors own their own HTTP client and credentials. `enabled`
/// lets the router skip a provider that has been circuit-broken without
/// removing it from the registry.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Stable identifier matching `ModelConfig::provider` in the registry.
    fn name(&self) -> &str;

    /// Whether this provider should currently be attempted.
    fn enabled(&self) -> bool;

    /// Mark the provider unavailable, e.g. after a sustained outage.
    fn disable(&self, reason: &str);

    /// Re-admit the provider to routing.
    fn enable(&self);

    /// Free-form text completion.
    async fn complete(&self, request: &LlmRequest) -> anyhow::Result<LlmResponse>;

    /// Completion parsed into `T`, using whichever
    /// [`StructuredOutputMethod`] the provider was built with. Returns the
    /// parsed value alongside the raw [`LlmResponse`] so callers keep the
    /// token/cost provenance the free-form `complete` path already carries.
    async fn complete_structured<T>(
        &self,
        request: &LlmRequest,
        schema_name: &str,
    ) -> anyhow::Result<(T, LlmResponse)>
    where
        T: DeserializeOwned + JsonSchema + Send,
    {
        let response = self.complete(request).await?;
        let parsed = parse_structured(self.name(), &response.content, schema_name)?;
        Ok((parsed, response))
    }
}

/// Strips a leading/trailing markdown fence (```` ```json ... ``` ````
/// or a bare ```` ``` ````) before attempting to parse. Providers that
/// use [`StructuredOutputMethod::PromptEmbedded`] route their raw
/// completion through this.
pub fn strip_markdown_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    let rest = rest.strip_prefix('\n').unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

/// Parse `raw_content` as `T`, reporting provider/schema context on
/// failure. Shared by every provider's `complete_structured`.
pub fn parse_structured<T>(
    provider: &str,
    raw_content: &str,
    schema_name: &str,
) -> anyhow::Result<T>
where
    T: DeserializeOwned,
{
    let candidate = strip_markdown_fence(raw_content);
    serde_json::from_str(candidate).map_err(|cause| {
        StructuredOutputError {
            provider: provider.to_string(),
            raw_content: raw_content.to_string(),
            schema_name: schema_name.to_string(),
            cause,
        }
        .into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_json_fence() {
        let raw = "```json\n{\"a\":1}\n```";
        assert_eq!(strip_markdown_fence(raw), "{\"a\":1}");
    }

    #[test]
    fn strips_bare_fence() {
        let raw = "```\n{\"a\":1}\n```";
        assert_eq!(strip_markdown_fence(raw), "{\"a\":1}");
    }

    #[test]
    fn passes_through_unfenced_content() {
        let raw = "{\"a\":1}";
        assert_eq!(strip_markdown_fence(raw), "{\"a\":1}");
    }

    #[test]
    fn parse_structured_reports_provider_context_on_failure() {
        #[derive(serde::Deserialize)]
        struct Out {
            #[allow(dead_code)]
            a: u32,
        }
        let err = parse_structured::<Out>("openai", "not json", "Out").unwrap_err();
        let structured = err.downcast_ref::<StructuredOutputError>().unwrap();
        assert_eq!(structured.provider, "openai");
        assert_eq!(structured.schema_name, "Out");
    }
}
