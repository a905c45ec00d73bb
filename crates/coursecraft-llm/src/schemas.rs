//! Request/response shapes shared by every provider adapter.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single LLM invocation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmRequest {
    pub prompt: String,
    pub system_prompt: Option<String>,
    /// Falls back to the provider's configured default when `None`.
    pub model_id: Option<String>,
    pub temperature: f32,
    pub max_tokens: u32,
    pub action: String,
    pub strategy: String,
}

/// Uniform provider response, before or after structured-output parsing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmResponse {
    pub content: String,
    pub provider: String,
    pub model_id: String,
    pub tokens_in: Option<u32>,
    pub tokens_out: Option<u32>,
    pub latency_ms: u64,
    pub cost_usd: Option<f64>,
    pub action: String,
    pub strategy: String,
    pub timestamp: DateTime<Utc>,
}
