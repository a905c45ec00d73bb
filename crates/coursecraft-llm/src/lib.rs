//! Model registry, fallback router, and provider adapter contract for
//! every LLM-backed generation action.

pub mod error;
pub mod provider;
pub mod registry;
pub mod router;
pub mod schemas;

pub use error::{RegistryError, RegistryResult, RouterError, RouterResult, StructuredOutputError};
pub use provider::{Provider, StructuredOutputMethod};
pub use registry::{ActionConfig, Capability, ModelConfig, ModelRegistry};
pub use router::{CallRecord, LogCallback, ModelRouter, NoopLogCallback};
pub use schemas::{LlmRequest, LlmResponse};
