//! Errors raised by the registry, the router, and provider adapters.

use thiserror::Error;

/// Registry load/validation errors.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RegistryError {
    /// The registry file does not exist.
    #[error("registry file not found: {0}")]
    FileNotFound(String),

    /// The YAML body could not be parsed.
    #[error("failed to parse registry yaml: {0}")]
    Parse(#[from] serde_yml::Error),

    /// Validation found one or more structural problems. The list is
    /// exhaustive, not just the first violation.
    #[error("model registry validation failed:\n{}", .0.join("\n"))]
    Invalid(Vec<String>),

    /// `get_chain` was called for an action absent from `routing`.
    #[error("unknown action: {0}")]
    UnknownAction(String),
}

/// Result alias for [`RegistryError`].
pub type RegistryResult<T> = std::result::Result<T, RegistryError>;

/// Raised when an LLM response fails schema validation.
#[derive(Debug, Error)]
#[error("{provider}: failed to parse response as {schema_name}")]
pub struct StructuredOutputError {
    pub provider: String,
    pub raw_content: String,
    pub schema_name: String,
    #[source]
    pub cause: serde_json::Error,
}

/// Per-model failure reason recorded when the router advances to the
/// next model in a chain.
#[derive(Debug, Clone)]
pub struct ModelFailure {
    pub model_id: String,
    pub reason: String,
}

/// Router-level errors.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RouterError {
    /// Every model in the chain failed (or was disabled) without
    /// producing a usable response.
    #[error("all models failed for {action}/{strategy}: {}", summarize(.failures))]
    AllModelsFailed {
        action: String,
        strategy: String,
        failures: Vec<ModelFailure>,
    },

    /// The registry rejected the `(action, strategy)` pair.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// The selected provider is disabled.
    #[error("provider {0} is disabled")]
    ProviderDisabled(String),
}

fn summarize(failures: &[ModelFailure]) -> String {
    failures
        .iter()
        .map(|f| format!("{}: {}", f.model_id, f.reason))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Result alias for [`RouterError`].
pub type RouterResult<T> = std::result::Result<T, RouterError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_lists_every_violation() {
        let err = RegistryError::Invalid(vec!["a".to_string(), "b".to_string()]);
        let msg = err.to_string();
        assert!(msg.contains('a'));
        assert!(msg.contains('b'));
    }

    #[test]
    fn all_models_failed_display_includes_reasons() {
        let err = RouterError::AllModelsFailed {
            action: "course_structuring".to_string(),
            strategy: "default".to_string(),
            failures: vec![ModelFailure {
                model_id: "gpt".to_string(),
                reason: "timeout".to_string(),
            }],
        };
        assert!(err.to_string().contains("gpt: timeout"));
    }
}
