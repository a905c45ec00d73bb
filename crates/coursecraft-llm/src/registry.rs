//! Declarative, YAML-validated catalog of models, actions, and routing
//! chains.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{RegistryError, RegistryResult};

/// Feature a model may declare support for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    Vision,
    StructuredOutput,
    LongContext,
}

/// Cost per 1000 tokens in USD.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CostPer1k {
    pub input: f64,
    pub output: f64,
}

/// A single model's declared capabilities and pricing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Populated from the YAML map key during load, not read from the
    /// YAML body itself.
    #[serde(default)]
    pub model_id: String,
    pub provider: String,
    pub capabilities: Vec<Capability>,
    pub max_context: u32,
    pub cost_per_1k: CostPer1k,
}

impl ModelConfig {
    /// `tokens_in * input_rate/1000 + tokens_out * output_rate/1000`.
    pub fn estimate_cost(&self, tokens_in: u32, tokens_out: u32) -> f64 {
        tokens_in as f64 * self.cost_per_1k.input / 1000.0
            + tokens_out as f64 * self.cost_per_1k.output / 1000.0
    }
}

/// A named task category and the capabilities any model serving it must
/// declare.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActionConfig {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub requires: Vec<Capability>,
}

#[derive(Debug, Clone, Deserialize)]
struct RawRegistry {
    models: HashMap<String, ModelConfig>,
    actions: HashMap<String, ActionConfig>,
    routing: HashMap<String, HashMap<String, Vec<String>>>,
}

/// Validated model/action/routing catalog.
#[derive(Debug, Clone)]
pub struct ModelRegistry {
    models: HashMap<String, ModelConfig>,
    actions: HashMap<String, ActionConfig>,
    routing: HashMap<String, HashMap<String, Vec<String>>>,
}

impl ModelRegistry {
    /// Load and validate a registry from a YAML file on disk.
    pub fn load_from_file(path: &Path) -> RegistryResult<Self> {
        if !path.exists() {
            return Err(RegistryError::FileNotFound(path.display().to_string()));
        }
        let raw = std::fs::read_to_string(path)
            .map_err(|e| RegistryError::FileNotFound(e.to_string()))?;
        Self::load_from_str(&raw)
    }

    /// Parse and validate a registry from a YAML document.
    pub fn load_from_str(yaml: &str) -> RegistryResult<Self> {
        let mut raw: RawRegistry = serde_yml::from_str(yaml)?;
        for (id, model) in raw.models.iter_mut() {
            model.model_id = id.clone();
        }
        let registry = Self {
            models: raw.models,
            actions: raw.actions,
            routing: raw.routing,
        };
        registry.validate()?;
        Ok(registry)
    }

    /// Validate the five rules from the design: every routing action
    /// exists, every action has a `default` strategy, every chain is
    /// non-empty, every referenced model exists, and every model in a
    /// chain carries every capability the action requires. Errors
    /// accumulate rather than failing on the first violation.
    fn validate(&self) -> RegistryResult<()> {
        let mut errors = Vec::new();

        for (action_name, strategies) in &self.routing {
            let Some(action) = self.actions.get(action_name) else {
                errors.push(format!(
                    "routing references unknown action: '{action_name}'"
                ));
                continue;
            };

            if !strategies.contains_key("default") {
                errors.push(format!(
                    "action '{action_name}' routing must have a 'default' strategy"
                ));
            }

            for (strategy_name, chain) in strategies {
                if chain.is_empty() {
                    errors.push(format!(
                        "action '{action_name}' strategy '{strategy_name}' has an empty model chain"
                    ));
                    continue;
                }
                for model_id in chain {
                    let Some(model) = self.models.get(model_id) else {
                        errors.push(format!(
                            "routing '{action_name}.{strategy_name}' references unknown model: '{model_id}'"
                        ));
                        continue;
                    };
                    let have: HashSet<_> = model.capabilities.iter().collect();
                    let missing: Vec<_> = action
                        .requires
                        .iter()
                        .filter(|c| !have.contains(c))
                        .collect();
                    if !missing.is_empty() {
                        errors.push(format!(
                            "model '{model_id}' in '{action_name}.{strategy_name}' lacks required capabilities: {missing:?}"
                        ));
                    }
                }
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(RegistryError::Invalid(errors))
        }
    }

    /// The ordered model chain for `(action, strategy)`. An unknown
    /// `strategy` falls back to `default`; an unknown `action` fails.
    pub fn get_chain(&self, action: &str, strategy: &str) -> RegistryResult<Vec<ModelConfig>> {
        let strategies = self
            .routing
            .get(action)
            .ok_or_else(|| RegistryError::UnknownAction(action.to_string()))?;
        let chain = strategies
            .get(strategy)
            .or_else(|| strategies.get("default"))
            .ok_or_else(|| RegistryError::UnknownAction(action.to_string()))?;
        Ok(chain
            .iter()
            .filter_map(|id| self.models.get(id).cloned())
            .collect())
    }

    /// Strategies declared for `action`.
    pub fn available_strategies(&self, action: &str) -> RegistryResult<Vec<String>> {
        self.routing
            .get(action)
            .map(|s| s.keys().cloned().collect())
            .ok_or_else(|| RegistryError::UnknownAction(action.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID_YAML: &str = r#"
models:
  gpt-4o:
    provider: openai
    capabilities: [structured_output, vision]
    max_context: 128000
    cost_per_1k: { input: 0.0025, output: 0.01 }
  claude-3-5:
    provider: anthropic
    capabilities: [structured_output, long_context]
    max_context: 200000
    cost_per_1k: { input: 0.003, output: 0.015 }
actions:
  course_structuring:
    description: "Build a nested course outline"
    requires: [structured_output]
routing:
  course_structuring:
    default: [gpt-4o, claude-3-5]
    quality: [claude-3-5]
"#;

    #[test]
    fn loads_valid_registry() {
        let registry = ModelRegistry::load_from_str(VALID_YAML).unwrap();
        let chain = registry.get_chain("course_structuring", "default").unwrap();
        assert_eq!(chain.len(), 2);
        assert_eq!(chain[0].model_id, "gpt-4o");
    }

    #[test]
    fn unknown_strategy_falls_back_to_default() {
        let registry = ModelRegistry::load_from_str(VALID_YAML).unwrap();
        let chain = registry.get_chain("course_structuring", "budget").unwrap();
        assert_eq!(chain.len(), 2);
    }

    #[test]
    fn unknown_action_fails() {
        let registry = ModelRegistry::load_from_str(VALID_YAML).unwrap();
        assert!(matches!(
            registry.get_chain("nonexistent", "default"),
            Err(RegistryError::UnknownAction(_))
        ));
    }

    #[test]
    fn missing_default_strategy_fails_validation() {
        let yaml = r#"
models:
  gpt-4o:
    provider: openai
    capabilities: [structured_output]
    max_context: 1000
    cost_per_1k: { input: 0.01, output: 0.01 }
actions:
  action_a:
    requires: [structured_output]
routing:
  action_a:
    quality: [gpt-4o]
"#;
        let err = ModelRegistry::load_from_str(yaml).unwrap_err();
        match err {
            RegistryError::Invalid(errors) => {
                assert!(errors.iter().any(|e| e.contains("default")));
            }
            other => panic!("expected Invalid, got {other:?}"),
        }
    }

    #[test]
    fn missing_capability_fails_validation() {
        let yaml = r#"
models:
  weak-model:
    provider: openai
    capabilities: []
    max_context: 1000
    cost_per_1k: { input: 0.01, output: 0.01 }
actions:
  action_a:
    requires: [structured_output]
routing:
  action_a:
    default: [weak-model]
"#;
        let err = ModelRegistry::load_from_str(yaml).unwrap_err();
        match err {
            RegistryError::Invalid(errors) => {
                assert!(errors.iter().any(|e| e.contains("lacks required capabilities")));
            }
            other => panic!("expected Invalid, got {other:?}"),
        }
    }

    #[test]
    fn estimate_cost_matches_formula() {
        let model = ModelConfig {
            model_id: "x".to_string(),
            provider: "openai".to_string(),
            capabilities: vec![],
            max_context: 1000,
            cost_per_1k: CostPer1k {
                input: 1.0,
                output: 2.0,
            },
        };
        assert_eq!(model.estimate_cost(1000, 500), 1.0 + 1.0);
    }
}
