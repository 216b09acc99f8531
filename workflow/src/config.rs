//! Configuration for workflow orchestration.

use serde::{Deserialize, Serialize};

/// Configuration for the workflow engine and intent executor.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkflowConfig {
    /// Engine configuration
    #[serde(default)]
    pub engine: EngineConfig,
    /// Intent executor configuration
    #[serde(default)]
    pub executor: ExecutorConfig,
}

impl WorkflowConfig {
    /// Load config from YAML.
    pub fn from_yaml(yaml: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(yaml)
    }

    /// Serialize to YAML.
    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }
}

/// Workflow engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Predictions below this confidence are logged
    pub prediction_threshold: f64,
    /// Maximum workflows executing at once
    pub max_concurrent_workflows: usize,
    /// Fire macros named by `triggerMacro`
    pub enable_macros: bool,
    /// Success rate assumed for workflows with no history
    pub default_success_rate: f64,
    /// Finished executions kept before the oldest is evicted
    #[serde(default = "default_execution_limit")]
    pub execution_limit: usize,
}

fn default_execution_limit() -> usize {
    1000
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            prediction_threshold: 0.85,
            max_concurrent_workflows: 10,
            enable_macros: true,
            default_success_rate: 0.9,
            execution_limit: default_execution_limit(),
        }
    }
}

/// Intent executor configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutorConfig {
    /// Compute a prediction before executing
    pub enable_prediction: bool,
    /// Retries for a failing step
    pub max_retries: u32,
    /// First retry delay; doubles on each attempt
    pub retry_base_delay_ms: u64,
    /// Executions kept for success-rate history
    pub history_limit: usize,
    /// Success rate assumed for intents with no history
    pub default_success_rate: f64,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            enable_prediction: true,
            max_retries: 3,
            retry_base_delay_ms: 100,
            history_limit: 1000,
            default_success_rate: 0.8,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = WorkflowConfig::default();
        assert_eq!(config.engine.prediction_threshold, 0.85);
        assert_eq!(config.engine.max_concurrent_workflows, 10);
        assert_eq!(config.executor.history_limit, 1000);
    }

    #[test]
    fn test_yaml_override() {
        let yaml = "engine:\n  prediction_threshold: 0.5\n  max_concurrent_workflows: 2\n  enable_macros: false\n  default_success_rate: 0.9\n";
        let config = WorkflowConfig::from_yaml(yaml).unwrap();
        assert!(!config.engine.enable_macros);
        assert_eq!(config.engine.max_concurrent_workflows, 2);
        assert_eq!(config.executor.max_retries, 3);
        assert_eq!(config.engine.execution_limit, 1000);
    }
}
