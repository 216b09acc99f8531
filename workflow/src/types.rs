//! Core types for workflow orchestration.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Execution context shared by every step of a workflow.
pub type Context = BTreeMap<String, Value>;

/// Error types for workflow operations.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    /// A step or the macro it triggered failed
    #[error("Workflow {workflow_id} failed at step {index} ({step}): {message}")]
    StepExecution {
        workflow_id: String,
        step: String,
        /// 1-based position of the failing step
        index: usize,
        message: String,
    },

    /// Unknown execution id
    #[error("Not found: {0}")]
    NotFound(String),

    /// Step handler or macro failed or is missing
    #[error("Handler error: {0}")]
    Handler(String),

    /// Illegal execution status change
    #[error("Invalid transition from {from:?} to {to:?}")]
    InvalidTransition {
        from: ExecutionStatus,
        to: ExecutionStatus,
    },

    /// Execution has not reached a terminal state
    #[error("Workflow still running: {0}")]
    StillRunning(String),

    /// Malformed definition or configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Intent payload rejected
    #[error(transparent)]
    Intent(#[from] modality::ModalityError),
}

pub type Result<T> = std::result::Result<T, WorkflowError>;

/// One step of a workflow definition.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowStep {
    pub name: String,
    /// Payload echoed as the step output when no handler is named
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
    /// Macro fired after the step completes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger_macro: Option<String>,
    /// Registered step handler that produces the output
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handler: Option<String>,
}

impl WorkflowStep {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_output(mut self, output: Value) -> Self {
        self.output = Some(output);
        self
    }

    pub fn with_macro(mut self, name: impl Into<String>) -> Self {
        self.trigger_macro = Some(name.into());
        self
    }

    pub fn with_handler(mut self, name: impl Into<String>) -> Self {
        self.handler = Some(name.into());
        self
    }
}

/// A declarative workflow: ordered steps with optional macro triggers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workflow {
    pub name: String,
    #[serde(default)]
    pub steps: Vec<WorkflowStep>,
}

impl Workflow {
    pub fn new(name: impl Into<String>, steps: Vec<WorkflowStep>) -> Self {
        Self {
            name: name.into(),
            steps,
        }
    }

    /// Parse a JSON workflow definition.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| WorkflowError::Config(e.to_string()))
    }

    /// Parse a YAML workflow definition.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(|e| WorkflowError::Config(e.to_string()))
    }

    /// Number of steps that trigger a macro.
    pub fn macro_trigger_count(&self) -> usize {
        self.steps.iter().filter(|s| s.trigger_macro.is_some()).count()
    }
}

/// Lifecycle of a workflow execution. `Running` is initial; `Completed` and
/// `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Running,
    Completed,
    Failed,
}

impl ExecutionStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ExecutionStatus::Running)
    }

    /// Validate a transition to `next`.
    pub fn transition(self, next: ExecutionStatus) -> Result<ExecutionStatus> {
        match (self, next) {
            (ExecutionStatus::Running, ExecutionStatus::Completed)
            | (ExecutionStatus::Running, ExecutionStatus::Failed) => Ok(next),
            (from, to) => Err(WorkflowError::InvalidTransition { from, to }),
        }
    }
}

/// Status of a single step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Completed,
    Failed,
}

/// Result of one executed step.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepResult {
    pub step_name: String,
    pub status: StepStatus,
    pub output: Value,
    /// Result of the triggered macro, if one ran
    pub macro_result: Option<Value>,
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// Prediction made before a workflow runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prediction {
    /// Expected success (0.0 - 1.0)
    pub confidence: f64,
    pub complexity: f64,
    pub historical_success: f64,
    pub estimated_duration_ms: u64,
    pub suggested_optimizations: Vec<String>,
    pub potential_issues: Vec<String>,
}

/// Execution record owned by the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowExecution {
    pub id: String,
    pub workflow: Workflow,
    pub context: Context,
    pub prediction: Prediction,
    pub start_time: DateTime<Utc>,
    pub status: ExecutionStatus,
    pub results: Vec<StepResult>,
    pub error: Option<String>,
    pub finished_at: Option<DateTime<Utc>>,
}

/// Returned to the caller of a successful execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowOutcome {
    pub workflow_id: String,
    pub success: bool,
    pub results: Vec<StepResult>,
    pub prediction: Prediction,
}

/// Condensed view of a tracked execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowSummary {
    pub id: String,
    pub name: String,
    pub status: ExecutionStatus,
    pub start_time: DateTime<Utc>,
    pub prediction: Prediction,
}

impl From<&WorkflowExecution> for WorkflowSummary {
    fn from(e: &WorkflowExecution) -> Self {
        Self {
            id: e.id.clone(),
            name: e.workflow.name.clone(),
            status: e.status,
            start_time: e.start_time,
            prediction: e.prediction.clone(),
        }
    }
}
