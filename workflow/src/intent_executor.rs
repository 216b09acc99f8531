//! Intent executor - runs normalized intents through a fixed plan.
//!
//! Every intent is executed as four steps: validate, prepare,
//! `execute <action>` and finalize. The execute step runs the
//! [`StepHandler`] registered for the action, retrying with exponential
//! backoff. Before running, a prediction is derived from the intent's
//! complexity and the success history of earlier executions.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use modality::{validate_payload, IntentForwarder, ModalityError, NormalizedIntent};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use crate::config::ExecutorConfig;
use crate::macros::StepHandler;
use crate::types::{Context, Result, StepResult, StepStatus, WorkflowError, WorkflowStep};

/// Actions considered expensive when estimating complexity.
const COMPLEX_ACTIONS: [&str; 3] = ["create", "transform", "analyze"];

/// Which plan variant the prediction selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionPath {
    Standard,
    Optimized,
}

/// Prediction made before executing an intent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntentPrediction {
    pub confidence: f64,
    pub complexity: f64,
    pub historical_success: f64,
    pub path: ExecutionPath,
    pub estimated_duration_ms: u64,
    pub suggested_optimizations: Vec<String>,
}

/// Record of one intent execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntentExecution {
    pub id: String,
    pub intent: String,
    pub action: String,
    pub success: bool,
    pub prediction: Option<IntentPrediction>,
    pub steps: Vec<StepResult>,
    pub error: Option<String>,
    pub duration_ms: u64,
    pub timestamp: DateTime<Utc>,
}

/// Executes normalized intents.
pub struct IntentExecutor {
    config: ExecutorConfig,
    /// Step handlers keyed by action
    handlers: Arc<RwLock<HashMap<String, Arc<dyn StepHandler>>>>,
    /// Bounded execution history, oldest first
    history: Arc<RwLock<VecDeque<IntentExecution>>>,
}

impl IntentExecutor {
    /// Create a new executor with default configuration.
    pub fn new() -> Self {
        Self::with_config(ExecutorConfig::default())
    }

    /// Create with custom configuration.
    pub fn with_config(config: ExecutorConfig) -> Self {
        Self {
            config,
            handlers: Arc::new(RwLock::new(HashMap::new())),
            history: Arc::new(RwLock::new(VecDeque::new())),
        }
    }

    /// Register the handler for an action.
    pub async fn register_handler(&self, action: &str, handler: Arc<dyn StepHandler>) {
        self.handlers.write().await.insert(action.to_string(), handler);
        debug!(action = %action, "Registered intent handler");
    }

    /// Execute an intent through the four-step plan.
    pub async fn execute_intent(&self, intent: &NormalizedIntent) -> Result<IntentExecution> {
        let start = std::time::Instant::now();
        let id = format!("exec_{}", uuid::Uuid::new_v4().simple());

        let prediction = if self.config.enable_prediction {
            let prediction = self.predict(intent).await;
            debug!(
                execution_id = %id,
                confidence = prediction.confidence,
                path = ?prediction.path,
                "Intent prediction"
            );
            Some(prediction)
        } else {
            None
        };

        info!(execution_id = %id, intent = %intent.intent, action = %intent.action, "Executing intent");

        let context = intent_context(intent);
        let plan = [
            WorkflowStep::new("validate"),
            WorkflowStep::new("prepare"),
            WorkflowStep::new(format!("execute {}", intent.action)).with_handler(intent.action.clone()),
            WorkflowStep::new("finalize"),
        ];

        let mut steps = Vec::with_capacity(plan.len());
        let mut failure = None;

        for (i, step) in plan.iter().enumerate() {
            let outcome = match i {
                0 => validate_payload(intent)
                    .map(|_| json!({ "valid": true }))
                    .map_err(WorkflowError::from),
                1 => Ok(json!({
                    "prepared": true,
                    "parameterCount": intent.parameters.len(),
                })),
                2 => self.execute_with_retry(step, &context).await,
                _ => Ok(json!({ "finalized": true })),
            };

            match outcome {
                Ok(output) => steps.push(StepResult {
                    step_name: step.name.clone(),
                    status: StepStatus::Completed,
                    output,
                    macro_result: None,
                    error: None,
                    timestamp: Utc::now(),
                }),
                Err(e) => {
                    let message = e.to_string();
                    steps.push(StepResult {
                        step_name: step.name.clone(),
                        status: StepStatus::Failed,
                        output: Value::Null,
                        macro_result: None,
                        error: Some(message.clone()),
                        timestamp: Utc::now(),
                    });
                    failure = Some((i + 1, step.name.clone(), message));
                    break;
                }
            }
        }

        let execution = IntentExecution {
            id: id.clone(),
            intent: intent.intent.clone(),
            action: intent.action.clone(),
            success: failure.is_none(),
            prediction,
            steps,
            error: failure.as_ref().map(|(_, _, m)| m.clone()),
            duration_ms: start.elapsed().as_millis() as u64,
            timestamp: Utc::now(),
        };
        self.record(execution.clone()).await;

        match failure {
            None => {
                info!(execution_id = %id, duration_ms = execution.duration_ms, "Intent executed");
                Ok(execution)
            }
            Some((index, step, message)) => {
                error!(execution_id = %id, step = %step, error = %message, "Intent execution failed");
                Err(WorkflowError::StepExecution {
                    workflow_id: id,
                    step,
                    index,
                    message,
                })
            }
        }
    }

    /// Run the execute step, retrying failures with exponential backoff.
    async fn execute_with_retry(&self, step: &WorkflowStep, context: &Context) -> Result<Value> {
        let mut result = self.run_handler(step, context).await;

        for attempt in 0..self.config.max_retries {
            let Err(e) = &result else {
                break;
            };

            let delay = self.config.retry_base_delay_ms.saturating_mul(1u64 << attempt.min(16));
            warn!(
                step = %step.name,
                attempt = attempt + 1,
                delay_ms = delay,
                error = %e,
                "Retrying intent step"
            );
            tokio::time::sleep(tokio::time::Duration::from_millis(delay)).await;

            result = self.run_handler(step, context).await;
        }

        result
    }

    async fn run_handler(&self, step: &WorkflowStep, context: &Context) -> Result<Value> {
        let handler = match &step.handler {
            Some(action) => self.handlers.read().await.get(action).cloned(),
            None => None,
        };

        match handler {
            Some(handler) => handler.execute(step, context).await,
            None => Ok(json!({
                "action": context.get("action").cloned().unwrap_or(Value::Null),
                "executed": true,
            })),
        }
    }

    /// Predict the outcome of executing an intent.
    pub async fn predict(&self, intent: &NormalizedIntent) -> IntentPrediction {
        let complexity = intent_complexity(intent);
        let historical_success = self.success_rate(&intent.intent).await;
        let confidence = (historical_success * 0.7 + (1.0 - complexity) * 0.3).min(1.0);

        let mut suggested_optimizations = Vec::new();
        if complexity > 0.7 {
            suggested_optimizations.push("parallel-execution".to_string());
            suggested_optimizations.push("caching".to_string());
        }
        if intent.parameters.len() > 5 {
            suggested_optimizations.push("parameter-batching".to_string());
        }

        IntentPrediction {
            confidence,
            complexity,
            historical_success,
            path: if complexity > 0.5 {
                ExecutionPath::Optimized
            } else {
                ExecutionPath::Standard
            },
            estimated_duration_ms: (100.0 * (1.0 + complexity * 2.0)).round() as u64,
            suggested_optimizations,
        }
    }

    async fn success_rate(&self, intent: &str) -> f64 {
        let history = self.history.read().await;
        let (total, successful) = history
            .iter()
            .filter(|e| e.intent == intent)
            .fold((0usize, 0usize), |(t, s), e| (t + 1, s + e.success as usize));

        if total == 0 {
            self.config.default_success_rate
        } else {
            successful as f64 / total as f64
        }
    }

    async fn record(&self, execution: IntentExecution) {
        let mut history = self.history.write().await;
        history.push_back(execution);
        while history.len() > self.config.history_limit {
            history.pop_front();
        }
    }

    /// Get recent executions, newest first.
    pub async fn recent_executions(&self, limit: usize) -> Vec<IntentExecution> {
        let history = self.history.read().await;
        history.iter().rev().take(limit).cloned().collect()
    }

    /// Get execution statistics.
    pub async fn stats(&self) -> IntentExecutorStats {
        let history = self.history.read().await;

        let total = history.len();
        let successful = history.iter().filter(|e| e.success).count();
        let avg_duration_ms = if total > 0 {
            history.iter().map(|e| e.duration_ms).sum::<u64>() / total as u64
        } else {
            0
        };

        IntentExecutorStats {
            total_executions: total,
            successful,
            failed: total - successful,
            success_rate: if total > 0 {
                successful as f64 / total as f64
            } else {
                0.0
            },
            avg_duration_ms,
            registered_handlers: self.handlers.read().await.len(),
        }
    }
}

impl Default for IntentExecutor {
    fn default() -> Self {
        Self::new()
    }
}

/// Statistics for the intent executor.
#[derive(Debug, Clone)]
pub struct IntentExecutorStats {
    pub total_executions: usize,
    pub successful: usize,
    pub failed: usize,
    pub success_rate: f64,
    pub avg_duration_ms: u64,
    pub registered_handlers: usize,
}

#[async_trait]
impl IntentForwarder for IntentExecutor {
    fn name(&self) -> &str {
        "intent-executor"
    }

    async fn forward(&self, intent: &NormalizedIntent) -> modality::Result<Value> {
        let execution = self
            .execute_intent(intent)
            .await
            .map_err(|e| ModalityError::Forward(e.to_string()))?;
        serde_json::to_value(execution).map_err(|e| ModalityError::Forward(e.to_string()))
    }
}

/// Complexity in [0, 1] from parameter count, action kind and context depth.
pub fn intent_complexity(intent: &NormalizedIntent) -> f64 {
    let mut complexity = (intent.parameters.len() as f64 / 10.0).min(0.3);

    let action = intent.action.to_lowercase();
    if COMPLEX_ACTIONS.iter().any(|a| action.contains(a)) {
        complexity += 0.2;
    }

    complexity += (intent.context.len() as f64 / 10.0).min(0.2);
    complexity.min(1.0)
}

fn intent_context(intent: &NormalizedIntent) -> Context {
    let mut context = Context::new();
    context.insert("intent".to_string(), json!(intent.intent));
    context.insert("action".to_string(), json!(intent.action));
    context.insert("parameters".to_string(), json!(intent.parameters));
    context.insert("context".to_string(), json!(intent.context));
    context
}
