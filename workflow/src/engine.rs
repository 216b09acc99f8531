//! Workflow engine - predicts, then executes workflows step by step.

use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{RwLock, Semaphore};
use tracing::{debug, error, info, warn};

use crate::config::EngineConfig;
use crate::macros::{AssetGenerationMacro, ComplianceCheckMacro, Macro, StepHandler};
use crate::types::{
    Context, ExecutionStatus, Prediction, Result, StepResult, StepStatus, Workflow, WorkflowError,
    WorkflowExecution, WorkflowOutcome, WorkflowStep, WorkflowSummary,
};

/// Steps above which parallel execution is suggested.
const PARALLEL_STEP_THRESHOLD: usize = 10;
/// Repeat count above which caching a macro's result is suggested.
const CACHE_MACRO_THRESHOLD: usize = 2;

/// Executes declarative workflows.
pub struct WorkflowEngine {
    /// Configuration
    config: EngineConfig,
    /// Tracked executions by id
    executions: Arc<RwLock<HashMap<String, WorkflowExecution>>>,
    /// Registered macros
    macros: Arc<RwLock<HashMap<String, Arc<dyn Macro>>>>,
    /// Registered step handlers
    handlers: Arc<RwLock<HashMap<String, Arc<dyn StepHandler>>>>,
    /// Concurrency limiter
    semaphore: Arc<Semaphore>,
}

impl WorkflowEngine {
    /// Create a new engine with default configuration.
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    /// Create with custom configuration. The default macros are registered
    /// immediately.
    pub fn with_config(config: EngineConfig) -> Self {
        let mut macros: HashMap<String, Arc<dyn Macro>> = HashMap::new();
        macros.insert("asset-generation".to_string(), Arc::new(AssetGenerationMacro));
        macros.insert("compliance-check".to_string(), Arc::new(ComplianceCheckMacro));

        Self {
            semaphore: Arc::new(Semaphore::new(config.max_concurrent_workflows.max(1))),
            config,
            executions: Arc::new(RwLock::new(HashMap::new())),
            macros: Arc::new(RwLock::new(macros)),
            handlers: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Register or replace a macro.
    pub async fn register_macro(&self, name: &str, handler: Arc<dyn Macro>) {
        self.macros.write().await.insert(name.to_string(), handler);
        debug!(macro_name = %name, "Registered macro");
    }

    /// Register or replace a step handler.
    pub async fn register_handler(&self, name: &str, handler: Arc<dyn StepHandler>) {
        self.handlers.write().await.insert(name.to_string(), handler);
        debug!(handler = %name, "Registered step handler");
    }

    /// Execute a workflow to completion or first failure.
    pub async fn execute_workflow(&self, workflow: Workflow, context: Context) -> Result<WorkflowOutcome> {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|_| WorkflowError::Config("Failed to acquire execution permit".to_string()))?;

        let workflow_id = format!("wf_{}", uuid::Uuid::new_v4().simple());
        let prediction = self.predict(&workflow).await;

        if prediction.confidence < self.config.prediction_threshold {
            warn!(
                workflow_id = %workflow_id,
                confidence = prediction.confidence,
                threshold = self.config.prediction_threshold,
                "Low confidence prediction"
            );
        }

        info!(
            workflow_id = %workflow_id,
            name = %workflow.name,
            steps = workflow.steps.len(),
            "Executing workflow"
        );

        {
            let mut executions = self.executions.write().await;
            executions.insert(
                workflow_id.clone(),
                WorkflowExecution {
                    id: workflow_id.clone(),
                    workflow: workflow.clone(),
                    context: context.clone(),
                    prediction: prediction.clone(),
                    start_time: Utc::now(),
                    status: ExecutionStatus::Running,
                    results: Vec::new(),
                    error: None,
                    finished_at: None,
                },
            );
        }

        let mut results = Vec::with_capacity(workflow.steps.len());

        for (i, step) in workflow.steps.iter().enumerate() {
            debug!(workflow_id = %workflow_id, step = %step.name, "Executing step");

            let result = self.run_step(step, &context).await;
            self.record_result(&workflow_id, &result).await;
            let failed = result.status == StepStatus::Failed;
            let message = result.error.clone();
            results.push(result);

            if failed {
                let message = message.unwrap_or_else(|| "step failed".to_string());
                error!(
                    workflow_id = %workflow_id,
                    step = %step.name,
                    index = i + 1,
                    error = %message,
                    "Workflow step failed"
                );
                self.finish(&workflow_id, ExecutionStatus::Failed, Some(message.clone()))
                    .await?;
                return Err(WorkflowError::StepExecution {
                    workflow_id,
                    step: step.name.clone(),
                    index: i + 1,
                    message,
                });
            }
        }

        self.finish(&workflow_id, ExecutionStatus::Completed, None).await?;
        info!(workflow_id = %workflow_id, steps = results.len(), "Workflow completed");

        Ok(WorkflowOutcome {
            workflow_id,
            success: true,
            results,
            prediction,
        })
    }

    /// Run one step and, if it succeeds, the macro it triggers.
    async fn run_step(&self, step: &WorkflowStep, context: &Context) -> StepResult {
        let timestamp = Utc::now();

        let output = match self.step_output(step, context).await {
            Ok(output) => output,
            Err(e) => {
                return StepResult {
                    step_name: step.name.clone(),
                    status: StepStatus::Failed,
                    output: Value::Null,
                    macro_result: None,
                    error: Some(e.to_string()),
                    timestamp,
                }
            }
        };

        let mut result = StepResult {
            step_name: step.name.clone(),
            status: StepStatus::Completed,
            output,
            macro_result: None,
            error: None,
            timestamp,
        };

        let trigger = step.trigger_macro.as_ref().filter(|_| self.config.enable_macros);
        if let Some(name) = trigger {
            let mut macro_context = context.clone();
            macro_context.insert(
                "stepResult".to_string(),
                serde_json::to_value(&result).unwrap_or(Value::Null),
            );

            match self.execute_macro(name, &macro_context).await {
                Ok(value) => result.macro_result = value,
                Err(e) => {
                    result.status = StepStatus::Failed;
                    result.error = Some(format!("macro {} failed: {}", name, e));
                }
            }
        }

        result
    }

    async fn step_output(&self, step: &WorkflowStep, context: &Context) -> Result<Value> {
        let Some(name) = &step.handler else {
            return Ok(step.output.clone().unwrap_or_else(|| json!({})));
        };

        let handler = self.handlers.read().await.get(name).cloned();
        match handler {
            Some(handler) => handler.execute(step, context).await,
            None => Err(WorkflowError::Handler(format!(
                "No step handler registered: {}",
                name
            ))),
        }
    }

    /// Invoke a registered macro. Unknown macros are skipped with a warning.
    pub async fn execute_macro(&self, name: &str, context: &Context) -> Result<Option<Value>> {
        let handler = self.macros.read().await.get(name).cloned();

        match handler {
            Some(handler) => handler.invoke(context).await.map(Some),
            None => {
                warn!(macro_name = %name, "Macro not found");
                Ok(None)
            }
        }
    }

    async fn record_result(&self, workflow_id: &str, result: &StepResult) {
        let mut executions = self.executions.write().await;
        if let Some(execution) = executions.get_mut(workflow_id) {
            execution.results.push(result.clone());
        }
    }

    async fn finish(&self, workflow_id: &str, status: ExecutionStatus, error: Option<String>) -> Result<()> {
        let mut executions = self.executions.write().await;
        let execution = executions
            .get_mut(workflow_id)
            .ok_or_else(|| WorkflowError::NotFound(workflow_id.to_string()))?;

        execution.status = execution.status.transition(status)?;
        execution.error = error;
        execution.finished_at = Some(Utc::now());

        evict_finished(&mut executions, self.config.execution_limit);
        Ok(())
    }

    /// Predict the outcome of a workflow before running it.
    pub async fn predict(&self, workflow: &Workflow) -> Prediction {
        let steps = workflow.steps.len();
        let triggers = workflow.macro_trigger_count();

        let complexity = (steps as f64 / 20.0 + triggers as f64 / 10.0).min(1.0);
        let historical_success = self.historical_success(&workflow.name).await;
        let confidence = (historical_success * 0.7 + (1.0 - complexity) * 0.3).min(1.0);

        let mut suggested_optimizations = Vec::new();
        if steps > PARALLEL_STEP_THRESHOLD {
            suggested_optimizations.push("parallel-execution".to_string());
        }
        let mut macro_counts: HashMap<&str, usize> = HashMap::new();
        for name in workflow.steps.iter().filter_map(|s| s.trigger_macro.as_deref()) {
            *macro_counts.entry(name).or_insert(0) += 1;
        }
        if macro_counts.values().any(|&c| c > CACHE_MACRO_THRESHOLD) {
            suggested_optimizations.push("caching".to_string());
        }

        let mut potential_issues = Vec::new();
        if self.config.enable_macros {
            let macros = self.macros.read().await;
            let mut missing: Vec<&str> = macro_counts
                .keys()
                .copied()
                .filter(|name| !macros.contains_key(*name))
                .collect();
            missing.sort_unstable();
            potential_issues.extend(missing.into_iter().map(|n| format!("Macro not registered: {}", n)));
        }
        {
            let handlers = self.handlers.read().await;
            for name in workflow.steps.iter().filter_map(|s| s.handler.as_deref()) {
                if !handlers.contains_key(name) {
                    potential_issues.push(format!("Step handler not registered: {}", name));
                }
            }
        }

        Prediction {
            confidence,
            complexity,
            historical_success,
            estimated_duration_ms: if steps == 0 { 500 } else { 100 * steps as u64 },
            suggested_optimizations,
            potential_issues,
        }
    }

    /// Completed fraction of finished executions with this name.
    async fn historical_success(&self, name: &str) -> f64 {
        let executions = self.executions.read().await;
        let finished: Vec<&WorkflowExecution> = executions
            .values()
            .filter(|e| e.workflow.name == name && e.status.is_terminal())
            .collect();

        if finished.is_empty() {
            return self.config.default_success_rate;
        }

        let completed = finished
            .iter()
            .filter(|e| e.status == ExecutionStatus::Completed)
            .count();
        completed as f64 / finished.len() as f64
    }

    /// Summaries of every tracked execution, in no particular order.
    pub async fn get_active_workflows(&self) -> Vec<WorkflowSummary> {
        let executions = self.executions.read().await;
        executions.values().map(WorkflowSummary::from).collect()
    }

    /// Full execution record.
    pub async fn get_execution(&self, workflow_id: &str) -> Result<WorkflowExecution> {
        let executions = self.executions.read().await;
        executions
            .get(workflow_id)
            .cloned()
            .ok_or_else(|| WorkflowError::NotFound(workflow_id.to_string()))
    }

    /// Remove and return a finished execution record.
    pub async fn take_execution(&self, workflow_id: &str) -> Result<WorkflowExecution> {
        let mut executions = self.executions.write().await;
        match executions.get(workflow_id) {
            None => Err(WorkflowError::NotFound(workflow_id.to_string())),
            Some(e) if !e.status.is_terminal() => Err(WorkflowError::StillRunning(workflow_id.to_string())),
            Some(_) => executions
                .remove(workflow_id)
                .ok_or_else(|| WorkflowError::NotFound(workflow_id.to_string())),
        }
    }

    /// Get engine statistics.
    pub async fn stats(&self) -> EngineStats {
        let executions = self.executions.read().await;
        let count = |status: ExecutionStatus| executions.values().filter(|e| e.status == status).count();

        EngineStats {
            total_workflows: executions.len(),
            running: count(ExecutionStatus::Running),
            completed: count(ExecutionStatus::Completed),
            failed: count(ExecutionStatus::Failed),
            registered_macros: self.macros.read().await.len(),
            registered_handlers: self.handlers.read().await.len(),
        }
    }
}

impl Default for WorkflowEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Drop the oldest finished executions until at most `limit` remain.
/// Running executions are never evicted.
fn evict_finished(executions: &mut HashMap<String, WorkflowExecution>, limit: usize) {
    let mut finished: Vec<(DateTime<Utc>, String)> = executions
        .values()
        .filter_map(|e| e.finished_at.map(|at| (at, e.id.clone())))
        .collect();
    if finished.len() <= limit {
        return;
    }

    finished.sort();
    let excess = finished.len() - limit;
    for (_, id) in finished.into_iter().take(excess) {
        executions.remove(&id);
    }
    debug!(evicted = excess, "Evicted finished workflow executions");
}

/// Statistics for the workflow engine.
#[derive(Debug, Clone)]
pub struct EngineStats {
    /// Tracked executions
    pub total_workflows: usize,
    pub running: usize,
    pub completed: usize,
    pub failed: usize,
    pub registered_macros: usize,
    pub registered_handlers: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Echo;

    #[async_trait]
    impl StepHandler for Echo {
        async fn execute(&self, step: &WorkflowStep, context: &Context) -> Result<Value> {
            Ok(json!({ "step": step.name, "user": context.get("user") }))
        }
    }

    struct Explode;

    #[async_trait]
    impl StepHandler for Explode {
        async fn execute(&self, step: &WorkflowStep, _context: &Context) -> Result<Value> {
            Err(WorkflowError::Handler(format!("{} exploded", step.name)))
        }
    }

    struct Counting(AtomicUsize);

    #[async_trait]
    impl Macro for Counting {
        async fn invoke(&self, context: &Context) -> Result<Value> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(context["stepResult"]["output"].clone())
        }
    }

    struct Broken;

    #[async_trait]
    impl Macro for Broken {
        async fn invoke(&self, _context: &Context) -> Result<Value> {
            Err(WorkflowError::Handler("macro broke".to_string()))
        }
    }

    fn steps(n: usize) -> Vec<WorkflowStep> {
        (1..=n).map(|i| WorkflowStep::new(format!("s{}", i))).collect()
    }

    #[tokio::test]
    async fn test_successful_workflow() {
        let engine = WorkflowEngine::new();
        let workflow = Workflow::new(
            "publish",
            vec![
                WorkflowStep::new("render")
                    .with_output(json!({"frames": 24}))
                    .with_macro("asset-generation"),
                WorkflowStep::new("check").with_macro("compliance-check"),
            ],
        );

        let outcome = engine.execute_workflow(workflow, Context::new()).await.unwrap();
        assert!(outcome.success);
        assert!(outcome.workflow_id.starts_with("wf_"));
        assert_eq!(outcome.results.len(), 2);
        assert_eq!(outcome.results[0].output["frames"], 24);
        assert_eq!(outcome.results[0].macro_result.as_ref().unwrap()["type"], "asset-generation");
        assert_eq!(outcome.results[1].output, json!({}));

        let execution = engine.get_execution(&outcome.workflow_id).await.unwrap();
        assert_eq!(execution.status, ExecutionStatus::Completed);
        assert!(execution.finished_at.is_some());
        assert_eq!(execution.results.len(), 2);
    }

    #[tokio::test]
    async fn test_k_failing_step_yields_k_results() {
        let engine = WorkflowEngine::new();
        engine.register_handler("explode", Arc::new(Explode)).await;

        for k in 1..=4 {
            let mut wf_steps = steps(4);
            wf_steps[k - 1].handler = Some("explode".to_string());

            let err = engine
                .execute_workflow(Workflow::new("k-fail", wf_steps), Context::new())
                .await
                .unwrap_err();

            let WorkflowError::StepExecution { workflow_id, index, step, .. } = err else {
                panic!("expected step execution error");
            };
            assert_eq!(index, k);
            assert_eq!(step, format!("s{}", k));

            let execution = engine.get_execution(&workflow_id).await.unwrap();
            assert_eq!(execution.status, ExecutionStatus::Failed);
            assert_eq!(execution.results.len(), k);
            assert_eq!(execution.results[k - 1].status, StepStatus::Failed);
        }
    }

    #[tokio::test]
    async fn test_macro_failure_fails_step() {
        let engine = WorkflowEngine::new();
        engine.register_macro("broken", Arc::new(Broken)).await;

        let workflow = Workflow::new(
            "macro-fail",
            vec![WorkflowStep::new("a"), WorkflowStep::new("b").with_macro("broken"), WorkflowStep::new("c")],
        );
        let err = engine.execute_workflow(workflow, Context::new()).await.unwrap_err();
        assert!(matches!(err, WorkflowError::StepExecution { index: 2, .. }));
    }

    #[tokio::test]
    async fn test_unknown_macro_is_skipped() {
        let engine = WorkflowEngine::new();
        let workflow = Workflow::new("ghost", vec![WorkflowStep::new("a").with_macro("ghost")]);

        let prediction = engine.predict(&workflow).await;
        assert_eq!(prediction.potential_issues, vec!["Macro not registered: ghost"]);

        let outcome = engine.execute_workflow(workflow, Context::new()).await.unwrap();
        assert!(outcome.results[0].macro_result.is_none());
    }

    #[tokio::test]
    async fn test_macros_disabled() {
        let counting = Arc::new(Counting(AtomicUsize::new(0)));
        let engine = WorkflowEngine::with_config(EngineConfig {
            enable_macros: false,
            ..Default::default()
        });
        engine.register_macro("count", counting.clone()).await;

        let workflow = Workflow::new("quiet", vec![WorkflowStep::new("a").with_macro("count")]);
        engine.execute_workflow(workflow, Context::new()).await.unwrap();
        assert_eq!(counting.0.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_handler_and_macro_see_context() {
        let counting = Arc::new(Counting(AtomicUsize::new(0)));
        let engine = WorkflowEngine::new();
        engine.register_handler("echo", Arc::new(Echo)).await;
        engine.register_macro("count", counting.clone()).await;

        let mut context = Context::new();
        context.insert("user".to_string(), json!("acct-1"));

        let workflow = Workflow::new(
            "ctx",
            vec![WorkflowStep::new("greet").with_handler("echo").with_macro("count")],
        );
        let outcome = engine.execute_workflow(workflow, context).await.unwrap();

        assert_eq!(outcome.results[0].output["user"], "acct-1");
        assert_eq!(outcome.results[0].macro_result.as_ref().unwrap()["step"], "greet");
        assert_eq!(counting.0.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_prediction() {
        let engine = WorkflowEngine::new();

        let empty = engine.predict(&Workflow::new("empty", vec![])).await;
        assert_eq!(empty.estimated_duration_ms, 500);
        assert!((empty.confidence - 0.93).abs() < 1e-9);

        let mut many = steps(12);
        for step in many.iter_mut().take(3) {
            step.trigger_macro = Some("compliance-check".to_string());
        }
        many[5].handler = Some("missing".to_string());
        let big = engine.predict(&Workflow::new("big", many)).await;
        assert_eq!(big.estimated_duration_ms, 1200);
        assert!(big.suggested_optimizations.contains(&"parallel-execution".to_string()));
        assert!(big.suggested_optimizations.contains(&"caching".to_string()));
        assert_eq!(big.potential_issues, vec!["Step handler not registered: missing"]);
        assert!(big.confidence < 0.85);
    }

    #[tokio::test]
    async fn test_history_feeds_prediction() {
        let engine = WorkflowEngine::new();
        engine.register_handler("explode", Arc::new(Explode)).await;

        let bad = Workflow::new("flaky", vec![WorkflowStep::new("x").with_handler("explode")]);
        let _ = engine.execute_workflow(bad, Context::new()).await;

        let prediction = engine.predict(&Workflow::new("flaky", vec![])).await;
        assert_eq!(prediction.historical_success, 0.0);
        assert!((prediction.confidence - 0.3).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_tracking_and_stats() {
        let engine = WorkflowEngine::new();
        engine
            .execute_workflow(Workflow::new("a", steps(1)), Context::new())
            .await
            .unwrap();
        engine
            .execute_workflow(Workflow::new("b", steps(2)), Context::new())
            .await
            .unwrap();

        let active = engine.get_active_workflows().await;
        assert_eq!(active.len(), 2);
        assert!(active.iter().all(|w| w.status == ExecutionStatus::Completed));

        let stats = engine.stats().await;
        assert_eq!(stats.completed, 2);
        assert_eq!(stats.registered_macros, 2);

        tokio_test::assert_err!(engine.get_execution("wf_missing").await);
    }

    #[tokio::test]
    async fn test_take_execution_releases_record() {
        let engine = WorkflowEngine::new();
        let outcome = engine
            .execute_workflow(Workflow::new("once", steps(1)), Context::new())
            .await
            .unwrap();

        let taken = engine.take_execution(&outcome.workflow_id).await.unwrap();
        assert_eq!(taken.status, ExecutionStatus::Completed);
        assert!(engine.get_active_workflows().await.is_empty());
        assert!(matches!(
            engine.take_execution(&outcome.workflow_id).await,
            Err(WorkflowError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_finished_executions_bounded() {
        let engine = WorkflowEngine::with_config(EngineConfig {
            execution_limit: 3,
            ..Default::default()
        });

        let mut ids = Vec::new();
        for _ in 0..10 {
            let outcome = engine
                .execute_workflow(Workflow::new("repeat", steps(1)), Context::new())
                .await
                .unwrap();
            ids.push(outcome.workflow_id);
        }

        assert_eq!(engine.stats().await.total_workflows, 3);
        for id in &ids[..7] {
            tokio_test::assert_err!(engine.get_execution(id).await);
        }
        for id in &ids[7..] {
            tokio_test::assert_ok!(engine.get_execution(id).await);
        }
    }
}
