//! Workflow orchestration for the Super-Core
//!
//! Declarative workflows run step by step with optional macro triggers, and
//! normalized intents run through a predictive four-step plan.
//!
//! # Key Components
//!
//! - [`WorkflowEngine`]: Prediction, ordered step execution, macro registry
//! - [`IntentExecutor`]: Intent plans with retries and success history
//! - [`Macro`] / [`StepHandler`]: Extension seams registered by name

pub mod config;
pub mod engine;
pub mod intent_executor;
pub mod macros;
pub mod types;

// Re-export main types
pub use config::{EngineConfig, ExecutorConfig, WorkflowConfig};
pub use engine::{EngineStats, WorkflowEngine};
pub use intent_executor::{
    intent_complexity, ExecutionPath, IntentExecution, IntentExecutor, IntentExecutorStats,
    IntentPrediction,
};
pub use macros::{AssetGenerationMacro, ComplianceCheckMacro, Macro, StepHandler};
pub use types::*;
