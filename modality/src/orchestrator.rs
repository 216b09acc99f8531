//! Input orchestration.
//!
//! The public entry point for raw input. Owns a registry of handlers keyed
//! by input type and optionally forwards normalized intents downstream.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::config::ModalityConfig;
use crate::normalizer::IntentNormalizer;
use crate::types::{
    explicit_tag, InputType, ModalityError, NormalizedIntent, ProcessedInput, RawInput, Result,
};

/// Turns a raw input into a normalized intent.
#[async_trait]
pub trait InputHandler: Send + Sync {
    async fn handle(&self, input: &RawInput) -> Result<NormalizedIntent>;
}

/// Downstream consumer of normalized intents.
#[async_trait]
pub trait IntentForwarder: Send + Sync {
    /// Name of the forwarder, for logging.
    fn name(&self) -> &str;

    /// Forward an intent and return the downstream response.
    async fn forward(&self, intent: &NormalizedIntent) -> Result<Value>;
}

/// Handler that delegates to the shared normalizer.
pub struct NormalizerHandler {
    normalizer: Arc<IntentNormalizer>,
}

impl NormalizerHandler {
    pub fn new(normalizer: Arc<IntentNormalizer>) -> Self {
        Self { normalizer }
    }
}

#[async_trait]
impl InputHandler for NormalizerHandler {
    async fn handle(&self, input: &RawInput) -> Result<NormalizedIntent> {
        self.normalizer.normalize(input).await
    }
}

/// Orchestrator statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorStats {
    pub registered_handlers: usize,
    /// Sorted handler keys
    pub handler_types: Vec<String>,
    pub normalization_enabled: bool,
    pub forwarder_connected: bool,
    pub forwarder: Option<String>,
}

/// Entry point for multi-modal input.
pub struct InputOrchestrator {
    normalizer: Arc<IntentNormalizer>,
    handlers: Arc<RwLock<HashMap<String, Arc<dyn InputHandler>>>>,
    forwarder: Option<Arc<dyn IntentForwarder>>,
}

impl InputOrchestrator {
    /// Create with a normalizer-backed handler for every built-in modality.
    pub fn new(config: ModalityConfig) -> Self {
        let normalizer = Arc::new(IntentNormalizer::new(&config));

        let handlers: HashMap<String, Arc<dyn InputHandler>> = InputType::ALL
            .iter()
            .map(|t| {
                let handler: Arc<dyn InputHandler> =
                    Arc::new(NormalizerHandler::new(Arc::clone(&normalizer)));
                (t.as_str().to_string(), handler)
            })
            .collect();

        Self {
            normalizer,
            handlers: Arc::new(RwLock::new(handlers)),
            forwarder: None,
        }
    }

    /// Forward every normalized intent to `forwarder`.
    pub fn with_forwarder(mut self, forwarder: Arc<dyn IntentForwarder>) -> Self {
        info!(forwarder = %forwarder.name(), "Intent forwarder connected");
        self.forwarder = Some(forwarder);
        self
    }

    /// The shared normalizer and its adapters.
    pub fn normalizer(&self) -> &Arc<IntentNormalizer> {
        &self.normalizer
    }

    /// Register or replace the handler for an input type. Custom types are
    /// parsed as generic input before reaching their handler.
    pub async fn register_handler(&self, input_type: &str, handler: Arc<dyn InputHandler>) {
        let mut handlers = self.handlers.write().await;
        handlers.insert(input_type.to_string(), handler);
        debug!(input_type = %input_type, "Registered input handler");
    }

    /// Process one raw input record.
    pub async fn process_input(&self, value: Value) -> Result<ProcessedInput> {
        let record = value
            .as_object()
            .ok_or_else(|| ModalityError::InvalidInput("input must be an object".to_string()))?;

        let (key, kind) = match explicit_tag(record)? {
            Some(tag) => (tag.to_string(), tag.parse().unwrap_or(InputType::Generic)),
            None => {
                let detected = InputType::detect(record);
                (detected.as_str().to_string(), detected)
            }
        };

        // Lock released at the end of the statement, before the handler runs
        let handler = self
            .handlers
            .read()
            .await
            .get(&key)
            .cloned()
            .ok_or_else(|| ModalityError::NoHandler(key.clone()))?;

        let raw = RawInput::parse_as(kind, value)?;
        let intent = handler.handle(&raw).await?;

        let forwarded = match &self.forwarder {
            Some(forwarder) => Some(forwarder.forward(&intent).await?),
            None => None,
        };

        info!(
            input_type = %key,
            intent = %intent.intent,
            action = %intent.action,
            forwarded = forwarded.is_some(),
            "Processed input"
        );

        Ok(ProcessedInput { intent, forwarded })
    }

    pub async fn stats(&self) -> OrchestratorStats {
        let handlers = self.handlers.read().await;
        let mut handler_types: Vec<String> = handlers.keys().cloned().collect();
        handler_types.sort();

        OrchestratorStats {
            registered_handlers: handlers.len(),
            handler_types,
            normalization_enabled: self.normalizer.validation_enabled(),
            forwarder_connected: self.forwarder.is_some(),
            forwarder: self.forwarder.as_ref().map(|f| f.name().to_string()),
        }
    }
}

impl Default for InputOrchestrator {
    fn default() -> Self {
        Self::new(ModalityConfig::default())
    }
}
