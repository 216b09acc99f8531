//! Intent normalization.
//!
//! Converts raw input from any modality into a [`NormalizedIntent`] by
//! running it through the matching adapter and mapping the reading onto the
//! canonical `{intent, action, parameters, context, metadata}` shape.

use chrono::Utc;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::adapters::{FlowAdapter, SpatialAdapter, TouchAdapter, VoiceAdapter};
use crate::config::{ModalityConfig, NormalizerConfig};
use crate::types::{
    FlowInput, GenericInput, IntentMetadata, ModalityError, NormalizedIntent, Params, RawInput,
    Result, SpatialInput, TouchInput, VoiceInput,
};

pub const NORMALIZER_NAME: &str = "IntentNormalizer";
pub const NORMALIZER_VERSION: &str = "1.0.0";

/// Intent, action, parameters and context before metadata is stamped.
struct Draft {
    intent: String,
    action: String,
    parameters: Params,
    context: Params,
}

fn params<const N: usize>(entries: [(&str, Value); N]) -> Params {
    entries
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value.as_ref().filter(|s| !s.is_empty()).cloned()
}

/// Normalizes raw input through the modality adapters.
pub struct IntentNormalizer {
    config: NormalizerConfig,
    touch: TouchAdapter,
    voice: Arc<VoiceAdapter>,
    spatial: Arc<SpatialAdapter>,
    flow: Arc<FlowAdapter>,
}

impl IntentNormalizer {
    /// Create with fresh adapters built from `config`.
    pub fn new(config: &ModalityConfig) -> Self {
        Self {
            config: config.normalizer.clone(),
            touch: TouchAdapter::new(),
            voice: Arc::new(VoiceAdapter::new(config.voice.clone())),
            spatial: Arc::new(SpatialAdapter::new(config.spatial.clone())),
            flow: Arc::new(FlowAdapter::new(config.flow.clone())),
        }
    }

    pub fn validation_enabled(&self) -> bool {
        self.config.validation_enabled
    }

    pub fn voice(&self) -> &Arc<VoiceAdapter> {
        &self.voice
    }

    pub fn spatial(&self) -> &Arc<SpatialAdapter> {
        &self.spatial
    }

    pub fn flow(&self) -> &Arc<FlowAdapter> {
        &self.flow
    }

    /// Parse an untyped record and normalize it.
    pub async fn normalize_value(&self, value: Value) -> Result<NormalizedIntent> {
        let raw = RawInput::from_value(value)?;
        self.normalize(&raw).await
    }

    /// Normalize a typed raw input.
    pub async fn normalize(&self, input: &RawInput) -> Result<NormalizedIntent> {
        let input_type = input.input_type();
        debug!(input_type = %input_type, "Normalizing input");

        let draft = match input {
            RawInput::Touch(touch) => self.normalize_touch(touch),
            RawInput::Voice(voice) => self.normalize_voice(voice).await?,
            RawInput::Spatial(spatial) => self.normalize_spatial(spatial).await,
            RawInput::Flow(flow) => self.normalize_flow(flow).await,
            RawInput::Generic(generic) => normalize_generic(generic),
        };

        let intent = NormalizedIntent {
            intent: draft.intent,
            action: draft.action,
            parameters: draft.parameters,
            context: draft.context,
            metadata: IntentMetadata {
                input_type: input_type.to_string(),
                timestamp: Utc::now(),
                normalized_by: NORMALIZER_NAME.to_string(),
                version: NORMALIZER_VERSION.to_string(),
            },
        };

        if self.config.validation_enabled {
            validate_payload(&intent)?;
        }

        Ok(intent)
    }

    /// Normalize each record independently, dropping failures.
    pub async fn normalize_batch(&self, inputs: Vec<Value>) -> Vec<NormalizedIntent> {
        let total = inputs.len();
        let mut normalized = Vec::with_capacity(total);

        for (index, value) in inputs.into_iter().enumerate() {
            match self.normalize_value(value).await {
                Ok(intent) => normalized.push(intent),
                Err(e) => warn!(index, error = %e, "Failed to normalize batch item"),
            }
        }

        debug!(total, normalized = normalized.len(), "Normalized batch");
        normalized
    }

    fn normalize_touch(&self, input: &TouchInput) -> Draft {
        let reading = self.touch.process(input);

        Draft {
            intent: "interaction".to_string(),
            action: non_empty(&input.action).unwrap_or_else(|| reading.touch_type.clone()),
            parameters: params([
                ("x", json!(reading.point.x)),
                ("y", json!(reading.point.y)),
                ("pressure", json!(reading.pressure)),
                ("duration", json!(reading.duration)),
            ]),
            context: params([
                ("element", input.element.clone().unwrap_or(Value::Null)),
                ("touchType", json!(reading.touch_type)),
            ]),
        }
    }

    async fn normalize_voice(&self, input: &VoiceInput) -> Result<Draft> {
        let reading = self.voice.process(input).await?;

        let mut parameters = reading.parameters.clone();
        parameters.extend(params([
            ("transcript", json!(reading.transcript)),
            ("confidence", json!(reading.confidence)),
            ("language", json!(reading.language)),
            ("command", json!(reading.command)),
            ("commandConfidence", json!(reading.command_confidence)),
            ("entities", json!(reading.entities)),
        ]));

        Ok(Draft {
            intent: reading.intent,
            action: non_empty(&input.action).unwrap_or_else(|| "voice-command".to_string()),
            parameters,
            context: params([("voice", json!(true)), ("raw", json!(reading.transcript))]),
        })
    }

    async fn normalize_spatial(&self, input: &SpatialInput) -> Draft {
        let reading = self.spatial.process(input).await;

        let action = non_empty(&input.action)
            .or_else(|| non_empty(&input.gesture_type))
            .or_else(|| (reading.gesture != "none").then(|| reading.gesture.clone()))
            .unwrap_or_else(|| "move".to_string());

        let mut parameters = reading.parameters.clone();
        parameters.extend(params([
            ("position", json!(reading.position)),
            ("orientation", json!(reading.orientation)),
            ("velocity", json!(reading.velocity)),
            ("zone", json!(reading.zone)),
            ("gesture", json!(reading.gesture)),
            ("confidence", json!(reading.confidence)),
        ]));

        Draft {
            intent: reading.intent,
            action,
            parameters,
            context: params([
                ("spatial", json!(true)),
                (
                    "gestureType",
                    json!(input.gesture_type.as_deref().unwrap_or(reading.gesture.as_str())),
                ),
            ]),
        }
    }

    async fn normalize_flow(&self, input: &FlowInput) -> Draft {
        let reading = self.flow.process(input).await;
        let recognized = (reading.gesture != "unknown").then(|| reading.gesture.clone());
        let declared = non_empty(&input.gesture);

        let intent = match (&input.intent, &recognized, &declared) {
            (Some(intent), _, _) => intent.clone(),
            (None, None, Some(declared)) => crate::adapters::flow::flow_intent(declared).to_string(),
            _ => reading.intent.clone(),
        };

        let action = non_empty(&input.action)
            .or_else(|| recognized.clone())
            .or_else(|| declared.clone())
            .unwrap_or_else(|| "flow".to_string());

        let gesture = recognized.or(declared).unwrap_or_else(|| reading.gesture.clone());

        let mut parameters = input.parameters.clone().unwrap_or_default();
        parameters.extend(reading.parameters.clone());
        parameters.extend(params([
            ("gesture", json!(gesture)),
            ("confidence", json!(reading.confidence)),
            ("pattern", json!(reading.pattern)),
            ("flowId", json!(reading.flow_id)),
        ]));

        Draft {
            intent,
            action,
            parameters,
            context: params([("flow", json!(true)), ("gesture", json!(gesture))]),
        }
    }
}

impl Default for IntentNormalizer {
    fn default() -> Self {
        Self::new(&ModalityConfig::default())
    }
}

fn normalize_generic(input: &GenericInput) -> Draft {
    Draft {
        intent: input.intent.clone().unwrap_or_else(|| "generic".to_string()),
        action: input.action.clone().unwrap_or_else(|| "unknown".to_string()),
        parameters: input
            .parameters
            .clone()
            .or_else(|| input.data.clone())
            .unwrap_or_default(),
        context: params([("generic", json!(true)), ("raw", input.raw.clone())]),
    }
}

/// Check that intent and action are non-empty.
pub fn validate_payload(intent: &NormalizedIntent) -> Result<()> {
    if intent.intent.trim().is_empty() {
        return Err(ModalityError::SchemaViolation(
            "normalized payload missing intent".to_string(),
        ));
    }
    if intent.action.trim().is_empty() {
        return Err(ModalityError::SchemaViolation(
            "normalized payload missing action".to_string(),
        ));
    }
    Ok(())
}
