//! Core types for multi-modal input handling.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Open, key-ordered parameter and context maps.
pub type Params = BTreeMap<String, Value>;

/// Error types for input handling.
#[derive(Debug, thiserror::Error)]
pub enum ModalityError {
    /// Raw input is not a well-formed record of a known variant
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Normalized payload is missing a required field
    #[error("Schema violation: {0}")]
    SchemaViolation(String),

    /// No handler registered for the input type
    #[error("No handler registered for input type: {0}")]
    NoHandler(String),

    /// Downstream forwarder failed
    #[error("Forward failed: {0}")]
    Forward(String),
}

pub type Result<T> = std::result::Result<T, ModalityError>;

/// Input modality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputType {
    Touch,
    Voice,
    Spatial,
    Flow,
    Generic,
}

impl InputType {
    pub const ALL: [InputType; 5] = [
        InputType::Touch,
        InputType::Voice,
        InputType::Spatial,
        InputType::Flow,
        InputType::Generic,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            InputType::Touch => "touch",
            InputType::Voice => "voice",
            InputType::Spatial => "spatial",
            InputType::Flow => "flow",
            InputType::Generic => "generic",
        }
    }

    /// Infer the modality from which fields are present. Flow fields take
    /// precedence over voice, voice over touch, touch over spatial.
    pub fn detect(record: &Map<String, Value>) -> InputType {
        let has = |key: &str| record.get(key).map(|v| !v.is_null()).unwrap_or(false);

        if has("gesture") || has("flow") || has("sequence") {
            InputType::Flow
        } else if has("transcript") || has("voice") || has("text") {
            InputType::Voice
        } else if has("coordinates") || has("touch") {
            InputType::Touch
        } else if has("spatial") || has("position") {
            InputType::Spatial
        } else {
            InputType::Generic
        }
    }
}

impl fmt::Display for InputType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InputType {
    type Err = ModalityError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "touch" => Ok(InputType::Touch),
            "voice" => Ok(InputType::Voice),
            "spatial" => Ok(InputType::Spatial),
            "flow" => Ok(InputType::Flow),
            "generic" => Ok(InputType::Generic),
            other => Err(ModalityError::InvalidInput(format!(
                "unknown input type '{}'",
                other
            ))),
        }
    }
}

// ============================================================================
// Geometry
// ============================================================================

/// A 2D point in a flow sequence or touch surface.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point2 {
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
}

impl Point2 {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Point2) -> f64 {
        ((other.x - self.x).powi(2) + (other.y - self.y).powi(2)).sqrt()
    }
}

/// A 3D position.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    #[serde(default)]
    pub z: f64,
}

/// Head or hand orientation in degrees.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Orientation {
    #[serde(default)]
    pub pitch: f64,
    #[serde(default)]
    pub yaw: f64,
    #[serde(default)]
    pub roll: f64,
}

/// Velocity with an optional precomputed magnitude.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Velocity {
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    #[serde(default)]
    pub z: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub magnitude: Option<f64>,
}

impl Velocity {
    /// Supplied magnitude, or the Euclidean norm of the components.
    pub fn magnitude(&self) -> f64 {
        self.magnitude
            .unwrap_or_else(|| (self.x * self.x + self.y * self.y + self.z * self.z).sqrt())
    }

    /// Copy with the magnitude filled in.
    pub fn resolved(&self) -> Velocity {
        Velocity {
            magnitude: Some(self.magnitude()),
            ..*self
        }
    }
}

/// Tracked finger state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Finger {
    #[serde(default)]
    pub curled: bool,
    #[serde(flatten)]
    pub extra: Params,
}

// ============================================================================
// Raw inputs
// ============================================================================

/// Touch surface input.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TouchInput {
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub coordinates: Option<Point2>,
    pub pressure: Option<f64>,
    pub duration: Option<f64>,
    pub action: Option<String>,
    pub touch_type: Option<String>,
    pub element: Option<Value>,
}

impl TouchInput {
    /// Top-level coordinates win over the nested `coordinates` object.
    pub fn point(&self) -> Point2 {
        let nested = self.coordinates.unwrap_or_default();
        Point2 {
            x: self.x.unwrap_or(nested.x),
            y: self.y.unwrap_or(nested.y),
        }
    }
}

/// Voice input.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceInput {
    pub transcript: Option<String>,
    pub voice: Option<String>,
    pub text: Option<String>,
    pub confidence: Option<f64>,
    pub language: Option<String>,
    pub action: Option<String>,
}

impl VoiceInput {
    pub fn new(transcript: impl Into<String>, confidence: f64) -> Self {
        Self {
            transcript: Some(transcript.into()),
            confidence: Some(confidence),
            ..Default::default()
        }
    }

    /// The first non-empty of `transcript`, `voice`, `text`.
    pub fn transcript(&self) -> Option<&str> {
        [&self.transcript, &self.voice, &self.text]
            .into_iter()
            .filter_map(|s| s.as_deref())
            .find(|s| !s.trim().is_empty())
    }
}

/// AR/VR spatial tracking input.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpatialInput {
    #[serde(alias = "spatial")]
    pub position: Option<Vec3>,
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub z: Option<f64>,
    #[serde(alias = "rotation")]
    pub orientation: Option<Orientation>,
    pub velocity: Option<Velocity>,
    #[serde(default)]
    pub fingers: Vec<Finger>,
    pub pinch_strength: Option<f64>,
    pub handedness: Option<String>,
    pub gesture_type: Option<String>,
    pub action: Option<String>,
    pub pressure: Option<f64>,
    pub tracking_quality: Option<f64>,
}

impl SpatialInput {
    /// Explicit position, else loose x/y/z, else the origin.
    pub fn position(&self) -> Vec3 {
        self.position.unwrap_or(Vec3 {
            x: self.x.unwrap_or(0.0),
            y: self.y.unwrap_or(0.0),
            z: self.z.unwrap_or(0.0),
        })
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation.unwrap_or_default()
    }

    pub fn velocity(&self) -> Velocity {
        self.velocity.unwrap_or_default().resolved()
    }
}

/// Flow gesture input: a sequence of 2D points.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowInput {
    #[serde(default)]
    pub sequence: Vec<Point2>,
    pub intensity: Option<f64>,
    pub duration: Option<f64>,
    pub pressure: Option<f64>,
    /// Gesture name supplied by the input surface
    pub gesture: Option<String>,
    pub intent: Option<String>,
    pub action: Option<String>,
    pub parameters: Option<Params>,
}

impl FlowInput {
    pub fn new(sequence: Vec<Point2>) -> Self {
        Self {
            sequence,
            ..Default::default()
        }
    }
}

/// Input that matched no known modality.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenericInput {
    pub intent: Option<String>,
    pub action: Option<String>,
    pub parameters: Option<Params>,
    pub data: Option<Params>,
    /// The untouched record
    #[serde(skip)]
    pub raw: Value,
}

/// Raw input from one modality, consumed once by a handler.
#[derive(Debug, Clone)]
pub enum RawInput {
    Touch(TouchInput),
    Voice(VoiceInput),
    Spatial(SpatialInput),
    Flow(FlowInput),
    Generic(GenericInput),
}

impl RawInput {
    pub fn input_type(&self) -> InputType {
        match self {
            RawInput::Touch(_) => InputType::Touch,
            RawInput::Voice(_) => InputType::Voice,
            RawInput::Spatial(_) => InputType::Spatial,
            RawInput::Flow(_) => InputType::Flow,
            RawInput::Generic(_) => InputType::Generic,
        }
    }

    /// Build from an untyped record. An explicit `type` tag must name a
    /// known modality; otherwise the modality is inferred from the fields.
    pub fn from_value(value: Value) -> Result<RawInput> {
        let record = value
            .as_object()
            .ok_or_else(|| ModalityError::InvalidInput("input must be an object".to_string()))?;

        let input_type = match explicit_tag(record)? {
            Some(tag) => tag.parse()?,
            None => InputType::detect(record),
        };

        Self::parse_as(input_type, value)
    }

    /// Parse a record as a specific modality.
    pub fn parse_as(input_type: InputType, value: Value) -> Result<RawInput> {
        if !value.is_object() {
            return Err(ModalityError::InvalidInput(
                "input must be an object".to_string(),
            ));
        }

        let invalid =
            |e: serde_json::Error| ModalityError::InvalidInput(format!("{} input: {}", input_type, e));

        Ok(match input_type {
            InputType::Touch => RawInput::Touch(serde_json::from_value(value).map_err(invalid)?),
            InputType::Voice => RawInput::Voice(serde_json::from_value(value).map_err(invalid)?),
            InputType::Spatial => RawInput::Spatial(serde_json::from_value(value).map_err(invalid)?),
            InputType::Flow => RawInput::Flow(serde_json::from_value(value).map_err(invalid)?),
            InputType::Generic => {
                let mut generic: GenericInput =
                    serde_json::from_value(value.clone()).map_err(invalid)?;
                generic.raw = value;
                RawInput::Generic(generic)
            }
        })
    }
}

/// The record's `type` tag, if any. A non-string tag is invalid.
pub fn explicit_tag(record: &Map<String, Value>) -> Result<Option<&str>> {
    match record.get("type") {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(tag)) => Ok(Some(tag.as_str())),
        Some(other) => Err(ModalityError::InvalidInput(format!(
            "type tag must be a string, got {}",
            other
        ))),
    }
}

// ============================================================================
// Normalized output
// ============================================================================

/// Provenance stamped on every normalized intent.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntentMetadata {
    pub input_type: String,
    pub timestamp: DateTime<Utc>,
    pub normalized_by: String,
    pub version: String,
}

/// Canonical, modality-independent intent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizedIntent {
    pub intent: String,
    pub action: String,
    pub parameters: Params,
    pub context: Params,
    pub metadata: IntentMetadata,
}

impl NormalizedIntent {
    /// Parameter lookup.
    pub fn param(&self, key: &str) -> Option<&Value> {
        self.parameters.get(key)
    }
}

/// Result of processing one input through the orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessedInput {
    pub intent: NormalizedIntent,
    /// Downstream response, when a forwarder is attached
    pub forwarded: Option<Value>,
}
