//! AR/VR spatial gesture recognition.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::config::SpatialConfig;
use crate::types::{InputType, Orientation, Params, SpatialInput, Vec3, Velocity};

/// Scores how well a spatial input matches one gesture.
pub trait GestureRecognizer: Send + Sync {
    fn name(&self) -> &str;

    /// Confidence in [0, 1].
    fn evaluate(&self, input: &SpatialInput) -> f64;
}

/// Finger extended close to the body's midline.
pub struct PointRecognizer;

impl GestureRecognizer for PointRecognizer {
    fn name(&self) -> &str {
        "point"
    }

    fn evaluate(&self, input: &SpatialInput) -> f64 {
        let p = input.position();
        if p.z < 0.5 && p.x.abs() < 0.2 {
            0.8
        } else {
            0.3
        }
    }
}

/// Every tracked finger curled.
pub struct GrabRecognizer;

impl GestureRecognizer for GrabRecognizer {
    fn name(&self) -> &str {
        "grab"
    }

    fn evaluate(&self, input: &SpatialInput) -> f64 {
        if !input.fingers.is_empty() && input.fingers.iter().all(|f| f.curled) {
            0.9
        } else {
            0.2
        }
    }
}

pub struct PinchRecognizer;

impl GestureRecognizer for PinchRecognizer {
    fn name(&self) -> &str {
        "pinch"
    }

    fn evaluate(&self, input: &SpatialInput) -> f64 {
        if input.pinch_strength.unwrap_or(0.0) > 0.7 {
            0.85
        } else {
            0.1
        }
    }
}

pub struct SwipeRecognizer;

impl GestureRecognizer for SwipeRecognizer {
    fn name(&self) -> &str {
        "swipe"
    }

    fn evaluate(&self, input: &SpatialInput) -> f64 {
        if input.velocity().magnitude() > 0.8 {
            0.75
        } else {
            0.1
        }
    }
}

/// Interaction distance band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Zone {
    Near,
    Mid,
    Far,
}

impl Zone {
    pub fn of(p: &Vec3) -> Zone {
        if p.x.abs() < 0.3 && p.y.abs() < 0.3 && p.z < 0.5 {
            Zone::Near
        } else if p.x.abs() < 0.6 && p.y.abs() < 0.6 && p.z < 1.0 {
            Zone::Mid
        } else {
            Zone::Far
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Zone::Near => "near",
            Zone::Mid => "mid",
            Zone::Far => "far",
        }
    }
}

/// Recognized gesture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpatialGesture {
    pub name: String,
    pub confidence: f64,
}

/// Output of the spatial adapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpatialReading {
    #[serde(rename = "type")]
    pub input_type: InputType,
    pub gesture: String,
    pub confidence: f64,
    pub position: Vec3,
    pub orientation: Orientation,
    pub velocity: Velocity,
    pub zone: Zone,
    pub intent: String,
    pub parameters: Params,
    pub timestamp: DateTime<Utc>,
}

/// A gesture being tracked over time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackedGesture {
    pub id: String,
    pub gesture: String,
    pub confidence: f64,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub duration_ms: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpatialStats {
    pub active_gestures: usize,
    pub registered_recognizers: usize,
    pub coordinate_system: String,
    pub tracking_rate: u32,
}

/// Spatial input adapter.
pub struct SpatialAdapter {
    config: SpatialConfig,
    recognizers: Arc<RwLock<BTreeMap<String, Arc<dyn GestureRecognizer>>>>,
    active: Arc<RwLock<HashMap<String, TrackedGesture>>>,
}

impl SpatialAdapter {
    /// Create with the point, grab, pinch and swipe recognizers.
    pub fn new(config: SpatialConfig) -> Self {
        let defaults: [Arc<dyn GestureRecognizer>; 4] = [
            Arc::new(PointRecognizer),
            Arc::new(GrabRecognizer),
            Arc::new(PinchRecognizer),
            Arc::new(SwipeRecognizer),
        ];
        let recognizers = defaults
            .into_iter()
            .map(|r| (r.name().to_string(), r))
            .collect();

        Self {
            config,
            recognizers: Arc::new(RwLock::new(recognizers)),
            active: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn register_recognizer(&self, recognizer: Arc<dyn GestureRecognizer>) {
        let name = recognizer.name().to_string();
        self.recognizers.write().await.insert(name.clone(), recognizer);
        debug!(gesture = %name, "Registered spatial recognizer");
    }

    /// Process a spatial input.
    pub async fn process(&self, input: &SpatialInput) -> SpatialReading {
        if input.position.is_none() && input.x.is_none() {
            warn!("Spatial input missing position data");
        }

        let position = input.position();
        let velocity = input.velocity();
        let gesture = self.recognize(input).await;
        let zone = Zone::of(&position);
        let intent = spatial_intent(&gesture.name, velocity.magnitude());

        let mut parameters = Params::new();
        parameters.insert(
            "handedness".to_string(),
            json!(input.handedness.as_deref().unwrap_or("right")),
        );
        parameters.insert("fingers".to_string(), json!(input.fingers));
        parameters.insert("pressure".to_string(), json!(input.pressure.unwrap_or(0.0)));
        parameters.insert(
            "trackingQuality".to_string(),
            json!(input.tracking_quality.unwrap_or(1.0)),
        );

        SpatialReading {
            input_type: InputType::Spatial,
            gesture: gesture.name,
            confidence: gesture.confidence,
            position,
            orientation: input.orientation(),
            velocity,
            zone,
            intent,
            parameters,
            timestamp: Utc::now(),
        }
    }

    /// Best recognizer at or above the gesture threshold, else `none`.
    pub async fn recognize(&self, input: &SpatialInput) -> SpatialGesture {
        let recognizers = self.recognizers.read().await;
        let mut best = SpatialGesture {
            name: "none".to_string(),
            confidence: 0.0,
        };

        for (name, recognizer) in recognizers.iter() {
            let confidence = recognizer.evaluate(input);
            if confidence > best.confidence && confidence >= self.config.gesture_threshold {
                best = SpatialGesture {
                    name: name.clone(),
                    confidence,
                };
            }
        }

        best
    }

    /// Start tracking a gesture.
    pub async fn track_gesture(&self, id: &str, gesture: &SpatialGesture) {
        let tracked = TrackedGesture {
            id: id.to_string(),
            gesture: gesture.name.clone(),
            confidence: gesture.confidence,
            started_at: Utc::now(),
            ended_at: None,
            duration_ms: None,
        };
        self.active.write().await.insert(id.to_string(), tracked);
    }

    /// Stop tracking a gesture and return it with its duration.
    pub async fn end_gesture(&self, id: &str) -> Option<TrackedGesture> {
        let mut tracked = self.active.write().await.remove(id)?;
        let now = Utc::now();
        tracked.duration_ms = Some((now - tracked.started_at).num_milliseconds());
        tracked.ended_at = Some(now);
        Some(tracked)
    }

    pub async fn active_gestures(&self) -> Vec<TrackedGesture> {
        self.active.read().await.values().cloned().collect()
    }

    pub async fn stats(&self) -> SpatialStats {
        SpatialStats {
            active_gestures: self.active.read().await.len(),
            registered_recognizers: self.recognizers.read().await.len(),
            coordinate_system: self.config.coordinate_system.clone(),
            tracking_rate: self.config.tracking_rate,
        }
    }
}

impl Default for SpatialAdapter {
    fn default() -> Self {
        Self::new(SpatialConfig::default())
    }
}

/// Map a gesture to an intent; fast movement prefixes it.
pub fn spatial_intent(gesture: &str, speed: f64) -> String {
    let intent = match gesture {
        "point" => "select",
        "grab" => "manipulate",
        "pinch" => "precise-control",
        "swipe" => "navigate",
        "wave" => "dismiss",
        "push" => "activate",
        "pull" => "retrieve",
        _ => "unknown",
    };

    if speed > 1.0 {
        format!("fast-{}", intent)
    } else {
        intent.to_string()
    }
}
