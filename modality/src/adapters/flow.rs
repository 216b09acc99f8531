//! Flow gesture recognition over 2D point sequences.
//!
//! Sequences are matched position-wise against a template library and
//! summarized by velocity, direction and complexity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use std::f64::consts::{FRAC_PI_4, PI};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use crate::config::FlowConfig;
use crate::types::{FlowInput, InputType, Params, Point2};

/// Best template match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowGesture {
    pub name: String,
    pub confidence: f64,
}

/// Direction from first to last point.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Direction {
    pub x: f64,
    pub y: f64,
    /// Radians, from `atan2`
    pub angle: f64,
}

/// Shape class of a sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatternType {
    Static,
    Linear,
    Curved,
    Complex,
}

impl PatternType {
    pub fn classify(velocity: f64, complexity: f64) -> PatternType {
        if velocity < 0.1 {
            PatternType::Static
        } else if complexity < 0.2 {
            PatternType::Linear
        } else if complexity < 0.5 {
            PatternType::Curved
        } else {
            PatternType::Complex
        }
    }
}

/// Summary metrics of a sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowPattern {
    #[serde(rename = "type")]
    pub pattern_type: PatternType,
    pub velocity: f64,
    pub direction: Direction,
    pub complexity: f64,
    pub point_count: usize,
}

impl FlowPattern {
    pub fn analyze(sequence: &[Point2]) -> FlowPattern {
        let velocity = velocity(sequence);
        let complexity = complexity(sequence);
        FlowPattern {
            pattern_type: PatternType::classify(velocity, complexity),
            velocity,
            direction: direction(sequence),
            complexity,
            point_count: sequence.len(),
        }
    }
}

/// Output of the flow adapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowReading {
    pub flow_id: String,
    #[serde(rename = "type")]
    pub input_type: InputType,
    pub gesture: String,
    pub confidence: f64,
    pub pattern: FlowPattern,
    pub intent: String,
    pub parameters: Params,
    pub timestamp: DateTime<Utc>,
}

/// A processed flow kept for statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActiveFlow {
    pub id: String,
    pub gesture: String,
    pub confidence: f64,
    pub started_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowStats {
    pub total_flows: usize,
    pub registered_gestures: usize,
    /// Flows per recognized gesture
    pub gesture_distribution: BTreeMap<String, usize>,
}

/// Flow gesture adapter.
pub struct FlowAdapter {
    config: FlowConfig,
    templates: Arc<RwLock<BTreeMap<String, Vec<Point2>>>>,
    /// Tracked flows, oldest first
    flows: Arc<RwLock<VecDeque<ActiveFlow>>>,
}

impl FlowAdapter {
    /// Create with the tap, swipe and double-tap templates.
    pub fn new(config: FlowConfig) -> Self {
        let mut templates = BTreeMap::new();
        templates.insert("tap".to_string(), vec![Point2::new(0.0, 0.0)]);
        templates.insert(
            "swipe-right".to_string(),
            vec![Point2::new(0.0, 0.0), Point2::new(0.5, 0.0), Point2::new(1.0, 0.0)],
        );
        templates.insert(
            "swipe-left".to_string(),
            vec![Point2::new(1.0, 0.0), Point2::new(0.5, 0.0), Point2::new(0.0, 0.0)],
        );
        templates.insert(
            "double-tap".to_string(),
            vec![Point2::new(0.0, 0.0), Point2::new(0.0, 0.0)],
        );

        Self {
            config,
            templates: Arc::new(RwLock::new(templates)),
            flows: Arc::new(RwLock::new(VecDeque::new())),
        }
    }

    pub async fn register_gesture(&self, name: &str, template: Vec<Point2>) {
        self.templates.write().await.insert(name.to_string(), template);
        debug!(gesture = %name, "Registered flow gesture");
    }

    /// Process a flow input and record it as an active flow.
    pub async fn process(&self, input: &FlowInput) -> FlowReading {
        let flow_id = format!("flow_{}", uuid::Uuid::new_v4().simple());

        let gesture = self.detect(&input.sequence).await;
        let pattern = FlowPattern::analyze(&input.sequence);
        let intent = flow_intent(&gesture.name).to_string();

        let mut parameters = Params::new();
        parameters.insert("intensity".to_string(), input.intensity.unwrap_or(1.0).into());
        parameters.insert("duration".to_string(), input.duration.unwrap_or(0.0).into());
        parameters.insert("pressure".to_string(), input.pressure.unwrap_or(1.0).into());

        let now = Utc::now();
        {
            let mut flows = self.flows.write().await;
            flows.push_back(ActiveFlow {
                id: flow_id.clone(),
                gesture: gesture.name.clone(),
                confidence: gesture.confidence,
                started_at: now,
            });
            while flows.len() > self.config.max_active_flows {
                flows.pop_front();
            }
        }

        debug!(flow_id = %flow_id, gesture = %gesture.name, pattern = ?pattern.pattern_type, "Processed flow");

        FlowReading {
            flow_id,
            input_type: InputType::Flow,
            gesture: gesture.name,
            confidence: gesture.confidence,
            pattern,
            intent,
            parameters,
            timestamp: now,
        }
    }

    /// Best template at or above the gesture threshold, else `unknown`.
    pub async fn detect(&self, sequence: &[Point2]) -> FlowGesture {
        let templates = self.templates.read().await;
        let mut best = FlowGesture {
            name: "unknown".to_string(),
            confidence: 0.0,
        };

        for (name, template) in templates.iter() {
            let confidence = template_confidence(sequence, template, self.config.match_tolerance);
            if confidence > best.confidence && confidence >= self.config.gesture_threshold {
                best = FlowGesture {
                    name: name.clone(),
                    confidence,
                };
            }
        }

        best
    }

    /// Stop tracking a flow.
    pub async fn end_flow(&self, flow_id: &str) -> Option<ActiveFlow> {
        let mut flows = self.flows.write().await;
        let index = flows.iter().position(|f| f.id == flow_id)?;
        flows.remove(index)
    }

    /// Tracked flows, oldest first.
    pub async fn active_flows(&self) -> Vec<ActiveFlow> {
        self.flows.read().await.iter().cloned().collect()
    }

    pub async fn stats(&self) -> FlowStats {
        let flows = self.flows.read().await;
        let mut distribution = BTreeMap::new();
        for flow in flows.iter() {
            *distribution.entry(flow.gesture.clone()).or_insert(0) += 1;
        }

        FlowStats {
            total_flows: flows.len(),
            registered_gestures: self.templates.read().await.len(),
            gesture_distribution: distribution,
        }
    }
}

impl Default for FlowAdapter {
    fn default() -> Self {
        Self::new(FlowConfig::default())
    }
}

/// Fraction of positions where sequence and template agree, over the longer
/// of the two.
pub fn template_confidence(sequence: &[Point2], template: &[Point2], tolerance: f64) -> f64 {
    if sequence.is_empty() || template.is_empty() {
        return 0.0;
    }

    let matches = sequence
        .iter()
        .zip(template)
        .filter(|(a, b)| a.distance(b) < tolerance)
        .count();

    matches as f64 / sequence.len().max(template.len()) as f64
}

/// Mean distance between consecutive points.
pub fn velocity(sequence: &[Point2]) -> f64 {
    if sequence.len() < 2 {
        return 0.0;
    }
    let total: f64 = sequence.windows(2).map(|w| w[0].distance(&w[1])).sum();
    total / (sequence.len() - 1) as f64
}

pub fn direction(sequence: &[Point2]) -> Direction {
    match (sequence.first(), sequence.last()) {
        (Some(start), Some(end)) if sequence.len() >= 2 => {
            let (dx, dy) = (end.x - start.x, end.y - start.y);
            Direction {
                x: dx,
                y: dy,
                angle: dy.atan2(dx),
            }
        }
        _ => Direction::default(),
    }
}

/// Direction changes sharper than 45 degrees per point, capped at 1.
pub fn complexity(sequence: &[Point2]) -> f64 {
    if sequence.len() < 3 {
        return 0.0;
    }

    let angles: Vec<f64> = sequence
        .windows(2)
        .map(|w| (w[1].y - w[0].y).atan2(w[1].x - w[0].x))
        .collect();

    let changes = angles
        .windows(2)
        .filter(|w| {
            let mut diff = (w[1] - w[0]).abs();
            if diff > PI {
                diff = 2.0 * PI - diff;
            }
            diff > FRAC_PI_4
        })
        .count();

    (changes as f64 / sequence.len() as f64).min(1.0)
}

pub fn flow_intent(gesture: &str) -> &'static str {
    match gesture {
        "swipe-right" => "navigate-forward",
        "swipe-left" => "navigate-back",
        "tap" => "select",
        "double-tap" => "activate",
        "hold" => "context-menu",
        "pinch" => "zoom",
        "rotate" => "rotate",
        _ => "unknown",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seq(points: &[(f64, f64)]) -> Vec<Point2> {
        points.iter().map(|&(x, y)| Point2::new(x, y)).collect()
    }

    #[tokio::test]
    async fn test_swipe_right_scenario() {
        let flow = FlowAdapter::default();
        let reading = flow
            .process(&FlowInput::new(seq(&[(0.0, 0.0), (0.5, 0.0), (1.0, 0.0)])))
            .await;

        assert_eq!(reading.gesture, "swipe-right");
        assert_eq!(reading.confidence, 1.0);
        assert_eq!(reading.pattern.pattern_type, PatternType::Linear);
        assert_eq!(reading.intent, "navigate-forward");
        assert!((reading.pattern.velocity - 0.5).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_partial_match_below_threshold() {
        let flow = FlowAdapter::default();
        let gesture = flow.detect(&seq(&[(0.0, 0.0), (0.5, 0.5), (1.0, 1.0)])).await;
        assert_eq!(gesture.name, "unknown");
    }

    #[test]
    fn test_confidence_uses_longer_length() {
        let template = seq(&[(0.0, 0.0)]);
        let sequence = seq(&[(0.0, 0.0), (0.0, 0.0)]);
        assert_eq!(template_confidence(&sequence, &template, 0.1), 0.5);
        assert_eq!(template_confidence(&[], &template, 0.1), 0.0);
    }

    #[test]
    fn test_pattern_classes() {
        let still = FlowPattern::analyze(&seq(&[(0.0, 0.0), (0.01, 0.0)]));
        assert_eq!(still.pattern_type, PatternType::Static);

        let zigzag = FlowPattern::analyze(&seq(&[
            (0.0, 0.0),
            (1.0, 1.0),
            (2.0, 0.0),
            (3.0, 1.0),
            (4.0, 0.0),
        ]));
        // 3 turns of 90 degrees over 5 points
        assert!((zigzag.complexity - 0.6).abs() < 1e-9);
        assert_eq!(zigzag.pattern_type, PatternType::Complex);

        let empty = FlowPattern::analyze(&[]);
        assert_eq!(empty.pattern_type, PatternType::Static);
        assert_eq!(empty.point_count, 0);
    }

    #[test]
    fn test_angle_wraparound() {
        // Heading just above and just below the negative x axis
        let points = seq(&[(0.0, 0.0), (-1.0, 0.01), (-2.0, 0.0)]);
        assert_eq!(complexity(&points), 0.0);
    }

    #[tokio::test]
    async fn test_stats_distribution() {
        let flow = FlowAdapter::default();
        flow.process(&FlowInput::new(seq(&[(0.0, 0.0)]))).await;
        flow.process(&FlowInput::new(seq(&[(0.0, 0.0)]))).await;
        flow.process(&FlowInput::new(seq(&[(1.0, 0.0), (0.5, 0.0), (0.0, 0.0)]))).await;

        let stats = flow.stats().await;
        assert_eq!(stats.total_flows, 3);
        assert_eq!(stats.registered_gestures, 4);
        assert_eq!(stats.gesture_distribution["tap"], 2);
        assert_eq!(stats.gesture_distribution["swipe-left"], 1);
        assert_eq!(flow.active_flows().await.len(), 3);
    }

    #[tokio::test]
    async fn test_end_flow() {
        let flow = FlowAdapter::default();
        let reading = flow.process(&FlowInput::new(seq(&[(0.0, 0.0)]))).await;

        let ended = flow.end_flow(&reading.flow_id).await.unwrap();
        assert_eq!(ended.gesture, "tap");
        assert!(flow.active_flows().await.is_empty());
        assert!(flow.end_flow(&reading.flow_id).await.is_none());
    }

    #[tokio::test]
    async fn test_active_flows_bounded() {
        let flow = FlowAdapter::new(FlowConfig {
            max_active_flows: 5,
            ..Default::default()
        });

        let mut ids = Vec::new();
        for _ in 0..50 {
            ids.push(flow.process(&FlowInput::new(seq(&[(0.0, 0.0)]))).await.flow_id);
        }

        let active = flow.active_flows().await;
        assert_eq!(active.len(), 5);
        // Oldest evicted first
        let kept: Vec<&str> = active.iter().map(|f| f.id.as_str()).collect();
        let newest: Vec<&str> = ids[45..].iter().map(String::as_str).collect();
        assert_eq!(kept, newest);
        assert_eq!(flow.stats().await.total_flows, 5);
    }
}
