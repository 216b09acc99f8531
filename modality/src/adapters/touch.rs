//! Touch surface input.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{InputType, Point2, TouchInput};

/// Output of the touch adapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TouchReading {
    #[serde(rename = "type")]
    pub input_type: InputType,
    pub point: Point2,
    pub pressure: f64,
    pub duration: f64,
    pub touch_type: String,
    pub timestamp: DateTime<Utc>,
}

/// Touch adapter. Coordinates, pressure and duration pass through with
/// defaults filled in.
#[derive(Debug, Clone, Default)]
pub struct TouchAdapter;

impl TouchAdapter {
    pub fn new() -> Self {
        Self
    }

    pub fn process(&self, input: &TouchInput) -> TouchReading {
        TouchReading {
            input_type: InputType::Touch,
            point: input.point(),
            pressure: input.pressure.unwrap_or(1.0),
            duration: input.duration.unwrap_or(0.0),
            touch_type: input.touch_type.clone().unwrap_or_else(|| "tap".to_string()),
            timestamp: Utc::now(),
        }
    }
}
