//! Configuration for input handling.

use serde::{Deserialize, Serialize};

/// Configuration for the input orchestrator and its adapters.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModalityConfig {
    /// Normalizer configuration
    #[serde(default)]
    pub normalizer: NormalizerConfig,
    /// Voice adapter configuration
    #[serde(default)]
    pub voice: VoiceConfig,
    /// Spatial adapter configuration
    #[serde(default)]
    pub spatial: SpatialConfig,
    /// Flow adapter configuration
    #[serde(default)]
    pub flow: FlowConfig,
}

impl ModalityConfig {
    /// Load config from YAML.
    pub fn from_yaml(yaml: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(yaml)
    }

    /// Serialize to YAML.
    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }
}

/// Normalizer configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizerConfig {
    /// Reject normalized payloads missing intent, action or parameters
    pub validation_enabled: bool,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            validation_enabled: true,
        }
    }
}

/// Voice adapter configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoiceConfig {
    /// Language reported when the input carries none
    pub language: String,
    /// Recognition confidence below this is logged
    pub confidence_threshold: f64,
    /// Minimum pattern match score for a command
    pub command_threshold: f64,
    /// Extract numbers and names from transcripts
    pub enable_nlu: bool,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            language: "en-US".to_string(),
            confidence_threshold: 0.7,
            command_threshold: 0.5,
            enable_nlu: true,
        }
    }
}

/// Spatial adapter configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpatialConfig {
    pub coordinate_system: String,
    /// Minimum recognizer confidence for a gesture
    pub gesture_threshold: f64,
    /// Tracking rate (Hz)
    pub tracking_rate: u32,
}

impl Default for SpatialConfig {
    fn default() -> Self {
        Self {
            coordinate_system: "right-handed".to_string(),
            gesture_threshold: 0.6,
            tracking_rate: 60,
        }
    }
}

/// Flow adapter configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowConfig {
    /// Minimum template match ratio for a gesture
    pub gesture_threshold: f64,
    /// Points closer than this are considered equal
    pub match_tolerance: f64,
    /// Active flows kept before the oldest is evicted
    #[serde(default = "default_max_active_flows")]
    pub max_active_flows: usize,
}

fn default_max_active_flows() -> usize {
    1000
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            gesture_threshold: 0.7,
            match_tolerance: 0.1,
            max_active_flows: default_max_active_flows(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ModalityConfig::default();
        assert!(config.normalizer.validation_enabled);
        assert_eq!(config.voice.command_threshold, 0.5);
        assert_eq!(config.spatial.gesture_threshold, 0.6);
        assert_eq!(config.flow.gesture_threshold, 0.7);
        assert_eq!(config.flow.max_active_flows, 1000);
    }

    #[test]
    fn test_flow_bound_defaults_when_omitted() {
        let config = ModalityConfig::from_yaml("flow:\n  gesture_threshold: 0.8\n  match_tolerance: 0.2\n").unwrap();
        assert_eq!(config.flow.max_active_flows, 1000);
    }

    #[test]
    fn test_yaml_roundtrip_keeps_overrides() {
        let yaml = "voice:\n  language: fr-FR\n  confidence_threshold: 0.5\n  command_threshold: 0.4\n  enable_nlu: false\n";
        let config = ModalityConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.voice.language, "fr-FR");
        assert!(!config.voice.enable_nlu);
        assert_eq!(config.flow.match_tolerance, 0.1);

        let back = ModalityConfig::from_yaml(&config.to_yaml().unwrap()).unwrap();
        assert_eq!(back.voice.command_threshold, 0.4);
    }
}
