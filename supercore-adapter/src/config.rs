//! Configuration for the SuperCore boundary.

use serde::{Deserialize, Serialize};

/// Connection settings for the SuperCore service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SuperCoreConfig {
    /// Base URL, without trailing slash
    pub base_url: String,
    /// Sent as a bearer token when set
    pub api_key: Option<String>,
    /// Per-request timeout
    pub timeout_ms: u64,
}

impl Default for SuperCoreConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            api_key: None,
            timeout_ms: 5000,
        }
    }
}

impl SuperCoreConfig {
    /// Config pointing at `base_url` with defaults otherwise.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Load config from YAML.
    pub fn from_yaml(yaml: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(yaml)
    }

    /// Serialize to YAML.
    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }
}
