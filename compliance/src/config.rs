//! Configuration for the compliance layer.

use serde::{Deserialize, Serialize};

/// Configuration for all compliance services.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ComplianceConfig {
    /// IP governance configuration
    #[serde(default)]
    pub ip: IpGovernanceConfig,
    /// Notarization configuration
    #[serde(default)]
    pub notarization: NotarizationConfig,
    /// Asset verifier configuration
    #[serde(default)]
    pub assets: AssetVerifierConfig,
}

impl ComplianceConfig {
    /// Load config from YAML.
    pub fn from_yaml(yaml: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(yaml)
    }

    /// Serialize to YAML.
    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }
}

/// IP governance configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IpGovernanceConfig {
    /// Notarize every record immediately after registration
    pub auto_notarize: bool,
    /// Issuer written into IP certificates
    pub certificate_issuer: String,
}

impl Default for IpGovernanceConfig {
    fn default() -> Self {
        Self {
            auto_notarize: true,
            certificate_issuer: "SuperCore".to_string(),
        }
    }
}

/// Notarization configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotarizationConfig {
    /// Authority stamped on every proof
    pub timestamp_authority: String,
    /// Forward notarizations to the ledger collaborator
    pub enable_ledger: bool,
}

impl Default for NotarizationConfig {
    fn default() -> Self {
        Self {
            timestamp_authority: "SuperCore".to_string(),
            enable_ledger: false,
        }
    }
}

/// Asset verifier configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetVerifierConfig {
    /// Location of the canonical asset document
    pub canon_config_path: String,
}

impl Default for AssetVerifierConfig {
    fn default() -> Self {
        Self {
            canon_config_path: "canon-verifier/config/canon_assets.json".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ComplianceConfig::default();
        assert!(config.ip.auto_notarize);
        assert!(!config.notarization.enable_ledger);
        assert_eq!(config.notarization.timestamp_authority, "SuperCore");
    }

    #[test]
    fn test_partial_yaml() {
        let yaml = "notarization:\n  timestamp_authority: test-authority\n  enable_ledger: true\n";
        let config = ComplianceConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.notarization.timestamp_authority, "test-authority");
        assert!(config.notarization.enable_ledger);
        assert!(config.ip.auto_notarize);
    }
}
