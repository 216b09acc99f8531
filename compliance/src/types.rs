//! Core types for the compliance layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Open key-value attributes carried alongside records.
pub type Attributes = BTreeMap<String, Value>;

/// Error types for compliance operations.
#[derive(Debug, thiserror::Error)]
pub enum ComplianceError {
    /// Request was structurally invalid
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Unknown IP, license or notarization id
    #[error("Not found: {0}")]
    NotFound(String),

    /// Record with the same id already registered
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// License type unregistered or license not active
    #[error("License error: {0}")]
    License(String),

    /// Operation attempted on a revoked notarization
    #[error("Notarization revoked: {0}")]
    Revoked(String),

    /// Ledger collaborator rejected or could not take a submission
    #[error("Ledger error: {0}")]
    Ledger(String),

    /// Filesystem error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed JSON document
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, ComplianceError>;

// ============================================================================
// Intellectual property
// ============================================================================

/// Registration request for a piece of intellectual property.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IpRegistration {
    pub id: String,
    #[serde(rename = "type")]
    pub ip_type: String,
    pub owner: String,
    /// Any further descriptive fields supplied by the caller
    #[serde(flatten)]
    pub attributes: Attributes,
}

impl IpRegistration {
    /// Create a registration with no extra attributes.
    pub fn new(id: impl Into<String>, ip_type: impl Into<String>, owner: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ip_type: ip_type.into(),
            owner: owner.into(),
            attributes: Attributes::new(),
        }
    }

    /// Add a descriptive attribute.
    pub fn with_attribute(mut self, key: &str, value: impl Serialize) -> Self {
        self.attributes.insert(
            key.to_string(),
            serde_json::to_value(value).unwrap_or_default(),
        );
        self
    }
}

/// Lifecycle status of an IP record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IpStatus {
    Registered,
}

/// A registered piece of intellectual property.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IpRecord {
    pub id: String,
    #[serde(rename = "type")]
    pub ip_type: String,
    pub owner: String,
    pub attributes: Attributes,
    pub registered_at: DateTime<Utc>,
    pub status: IpStatus,
    /// Flips to true exactly once
    pub notarized: bool,
    pub notarization: Option<IpNotarization>,
    /// Append-only license history
    pub licenses: Vec<License>,
}

/// Notarization block attached to an IP record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IpNotarization {
    pub ip_id: String,
    pub timestamp: DateTime<Utc>,
    /// Digest of the canonical registration fields
    pub hash: String,
    pub certificate: IpCertificate,
    /// Id in the notarization service, when one is attached
    pub notarization_id: Option<String>,
}

/// Certificate issued when an IP record is notarized.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IpCertificate {
    pub certificate_id: String,
    pub ip_id: String,
    pub owner: String,
    pub issued_at: DateTime<Utc>,
    pub issuer: String,
    #[serde(rename = "type")]
    pub certificate_type: String,
}

/// Result of an ownership check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OwnershipVerification {
    pub valid: bool,
    pub owner: Option<String>,
    pub notarized: bool,
    pub reason: String,
}

// ============================================================================
// Licensing
// ============================================================================

/// License lifecycle. `Active -> Revoked` is the only permitted transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LicenseStatus {
    Active,
    Revoked,
}

impl LicenseStatus {
    /// Validate a transition to `next`.
    pub fn transition(self, next: LicenseStatus) -> Result<LicenseStatus> {
        match (self, next) {
            (LicenseStatus::Active, LicenseStatus::Revoked) => Ok(next),
            (from, to) => Err(ComplianceError::License(format!(
                "illegal license transition {:?} -> {:?}",
                from, to
            ))),
        }
    }
}

/// Terms attached to a license type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LicenseTerms {
    pub usage: String,
    pub duration: String,
    pub transferable: bool,
    pub modifications: bool,
    #[serde(default)]
    pub exclusive: bool,
}

/// A registered license type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LicenseTemplate {
    pub terms: LicenseTerms,
}

/// A license granted on an IP record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct License {
    pub id: String,
    pub ip_id: String,
    pub licensee: String,
    #[serde(rename = "type")]
    pub license_type: String,
    pub granted_at: DateTime<Utc>,
    pub terms: LicenseTerms,
    pub status: LicenseStatus,
    pub revoked_at: Option<DateTime<Utc>>,
}

impl License {
    /// Whether this license currently grants rights.
    pub fn is_active(&self) -> bool {
        self.status == LicenseStatus::Active
    }

    /// Revoke the license. Fails if it is already revoked.
    pub fn revoke(&mut self) -> Result<()> {
        self.status = self.status.transition(LicenseStatus::Revoked)?;
        self.revoked_at = Some(Utc::now());
        Ok(())
    }
}

/// Result of a license check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LicenseVerification {
    pub valid: bool,
    pub license: Option<License>,
    pub reason: String,
}

// ============================================================================
// Notarization
// ============================================================================

/// Proof that specific data existed in a specific form at a specific time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proof {
    /// SHA-256 digest of the notarized data
    pub hash: String,
    pub timestamp: DateTime<Utc>,
    /// Digest over hash, timestamp and authority
    pub signature: String,
    pub algorithm: String,
}

/// Caller-supplied metadata for a notarization.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotarizationMetadata {
    #[serde(default = "default_data_type")]
    pub data_type: String,
    #[serde(default = "default_owner")]
    pub owner: String,
    #[serde(flatten)]
    pub extra: Attributes,
}

fn default_data_type() -> String {
    "generic".to_string()
}

fn default_owner() -> String {
    "unknown".to_string()
}

impl Default for NotarizationMetadata {
    fn default() -> Self {
        Self {
            data_type: default_data_type(),
            owner: default_owner(),
            extra: Attributes::new(),
        }
    }
}

impl NotarizationMetadata {
    /// Metadata with a data type and owner.
    pub fn new(data_type: impl Into<String>, owner: impl Into<String>) -> Self {
        Self {
            data_type: data_type.into(),
            owner: owner.into(),
            extra: Attributes::new(),
        }
    }
}

/// A notarization record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notarization {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub authority: String,
    pub proof: Proof,
    pub metadata: NotarizationMetadata,
    /// False only after revocation
    pub verified: bool,
    pub revoked: bool,
    pub revoked_at: Option<DateTime<Utc>>,
    pub revocation_reason: Option<String>,
    /// Confirmed by the ledger collaborator
    pub blockchain: bool,
    pub blockchain_tx: Option<String>,
}

impl Notarization {
    /// Revoke this notarization. One-way; a second call fails.
    pub fn revoke(&mut self, reason: impl Into<String>) -> Result<()> {
        if self.revoked {
            return Err(ComplianceError::Revoked(self.id.clone()));
        }
        self.verified = false;
        self.revoked = true;
        self.revoked_at = Some(Utc::now());
        self.revocation_reason = Some(reason.into());
        Ok(())
    }
}

/// Result of verifying a notarization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotarizationVerification {
    pub valid: bool,
    pub notarization: Notarization,
    pub reason: String,
}

/// One item of a batch notarization request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchItem {
    pub data: Value,
    #[serde(default)]
    pub metadata: NotarizationMetadata,
}

/// Per-item outcome of a batch notarization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchOutcome {
    pub success: bool,
    pub notarization: Option<Notarization>,
    pub error: Option<String>,
}

/// Certificate for a notarization.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotarizationCertificate {
    pub certificate_id: String,
    pub notarization_id: String,
    pub issued_at: DateTime<Utc>,
    pub issuer: String,
    pub notarization: Notarization,
    pub validity: String,
    #[serde(rename = "type")]
    pub certificate_type: String,
}
