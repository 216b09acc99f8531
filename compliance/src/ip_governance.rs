//! Intellectual property governance.
//!
//! Registers IP records, notarizes them once, and manages the license
//! lifecycle. The registry is append-only: records are never removed and
//! licenses only move from active to revoked.

use chrono::Utc;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::config::IpGovernanceConfig;
use crate::digest::digest_value;
use crate::notarization::NotarizationService;
use crate::types::{
    ComplianceError, IpCertificate, IpNotarization, IpRecord, IpRegistration, IpStatus, License,
    LicenseStatus, LicenseTemplate, LicenseTerms, LicenseVerification, NotarizationMetadata,
    OwnershipVerification, Result,
};

/// IP registry with licensing.
pub struct IpGovernance {
    /// Configuration
    config: IpGovernanceConfig,
    /// IP records by id
    ip_registry: Arc<RwLock<HashMap<String, IpRecord>>>,
    /// License types by name
    license_types: Arc<RwLock<HashMap<String, LicenseTemplate>>>,
    /// Notarization service shared with the rest of the compliance layer
    notary: Option<Arc<NotarizationService>>,
}

impl IpGovernance {
    /// Create with default configuration.
    pub fn new() -> Self {
        Self::with_config(IpGovernanceConfig::default())
    }

    /// Create with custom configuration. The default license types are
    /// registered immediately.
    pub fn with_config(config: IpGovernanceConfig) -> Self {
        Self {
            config,
            ip_registry: Arc::new(RwLock::new(HashMap::new())),
            license_types: Arc::new(RwLock::new(Self::default_license_types())),
            notary: None,
        }
    }

    /// Notarize IP records through a shared notarization service as well.
    pub fn with_notarization_service(mut self, notary: Arc<NotarizationService>) -> Self {
        self.notary = Some(notary);
        self
    }

    fn default_license_types() -> HashMap<String, LicenseTemplate> {
        let mut types = HashMap::new();
        types.insert(
            "standard".to_string(),
            LicenseTemplate {
                terms: LicenseTerms {
                    usage: "commercial".to_string(),
                    duration: "perpetual".to_string(),
                    transferable: false,
                    modifications: true,
                    exclusive: false,
                },
            },
        );
        types.insert(
            "exclusive".to_string(),
            LicenseTemplate {
                terms: LicenseTerms {
                    usage: "exclusive-commercial".to_string(),
                    duration: "perpetual".to_string(),
                    transferable: false,
                    modifications: true,
                    exclusive: true,
                },
            },
        );
        types.insert(
            "limited".to_string(),
            LicenseTemplate {
                terms: LicenseTerms {
                    usage: "non-commercial".to_string(),
                    duration: "limited".to_string(),
                    transferable: false,
                    modifications: false,
                    exclusive: false,
                },
            },
        );
        types
    }

    /// Register a piece of intellectual property.
    pub async fn register_ip(&self, ip: IpRegistration) -> Result<IpRecord> {
        if ip.id.is_empty() || ip.ip_type.is_empty() || ip.owner.is_empty() {
            return Err(ComplianceError::InvalidInput(
                "IP registration requires id, type and owner".to_string(),
            ));
        }

        let ip_id = ip.id.clone();
        let record = IpRecord {
            id: ip.id,
            ip_type: ip.ip_type,
            owner: ip.owner,
            attributes: ip.attributes,
            registered_at: Utc::now(),
            status: IpStatus::Registered,
            notarized: false,
            notarization: None,
            licenses: Vec::new(),
        };

        {
            let mut registry = self.ip_registry.write().await;
            if registry.contains_key(&ip_id) {
                return Err(ComplianceError::AlreadyExists(ip_id));
            }
            info!(ip_id = %ip_id, ip_type = %record.ip_type, "Registered IP");
            registry.insert(ip_id.clone(), record.clone());
        }

        if self.config.auto_notarize {
            return self.notarize_ip(&ip_id).await;
        }

        Ok(record)
    }

    /// Notarize an IP record. Already-notarized records are returned as-is.
    pub async fn notarize_ip(&self, ip_id: &str) -> Result<IpRecord> {
        let (canonical, owner) = {
            let registry = self.ip_registry.read().await;
            let record = registry
                .get(ip_id)
                .ok_or_else(|| ComplianceError::NotFound(format!("IP {}", ip_id)))?;

            if record.notarized {
                warn!(ip_id = %ip_id, "IP already notarized");
                return Ok(record.clone());
            }

            let canonical = json!({
                "id": record.id,
                "type": record.ip_type,
                "owner": record.owner,
                "registeredAt": record.registered_at.timestamp_millis(),
            });
            (canonical, record.owner.clone())
        };
        let hash = digest_value(&canonical);

        // Registry lock is not held across the notary call
        let notarization_id = match &self.notary {
            Some(notary) => {
                let n = notary
                    .notarize(&canonical, NotarizationMetadata::new("ip", owner))
                    .await?;
                Some(n.id)
            }
            None => None,
        };

        let mut registry = self.ip_registry.write().await;
        let record = registry
            .get_mut(ip_id)
            .ok_or_else(|| ComplianceError::NotFound(format!("IP {}", ip_id)))?;

        if record.notarized {
            warn!(ip_id = %ip_id, "IP notarized concurrently");
            return Ok(record.clone());
        }

        let now = Utc::now();
        record.notarization = Some(IpNotarization {
            ip_id: record.id.clone(),
            timestamp: now,
            hash,
            certificate: IpCertificate {
                certificate_id: format!("CERT_{}", uuid::Uuid::new_v4().simple()),
                ip_id: record.id.clone(),
                owner: record.owner.clone(),
                issued_at: now,
                issuer: self.config.certificate_issuer.clone(),
                certificate_type: "ip-notarization".to_string(),
            },
            notarization_id,
        });
        record.notarized = true;

        info!(ip_id = %ip_id, "Notarized IP");

        Ok(record.clone())
    }

    /// Check whether `claimed_owner` owns the IP.
    pub async fn verify_ownership(&self, ip_id: &str, claimed_owner: &str) -> OwnershipVerification {
        let registry = self.ip_registry.read().await;

        match registry.get(ip_id) {
            None => OwnershipVerification {
                valid: false,
                owner: None,
                notarized: false,
                reason: "IP not found".to_string(),
            },
            Some(record) => {
                let valid = record.owner == claimed_owner;
                OwnershipVerification {
                    valid,
                    owner: Some(record.owner.clone()),
                    notarized: record.notarized,
                    reason: if valid {
                        "Ownership verified".to_string()
                    } else {
                        "Ownership mismatch".to_string()
                    },
                }
            }
        }
    }

    /// Grant a license of a registered type.
    pub async fn grant_license(&self, ip_id: &str, licensee: &str, license_type: &str) -> Result<License> {
        let terms = {
            let types = self.license_types.read().await;
            types
                .get(license_type)
                .map(|t| t.terms.clone())
                .ok_or_else(|| {
                    ComplianceError::License(format!("License type not registered: {}", license_type))
                })?
        };

        let mut registry = self.ip_registry.write().await;
        let record = registry
            .get_mut(ip_id)
            .ok_or_else(|| ComplianceError::NotFound(format!("IP {}", ip_id)))?;

        let license = License {
            id: format!("LIC_{}", uuid::Uuid::new_v4().simple()),
            ip_id: ip_id.to_string(),
            licensee: licensee.to_string(),
            license_type: license_type.to_string(),
            granted_at: Utc::now(),
            terms,
            status: LicenseStatus::Active,
            revoked_at: None,
        };
        record.licenses.push(license.clone());

        info!(
            ip_id = %ip_id,
            licensee = %licensee,
            license_type = %license_type,
            license_id = %license.id,
            "Granted license"
        );

        Ok(license)
    }

    /// Whether `licensee` holds an active license on the IP.
    pub async fn verify_license(&self, ip_id: &str, licensee: &str) -> LicenseVerification {
        let registry = self.ip_registry.read().await;

        let Some(record) = registry.get(ip_id) else {
            return LicenseVerification {
                valid: false,
                license: None,
                reason: "IP not found".to_string(),
            };
        };

        let license = record
            .licenses
            .iter()
            .find(|l| l.licensee == licensee && l.is_active())
            .cloned();

        LicenseVerification {
            valid: license.is_some(),
            reason: if license.is_some() {
                "License valid".to_string()
            } else {
                "No active license found".to_string()
            },
            license,
        }
    }

    /// Revoke a license by id. License ids are unique across the whole
    /// registry, so every record is searched.
    pub async fn revoke_license(&self, license_id: &str) -> Result<License> {
        let mut registry = self.ip_registry.write().await;

        let license = registry
            .values_mut()
            .flat_map(|record| record.licenses.iter_mut())
            .find(|l| l.id == license_id)
            .ok_or_else(|| ComplianceError::NotFound(format!("License {}", license_id)))?;

        license.revoke()?;

        info!(license_id = %license_id, ip_id = %license.ip_id, "Revoked license");

        Ok(license.clone())
    }

    /// Register a custom license type.
    pub async fn register_license_type(&self, name: &str, template: LicenseTemplate) {
        let mut types = self.license_types.write().await;
        types.insert(name.to_string(), template);
        debug!(license_type = %name, "Registered license type");
    }

    /// Get an IP record.
    pub async fn get_ip(&self, ip_id: &str) -> Option<IpRecord> {
        let registry = self.ip_registry.read().await;
        registry.get(ip_id).cloned()
    }

    /// All IP records, in no particular order.
    pub async fn all_ip(&self) -> Vec<IpRecord> {
        let registry = self.ip_registry.read().await;
        registry.values().cloned().collect()
    }

    /// Get statistics.
    pub async fn stats(&self) -> IpStats {
        let registry = self.ip_registry.read().await;
        let types = self.license_types.read().await;

        let total_ip = registry.len();
        let notarized = registry.values().filter(|r| r.notarized).count();
        let total_licenses = registry.values().map(|r| r.licenses.len()).sum();

        IpStats {
            total_ip,
            notarized,
            notarization_rate: if total_ip > 0 {
                notarized as f32 / total_ip as f32
            } else {
                0.0
            },
            total_licenses,
            license_types: types.len(),
        }
    }
}

impl Default for IpGovernance {
    fn default() -> Self {
        Self::new()
    }
}

/// Statistics about the IP registry.
#[derive(Debug, Clone)]
pub struct IpStats {
    /// Registered records
    pub total_ip: usize,
    /// Notarized records
    pub notarized: usize,
    /// Fraction notarized
    pub notarization_rate: f32,
    /// Licenses granted (including revoked)
    pub total_licenses: usize,
    /// Registered license types
    pub license_types: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manual() -> IpGovernance {
        IpGovernance::with_config(IpGovernanceConfig {
            auto_notarize: false,
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn test_register_requires_fields() {
        let ip = IpGovernance::new();
        let result = ip.register_ip(IpRegistration::new("ip1", "", "acct-1")).await;
        assert!(matches!(result, Err(ComplianceError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_auto_notarize_and_ownership() {
        let notary = Arc::new(NotarizationService::new());
        let ip = IpGovernance::new().with_notarization_service(Arc::clone(&notary));

        let record = ip
            .register_ip(IpRegistration::new("ip1", "logo", "acct-1"))
            .await
            .unwrap();
        assert!(record.notarized);

        let check = ip.verify_ownership("ip1", "acct-1").await;
        assert!(check.valid);
        assert!(check.notarized);

        let check = ip.verify_ownership("ip1", "acct-2").await;
        assert!(!check.valid);

        let block = record.notarization.unwrap();
        let stored = notary
            .get_notarization(block.notarization_id.as_deref().unwrap())
            .await
            .unwrap();
        assert_eq!(stored.proof.hash, block.hash);
    }

    #[tokio::test]
    async fn test_notarize_is_idempotent() {
        let ip = manual();
        ip.register_ip(IpRegistration::new("ip1", "song", "acct-1"))
            .await
            .unwrap();

        let first = ip.notarize_ip("ip1").await.unwrap();
        let second = ip.notarize_ip("ip1").await.unwrap();

        assert!(first.notarized && second.notarized);
        let (a, b) = (first.notarization.unwrap(), second.notarization.unwrap());
        assert_eq!(a.certificate.certificate_id, b.certificate.certificate_id);
        assert_eq!(a.hash, b.hash);
    }

    #[tokio::test]
    async fn test_concurrent_notarize_keeps_one_certificate() {
        let notary = Arc::new(NotarizationService::new());
        let ip = IpGovernance::with_config(IpGovernanceConfig {
            auto_notarize: false,
            ..Default::default()
        })
        .with_notarization_service(Arc::clone(&notary));
        ip.register_ip(IpRegistration::new("ip1", "song", "acct-1"))
            .await
            .unwrap();

        let (a, b, during) = tokio::join!(ip.notarize_ip("ip1"), ip.notarize_ip("ip1"), ip.get_ip("ip1"));
        assert!(during.is_some());

        let (a, b) = (a.unwrap().notarization.unwrap(), b.unwrap().notarization.unwrap());
        assert_eq!(a.certificate.certificate_id, b.certificate.certificate_id);

        let stored = ip.get_ip("ip1").await.unwrap().notarization.unwrap();
        assert_eq!(stored.certificate.certificate_id, a.certificate.certificate_id);
        assert_eq!(stored.hash, a.hash);
    }

    #[tokio::test]
    async fn test_duplicate_registration_rejected() {
        let ip = manual();
        ip.register_ip(IpRegistration::new("ip1", "song", "acct-1"))
            .await
            .unwrap();
        let again = ip.register_ip(IpRegistration::new("ip1", "song", "acct-2")).await;
        assert!(matches!(again, Err(ComplianceError::AlreadyExists(_))));
        assert_eq!(ip.get_ip("ip1").await.unwrap().owner, "acct-1");
    }

    #[tokio::test]
    async fn test_license_lifecycle() {
        let ip = manual();
        ip.register_ip(IpRegistration::new("ip1", "song", "acct-1"))
            .await
            .unwrap();

        let license = ip.grant_license("ip1", "label-9", "exclusive").await.unwrap();
        assert!(license.terms.exclusive);
        assert!(ip.verify_license("ip1", "label-9").await.valid);
        assert!(!ip.verify_license("ip1", "someone-else").await.valid);

        let revoked = ip.revoke_license(&license.id).await.unwrap();
        assert_eq!(revoked.status, LicenseStatus::Revoked);
        assert!(revoked.revoked_at.is_some());
        assert!(!ip.verify_license("ip1", "label-9").await.valid);

        // One-way
        assert!(matches!(
            ip.revoke_license(&license.id).await,
            Err(ComplianceError::License(_))
        ));

        // History is kept
        assert_eq!(ip.get_ip("ip1").await.unwrap().licenses.len(), 1);
    }

    #[tokio::test]
    async fn test_license_errors() {
        let ip = manual();
        ip.register_ip(IpRegistration::new("ip1", "song", "acct-1"))
            .await
            .unwrap();

        assert!(matches!(
            ip.grant_license("ip1", "x", "bespoke").await,
            Err(ComplianceError::License(_))
        ));
        assert!(matches!(
            ip.grant_license("nope", "x", "standard").await,
            Err(ComplianceError::NotFound(_))
        ));
        assert!(matches!(
            ip.revoke_license("LIC_missing").await,
            Err(ComplianceError::NotFound(_))
        ));

        ip.register_license_type(
            "bespoke",
            LicenseTemplate {
                terms: LicenseTerms {
                    usage: "broadcast".to_string(),
                    duration: "one-year".to_string(),
                    transferable: true,
                    modifications: false,
                    exclusive: false,
                },
            },
        )
        .await;
        tokio_test::assert_ok!(ip.grant_license("ip1", "x", "bespoke").await);
    }

    #[tokio::test]
    async fn test_stats() {
        let ip = IpGovernance::new();
        ip.register_ip(IpRegistration::new("a", "logo", "o")).await.unwrap();
        ip.register_ip(IpRegistration::new("b", "logo", "o")).await.unwrap();
        ip.grant_license("a", "l", "standard").await.unwrap();

        let stats = ip.stats().await;
        assert_eq!(stats.total_ip, 2);
        assert_eq!(stats.notarized, 2);
        assert_eq!(stats.total_licenses, 1);
        assert_eq!(stats.license_types, 3);
    }
}
