//! Notarization service.
//!
//! Produces timestamped, digest-backed proofs for arbitrary JSON data and
//! verifies data against them later. Records are never deleted; revocation
//! is the only mutation and it is one-way.

use chrono::Utc;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::config::NotarizationConfig;
use crate::digest::{canonical_json, compute_hash, digest_value};
use crate::ledger::LedgerClient;
use crate::types::{
    BatchItem, BatchOutcome, ComplianceError, Notarization, NotarizationCertificate,
    NotarizationMetadata, NotarizationVerification, Proof, Result,
};

/// Digest algorithm recorded on every proof.
pub const PROOF_ALGORITHM: &str = "SHA-256";

/// A stored notarization and the digest captured at notarization time.
#[derive(Debug, Clone)]
struct NotarizationRecord {
    notarization: Notarization,
    data_digest: String,
}

/// Service for notarizing and verifying data.
pub struct NotarizationService {
    /// Configuration
    config: NotarizationConfig,
    /// Notarizations by id
    registry: Arc<RwLock<HashMap<String, NotarizationRecord>>>,
    /// Optional ledger collaborator
    ledger: Option<Arc<dyn LedgerClient>>,
}

impl NotarizationService {
    /// Create a service with default configuration.
    pub fn new() -> Self {
        Self::with_config(NotarizationConfig::default())
    }

    /// Create with custom configuration.
    pub fn with_config(config: NotarizationConfig) -> Self {
        Self {
            config,
            registry: Arc::new(RwLock::new(HashMap::new())),
            ledger: None,
        }
    }

    /// Attach a ledger collaborator.
    pub fn with_ledger(mut self, ledger: Arc<dyn LedgerClient>) -> Self {
        self.ledger = Some(ledger);
        self
    }

    /// Authority stamped on proofs.
    pub fn authority(&self) -> &str {
        &self.config.timestamp_authority
    }

    /// Notarize data.
    pub async fn notarize(&self, data: &Value, metadata: NotarizationMetadata) -> Result<Notarization> {
        if data.is_null() {
            return Err(ComplianceError::InvalidInput(
                "Nothing to notarize: data is null".to_string(),
            ));
        }

        let id = format!("not_{}", uuid::Uuid::new_v4().simple());
        let data_digest = digest_value(data);
        let proof = self.generate_proof(&data_digest);

        let notarization = Notarization {
            id: id.clone(),
            timestamp: proof.timestamp,
            authority: self.config.timestamp_authority.clone(),
            proof,
            metadata,
            verified: true,
            revoked: false,
            revoked_at: None,
            revocation_reason: None,
            blockchain: false,
            blockchain_tx: None,
        };

        {
            let mut registry = self.registry.write().await;
            registry.insert(
                id.clone(),
                NotarizationRecord {
                    notarization: notarization.clone(),
                    data_digest,
                },
            );
        }

        info!(
            notarization_id = %id,
            data_type = %notarization.metadata.data_type,
            "Notarized data"
        );

        if self.config.enable_ledger {
            self.submit_to_ledger(&notarization);
        }

        Ok(notarization)
    }

    /// Hand a notarization to the ledger without waiting for the result.
    fn submit_to_ledger(&self, notarization: &Notarization) {
        let Some(ledger) = self.ledger.clone() else {
            warn!(
                notarization_id = %notarization.id,
                "Ledger enabled but no ledger client attached"
            );
            return;
        };

        let registry = Arc::clone(&self.registry);
        let notarization = notarization.clone();

        tokio::spawn(async move {
            match ledger.submit(&notarization).await {
                Ok(tx) => {
                    let mut registry = registry.write().await;
                    if let Some(record) = registry.get_mut(&notarization.id) {
                        record.notarization.blockchain = true;
                        record.notarization.blockchain_tx = Some(tx.clone());
                    }
                    info!(
                        notarization_id = %notarization.id,
                        ledger = ledger.name(),
                        tx = %tx,
                        "Notarization anchored on ledger"
                    );
                }
                Err(e) => {
                    warn!(
                        notarization_id = %notarization.id,
                        ledger = ledger.name(),
                        error = %e,
                        "Ledger submission failed"
                    );
                }
            }
        });
    }

    /// Verify a notarization, optionally against the data it should cover.
    ///
    /// Without data only the record's existence and revocation state are
    /// checked. A revoked notarization never verifies.
    pub async fn verify(&self, notarization_id: &str, data: Option<&Value>) -> Result<NotarizationVerification> {
        let registry = self.registry.read().await;
        let record = registry
            .get(notarization_id)
            .ok_or_else(|| ComplianceError::NotFound(notarization_id.to_string()))?;

        let (valid, reason) = if record.notarization.revoked {
            (false, "Notarization revoked".to_string())
        } else {
            match data {
                Some(data) if digest_value(data) != record.data_digest => {
                    (false, "Data mismatch".to_string())
                }
                _ => (record.notarization.verified, "Notarization verified".to_string()),
            }
        };

        debug!(notarization_id = %notarization_id, valid, "Verified notarization");

        Ok(NotarizationVerification {
            valid,
            notarization: record.notarization.clone(),
            reason,
        })
    }

    /// Revoke a notarization.
    pub async fn revoke(&self, notarization_id: &str, reason: &str) -> Result<Notarization> {
        let mut registry = self.registry.write().await;
        let record = registry
            .get_mut(notarization_id)
            .ok_or_else(|| ComplianceError::NotFound(notarization_id.to_string()))?;

        record.notarization.revoke(reason)?;

        info!(notarization_id = %notarization_id, reason = %reason, "Revoked notarization");

        Ok(record.notarization.clone())
    }

    /// Notarize several items. Each item succeeds or fails on its own.
    pub async fn notarize_batch(&self, items: Vec<BatchItem>) -> Vec<BatchOutcome> {
        let total = items.len();
        let mut results = Vec::with_capacity(total);

        for item in items {
            match self.notarize(&item.data, item.metadata).await {
                Ok(notarization) => results.push(BatchOutcome {
                    success: true,
                    notarization: Some(notarization),
                    error: None,
                }),
                Err(e) => {
                    warn!(error = %e, "Batch item failed to notarize");
                    results.push(BatchOutcome {
                        success: false,
                        notarization: None,
                        error: Some(e.to_string()),
                    });
                }
            }
        }

        let successful = results.iter().filter(|r| r.success).count();
        info!(successful, total, "Batch notarization complete");

        results
    }

    /// Issue a certificate for an unrevoked notarization.
    pub async fn generate_certificate(&self, notarization_id: &str) -> Result<NotarizationCertificate> {
        let registry = self.registry.read().await;
        let record = registry
            .get(notarization_id)
            .ok_or_else(|| ComplianceError::NotFound(notarization_id.to_string()))?;

        if record.notarization.revoked {
            return Err(ComplianceError::Revoked(notarization_id.to_string()));
        }

        Ok(NotarizationCertificate {
            certificate_id: format!("CERT_{}", notarization_id),
            notarization_id: notarization_id.to_string(),
            issued_at: Utc::now(),
            issuer: self.config.timestamp_authority.clone(),
            notarization: record.notarization.clone(),
            validity: "perpetual".to_string(),
            certificate_type: "notarization-certificate".to_string(),
        })
    }

    /// Get a notarization by id.
    pub async fn get_notarization(&self, notarization_id: &str) -> Option<Notarization> {
        let registry = self.registry.read().await;
        registry.get(notarization_id).map(|r| r.notarization.clone())
    }

    /// All notarizations, in no particular order.
    pub async fn all_notarizations(&self) -> Vec<Notarization> {
        let registry = self.registry.read().await;
        registry.values().map(|r| r.notarization.clone()).collect()
    }

    /// Check that a proof's signature matches its contents.
    pub fn verify_signature(&self, proof: &Proof) -> bool {
        sign(&proof.hash, proof.timestamp.timestamp_millis(), &self.config.timestamp_authority)
            == proof.signature
    }

    /// Get statistics.
    pub async fn stats(&self) -> NotarizationStats {
        let registry = self.registry.read().await;

        let total = registry.len();
        let verified = registry.values().filter(|r| r.notarization.verified).count();
        let ledger_submitted = registry.values().filter(|r| r.notarization.blockchain).count();

        NotarizationStats {
            total_notarizations: total,
            verified,
            revoked: total - verified,
            ledger_submitted,
        }
    }

    fn generate_proof(&self, data_digest: &str) -> Proof {
        let timestamp = Utc::now();
        let signature = sign(
            data_digest,
            timestamp.timestamp_millis(),
            &self.config.timestamp_authority,
        );

        Proof {
            hash: data_digest.to_string(),
            timestamp,
            signature,
            algorithm: PROOF_ALGORITHM.to_string(),
        }
    }
}

impl Default for NotarizationService {
    fn default() -> Self {
        Self::new()
    }
}

/// Digest over the proof payload.
fn sign(data_digest: &str, timestamp_ms: i64, authority: &str) -> String {
    let payload = json!({
        "authority": authority,
        "data": data_digest,
        "timestamp": timestamp_ms,
    });
    compute_hash(canonical_json(&payload).as_bytes())
}

/// Statistics for the notarization service.
#[derive(Debug, Clone)]
pub struct NotarizationStats {
    /// Total notarizations
    pub total_notarizations: usize,
    /// Still verified
    pub verified: usize,
    /// Revoked
    pub revoked: usize,
    /// Confirmed by the ledger
    pub ledger_submitted: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use tokio::sync::mpsc;

    struct ChannelLedger {
        tx: mpsc::UnboundedSender<String>,
    }

    #[async_trait]
    impl LedgerClient for ChannelLedger {
        fn name(&self) -> &str {
            "channel"
        }

        async fn submit(&self, notarization: &Notarization) -> Result<String> {
            self.tx
                .send(notarization.id.clone())
                .map_err(|e| ComplianceError::Ledger(e.to_string()))?;
            Ok("0xabc".to_string())
        }
    }

    fn artwork() -> Value {
        json!({ "title": "Sunrise", "frames": 24, "artist": "acct-1" })
    }

    #[tokio::test]
    async fn test_notarize_and_verify() {
        let service = NotarizationService::new();
        let n = service
            .notarize(&artwork(), NotarizationMetadata::new("artwork", "acct-1"))
            .await
            .unwrap();

        assert!(n.verified);
        assert_eq!(n.proof.hash, digest_value(&artwork()));
        assert_eq!(n.proof.algorithm, PROOF_ALGORITHM);
        assert!(service.verify_signature(&n.proof));

        let result = service.verify(&n.id, Some(&artwork())).await.unwrap();
        assert!(result.valid);

        let result = service.verify(&n.id, None).await.unwrap();
        assert!(result.valid);
    }

    #[tokio::test]
    async fn test_single_byte_mutation_fails_verification() {
        let service = NotarizationService::new();
        let n = service
            .notarize(&json!("contract text v1"), NotarizationMetadata::default())
            .await
            .unwrap();

        let result = service.verify(&n.id, Some(&json!("contract text v2"))).await.unwrap();
        assert!(!result.valid);
        assert_eq!(result.reason, "Data mismatch");

        // Mismatch is reported, never repaired
        let result = service.verify(&n.id, Some(&json!("contract text v1"))).await.unwrap();
        assert!(result.valid);
    }

    #[tokio::test]
    async fn test_object_does_not_verify_against_its_string_encoding() {
        let service = NotarizationService::new();
        let transfer = json!({ "amount": 100, "to": "acct-1" });
        let n = service
            .notarize(&transfer, NotarizationMetadata::default())
            .await
            .unwrap();

        let encoded = json!(r#"{"amount":100,"to":"acct-1"}"#);
        let result = service.verify(&n.id, Some(&encoded)).await.unwrap();
        assert!(!result.valid);
        assert_eq!(result.reason, "Data mismatch");

        assert!(service.verify(&n.id, Some(&transfer)).await.unwrap().valid);
    }

    #[tokio::test]
    async fn test_revocation_is_monotonic() {
        let service = NotarizationService::new();
        let n = service
            .notarize(&artwork(), NotarizationMetadata::default())
            .await
            .unwrap();

        let revoked = service.revoke(&n.id, "disputed").await.unwrap();
        assert!(!revoked.verified);
        assert!(revoked.revoked);
        assert_eq!(revoked.revocation_reason.as_deref(), Some("disputed"));

        let result = service.verify(&n.id, Some(&artwork())).await.unwrap();
        assert!(!result.valid);
        let result = service.verify(&n.id, None).await.unwrap();
        assert!(!result.valid);

        assert!(matches!(
            service.revoke(&n.id, "again").await,
            Err(ComplianceError::Revoked(_))
        ));
        assert!(service.generate_certificate(&n.id).await.is_err());
    }

    #[tokio::test]
    async fn test_unknown_notarization() {
        let service = NotarizationService::new();
        assert!(matches!(
            service.verify("missing", None).await,
            Err(ComplianceError::NotFound(_))
        ));
        assert!(matches!(
            service.revoke("missing", "x").await,
            Err(ComplianceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_batch_isolates_failures() {
        let service = NotarizationService::new();
        let items = vec![
            BatchItem { data: json!({"a": 1}), metadata: NotarizationMetadata::default() },
            BatchItem { data: Value::Null, metadata: NotarizationMetadata::default() },
            BatchItem { data: json!("plain"), metadata: NotarizationMetadata::default() },
        ];

        let results = service.notarize_batch(items).await;
        assert_eq!(results.len(), 3);
        assert!(results[0].success);
        assert!(!results[1].success);
        assert!(results[1].error.is_some());
        assert!(results[2].success);

        let stats = service.stats().await;
        assert_eq!(stats.total_notarizations, 2);
    }

    #[tokio::test]
    async fn test_certificate() {
        let service = NotarizationService::new();
        let n = service
            .notarize(&artwork(), NotarizationMetadata::default())
            .await
            .unwrap();

        let cert = service.generate_certificate(&n.id).await.unwrap();
        assert_eq!(cert.certificate_id, format!("CERT_{}", n.id));
        assert_eq!(cert.issuer, "SuperCore");
    }

    #[tokio::test]
    async fn test_ledger_submission_does_not_block() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let service = NotarizationService::with_config(NotarizationConfig {
            enable_ledger: true,
            ..Default::default()
        })
        .with_ledger(Arc::new(ChannelLedger { tx }));

        let n = service
            .notarize(&artwork(), NotarizationMetadata::default())
            .await
            .unwrap();
        assert!(!n.blockchain);

        let submitted = rx.recv().await.unwrap();
        assert_eq!(submitted, n.id);
    }
}
