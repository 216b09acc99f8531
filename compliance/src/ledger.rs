//! Ledger boundary for notarizations.
//!
//! Anchoring notarizations on an external ledger is a collaborator concern.
//! This module only defines the seam; the notarization service submits
//! through it without waiting for confirmation.

use async_trait::async_trait;

use crate::types::{ComplianceError, Notarization, Result};

/// Trait for submitting notarizations to an external ledger.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Name of the ledger, for logging.
    fn name(&self) -> &str;

    /// Submit a notarization. Returns the ledger transaction id.
    async fn submit(&self, notarization: &Notarization) -> Result<String>;
}

/// Ledger used when no collaborator is wired in. Every submission fails.
pub struct OfflineLedger;

#[async_trait]
impl LedgerClient for OfflineLedger {
    fn name(&self) -> &str {
        "offline"
    }

    async fn submit(&self, notarization: &Notarization) -> Result<String> {
        tracing::debug!(notarization_id = %notarization.id, "Ledger offline, submission dropped");
        Err(ComplianceError::Ledger(
            "Ledger submission not available".to_string(),
        ))
    }
}
