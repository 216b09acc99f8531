//! Compliance layer for the Super-Core
//!
//! Three cooperating services that keep digital assets and intellectual
//! property records accountable:
//!
//! - **Asset verification**: structural and format checks of canonical assets
//! - **IP governance**: registration, licensing and ownership verification
//! - **Notarization**: content-addressed proofs with one-way revocation
//!
//! # Key Components
//!
//! - [`AssetVerifier`]: Walks the canonical asset registry and checks every file
//! - [`IpGovernance`]: Append-only IP registry with license lifecycle
//! - [`NotarizationService`]: Digest-backed proofs, verification and revocation
//! - [`LedgerClient`]: Boundary to an external ledger (not implemented here)
//!
//! # Example
//!
//! ```ignore
//! use compliance::{IpGovernance, IpRegistration, NotarizationService};
//!
//! let notary = Arc::new(NotarizationService::new());
//! let ip = IpGovernance::new().with_notarization_service(notary);
//!
//! ip.register_ip(IpRegistration::new("ip1", "logo", "acct-1")).await?;
//! let check = ip.verify_ownership("ip1", "acct-1").await;
//! assert!(check.valid && check.notarized);
//! ```

pub mod asset_verifier;
pub mod config;
pub mod digest;
pub mod ip_governance;
pub mod ledger;
pub mod notarization;
pub mod types;

// Re-export main types
pub use asset_verifier::{
    AssetIssue, AssetIssueKind, AssetVerification, AssetVerifier, CanonConfig, VerificationReport,
    VerificationResults, VerifyOptions,
};
pub use config::ComplianceConfig;
pub use digest::{compute_hash, digest_value};
pub use ip_governance::{IpGovernance, IpStats};
pub use ledger::{LedgerClient, OfflineLedger};
pub use notarization::{NotarizationService, NotarizationStats};
pub use types::*;
