//! Error and status types for the SuperCore boundary.

use serde::{Deserialize, Serialize};

/// Error types for adapter operations.
#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    /// Transport failure or timeout
    #[error("Network error: {0}")]
    Network(String),

    /// Non-success HTTP status
    #[error("Request failed: {0}")]
    RequestFailed(String),

    /// Response body was not the expected JSON
    #[error("Parse error: {0}")]
    Parse(String),

    /// Operation needs the remote service
    #[error("Unavailable in standalone mode: {0}")]
    Standalone(String),

    /// Local compliance fallback failed
    #[error(transparent)]
    Compliance(#[from] compliance::ComplianceError),
}

pub type Result<T> = std::result::Result<T, AdapterError>;

/// Whether requests go to the remote service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdapterMode {
    Connected,
    Standalone,
}
