//! SuperCore boundary
//!
//! Forwards normalized intents and compliance requests to the SuperCore
//! service over HTTP. When the service cannot be reached the adapter runs
//! standalone: intents are echoed back and notarization happens locally.
//!
//! # Example
//!
//! ```ignore
//! use supercore_adapter::{SuperCoreAdapter, SuperCoreConfig};
//!
//! let adapter = SuperCoreAdapter::new(SuperCoreConfig::new("http://localhost:3000"))?;
//! adapter.initialize().await;
//! let status = adapter.get_status().await;
//! ```

pub mod client;
pub mod config;
pub mod types;

// Re-export main types
pub use client::SuperCoreAdapter;
pub use config::SuperCoreConfig;
pub use types::*;
