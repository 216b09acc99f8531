//! Multi-modal input for the Super-Core
//!
//! Turns touch, voice, spatial and flow-gesture input into a single
//! canonical [`NormalizedIntent`].
//!
//! # Key Components
//!
//! - [`adapters`]: Per-modality recognizers (voice commands, spatial gestures, flow templates)
//! - [`IntentNormalizer`]: Detects the modality and builds the canonical intent
//! - [`InputOrchestrator`]: Handler registry and optional downstream forwarding
//!
//! # Example
//!
//! ```ignore
//! use modality::{InputOrchestrator, ModalityConfig};
//!
//! let orchestrator = InputOrchestrator::new(ModalityConfig::default());
//! let processed = orchestrator
//!     .process_input(json!({"transcript": "please create asset now", "confidence": 0.95}))
//!     .await?;
//! assert_eq!(processed.intent.intent, "create-asset");
//! ```

pub mod adapters;
pub mod config;
pub mod normalizer;
pub mod orchestrator;
pub mod types;

// Re-export main types
pub use config::ModalityConfig;
pub use normalizer::{validate_payload, IntentNormalizer};
pub use orchestrator::{InputHandler, InputOrchestrator, IntentForwarder, OrchestratorStats};
pub use types::*;
