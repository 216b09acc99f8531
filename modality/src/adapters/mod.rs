//! Per-modality adapters.
//!
//! Each adapter turns one kind of raw input into a reading carrying a
//! recognized gesture or command, a confidence and an interpreted intent.
//! Low-confidence input degrades to `unknown`/`none` rather than failing.

pub mod flow;
pub mod spatial;
pub mod touch;
pub mod voice;

pub use flow::{FlowAdapter, FlowPattern, FlowReading, PatternType};
pub use spatial::{GestureRecognizer, SpatialAdapter, SpatialReading, Zone};
pub use touch::{TouchAdapter, TouchReading};
pub use voice::{Entities, VoiceAdapter, VoiceCommand, VoiceReading};
