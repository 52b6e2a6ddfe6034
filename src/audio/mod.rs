//! Ambient lullaby synthesis.
//!
//! Two sine voices fade in under a shared master gain; stopping fades the
//! master out and releases the output after a fixed delay.

mod envelope;
mod error;
mod graph;
mod lifecycle;
mod offline;
mod system;

// Re-export public types
pub use envelope::GainParam;
pub use error::AudioError;
pub use graph::{ToneGraph, TonePhase};
pub use lifecycle::{AmbientTone, Teardown, TeardownSignal, ToneSource};
pub use offline::render_to_wav;
pub use system::{DeviceToneSource, ToneGenerator};
