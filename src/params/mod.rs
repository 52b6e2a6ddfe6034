//! Parameter definitions with physical units and documented semantics.
//!
//! All magic numbers are extracted here with:
//! - Physical units (seconds, milliseconds, Hz, linear gain)
//! - Documented ranges and meanings
//! - Validation for cross-field constraints

mod audio;
mod field;
mod render;

use thiserror::Error;

// Re-export all types
pub use audio::{audio_constants, ToneParams};
pub use field::{FieldParams, SessionTiming};
pub use render::RenderConfig;

/// Rejected parameter combination
#[derive(Debug, Error, PartialEq)]
pub enum ParamsError {
    #[error("{name} must be positive, got {value}")]
    NotPositive { name: &'static str, value: f64 },

    #[error("{name} must be within 0.0..=1.0, got {value}")]
    GainOutOfRange { name: &'static str, value: f32 },

    #[error(
        "teardown delay ({delay_s}s) must exceed the fade-out time constant ({fade_s}s)"
    )]
    TeardownTooShort { delay_s: f64, fade_s: f64 },

    #[error("tone frequency {hz}Hz is above Nyquist for {sample_rate}Hz")]
    AboveNyquist { hz: f32, sample_rate: u32 },
}
