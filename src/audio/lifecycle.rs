//! Ownership seams between the session controller and a tone generator.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::AudioError;

/// Observer for a tone teardown that has been handed off after `stop()`
///
/// The generator's teardown timer owns the audio resources; whoever holds a
/// `Teardown` can only ask whether they have been released.
#[derive(Debug, Clone)]
pub struct Teardown {
    released: Arc<AtomicBool>,
}

/// Completion side of a [`Teardown`], held by the code that releases the audio
#[derive(Debug)]
pub struct TeardownSignal {
    released: Arc<AtomicBool>,
}

impl Teardown {
    /// Create a pending teardown and the signal that completes it
    pub fn pending() -> (Self, TeardownSignal) {
        let released = Arc::new(AtomicBool::new(false));
        (
            Self {
                released: Arc::clone(&released),
            },
            TeardownSignal { released },
        )
    }

    pub fn is_complete(&self) -> bool {
        self.released.load(Ordering::Acquire)
    }
}

impl TeardownSignal {
    /// Mark the audio as released
    pub fn complete(self) {}
}

// A releasing thread that exits early (or unwinds) still counts as released.
impl Drop for TeardownSignal {
    fn drop(&mut self) {
        self.released.store(true, Ordering::Release);
    }
}

/// A sounding ambient tone: fades in on construction, fades out on `stop()`
pub trait AmbientTone {
    /// Fade out, then release the graph after the teardown delay
    ///
    /// Consumes the tone: ownership of the teardown passes to its own timer.
    fn stop(self) -> Teardown;

    /// Restart output if the host suspended it
    fn resume(&mut self) {}
}

/// Factory for ambient tones
pub trait ToneSource {
    type Tone: AmbientTone;

    fn open(&mut self) -> Result<Self::Tone, AudioError>;
}
