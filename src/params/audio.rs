//! Ambient tone configuration and constants.

use std::time::Duration;

use super::ParamsError;

/// Lullaby tone parameters (two sine voices under a shared master gain)
#[derive(Debug, Clone)]
pub struct ToneParams {
    /// Voice frequencies (Hz)
    /// A3 and E4: a soft open dyad
    pub frequencies_hz: [f32; 2],

    /// Master gain applied to the voice mix (linear)
    pub master_gain: f32,

    /// Level each voice approaches during fade-in (linear)
    pub voice_gain: f32,

    /// Fade-in time constant for each voice (seconds)
    /// Exponential approach: ~63% of target after one constant
    pub fade_in_time_constant_s: f64,

    /// Fade-out time constant for the master gain (seconds)
    pub fade_out_time_constant_s: f64,

    /// Delay between stop request and releasing the output (milliseconds)
    /// Must exceed the fade-out time constant so teardown never truncates audible sound
    pub teardown_delay_ms: u64,
}

impl Default for ToneParams {
    fn default() -> Self {
        Self {
            frequencies_hz: [220.0, 329.63],
            master_gain: 0.05,
            voice_gain: 0.05,
            fade_in_time_constant_s: 2.5,
            fade_out_time_constant_s: 1.5,
            teardown_delay_ms: 2000,
        }
    }
}

impl ToneParams {
    /// Delay before the output stream is released after `stop()`
    pub fn teardown_delay(&self) -> Duration {
        Duration::from_millis(self.teardown_delay_ms)
    }

    /// Validate configuration (positive constants, sane gains, teardown after fade)
    pub fn validate(&self) -> Result<(), ParamsError> {
        for hz in self.frequencies_hz {
            if hz <= 0.0 {
                return Err(ParamsError::NotPositive {
                    name: "frequencies_hz",
                    value: hz as f64,
                });
            }
        }
        for (name, value) in [
            ("master_gain", self.master_gain),
            ("voice_gain", self.voice_gain),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ParamsError::GainOutOfRange { name, value });
            }
        }
        for (name, value) in [
            ("fade_in_time_constant_s", self.fade_in_time_constant_s),
            ("fade_out_time_constant_s", self.fade_out_time_constant_s),
        ] {
            if value <= 0.0 {
                return Err(ParamsError::NotPositive { name, value });
            }
        }

        let delay_s = self.teardown_delay().as_secs_f64();
        if delay_s <= self.fade_out_time_constant_s {
            return Err(ParamsError::TeardownTooShort {
                delay_s,
                fade_s: self.fade_out_time_constant_s,
            });
        }
        Ok(())
    }

    /// Check that every voice can be represented at `sample_rate`
    pub fn validate_for_rate(&self, sample_rate: u32) -> Result<(), ParamsError> {
        self.validate()?;
        let nyquist = sample_rate as f32 / 2.0;
        match self.frequencies_hz.iter().find(|hz| **hz >= nyquist) {
            Some(&hz) => Err(ParamsError::AboveNyquist { hz, sample_rate }),
            None => Ok(()),
        }
    }
}

/// Audio constants
pub mod audio_constants {
    /// Sample rate for offline rendering when none is given (Hz)
    pub const DEFAULT_SAMPLE_RATE: u32 = 44100;

    /// Hard limit on output samples, far above the quiet lullaby level
    pub const OUTPUT_CLAMP: f32 = 0.5;
}
