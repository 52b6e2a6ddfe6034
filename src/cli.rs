//! Command-line argument parsing.

use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

use crate::params::{audio_constants, FieldParams, ParamsError, SessionTiming, ToneParams};

/// Command line arguments
#[derive(Parser, Debug)]
#[command(name = "sheepcount")]
#[command(about = "Count sheep crossing a field to a soft lullaby", long_about = None)]
pub struct Args {
    /// Time between new sheep (milliseconds)
    #[arg(long, value_name = "MS", default_value_t = 2000)]
    pub spawn_interval_ms: u64,

    /// Time for one sheep to cross the field (seconds)
    #[arg(long, value_name = "SECONDS", default_value_t = 8.0)]
    pub crossing_secs: f32,

    /// Run without the lullaby
    #[arg(long)]
    pub mute: bool,

    /// Start counting as soon as the window opens
    #[arg(long)]
    pub autostart: bool,

    /// Render the lullaby lifecycle to a WAV file and exit
    #[arg(long, value_name = "PATH")]
    pub render_tone: Option<PathBuf>,

    /// Sustain time before fade-out when rendering (seconds)
    #[arg(long, value_name = "SECONDS", default_value_t = 5.0)]
    pub sustain_secs: f32,

    /// Sample rate when rendering (Hz)
    #[arg(long, value_name = "HZ", default_value_t = audio_constants::DEFAULT_SAMPLE_RATE)]
    pub sample_rate: u32,
}

impl Args {
    /// Session timing from command-line overrides
    pub fn session_timing(&self) -> Result<SessionTiming, ParamsError> {
        let timing = SessionTiming {
            spawn_period_ms: self.spawn_interval_ms,
        };
        timing.validate()?;
        Ok(timing)
    }

    /// Field parameters from command-line overrides
    pub fn field_params(&self) -> Result<FieldParams, ParamsError> {
        let params = FieldParams {
            crossing_duration_s: self.crossing_secs,
            ..FieldParams::default()
        };
        params.validate()?;
        Ok(params)
    }

    /// Tone parameters, or `None` when muted
    pub fn tone_params(&self) -> Option<ToneParams> {
        (!self.mute).then(ToneParams::default)
    }

    /// Sustain duration for offline rendering
    pub fn sustain(&self) -> Result<Duration, ParamsError> {
        Duration::try_from_secs_f32(self.sustain_secs).map_err(|_| ParamsError::NotPositive {
            name: "sustain_secs",
            value: self.sustain_secs as f64,
        })
    }
}
