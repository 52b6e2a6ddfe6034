use thiserror::Error;

use crate::params::ParamsError;

#[derive(Debug, Error)]
pub enum AudioError {
    #[error("audio playback support was not compiled in")]
    PlaybackDisabled,

    #[error("no default output device")]
    NoDevice,

    #[error("invalid tone parameters: {0}")]
    Params(#[from] ParamsError),

    #[error("failed to query default output config: {0}")]
    OutputConfig(String),

    #[error("unsupported output sample format: {0}")]
    SampleFormat(String),

    #[error("failed to build output stream: {0}")]
    BuildStream(String),

    #[error("failed to play output stream: {0}")]
    PlayStream(String),

    #[error("audio thread exited before reporting readiness")]
    ThreadGone,

    #[error("failed to spawn audio thread: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("failed to write WAV output: {0}")]
    Wav(#[from] hound::Error),
}
