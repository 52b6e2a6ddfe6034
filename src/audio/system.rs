//! Live lullaby output on the default audio device.
//!
//! The cpal stream is created and owned by a dedicated audio thread, which
//! also runs the teardown timer. The session side holds a [`ToneGenerator`]
//! that only sends commands, so dropping its reference after `stop()` leaves
//! the fade and release entirely to that thread.

use std::sync::mpsc;
use tracing::debug;

use super::lifecycle::{AmbientTone, Teardown, ToneSource};
use super::AudioError;
use crate::params::ToneParams;

/// Commands from the session to the audio thread
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ToneCommand {
    Resume,
    Stop,
}

/// Handle to a sounding lullaby
pub struct ToneGenerator {
    commands: mpsc::Sender<ToneCommand>,
    teardown: Teardown,
}

impl ToneGenerator {
    /// Open the default output device and start the tone, fading in
    pub fn new(params: &ToneParams) -> Result<Self, AudioError> {
        params.validate()?;

        #[cfg(feature = "playback")]
        {
            playback::spawn(params.clone())
        }

        #[cfg(not(feature = "playback"))]
        {
            Err(AudioError::PlaybackDisabled)
        }
    }
}

impl AmbientTone for ToneGenerator {
    fn stop(self) -> Teardown {
        if self.commands.send(ToneCommand::Stop).is_err() {
            debug!("audio thread already gone; nothing to tear down");
        }
        self.teardown
    }

    fn resume(&mut self) {
        if self.commands.send(ToneCommand::Resume).is_err() {
            debug!("audio thread already gone; nothing to resume");
        }
    }
}

/// Tone source backed by the default cpal output device
#[derive(Debug, Clone, Default)]
pub struct DeviceToneSource {
    params: ToneParams,
}

impl DeviceToneSource {
    pub fn new(params: ToneParams) -> Self {
        Self { params }
    }
}

impl ToneSource for DeviceToneSource {
    type Tone = ToneGenerator;

    fn open(&mut self) -> Result<ToneGenerator, AudioError> {
        ToneGenerator::new(&self.params)
    }
}


/// Audio-thread side of a tone: command loop and release
#[cfg(any(feature = "playback", test))]
mod driver {
    use std::sync::mpsc::Receiver;
    use std::sync::Mutex;
    use std::thread;
    use std::time::Duration;
    use tracing::{debug, warn};

    use super::ToneCommand;
    use crate::audio::graph::ToneGraph;
    use crate::audio::lifecycle::TeardownSignal;

    /// Output stream the host may suspend
    pub(super) trait OutputStream {
        fn resume(&self) -> Result<(), String>;
    }

    /// Run commands, then close the graph, drop the stream and signal release
    pub(super) fn drive<S: OutputStream>(
        stream: S,
        graph: &Mutex<ToneGraph>,
        commands: Receiver<ToneCommand>,
        teardown_delay: Duration,
        signal: TeardownSignal,
    ) {
        run_commands(&stream, graph, commands, teardown_delay);

        lock_graph(graph, ToneGraph::close);
        drop(stream);
        signal.complete();
        debug!("lullaby audio released");
    }

    /// Apply commands until `Stop` (or until the handle is dropped)
    fn run_commands<S: OutputStream>(
        stream: &S,
        graph: &Mutex<ToneGraph>,
        commands: Receiver<ToneCommand>,
        teardown_delay: Duration,
    ) {
        for command in commands.iter() {
            match command {
                ToneCommand::Resume => {
                    if let Err(e) = stream.resume() {
                        warn!("unable to resume lullaby audio: {}", e);
                    }
                }
                ToneCommand::Stop => {
                    lock_graph(graph, ToneGraph::fade_out);
                    debug!(?teardown_delay, "lullaby fading out");
                    thread::sleep(teardown_delay);
                    return;
                }
            }
        }
        debug!("tone handle dropped without stop; releasing immediately");
    }

    fn lock_graph(graph: &Mutex<ToneGraph>, f: impl FnOnce(&mut ToneGraph)) {
        if let Ok(mut graph) = graph.lock() {
            f(&mut *graph);
        }
    }

}

#[cfg(feature = "playback")]
mod playback {
    use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
    use std::sync::mpsc;
    use std::sync::{Arc, Mutex};
    use std::thread;
    use tracing::{info, warn};

    use super::driver::{drive, OutputStream};
    use super::ToneGenerator;
    use crate::audio::graph::ToneGraph;
    use crate::audio::lifecycle::Teardown;
    use crate::audio::AudioError;
    use crate::params::ToneParams;

    impl OutputStream for cpal::Stream {
        fn resume(&self) -> Result<(), String> {
            StreamTrait::play(self).map_err(|e| e.to_string())
        }
    }

    /// Start the audio thread and wait until its stream is playing (or failed)
    pub(super) fn spawn(params: ToneParams) -> Result<ToneGenerator, AudioError> {
        let (command_tx, command_rx) = mpsc::channel();
        let (ready_tx, ready_rx) = mpsc::sync_channel(1);
        let (teardown, signal) = Teardown::pending();

        thread::Builder::new()
            .name("lullaby-audio".to_string())
            .spawn(move || {
                let (stream, graph) = match open_stream(&params) {
                    Ok(opened) => {
                        let _ = ready_tx.send(Ok(()));
                        opened
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        signal.complete();
                        return;
                    }
                };

                drive(stream, &graph, command_rx, params.teardown_delay(), signal);
            })?;

        ready_rx.recv().map_err(|_| AudioError::ThreadGone)??;

        Ok(ToneGenerator {
            commands: command_tx,
            teardown,
        })
    }

    /// Build and start an output stream fed by a fresh graph
    fn open_stream(
        params: &ToneParams,
    ) -> Result<(cpal::Stream, Arc<Mutex<ToneGraph>>), AudioError> {
        let host = cpal::default_host();
        let device = host.default_output_device().ok_or(AudioError::NoDevice)?;

        let supported = device
            .default_output_config()
            .map_err(|e| AudioError::OutputConfig(e.to_string()))?;
        let sample_format = supported.sample_format();

        let config: cpal::StreamConfig = supported.into();
        let sample_rate = config.sample_rate.0;
        let channels = config.channels as usize;
        params.validate_for_rate(sample_rate)?;

        info!(
            device = %device.name().unwrap_or_else(|_| "Unknown".to_string()),
            sample_rate,
            channels,
            ?sample_format,
            "lullaby audio opened"
        );

        let graph = Arc::new(Mutex::new(ToneGraph::new(params, sample_rate)));

        let stream = match sample_format {
            cpal::SampleFormat::F32 => build_stream::<f32>(&device, &config, &graph, channels),
            cpal::SampleFormat::I16 => build_stream::<i16>(&device, &config, &graph, channels),
            cpal::SampleFormat::U16 => build_stream::<u16>(&device, &config, &graph, channels),
            other => Err(AudioError::SampleFormat(format!("{:?}", other))),
        }?;

        stream
            .play()
            .map_err(|e| AudioError::PlayStream(e.to_string()))?;

        Ok((stream, graph))
    }

    /// Output stream that renders the graph in f32 and converts to the device format
    fn build_stream<T>(
        device: &cpal::Device,
        config: &cpal::StreamConfig,
        graph: &Arc<Mutex<ToneGraph>>,
        channels: usize,
    ) -> Result<cpal::Stream, AudioError>
    where
        T: cpal::SizedSample + cpal::FromSample<f32> + 'static,
    {
        let graph_callback = Arc::clone(graph);
        let mut mix: Vec<f32> = Vec::new();

        device
            .build_output_stream(
                config,
                move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                    mix.resize(data.len(), 0.0);
                    // Silence rather than panic on the realtime thread
                    match graph_callback.lock() {
                        Ok(mut graph) => graph.render(&mut mix, channels),
                        Err(_) => mix.fill(0.0),
                    }
                    write_converted(data, &mix);
                },
                |err| warn!("audio stream error: {}", err),
                None,
            )
            .map_err(|e| AudioError::BuildStream(e.to_string()))
    }

    fn write_converted<T>(out: &mut [T], mix: &[f32])
    where
        T: cpal::Sample + cpal::FromSample<f32>,
    {
        for (slot, &sample) in out.iter_mut().zip(mix) {
            *slot = T::from_sample(sample);
        }
    }

}
