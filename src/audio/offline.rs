//! Offline rendering of a full lullaby lifecycle to WAV.

use std::io::{Seek, Write};
use std::time::Duration;
use tracing::info;

use super::graph::ToneGraph;
use super::AudioError;
use crate::params::ToneParams;

/// Frames rendered per block
const RENDER_BLOCK: usize = 1024;

/// Render fade-in and sustain, then fade-out and teardown delay, as mono 32-bit float WAV
///
/// Returns the number of frames written.
pub fn render_to_wav<W: Write + Seek>(
    params: &ToneParams,
    sample_rate: u32,
    sustain: Duration,
    writer: W,
) -> Result<u64, AudioError> {
    params.validate_for_rate(sample_rate)?;

    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut wav = hound::WavWriter::new(writer, spec)?;
    let mut graph = ToneGraph::new(params, sample_rate);

    let sustain_frames = frames_for(sustain, sample_rate);
    let release_frames = frames_for(params.teardown_delay(), sample_rate);

    render_frames(&mut graph, sustain_frames, &mut wav)?;
    graph.fade_out();
    render_frames(&mut graph, release_frames, &mut wav)?;
    graph.close();

    wav.finalize()?;

    let total = sustain_frames + release_frames;
    info!(
        frames = total,
        sample_rate,
        final_master = graph.master_level(),
        "lullaby rendered"
    );
    Ok(total)
}

fn frames_for(duration: Duration, sample_rate: u32) -> u64 {
    (duration.as_secs_f64() * sample_rate as f64).round() as u64
}

fn render_frames<W: Write + Seek>(
    graph: &mut ToneGraph,
    frames: u64,
    wav: &mut hound::WavWriter<W>,
) -> Result<(), AudioError> {
    let mut block = vec![0.0f32; RENDER_BLOCK];
    let mut remaining = frames;

    while remaining > 0 {
        let len = remaining.min(RENDER_BLOCK as u64) as usize;
        graph.render(&mut block[..len], 1);
        for &sample in &block[..len] {
            wav.write_sample(sample)?;
        }
        remaining -= len as u64;
    }
    Ok(())
}
