//! Lullaby synthesis graph: two sine voices, each with its own gain, into a master gain.

use std::f64::consts::TAU;

use super::envelope::GainParam;
use crate::params::{audio_constants::OUTPUT_CLAMP, ToneParams};

/// Lifecycle phase of the graph
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TonePhase {
    /// Voices fading in or sustaining
    Sounding,
    /// Master gain heading toward silence
    FadingOut,
    /// Voices stopped; renders silence
    Closed,
}

/// Sine oscillator routed through its own gain stage
#[derive(Debug, Clone)]
struct Voice {
    frequency_hz: f64,
    phase: f64,
    gain: GainParam,
}

impl Voice {
    fn next_sample(&mut self, time_s: f64, sample_rate: f64) -> f32 {
        let sample = self.phase.sin() as f32 * self.gain.value_at(time_s);
        self.phase = (self.phase + TAU * self.frequency_hz / sample_rate) % TAU;
        sample
    }
}

/// Owned synthesis graph with an explicit sample clock
#[derive(Debug, Clone)]
pub struct ToneGraph {
    voices: Vec<Voice>,
    master: GainParam,
    sample_rate: u32,
    frames_rendered: u64,
    fade_out_time_constant_s: f64,
    phase: TonePhase,
}

impl ToneGraph {
    /// Build the graph and schedule each voice's fade-in from silence
    pub fn new(params: &ToneParams, sample_rate: u32) -> Self {
        let voices = params
            .frequencies_hz
            .iter()
            .map(|&hz| {
                let mut gain = GainParam::new(0.0);
                gain.set_target_at_time(params.voice_gain, 0.0, params.fade_in_time_constant_s);
                Voice {
                    frequency_hz: hz as f64,
                    phase: 0.0,
                    gain,
                }
            })
            .collect();

        Self {
            voices,
            master: GainParam::new(params.master_gain),
            sample_rate,
            frames_rendered: 0,
            fade_out_time_constant_s: params.fade_out_time_constant_s,
            phase: TonePhase::Sounding,
        }
    }

    /// Graph time in seconds (frames rendered / sample rate)
    pub fn current_time_s(&self) -> f64 {
        self.frames_rendered as f64 / self.sample_rate as f64
    }

    pub fn phase(&self) -> TonePhase {
        self.phase
    }

    /// Current master gain
    pub fn master_level(&self) -> f32 {
        self.master.value_at(self.current_time_s())
    }

    /// Current gain of each voice
    pub fn voice_levels(&self) -> Vec<f32> {
        let now = self.current_time_s();
        self.voices.iter().map(|v| v.gain.value_at(now)).collect()
    }

    /// Cancel pending master automation and approach silence
    pub fn fade_out(&mut self) {
        if self.phase == TonePhase::Closed {
            return;
        }
        let now = self.current_time_s();
        self.master.cancel_scheduled_values(now);
        self.master
            .set_target_at_time(0.0, now, self.fade_out_time_constant_s);
        self.phase = TonePhase::FadingOut;
    }

    /// Stop the voices; every later sample is silent
    pub fn close(&mut self) {
        self.phase = TonePhase::Closed;
    }

    /// Fill an interleaved buffer, writing the mono mix to every channel
    pub fn render(&mut self, out: &mut [f32], channels: usize) {
        let channels = channels.max(1);
        let sample_rate = self.sample_rate as f64;

        for frame in out.chunks_mut(channels) {
            let sample = if self.phase == TonePhase::Closed {
                0.0
            } else {
                let now = self.current_time_s();
                let mix: f32 = self
                    .voices
                    .iter_mut()
                    .map(|v| v.next_sample(now, sample_rate))
                    .sum();
                (mix * self.master.value_at(now)).clamp(-OUTPUT_CLAMP, OUTPUT_CLAMP)
            };
            frame.fill(sample);
            self.frames_rendered += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RATE: u32 = 8000;

    fn render_seconds(graph: &mut ToneGraph, seconds: f64) -> Vec<f32> {
        let mut buf = vec![0.0; (seconds * RATE as f64) as usize];
        graph.render(&mut buf, 1);
        buf
    }

    fn peak(samples: &[f32]) -> f32 {
        samples.iter().fold(0.0, |acc, s| acc.max(s.abs()))
    }

    #[test]
    fn test_fade_in_starts_silent() {
        let mut graph = ToneGraph::new(&ToneParams::default(), RATE);
        assert_eq!(graph.voice_levels(), vec![0.0, 0.0]);

        let onset = render_seconds(&mut graph, 0.01);
        assert_eq!(onset[0], 0.0);
        assert!(peak(&onset) < 1e-4);
    }

    #[test]
    fn test_fade_in_ramps_toward_voice_gain() {
        let params = ToneParams::default();
        let mut graph = ToneGraph::new(&params, RATE);

        render_seconds(&mut graph, 2.5);
        let expected = params.voice_gain * (1.0 - (-1.0f32).exp());
        for level in graph.voice_levels() {
            assert!((level - expected).abs() < 1e-3);
        }

        render_seconds(&mut graph, 20.0);
        for level in graph.voice_levels() {
            assert!((level - params.voice_gain).abs() < 1e-4);
        }
        assert_eq!(graph.phase(), TonePhase::Sounding);
    }

    #[test]
    fn test_fade_out_has_no_step() {
        let mut graph = ToneGraph::new(&ToneParams::default(), RATE);
        let before = render_seconds(&mut graph, 5.0);
        let master_before = graph.master_level();

        graph.fade_out();
        assert_eq!(graph.phase(), TonePhase::FadingOut);
        assert!((graph.master_level() - master_before).abs() < 1e-6);

        // Largest sample-to-sample change stays on the order of the sine slope
        let after = render_seconds(&mut graph, 0.05);
        let last = *before.last().unwrap();
        let max_delta = std::iter::once(last)
            .chain(after.iter().copied())
            .collect::<Vec<_>>()
            .windows(2)
            .map(|w| (w[1] - w[0]).abs())
            .fold(0.0f32, f32::max);
        assert!(max_delta < 0.002);
    }

    #[test]
    fn test_fade_out_quiet_by_teardown() {
        let params = ToneParams::default();
        let mut graph = ToneGraph::new(&params, RATE);
        render_seconds(&mut graph, 3.0);

        graph.fade_out();
        render_seconds(&mut graph, params.teardown_delay().as_secs_f64());
        let expected = params.master_gain
            * (-(params.teardown_delay().as_secs_f64() / params.fade_out_time_constant_s)).exp()
                as f32;
        assert!((graph.master_level() - expected).abs() < 1e-4);
        assert!(graph.master_level() < params.master_gain * 0.3);
    }

    #[test]
    fn test_closed_graph_is_silent() {
        let mut graph = ToneGraph::new(&ToneParams::default(), RATE);
        render_seconds(&mut graph, 3.0);
        graph.fade_out();
        graph.close();

        let tail = render_seconds(&mut graph, 0.5);
        assert!(tail.iter().all(|s| *s == 0.0));

        // Fading a closed graph does not reopen it
        graph.fade_out();
        assert_eq!(graph.phase(), TonePhase::Closed);
    }

    #[test]
    fn test_render_fills_all_channels() {
        let mut graph = ToneGraph::new(&ToneParams::default(), RATE);
        render_seconds(&mut graph, 3.0);

        let mut stereo = vec![0.0; 64];
        graph.render(&mut stereo, 2);
        for frame in stereo.chunks(2) {
            assert_eq!(frame[0], frame[1]);
        }
        assert!(peak(&stereo) > 0.0);
        assert!(peak(&stereo) <= OUTPUT_CLAMP);
    }
}
