//! Gain automation with exponential-approach ramps.
//!
//! Mirrors the subset of audio-parameter automation the lullaby needs: a
//! fixed value, one pending `set_target_at_time` ramp, and cancel-and-hold.
//! A ramp started at `t0` from `v0` toward `target` evaluates to
//! `target + (v0 - target) * exp(-(t - t0) / tau)`, which never steps.

/// Exponential approach toward a target value
#[derive(Debug, Clone, Copy, PartialEq)]
struct TargetRamp {
    start_time_s: f64,
    target: f32,
    time_constant_s: f64,
}

/// Automatable linear gain
#[derive(Debug, Clone, PartialEq)]
pub struct GainParam {
    /// Value held before (and in the absence of) a ramp
    value: f32,
    ramp: Option<TargetRamp>,
}

impl GainParam {
    pub fn new(value: f32) -> Self {
        Self { value, ramp: None }
    }

    /// Start approaching `target` at `start_time_s` with time constant `time_constant_s`
    ///
    /// The ramp departs from whatever value the parameter has at `start_time_s`.
    pub fn set_target_at_time(&mut self, target: f32, start_time_s: f64, time_constant_s: f64) {
        self.value = self.value_at(start_time_s);
        self.ramp = Some(TargetRamp {
            start_time_s,
            target,
            time_constant_s: time_constant_s.max(f64::EPSILON),
        });
    }

    /// Drop pending automation, holding the value reached at `time_s`
    pub fn cancel_scheduled_values(&mut self, time_s: f64) {
        self.value = self.value_at(time_s);
        self.ramp = None;
    }

    /// Evaluate the parameter at `time_s`
    pub fn value_at(&self, time_s: f64) -> f32 {
        match self.ramp {
            Some(ramp) if time_s >= ramp.start_time_s => {
                let elapsed = time_s - ramp.start_time_s;
                let decay = (-elapsed / ramp.time_constant_s).exp() as f32;
                ramp.target + (self.value - ramp.target) * decay
            }
            _ => self.value,
        }
    }

    /// Final value the parameter is heading toward
    #[cfg(test)]
    fn target(&self) -> f32 {
        self.ramp.map_or(self.value, |ramp| ramp.target)
    }
}
