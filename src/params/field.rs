//! Session timing and field animation parameters.

use std::time::Duration;

use super::ParamsError;

/// Session controller timing
#[derive(Debug, Clone)]
pub struct SessionTiming {
    /// Period of the repeating spawn timer (milliseconds)
    pub spawn_period_ms: u64,
}

impl Default for SessionTiming {
    fn default() -> Self {
        Self {
            spawn_period_ms: 2000,
        }
    }
}

impl SessionTiming {
    pub fn spawn_period(&self) -> Duration {
        Duration::from_millis(self.spawn_period_ms)
    }

    pub fn validate(&self) -> Result<(), ParamsError> {
        if self.spawn_period_ms == 0 {
            return Err(ParamsError::NotPositive {
                name: "spawn_period_ms",
                value: 0.0,
            });
        }
        Ok(())
    }
}

/// Field layout and sheep animation parameters
#[derive(Debug, Clone)]
pub struct FieldParams {
    /// Time for one sheep to cross the field (seconds)
    pub crossing_duration_s: f32,

    /// Vertical centre of the walking band (NDC, -1 bottom .. 1 top)
    pub lane_center_y: f32,

    /// Maximum lane offset from the centre (NDC units)
    pub lane_spread: f32,

    /// Hops per crossing (legs and body bob)
    pub hops_per_crossing: f32,

    /// Perlin noise seed for lane selection
    pub noise_seed: u32,
}

impl Default for FieldParams {
    fn default() -> Self {
        Self {
            crossing_duration_s: 8.0,
            lane_center_y: -0.35,
            lane_spread: 0.18,
            hops_per_crossing: 10.0,
            noise_seed: 7,
        }
    }
}

impl FieldParams {
    pub fn crossing_duration(&self) -> Duration {
        Duration::from_secs_f32(self.crossing_duration_s)
    }

    pub fn validate(&self) -> Result<(), ParamsError> {
        if self.crossing_duration_s <= 0.0 || !self.crossing_duration_s.is_finite() {
            return Err(ParamsError::NotPositive {
                name: "crossing_duration_s",
                value: self.crossing_duration_s as f64,
            });
        }
        Ok(())
    }
}
