//! Field of sheep crossing from left to right.
//!
//! This is the presentation layer behind the session controller: it owns each
//! sprite's animation progress, freezes and resumes them, and reports when a
//! crossing finishes.

mod mesh;

use noise::{NoiseFn, Perlin};
use std::time::Duration;
use tracing::trace;

use crate::params::FieldParams;
use crate::session::{Presentation, SheepId};

pub use mesh::{build_scene, scene_vertex_capacity, Vertex};

/// One sheep on screen
#[derive(Debug, Clone)]
pub struct SheepSprite {
    pub id: SheepId,
    /// Time spent walking (excludes frozen time)
    elapsed: Duration,
    /// Vertical offset from the lane centre (NDC units)
    pub lane_offset: f32,
    pub frozen: bool,
    /// Completion already reported
    finished: bool,
}

impl SheepSprite {
    /// Crossing progress in 0.0..=1.0
    pub fn progress(&self, crossing: Duration) -> f32 {
        (self.elapsed.as_secs_f32() / crossing.as_secs_f32()).min(1.0)
    }
}

/// Sheep sprites and their animation clock
pub struct Field {
    params: FieldParams,
    sprites: Vec<SheepSprite>,
    lanes: Perlin,
}

impl Field {
    pub fn new(params: FieldParams) -> Self {
        let lanes = Perlin::new(params.noise_seed);
        Self {
            params,
            sprites: Vec::new(),
            lanes,
        }
    }

    pub fn params(&self) -> &FieldParams {
        &self.params
    }

    pub fn sprites(&self) -> &[SheepSprite] {
        &self.sprites
    }

    #[cfg(test)]
    fn sprite(&self, id: SheepId) -> Option<&SheepSprite> {
        self.sprites.iter().find(|s| s.id == id)
    }

    /// Move every walking sheep forward by `dt`
    ///
    /// # Returns
    /// Ids whose crossing finished during this step (each reported once)
    pub fn advance(&mut self, dt: Duration) -> Vec<SheepId> {
        let crossing = self.params.crossing_duration();
        let mut completed = Vec::new();

        for sprite in self.sprites.iter_mut().filter(|s| !s.frozen && !s.finished) {
            sprite.elapsed = (sprite.elapsed + dt).min(crossing);
            if sprite.elapsed >= crossing {
                sprite.finished = true;
                completed.push(sprite.id);
            }
        }

        if !completed.is_empty() {
            trace!(?completed, "crossings finished");
        }
        completed
    }

    /// Lane offset for a sheep, smooth noise keyed by id
    fn lane_offset(&self, id: SheepId) -> f32 {
        let sample = self.lanes.get([id.0 as f64 * 0.37 + 0.5, 0.0]) as f32;
        sample.clamp(-1.0, 1.0) * self.params.lane_spread
    }
}

impl Presentation for Field {
    fn spawn(&mut self, id: SheepId) {
        let lane_offset = self.lane_offset(id);
        self.sprites.push(SheepSprite {
            id,
            elapsed: Duration::ZERO,
            lane_offset,
            frozen: false,
            finished: false,
        });
    }

    fn freeze_all(&mut self) {
        for sprite in &mut self.sprites {
            sprite.frozen = true;
        }
    }

    fn resume_all(&mut self) {
        for sprite in &mut self.sprites {
            sprite.frozen = false;
        }
    }

    fn remove(&mut self, id: SheepId) {
        self.sprites.retain(|s| s.id != id);
    }
}
