//! Flat-coloured triangle mesh for the field and its sheep.

use bytemuck::{Pod, Zeroable};
use glam::Vec2;
use std::f32::consts::PI;

use super::Field;

/// Vertex data for the scene (NDC position + colour)
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 2],
    pub color: [f32; 3],
}

const VERTICES_PER_QUAD: usize = 6;
const BACKGROUND_QUADS: usize = 2;
const QUADS_PER_SHEEP: usize = 8;

const GRASS: [f32; 3] = [0.16, 0.36, 0.2];
const HORIZON: [f32; 3] = [0.22, 0.45, 0.26];
const WOOL: [f32; 3] = [0.95, 0.95, 0.92];
const WOOL_SHADE: [f32; 3] = [0.86, 0.86, 0.84];
const FACE: [f32; 3] = [0.24, 0.2, 0.2];
const EYE: [f32; 3] = [0.98, 0.98, 0.98];
const BLUSH: [f32; 3] = [0.93, 0.55, 0.6];

/// Sheep body size in NDC height units
const BODY_SIZE: Vec2 = Vec2::new(0.24, 0.14);

/// Vertices needed to draw the background plus `max_sheep` sheep
pub fn scene_vertex_capacity(max_sheep: usize) -> usize {
    (BACKGROUND_QUADS + max_sheep * QUADS_PER_SHEEP) * VERTICES_PER_QUAD
}

/// Rebuild the scene mesh into `out`
///
/// # Arguments
/// * `field` - Sheep sprites to draw
/// * `aspect` - Window width / height (keeps sheep from stretching)
/// * `max_sheep` - Sprites beyond this are skipped
pub fn build_scene(field: &Field, aspect: f32, max_sheep: usize, out: &mut Vec<Vertex>) {
    out.clear();
    let params = field.params();
    let x_scale = 1.0 / aspect.max(f32::EPSILON);

    // Ground below the lane band
    let ground_top = params.lane_center_y + params.lane_spread + 0.2;
    push_rect(out, Vec2::new(-1.0, -1.0), Vec2::new(1.0, ground_top), GRASS);
    push_rect(
        out,
        Vec2::new(-1.0, ground_top - 0.03),
        Vec2::new(1.0, ground_top),
        HORIZON,
    );

    let crossing = params.crossing_duration();
    let half_width = BODY_SIZE.x * x_scale;
    for sprite in field.sprites().iter().take(max_sheep) {
        let progress = sprite.progress(crossing);
        let x = -1.0 - half_width + progress * (2.0 + 2.0 * half_width);
        let hop = (progress * params.hops_per_crossing * PI).sin().abs() * 0.03;
        let stride = (progress * params.hops_per_crossing * 2.0 * PI).sin() * 0.012;
        let center = Vec2::new(x, params.lane_center_y + sprite.lane_offset + hop);
        push_sheep(out, center, stride, x_scale);
    }
}

fn push_sheep(out: &mut Vec<Vertex>, center: Vec2, stride: f32, x_scale: f32) {
    // Offsets are authored in height units, then squeezed horizontally
    let part = |offset: Vec2, size: Vec2| {
        let scaled = Vec2::new(offset.x * x_scale, offset.y);
        let half = Vec2::new(size.x * x_scale, size.y) / 2.0;
        (center + scaled - half, center + scaled + half)
    };

    let legs = [
        (Vec2::new(0.06 + stride, -0.09), FACE),
        (Vec2::new(-0.06 - stride, -0.09), FACE),
    ];
    for (offset, color) in legs {
        let (min, max) = part(offset, Vec2::new(0.025, 0.07));
        push_rect(out, min, max, color);
    }

    let (min, max) = part(Vec2::ZERO, BODY_SIZE);
    push_rect(out, min, max, WOOL);
    let (min, max) = part(Vec2::new(-0.02, 0.06), Vec2::new(0.16, 0.05));
    push_rect(out, min, max, WOOL_SHADE);

    let (min, max) = part(Vec2::new(0.14, 0.04), Vec2::new(0.09, 0.09));
    push_rect(out, min, max, FACE);
    let (min, max) = part(Vec2::new(0.11, 0.085), Vec2::new(0.035, 0.025));
    push_rect(out, min, max, FACE);
    let (min, max) = part(Vec2::new(0.155, 0.055), Vec2::new(0.018, 0.018));
    push_rect(out, min, max, EYE);
    let (min, max) = part(Vec2::new(0.165, 0.02), Vec2::new(0.022, 0.014));
    push_rect(out, min, max, BLUSH);
}

/// Axis-aligned rectangle as two triangles
fn push_rect(out: &mut Vec<Vertex>, min: Vec2, max: Vec2, color: [f32; 3]) {
    let corners = [
        [min.x, min.y],
        [max.x, min.y],
        [max.x, max.y],
        [min.x, min.y],
        [max.x, max.y],
        [min.x, max.y],
    ];
    out.extend(corners.iter().map(|&position| Vertex { position, color }));
}
