//! CPU-side vertex data for both effects.
//!
//! Per-vertex random attributes are drawn once here and stay fixed for the
//! lifetime of the mesh; all animation happens in the shaders.

use std::f32::consts::{PI, TAU};

use rand::Rng;

use crate::error::EffectError;

/// Segments per side of the aurora plane.
pub const AURORA_SEGMENTS: u32 = 64;

pub const MIN_PARTICLES: usize = 400;
pub const MAX_PARTICLES: usize = 3000;

/// CSS-pixel size of the area the effect covers.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
    pub pixel_ratio: f64,
}

impl Viewport {
    /// Zero or missing dimensions are treated as one pixel. Ratios below one
    /// (zoomed out) are kept; only missing or non-positive ratios become 1.
    pub fn new(width: f64, height: f64, pixel_ratio: f64) -> Self {
        let size = |v: f64| if v.is_finite() && v >= 1.0 { v } else { 1.0 };
        Self {
            width: size(width),
            height: size(height),
            pixel_ratio: if pixel_ratio.is_finite() && pixel_ratio > 0.0 {
                pixel_ratio
            } else {
                1.0
            },
        }
    }

    pub fn aspect(&self) -> f32 {
        (self.width / self.height) as f32
    }

    /// Drawing-buffer size in device pixels with the ratio capped at `max_ratio`.
    pub fn buffer_size(&self, max_ratio: f64) -> (u32, u32) {
        let ratio = self.pixel_ratio.min(max_ratio);
        (
            (self.width * ratio).round().max(1.0) as u32,
            (self.height * ratio).round().max(1.0) as u32,
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Primitive {
    Triangles,
    Points,
}

#[derive(Clone, Debug, PartialEq)]
pub struct VertexAttribute {
    /// Name of the `in` variable in the vertex shader.
    pub name: &'static str,
    /// Floats per vertex (1..=4).
    pub components: i32,
    pub data: Vec<f32>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct MeshData {
    pub primitive: Primitive,
    pub vertex_count: usize,
    pub attributes: Vec<VertexAttribute>,
    pub indices: Option<Vec<u16>>,
}

impl MeshData {
    pub fn attribute(&self, name: &str) -> Option<&VertexAttribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    /// Every attribute must cover every vertex and every index must be in range.
    pub fn validate(&self) -> Result<(), EffectError> {
        if self.vertex_count == 0 {
            return Err(EffectError::Geometry("mesh has no vertices".into()));
        }
        for attr in &self.attributes {
            if !(1..=4).contains(&attr.components) {
                return Err(EffectError::Geometry(format!(
                    "attribute {} has {} components",
                    attr.name, attr.components
                )));
            }
            let expected = self.vertex_count * attr.components as usize;
            if attr.data.len() != expected {
                return Err(EffectError::Geometry(format!(
                    "attribute {} has {} floats, expected {expected}",
                    attr.name,
                    attr.data.len()
                )));
            }
        }
        if let Some(indices) = &self.indices {
            if let Some(bad) = indices.iter().find(|&&i| i as usize >= self.vertex_count) {
                return Err(EffectError::Geometry(format!("index {bad} out of range")));
            }
        }
        Ok(())
    }
}

/// A 2x2 plane centred on the origin, `AURORA_SEGMENTS` segments per side.
///
/// Rows run from the top edge (y = 1, uv.y = 1) downwards.
pub fn aurora_surface<R: Rng + ?Sized>(rng: &mut R) -> MeshData {
    let segs = AURORA_SEGMENTS;
    let row = segs + 1;
    let count = (row * row) as usize;

    let mut position = Vec::with_capacity(count * 3);
    let mut uv = Vec::with_capacity(count * 2);
    for iy in 0..row {
        let v = iy as f32 / segs as f32;
        for ix in 0..row {
            let u = ix as f32 / segs as f32;
            position.extend_from_slice(&[u * 2.0 - 1.0, 1.0 - v * 2.0, 0.0]);
            uv.extend_from_slice(&[u, 1.0 - v]);
        }
    }

    let mut indices = Vec::with_capacity((segs * segs * 6) as usize);
    for iy in 0..segs {
        for ix in 0..segs {
            let a = (ix + row * iy) as u16;
            let b = (ix + row * (iy + 1)) as u16;
            let c = (ix + 1 + row * (iy + 1)) as u16;
            let d = (ix + 1 + row * iy) as u16;
            indices.extend_from_slice(&[a, b, d, b, c, d]);
        }
    }

    let mut scale: Vec<f32> = Vec::with_capacity(count);
    let mut phase: Vec<f32> = Vec::with_capacity(count);
    let mut velocity: Vec<f32> = Vec::with_capacity(count * 2);
    for _ in 0..count {
        scale.push(rng.random_range(0.5..1.0));
        phase.push(rng.random_range(0.0..TAU));
        velocity.push(rng.random_range(-0.01..0.01));
        velocity.push(rng.random_range(-0.01..0.01));
    }

    MeshData {
        primitive: Primitive::Triangles,
        vertex_count: count,
        attributes: vec![
            VertexAttribute { name: "position", components: 3, data: position },
            VertexAttribute { name: "uv", components: 2, data: uv },
            VertexAttribute { name: "aScale", components: 1, data: scale },
            VertexAttribute { name: "aPhase", components: 1, data: phase },
            VertexAttribute { name: "aVelocity", components: 2, data: velocity },
        ],
        indices: Some(indices),
    }
}

/// Number of particles for a viewport: `floor(sqrt(w * h) * 1.5)` clamped
/// to `[MIN_PARTICLES, MAX_PARTICLES]`.
pub fn particle_count(width: f64, height: f64) -> usize {
    let area = width.max(1.0) * height.max(1.0);
    let raw = (area.sqrt() * 1.5).floor() as usize;
    raw.clamp(MIN_PARTICLES, MAX_PARTICLES)
}

/// `count` points inside a spherical shell of radius 1.6..4.8.
pub fn particle_field<R: Rng + ?Sized>(count: usize, rng: &mut R) -> MeshData {
    let mut position = Vec::with_capacity(count * 3);
    let mut scale: Vec<f32> = Vec::with_capacity(count);
    let mut color_stop: Vec<f32> = Vec::with_capacity(count);

    for _ in 0..count {
        let radius: f32 = rng.random_range(1.6..4.8);
        let theta: f32 = rng.random_range(0.0..TAU);
        let phi: f32 = rng.random_range(0.0..PI);

        position.extend_from_slice(&[
            radius * phi.sin() * theta.cos(),
            radius * phi.sin() * theta.sin(),
            radius * phi.cos(),
        ]);
        scale.push(rng.random_range(0.6..1.6));
        color_stop.push(rng.random::<f32>());
    }

    MeshData {
        primitive: Primitive::Points,
        vertex_count: count,
        attributes: vec![
            VertexAttribute { name: "position", components: 3, data: position },
            VertexAttribute { name: "aScale", components: 1, data: scale },
            VertexAttribute { name: "aColorStop", components: 1, data: color_stop },
        ],
        indices: None,
    }
}
