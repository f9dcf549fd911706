//! Per-effect tuning. Values are fixed at compile time; the only runtime
//! override is the palette, which comes from host markup.

use crate::palette::{Palette, AURORA_DEFAULT, PARTICLES_DEFAULT};

/// Pointer smoothing must stay inside this band.
pub const SMOOTHING_RANGE: std::ops::RangeInclusive<f32> = 0.05..=0.08;

/// The two effects this crate knows how to draw.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EffectKind {
    /// Deformable grid surface with glow, noise and shimmer.
    Aurora,
    /// Point cloud in a spherical shell, blended additively.
    Particles,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlendMode {
    /// Standard `src_alpha, one_minus_src_alpha`.
    Alpha,
    /// `src_alpha, one`; depth writes off so overlaps brighten.
    Additive,
}

#[derive(Clone, Debug, PartialEq)]
pub struct EffectConfig {
    pub kind: EffectKind,
    pub default_palette: Palette,
    /// Fraction of the remaining pointer distance covered per frame.
    pub pointer_smoothing: f32,
    /// Upper bound applied to `devicePixelRatio`.
    pub max_pixel_ratio: f64,
    pub blend: BlendMode,
}

static AURORA: EffectConfig = EffectConfig {
    kind: EffectKind::Aurora,
    default_palette: AURORA_DEFAULT,
    pointer_smoothing: 0.08,
    max_pixel_ratio: 2.0,
    blend: BlendMode::Alpha,
};

static PARTICLES: EffectConfig = EffectConfig {
    kind: EffectKind::Particles,
    default_palette: PARTICLES_DEFAULT,
    pointer_smoothing: 0.05,
    max_pixel_ratio: 1.8,
    blend: BlendMode::Additive,
};

impl EffectKind {
    pub fn config(self) -> &'static EffectConfig {
        match self {
            EffectKind::Aurora => &AURORA,
            EffectKind::Particles => &PARTICLES,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            EffectKind::Aurora => "aurora",
            EffectKind::Particles => "particles",
        }
    }
}
