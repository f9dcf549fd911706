//! Per-frame values shared between the scheduler and the shader program.

use glam::Vec2;

use crate::geometry::Viewport;
use crate::palette::Palette;

/// Map a client-space pointer position to normalized device coordinates.
///
/// The result is clamped to `[-1, 1]` on both axes with y pointing up.
pub fn pointer_ndc(client_x: f64, client_y: f64, viewport: &Viewport) -> Vec2 {
    let x = (client_x / viewport.width) * 2.0 - 1.0;
    let y = -(client_y / viewport.height) * 2.0 + 1.0;
    Vec2::new(x as f32, y as f32).clamp(Vec2::NEG_ONE, Vec2::ONE)
}

/// The typed uniform block.
///
/// `colors` is fixed for the life of the block; a palette change builds a
/// new surface and a new block.
#[derive(Clone, Debug, PartialEq)]
pub struct Uniforms {
    /// Seconds on the host's monotonic clock.
    pub time: f32,
    /// Latest raw pointer position in NDC.
    pub pointer: Vec2,
    /// Low-passed pointer, the value the shaders see.
    pub eased_pointer: Vec2,
    pub resolution: Vec2,
    colors: Palette,
}

impl Uniforms {
    pub fn new(viewport: &Viewport, colors: Palette) -> Self {
        Self {
            time: 0.0,
            pointer: Vec2::ZERO,
            eased_pointer: Vec2::ZERO,
            resolution: Vec2::new(viewport.width as f32, viewport.height as f32),
            colors,
        }
    }

    pub fn colors(&self) -> &Palette {
        &self.colors
    }

    /// Same live values under a different palette.
    pub fn with_colors(&self, colors: Palette) -> Self {
        Self {
            colors,
            ..self.clone()
        }
    }

    pub fn set_resolution(&mut self, viewport: &Viewport) {
        self.resolution = Vec2::new(viewport.width as f32, viewport.height as f32);
    }

    /// One step of `eased += (pointer - eased) * k`.
    ///
    /// Deliberately per-frame rather than per-second, so the smoothing rate
    /// follows the display refresh rate.
    pub fn ease_pointer(&mut self, k: f32) {
        self.eased_pointer = self.eased_pointer.lerp(self.pointer, k);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::palette::AURORA_DEFAULT;

    #[test]
    fn ndc_corners_and_center() {
        let vp = Viewport::new(800.0, 600.0, 1.0);
        assert_eq!(pointer_ndc(0.0, 0.0, &vp), Vec2::new(-1.0, 1.0));
        assert_eq!(pointer_ndc(800.0, 600.0, &vp), Vec2::new(1.0, -1.0));
        assert_eq!(pointer_ndc(400.0, 300.0, &vp), Vec2::ZERO);
    }

    #[test]
    fn ndc_is_clamped() {
        let vp = Viewport::new(100.0, 100.0, 1.0);
        assert_eq!(pointer_ndc(-50.0, 250.0, &vp), Vec2::new(-1.0, -1.0));
    }

    #[test]
    fn eased_pointer_converges_monotonically() {
        let vp = Viewport::new(100.0, 100.0, 1.0);
        let mut u = Uniforms::new(&vp, AURORA_DEFAULT);
        u.pointer = Vec2::new(0.9, -0.7);

        let mut last = u.eased_pointer.distance(u.pointer);
        let mut steps = 0;
        while last > 1e-4 {
            u.ease_pointer(0.08);
            let d = u.eased_pointer.distance(u.pointer);
            assert!(d < last, "distance went from {last} to {d}");
            last = d;
            steps += 1;
            assert!(steps < 1000);
        }
    }

    #[test]
    fn resolution_tracks_viewport() {
        let mut u = Uniforms::new(&Viewport::new(10.0, 20.0, 1.0), AURORA_DEFAULT);
        assert_eq!(u.resolution, Vec2::new(10.0, 20.0));
        u.set_resolution(&Viewport::new(640.0, 480.0, 2.0));
        assert_eq!(u.resolution, Vec2::new(640.0, 480.0));
    }
}
