//! The seam between effect logic and the GPU API that draws it.

use glam::Mat4;

use crate::error::EffectError;
use crate::geometry::{MeshData, Viewport};
use crate::shader::ShaderProgram;
use crate::uniforms::Uniforms;

/// Opaque id for a mesh (buffers + program) living on the GPU.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MeshHandle(pub u32);

/// Everything a draw call reads, assembled on the frame that issues it.
#[derive(Clone, Copy, Debug)]
pub struct DrawParams<'a> {
    pub uniforms: &'a Uniforms,
    pub model: Mat4,
    pub view: Mat4,
    pub projection: Mat4,
}

/// A rendering context bound to one canvas and owned by one effect.
pub trait RenderBackend {
    /// Resize the drawing buffer. `max_pixel_ratio` caps the device ratio.
    fn resize(&mut self, viewport: &Viewport, max_pixel_ratio: f64);

    /// Upload `mesh` and compile `program`, returning a handle for drawing.
    fn create_mesh(&mut self, mesh: &MeshData, program: &ShaderProgram)
        -> Result<MeshHandle, EffectError>;

    /// Clear the target and draw one mesh.
    fn draw(&mut self, mesh: MeshHandle, params: &DrawParams<'_>) -> Result<(), EffectError>;

    /// Free the buffers and program behind `mesh`. Unknown handles are ignored.
    fn release_mesh(&mut self, mesh: MeshHandle);

    /// Free every remaining GPU object and give up the context.
    fn release(&mut self);
}
