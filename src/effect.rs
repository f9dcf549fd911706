//! One running effect bound to one host container.

use glam::{Vec2, Vec3};
use rand::rngs::SmallRng;

use crate::backend::{DrawParams, MeshHandle, RenderBackend};
use crate::camera::{model_matrix, Camera};
use crate::config::{EffectConfig, EffectKind};
use crate::error::EffectError;
use crate::geometry::{aurora_surface, particle_count, particle_field, MeshData, Viewport};
use crate::palette::Palette;
use crate::scheduler::{FrameHost, FrameScheduler, SchedulerState};
use crate::shader::ShaderProgram;
use crate::uniforms::{pointer_ndc, Uniforms};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameOutcome {
    /// Not running (idle, paused or disposed); nothing was touched.
    Skipped,
    /// One draw call was issued. `first` is set on the very first one.
    Drawn { first: bool },
}

/// Owns the rendering context, the mesh, the uniforms and the frame loop of
/// a single effect. Once disposed, every method is a no-op.
pub struct EffectInstance<B: RenderBackend, H: FrameHost> {
    kind: EffectKind,
    config: &'static EffectConfig,
    backend: B,
    scheduler: FrameScheduler<H>,
    mesh: Option<MeshHandle>,
    vertex_count: usize,
    camera: Camera,
    rotation: Vec3,
    uniforms: Uniforms,
    viewport: Viewport,
    rng: SmallRng,
    frames_drawn: u64,
    disposed: bool,
}

impl<B: RenderBackend, H: FrameHost> EffectInstance<B, H> {
    /// Build the surface and upload it. The scheduler stays idle until
    /// [`start`](Self::start). On failure the backend is released before
    /// returning.
    pub fn new(
        kind: EffectKind,
        backend: B,
        frames: H,
        palette: Palette,
        viewport: Viewport,
        rng: SmallRng,
    ) -> Result<Self, EffectError> {
        let config = kind.config();
        let camera = match kind {
            EffectKind::Aurora => Camera::Orthographic,
            EffectKind::Particles => Camera::perspective(viewport.aspect()),
        };

        let mut instance = Self {
            kind,
            config,
            backend,
            scheduler: FrameScheduler::new(frames),
            mesh: None,
            vertex_count: 0,
            camera,
            rotation: Vec3::ZERO,
            uniforms: Uniforms::new(&viewport, palette),
            viewport,
            rng,
            frames_drawn: 0,
            disposed: false,
        };
        instance.backend.resize(&viewport, config.max_pixel_ratio);

        match instance.build_surface() {
            Ok(()) => Ok(instance),
            Err(err) => {
                instance.dispose();
                Err(err)
            }
        }
    }

    pub fn kind(&self) -> EffectKind {
        self.kind
    }

    pub fn uniforms(&self) -> &Uniforms {
        &self.uniforms
    }

    pub fn state(&self) -> SchedulerState {
        self.scheduler.state()
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Vertices (aurora) or points (particles) in the current mesh.
    pub fn vertex_count(&self) -> usize {
        self.vertex_count
    }

    pub fn frames_drawn(&self) -> u64 {
        self.frames_drawn
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn rotation(&self) -> Vec3 {
        self.rotation
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn start(&mut self) -> Result<(), EffectError> {
        if self.disposed {
            return Ok(());
        }
        self.scheduler.start()
    }

    /// Run one frame at host time `now_ms` (milliseconds, monotonic).
    pub fn frame(&mut self, now_ms: f64) -> Result<FrameOutcome, EffectError> {
        if self.disposed || !self.scheduler.begin_frame() {
            return Ok(FrameOutcome::Skipped);
        }
        let mesh = self
            .mesh
            .ok_or_else(|| EffectError::Resource("no mesh to draw".into()))?;

        self.uniforms.time = (now_ms * 0.001) as f32;
        self.uniforms.ease_pointer(self.config.pointer_smoothing);
        self.advance_transform(now_ms);

        let params = DrawParams {
            uniforms: &self.uniforms,
            model: model_matrix(self.rotation),
            view: self.camera.view(),
            projection: self.camera.projection(),
        };
        self.backend.draw(mesh, &params)?;
        self.frames_drawn += 1;

        self.scheduler.reschedule()?;
        Ok(FrameOutcome::Drawn {
            first: self.frames_drawn == 1,
        })
    }

    /// Set the raw pointer target from NDC.
    pub fn set_pointer(&mut self, ndc: Vec2) {
        if self.disposed {
            return;
        }
        self.uniforms.pointer = ndc.clamp(Vec2::NEG_ONE, Vec2::ONE);
    }

    /// Set the raw pointer target from client (CSS pixel) coordinates.
    pub fn pointer_moved(&mut self, client_x: f64, client_y: f64) {
        let ndc = pointer_ndc(client_x, client_y, &self.viewport);
        self.set_pointer(ndc);
    }

    /// Partial rebuild: drawing buffer, resolution and camera aspect always;
    /// the particle mesh only when its count changes.
    pub fn resize(&mut self, viewport: Viewport) -> Result<(), EffectError> {
        if self.disposed {
            return Ok(());
        }
        self.viewport = viewport;
        self.backend.resize(&viewport, self.config.max_pixel_ratio);
        self.uniforms.set_resolution(&viewport);
        self.camera.set_aspect(viewport.aspect());

        if self.kind == EffectKind::Particles {
            let count = particle_count(viewport.width, viewport.height);
            if count != self.vertex_count {
                log::debug!("particle count {} -> {count}", self.vertex_count);
                self.build_surface()?;
            }
        }
        Ok(())
    }

    /// Swap the palette. Geometry and program are rebuilt; time and pointer
    /// smoothing carry over.
    pub fn set_palette(&mut self, palette: Palette) -> Result<(), EffectError> {
        if self.disposed || *self.uniforms.colors() == palette {
            return Ok(());
        }
        self.uniforms = self.uniforms.with_colors(palette);
        self.build_surface()
    }

    /// Tab visibility changed. Hidden pauses; visible resumes immediately.
    pub fn set_hidden(&mut self, hidden: bool) -> Result<(), EffectError> {
        if self.disposed {
            return Ok(());
        }
        if hidden {
            self.scheduler.pause();
            Ok(())
        } else {
            self.scheduler.resume()
        }
    }

    /// Cancel the frame loop and free every GPU object, synchronously.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.scheduler.dispose();
        if let Some(mesh) = self.mesh.take() {
            self.backend.release_mesh(mesh);
        }
        self.backend.release();
        self.disposed = true;
        log::debug!("{} effect disposed", self.kind.name());
    }

    fn generate(&mut self) -> MeshData {
        match self.kind {
            EffectKind::Aurora => aurora_surface(&mut self.rng),
            EffectKind::Particles => {
                let count = particle_count(self.viewport.width, self.viewport.height);
                particle_field(count, &mut self.rng)
            }
        }
    }

    /// Replace the mesh: new vertex data first, then free the old GPU
    /// objects, then upload.
    fn build_surface(&mut self) -> Result<(), EffectError> {
        let data = self.generate();
        data.validate()?;
        let program = ShaderProgram::for_kind(self.kind);

        if let Some(old) = self.mesh.take() {
            self.backend.release_mesh(old);
        }
        let handle = self.backend.create_mesh(&data, &program)?;
        self.mesh = Some(handle);
        self.vertex_count = data.vertex_count;
        Ok(())
    }

    fn advance_transform(&mut self, now_ms: f64) {
        match self.kind {
            EffectKind::Aurora => {
                self.rotation.z = ((now_ms * 0.0005).sin() * 0.1) as f32;
                self.rotation.x = ((now_ms * 0.0003).cos() * 0.05) as f32;
            }
            EffectKind::Particles => {
                let eased = self.uniforms.eased_pointer;
                self.camera
                    .set_eye(Vec3::new(eased.x * 0.6, eased.y * 0.4, 8.0));
                self.rotation.y += 0.0008;
                self.rotation.x += (eased.y * 0.2 - self.rotation.x) * 0.02;
            }
        }
    }
}
