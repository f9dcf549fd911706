//! Headless stand-ins for the browser, used by unit tests.

use std::cell::RefCell;
use std::rc::Rc;

use crate::backend::{DrawParams, MeshHandle, RenderBackend};
use crate::error::EffectError;
use crate::gate::Environment;
use crate::geometry::{MeshData, Viewport};
use crate::scheduler::{FrameHandle, FrameHost};
use crate::shader::ShaderProgram;

#[derive(Default)]
struct FramesLog {
    next: i32,
    requested: usize,
    cancelled: usize,
}

/// Frame host whose callbacks only fire when a test says so.
#[derive(Clone, Default)]
pub(crate) struct ManualFrames(Rc<RefCell<FramesLog>>);

impl ManualFrames {
    pub(crate) fn requested(&self) -> usize {
        self.0.borrow().requested
    }

    pub(crate) fn cancelled(&self) -> usize {
        self.0.borrow().cancelled
    }
}

impl FrameHost for ManualFrames {
    fn request_frame(&mut self) -> Result<FrameHandle, EffectError> {
        let mut log = self.0.borrow_mut();
        log.next += 1;
        log.requested += 1;
        Ok(FrameHandle(log.next))
    }

    fn cancel_frame(&mut self, _handle: FrameHandle) {
        self.0.borrow_mut().cancelled += 1;
    }
}

#[derive(Default)]
pub(crate) struct BackendLog {
    pub(crate) live_meshes: Vec<MeshHandle>,
    pub(crate) created: usize,
    pub(crate) released: usize,
    pub(crate) draws: usize,
    pub(crate) resizes: Vec<(u32, u32)>,
    pub(crate) last_vertex_count: usize,
    pub(crate) context_released: bool,
    pub(crate) fail_create: bool,
    pub(crate) fail_draw: bool,
}

/// Backend that records calls instead of touching a GPU.
#[derive(Clone, Default)]
pub(crate) struct RecordingBackend(pub(crate) Rc<RefCell<BackendLog>>);

impl RecordingBackend {
    pub(crate) fn log(&self) -> std::cell::Ref<'_, BackendLog> {
        self.0.borrow()
    }

    pub(crate) fn failing_create() -> Self {
        let backend = Self::default();
        backend.0.borrow_mut().fail_create = true;
        backend
    }
}

impl RenderBackend for RecordingBackend {
    fn resize(&mut self, viewport: &Viewport, max_pixel_ratio: f64) {
        self.0.borrow_mut().resizes.push(viewport.buffer_size(max_pixel_ratio));
    }

    fn create_mesh(
        &mut self,
        mesh: &MeshData,
        _program: &ShaderProgram,
    ) -> Result<MeshHandle, EffectError> {
        let mut log = self.0.borrow_mut();
        if log.fail_create || log.context_released {
            return Err(EffectError::ShaderCompile {
                stage: "vertex",
                log: "stub failure".into(),
            });
        }
        log.created += 1;
        log.last_vertex_count = mesh.vertex_count;
        let handle = MeshHandle(log.created as u32);
        log.live_meshes.push(handle);
        Ok(handle)
    }

    fn draw(&mut self, mesh: MeshHandle, _params: &DrawParams<'_>) -> Result<(), EffectError> {
        let mut log = self.0.borrow_mut();
        if log.fail_draw || !log.live_meshes.contains(&mesh) {
            return Err(EffectError::Resource(format!("cannot draw {mesh:?}")));
        }
        log.draws += 1;
        Ok(())
    }

    fn release_mesh(&mut self, mesh: MeshHandle) {
        let mut log = self.0.borrow_mut();
        if let Some(pos) = log.live_meshes.iter().position(|m| *m == mesh) {
            log.live_meshes.remove(pos);
            log.released += 1;
        }
    }

    fn release(&mut self) {
        let mut log = self.0.borrow_mut();
        log.released += log.live_meshes.len();
        log.live_meshes.clear();
        log.context_released = true;
    }
}

/// Fixed answers for the capability gate.
pub(crate) struct StubEnvironment {
    pub(crate) gpu: Result<bool, EffectError>,
    pub(crate) reduced_motion: bool,
}

impl Environment for StubEnvironment {
    fn probe_gpu(&self) -> Result<bool, EffectError> {
        self.gpu.clone()
    }

    fn prefers_reduced_motion(&self) -> bool {
        self.reduced_motion
    }
}
