//! Display-frame scheduling.
//!
//! The scheduler never runs a loop of its own; it asks the host for one
//! callback at a time and keeps the handle so the request can be cancelled.

use crate::error::EffectError;

/// Opaque id of a pending frame callback.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameHandle(pub i32);

/// The host's per-display-frame callback primitive.
pub trait FrameHost {
    fn request_frame(&mut self) -> Result<FrameHandle, EffectError>;
    fn cancel_frame(&mut self, handle: FrameHandle);
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Running,
    Paused,
    Disposed,
}

pub struct FrameScheduler<H: FrameHost> {
    host: H,
    state: SchedulerState,
    pending: Option<FrameHandle>,
}

impl<H: FrameHost> FrameScheduler<H> {
    pub fn new(host: H) -> Self {
        Self {
            host,
            state: SchedulerState::Idle,
            pending: None,
        }
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn pending(&self) -> Option<FrameHandle> {
        self.pending
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    /// `Idle -> Running`; requests the first frame.
    pub fn start(&mut self) -> Result<(), EffectError> {
        if self.state != SchedulerState::Idle {
            return Ok(());
        }
        self.state = SchedulerState::Running;
        self.request()
    }

    /// Called at the top of a frame callback. Consumes the pending handle
    /// and reports whether the frame should do any work.
    pub fn begin_frame(&mut self) -> bool {
        if self.state != SchedulerState::Running {
            return false;
        }
        self.pending = None;
        true
    }

    /// Queue the next frame if still running.
    pub fn reschedule(&mut self) -> Result<(), EffectError> {
        if self.state != SchedulerState::Running {
            return Ok(());
        }
        self.request()
    }

    /// `Running -> Paused`; cancels the pending frame and keeps all state.
    pub fn pause(&mut self) {
        if self.state != SchedulerState::Running {
            return;
        }
        self.cancel();
        self.state = SchedulerState::Paused;
    }

    /// `Paused -> Running`; requests a frame right away.
    pub fn resume(&mut self) -> Result<(), EffectError> {
        if self.state != SchedulerState::Paused {
            return Ok(());
        }
        self.state = SchedulerState::Running;
        self.request()
    }

    /// Terminal from any state. Repeated calls do nothing.
    pub fn dispose(&mut self) {
        if self.state == SchedulerState::Disposed {
            return;
        }
        self.cancel();
        self.state = SchedulerState::Disposed;
    }

    fn request(&mut self) -> Result<(), EffectError> {
        // never keep two callbacks in flight
        self.cancel();
        self.pending = Some(self.host.request_frame()?);
        Ok(())
    }

    fn cancel(&mut self) {
        if let Some(handle) = self.pending.take() {
            self.host.cancel_frame(handle);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ManualFrames;

    #[test]
    fn start_requests_one_frame() {
        let frames = ManualFrames::default();
        let mut s = FrameScheduler::new(frames.clone());
        s.start().unwrap();
        s.start().unwrap();
        assert_eq!(s.state(), SchedulerState::Running);
        assert_eq!(frames.requested(), 1);
        assert!(s.pending().is_some());
    }

    #[test]
    fn pause_cancels_and_resume_requests() {
        let frames = ManualFrames::default();
        let mut s = FrameScheduler::new(frames.clone());
        s.start().unwrap();
        s.pause();
        assert_eq!(s.state(), SchedulerState::Paused);
        assert_eq!(frames.cancelled(), 1);
        assert!(s.pending().is_none());
        assert!(!s.begin_frame());

        s.resume().unwrap();
        assert_eq!(s.state(), SchedulerState::Running);
        assert_eq!(frames.requested(), 2);
    }

    #[test]
    fn dispose_is_terminal_and_idempotent() {
        let frames = ManualFrames::default();
        let mut s = FrameScheduler::new(frames.clone());
        s.start().unwrap();
        s.dispose();
        s.dispose();
        assert_eq!(frames.cancelled(), 1);

        s.resume().unwrap();
        s.reschedule().unwrap();
        s.start().unwrap();
        assert_eq!(s.state(), SchedulerState::Disposed);
        assert_eq!(frames.requested(), 1);
        assert!(!s.begin_frame());
    }

    #[test]
    fn dispose_from_idle() {
        let frames = ManualFrames::default();
        let mut s = FrameScheduler::new(frames.clone());
        s.dispose();
        assert_eq!(s.state(), SchedulerState::Disposed);
        assert_eq!(frames.cancelled(), 0);
        assert_eq!(s.host().requested(), 0);
    }
}
