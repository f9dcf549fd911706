use std::cell::RefCell;
use std::rc::Rc;

use wasm_bindgen::{closure::Closure, JsCast};
use web_sys::Window;

use crate::error::EffectError;
use crate::scheduler::{FrameHandle, FrameHost};

/// `requestAnimationFrame` callback slot.
///
/// The closure has to exist before it can be handed to the browser, but it
/// also needs the effect it drives, which needs this host. Keeping it in an
/// `Option` lets the host be built empty and the closure stored afterwards.
pub(crate) type FrameCallback = Rc<RefCell<Option<Closure<dyn FnMut(f64)>>>>;

pub(crate) struct AnimationFrames {
    window: Window,
    callback: FrameCallback,
}

impl AnimationFrames {
    /// Returns the host and the slot its callback must be stored in.
    pub(crate) fn new(window: Window) -> (Self, FrameCallback) {
        let callback: FrameCallback = Rc::new(RefCell::new(None));
        (
            Self {
                window,
                callback: callback.clone(),
            },
            callback,
        )
    }
}

impl FrameHost for AnimationFrames {
    fn request_frame(&mut self) -> Result<FrameHandle, EffectError> {
        let slot = self.callback.borrow();
        let callback = slot
            .as_ref()
            .ok_or_else(|| EffectError::Resource("frame callback not attached".into()))?;
        let id = self
            .window
            .request_animation_frame(callback.as_ref().unchecked_ref())?;
        Ok(FrameHandle(id))
    }

    fn cancel_frame(&mut self, handle: FrameHandle) {
        if let Err(err) = self.window.cancel_animation_frame(handle.0) {
            log::warn!("cancelAnimationFrame failed: {err:?}");
        }
    }
}
