//! Decorative GPU backdrops for web pages: an aurora grid surface and a
//! particle field, each bound to a host container and rendered with WebGL2.
//!
//! Everything outside [`wasm`] is platform independent and tested natively;
//! the browser glue is compiled only for `wasm32`.

pub mod backend;
pub mod camera;
pub mod config;
pub mod effect;
pub mod error;
pub mod gate;
pub mod geometry;
pub mod lifecycle;
pub mod palette;
pub mod scheduler;
pub mod shader;
pub mod uniforms;

#[cfg(test)]
mod testing;

pub use config::EffectKind;
pub use error::{EffectError, PaletteError};
pub use palette::{Color, Palette};

#[cfg(target_arch = "wasm32")]
pub use wasm::{rescan, start, teardown};

// Only compile wasm-specific code when targeting wasm32.
#[cfg(target_arch = "wasm32")]
mod wasm {
    use wasm_bindgen::prelude::*;

    mod dom;
    mod frames;
    mod render;
    mod runtime;

    /// Module entry point. Safe to call again; later calls only rescan.
    #[wasm_bindgen(start)]
    pub fn start() -> Result<(), JsValue> {
        console_error_panic_hook::set_once();
        // a second init (module re-instantiated) keeps the first logger
        console_log::init_with_level(log::Level::Info).ok();

        runtime::install().map_err(|err| JsValue::from_str(&err.to_string()))
    }

    /// Start effects for containers added since the last scan and release
    /// those whose container left the document.
    #[wasm_bindgen]
    pub fn rescan() {
        runtime::scan();
    }

    /// Dispose every running effect.
    #[wasm_bindgen]
    pub fn teardown() {
        runtime::teardown_all();
    }
}
