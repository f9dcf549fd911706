//! Host-page plumbing: markup contract, environment probes, event wiring.

use wasm_bindgen::{closure::Closure, JsCast, JsValue};
use web_sys::{
    AddEventListenerOptions, Element, Event, EventTarget, HtmlCanvasElement, HtmlElement,
    MutationObserver, MutationObserverInit, WebGl2RenderingContext, WebglLoseContext, Window,
};

use crate::config::EffectKind;
use crate::error::EffectError;
use crate::gate::Environment;
use crate::geometry::Viewport;
use crate::palette::Palette;

pub(crate) mod markup {
    /// Presence marks an aurora host container.
    pub(crate) const AURORA_SELECTOR: &str = "[data-aurora-backdrop]";
    /// Optional `colorA,colorB,colorC` override on the container.
    pub(crate) const COLORS_ATTR: &str = "data-colors";
    pub(crate) const AURORA_FALLBACK: &str = ".aurora-backdrop__fallback";
    pub(crate) const HIDDEN_ATTR: &str = "data-hidden";
    pub(crate) const READY_CLASS: &str = "is-ready";

    pub(crate) const PARTICLE_CANVAS_ID: &str = "gl-canvas";
    pub(crate) const PARTICLE_FALLBACK: &str = ".particle-fallback";

    /// `window.backdropDefaults.particleColors`
    pub(crate) const PAGE_DEFAULTS: &str = "backdropDefaults";
    pub(crate) const PAGE_PARTICLE_COLORS: &str = "particleColors";
}

impl From<JsValue> for EffectError {
    fn from(value: JsValue) -> Self {
        let message = value
            .as_string()
            .or_else(|| {
                value
                    .dyn_ref::<js_sys::Error>()
                    .map(|err| String::from(err.message()))
            })
            .unwrap_or_else(|| format!("{value:?}"));
        EffectError::Js(message)
    }
}

pub(crate) struct BrowserEnvironment<'a> {
    window: &'a Window,
}

impl<'a> BrowserEnvironment<'a> {
    pub(crate) fn new(window: &'a Window) -> Self {
        Self { window }
    }
}

impl Environment for BrowserEnvironment<'_> {
    fn probe_gpu(&self) -> Result<bool, EffectError> {
        let document = self
            .window
            .document()
            .ok_or_else(|| EffectError::Js("no document".into()))?;
        // never attached to the page; dropped when this returns
        let scratch: HtmlCanvasElement = document
            .create_element("canvas")?
            .dyn_into()
            .map_err(|_| EffectError::Js("createElement(canvas) is not a canvas".into()))?;

        let Some(context) = scratch.get_context("webgl2")? else {
            return Ok(false);
        };
        if let Ok(gl) = context.dyn_into::<WebGl2RenderingContext>() {
            if let Ok(Some(ext)) = gl.get_extension("WEBGL_lose_context") {
                ext.unchecked_into::<WebglLoseContext>().lose_context();
            }
            return Ok(true);
        }
        Ok(false)
    }

    fn prefers_reduced_motion(&self) -> bool {
        matches!(
            self.window.match_media("(prefers-reduced-motion: reduce)"),
            Ok(Some(query)) if query.matches()
        )
    }
}

/// Current window size in CSS pixels plus the device pixel ratio.
pub(crate) fn viewport_of(window: &Window) -> Viewport {
    let dimension = |value: Result<JsValue, JsValue>| {
        value.ok().and_then(|v| v.as_f64()).unwrap_or(1.0)
    };
    Viewport::new(
        dimension(window.inner_width()),
        dimension(window.inner_height()),
        window.device_pixel_ratio(),
    )
}

/// `window.backdropDefaults.particleColors`, when the page defines it.
fn page_particle_colors(window: &Window) -> Option<JsValue> {
    js_sys::Reflect::get(window, &markup::PAGE_DEFAULTS.into())
        .ok()
        .filter(JsValue::is_object)
        .and_then(|defaults| js_sys::Reflect::get(&defaults, &markup::PAGE_PARTICLE_COLORS.into()).ok())
        .filter(|colors| !colors.is_undefined() && !colors.is_null())
}

/// Whether the page configured a particle field it expects to see.
pub(crate) fn page_expects_particles(window: &Window) -> bool {
    page_particle_colors(window).is_some()
}

/// Particle palette published by the page, if any.
pub(crate) fn page_particle_palette(window: &Window) -> Palette {
    let default = EffectKind::Particles.config().default_palette;
    match page_particle_colors(window).filter(js_sys::Array::is_array) {
        Some(list) => {
            let entries: Vec<String> = js_sys::Array::from(&list)
                .iter()
                .map(|entry| entry.as_string().unwrap_or_default())
                .collect();
            Palette::from_entries(entries, default)
        }
        None => default,
    }
}

/// The static content a container shows while no effect is drawing.
pub(crate) enum Fallback {
    /// `.aurora-backdrop__fallback` inside the container, plus the
    /// container's ready class.
    Aurora {
        container: Element,
        fallback: Option<Element>,
    },
    /// `.particle-fallback` next to the canvas.
    Particles { fallback: Option<HtmlElement> },
}

impl Fallback {
    pub(crate) fn aurora(container: &Element) -> Self {
        let fallback = container
            .query_selector(markup::AURORA_FALLBACK)
            .ok()
            .flatten();
        Fallback::Aurora {
            container: container.clone(),
            fallback,
        }
    }

    pub(crate) fn particles(canvas: &HtmlCanvasElement) -> Self {
        let fallback = canvas
            .parent_element()
            .and_then(|parent| parent.query_selector(markup::PARTICLE_FALLBACK).ok().flatten())
            .and_then(|el| el.dyn_into::<HtmlElement>().ok());
        Fallback::Particles { fallback }
    }

    /// First frame is on screen: get the fallback out of the way.
    pub(crate) fn hide(&self) {
        let result = match self {
            Fallback::Aurora {
                container,
                fallback,
            } => fallback
                .as_ref()
                .map_or(Ok(()), |el| el.set_attribute(markup::HIDDEN_ATTR, "true"))
                .and_then(|()| container.class_list().add_1(markup::READY_CLASS)),
            Fallback::Particles { fallback: Some(el) } => {
                let style = el.style();
                style
                    .set_property("transition", "opacity 0.6s ease")
                    .and_then(|()| style.set_property("opacity", "0"))
                    .and_then(|()| style.set_property("pointer-events", "none"))
            }
            Fallback::Particles { fallback: None } => Ok(()),
        };
        if let Err(err) = result {
            log::warn!("could not hide fallback: {err:?}");
        }
    }

    /// The effect is gone: put the container back in its pre-activation state.
    pub(crate) fn show(&self) {
        let result = match self {
            Fallback::Aurora {
                container,
                fallback,
            } => fallback
                .as_ref()
                .map_or(Ok(()), |el| el.remove_attribute(markup::HIDDEN_ATTR))
                .and_then(|()| container.class_list().remove_1(markup::READY_CLASS)),
            Fallback::Particles { fallback: Some(el) } => {
                let style = el.style();
                style
                    .remove_property("opacity")
                    .and_then(|_| style.remove_property("pointer-events"))
                    .map(|_| ())
            }
            Fallback::Particles { fallback: None } => Ok(()),
        };
        if let Err(err) = result {
            log::warn!("could not restore fallback: {err:?}");
        }
    }
}

/// A passive DOM listener, removed when dropped.
pub(crate) struct EventListener {
    target: EventTarget,
    event: &'static str,
    callback: Closure<dyn FnMut(Event)>,
}

impl EventListener {
    pub(crate) fn new<F>(target: &EventTarget, event: &'static str, handler: F) -> Result<Self, EffectError>
    where
        F: FnMut(Event) + 'static,
    {
        let callback = Closure::wrap(Box::new(handler) as Box<dyn FnMut(Event)>);
        let options = AddEventListenerOptions::new();
        options.set_passive(true);
        target.add_event_listener_with_callback_and_add_event_listener_options(
            event,
            callback.as_ref().unchecked_ref(),
            &options,
        )?;
        Ok(Self {
            target: target.clone(),
            event,
            callback,
        })
    }
}

impl Drop for EventListener {
    fn drop(&mut self) {
        if let Err(err) = self
            .target
            .remove_event_listener_with_callback(self.event, self.callback.as_ref().unchecked_ref())
        {
            log::warn!("removeEventListener({}) failed: {err:?}", self.event);
        }
    }
}

/// Watches one attribute on one element; disconnects when dropped.
pub(crate) struct AttributeWatch {
    observer: MutationObserver,
    _callback: Closure<dyn FnMut(js_sys::Array, MutationObserver)>,
}

impl AttributeWatch {
    pub(crate) fn new<F>(target: &Element, attribute: &str, mut on_change: F) -> Result<Self, EffectError>
    where
        F: FnMut() + 'static,
    {
        let callback = Closure::wrap(Box::new(move |_records: js_sys::Array, _observer: MutationObserver| {
            on_change();
        }) as Box<dyn FnMut(js_sys::Array, MutationObserver)>);
        let observer = MutationObserver::new(callback.as_ref().unchecked_ref())?;

        let init = MutationObserverInit::new();
        init.set_attributes(true);
        init.set_attribute_filter(&js_sys::Array::of1(&attribute.into()));
        observer.observe_with_options(target, &init)?;

        Ok(Self {
            observer,
            _callback: callback,
        })
    }

    pub(crate) fn disconnect(&self) {
        self.observer.disconnect();
    }
}

impl Drop for AttributeWatch {
    fn drop(&mut self) {
        self.observer.disconnect();
    }
}
