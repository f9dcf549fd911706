//! Page-wide activation: discovers host containers, starts one effect per
//! container and tears everything down on unload.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use rand::rngs::SmallRng;
use rand::SeedableRng;
use wasm_bindgen::{closure::Closure, JsCast};
use web_sys::{
    Document, Element, HtmlCanvasElement, MouseEvent, PageTransitionEvent, TouchEvent, Window,
};

use super::dom::{
    markup, page_expects_particles, page_particle_palette, viewport_of, AttributeWatch,
    BrowserEnvironment, EventListener, Fallback,
};
use super::frames::{AnimationFrames, FrameCallback};
use super::render::WebGlBackend;
use crate::config::EffectKind;
use crate::effect::{EffectInstance, FrameOutcome};
use crate::error::EffectError;
use crate::gate::CapabilityGate;
use crate::lifecycle::{EffectRegistry, Teardown};
use crate::palette::Palette;

type BrowserEffect = EffectInstance<WebGlBackend, AnimationFrames>;
type SharedInstance = Rc<RefCell<BrowserEffect>>;

thread_local! {
    static RUNTIME: RefCell<Option<Runtime>> = const { RefCell::new(None) };
}

/// What event handlers hold: a weak instance and the fallback to restore if
/// the instance fails.
#[derive(Clone)]
struct EffectHandle {
    instance: Weak<RefCell<BrowserEffect>>,
    fallback: Rc<Fallback>,
}

impl EffectHandle {
    /// Run `f` on a live instance; a failure stops that effect only.
    fn run<F>(&self, what: &str, f: F)
    where
        F: FnOnce(&mut BrowserEffect) -> Result<(), EffectError>,
    {
        let Some(instance) = self.instance.upgrade() else {
            return;
        };
        let result = f(&mut instance.borrow_mut());
        if let Err(err) = result {
            log::error!("{what} failed, stopping effect: {err}");
            instance.teardown();
            self.fallback.show();
        }
    }
}

/// An effect plus everything the page holds on its behalf.
struct ActiveEffect {
    instance: SharedInstance,
    fallback: Rc<Fallback>,
    _frame_callback: FrameCallback,
    _listeners: Vec<EventListener>,
    palette_watch: Option<AttributeWatch>,
}

impl ActiveEffect {
    fn handle(&self) -> EffectHandle {
        EffectHandle {
            instance: Rc::downgrade(&self.instance),
            fallback: self.fallback.clone(),
        }
    }
}

impl Teardown for ActiveEffect {
    fn teardown(&self) {
        self.instance.teardown();
        if let Some(watch) = &self.palette_watch {
            watch.disconnect();
        }
        self.fallback.show();
    }
}

struct Runtime {
    window: Window,
    document: Document,
    gate: CapabilityGate,
    aurora: EffectRegistry<Element, ActiveEffect>,
    particles: EffectRegistry<Element, ActiveEffect>,
    _page_hide: EventListener,
    _page_show: EventListener,
}

impl Runtime {
    fn scan(&mut self) {
        let env = BrowserEnvironment::new(&self.window);
        let allowed = self.gate.can_run(&env);
        if !allowed {
            log::info!("skipping activation; static fallbacks stay visible");
        }

        let containers = if allowed { self.aurora_containers() } else { Vec::new() };
        let canvas = if allowed { self.particle_canvas() } else { None };

        let window = &self.window;
        let aurora = self.aurora.rescan(
            allowed,
            containers,
            |el| el.is_connected(),
            |container| start_aurora(window, container),
        );
        let particles = self.particles.rescan(
            allowed,
            canvas,
            |el| el.is_connected(),
            |canvas| start_particles(window, canvas),
        );

        let pruned = aurora.pruned + particles.pruned;
        if pruned > 0 {
            log::info!("released {pruned} effect(s) whose container left the page");
        }
        log::debug!("started {} effect(s)", aurora.started + particles.started);
    }

    fn aurora_containers(&self) -> Vec<Element> {
        let list = match self.document.query_selector_all(markup::AURORA_SELECTOR) {
            Ok(list) => list,
            Err(err) => {
                log::error!("container query failed: {err:?}");
                return Vec::new();
            }
        };
        log::info!("found {} aurora container(s)", list.length());
        (0..list.length())
            .filter_map(|index| list.item(index))
            .filter_map(|node| node.dyn_into::<Element>().ok())
            .collect()
    }

    fn particle_canvas(&self) -> Option<Element> {
        let canvas = self.document.get_element_by_id(markup::PARTICLE_CANVAS_ID);
        if canvas.is_none() {
            if page_expects_particles(&self.window) {
                log::warn!("particle colors configured but no #{} canvas found", markup::PARTICLE_CANVAS_ID);
            } else {
                log::debug!("no #{} canvas on this page", markup::PARTICLE_CANVAS_ID);
            }
        }
        canvas
    }

    /// Pause or resume every effect without releasing anything.
    fn set_suspended(&mut self, suspended: bool) {
        for effect in self.aurora.values().chain(self.particles.values()) {
            effect
                .handle()
                .run(if suspended { "suspend" } else { "resume" }, |fx| fx.set_hidden(suspended));
        }
    }

    fn dispose_all(&mut self) {
        self.aurora.dispose_all();
        self.particles.dispose_all();
    }
}

fn start_aurora(window: &Window, container: &Element) -> Result<ActiveEffect, EffectError> {
    let canvas: HtmlCanvasElement = container
        .query_selector("canvas")?
        .ok_or_else(|| EffectError::MissingCanvas(markup::AURORA_SELECTOR.into()))?
        .dyn_into()
        .map_err(|_| EffectError::MissingCanvas(markup::AURORA_SELECTOR.into()))?;

    let default = EffectKind::Aurora.config().default_palette;
    let palette = Palette::from_attribute(container.get_attribute(markup::COLORS_ATTR).as_deref(), default);

    let mut active = spawn(window, EffectKind::Aurora, &canvas, palette, Fallback::aurora(container))?;

    let handle = active.handle();
    let source = container.clone();
    let watch = AttributeWatch::new(container, markup::COLORS_ATTR, move || {
        let palette = Palette::from_attribute(source.get_attribute(markup::COLORS_ATTR).as_deref(), default);
        handle.run("palette change", |fx| fx.set_palette(palette));
    });
    match watch {
        Ok(watch) => active.palette_watch = Some(watch),
        Err(err) => {
            active.teardown();
            return Err(err);
        }
    }
    Ok(active)
}

fn start_particles(window: &Window, canvas: &Element) -> Result<ActiveEffect, EffectError> {
    let canvas: HtmlCanvasElement = canvas
        .clone()
        .dyn_into()
        .map_err(|_| EffectError::MissingCanvas(markup::PARTICLE_CANVAS_ID.into()))?;
    let palette = page_particle_palette(window);
    spawn(window, EffectKind::Particles, &canvas, palette, Fallback::particles(&canvas))
}

/// Build an effect on `canvas`, wire its frame loop and input listeners, and
/// start it. Anything that fails after the GPU context exists releases it.
fn spawn(
    window: &Window,
    kind: EffectKind,
    canvas: &HtmlCanvasElement,
    palette: Palette,
    fallback: Fallback,
) -> Result<ActiveEffect, EffectError> {
    let backend = WebGlBackend::new(canvas, kind)?;
    let (frames, frame_callback) = AnimationFrames::new(window.clone());
    let rng = SmallRng::try_from_os_rng()
        .map_err(|err| EffectError::Resource(format!("entropy source: {err}")))?;
    let instance = EffectInstance::new(kind, backend, frames, palette, viewport_of(window), rng)?;

    let instance: SharedInstance = Rc::new(RefCell::new(instance));
    let handle = EffectHandle {
        instance: Rc::downgrade(&instance),
        fallback: Rc::new(fallback),
    };

    *frame_callback.borrow_mut() = Some(frame_loop(handle.clone()));

    let wired = listen(window, &handle).and_then(|listeners| {
        let started = instance.borrow_mut().start();
        started.map(|()| listeners)
    });
    let active = |listeners| ActiveEffect {
        instance: instance.clone(),
        fallback: handle.fallback.clone(),
        _frame_callback: frame_callback.clone(),
        _listeners: listeners,
        palette_watch: None,
    };
    match wired {
        Ok(listeners) => Ok(active(listeners)),
        Err(err) => {
            active(Vec::new()).teardown();
            Err(err)
        }
    }
}

fn frame_loop(handle: EffectHandle) -> Closure<dyn FnMut(f64)> {
    Closure::wrap(Box::new(move |now: f64| {
        let mut outcome = FrameOutcome::Skipped;
        handle.run("frame", |fx| {
            outcome = fx.frame(now)?;
            Ok(())
        });
        if outcome == (FrameOutcome::Drawn { first: true }) {
            handle.fallback.hide();
        }
    }) as Box<dyn FnMut(f64)>)
}

/// Pointer, touch, resize and visibility listeners for one instance.
fn listen(window: &Window, handle: &EffectHandle) -> Result<Vec<EventListener>, EffectError> {
    let document = window
        .document()
        .ok_or_else(|| EffectError::Js("no document".into()))?;

    let on_mouse = handle.clone();
    let mouse = EventListener::new(window, "mousemove", move |event| {
        if let Some(event) = event.dyn_ref::<MouseEvent>() {
            let (x, y) = (event.client_x() as f64, event.client_y() as f64);
            on_mouse.run("pointer", |fx| {
                fx.pointer_moved(x, y);
                Ok(())
            });
        }
    })?;

    let on_touch = handle.clone();
    let touch = EventListener::new(window, "touchmove", move |event| {
        let Some(touch) = event
            .dyn_ref::<TouchEvent>()
            .and_then(|event| event.touches().get(0))
        else {
            return;
        };
        let (x, y) = (touch.client_x() as f64, touch.client_y() as f64);
        on_touch.run("touch", |fx| {
            fx.pointer_moved(x, y);
            Ok(())
        });
    })?;

    let on_resize = handle.clone();
    let resize_window = window.clone();
    let resize = EventListener::new(window, "resize", move |_| {
        let viewport = viewport_of(&resize_window);
        on_resize.run("resize", |fx| fx.resize(viewport));
    })?;

    let on_visibility = handle.clone();
    let visibility_document = document.clone();
    let visibility = EventListener::new(&document, "visibilitychange", move |_| {
        let hidden = visibility_document.hidden();
        on_visibility.run("visibility change", |fx| fx.set_hidden(hidden));
    })?;

    Ok(vec![mouse, touch, resize, visibility])
}

/// `persisted` is set when the page goes into (or comes back from) the
/// back/forward cache.
fn persisted(event: &web_sys::Event) -> bool {
    event
        .dyn_ref::<PageTransitionEvent>()
        .is_some_and(PageTransitionEvent::persisted)
}

/// Create the page runtime and scan once the document is ready.
pub(crate) fn install() -> Result<(), EffectError> {
    if RUNTIME.with(|rt| rt.borrow().is_some()) {
        scan();
        return Ok(());
    }

    let window = web_sys::window().ok_or_else(|| EffectError::Js("no window".into()))?;
    let document = window
        .document()
        .ok_or_else(|| EffectError::Js("no document".into()))?;

    let gate = CapabilityGate::probe(&BrowserEnvironment::new(&window));

    // A cached page keeps its effects paused so they can resume on restore;
    // only a real unload releases the GPU contexts.
    let page_hide = EventListener::new(&window, "pagehide", |event| {
        if persisted(&event) {
            with_runtime(|rt| rt.set_suspended(true));
        } else {
            teardown_all();
        }
    })?;
    let page_show = EventListener::new(&window, "pageshow", |event| {
        if persisted(&event) {
            with_runtime(|rt| {
                let hidden = rt.document.hidden();
                rt.set_suspended(hidden);
                rt.scan();
            });
        }
    })?;

    let loading = document.ready_state() == "loading";
    RUNTIME.with(|rt| {
        *rt.borrow_mut() = Some(Runtime {
            window,
            document: document.clone(),
            gate,
            aurora: EffectRegistry::new(),
            particles: EffectRegistry::new(),
            _page_hide: page_hide,
            _page_show: page_show,
        });
    });

    if loading {
        let ready = Closure::once_into_js(|| scan());
        document.add_event_listener_with_callback("DOMContentLoaded", ready.unchecked_ref())?;
    } else {
        scan();
    }
    Ok(())
}

/// Discover and start effects for containers that do not have one yet.
pub(crate) fn scan() {
    with_runtime(Runtime::scan);
}

/// Dispose every effect on the page.
pub(crate) fn teardown_all() {
    with_runtime(Runtime::dispose_all);
}

fn with_runtime(f: impl FnOnce(&mut Runtime)) {
    RUNTIME.with(|rt| match rt.try_borrow_mut() {
        Ok(mut rt) => match rt.as_mut() {
            Some(rt) => f(rt),
            None => log::warn!("backdrop runtime not installed"),
        },
        Err(_) => log::warn!("backdrop runtime busy; call ignored"),
    });
}
