#![cfg(target_arch = "wasm32")]

use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use wasm_bindgen_test::*;
use web_sys::{Document, Element, HtmlCanvasElement, Window};

wasm_bindgen_test_configure!(run_in_browser);

fn page() -> (Window, Document) {
    let window = web_sys::window().unwrap();
    let document = window.document().unwrap();
    (window, document)
}

/// Whether this browser would let the effects run at all.
fn effects_allowed(window: &Window, document: &Document) -> bool {
    let canvas: HtmlCanvasElement = document.create_element("canvas").unwrap().dyn_into().unwrap();
    let gpu = matches!(canvas.get_context("webgl2"), Ok(Some(_)));
    let reduced = window
        .match_media("(prefers-reduced-motion: reduce)")
        .ok()
        .flatten()
        .map(|q| q.matches())
        .unwrap_or(false);
    gpu && !reduced
}

async fn next_frames(window: &Window, n: usize) {
    for _ in 0..n {
        let promise = js_sys::Promise::new(&mut |resolve, _| {
            window.request_animation_frame(&resolve).unwrap();
        });
        JsFuture::from(promise).await.unwrap();
    }
}

fn aurora_container(document: &Document, with_canvas: bool) -> (Element, Element) {
    let container = document.create_element("section").unwrap();
    container.set_attribute("data-aurora-backdrop", "").unwrap();
    if with_canvas {
        container.append_child(&document.create_element("canvas").unwrap()).unwrap();
    }
    let fallback = document.create_element("div").unwrap();
    fallback.set_class_name("aurora-backdrop__fallback");
    container.append_child(&fallback).unwrap();
    document.body().unwrap().append_child(&container).unwrap();
    (container, fallback)
}

#[wasm_bindgen_test]
async fn aurora_hides_fallback_after_first_frame() {
    let (window, document) = page();
    backdrop_wasm::start().unwrap();

    let (container, fallback) = aurora_container(&document, true);
    backdrop_wasm::rescan();
    next_frames(&window, 3).await;

    if effects_allowed(&window, &document) {
        assert_eq!(fallback.get_attribute("data-hidden").as_deref(), Some("true"));
        assert!(container.class_list().contains("is-ready"));
    } else {
        assert!(fallback.get_attribute("data-hidden").is_none());
        assert!(!container.class_list().contains("is-ready"));
    }

    backdrop_wasm::teardown();
    container.remove();
}

#[wasm_bindgen_test]
async fn teardown_restores_fallback_after_first_frame() {
    let (window, document) = page();
    backdrop_wasm::start().unwrap();

    let (container, fallback) = aurora_container(&document, true);
    backdrop_wasm::rescan();
    next_frames(&window, 3).await;
    if effects_allowed(&window, &document) {
        assert_eq!(fallback.get_attribute("data-hidden").as_deref(), Some("true"));
    }

    backdrop_wasm::teardown();
    assert!(fallback.get_attribute("data-hidden").is_none());
    assert!(!container.class_list().contains("is-ready"));

    container.remove();
}

#[wasm_bindgen_test]
async fn container_without_canvas_keeps_fallback() {
    let (window, document) = page();
    backdrop_wasm::start().unwrap();

    let (container, fallback) = aurora_container(&document, false);
    backdrop_wasm::rescan();
    next_frames(&window, 2).await;

    assert!(fallback.get_attribute("data-hidden").is_none());
    assert!(!container.class_list().contains("is-ready"));

    container.remove();
    // the detached container is pruned without disturbing anything else
    backdrop_wasm::rescan();
}

#[wasm_bindgen_test]
async fn torn_down_canvas_is_not_reused() {
    let (window, document) = page();
    backdrop_wasm::start().unwrap();

    let (container, fallback) = aurora_container(&document, true);
    backdrop_wasm::rescan();
    backdrop_wasm::teardown();
    next_frames(&window, 2).await;
    // disposed before its first frame, so the fallback is still shown
    assert!(fallback.get_attribute("data-hidden").is_none());

    // the old canvas gave up its context; rescanning leaves it alone
    backdrop_wasm::rescan();
    next_frames(&window, 2).await;
    assert!(fallback.get_attribute("data-hidden").is_none());

    // a fresh canvas in the same container starts normally
    let old = container.query_selector("canvas").unwrap().unwrap();
    container
        .replace_child(&document.create_element("canvas").unwrap(), &old)
        .unwrap();
    backdrop_wasm::rescan();
    next_frames(&window, 3).await;
    if effects_allowed(&window, &document) {
        assert_eq!(fallback.get_attribute("data-hidden").as_deref(), Some("true"));
    }

    backdrop_wasm::teardown();
    container.remove();
}
