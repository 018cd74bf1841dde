use crate::core::{OverlayConfig, SurfaceSize};
use wasm_bindgen::closure::Closure;
use wasm_bindgen::JsCast;
use web_sys as web;

#[inline]
pub fn window_document() -> Option<web::Document> {
    web::window().and_then(|w| w.document())
}

/// Current full-viewport backing size: window inner size times
/// `devicePixelRatio`.
pub fn viewport_backing_size() -> Option<SurfaceSize> {
    let w = web::window()?;
    let css_w = w.inner_width().ok()?.as_f64()?;
    let css_h = w.inner_height().ok()?.as_f64()?;
    Some(SurfaceSize::from_viewport(css_w, css_h, w.device_pixel_ratio()))
}

// Full-viewport, top-most, never hit-tested.
const OVERLAY_STYLE: [(&str, &str); 8] = [
    ("position", "fixed"),
    ("top", "0"),
    ("left", "0"),
    ("width", "100vw"),
    ("height", "100vh"),
    ("z-index", "9999"),
    ("pointer-events", "none"),
    ("display", "block"),
];

/// Pin the canvas over the whole viewport so its CSS box matches the
/// backing size computed from the window, and let input fall through.
pub fn apply_overlay_style(canvas: &web::HtmlCanvasElement) {
    let style = canvas.style();
    for (name, value) in OVERLAY_STYLE {
        if let Err(e) = style.set_property(name, value) {
            log::warn!("[crt] style {}: {:?}", name, e);
        }
    }
}

pub fn apply_backing_size(canvas: &web::HtmlCanvasElement, size: SurfaceSize) {
    if canvas.width() != size.width {
        canvas.set_width(size.width);
    }
    if canvas.height() != size.height {
        canvas.set_height(size.height);
    }
}

/// Resolve mount settings from defaults plus `data-*` overrides on the
/// overlay canvas.
pub fn read_config(document: &web::Document, canvas_id: &str, bars_id: &str) -> OverlayConfig {
    let base = OverlayConfig {
        canvas_id: canvas_id.to_string(),
        bars_id: bars_id.to_string(),
        ..OverlayConfig::default()
    };
    match document.get_element_by_id(canvas_id) {
        Some(el) => base.with_overrides(
            el.get_attribute("data-track").as_deref(),
            el.get_attribute("data-volume").as_deref(),
            el.get_attribute("data-theme").as_deref(),
        ),
        None => base,
    }
}

/// An event subscription owned by whoever registered it. Detached exactly
/// once: explicitly via [`detach`](Self::detach) or when dropped.
pub struct EventListener {
    target: web::EventTarget,
    event: &'static str,
    closure: Closure<dyn FnMut(web::Event)>,
    attached: bool,
}

impl EventListener {
    pub fn new(
        target: &web::EventTarget,
        event: &'static str,
        handler: impl FnMut(web::Event) + 'static,
    ) -> anyhow::Result<Self> {
        let closure = Closure::wrap(Box::new(handler) as Box<dyn FnMut(web::Event)>);
        target
            .add_event_listener_with_callback(event, closure.as_ref().unchecked_ref())
            .map_err(|e| anyhow::anyhow!("add {} listener: {:?}", event, e))?;
        Ok(Self {
            target: target.clone(),
            event,
            closure,
            attached: true,
        })
    }

    /// Stop receiving events. The closure stays alive until drop, so this is
    /// safe to call from inside the handler itself.
    pub fn detach(&mut self) {
        if !self.attached {
            return;
        }
        self.attached = false;
        _ = self
            .target
            .remove_event_listener_with_callback(self.event, self.closure.as_ref().unchecked_ref());
    }
}

impl Drop for EventListener {
    fn drop(&mut self) {
        self.detach();
    }
}
