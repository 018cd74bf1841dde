use crate::core::SurfaceSize;
use crate::dom::{self, EventListener};
use std::cell::Cell;
use std::rc::Rc;
use web_sys as web;

/// Keeps a canvas backing store at viewport size times device pixel ratio,
/// recomputed synchronously on every window resize.
pub struct ResizeCoordinator {
    size: Rc<Cell<SurfaceSize>>,
    listener: Option<EventListener>,
}

impl ResizeCoordinator {
    pub fn new(canvas: &web::HtmlCanvasElement) -> Self {
        let size = Rc::new(Cell::new(sync(canvas)));

        let canvas_resize = canvas.clone();
        let size_resize = size.clone();
        let listener = web::window().and_then(|w| {
            EventListener::new(&w, "resize", move |_| {
                size_resize.set(sync(&canvas_resize));
            })
            .map_err(|e| log::warn!("[resize] {:?}", e))
            .ok()
        });

        Self { size, listener }
    }

    /// Backing size as of the last resize event.
    #[inline]
    pub fn resolution(&self) -> SurfaceSize {
        self.size.get()
    }

    /// Cell updated in place on every resize, for the render loop to poll.
    pub fn shared_resolution(&self) -> Rc<Cell<SurfaceSize>> {
        self.size.clone()
    }

    pub fn teardown(&mut self) {
        self.listener.take();
    }
}

fn sync(canvas: &web::HtmlCanvasElement) -> SurfaceSize {
    let size = dom::viewport_backing_size().unwrap_or(SurfaceSize {
        width: canvas.width().max(1),
        height: canvas.height().max(1),
    });
    dom::apply_backing_size(canvas, size);
    size
}
