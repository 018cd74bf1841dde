use crate::core::CancelToken;
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::JsCast;
use web_sys as web;

type TickSlot = Rc<RefCell<Option<Closure<dyn FnMut()>>>>;

/// A self-rescheduling requestAnimationFrame loop with one cancellation
/// token. Cancelling stops the pending continuation and frees the closure.
pub struct FrameLoop {
    token: CancelToken,
    pending: Rc<Cell<Option<i32>>>,
    tick: TickSlot,
}

impl FrameLoop {
    pub fn start(mut step: impl FnMut() + 'static) -> Self {
        let token = CancelToken::new();
        let pending: Rc<Cell<Option<i32>>> = Rc::new(Cell::new(None));
        let tick: TickSlot = Rc::new(RefCell::new(None));

        let token_tick = token.clone();
        let pending_tick = pending.clone();
        let tick_clone = tick.clone();
        *tick.borrow_mut() = Some(Closure::wrap(Box::new(move || {
            pending_tick.set(None);
            if token_tick.is_cancelled() {
                return;
            }
            step();
            // `step` may have torn down the owner.
            if token_tick.is_cancelled() {
                return;
            }
            pending_tick.set(schedule(&tick_clone));
        }) as Box<dyn FnMut()>));
        pending.set(schedule(&tick));

        Self {
            token,
            pending,
            tick,
        }
    }

    pub fn is_running(&self) -> bool {
        !self.token.is_cancelled()
    }

    /// Idempotent. Must not be called from inside this loop's own `step`.
    pub fn cancel(&self) {
        if !self.token.cancel() {
            return;
        }
        if let (Some(handle), Some(w)) = (self.pending.take(), web::window()) {
            _ = w.cancel_animation_frame(handle);
        }
        // Breaks the closure's self-reference.
        self.tick.borrow_mut().take();
    }
}

impl Drop for FrameLoop {
    fn drop(&mut self) {
        self.cancel();
    }
}

fn schedule(tick: &TickSlot) -> Option<i32> {
    let w = web::window()?;
    let slot = tick.borrow();
    let f = slot.as_ref()?;
    w.request_animation_frame(f.as_ref().unchecked_ref()).ok()
}
