use std::cell::Cell;
use std::rc::Rc;

/// Single-threaded cancellation flag shared between a component and the
/// per-frame continuation it schedules. Clones observe the same flag.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Rc<Cell<bool>>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` only for the call that actually flipped the flag.
    pub fn cancel(&self) -> bool {
        !self.0.replace(true)
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.0.get()
    }
}
