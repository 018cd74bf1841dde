use crate::audio::{self, WebAudio};
use crate::core::{AutoplayController, PlaybackState, Theme, Transition, Trigger};
use crate::dom::EventListener;
use crate::frame::FrameLoop;
use crate::ui;
use std::cell::RefCell;
use std::rc::{Rc, Weak};
use wasm_bindgen_futures::spawn_local;
use web_sys as web;

struct VisualizerState {
    audio: web::HtmlAudioElement,
    controller: AutoplayController<WebAudio>,
    bars: Option<web::Element>,
    ready: Option<EventListener>,
    gesture: Vec<EventListener>,
    ticker: Option<FrameLoop>,
}

/// Audio half of the overlay: the track element, the autoplay state machine
/// and the per-frame bar loop.
pub struct AudioVisualizer {
    state: Rc<RefCell<VisualizerState>>,
}

impl AudioVisualizer {
    pub fn mount(
        track_url: &str,
        initial_volume: f32,
        bars: Option<web::Element>,
        theme: Theme,
    ) -> anyhow::Result<Self> {
        let audio = audio::create_track(track_url)?;
        if let Some(el) = &bars {
            ui::apply_theme(el, theme);
            ui::render_bars(el, &[0.0; crate::core::BAR_COUNT]);
        }
        let state = Rc::new(RefCell::new(VisualizerState {
            audio: audio.clone(),
            controller: AutoplayController::new(WebAudio, initial_volume),
            bars,
            ready: None,
            gesture: Vec::new(),
            ticker: None,
        }));

        let weak = Rc::downgrade(&state);
        let ready = EventListener::new(&audio, "canplaythrough", move |_| {
            let Some(state) = weak.upgrade() else {
                return;
            };
            if let Some(l) = state.borrow_mut().ready.as_mut() {
                l.detach();
            }
            spawn_local(attempt(Rc::downgrade(&state), Trigger::Ready));
        })?;
        state.borrow_mut().ready = Some(ready);
        log::info!("[audio] track {} waiting for readiness", track_url);

        Ok(Self { state })
    }

    pub fn set_volume(&self, volume: f32) {
        self.state.borrow_mut().controller.set_volume(volume);
    }

    pub fn set_theme(&self, theme: Theme) {
        if let Some(el) = &self.state.borrow().bars {
            ui::apply_theme(el, theme);
        }
    }

    pub fn playback_state(&self) -> PlaybackState {
        self.state.borrow().controller.state()
    }

    /// Release everything from any state. Idempotent.
    pub fn unmount(&self) {
        let (ticker, ready, gesture) = {
            let mut s = self.state.borrow_mut();
            if s.controller.is_torn_down() {
                return;
            }
            s.controller.teardown();
            audio::detach_track(&s.audio);
            (s.ticker.take(), s.ready.take(), std::mem::take(&mut s.gesture))
        };
        if let Some(t) = ticker {
            t.cancel();
        }
        drop(ready);
        drop(gesture);
        log::info!("[audio] unmounted");
    }
}

/// One pass through `AttemptingPlay`. The state is only borrowed between
/// awaits, never across them.
async fn attempt(state: Weak<RefCell<VisualizerState>>, trigger: Trigger) {
    let (audio, ctx) = {
        let Some(state) = state.upgrade() else {
            return;
        };
        let mut s = state.borrow_mut();
        let audio = s.audio.clone();
        if !s.controller.begin_attempt(trigger, &audio) {
            return;
        }
        let ctx = s
            .controller
            .engine()
            .graph()
            .and_then(|g| g.context().cloned());
        (audio, ctx)
    };

    let mut outcome = Ok(());
    if let Some(ctx) = &ctx {
        outcome = audio::resume_if_suspended(ctx).await;
    }
    // Unmounted while resuming; the element is already detached.
    let Some(live) = state.upgrade() else {
        return;
    };
    let still_pending = live.borrow().controller.attempt_in_flight();
    drop(live);
    if !still_pending {
        return;
    }
    if outcome.is_ok() {
        outcome = audio::request_play(&audio).await;
    }

    let Some(state) = state.upgrade() else {
        return;
    };
    let transition = state.borrow_mut().controller.finish_attempt(outcome);
    match transition {
        Transition::StartTicking => start_ticking(&state),
        Transition::ArmGestureRetry => arm_gesture_retry(&state),
        Transition::None => {}
    }
}

fn start_ticking(state: &Rc<RefCell<VisualizerState>>) {
    let weak = Rc::downgrade(state);
    let ticker = FrameLoop::start(move || {
        let Some(state) = weak.upgrade() else {
            return;
        };
        let mut s = state.borrow_mut();
        if let Some(levels) = s.controller.tick() {
            if let Some(el) = &s.bars {
                ui::render_bars(el, &levels);
            }
        }
    });
    state.borrow_mut().ticker = Some(ticker);
}

/// Listen for the first click or key press, whichever comes first; both
/// listeners are detached when either fires.
fn arm_gesture_retry(state: &Rc<RefCell<VisualizerState>>) {
    let Some(document) = crate::dom::window_document() else {
        return;
    };
    let mut listeners = Vec::with_capacity(2);
    for event in ["click", "keydown"] {
        let weak = Rc::downgrade(state);
        let on_gesture = move |_: web::Event| {
            let Some(state) = weak.upgrade() else {
                return;
            };
            for l in state.borrow_mut().gesture.iter_mut() {
                l.detach();
            }
            spawn_local(attempt(Rc::downgrade(&state), Trigger::Gesture));
        };
        match EventListener::new(&document, event, on_gesture) {
            Ok(l) => listeners.push(l),
            Err(e) => log::warn!("[audio] gesture retry unavailable: {:?}", e),
        }
    }
    // Replaced listeners were detached when they fired.
    state.borrow_mut().gesture = listeners;
}
