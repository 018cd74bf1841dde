// Host-side tests for the spectrum engine and the autoplay state machine,
// driven through a counting mock audio backend.
// The main crate is wasm-only, so we include the pure-Rust modules directly.

#![allow(dead_code)]
mod cancel {
    include!("../src/core/cancel.rs");
}
mod config {
    include!("../src/core/config.rs");
}
mod constants {
    include!("../src/core/constants.rs");
}
mod engine {
    include!("../src/core/engine.rs");
}
mod error {
    include!("../src/core/error.rs");
}
mod playback {
    include!("../src/core/playback.rs");
}
mod spectrum {
    include!("../src/core/spectrum.rs");
}

use cancel::*;
use constants::*;
use engine::*;
use error::*;
use playback::*;
use std::cell::Cell;
use std::rc::Rc;

#[derive(Default)]
struct Counters {
    builds: Cell<u32>,
    connections: Cell<u32>,
    disconnects: Cell<u32>,
    closes: Cell<u32>,
}

struct MockBackend {
    counters: Rc<Counters>,
    bins: Vec<u8>,
    fail: bool,
}

impl MockBackend {
    fn new(counters: &Rc<Counters>) -> Self {
        Self {
            counters: counters.clone(),
            bins: (0..32).map(|i| (i * 8) as u8).collect(),
            fail: false,
        }
    }

    fn with_bins(mut self, bins: Vec<u8>) -> Self {
        self.bins = bins;
        self
    }

    fn failing(mut self) -> Self {
        self.fail = true;
        self
    }
}

struct MockGraph {
    counters: Rc<Counters>,
    bins: Vec<u8>,
    gain: Cell<f32>,
    fft_size: u32,
}

impl AudioGraph for MockGraph {
    fn frequency_bin_count(&self) -> usize {
        self.bins.len()
    }

    fn byte_frequency_data(&self, out: &mut [u8]) {
        out.copy_from_slice(&self.bins);
    }

    fn set_gain(&self, value: f32) {
        self.gain.set(value);
    }

    fn gain(&self) -> f32 {
        self.gain.get()
    }

    fn release(&mut self) {
        // source, gain, analyser
        let c = &self.counters;
        c.disconnects.set(c.disconnects.get() + 3);
        c.closes.set(c.closes.get() + 1);
    }
}

impl AudioBackend for MockBackend {
    type Track = ();
    type Graph = MockGraph;

    fn build_graph(&mut self, _track: &(), fft_size: u32, volume: f32) -> Result<MockGraph, OverlayError> {
        if self.fail {
            return Err(OverlayError::Unsupported("AudioContext".into()));
        }
        let c = &self.counters;
        c.builds.set(c.builds.get() + 1);
        // source->gain, gain->analyser, analyser->destination
        c.connections.set(c.connections.get() + 3);
        Ok(MockGraph {
            counters: self.counters.clone(),
            bins: self.bins.clone(),
            gain: Cell::new(volume),
            fft_size,
        })
    }
}

fn denied() -> Result<(), OverlayError> {
    Err(OverlayError::PermissionDenied("NotAllowedError".into()))
}

// ---------------- SpectrumEngine ----------------

#[test]
fn ensure_graph_builds_once() {
    let counters = Rc::new(Counters::default());
    let mut engine = SpectrumEngine::new(MockBackend::new(&counters));
    engine.ensure_graph(&(), 0.4);
    engine.ensure_graph(&(), 0.9);
    assert_eq!(counters.builds.get(), 1);
    assert_eq!(counters.connections.get(), 3);
    let graph = engine.graph().expect("graph built");
    assert_eq!(graph.fft_size, FFT_SIZE);
    assert_eq!(graph.gain(), 0.4);
}

#[test]
fn set_volume_reads_back_exactly() {
    let counters = Rc::new(Counters::default());
    let mut engine = SpectrumEngine::new(MockBackend::new(&counters));
    engine.ensure_graph(&(), 0.5);
    for i in 0..=100 {
        let v = i as f32 / 100.0;
        engine.set_volume(v);
        assert_eq!(engine.graph().map(|g| g.gain()), Some(v));
    }
    assert_eq!(counters.builds.get(), 1, "volume changes must not rebuild");
}

#[test]
fn volume_set_before_graph_is_applied_at_construction() {
    let counters = Rc::new(Counters::default());
    let mut engine = SpectrumEngine::new(MockBackend::new(&counters));
    engine.set_volume(0.8);
    assert!(engine.graph().is_none());
    engine.ensure_graph(&(), 0.2);
    assert_eq!(engine.graph().map(|g| g.gain()), Some(0.8));
}

#[test]
fn tick_without_graph_is_silent() {
    let counters = Rc::new(Counters::default());
    let mut engine = SpectrumEngine::new(MockBackend::new(&counters));
    assert_eq!(engine.tick(), [0.0; BAR_COUNT]);
}

#[test]
fn tick_returns_sixteen_levels_for_any_bin_count() {
    for bins in [8usize, 32, 40, 128] {
        let counters = Rc::new(Counters::default());
        let backend = MockBackend::new(&counters).with_bins(vec![128; bins]);
        let mut engine = SpectrumEngine::new(backend);
        engine.ensure_graph(&(), 1.0);
        let levels = engine.tick();
        assert_eq!(levels.len(), BAR_COUNT);
        assert!(levels.iter().all(|&l| (0.0..=1.0).contains(&l)));
    }
}

#[test]
fn construction_failure_degrades_to_zero_bars() {
    let counters = Rc::new(Counters::default());
    let mut engine = SpectrumEngine::new(MockBackend::new(&counters).failing());
    engine.ensure_graph(&(), 0.5);
    assert!(engine.is_degraded());
    assert!(engine.graph().is_none());
    assert_eq!(engine.tick(), [0.0; BAR_COUNT]);
    // Volume is still remembered and never panics.
    engine.set_volume(0.3);
    assert_eq!(engine.volume(), Some(0.3));
}

#[test]
fn release_before_construction_touches_nothing() {
    let counters = Rc::new(Counters::default());
    let mut engine = SpectrumEngine::new(MockBackend::new(&counters));
    engine.release();
    engine.release();
    assert_eq!(counters.disconnects.get(), 0);
    assert_eq!(counters.closes.get(), 0);
    engine.ensure_graph(&(), 0.5);
    assert_eq!(counters.builds.get(), 0, "no construction after release");
}

#[test]
fn release_disconnects_exactly_once() {
    let counters = Rc::new(Counters::default());
    let mut engine = SpectrumEngine::new(MockBackend::new(&counters));
    engine.ensure_graph(&(), 0.5);
    engine.release();
    engine.release();
    assert_eq!(counters.disconnects.get(), 3);
    assert_eq!(counters.closes.get(), 1);
}

// ---------------- AutoplayController ----------------

#[test]
fn starts_idle() {
    let counters = Rc::new(Counters::default());
    let ctrl = AutoplayController::new(MockBackend::new(&counters), 0.5);
    assert_eq!(ctrl.state(), PlaybackState::Idle);
    assert_eq!(counters.builds.get(), 0);
}

#[test]
fn ready_then_gesture_builds_one_graph() {
    let counters = Rc::new(Counters::default());
    let mut ctrl = AutoplayController::new(MockBackend::new(&counters), 0.5);
    assert!(ctrl.begin_attempt(Trigger::Ready, &()));
    assert_eq!(ctrl.finish_attempt(denied()), Transition::ArmGestureRetry);
    assert!(ctrl.begin_attempt(Trigger::Gesture, &()));
    assert_eq!(counters.builds.get(), 1);
    assert_eq!(counters.connections.get(), 3);
}

#[test]
fn near_simultaneous_triggers_skip_second_attempt() {
    let counters = Rc::new(Counters::default());
    let mut ctrl = AutoplayController::new(MockBackend::new(&counters), 0.5);
    assert!(ctrl.begin_attempt(Trigger::Ready, &()));
    assert!(!ctrl.begin_attempt(Trigger::Gesture, &()));
    assert!(!ctrl.begin_attempt(Trigger::Ready, &()));
    assert_eq!(ctrl.state(), PlaybackState::AttemptingPlay);
    assert_eq!(counters.builds.get(), 1);
}

#[test]
fn gesture_before_first_attempt_is_ignored() {
    let counters = Rc::new(Counters::default());
    let mut ctrl = AutoplayController::new(MockBackend::new(&counters), 0.5);
    assert!(!ctrl.begin_attempt(Trigger::Gesture, &()));
    assert_eq!(ctrl.state(), PlaybackState::Idle);
}

#[test]
fn playing_is_terminal() {
    let counters = Rc::new(Counters::default());
    let mut ctrl = AutoplayController::new(MockBackend::new(&counters), 0.5);
    ctrl.begin_attempt(Trigger::Ready, &());
    assert_eq!(ctrl.finish_attempt(Ok(())), Transition::StartTicking);
    assert!(!ctrl.begin_attempt(Trigger::Gesture, &()));
    assert_eq!(ctrl.finish_attempt(denied()), Transition::None);
    assert_eq!(ctrl.state(), PlaybackState::Playing);
}

#[test]
fn finish_without_attempt_is_ignored() {
    let counters = Rc::new(Counters::default());
    let mut ctrl = AutoplayController::new(MockBackend::new(&counters), 0.5);
    assert_eq!(ctrl.finish_attempt(Ok(())), Transition::None);
    assert_eq!(ctrl.state(), PlaybackState::Idle);
}

#[test]
fn tick_only_yields_levels_while_playing() {
    let counters = Rc::new(Counters::default());
    let mut ctrl = AutoplayController::new(MockBackend::new(&counters), 0.5);
    assert!(ctrl.tick().is_none());
    ctrl.begin_attempt(Trigger::Ready, &());
    assert!(ctrl.tick().is_none());
    ctrl.finish_attempt(denied());
    assert!(ctrl.tick().is_none());
}

#[test]
fn blocked_then_click_reaches_playing_with_valid_levels() {
    let counters = Rc::new(Counters::default());
    let mut ctrl = AutoplayController::new(MockBackend::new(&counters), 0.5);
    assert_eq!(ctrl.state(), PlaybackState::Idle);

    // readiness signal; the play request is refused
    assert!(ctrl.begin_attempt(Trigger::Ready, &()));
    assert_eq!(ctrl.state(), PlaybackState::AttemptingPlay);
    assert!(ctrl.attempt_in_flight());
    assert_eq!(ctrl.finish_attempt(denied()), Transition::ArmGestureRetry);
    assert_eq!(ctrl.state(), PlaybackState::Blocked);

    // simulated click
    assert!(ctrl.begin_attempt(Trigger::Gesture, &()));
    assert_eq!(ctrl.state(), PlaybackState::AttemptingPlay);
    assert_eq!(ctrl.finish_attempt(Ok(())), Transition::StartTicking);
    assert_eq!(ctrl.state(), PlaybackState::Playing);

    let levels = ctrl.tick().expect("levels while playing");
    assert_eq!(levels.len(), BAR_COUNT);
    assert!(levels.iter().all(|&l| (0.0..=1.0).contains(&l)));
    // mock bins rise with frequency
    assert!(levels[15] > levels[0]);
    assert_eq!(counters.builds.get(), 1);
}

#[test]
fn repeated_refusals_rearm_without_rebuilding() {
    let counters = Rc::new(Counters::default());
    let mut ctrl = AutoplayController::new(MockBackend::new(&counters), 0.5);
    ctrl.begin_attempt(Trigger::Ready, &());
    for _ in 0..5 {
        assert_eq!(ctrl.finish_attempt(denied()), Transition::ArmGestureRetry);
        assert!(ctrl.begin_attempt(Trigger::Gesture, &()));
    }
    assert_eq!(counters.builds.get(), 1);
}

#[test]
fn live_volume_applies_on_next_tick() {
    let counters = Rc::new(Counters::default());
    let mut ctrl = AutoplayController::new(MockBackend::new(&counters), 0.5);
    ctrl.set_volume(0.1);
    ctrl.begin_attempt(Trigger::Ready, &());
    ctrl.finish_attempt(Ok(()));
    assert_eq!(ctrl.engine().graph().map(|g| g.gain()), Some(0.1));
    ctrl.set_volume(0.9);
    ctrl.tick();
    assert_eq!(ctrl.engine().graph().map(|g| g.gain()), Some(0.9));
}

#[test]
fn teardown_in_idle_is_safe() {
    let counters = Rc::new(Counters::default());
    let mut ctrl = AutoplayController::new(MockBackend::new(&counters), 0.5);
    ctrl.teardown();
    ctrl.teardown();
    assert!(ctrl.is_torn_down());
    assert_eq!(counters.disconnects.get(), 0);
    assert_eq!(counters.closes.get(), 0);
}

#[test]
fn teardown_mid_attempt_discards_late_outcome() {
    let counters = Rc::new(Counters::default());
    let mut ctrl = AutoplayController::new(MockBackend::new(&counters), 0.5);
    ctrl.begin_attempt(Trigger::Ready, &());
    ctrl.teardown();
    assert_eq!(counters.closes.get(), 1);

    // No further asynchronous step may be issued.
    assert!(!ctrl.attempt_in_flight());

    // The play promise settles after unmount.
    let state_before = ctrl.state();
    assert_eq!(ctrl.finish_attempt(Ok(())), Transition::None);
    assert_eq!(ctrl.state(), state_before);
    assert!(ctrl.tick().is_none());
    assert!(!ctrl.begin_attempt(Trigger::Gesture, &()));
    assert_eq!(counters.builds.get(), 1);
}

#[test]
fn teardown_while_playing_releases_once() {
    let counters = Rc::new(Counters::default());
    let mut ctrl = AutoplayController::new(MockBackend::new(&counters), 0.5);
    ctrl.begin_attempt(Trigger::Ready, &());
    ctrl.finish_attempt(Ok(()));
    ctrl.tick();
    ctrl.teardown();
    ctrl.teardown();
    assert_eq!(counters.disconnects.get(), 3);
    assert_eq!(counters.closes.get(), 1);
    assert!(ctrl.tick().is_none());
}

#[test]
fn unsupported_audio_still_plays_with_silent_bars() {
    let counters = Rc::new(Counters::default());
    let mut ctrl = AutoplayController::new(MockBackend::new(&counters).failing(), 0.5);
    assert!(ctrl.begin_attempt(Trigger::Ready, &()));
    assert!(ctrl.engine().is_degraded());
    assert_eq!(ctrl.finish_attempt(Ok(())), Transition::StartTicking);
    assert_eq!(ctrl.tick(), Some([0.0; BAR_COUNT]));
    ctrl.teardown();
    assert_eq!(counters.closes.get(), 0);
}

// ---------------- CancelToken ----------------

#[test]
fn cancel_token_is_shared_and_reports_first_cancel() {
    let token = CancelToken::new();
    let loop_side = token.clone();
    assert!(!loop_side.is_cancelled());
    assert!(token.cancel());
    assert!(!token.cancel());
    assert!(loop_side.is_cancelled());
}
