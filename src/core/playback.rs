// Autoplay recovery as an explicit state machine.
//
//   Idle --ready--> AttemptingPlay --resolved--> Playing
//                        ^     \--rejected--> Blocked
//                        \-------gesture--------/
//
// The asynchronous parts (resuming the processing context, the play
// request) are performed by the platform driver between
// `AutoplayController::begin_attempt` and
// `AutoplayController::finish_attempt`.

use super::engine::{AudioBackend, SpectrumEngine};
use super::error::OverlayError;
use super::spectrum::BarLevels;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlaybackState {
    Idle,
    AttemptingPlay,
    Playing,
    Blocked,
}

impl PlaybackState {
    pub fn name(self) -> &'static str {
        match self {
            PlaybackState::Idle => "idle",
            PlaybackState::AttemptingPlay => "attempting",
            PlaybackState::Playing => "playing",
            PlaybackState::Blocked => "blocked",
        }
    }
}

/// What caused an attempt to start playback.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Trigger {
    /// The track is buffered enough to play through.
    Ready,
    /// First click or key press after being blocked.
    Gesture,
}

/// Work the driver must do after an attempt settles.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transition {
    /// Playback started; begin the per-frame tick loop.
    StartTicking,
    /// Playback refused; arm the one-shot gesture listeners.
    ArmGestureRetry,
    /// Nothing to do (torn down, or no attempt was in flight).
    None,
}

pub struct AutoplayController<B: AudioBackend> {
    state: PlaybackState,
    engine: SpectrumEngine<B>,
    initial_volume: f32,
    torn_down: bool,
}

impl<B: AudioBackend> AutoplayController<B> {
    pub fn new(backend: B, initial_volume: f32) -> Self {
        Self {
            state: PlaybackState::Idle,
            engine: SpectrumEngine::new(backend),
            initial_volume,
            torn_down: false,
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn engine(&self) -> &SpectrumEngine<B> {
        &self.engine
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    /// Enter `AttemptingPlay` and make sure the graph exists.
    ///
    /// Returns `false` when the attempt must be skipped: after teardown,
    /// while another attempt is in flight, once playing, or for a gesture
    /// that arrives before the first attempt was refused.
    pub fn begin_attempt(&mut self, trigger: Trigger, track: &B::Track) -> bool {
        if self.torn_down {
            return false;
        }
        let allowed = matches!(
            (self.state, trigger),
            (PlaybackState::Idle, Trigger::Ready)
                | (PlaybackState::Blocked, Trigger::Gesture)
                | (PlaybackState::Blocked, Trigger::Ready)
        );
        if !allowed {
            log::debug!(
                "[playback] {:?} ignored in state {}",
                trigger,
                self.state.name()
            );
            return false;
        }
        self.state = PlaybackState::AttemptingPlay;
        self.engine.ensure_graph(track, self.initial_volume);
        true
    }

    /// Whether an attempt is still pending and may issue its next
    /// asynchronous step. False once torn down.
    pub fn attempt_in_flight(&self) -> bool {
        !self.torn_down && self.state == PlaybackState::AttemptingPlay
    }

    /// Settle the in-flight attempt with the play request's outcome.
    pub fn finish_attempt(&mut self, outcome: Result<(), OverlayError>) -> Transition {
        if self.torn_down || self.state != PlaybackState::AttemptingPlay {
            return Transition::None;
        }
        match outcome {
            Ok(()) => {
                self.state = PlaybackState::Playing;
                log::info!("[playback] playing");
                Transition::StartTicking
            }
            Err(e) => {
                // Autoplay refusal is expected; wait for a user gesture.
                self.state = PlaybackState::Blocked;
                log::info!("[playback] blocked until user gesture ({})", e);
                Transition::ArmGestureRetry
            }
        }
    }

    /// Live volume; applies on the next tick, or at construction.
    pub fn set_volume(&mut self, volume: f32) {
        self.engine.set_volume(volume);
    }

    /// Bar levels for this frame, or `None` unless playing.
    pub fn tick(&mut self) -> Option<BarLevels> {
        if self.torn_down || self.state != PlaybackState::Playing {
            return None;
        }
        Some(self.engine.tick())
    }

    /// Release the graph from any state. Idempotent; later calls on the
    /// controller become no-ops.
    pub fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;
        self.engine.release();
    }
}
