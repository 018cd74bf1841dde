// Audio spectrum engine: owns the single playback graph
// (source -> gain -> analyser -> output) and folds analyser snapshots into
// bar levels.
//
// The platform side is reached through `AudioBackend` / `AudioGraph` so
// the construction, volume and teardown rules can be exercised without a
// browser.

use super::config::clamp_volume;
use super::constants::{BAR_COUNT, FFT_SIZE};
use super::error::OverlayError;
use super::spectrum::{bar_levels, BarLevels};

/// A constructed playback graph.
pub trait AudioGraph {
    /// Usable frequency bins (half the transform size).
    fn frequency_bin_count(&self) -> usize;
    /// Fill `out` with the current byte-valued bin amplitudes.
    fn byte_frequency_data(&self, out: &mut [u8]);
    fn set_gain(&self, value: f32);
    fn gain(&self) -> f32;
    /// Disconnect every node that was constructed and close the processing
    /// context. Called at most once per graph.
    fn release(&mut self);
}

/// Factory for playback graphs bound to one track.
pub trait AudioBackend {
    type Track: ?Sized;
    type Graph: AudioGraph;

    /// Build and connect source -> gain -> analyser -> output. On failure the
    /// backend must already have released whatever it managed to construct.
    fn build_graph(
        &mut self,
        track: &Self::Track,
        fft_size: u32,
        volume: f32,
    ) -> Result<Self::Graph, OverlayError>;
}

pub struct SpectrumEngine<B: AudioBackend> {
    backend: B,
    graph: Option<B::Graph>,
    // Construction failed once; stay at zero bars for the session.
    degraded: bool,
    released: bool,
    volume: Option<f32>,
    snapshot: Vec<u8>,
}

impl<B: AudioBackend> SpectrumEngine<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            graph: None,
            degraded: false,
            released: false,
            volume: None,
            snapshot: Vec::new(),
        }
    }

    /// Build the playback graph unless one already exists.
    ///
    /// A volume set earlier through [`set_volume`](Self::set_volume) takes
    /// precedence over `initial_volume`. Construction failures are logged and
    /// leave the engine degraded; they are never returned to the caller.
    pub fn ensure_graph(&mut self, track: &B::Track, initial_volume: f32) {
        if self.graph.is_some() || self.degraded || self.released {
            return;
        }
        let volume = self.volume.unwrap_or_else(|| clamp_volume(initial_volume));
        match self.backend.build_graph(track, FFT_SIZE, volume) {
            Ok(graph) => {
                log::debug!(
                    "[audio] graph built bins={} gain={:.2}",
                    graph.frequency_bin_count(),
                    volume
                );
                self.volume = Some(volume);
                self.graph = Some(graph);
            }
            Err(e) => {
                log::warn!("[audio] spectrum disabled: {}", e);
                self.degraded = true;
            }
        }
    }

    /// Update the gain in place. Before the graph exists the value is kept
    /// and applied at construction.
    pub fn set_volume(&mut self, volume: f32) {
        let volume = clamp_volume(volume);
        self.volume = Some(volume);
        if let Some(g) = &self.graph {
            g.set_gain(volume);
        }
    }

    /// Most recent volume, whether or not a graph exists yet.
    pub fn volume(&self) -> Option<f32> {
        self.volume
    }

    /// Read one snapshot and fold it into `BAR_COUNT` levels. All zeros while
    /// no graph exists.
    pub fn tick(&mut self) -> BarLevels {
        let Some(graph) = &self.graph else {
            return [0.0; BAR_COUNT];
        };
        let bins = graph.frequency_bin_count();
        if self.snapshot.len() != bins {
            self.snapshot.resize(bins, 0);
        }
        graph.byte_frequency_data(&mut self.snapshot);
        bar_levels(&self.snapshot)
    }

    pub fn graph(&self) -> Option<&B::Graph> {
        self.graph.as_ref()
    }

    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    /// Release the graph if one was built. Safe to call repeatedly and before
    /// construction; afterwards `ensure_graph` is a no-op.
    pub fn release(&mut self) {
        self.released = true;
        if let Some(mut graph) = self.graph.take() {
            graph.release();
            log::debug!("[audio] graph released");
        }
    }
}
