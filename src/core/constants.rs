// Shared audio/visual tuning constants. Platform-free so host tests can
// include this file directly.

// Analyser transform size; yields FFT_SIZE / 2 usable frequency bins.
pub const FFT_SIZE: u32 = 64;

// Number of bar levels produced per tick, independent of analyser resolution.
pub const BAR_COUNT: usize = 16;

// Byte amplitude ceiling reported by the analyser.
pub const BIN_MAX: f32 = 255.0;

// Block glyphs used by the presentation layer, lowest to highest.
pub const BAR_GLYPHS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

// Bar opacity = BAR_OPACITY_BASE + level * BAR_OPACITY_SPAN
pub const BAR_OPACITY_BASE: f32 = 0.5;
pub const BAR_OPACITY_SPAN: f32 = 0.5;

// Volume applied when neither the host nor the page supplies one.
pub const DEFAULT_VOLUME: f32 = 0.5;

// DOM wiring defaults
pub const DEFAULT_CANVAS_ID: &str = "crt-overlay";
pub const DEFAULT_BARS_ID: &str = "audio-bars";
pub const DEFAULT_TRACK_URL: &str = "/assets/lofi-mexicano.mp3";
