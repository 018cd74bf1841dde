use super::constants::{DEFAULT_BARS_ID, DEFAULT_CANVAS_ID, DEFAULT_TRACK_URL, DEFAULT_VOLUME};

/// Colour scheme of the surrounding terminal. Only the presentation layer
/// reads it; the effects pipeline is theme-agnostic.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Theme {
    #[default]
    Green,
    Amber,
}

impl Theme {
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim() {
            s if s.eq_ignore_ascii_case("green") => Some(Theme::Green),
            s if s.eq_ignore_ascii_case("amber") => Some(Theme::Amber),
            _ => None,
        }
    }

    pub fn class_name(self) -> &'static str {
        match self {
            Theme::Green => "terminal-green",
            Theme::Amber => "terminal-amber",
        }
    }
}

/// Mount-time settings, resolved from defaults plus page overrides.
#[derive(Clone, Debug, PartialEq)]
pub struct OverlayConfig {
    pub canvas_id: String,
    pub bars_id: String,
    pub track_url: String,
    pub initial_volume: f32,
    pub theme: Theme,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            canvas_id: DEFAULT_CANVAS_ID.to_string(),
            bars_id: DEFAULT_BARS_ID.to_string(),
            track_url: DEFAULT_TRACK_URL.to_string(),
            initial_volume: DEFAULT_VOLUME,
            theme: Theme::default(),
        }
    }
}

impl OverlayConfig {
    /// Apply raw attribute overrides (`data-track`, `data-volume`,
    /// `data-theme`). Missing or malformed values keep the current setting.
    pub fn with_overrides(
        mut self,
        track: Option<&str>,
        volume: Option<&str>,
        theme: Option<&str>,
    ) -> Self {
        if let Some(t) = track.map(str::trim).filter(|t| !t.is_empty()) {
            self.track_url = t.to_string();
        }
        if let Some(v) = volume.and_then(parse_volume) {
            self.initial_volume = v;
        }
        if let Some(th) = theme.and_then(Theme::parse) {
            self.theme = th;
        }
        self
    }
}

/// Parse a volume string, clamped to \[0, 1\]. Rejects non-numbers and NaN.
pub fn parse_volume(raw: &str) -> Option<f32> {
    raw.trim()
        .parse::<f32>()
        .ok()
        .filter(|v| !v.is_nan())
        .map(clamp_volume)
}

#[inline]
pub fn clamp_volume(v: f32) -> f32 {
    if v.is_nan() {
        0.0
    } else {
        v.clamp(0.0, 1.0)
    }
}
