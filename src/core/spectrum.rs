use super::constants::{BAR_COUNT, BAR_GLYPHS, BIN_MAX};

/// Normalized bar amplitudes in \[0, 1\], one per bar, lowest band first.
pub type BarLevels = [f32; BAR_COUNT];

/// Bins folded into each bar: `max(1, floor(bin_count / BAR_COUNT))`.
#[inline]
pub fn bins_per_bar(bin_count: usize) -> usize {
    (bin_count / BAR_COUNT).max(1)
}

/// Fold one frequency snapshot into `BAR_COUNT` levels.
///
/// Each bar is the mean of a contiguous, non-overlapping group of bins,
/// divided by 255. Remainder bins after the last full group are ignored.
/// When there are fewer bins than bars, bars past the end of the snapshot
/// stay at zero.
pub fn bar_levels(snapshot: &[u8]) -> BarLevels {
    let mut levels = [0.0_f32; BAR_COUNT];
    let group = bins_per_bar(snapshot.len());
    for (bar, chunk) in snapshot.chunks(group).take(BAR_COUNT).enumerate() {
        let sum: u32 = chunk.iter().map(|&b| b as u32).sum();
        levels[bar] = (sum as f32 / group as f32 / BIN_MAX).clamp(0.0, 1.0);
    }
    levels
}

/// Index into an 8-entry glyph table for a level.
///
/// Monotonic in `level`; 0 maps to the first glyph, 1 to the last.
/// Out-of-range and NaN input is clamped.
#[inline]
pub fn glyph_index(level: f32) -> usize {
    let top = (BAR_GLYPHS.len() - 1) as f32;
    let level = if level.is_nan() { 0.0 } else { level.clamp(0.0, 1.0) };
    ((level * top).round() as usize).min(BAR_GLYPHS.len() - 1)
}

#[inline]
pub fn glyph_for(level: f32) -> char {
    BAR_GLYPHS[glyph_index(level)]
}
