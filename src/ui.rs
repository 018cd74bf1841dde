use crate::core::{glyph_for, Theme, BAR_OPACITY_BASE, BAR_OPACITY_SPAN};
use std::fmt::Write;
use web_sys as web;

/// Render bar levels as block glyphs, one span per bar.
pub fn render_bars(el: &web::Element, levels: &[f32]) {
    let mut html = String::with_capacity(levels.len() * 48);
    for &level in levels {
        let level = level.clamp(0.0, 1.0);
        let opacity = BAR_OPACITY_BASE + level * BAR_OPACITY_SPAN;
        _ = write!(
            html,
            "<span class=\"bar\" style=\"opacity:{:.2}\">{}</span>",
            opacity,
            glyph_for(level)
        );
    }
    el.set_inner_html(&html);
}

pub fn apply_theme(el: &web::Element, theme: Theme) {
    let cl = el.class_list();
    for t in [Theme::Green, Theme::Amber] {
        if t != theme {
            _ = cl.remove_1(t.class_name());
        }
    }
    _ = cl.add_1(theme.class_name());
}
