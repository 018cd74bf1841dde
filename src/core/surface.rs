/// Backing-buffer dimensions of the drawing surface, in device pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SurfaceSize {
    pub width: u32,
    pub height: u32,
}

impl SurfaceSize {
    /// Backing size for a logical (CSS) viewport at the given device pixel
    /// ratio: `(round(w * dpr), round(h * dpr))`, never smaller than 1x1.
    pub fn from_viewport(css_width: f64, css_height: f64, device_pixel_ratio: f64) -> Self {
        let dpr = if device_pixel_ratio.is_finite() && device_pixel_ratio > 0.0 {
            device_pixel_ratio
        } else {
            1.0
        };
        Self {
            width: scale_dimension(css_width, dpr),
            height: scale_dimension(css_height, dpr),
        }
    }

    /// Resolution uniform value.
    #[inline]
    pub fn as_f32(&self) -> [f32; 2] {
        [self.width as f32, self.height as f32]
    }
}

#[inline]
fn scale_dimension(css: f64, dpr: f64) -> u32 {
    let px = (css.max(0.0) * dpr).round();
    if px.is_finite() {
        (px as u32).max(1)
    } else {
        1
    }
}
