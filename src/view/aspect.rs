//! Per-axis aspect ratios.

use super::display::ImageInfo;

/// Normalized per-axis scale factors correcting for non-uniform sampling.
///
/// After [`Aspect::normalized`] the larger of `x` and `y` is exactly 1 and
/// `z` is expressed in the same units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aspect {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Aspect {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Unit aspect.
    pub fn unit() -> Self {
        Self::new(1.0, 1.0, 1.0)
    }

    /// Normalize raw aspect values.
    ///
    /// Invalid or non-positive `x`/`y` become 1. All three are divided by
    /// `max(x, y)`. A non-positive or NaN `z` becomes the larger of the
    /// normalized `x` and `y`.
    pub fn normalized(x: f64, y: f64, z: f64) -> Self {
        let valid = |v: f64| v.is_finite() && v > 0.0;
        let x = if valid(x) { x } else { 1.0 };
        let y = if valid(y) { y } else { 1.0 };
        let d = x.max(y);
        let (x, y) = (x / d, y / d);
        let z = if z.is_nan() || z <= 0.0 { x.max(y) } else { z / d };
        Self { x, y, z }
    }

    /// Derive an aspect from an image source.
    ///
    /// Physical (micron) extents win over pixel counts when calibration is
    /// present and finite. Depth is the micron step times the slice count;
    /// without a step it falls back to the smaller of width and height.
    pub fn guess(info: &ImageInfo) -> Self {
        let calibrated = |v: f64| v.is_finite() && v > 0.0;

        let width = if calibrated(info.micron_width) {
            info.micron_width
        } else {
            info.width as f64
        };
        let height = if calibrated(info.micron_height) {
            info.micron_height
        } else {
            info.height as f64
        };
        let depth = if calibrated(info.micron_step) {
            info.micron_step * info.slices.max(1) as f64
        } else {
            width.min(height)
        };
        Self::normalized(width, height, depth)
    }

    pub fn as_array(&self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }
}

impl Default for Aspect {
    fn default() -> Self {
        Self::unit()
    }
}
