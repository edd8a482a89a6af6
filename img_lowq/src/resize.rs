//! Resize geometry: when to shrink, and to what size.
//!
//! All sizes are computed here; the codec layer only executes them.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn exceeds(&self, threshold: u32) -> bool {
        self.width > threshold || self.height > threshold
    }

    /// Both sides multiplied by `factor`, rounded, at least 1px.
    pub fn scaled(&self, factor: f64) -> Dimensions {
        let scale = |v: u32| ((v as f64 * factor).round() as u32).max(1);
        Dimensions::new(scale(self.width), scale(self.height))
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Raster (JPEG/PNG) sources larger than this on either side are shrunk.
pub const RASTER_RESIZE_THRESHOLD: u32 = 1200;
pub const RASTER_SCALE: f64 = 0.8;

/// HEIC sources larger than this on either side are shrunk.
pub const HEIC_RESIZE_THRESHOLD: u32 = 1000;
pub const HEIC_SCALE: f64 = 0.75;

/// Size-guard second pass.
pub const AGGRESSIVE_SCALE: f64 = 0.5;

/// Bounding box for the derivative, or `None` when no side exceeds `threshold`.
pub fn scaled_box(source: Dimensions, threshold: u32, factor: f64) -> Option<Dimensions> {
    source.exceeds(threshold).then(|| source.scaled(factor))
}

/// Largest size with the source's aspect ratio that fits inside `bounds`.
/// Never upscales and never crops.
pub fn fit_inside(source: Dimensions, bounds: Dimensions) -> Dimensions {
    if source.width == 0 || source.height == 0 {
        return source;
    }
    if source.width <= bounds.width && source.height <= bounds.height {
        return source;
    }

    let ratio = f64::min(
        bounds.width as f64 / source.width as f64,
        bounds.height as f64 / source.height as f64,
    );
    let width = ((source.width as f64 * ratio).round() as u32).clamp(1, bounds.width.max(1));
    let height = ((source.height as f64 * ratio).round() as u32).clamp(1, bounds.height.max(1));
    Dimensions::new(width, height)
}

/// Final size for a derivative: `None` means keep the source size.
pub fn target_size(
    actual: Dimensions,
    reference: Dimensions,
    threshold: u32,
    factor: f64,
) -> Option<Dimensions> {
    let bounds = scaled_box(reference, threshold, factor)?;
    let target = fit_inside(actual, bounds);
    (target != actual).then_some(target)
}
