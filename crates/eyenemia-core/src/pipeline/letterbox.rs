//! Letterbox normalization to a fixed square canvas.

// Allow common image code patterns
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]

use image::imageops::{self, FilterType};
use image::RgbaImage;

use crate::domain::{IsolatedRegion, NormalizedRegion};

/// Default classifier input size.
pub const DEFAULT_TARGET_SIZE: u32 = 224;

/// Size of `width x height` scaled so the larger side equals `target`.
///
/// The smaller side is rounded and never drops below one pixel.
#[must_use]
pub fn fitted_dimensions(width: u32, height: u32, target: u32) -> (u32, u32) {
    let larger = width.max(height);
    if larger == 0 {
        return (0, 0);
    }
    let scale = |side: u32| {
        let scaled = (f64::from(side) * f64::from(target) / f64::from(larger)).round() as u32;
        scaled.clamp(1, target.max(1))
    };
    if width >= height {
        (target, scale(height))
    } else {
        (scale(width), target)
    }
}

/// Fits `region` into a transparent `target x target` canvas.
///
/// The aspect ratio is preserved (Lanczos3 resampling) and the result is
/// centred at `((target - w) / 2, (target - h) / 2)`. Inputs already at the
/// target size are returned unchanged.
#[must_use]
pub fn letterbox(region: &IsolatedRegion, target: u32) -> NormalizedRegion {
    if region.dimensions() == (target, target) {
        return region.clone();
    }

    let mut canvas = RgbaImage::new(target, target);
    let (w, h) = fitted_dimensions(region.width(), region.height(), target);
    if w == 0 || h == 0 {
        return canvas;
    }

    let resized = imageops::resize(region, w, h, FilterType::Lanczos3);
    let x = i64::from((target - w) / 2);
    let y = i64::from((target - h) / 2);
    imageops::replace(&mut canvas, &resized, x, y);
    canvas
}
