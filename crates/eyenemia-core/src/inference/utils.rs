//! Shared inference utilities.

use anyhow::{Context, Result};
use candle_core::{Device, Tensor};
use image::imageops::{self, FilterType};
use image::RgbImage;

/// Sigmoid activation function.
#[inline]
pub fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

/// Numerically stable softmax.
///
/// Returns an empty vector for empty input.
#[must_use]
pub fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|&l| (l - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

/// Resizes an RGB image to `size x size` and converts it to a
/// `(1, 3, size, size)` tensor scaled to `[0, 1]`.
///
/// # Errors
///
/// Returns an error if tensor creation fails.
pub fn image_to_tensor(image: &RgbImage, size: usize, device: &Device) -> Result<Tensor> {
    let side = u32::try_from(size).context("Input size out of range")?;
    let resized = if image.dimensions() == (side, side) {
        image.clone()
    } else {
        imageops::resize(image, side, side, FilterType::Triangle)
    };

    // HWC -> CHW
    let plane = size * size;
    let mut data = vec![0.0f32; 3 * plane];
    for (i, p) in resized.pixels().enumerate() {
        for c in 0..3 {
            data[c * plane + i] = f32::from(p.0[c]) / 255.0;
        }
    }

    Tensor::from_vec(data, (1, 3, size, size), device).context("Failed to create input tensor")
}
