//! Synthetic image builders for testing.

use std::io::Cursor;

use eyenemia_core::ImageAsset;
use image::{DynamicImage, GrayImage, ImageFormat, Luma, Rgb, RgbImage};

/// Builder for creating synthetic test images.
///
/// Provides convenience methods for generating images with specific
/// characteristics (sharp, blurry, eye-like, etc.).
pub struct SyntheticImageBuilder;

impl SyntheticImageBuilder {
    // === Sharp/High-Contrast Images ===

    /// Creates a high-contrast checkerboard pattern (very sharp edges).
    ///
    /// Passes the blur check at the default threshold.
    #[must_use]
    pub fn checkerboard(width: u32, height: u32) -> ImageAsset {
        Self::checkerboard_with_cell_size(width, height, 8)
    }

    /// Creates a checkerboard with custom cell size.
    #[must_use]
    pub fn checkerboard_with_cell_size(width: u32, height: u32, cell_size: u32) -> ImageAsset {
        let cell = cell_size.max(1);
        let img = GrayImage::from_fn(width, height, |x, y| {
            if (x / cell + y / cell) % 2 == 0 {
                Luma([255u8])
            } else {
                Luma([0u8])
            }
        });
        ImageAsset::new("synthetic://checkerboard", DynamicImage::ImageLuma8(img))
    }

    /// Creates a reddish eye-like photo: a pale sclera ellipse with a dark
    /// iris on a skin-toned, finely textured background.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn eye_photo(width: u32, height: u32) -> ImageAsset {
        let (cx, cy) = (width as f32 / 2.0, height as f32 / 2.0);
        let (rx, ry) = (width as f32 * 0.35, height as f32 * 0.2);
        let iris = height as f32 * 0.12;

        let img = RgbImage::from_fn(width, height, |x, y| {
            let (dx, dy) = (x as f32 - cx, y as f32 - cy);
            if dx.hypot(dy) < iris {
                Rgb([60, 35, 25])
            } else if (dx / rx).powi(2) + (dy / ry).powi(2) < 1.0 {
                Rgb([235, 225, 220])
            } else if (x / 4 + y / 4) % 2 == 0 {
                Rgb([210, 140, 120])
            } else {
                Rgb([150, 90, 80])
            }
        });
        ImageAsset::new("synthetic://eye_photo", DynamicImage::ImageRgb8(img))
    }

    // === Blurry Images ===

    /// Creates a uniform gray image (no edges, simulates severe blur).
    ///
    /// Scores zero sharpness.
    #[must_use]
    pub fn uniform_gray(width: u32, height: u32, value: u8) -> ImageAsset {
        let img = GrayImage::from_pixel(width, height, Luma([value]));
        ImageAsset::new("synthetic://uniform_gray", DynamicImage::ImageLuma8(img))
    }

    /// Creates slow sinusoidal waves (simulates heavy defocus).
    ///
    /// Scores far below the default blur threshold at any size.
    #[must_use]
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    pub fn smooth_waves(width: u32, height: u32) -> ImageAsset {
        let img = GrayImage::from_fn(width, height, |x, y| {
            let v = 128.0 + 60.0 * (x as f32 / 45.0).sin() + 40.0 * (y as f32 / 70.0).cos();
            Luma([v.round().clamp(0.0, 255.0) as u8])
        });
        ImageAsset::new("synthetic://smooth_waves", DynamicImage::ImageLuma8(img))
    }

    /// Applies a Gaussian blur to an existing asset.
    #[must_use]
    pub fn gaussian_blurred(asset: &ImageAsset, sigma: f32) -> ImageAsset {
        ImageAsset::new(&asset.path, asset.image.blur(sigma))
    }

    /// Creates an RGB color image.
    #[must_use]
    pub fn rgb_uniform(width: u32, height: u32, r: u8, g: u8, b: u8) -> ImageAsset {
        let img = RgbImage::from_pixel(width, height, Rgb([r, g, b]));
        ImageAsset::new("synthetic://rgb_uniform", DynamicImage::ImageRgb8(img))
    }

    // === Encoding ===

    /// Encodes an asset as PNG bytes.
    ///
    /// # Panics
    ///
    /// Panics if encoding fails, which only happens for invalid buffers.
    #[must_use]
    pub fn encode_png(asset: &ImageAsset) -> Vec<u8> {
        Self::encode(asset, ImageFormat::Png)
    }

    /// Encodes an asset as JPEG bytes (converted to RGB first).
    ///
    /// # Panics
    ///
    /// Panics if encoding fails.
    #[must_use]
    pub fn encode_jpeg(asset: &ImageAsset) -> Vec<u8> {
        let rgb = ImageAsset::new(&asset.path, DynamicImage::ImageRgb8(asset.image.to_rgb8()));
        Self::encode(&rgb, ImageFormat::Jpeg)
    }

    #[allow(clippy::expect_used)]
    fn encode(asset: &ImageAsset, format: ImageFormat) -> Vec<u8> {
        let mut buf = Vec::new();
        asset
            .image
            .write_to(&mut Cursor::new(&mut buf), format)
            .expect("encoding synthetic image");
        buf
    }
}
