//! Laplacian-variance sharpness measurement.
//!
//! The image is converted to 8-bit grayscale with BT.601 weights
//! (`0.299 R + 0.587 G + 0.114 B`, rounded), filtered with the 4-neighbour
//! Laplacian `[[0, 1, 0], [1, -4, 1], [0, 1, 0]]` using reflect-101 borders, and
//! the population variance of the response over every pixel is the score.
//! Low variance means little high-frequency detail, i.e. blur.

// Allow common image code patterns
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::cast_sign_loss)]

use image::DynamicImage;

/// Default blur threshold. Scores below it are considered blurry.
///
/// Calibrated empirically for phone-camera eye photos; override through
/// configuration for other sensors.
pub const DEFAULT_BLUR_THRESHOLD: f64 = 50.0;

/// Converts an image to BT.601 luma, row-major.
#[must_use]
pub fn luma_bt601(image: &DynamicImage) -> Vec<f64> {
    image
        .to_rgb8()
        .pixels()
        .map(|p| {
            let [r, g, b] = p.0;
            (0.299 * f64::from(r) + 0.587 * f64::from(g) + 0.114 * f64::from(b)).round()
        })
        .collect()
}

/// Reflect-101 border index (`dcb|abcd|cba`).
fn reflect101(i: isize, n: usize) -> usize {
    if n == 1 {
        return 0;
    }
    let n = n as isize;
    let i = if i < 0 {
        -i
    } else if i >= n {
        2 * n - 2 - i
    } else {
        i
    };
    i as usize
}

/// Computes the variance of the Laplacian response. Higher values mean the
/// image is sharper.
///
/// Returns 0.0 for an empty image.
#[must_use]
pub fn laplacian_variance(image: &DynamicImage) -> f64 {
    let (w, h) = (image.width() as usize, image.height() as usize);
    if w == 0 || h == 0 {
        return 0.0;
    }

    let gray = luma_bt601(image);
    let at = |x: isize, y: isize| gray[reflect101(y, h) * w + reflect101(x, w)];

    // Welford's running mean/variance to stay stable on large images
    let mut count = 0.0f64;
    let mut mean = 0.0f64;
    let mut m2 = 0.0f64;

    for y in 0..h as isize {
        for x in 0..w as isize {
            let response =
                at(x, y - 1) + at(x - 1, y) + at(x + 1, y) + at(x, y + 1) - 4.0 * at(x, y);
            count += 1.0;
            let delta = response - mean;
            mean += delta / count;
            m2 += delta * (response - mean);
        }
    }

    m2 / count
}

/// Measures sharpness against `threshold`.
///
/// Returns `(is_blurry, score)`; the score is always reported.
#[must_use]
pub fn check_sharpness(image: &DynamicImage, threshold: f64) -> (bool, f64) {
    let score = laplacian_variance(image);
    (score < threshold, score)
}
