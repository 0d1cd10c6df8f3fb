//! Quality gate.
//!
//! Rejects uploads that cannot yield a reliable diagnosis before any model runs:
//! - extension allow-list
//! - pixel-dimension bounds (read from the header, before full decode)
//! - Laplacian-variance blur detection

mod sharpness;

use std::io::Cursor;
use std::path::Path;

use image::{DynamicImage, ImageReader};
use tracing::{debug, info};

use crate::domain::ImageAsset;
use crate::error::QualityError;

pub use sharpness::{check_sharpness, laplacian_variance, luma_bt601, DEFAULT_BLUR_THRESHOLD};

/// Default extension allow-list.
pub const DEFAULT_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg"];

/// Configuration for the quality gate.
#[derive(Debug, Clone, PartialEq)]
pub struct QualityConfig {
    /// Accepted file extensions, lowercase, without the dot.
    pub allowed_extensions: Vec<String>,
    /// Minimum accepted width in pixels.
    pub min_width: u32,
    /// Minimum accepted height in pixels.
    pub min_height: u32,
    /// Maximum accepted width in pixels.
    pub max_width: u32,
    /// Maximum accepted height in pixels.
    pub max_height: u32,
    /// Laplacian-variance score below which an image is blurry.
    pub blur_threshold: f64,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            allowed_extensions: DEFAULT_EXTENSIONS.iter().map(ToString::to_string).collect(),
            min_width: 120,
            min_height: 120,
            max_width: 7680,
            max_height: 4320,
            blur_threshold: DEFAULT_BLUR_THRESHOLD,
        }
    }
}

impl QualityConfig {
    /// Sets the blur threshold.
    #[must_use]
    pub const fn with_blur_threshold(mut self, threshold: f64) -> Self {
        self.blur_threshold = threshold;
        self
    }
}

/// Quality gate over a fixed configuration.
#[derive(Debug, Clone, Default)]
pub struct QualityGate {
    config: QualityConfig,
}

impl QualityGate {
    /// Creates a gate with the given configuration.
    #[must_use]
    pub const fn new(config: QualityConfig) -> Self {
        Self { config }
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &QualityConfig {
        &self.config
    }

    /// Returns true if `filename` has an allowed extension (case-insensitive).
    #[must_use]
    pub fn is_supported_format(&self, filename: &Path) -> bool {
        self.check_format(filename).is_ok()
    }

    /// Checks the extension allow-list.
    ///
    /// # Errors
    ///
    /// Returns [`QualityError::UnsupportedFormat`] for any other extension,
    /// including none.
    pub fn check_format(&self, filename: &Path) -> Result<(), QualityError> {
        let extension = filename
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase);

        match extension {
            Some(ref e) if self.config.allowed_extensions.iter().any(|a| a == e) => Ok(()),
            _ => Err(QualityError::UnsupportedFormat {
                extension,
                allowed: self.config.allowed_extensions.join(", "),
            }),
        }
    }

    /// Checks pixel dimensions against the configured bounds.
    ///
    /// # Errors
    ///
    /// Returns [`QualityError::TooSmall`] or [`QualityError::TooLarge`].
    pub const fn check_dimensions(&self, width: u32, height: u32) -> Result<(), QualityError> {
        let c = &self.config;
        if width < c.min_width || height < c.min_height {
            return Err(QualityError::TooSmall {
                width,
                height,
                min_width: c.min_width,
                min_height: c.min_height,
            });
        }
        if width > c.max_width || height > c.max_height {
            return Err(QualityError::TooLarge {
                width,
                height,
                max_width: c.max_width,
                max_height: c.max_height,
            });
        }
        Ok(())
    }

    /// Measures sharpness against the configured threshold.
    ///
    /// Returns `(is_blurry, score)`.
    #[must_use]
    pub fn check_sharpness(&self, image: &DynamicImage) -> (bool, f64) {
        check_sharpness(image, self.config.blur_threshold)
    }

    /// Runs every check on an encoded upload without side effects.
    ///
    /// Order: format, header dimensions, full decode, sharpness.
    /// Returns the decoded asset, carrying a copy of `bytes`, and its sharpness score.
    ///
    /// # Errors
    ///
    /// Returns the first failing check.
    pub fn inspect(&self, path: &Path, bytes: &[u8]) -> Result<(ImageAsset, f64), QualityError> {
        self.check_format(path)?;

        let (width, height) = probe_dimensions(bytes)?;
        debug!("{}: {width}x{height}", path.display());
        self.check_dimensions(width, height)?;

        let image = decode(bytes)?;
        let (is_blurry, score) = self.check_sharpness(&image);
        info!("{}: sharpness score {score:.2}", path.display());
        if is_blurry {
            return Err(QualityError::Blurry {
                score,
                threshold: self.config.blur_threshold,
            });
        }

        Ok((ImageAsset::new(path, image).with_bytes(bytes.to_vec()), score))
    }
}

fn reader(bytes: &[u8]) -> Result<ImageReader<Cursor<&[u8]>>, QualityError> {
    ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| QualityError::Corrupt(image::ImageError::IoError(e)))
}

/// Reads image dimensions from the encoded header without decoding pixels.
///
/// # Errors
///
/// Returns [`QualityError::Corrupt`] if the format is unknown or the header is unreadable.
pub fn probe_dimensions(bytes: &[u8]) -> Result<(u32, u32), QualityError> {
    reader(bytes)?.into_dimensions().map_err(QualityError::Corrupt)
}

/// Fully decodes an encoded image.
///
/// # Errors
///
/// Returns [`QualityError::Corrupt`] if the bytes are not a decodable image.
pub fn decode(bytes: &[u8]) -> Result<DynamicImage, QualityError> {
    reader(bytes)?.decode().map_err(QualityError::Corrupt)
}
