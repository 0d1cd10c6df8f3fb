//! Uploaded image assets.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Image dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageDimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl ImageDimensions {
    /// Creates a new dimensions value.
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// A decoded upload, read-only for the rest of the request.
#[derive(Debug, Clone)]
pub struct ImageAsset {
    /// Location of the persisted upload.
    pub path: PathBuf,
    /// Encoded bytes as read from the store; empty for in-memory images.
    pub bytes: Vec<u8>,
    /// Image width in pixels.
    pub width: u32,
    /// Image height in pixels.
    pub height: u32,
    /// Channel count of the decoded pixel grid (1 gray, 2 gray+alpha, 3 RGB, 4 RGBA).
    pub channels: u8,
    /// Decoded image data.
    pub image: image::DynamicImage,
}

impl ImageAsset {
    /// Wraps a decoded image.
    #[must_use]
    pub fn new(path: impl AsRef<Path>, image: image::DynamicImage) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            bytes: Vec::new(),
            width: image.width(),
            height: image.height(),
            channels: image.color().channel_count(),
            image,
        }
    }

    /// Attaches the encoded bytes the image was decoded from.
    #[must_use]
    pub fn with_bytes(mut self, bytes: Vec<u8>) -> Self {
        self.bytes = bytes;
        self
    }

    /// Returns the asset dimensions.
    #[must_use]
    pub const fn dimensions(&self) -> ImageDimensions {
        ImageDimensions::new(self.width, self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_reads_geometry() {
        let asset = ImageAsset::new("eye.png", image::DynamicImage::new_rgba8(30, 20));
        assert_eq!(asset.dimensions(), ImageDimensions::new(30, 20));
        assert_eq!(asset.channels, 4);
        assert!(asset.path.ends_with("eye.png"));
        assert!(asset.bytes.is_empty());
    }

    #[test]
    fn test_with_bytes_keeps_encoding() {
        let asset = ImageAsset::new("eye.png", image::DynamicImage::new_rgb8(2, 2))
            .with_bytes(vec![0x89, b'P', b'N', b'G']);
        assert_eq!(asset.bytes, [0x89, b'P', b'N', b'G']);
        assert_eq!(asset.dimensions(), ImageDimensions::new(2, 2));
    }

    #[test]
    fn test_gray_channel_count() {
        let asset = ImageAsset::new("gray.png", image::DynamicImage::new_luma8(4, 4));
        assert_eq!(asset.channels, 1);
    }
}
