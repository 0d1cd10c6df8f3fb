//! Segmentation and classification artifacts.

use image::{ImageBuffer, Luma, RgbaImage};

/// Per-pixel membership probabilities as produced by a segmentation model.
///
/// Usually at the model's output resolution rather than the source image's.
pub type ProbabilityMask = ImageBuffer<Luma<f32>, Vec<f32>>;

/// Source-sized RGBA image whose alpha channel is the segmentation mask.
pub type IsolatedRegion = RgbaImage;

/// Fixed-size square RGBA image ready for classification.
pub type NormalizedRegion = RgbaImage;

/// A single candidate region reported by a segmentation model.
#[derive(Debug, Clone)]
pub struct Detection {
    /// Detection confidence (0.0 to 1.0).
    pub score: f32,
    /// Membership probabilities for this candidate.
    pub mask: ProbabilityMask,
}

impl Detection {
    /// Creates a detection.
    #[must_use]
    pub const fn new(score: f32, mask: ProbabilityMask) -> Self {
        Self { score, mask }
    }
}

/// Binary eye-region mask at the source image's exact pixel extent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentationMask {
    width: u32,
    height: u32,
    bits: Vec<bool>,
}

impl SegmentationMask {
    /// Builds a mask by evaluating `f` at every pixel.
    #[must_use]
    pub fn from_fn(width: u32, height: u32, mut f: impl FnMut(u32, u32) -> bool) -> Self {
        let mut bits = Vec::with_capacity(width as usize * height as usize);
        for y in 0..height {
            for x in 0..width {
                bits.push(f(x, y));
            }
        }
        Self {
            width,
            height,
            bits,
        }
    }

    /// Binarizes a probability mask: a pixel belongs to the region when its
    /// probability is strictly greater than `threshold`.
    #[must_use]
    pub fn from_probabilities(probabilities: &ProbabilityMask, threshold: f32) -> Self {
        let (width, height) = probabilities.dimensions();
        let bits = probabilities.pixels().map(|p| p.0[0] > threshold).collect();
        Self {
            width,
            height,
            bits,
        }
    }

    /// Mask width in pixels.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Mask height in pixels.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Returns `(width, height)`.
    #[must_use]
    pub const fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Returns whether pixel `(x, y)` belongs to the region.
    ///
    /// Out-of-bounds coordinates are outside the region.
    #[must_use]
    pub fn contains(&self, x: u32, y: u32) -> bool {
        if x >= self.width || y >= self.height {
            return false;
        }
        self.bits[y as usize * self.width as usize + x as usize]
    }

    /// Number of pixels inside the region.
    #[must_use]
    pub fn area(&self) -> usize {
        self.bits.iter().filter(|&&b| b).count()
    }

    /// Returns true when no pixel belongs to the region.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        !self.bits.iter().any(|&b| b)
    }
}

/// Class probabilities reported by a classifier, indexed by class id.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassDistribution {
    probabilities: Vec<f32>,
}

impl ClassDistribution {
    /// Wraps a probability vector.
    #[must_use]
    pub const fn new(probabilities: Vec<f32>) -> Self {
        Self { probabilities }
    }

    /// Returns the probabilities as a slice.
    #[must_use]
    pub fn as_slice(&self) -> &[f32] {
        &self.probabilities
    }

    /// Number of classes in the distribution.
    #[must_use]
    pub fn len(&self) -> usize {
        self.probabilities.len()
    }

    /// Returns true when the distribution has no classes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.probabilities.is_empty()
    }

    /// Returns the top-ranked `(class index, probability)`.
    ///
    /// NaN entries are ignored; the lowest index wins ties. `None` when no
    /// usable probability exists.
    #[must_use]
    pub fn top1(&self) -> Option<(usize, f32)> {
        self.probabilities
            .iter()
            .copied()
            .enumerate()
            .filter(|(_, p)| !p.is_nan())
            .fold(None, |best, (i, p)| match best {
                Some((_, bp)) if bp >= p => best,
                _ => Some((i, p)),
            })
    }
}
