//! Prediction ports for the two opaque models.

use std::path::Path;

use image::{DynamicImage, RgbImage};

use crate::domain::{ClassDistribution, Detection};

/// Eye-region segmentation model.
///
/// Implementations must be safe for concurrent read-only inference.
pub trait Segmenter: Send + Sync {
    /// Returns the name of this backend.
    fn name(&self) -> &'static str;

    /// Segments an image.
    ///
    /// Returns every candidate whose score is at least `min_confidence`, in the
    /// model's own order. An empty vector means no region was found.
    ///
    /// # Errors
    ///
    /// Returns an error if inference fails.
    fn segment(&self, image: &DynamicImage, min_confidence: f32) -> anyhow::Result<Vec<Detection>>;
}

/// Anemia/normal classification model.
///
/// Implementations must be safe for concurrent read-only inference.
pub trait Classifier: Send + Sync {
    /// Returns the name of this backend.
    fn name(&self) -> &'static str;

    /// Classifies an opaque RGB image.
    ///
    /// `Ok(None)` means the model ran but produced no distribution.
    ///
    /// # Errors
    ///
    /// Returns an error if inference fails.
    fn classify(&self, image: &RgbImage) -> anyhow::Result<Option<ClassDistribution>>;
}

/// Facility that turns weight files into predictors.
pub trait ModelLoader {
    /// Loads the segmentation model from `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the weights cannot be read or do not fit the model.
    fn load_segmenter(&self, path: &Path) -> anyhow::Result<Box<dyn Segmenter>>;

    /// Loads the classification model from `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the weights cannot be read or do not fit the model.
    fn load_classifier(&self, path: &Path) -> anyhow::Result<Box<dyn Classifier>>;
}
