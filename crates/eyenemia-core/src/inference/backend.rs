//! Candle implementations of the prediction ports.

use std::path::Path;

use anyhow::{Context, Result};
use candle_core::Device;
use image::{DynamicImage, RgbImage};
use tracing::debug;

use super::{get_device, load_safetensors, AnemiaClassifier, EyeSegmenter};
use crate::domain::{ClassDistribution, Detection};
use crate::ports::{Classifier, ModelLoader, Segmenter};

impl Segmenter for EyeSegmenter {
    fn name(&self) -> &'static str {
        "eye-seg"
    }

    fn segment(&self, image: &DynamicImage, min_confidence: f32) -> Result<Vec<Detection>> {
        self.detect(image, min_confidence)
    }
}

impl Classifier for AnemiaClassifier {
    fn name(&self) -> &'static str {
        "anemia-cls"
    }

    fn classify(&self, image: &RgbImage) -> Result<Option<ClassDistribution>> {
        self.predict(image).map(Some)
    }
}

/// Loads both models from safetensors files onto one device.
#[derive(Debug, Clone)]
pub struct CandleModelLoader {
    device: Device,
}

impl CandleModelLoader {
    /// Creates a loader targeting `device`.
    #[must_use]
    pub const fn new(device: Device) -> Self {
        Self { device }
    }

    /// Creates a loader on the best available device.
    #[must_use]
    pub fn detect(force_cpu: bool) -> Self {
        Self::new(get_device(force_cpu))
    }

    /// The target device.
    #[must_use]
    pub const fn device(&self) -> &Device {
        &self.device
    }
}

impl ModelLoader for CandleModelLoader {
    fn load_segmenter(&self, path: &Path) -> Result<Box<dyn Segmenter>> {
        debug!("Loading eye segmenter from {}", path.display());
        let vb = load_safetensors(path, &self.device).context("Failed to load segmenter weights")?;
        let model = EyeSegmenter::new(vb).context("Failed to create segmenter")?;
        Ok(Box::new(model))
    }

    fn load_classifier(&self, path: &Path) -> Result<Box<dyn Classifier>> {
        debug!("Loading anemia classifier from {}", path.display());
        let vb =
            load_safetensors(path, &self.device).context("Failed to load classifier weights")?;
        let model = AnemiaClassifier::new(vb).context("Failed to create classifier")?;
        Ok(Box::new(model))
    }
}
