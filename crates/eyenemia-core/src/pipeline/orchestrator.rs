//! Pipeline orchestrator.

use std::sync::Arc;

use image::DynamicImage;
use tracing::debug;

use crate::domain::{ImageAsset, Verdict};
use crate::error::PipelineError;

use super::classification::{classify, ClassificationConfig};
use super::isolate::isolate_region;
use super::letterbox::letterbox;
use super::models::ModelSet;
use super::segmentation::{segment, SegmentationConfig, SegmentationOutcome};

/// Configuration for the whole pipeline.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PipelineConfig {
    /// Segmentation stage settings.
    pub segmentation: SegmentationConfig,
    /// Normalization and classification settings.
    pub classification: ClassificationConfig,
}

/// Runs the two-stage pipeline over shared models.
#[derive(Debug, Clone)]
pub struct Pipeline {
    models: Arc<ModelSet>,
    config: PipelineConfig,
}

impl Pipeline {
    /// Creates a pipeline over `models`.
    #[must_use]
    pub const fn new(models: Arc<ModelSet>, config: PipelineConfig) -> Self {
        Self { models, config }
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Screens an admitted asset.
    ///
    /// # Errors
    ///
    /// Returns a [`PipelineError::Stage`] if any stage fails.
    pub fn run(&self, asset: &ImageAsset) -> Result<Verdict, PipelineError> {
        debug!("Screening {}", asset.path.display());
        self.run_image(&asset.image)
    }

    /// Screens a decoded image.
    ///
    /// No detection ends the run with [`Verdict::RegionNotFound`] without
    /// invoking the classifier.
    ///
    /// # Errors
    ///
    /// Returns a [`PipelineError::Stage`] if any stage fails.
    pub fn run_image(&self, image: &DynamicImage) -> Result<Verdict, PipelineError> {
        let mask = match segment(self.models.segmenter(), image, &self.config.segmentation)? {
            SegmentationOutcome::NotFound => return Ok(Verdict::RegionNotFound),
            SegmentationOutcome::Found { mask, .. } => mask,
        };

        let isolated = isolate_region(image, &mask)?;
        let normalized = letterbox(&isolated, self.config.classification.input_size);

        classify(
            self.models.classifier(),
            &normalized,
            &self.config.classification,
        )
    }
}
