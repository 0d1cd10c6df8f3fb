//! Loaded model handles.

use std::path::PathBuf;

use tracing::{debug, error, info};

use crate::error::PipelineError;
use crate::ports::{Classifier, ModelLoader, Segmenter};

/// Locations of the two weight files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelPaths {
    /// Segmentation model weights.
    pub segmentation: PathBuf,
    /// Classification model weights.
    pub classification: PathBuf,
}

/// The segmenter and classifier, loaded together and shared read-only.
pub struct ModelSet {
    segmenter: Box<dyn Segmenter>,
    classifier: Box<dyn Classifier>,
}

impl std::fmt::Debug for ModelSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelSet")
            .field("segmenter", &self.segmenter.name())
            .field("classifier", &self.classifier.name())
            .finish()
    }
}

impl ModelSet {
    /// Wraps already-constructed predictors.
    #[must_use]
    pub fn new(segmenter: Box<dyn Segmenter>, classifier: Box<dyn Classifier>) -> Self {
        Self {
            segmenter,
            classifier,
        }
    }

    /// Loads both models. Either failing makes the whole set unavailable.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::ModelsUnavailable`] naming the model that failed.
    pub fn load(loader: &dyn ModelLoader, paths: &ModelPaths) -> Result<Self, PipelineError> {
        debug!("Loading segmentation model from {}", paths.segmentation.display());
        let segmenter = loader.load_segmenter(&paths.segmentation).map_err(|e| {
            error!("Segmentation model failed to load: {e:#}");
            PipelineError::ModelsUnavailable {
                reason: format!("segmentation model: {e:#}"),
            }
        })?;

        debug!("Loading classification model from {}", paths.classification.display());
        let classifier = loader.load_classifier(&paths.classification).map_err(|e| {
            error!("Classification model failed to load: {e:#}");
            PipelineError::ModelsUnavailable {
                reason: format!("classification model: {e:#}"),
            }
        })?;

        info!(
            "Models ready: {} + {}",
            segmenter.name(),
            classifier.name()
        );
        Ok(Self::new(segmenter, classifier))
    }

    /// The segmentation model.
    #[must_use]
    pub fn segmenter(&self) -> &dyn Segmenter {
        self.segmenter.as_ref()
    }

    /// The classification model.
    #[must_use]
    pub fn classifier(&self) -> &dyn Classifier {
        self.classifier.as_ref()
    }
}
