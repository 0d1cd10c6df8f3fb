//! Screening service: quality gate, asset lifecycle and pipeline behind one call.

use std::path::Path;
use std::sync::{Arc, OnceLock};

use tracing::{debug, info, warn};

use crate::domain::{ImageAsset, QualityVerdict, Verdict};
use crate::error::{PipelineError, ScreeningError};
use crate::pipeline::{ModelPaths, ModelSet, Pipeline, PipelineConfig};
use crate::ports::{AssetStore, ModelLoader};
use crate::quality::QualityGate;

/// An upload that passed the quality gate.
#[derive(Debug, Clone)]
pub struct Admitted {
    /// Decoded asset.
    pub asset: ImageAsset,
    /// Gate outcome, always accepted.
    pub verdict: QualityVerdict,
}

/// Result of a full screening.
#[derive(Debug, Clone)]
pub struct Screening {
    /// Gate outcome and decoded asset.
    pub admitted: Admitted,
    /// Pipeline outcome.
    pub verdict: Verdict,
}

/// Screens persisted uploads.
///
/// Models are loaded at most once per service; a failed load is remembered
/// and every later request is refused with [`PipelineError::ModelsUnavailable`].
pub struct ScreeningService {
    gate: QualityGate,
    config: PipelineConfig,
    store: Box<dyn AssetStore>,
    models: OnceLock<Result<Arc<ModelSet>, String>>,
}

impl ScreeningService {
    /// Creates a service with no models loaded yet.
    #[must_use]
    pub fn new(gate: QualityGate, config: PipelineConfig, store: Box<dyn AssetStore>) -> Self {
        Self {
            gate,
            config,
            store,
            models: OnceLock::new(),
        }
    }

    /// Installs already-loaded models.
    #[must_use]
    pub fn with_models(mut self, models: Arc<ModelSet>) -> Self {
        self.models = OnceLock::from(Ok(models));
        self
    }

    /// Loads the models once. Later calls return the first outcome.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::ModelsUnavailable`] if loading failed.
    pub fn initialize(
        &self,
        loader: &dyn ModelLoader,
        paths: &ModelPaths,
    ) -> Result<(), PipelineError> {
        let result = self.models.get_or_init(|| match ModelSet::load(loader, paths) {
            Ok(models) => Ok(Arc::new(models)),
            Err(PipelineError::ModelsUnavailable { reason }) => Err(reason),
            Err(e) => Err(e.to_string()),
        });
        result
            .as_ref()
            .map(|_| ())
            .map_err(|reason| PipelineError::ModelsUnavailable {
                reason: reason.clone(),
            })
    }

    /// Returns true once models are loaded successfully.
    #[must_use]
    pub fn models_ready(&self) -> bool {
        matches!(self.models.get(), Some(Ok(_)))
    }

    /// Returns the quality gate.
    #[must_use]
    pub const fn gate(&self) -> &QualityGate {
        &self.gate
    }

    /// Builds a pipeline over the loaded models.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::ModelsUnavailable`] if models were never
    /// loaded or failed to load.
    pub fn pipeline(&self) -> Result<Pipeline, PipelineError> {
        match self.models.get() {
            Some(Ok(models)) => Ok(Pipeline::new(Arc::clone(models), self.config)),
            Some(Err(reason)) => Err(PipelineError::ModelsUnavailable {
                reason: reason.clone(),
            }),
            None => Err(PipelineError::ModelsUnavailable {
                reason: "models have not been loaded".to_string(),
            }),
        }
    }

    /// Runs the quality gate on a persisted upload.
    ///
    /// Every rejection deletes the upload from the store before returning.
    ///
    /// # Errors
    ///
    /// Returns [`ScreeningError::Rejected`] for gate failures and
    /// [`ScreeningError::Storage`] if the upload cannot be read.
    pub fn admit(&self, path: &Path) -> Result<Admitted, ScreeningError> {
        let bytes = self.store.read(path).map_err(|e| ScreeningError::Storage {
            context: format!("reading {}", path.display()),
            source: e.into(),
        })?;

        match self.gate.inspect(path, &bytes) {
            Ok((asset, score)) => {
                debug!("{}: accepted", path.display());
                Ok(Admitted {
                    asset,
                    verdict: QualityVerdict::accepted(score),
                })
            }
            Err(rejection) => {
                info!("{}: rejected ({})", path.display(), rejection.kind());
                if let Err(e) = self.store.delete(path) {
                    warn!("Failed to delete rejected upload {}: {e:#}", path.display());
                }
                Err(ScreeningError::Rejected(rejection))
            }
        }
    }

    /// Runs the quality gate only.
    ///
    /// # Errors
    ///
    /// See [`ScreeningService::admit`].
    pub fn check(&self, path: &Path) -> Result<Admitted, ScreeningError> {
        self.admit(path)
    }

    /// Screens a persisted upload end to end.
    ///
    /// Requests are refused before the gate runs when models are unavailable.
    ///
    /// # Errors
    ///
    /// Returns [`ScreeningError::Pipeline`] for unavailable models or stage
    /// failures, and the errors of [`ScreeningService::admit`].
    pub fn screen(&self, path: &Path) -> Result<Screening, ScreeningError> {
        let pipeline = self.pipeline()?;
        let admitted = self.admit(path)?;
        let verdict = pipeline.run(&admitted.asset)?;
        let (label, confidence) = verdict.to_pair();
        info!("{}: {label} ({confidence:.3})", path.display());
        Ok(Screening { admitted, verdict })
    }
}
