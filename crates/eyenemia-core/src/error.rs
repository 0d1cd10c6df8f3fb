//! Error types for the quality gate and the screening pipeline.
//!
//! Quality errors are user-input rejections. Pipeline errors are system
//! failures. Classifier output problems are neither: they are carried inside
//! [`crate::Verdict::ClassificationFailed`] so the pipeline always yields a result.

use thiserror::Error;

/// Boxed error used to keep the originating failure as a source.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Rejection reasons produced by the quality gate.
#[derive(Error, Debug)]
pub enum QualityError {
    /// The file extension is not on the allow-list.
    #[error("unsupported file format{}; expected one of: {allowed}", describe_extension(.extension.as_deref()))]
    UnsupportedFormat {
        /// Lowercased extension, if the name had one.
        extension: Option<String>,
        /// Comma-separated allow-list.
        allowed: String,
    },

    /// Either dimension is below the minimum.
    #[error("image too small: {width}x{height} (minimum {min_width}x{min_height} pixels)")]
    TooSmall {
        /// Image width.
        width: u32,
        /// Image height.
        height: u32,
        /// Minimum width.
        min_width: u32,
        /// Minimum height.
        min_height: u32,
    },

    /// Either dimension exceeds the maximum.
    #[error("image too large: {width}x{height} (maximum {max_width}x{max_height} pixels)")]
    TooLarge {
        /// Image width.
        width: u32,
        /// Image height.
        height: u32,
        /// Maximum width.
        max_width: u32,
        /// Maximum height.
        max_height: u32,
    },

    /// The bytes are not a decodable image.
    #[error("file is not a valid image or is corrupted")]
    Corrupt(#[source] image::ImageError),

    /// Sharpness score is below the blur threshold.
    #[error(
        "image appears blurry (sharpness score {score:.2} is below {threshold:.2}); \
         please upload a sharper, well-focused photo"
    )]
    Blurry {
        /// Measured Laplacian variance.
        score: f64,
        /// Threshold in effect.
        threshold: f64,
    },
}

impl QualityError {
    /// Short machine-readable kind.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::UnsupportedFormat { .. } => "unsupported_format",
            Self::TooSmall { .. } => "too_small",
            Self::TooLarge { .. } => "too_large",
            Self::Corrupt(_) => "corrupt",
            Self::Blurry { .. } => "blurry",
        }
    }

    /// Sharpness score carried by a blur rejection.
    #[must_use]
    pub const fn sharpness(&self) -> Option<f64> {
        match self {
            Self::Blurry { score, .. } => Some(*score),
            _ => None,
        }
    }
}

fn describe_extension(extension: Option<&str>) -> String {
    extension.map_or_else(|| " (no extension)".to_string(), |e| format!(" '.{e}'"))
}

/// Why a classifier output could not be turned into a class.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClassificationFailure {
    /// Top-ranked index is outside the known class enumeration.
    #[error("classifier returned unknown class index {index}")]
    UnknownClass {
        /// Offending index.
        index: usize,
    },

    /// The classifier produced no usable probability distribution.
    #[error("classifier produced no probability distribution")]
    NoDistribution,
}

/// Stage of the screening pipeline, used to tag failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    /// Eye-region segmentation.
    Segmentation,
    /// Mask application.
    Isolation,
    /// Anemia classification.
    Classification,
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Segmentation => write!(f, "segmentation"),
            Self::Isolation => write!(f, "region isolation"),
            Self::Classification => write!(f, "classification"),
        }
    }
}

/// Fatal pipeline failures.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Models failed to load at startup, or were never loaded.
    #[error("models unavailable: {reason}")]
    ModelsUnavailable {
        /// Load failure description.
        reason: String,
    },

    /// A stage failed while processing a request.
    #[error("{stage} failed: {context}")]
    Stage {
        /// Failing stage.
        stage: PipelineStage,
        /// What the stage was doing.
        context: String,
        /// Underlying error.
        #[source]
        source: BoxError,
    },
}

impl PipelineError {
    /// Creates a stage failure.
    pub fn stage(
        stage: PipelineStage,
        context: impl Into<String>,
        source: impl Into<BoxError>,
    ) -> Self {
        Self::Stage {
            stage,
            context: context.into(),
            source: source.into(),
        }
    }
}

/// Errors surfaced at the screening service boundary.
#[derive(Error, Debug)]
pub enum ScreeningError {
    /// The quality gate rejected the upload; it has been deleted.
    #[error(transparent)]
    Rejected(#[from] QualityError),

    /// The pipeline failed.
    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    /// The asset store failed.
    #[error("storage failure: {context}")]
    Storage {
        /// What was being accessed.
        context: String,
        /// Underlying error.
        #[source]
        source: BoxError,
    },
}

impl ScreeningError {
    /// Returns true for user-input errors (4xx-style), false for system failures.
    #[must_use]
    pub const fn is_user_error(&self) -> bool {
        matches!(self, Self::Rejected(_))
    }
}
