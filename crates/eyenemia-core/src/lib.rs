//! Eyenemia Core - Quality gate and two-stage screening pipeline
//!
//! This crate contains the domain types, ports, the image quality gate, and the
//! segmentation → isolation → letterbox → classification pipeline used to screen
//! eye photographs for signs of anemia.

pub mod domain;
pub mod error;
pub mod inference;
pub mod pipeline;
pub mod ports;
pub mod quality;
pub mod service;

pub use domain::{
    ClassDistribution, ClassificationResult, Detection, EyeClass, ImageAsset, ImageDimensions,
    IsolatedRegion, NormalizedRegion, ProbabilityMask, QualityVerdict, ScreeningReport,
    SegmentationMask, Verdict, VerdictStatus, VerdictSummary,
};
pub use error::{ClassificationFailure, PipelineError, PipelineStage, QualityError, ScreeningError};
pub use pipeline::{
    AlphaFlatten, ClassificationConfig, ModelPaths, ModelSet, Pipeline, PipelineConfig,
    SegmentationConfig,
};
pub use ports::{AssetStore, Classifier, ModelLoader, ProgressEvent, ProgressSink, ResultOutput, Segmenter};
pub use quality::{QualityConfig, QualityGate};
pub use service::{Admitted, Screening, ScreeningService};
