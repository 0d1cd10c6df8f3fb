//! Core domain types for eye screening.

mod asset;
mod mask;
mod report;
mod verdict;

pub use asset::{ImageAsset, ImageDimensions};
pub use mask::{
    ClassDistribution, Detection, IsolatedRegion, NormalizedRegion, ProbabilityMask,
    SegmentationMask,
};
pub use report::{ScreeningReport, VerdictSummary};
pub use verdict::{
    ClassificationResult, EyeClass, QualityVerdict, Verdict, VerdictStatus,
    CLASSIFICATION_FAILED_LABEL, REGION_NOT_FOUND_LABEL,
};
