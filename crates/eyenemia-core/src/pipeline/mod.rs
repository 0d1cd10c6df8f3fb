//! Two-stage screening pipeline.
//!
//! `segment → isolate → letterbox → classify`, driven by [`Pipeline`]. Each
//! stage is also exposed as a free function so it can be exercised alone.

mod classification;
mod isolate;
mod letterbox;
mod models;
mod orchestrator;
mod segmentation;

pub use classification::{classify, flatten_alpha, interpret, AlphaFlatten, ClassificationConfig};
pub use isolate::isolate_region;
pub use letterbox::{fitted_dimensions, letterbox, DEFAULT_TARGET_SIZE};
pub use models::{ModelPaths, ModelSet};
pub use orchestrator::{Pipeline, PipelineConfig};
pub use segmentation::{
    resample_mask, segment, select_detection, SegmentationConfig, SegmentationOutcome,
    DEFAULT_MASK_THRESHOLD, DEFAULT_SEGMENTATION_CONFIDENCE,
};
