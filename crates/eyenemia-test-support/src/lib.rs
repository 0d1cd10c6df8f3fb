//! Test support utilities for eyenemia.
//!
//! Provides mocks, synthetic image builders, and utilities for testing
//! the quality gate and screening pipeline.
//!
//! # Example
//!
//! ```
//! use eyenemia_test_support::{MockClassifier, MockSegmenter, SyntheticImageBuilder};
//!
//! // Create synthetic test images
//! let sharp = SyntheticImageBuilder::checkerboard(128, 128);
//! let blurry = SyntheticImageBuilder::uniform_gray(128, 128, 128);
//!
//! // Create mock models
//! let segmenter = MockSegmenter::full_frame(0.9);
//! let classifier = MockClassifier::returning(vec![0.2, 0.8]);
//! ```

mod builders;
mod mocks;

pub use builders::SyntheticImageBuilder;
pub use mocks::{
    MockAssetStore, MockClassifier, MockModelLoader, MockProgressSink, MockResultOutput,
    MockSegmenter,
};
