//! Progress reporting port for UI integration.

use crate::domain::ScreeningReport;

/// Events emitted during batch screening for progress tracking.
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    /// Screening started for an image.
    Started {
        /// Path to the image.
        path: String,
        /// Index in the batch (0-based).
        index: usize,
        /// Total images in batch, if known.
        total: Option<usize>,
    },
    /// Screening completed for an image (including gate rejections).
    Completed {
        /// The screening report.
        report: ScreeningReport,
    },
    /// An image could not be screened.
    Skipped {
        /// Path to the image.
        path: String,
        /// Reason for skipping.
        reason: String,
    },
    /// All images have been processed.
    Finished {
        /// Images that received a class.
        diagnosed: usize,
        /// Images rejected by the quality gate.
        rejected: usize,
        /// Images with no region, failed classification, or system errors.
        undiagnosed: usize,
    },
}

/// Port for receiving progress events.
pub trait ProgressSink: Send + Sync {
    /// Called when a progress event occurs.
    fn on_event(&self, event: ProgressEvent);
}
