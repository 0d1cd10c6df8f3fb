//! Segmentation stage: pick one eye region and bring its mask to source size.

use image::imageops::{self, FilterType};
use image::DynamicImage;
use tracing::{debug, info};

use crate::domain::{Detection, ProbabilityMask, SegmentationMask};
use crate::error::{PipelineError, PipelineStage};
use crate::ports::Segmenter;

/// Default minimum detection confidence.
pub const DEFAULT_SEGMENTATION_CONFIDENCE: f32 = 0.25;

/// Default binarization cut-off; a pixel is inside when strictly above it.
pub const DEFAULT_MASK_THRESHOLD: f32 = 0.5;

/// Configuration for the segmentation stage.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentationConfig {
    /// Minimum detection confidence passed to the segmenter.
    pub confidence: f32,
    /// Probability cut-off for the binary mask.
    pub mask_threshold: f32,
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            confidence: DEFAULT_SEGMENTATION_CONFIDENCE,
            mask_threshold: DEFAULT_MASK_THRESHOLD,
        }
    }
}

/// Result of the segmentation stage.
#[derive(Debug, Clone, PartialEq)]
pub enum SegmentationOutcome {
    /// No detection passed the confidence threshold.
    NotFound,
    /// The selected region, binarized at source resolution.
    Found {
        /// Binary mask matching the source image extent.
        mask: SegmentationMask,
        /// Confidence of the selected detection.
        score: f32,
    },
}

/// Selects the highest-confidence detection.
///
/// Ties keep the segmenter's own ordering: the earliest of equal scores wins.
/// Detections with a NaN score are never selected.
#[must_use]
pub fn select_detection(detections: Vec<Detection>) -> Option<Detection> {
    detections
        .into_iter()
        .filter(|d| !d.score.is_nan())
        .fold(None, |best, d| match best {
            Some(b) if b.score >= d.score => Some(b),
            _ => Some(d),
        })
}

/// Resamples a probability mask to `width x height` with bilinear filtering.
///
/// Returns a copy when the mask already has the requested extent.
#[must_use]
pub fn resample_mask(mask: &ProbabilityMask, width: u32, height: u32) -> ProbabilityMask {
    if mask.dimensions() == (width, height) {
        return mask.clone();
    }
    imageops::resize(mask, width, height, FilterType::Triangle)
}

/// Runs the segmentation stage.
///
/// # Errors
///
/// Returns a [`PipelineStage::Segmentation`] error if the model fails or
/// returns an empty mask.
pub fn segment(
    segmenter: &dyn Segmenter,
    image: &DynamicImage,
    config: &SegmentationConfig,
) -> Result<SegmentationOutcome, PipelineError> {
    let mut detections = segmenter
        .segment(image, config.confidence)
        .map_err(|e| {
            PipelineError::stage(
                PipelineStage::Segmentation,
                format!("running {} model", segmenter.name()),
                e,
            )
        })?;
    detections.retain(|d| d.score >= config.confidence);
    debug!("{} detection(s) above {:.2}", detections.len(), config.confidence);

    let Some(selected) = select_detection(detections) else {
        info!("No eye region found");
        return Ok(SegmentationOutcome::NotFound);
    };

    let (mw, mh) = selected.mask.dimensions();
    if mw == 0 || mh == 0 {
        return Err(PipelineError::stage(
            PipelineStage::Segmentation,
            "reading selected mask",
            "segmenter returned an empty mask",
        ));
    }

    let resampled = resample_mask(&selected.mask, image.width(), image.height());
    let mask = SegmentationMask::from_probabilities(&resampled, config.mask_threshold);
    info!(
        "Selected eye region: score {:.3}, {} px",
        selected.score,
        mask.area()
    );

    Ok(SegmentationOutcome::Found {
        mask,
        score: selected.score,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn detection(score: f32, value: f32) -> Detection {
        Detection::new(score, ProbabilityMask::from_pixel(4, 4, Luma([value])))
    }

    struct FixedSegmenter(Vec<Detection>);

    impl Segmenter for FixedSegmenter {
        fn name(&self) -> &'static str {
            "fixed"
        }

        fn segment(&self, _: &DynamicImage, _: f32) -> anyhow::Result<Vec<Detection>> {
            Ok(self.0.clone())
        }
    }

    struct BrokenSegmenter;

    impl Segmenter for BrokenSegmenter {
        fn name(&self) -> &'static str {
            "broken"
        }

        fn segment(&self, _: &DynamicImage, _: f32) -> anyhow::Result<Vec<Detection>> {
            anyhow::bail!("tensor shape mismatch")
        }
    }

    #[test]
    fn test_select_highest_score() {
        let picked = select_detection(vec![detection(0.4, 0.1), detection(0.9, 0.2), detection(0.6, 0.3)]);
        assert!(picked.is_some_and(|d| (d.score - 0.9).abs() < f32::EPSILON));
    }

    #[test]
    fn test_select_tie_keeps_first() {
        let picked = select_detection(vec![detection(0.8, 0.1), detection(0.8, 0.9)]);
        assert!(picked.is_some_and(|d| (d.mask.get_pixel(0, 0).0[0] - 0.1).abs() < f32::EPSILON));
    }

    #[test]
    fn test_select_ignores_nan() {
        let picked = select_detection(vec![detection(f32::NAN, 0.1), detection(0.3, 0.2)]);
        assert!(picked.is_some_and(|d| (d.score - 0.3).abs() < f32::EPSILON));
        assert!(select_detection(vec![]).is_none());
    }

    #[test]
    fn test_resample_identity() {
        let mask = ProbabilityMask::from_fn(3, 2, |x, y| Luma([(x + y) as f32 / 10.0]));
        assert_eq!(resample_mask(&mask, 3, 2), mask);
    }

    #[test]
    fn test_resample_upscales_to_source_extent() {
        let mask = ProbabilityMask::from_pixel(4, 4, Luma([0.8]));
        let resized = resample_mask(&mask, 37, 21);
        assert_eq!(resized.dimensions(), (37, 21));
        assert!(resized.pixels().all(|p| (p.0[0] - 0.8).abs() < 1e-4));
    }

    #[test]
    fn test_segment_not_found() {
        let image = DynamicImage::new_rgb8(16, 16);
        let outcome = segment(&FixedSegmenter(vec![]), &image, &SegmentationConfig::default());
        assert!(matches!(outcome, Ok(SegmentationOutcome::NotFound)));
    }

    #[test]
    fn test_segment_drops_low_confidence() {
        let image = DynamicImage::new_rgb8(16, 16);
        let segmenter = FixedSegmenter(vec![detection(0.1, 1.0)]);
        let outcome = segment(&segmenter, &image, &SegmentationConfig::default());
        assert!(matches!(outcome, Ok(SegmentationOutcome::NotFound)));
    }

    #[test]
    fn test_segment_found_mask_matches_image() {
        let image = DynamicImage::new_rgb8(30, 20);
        let segmenter = FixedSegmenter(vec![detection(0.3, 0.2), detection(0.9, 0.7)]);
        let outcome = segment(&segmenter, &image, &SegmentationConfig::default());
        match outcome {
            Ok(SegmentationOutcome::Found { mask, score }) => {
                assert_eq!(mask.dimensions(), (30, 20));
                assert_eq!(mask.area(), 600);
                assert!((score - 0.9).abs() < f32::EPSILON);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn test_segment_model_error_is_stage_error() {
        let image = DynamicImage::new_rgb8(8, 8);
        let err = segment(&BrokenSegmenter, &image, &SegmentationConfig::default()).err();
        assert!(matches!(
            err,
            Some(PipelineError::Stage {
                stage: PipelineStage::Segmentation,
                ..
            })
        ));
    }
}
