//! Classification stage.

// Allow common image code patterns
#![allow(clippy::cast_possible_truncation)]

use image::{Rgb, RgbImage};
use tracing::{info, warn};

use crate::domain::{ClassDistribution, ClassificationResult, EyeClass, NormalizedRegion, Verdict};
use crate::error::{ClassificationFailure, PipelineError, PipelineStage};
use crate::ports::Classifier;

use super::DEFAULT_TARGET_SIZE;

/// How transparency is removed before classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AlphaFlatten {
    /// Drop the alpha channel. Transparent padding becomes black while
    /// masked-out pixels keep their colour.
    #[default]
    Discard,
    /// Composite over a flat colour.
    Matte([u8; 3]),
}

/// Configuration for normalization and classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassificationConfig {
    /// Side of the square classifier input.
    pub input_size: u32,
    /// Alpha flattening mode.
    pub flatten: AlphaFlatten,
}

impl Default for ClassificationConfig {
    fn default() -> Self {
        Self {
            input_size: DEFAULT_TARGET_SIZE,
            flatten: AlphaFlatten::default(),
        }
    }
}

/// Converts an RGBA region to RGB.
#[must_use]
pub fn flatten_alpha(region: &NormalizedRegion, mode: AlphaFlatten) -> RgbImage {
    RgbImage::from_fn(region.width(), region.height(), |x, y| {
        let [r, g, b, a] = region.get_pixel(x, y).0;
        match mode {
            AlphaFlatten::Discard => Rgb([r, g, b]),
            AlphaFlatten::Matte(matte) => {
                let a = u32::from(a);
                let blend = |c: u8, m: u8| {
                    ((u32::from(c) * a + u32::from(m) * (255 - a) + 127) / 255) as u8
                };
                Rgb([blend(r, matte[0]), blend(g, matte[1]), blend(b, matte[2])])
            }
        }
    })
}

/// Interprets a classifier output.
///
/// The top-ranked index is mapped through [`EyeClass`]; its probability is
/// clamped to `[0, 1]`.
///
/// # Errors
///
/// Returns [`ClassificationFailure::NoDistribution`] for an absent, empty or
/// all-NaN output and [`ClassificationFailure::UnknownClass`] for an index
/// outside the class enumeration.
pub fn interpret(
    output: Option<ClassDistribution>,
) -> Result<ClassificationResult, ClassificationFailure> {
    let (index, probability) = output
        .as_ref()
        .and_then(ClassDistribution::top1)
        .ok_or(ClassificationFailure::NoDistribution)?;
    let label = EyeClass::try_from(index)?;
    Ok(ClassificationResult {
        label,
        confidence: probability.clamp(0.0, 1.0),
    })
}

/// Runs the classification stage on a normalized region.
///
/// Unusable classifier output becomes [`Verdict::ClassificationFailed`].
///
/// # Errors
///
/// Returns a [`PipelineStage::Classification`] error if the model fails.
pub fn classify(
    classifier: &dyn Classifier,
    region: &NormalizedRegion,
    config: &ClassificationConfig,
) -> Result<Verdict, PipelineError> {
    let rgb = flatten_alpha(region, config.flatten);
    let output = classifier.classify(&rgb).map_err(|e| {
        PipelineError::stage(
            PipelineStage::Classification,
            format!("running {} model", classifier.name()),
            e,
        )
    })?;

    match interpret(output) {
        Ok(result) => {
            info!("Classified as {} ({:.3})", result.label, result.confidence);
            Ok(Verdict::Diagnosed(result))
        }
        Err(failure) => {
            warn!("Classification failed: {failure}");
            Ok(Verdict::ClassificationFailed(failure))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;
    use std::sync::Mutex;

    struct FixedClassifier {
        output: Option<Vec<f32>>,
        seen: Mutex<Option<RgbImage>>,
    }

    impl FixedClassifier {
        fn new(output: Option<Vec<f32>>) -> Self {
            Self {
                output,
                seen: Mutex::new(None),
            }
        }
    }

    impl Classifier for FixedClassifier {
        fn name(&self) -> &'static str {
            "fixed"
        }

        fn classify(&self, image: &RgbImage) -> anyhow::Result<Option<ClassDistribution>> {
            if let Ok(mut seen) = self.seen.lock() {
                *seen = Some(image.clone());
            }
            Ok(self.output.clone().map(ClassDistribution::new))
        }
    }

    #[test]
    fn test_discard_keeps_colour_of_transparent_pixels() {
        let region = NormalizedRegion::from_pixel(2, 2, Rgba([120, 30, 40, 0]));
        let rgb = flatten_alpha(&region, AlphaFlatten::Discard);
        assert!(rgb.pixels().all(|p| p.0 == [120, 30, 40]));
    }

    #[test]
    fn test_matte_composites() {
        let mut region = NormalizedRegion::from_pixel(2, 1, Rgba([200, 0, 0, 255]));
        region.put_pixel(1, 0, Rgba([200, 0, 0, 0]));
        let rgb = flatten_alpha(&region, AlphaFlatten::Matte([255, 255, 255]));
        assert_eq!(rgb.get_pixel(0, 0).0, [200, 0, 0]);
        assert_eq!(rgb.get_pixel(1, 0).0, [255, 255, 255]);
    }

    #[test]
    fn test_interpret_maps_classes() {
        let result = interpret(Some(ClassDistribution::new(vec![0.8, 0.2])));
        assert_eq!(
            result,
            Ok(ClassificationResult {
                label: EyeClass::Anemia,
                confidence: 0.8
            })
        );
        let result = interpret(Some(ClassDistribution::new(vec![0.1, 0.9])));
        assert!(result.is_ok_and(|r| r.label == EyeClass::Normal));
    }

    #[test]
    fn test_interpret_failures() {
        assert_eq!(interpret(None), Err(ClassificationFailure::NoDistribution));
        assert_eq!(
            interpret(Some(ClassDistribution::new(vec![]))),
            Err(ClassificationFailure::NoDistribution)
        );
        assert_eq!(
            interpret(Some(ClassDistribution::new(vec![0.1, 0.2, 0.7]))),
            Err(ClassificationFailure::UnknownClass { index: 2 })
        );
    }

    #[test]
    fn test_interpret_clamps_confidence() {
        let result = interpret(Some(ClassDistribution::new(vec![1.7, 0.0])));
        assert!(result.is_ok_and(|r| (r.confidence - 1.0).abs() < f32::EPSILON));
    }

    #[test]
    fn test_classify_soft_failure_is_verdict() {
        let classifier = FixedClassifier::new(None);
        let region = NormalizedRegion::new(224, 224);
        let verdict = classify(&classifier, &region, &ClassificationConfig::default());
        assert_eq!(
            verdict.ok().map(|v| v.to_pair()),
            Some(("Classification Failed".to_string(), 0.0))
        );
    }

    #[test]
    fn test_classify_passes_rgb_of_region() {
        let classifier = FixedClassifier::new(Some(vec![0.3, 0.7]));
        let region = NormalizedRegion::from_pixel(224, 224, Rgba([10, 20, 30, 0]));
        let verdict = classify(&classifier, &region, &ClassificationConfig::default());
        assert!(verdict.is_ok_and(|v| v.label() == "Normal"));

        let seen = classifier.seen.lock().ok().and_then(|s| s.clone());
        assert!(seen.is_some_and(|img| img.dimensions() == (224, 224)
            && img.pixels().all(|p| p.0 == [10, 20, 30])));
    }
}
