//! Quality and screening outcomes.

use serde::{Deserialize, Serialize};

use crate::error::{ClassificationFailure, QualityError};

/// Label reported when segmentation finds no eye region.
pub const REGION_NOT_FOUND_LABEL: &str = "Eye Region Not Found";

/// Label reported when the classifier output cannot be interpreted.
pub const CLASSIFICATION_FAILED_LABEL: &str = "Classification Failed";

/// Outcome of the quality gate for one upload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityVerdict {
    /// Whether the image may proceed to inference.
    pub accepted: bool,
    /// Human-readable rejection reason.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Laplacian-variance sharpness score, when it was measured.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sharpness: Option<f64>,
}

impl QualityVerdict {
    /// An accepted verdict with its measured sharpness.
    #[must_use]
    pub const fn accepted(sharpness: f64) -> Self {
        Self {
            accepted: true,
            reason: None,
            sharpness: Some(sharpness),
        }
    }

    /// A rejected verdict derived from the gate error.
    #[must_use]
    pub fn rejected(error: &QualityError) -> Self {
        Self {
            accepted: false,
            reason: Some(error.to_string()),
            sharpness: error.sharpness(),
        }
    }
}

/// Diagnostic classes known to the classifier, in model index order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EyeClass {
    /// Conjunctival pallor consistent with anemia (class 0).
    Anemia,
    /// No signs of anemia (class 1).
    Normal,
}

impl EyeClass {
    /// All classes in model index order.
    pub const ALL: [Self; 2] = [Self::Anemia, Self::Normal];

    /// Human-readable label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Anemia => "Anemia",
            Self::Normal => "Normal",
        }
    }

    /// Model output index of this class.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Anemia => 0,
            Self::Normal => 1,
        }
    }
}

impl TryFrom<usize> for EyeClass {
    type Error = ClassificationFailure;

    fn try_from(index: usize) -> Result<Self, Self::Error> {
        Self::ALL
            .get(index)
            .copied()
            .ok_or(ClassificationFailure::UnknownClass { index })
    }
}

impl std::fmt::Display for EyeClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// A successful classification.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    /// Predicted class.
    pub label: EyeClass,
    /// Probability of the predicted class (0.0 to 1.0).
    pub confidence: f32,
}

/// Terminal state of the screening pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    /// The classifier produced a known class.
    Diagnosed(ClassificationResult),
    /// Segmentation found no eye region; the classifier was not run.
    RegionNotFound,
    /// The classifier output was absent or out of range.
    ClassificationFailed(ClassificationFailure),
}

/// Flat status tag for a [`Verdict`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerdictStatus {
    /// A class was predicted.
    Diagnosed,
    /// No eye region found.
    RegionNotFound,
    /// Classifier output unusable.
    ClassificationFailed,
}

impl Verdict {
    /// Label reported to callers.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Diagnosed(result) => result.label.label(),
            Self::RegionNotFound => REGION_NOT_FOUND_LABEL,
            Self::ClassificationFailed(_) => CLASSIFICATION_FAILED_LABEL,
        }
    }

    /// Confidence reported to callers; 0.0 for every non-diagnosed outcome.
    #[must_use]
    pub const fn confidence(&self) -> f32 {
        match self {
            Self::Diagnosed(result) => result.confidence,
            Self::RegionNotFound | Self::ClassificationFailed(_) => 0.0,
        }
    }

    /// Status tag.
    #[must_use]
    pub const fn status(&self) -> VerdictStatus {
        match self {
            Self::Diagnosed(_) => VerdictStatus::Diagnosed,
            Self::RegionNotFound => VerdictStatus::RegionNotFound,
            Self::ClassificationFailed(_) => VerdictStatus::ClassificationFailed,
        }
    }

    /// The `(label, confidence)` pair handed to the service layer.
    #[must_use]
    pub fn to_pair(&self) -> (String, f32) {
        (self.label().to_string(), self.confidence())
    }

    /// Returns true when a class was predicted.
    #[must_use]
    pub const fn is_diagnosed(&self) -> bool {
        matches!(self, Self::Diagnosed(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_class_index_mapping() {
        assert_eq!(EyeClass::try_from(0).ok(), Some(EyeClass::Anemia));
        assert_eq!(EyeClass::try_from(1).ok(), Some(EyeClass::Normal));
        assert_eq!(
            EyeClass::try_from(2),
            Err(ClassificationFailure::UnknownClass { index: 2 })
        );
        for class in EyeClass::ALL {
            assert_eq!(EyeClass::try_from(class.index()).ok(), Some(class));
        }
    }

    #[test]
    fn test_region_not_found_pair() {
        assert_eq!(
            Verdict::RegionNotFound.to_pair(),
            ("Eye Region Not Found".to_string(), 0.0)
        );
    }

    #[test]
    fn test_classification_failed_pair() {
        let verdict = Verdict::ClassificationFailed(ClassificationFailure::NoDistribution);
        assert_eq!(verdict.to_pair(), ("Classification Failed".to_string(), 0.0));
        assert_eq!(verdict.status(), VerdictStatus::ClassificationFailed);
    }

    #[test]
    fn test_diagnosed_pair() {
        let verdict = Verdict::Diagnosed(ClassificationResult {
            label: EyeClass::Normal,
            confidence: 0.875,
        });
        assert_eq!(verdict.to_pair(), ("Normal".to_string(), 0.875));
        assert!(verdict.is_diagnosed());
    }

    #[test]
    fn test_rejected_verdict_keeps_blur_score() {
        let error = QualityError::Blurry {
            score: 12.5,
            threshold: 50.0,
        };
        let verdict = QualityVerdict::rejected(&error);
        assert!(!verdict.accepted);
        assert_eq!(verdict.sharpness, Some(12.5));
        assert!(verdict.reason.is_some_and(|r| r.contains("12.50")));
    }
}
