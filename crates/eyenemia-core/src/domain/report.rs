//! Serializable per-image screening reports.

use serde::{Deserialize, Serialize};

use super::{ImageDimensions, QualityVerdict, Verdict, VerdictStatus};

/// Complete screening record for a single image.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreeningReport {
    /// Path of the submitted image.
    pub path: String,
    /// Timestamp of screening (ISO 8601).
    pub timestamp: String,
    /// Image dimensions, when the header could be read.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<ImageDimensions>,
    /// Quality gate outcome, absent when the gate never ran.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality: Option<QualityVerdict>,
    /// Pipeline outcome, absent when the image was rejected or not screened.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verdict: Option<VerdictSummary>,
    /// System failure message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ScreeningReport {
    /// Creates an empty report for `path`.
    #[must_use]
    pub fn new(path: impl Into<String>, timestamp: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            timestamp: timestamp.into(),
            dimensions: None,
            quality: None,
            verdict: None,
            error: None,
        }
    }

    /// Returns true when the image passed the gate and received a class.
    #[must_use]
    pub fn is_diagnosed(&self) -> bool {
        self.verdict
            .as_ref()
            .is_some_and(|v| v.status == VerdictStatus::Diagnosed)
    }

    /// Returns true when the quality gate rejected the image.
    #[must_use]
    pub fn is_rejected(&self) -> bool {
        self.quality.as_ref().is_some_and(|q| !q.accepted)
    }
}

/// Flattened view of a [`Verdict`] for output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerdictSummary {
    /// Terminal state.
    pub status: VerdictStatus,
    /// Reported label.
    pub label: String,
    /// Reported confidence.
    pub confidence: f32,
    /// Why classification failed, if it did.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl From<&Verdict> for VerdictSummary {
    fn from(verdict: &Verdict) -> Self {
        let detail = match verdict {
            Verdict::ClassificationFailed(failure) => Some(failure.to_string()),
            Verdict::Diagnosed(_) | Verdict::RegionNotFound => None,
        };
        Self {
            status: verdict.status(),
            label: verdict.label().to_string(),
            confidence: verdict.confidence(),
            detail,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ClassificationResult, EyeClass};
    use crate::error::ClassificationFailure;

    #[test]
    fn test_summary_from_diagnosed() {
        let verdict = Verdict::Diagnosed(ClassificationResult {
            label: EyeClass::Anemia,
            confidence: 0.9,
        });
        let summary = VerdictSummary::from(&verdict);
        assert_eq!(summary.status, VerdictStatus::Diagnosed);
        assert_eq!(summary.label, "Anemia");
        assert!(summary.detail.is_none());
    }

    #[test]
    fn test_summary_from_unknown_class() {
        let verdict =
            Verdict::ClassificationFailed(ClassificationFailure::UnknownClass { index: 7 });
        let summary = VerdictSummary::from(&verdict);
        assert_eq!(summary.label, "Classification Failed");
        assert!(summary.detail.is_some_and(|d| d.contains('7')));
    }

    #[test]
    fn test_report_flags() {
        let mut report = ScreeningReport::new("eye.jpg", "2026-01-01T00:00:00Z");
        assert!(!report.is_rejected());
        assert!(!report.is_diagnosed());

        report.quality = Some(QualityVerdict::accepted(120.0));
        report.verdict = Some(VerdictSummary::from(&Verdict::RegionNotFound));
        assert!(!report.is_rejected());
        assert!(!report.is_diagnosed());
    }
}
