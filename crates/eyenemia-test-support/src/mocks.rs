//! Mock implementations of core port traits.
//!
//! Every mock is `Clone`; clones share state, so a test can hand one copy to
//! the code under test and keep another for assertions.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use eyenemia_core::{
    AssetStore, ClassDistribution, Classifier, Detection, ModelLoader, ProbabilityMask,
    ProgressEvent, ProgressSink, ResultOutput, ScreeningReport, Segmenter,
};
use image::{DynamicImage, Luma, RgbImage};

fn bump(counter: &Mutex<usize>) {
    *counter.lock().unwrap_or_else(PoisonError::into_inner) += 1;
}

fn read(counter: &Mutex<usize>) -> usize {
    *counter.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Clone)]
enum SegmenterBehavior {
    Fixed(Vec<Detection>),
    FullFrame(f32),
    Fail(String),
}

/// Mock implementation of `Segmenter` for testing.
///
/// Counts invocations for assertions.
#[derive(Debug, Clone)]
pub struct MockSegmenter {
    behavior: SegmenterBehavior,
    calls: Arc<Mutex<usize>>,
}

impl MockSegmenter {
    fn with_behavior(behavior: SegmenterBehavior) -> Self {
        Self {
            behavior,
            calls: Arc::new(Mutex::new(0)),
        }
    }

    /// A segmenter that never finds an eye region.
    #[must_use]
    pub fn empty() -> Self {
        Self::with_detections(Vec::new())
    }

    /// A segmenter returning fixed detections regardless of the input.
    #[must_use]
    pub fn with_detections(detections: Vec<Detection>) -> Self {
        Self::with_behavior(SegmenterBehavior::Fixed(detections))
    }

    /// A segmenter reporting one detection whose mask covers the whole image.
    #[must_use]
    pub fn full_frame(score: f32) -> Self {
        Self::with_behavior(SegmenterBehavior::FullFrame(score))
    }

    /// A segmenter whose inference always fails.
    #[must_use]
    pub fn failing(message: impl Into<String>) -> Self {
        Self::with_behavior(SegmenterBehavior::Fail(message.into()))
    }

    /// Number of `segment` calls so far.
    #[must_use]
    pub fn call_count(&self) -> usize {
        read(&self.calls)
    }
}

impl Segmenter for MockSegmenter {
    fn name(&self) -> &'static str {
        "mock-segmenter"
    }

    fn segment(&self, image: &DynamicImage, min_confidence: f32) -> anyhow::Result<Vec<Detection>> {
        bump(&self.calls);
        match &self.behavior {
            SegmenterBehavior::Fixed(detections) => Ok(detections
                .iter()
                .filter(|d| d.score >= min_confidence)
                .cloned()
                .collect()),
            SegmenterBehavior::FullFrame(score) if *score >= min_confidence => {
                let mask = ProbabilityMask::from_pixel(image.width(), image.height(), Luma([1.0]));
                Ok(vec![Detection::new(*score, mask)])
            }
            SegmenterBehavior::FullFrame(_) => Ok(Vec::new()),
            SegmenterBehavior::Fail(message) => Err(anyhow::anyhow!("{message}")),
        }
    }
}

#[derive(Debug, Clone)]
enum ClassifierBehavior {
    Returning(Option<Vec<f32>>),
    Fail(String),
}

/// Mock implementation of `Classifier` for testing.
///
/// Records invocations and the size of the last input.
#[derive(Debug, Clone)]
pub struct MockClassifier {
    behavior: ClassifierBehavior,
    calls: Arc<Mutex<usize>>,
    last_input: Arc<Mutex<Option<(u32, u32)>>>,
}

impl MockClassifier {
    fn with_behavior(behavior: ClassifierBehavior) -> Self {
        Self {
            behavior,
            calls: Arc::new(Mutex::new(0)),
            last_input: Arc::new(Mutex::new(None)),
        }
    }

    /// A classifier returning a fixed probability vector.
    #[must_use]
    pub fn returning(probabilities: Vec<f32>) -> Self {
        Self::with_behavior(ClassifierBehavior::Returning(Some(probabilities)))
    }

    /// A classifier that runs but produces no distribution.
    #[must_use]
    pub fn malformed() -> Self {
        Self::with_behavior(ClassifierBehavior::Returning(None))
    }

    /// A classifier whose inference always fails.
    #[must_use]
    pub fn failing(message: impl Into<String>) -> Self {
        Self::with_behavior(ClassifierBehavior::Fail(message.into()))
    }

    /// Number of `classify` calls so far.
    #[must_use]
    pub fn call_count(&self) -> usize {
        read(&self.calls)
    }

    /// Dimensions of the most recent input.
    #[must_use]
    pub fn last_input_size(&self) -> Option<(u32, u32)> {
        *self
            .last_input
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl Classifier for MockClassifier {
    fn name(&self) -> &'static str {
        "mock-classifier"
    }

    fn classify(&self, image: &RgbImage) -> anyhow::Result<Option<ClassDistribution>> {
        bump(&self.calls);
        *self
            .last_input
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(image.dimensions());
        match &self.behavior {
            ClassifierBehavior::Returning(output) => Ok(output.clone().map(ClassDistribution::new)),
            ClassifierBehavior::Fail(message) => Err(anyhow::anyhow!("{message}")),
        }
    }
}

/// Mock implementation of `AssetStore` for testing.
///
/// Holds uploads in memory and records deletions.
#[derive(Debug, Clone, Default)]
pub struct MockAssetStore {
    files: Arc<Mutex<HashMap<PathBuf, Vec<u8>>>>,
    deleted: Arc<Mutex<Vec<PathBuf>>>,
}

impl MockAssetStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `bytes` at `path`.
    pub fn insert(&self, path: impl AsRef<Path>, bytes: Vec<u8>) {
        self.files
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(path.as_ref().to_path_buf(), bytes);
    }

    /// Returns whether an upload is present.
    #[must_use]
    pub fn contains(&self, path: impl AsRef<Path>) -> bool {
        self.files
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(path.as_ref())
    }

    /// Every path passed to `delete`, in order.
    #[must_use]
    pub fn deleted(&self) -> Vec<PathBuf> {
        self.deleted
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl AssetStore for MockAssetStore {
    fn read(&self, path: &Path) -> anyhow::Result<Vec<u8>> {
        self.files
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(path)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("No such upload: {}", path.display()))
    }

    fn delete(&self, path: &Path) -> anyhow::Result<()> {
        self.files
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(path);
        self.deleted
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(path.to_path_buf());
        Ok(())
    }
}

/// Mock implementation of `ModelLoader` for testing.
///
/// Hands out clones of the given mocks, or fails every load.
#[derive(Debug, Clone)]
pub struct MockModelLoader {
    models: Option<(MockSegmenter, MockClassifier)>,
    failure: String,
    loads: Arc<Mutex<usize>>,
}

impl MockModelLoader {
    /// A loader that succeeds with the given models.
    #[must_use]
    pub fn new(segmenter: MockSegmenter, classifier: MockClassifier) -> Self {
        Self {
            models: Some((segmenter, classifier)),
            failure: String::new(),
            loads: Arc::new(Mutex::new(0)),
        }
    }

    /// A loader whose every load fails with `reason`.
    #[must_use]
    pub fn failing(reason: impl Into<String>) -> Self {
        Self {
            models: None,
            failure: reason.into(),
            loads: Arc::new(Mutex::new(0)),
        }
    }

    /// Number of load attempts (either model).
    #[must_use]
    pub fn load_count(&self) -> usize {
        read(&self.loads)
    }
}

impl ModelLoader for MockModelLoader {
    fn load_segmenter(&self, path: &Path) -> anyhow::Result<Box<dyn Segmenter>> {
        bump(&self.loads);
        match &self.models {
            Some((segmenter, _)) => Ok(Box::new(segmenter.clone())),
            None => Err(anyhow::anyhow!("{}: {}", path.display(), self.failure)),
        }
    }

    fn load_classifier(&self, path: &Path) -> anyhow::Result<Box<dyn Classifier>> {
        bump(&self.loads);
        match &self.models {
            Some((_, classifier)) => Ok(Box::new(classifier.clone())),
            None => Err(anyhow::anyhow!("{}: {}", path.display(), self.failure)),
        }
    }
}

/// Mock implementation of `ResultOutput` for testing.
///
/// Captures reports for later assertions.
#[derive(Debug, Clone, Default)]
pub struct MockResultOutput {
    reports: Arc<Mutex<Vec<ScreeningReport>>>,
    flush_count: Arc<Mutex<usize>>,
}

impl MockResultOutput {
    /// Creates a new mock output.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all captured reports.
    #[must_use]
    pub fn reports(&self) -> Vec<ScreeningReport> {
        self.reports
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns the number of times `flush()` was called.
    #[must_use]
    pub fn flush_count(&self) -> usize {
        read(&self.flush_count)
    }
}

impl ResultOutput for MockResultOutput {
    fn write(&self, report: &ScreeningReport) -> anyhow::Result<()> {
        self.reports
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(report.clone());
        Ok(())
    }

    fn flush(&self) -> anyhow::Result<()> {
        bump(&self.flush_count);
        Ok(())
    }
}

/// Mock implementation of `ProgressSink` for testing.
///
/// Captures events for later assertions.
#[derive(Debug, Clone, Default)]
pub struct MockProgressSink {
    events: Arc<Mutex<Vec<ProgressEvent>>>,
}

impl MockProgressSink {
    /// Creates a new mock progress sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all captured events.
    #[must_use]
    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns the number of `Started` events.
    #[must_use]
    pub fn started_count(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, ProgressEvent::Started { .. }))
            .count()
    }

    /// Returns the number of `Completed` events.
    #[must_use]
    pub fn completed_count(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, ProgressEvent::Completed { .. }))
            .count()
    }

    /// Returns the number of `Skipped` events.
    #[must_use]
    pub fn skipped_count(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, ProgressEvent::Skipped { .. }))
            .count()
    }

    /// Returns `(diagnosed, rejected, undiagnosed)` from the `Finished` event, if any.
    #[must_use]
    pub fn finished_counts(&self) -> Option<(usize, usize, usize)> {
        self.events().iter().find_map(|e| match e {
            ProgressEvent::Finished {
                diagnosed,
                rejected,
                undiagnosed,
            } => Some((*diagnosed, *rejected, *undiagnosed)),
            _ => None,
        })
    }
}

impl ProgressSink for MockProgressSink {
    fn on_event(&self, event: ProgressEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}
