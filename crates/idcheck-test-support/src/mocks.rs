//! Scoring-model stubs and mock implementations of core port traits.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::Duration;

use idcheck_core::{
    ImageSource, PhotoResult, ProgressEvent, ProgressSink, ResultOutput, ScoringError,
    ScoringModel, SourceImage, StandardModels,
};

/// Model that always returns the same score and counts its calls.
#[derive(Debug, Default)]
pub struct FixedScoreModel {
    score: f32,
    calls: AtomicUsize,
}

impl FixedScoreModel {
    /// Creates a model returning `score`, which may lie outside `[0, 1]`.
    #[must_use]
    pub const fn new(score: f32) -> Self {
        Self {
            score,
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of predictions made.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ScoringModel for FixedScoreModel {
    fn predict(&self, _features: &[f32]) -> Result<f32, ScoringError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.score)
    }
}

/// Model whose every prediction fails.
#[derive(Debug, Default, Clone, Copy)]
pub struct FailingModel;

impl ScoringModel for FailingModel {
    fn predict(&self, _features: &[f32]) -> Result<f32, ScoringError> {
        Err(ScoringError::Model("weights unavailable".to_string()))
    }
}

/// Model that panics when asked to predict.
#[derive(Debug, Default, Clone, Copy)]
pub struct PanickingModel;

impl ScoringModel for PanickingModel {
    #[allow(clippy::panic)]
    fn predict(&self, _features: &[f32]) -> Result<f32, ScoringError> {
        panic!("model crashed");
    }
}

/// Model that sleeps before answering.
#[derive(Debug, Clone, Copy)]
pub struct SlowModel {
    delay: Duration,
    score: f32,
}

impl SlowModel {
    /// Creates a model that returns `score` after `delay`.
    #[must_use]
    pub const fn new(delay: Duration, score: f32) -> Self {
        Self { delay, score }
    }
}

impl ScoringModel for SlowModel {
    fn predict(&self, _features: &[f32]) -> Result<f32, ScoringError> {
        thread::sleep(self.delay);
        Ok(self.score)
    }
}

/// Standard model set with fixed scores.
#[must_use]
pub fn fixed_models(occlusion: f32, head_covering: f32, dress_code: f32) -> StandardModels {
    StandardModels {
        occlusion: Some(Arc::new(FixedScoreModel::new(occlusion))),
        head_covering: Some(Arc::new(FixedScoreModel::new(head_covering))),
        dress_code: Some(Arc::new(FixedScoreModel::new(dress_code))),
    }
}

/// Mock implementation of `ImageSource` for testing.
///
/// Yields pre-built items and tracks iteration for assertions.
pub struct MockImageSource {
    images: Vec<Result<SourceImage, String>>,
    iteration_count: Arc<Mutex<usize>>,
}

impl MockImageSource {
    /// Creates a mock source with the given photos.
    #[must_use]
    pub fn new(images: Vec<SourceImage>) -> Self {
        Self::with_results(images.into_iter().map(Ok).collect())
    }

    /// Creates a mock source where some items fail to read.
    #[must_use]
    pub fn with_results(images: Vec<Result<SourceImage, String>>) -> Self {
        Self {
            images,
            iteration_count: Arc::new(Mutex::new(0)),
        }
    }

    /// Creates an empty mock source.
    #[must_use]
    pub fn empty() -> Self {
        Self::new(vec![])
    }

    /// Returns the number of times the source has been iterated.
    #[must_use]
    pub fn iteration_count(&self) -> usize {
        *self
            .iteration_count
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl ImageSource for MockImageSource {
    fn images(&self) -> Box<dyn Iterator<Item = anyhow::Result<SourceImage>> + Send + '_> {
        *self
            .iteration_count
            .lock()
            .unwrap_or_else(PoisonError::into_inner) += 1;
        Box::new(
            self.images
                .iter()
                .map(|item| item.clone().map_err(anyhow::Error::msg)),
        )
    }

    fn count_hint(&self) -> Option<usize> {
        Some(self.images.len())
    }
}

/// Mock implementation of `ResultOutput` for testing.
///
/// Captures results for later assertions.
#[derive(Default)]
pub struct MockResultOutput {
    results: Mutex<Vec<PhotoResult>>,
    flush_count: AtomicUsize,
}

impl MockResultOutput {
    /// Creates a new mock output.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all captured results.
    #[must_use]
    pub fn results(&self) -> Vec<PhotoResult> {
        self.results
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns the number of times `flush()` was called.
    #[must_use]
    pub fn flush_count(&self) -> usize {
        self.flush_count.load(Ordering::SeqCst)
    }
}

impl ResultOutput for MockResultOutput {
    fn write(&self, result: &PhotoResult) -> anyhow::Result<()> {
        self.results
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(result.clone());
        Ok(())
    }

    fn flush(&self) -> anyhow::Result<()> {
        self.flush_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Mock implementation of `ProgressSink` for testing.
///
/// Captures events for later assertions.
#[derive(Default)]
pub struct MockProgressSink {
    events: Mutex<Vec<ProgressEvent>>,
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

    /// Returns the final counts from the `Finished` event, if any.
    #[must_use]
    pub fn finished_counts(&self) -> Option<(usize, usize)> {
        self.events().iter().find_map(|e| match e {
            ProgressEvent::Finished { processed, skipped } => Some((*processed, *skipped)),
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

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use idcheck_core::{
        DecisionRecord, DecisionStatus, ImageDimensions, InputFormat, Outcome,
    };

    fn source(path: &str) -> SourceImage {
        SourceImage {
            path: path.into(),
            bytes: vec![1, 2, 3],
            format: InputFormat::Png,
        }
    }

    #[test]
    fn test_fixed_score_counts_calls() {
        let model = FixedScoreModel::new(0.4);
        assert_eq!(model.predict(&[0.0; 4]), Ok(0.4));
        assert_eq!(model.predict(&[]), Ok(0.4));
        assert_eq!(model.calls(), 2);
    }

    #[test]
    fn test_failing_model() {
        assert!(matches!(
            FailingModel.predict(&[]),
            Err(ScoringError::Model(_))
        ));
    }

    #[test]
    fn test_mock_image_source() {
        let source = MockImageSource::with_results(vec![
            Ok(source("a.png")),
            Err("unreadable".to_string()),
        ]);
        assert_eq!(source.count_hint(), Some(2));
        let items: Vec<_> = source.images().collect();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].as_ref().unwrap().path, "a.png");
        assert!(items[1].is_err());
        assert_eq!(source.iteration_count(), 1);
    }

    #[test]
    fn test_mock_result_output() {
        let output = MockResultOutput::new();
        let result = PhotoResult {
            path: "a.png".into(),
            timestamp: "2024-01-01T00:00:00Z".into(),
            dimensions: Some(ImageDimensions::new(600, 600)),
            outcome: Outcome::Decision {
                decision: DecisionRecord {
                    status: DecisionStatus::Approved,
                    status_code: 0,
                    findings: vec![],
                    message: "Photo approved: meets all requirements".into(),
                    overall_score: 100,
                    attempts: 1,
                    corrections: vec![],
                },
                corrected_image: None,
            },
        };

        output.write(&result).unwrap();
        output.flush().unwrap();

        assert_eq!(output.results().len(), 1);
        assert!(output.results()[0].is_approved());
        assert_eq!(output.flush_count(), 1);
    }

    #[test]
    fn test_mock_progress_sink() {
        let sink = MockProgressSink::new();
        sink.on_event(ProgressEvent::Completed {
            path: "a.png".into(),
            status: DecisionStatus::Rejected,
        });
        sink.on_event(ProgressEvent::Finished {
            processed: 1,
            skipped: 0,
        });
        assert_eq!(sink.completed_count(), 1);
        assert_eq!(sink.skipped_count(), 0);
        assert_eq!(sink.finished_counts(), Some((1, 0)));
    }
}
