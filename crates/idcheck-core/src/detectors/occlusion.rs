//! Face occlusion detector (sunglasses, masks, hands over the face).

use std::sync::Arc;

use super::roi::{face_region, score_region};
use super::ScoringModel;
use crate::domain::{AutofixPolicy, Detector, DetectorInput, ScoringError, ViolationKind};

/// Configuration for [`OcclusionDetector`].
#[derive(Debug, Clone)]
pub struct OcclusionConfig {
    /// Rejection threshold.
    pub threshold: f32,
}

impl Default for OcclusionConfig {
    fn default() -> Self {
        Self { threshold: 0.5 }
    }
}

/// Scores the face box for anything covering facial features.
///
/// Occlusion is never autofixable: removing it would alter facial pixels.
pub struct OcclusionDetector {
    model: Arc<dyn ScoringModel>,
    config: OcclusionConfig,
}

impl OcclusionDetector {
    /// Registry name.
    pub const NAME: &'static str = "occlusion";

    /// Creates the detector.
    #[must_use]
    pub fn new(model: Arc<dyn ScoringModel>, config: OcclusionConfig) -> Self {
        Self { model, config }
    }
}

impl Detector for OcclusionDetector {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn kind(&self) -> ViolationKind {
        ViolationKind::Occlusion
    }

    fn threshold(&self) -> f32 {
        self.config.threshold
    }

    fn autofix_policy(&self) -> AutofixPolicy {
        AutofixPolicy::Never
    }

    fn score(&self, input: &DetectorInput<'_>) -> Result<f32, ScoringError> {
        score_region(self.model.as_ref(), input, face_region(input.report))
    }
}
