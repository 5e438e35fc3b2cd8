//! Head covering compliance detector.

use std::sync::Arc;

use super::roi::{head_region, score_region};
use super::ScoringModel;
use crate::domain::{AutofixPolicy, Detector, DetectorInput, ScoringError, ViolationKind};

/// Configuration for [`HeadCoveringDetector`].
#[derive(Debug, Clone)]
pub struct HeadCoveringConfig {
    /// Rejection threshold.
    pub threshold: f32,
    /// Violations at or below this confidence are minor misalignment; the
    /// adjuster addresses them only when the top edge clips the head region.
    pub autofix_ceiling: f32,
}

impl Default for HeadCoveringConfig {
    fn default() -> Self {
        Self {
            threshold: 0.5,
            autofix_ceiling: 0.7,
        }
    }
}

/// Scores the head region for a covering that hides the face outline.
pub struct HeadCoveringDetector {
    model: Arc<dyn ScoringModel>,
    config: HeadCoveringConfig,
}

impl HeadCoveringDetector {
    /// Registry name.
    pub const NAME: &'static str = "head_covering";

    /// Creates the detector.
    #[must_use]
    pub fn new(model: Arc<dyn ScoringModel>, config: HeadCoveringConfig) -> Self {
        Self { model, config }
    }
}

impl Detector for HeadCoveringDetector {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn kind(&self) -> ViolationKind {
        ViolationKind::HeadCovering
    }

    fn threshold(&self) -> f32 {
        self.config.threshold
    }

    fn autofix_policy(&self) -> AutofixPolicy {
        AutofixPolicy::BelowConfidence(self.config.autofix_ceiling)
    }

    fn score(&self, input: &DetectorInput<'_>) -> Result<f32, ScoringError> {
        score_region(self.model.as_ref(), input, head_region(input.report))
    }
}
