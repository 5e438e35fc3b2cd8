//! Dress code detector.

use std::sync::Arc;

use super::roi::{score_region, torso_region};
use super::ScoringModel;
use crate::domain::{AutofixPolicy, Detector, DetectorInput, ScoringError, ViolationKind};

/// Configuration for [`DressCodeDetector`].
#[derive(Debug, Clone)]
pub struct DressCodeConfig {
    /// Rejection threshold.
    pub threshold: f32,
}

impl Default for DressCodeConfig {
    fn default() -> Self {
        Self { threshold: 0.5 }
    }
}

/// Scores the shoulders and upper torso for non-compliant attire.
///
/// Independent of [`HeadCoveringDetector`](super::HeadCoveringDetector);
/// the two share no model state.
pub struct DressCodeDetector {
    model: Arc<dyn ScoringModel>,
    config: DressCodeConfig,
}

impl DressCodeDetector {
    /// Registry name.
    pub const NAME: &'static str = "dress_code";

    /// Creates the detector.
    #[must_use]
    pub fn new(model: Arc<dyn ScoringModel>, config: DressCodeConfig) -> Self {
        Self { model, config }
    }
}

impl Detector for DressCodeDetector {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn kind(&self) -> ViolationKind {
        ViolationKind::DressCode
    }

    fn threshold(&self) -> f32 {
        self.config.threshold
    }

    fn autofix_policy(&self) -> AutofixPolicy {
        AutofixPolicy::Never
    }

    fn score(&self, input: &DetectorInput<'_>) -> Result<f32, ScoringError> {
        score_region(self.model.as_ref(), input, torso_region(input.report))
    }
}
