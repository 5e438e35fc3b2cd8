//! Detector trait for pluggable violation classifiers.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::{Image, QualityReport, ScoringError, ViolationFinding, ViolationKind};

/// Cooperative cancellation flag shared with in-flight detectors.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Creates an unset token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Signals cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Whether cancellation has been signalled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Everything a detector may read.
#[derive(Debug, Clone, Copy)]
pub struct DetectorInput<'a> {
    /// The photo under validation.
    pub image: &'a Image,
    /// Structural report; its face box drives region-of-interest cropping.
    pub report: &'a QualityReport,
    /// Set when the deadline has passed.
    pub cancel: &'a CancelToken,
}

/// When a detector's violations may be fixed automatically.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AutofixPolicy {
    /// Never autofixable.
    Never,
    /// Autofixable while confidence stays at or below the ceiling.
    BelowConfidence(f32),
}

impl AutofixPolicy {
    /// Applies the policy to a confidence value.
    #[must_use]
    pub fn allows(self, confidence: f32) -> bool {
        match self {
            Self::Never => false,
            Self::BelowConfidence(ceiling) => confidence <= ceiling,
        }
    }
}

/// Trait for implementing violation detectors.
///
/// Implementations must be free of side effects and deterministic for a
/// given configuration and set of weights.
pub trait Detector: Send + Sync {
    /// Registry name, also the key for threshold overrides.
    fn name(&self) -> &str;

    /// Kind of violation this detector reports.
    fn kind(&self) -> ViolationKind;

    /// Default rejection threshold.
    fn threshold(&self) -> f32;

    /// Autofix policy for this detector's findings.
    fn autofix_policy(&self) -> AutofixPolicy;

    /// Returns the violation confidence for the photo.
    ///
    /// # Errors
    ///
    /// Returns a [`ScoringError`] if the underlying model cannot be invoked.
    fn score(&self, input: &DetectorInput<'_>) -> Result<f32, ScoringError>;

    /// Scores the photo and wraps the result in a finding.
    ///
    /// # Errors
    ///
    /// Returns [`ScoringError::OutOfRange`] if the confidence is not in
    /// `[0, 1]`, or any error from [`Detector::score`].
    fn evaluate(&self, input: &DetectorInput<'_>) -> Result<ViolationFinding, ScoringError> {
        let confidence = self.score(input)?;
        if !(0.0..=1.0).contains(&confidence) {
            return Err(ScoringError::OutOfRange(confidence));
        }
        Ok(ViolationFinding::new(
            self.name(),
            self.kind(),
            confidence,
            self.autofix_policy().allows(confidence),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_never() {
        assert!(!AutofixPolicy::Never.allows(0.0));
    }

    #[test]
    fn test_policy_ceiling_inclusive() {
        let policy = AutofixPolicy::BelowConfidence(0.7);
        assert!(policy.allows(0.7));
        assert!(!policy.allows(0.71));
    }

    #[test]
    fn test_cancel_token_shared() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
    }
}
