//! Scoring model seam between detectors and inference backends.

use crate::domain::ScoringError;

/// A calibrated binary classifier over region-of-interest features.
///
/// Implementations must be deterministic for a given set of weights.
pub trait ScoringModel: Send + Sync {
    /// Returns the probability that the violation is present.
    ///
    /// # Errors
    ///
    /// Returns [`ScoringError::Model`] if the model cannot be loaded or run.
    fn predict(&self, features: &[f32]) -> Result<f32, ScoringError>;
}
