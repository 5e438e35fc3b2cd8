//! Per-photo result records written by output adapters.

use serde::{Deserialize, Serialize};

use super::{DecisionRecord, PipelineError};

/// Complete result for a single submitted photo.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhotoResult {
    /// Source path of the photo.
    pub path: String,
    /// Timestamp of validation (ISO 8601).
    pub timestamp: String,
    /// Input dimensions, when the photo decoded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<ImageDimensions>,
    /// Decision or error.
    #[serde(flatten)]
    pub outcome: Outcome,
}

impl PhotoResult {
    /// Whether the photo was approved.
    #[must_use]
    pub fn is_approved(&self) -> bool {
        matches!(&self.outcome, Outcome::Decision { decision, .. } if decision.status_code == 0)
    }

    /// Whether validation failed with an error.
    #[must_use]
    pub const fn is_error(&self) -> bool {
        matches!(self.outcome, Outcome::Error { .. })
    }
}

/// Either a decision or a distinguishable error.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Outcome {
    /// Validation finished.
    Decision {
        /// The decision record.
        #[serde(flatten)]
        decision: DecisionRecord,
        /// Where the corrected image was written, if any.
        #[serde(skip_serializing_if = "Option::is_none")]
        corrected_image: Option<CorrectedImageRecord>,
    },
    /// Validation failed.
    Error {
        /// The error.
        error: ErrorRecord,
    },
}

/// Location of a corrected image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorrectedImageRecord {
    /// Output path.
    pub path: String,
    /// Encoded format.
    pub format: String,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

/// Serializable error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorRecord {
    /// `input`, `quality`, `timeout`, `internal` or `io`.
    pub kind: String,
    /// Human-readable reason.
    pub message: String,
}

impl From<&PipelineError> for ErrorRecord {
    fn from(err: &PipelineError) -> Self {
        Self {
            kind: err.kind().to_string(),
            message: err.to_string(),
        }
    }
}

/// Image dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageDimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl ImageDimensions {
    /// Creates new dimensions.
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}
