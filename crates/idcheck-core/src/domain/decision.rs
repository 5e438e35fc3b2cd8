//! Terminal decision of one pipeline invocation and its boundary record.

use serde::{Deserialize, Serialize};

use super::{Image, ViolationFinding, ViolationKind};

/// Outcome status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionStatus {
    /// No finding exceeds its threshold.
    Approved,
    /// Every violation is autofixable.
    NeedsCorrection,
    /// At least one violation requires a new photo.
    Rejected,
}

impl DecisionStatus {
    /// Numeric status code used at the boundary.
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::Approved => 0,
            Self::NeedsCorrection => 1,
            Self::Rejected => 2,
        }
    }
}

/// A correction step that was applied to produce the final image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppliedCorrection {
    /// Operation kind (`crop`, `scale`, `translate`, `headroom`, `frame`,
    /// `background_replace`).
    pub operation: String,
    /// What the step did.
    pub description: String,
}

/// Terminal output of one `validate` call.
#[derive(Debug, Clone)]
pub struct Decision {
    /// Outcome status.
    pub status: DecisionStatus,
    /// Violations above threshold, by descending confidence then
    /// registration order.
    pub findings: Vec<ViolationFinding>,
    /// Human-readable explanation.
    pub message: String,
    /// 0-100, higher is better.
    pub overall_score: u8,
    /// Number of validation passes run (1 + correction retries).
    pub attempts: u32,
    /// Correction steps applied across retries.
    pub corrections: Vec<AppliedCorrection>,
    /// Corrected image, present only when autofix led to approval.
    pub corrected_image: Option<Image>,
}

impl Decision {
    /// Whether the photo was accepted.
    #[must_use]
    pub fn is_approved(&self) -> bool {
        self.status == DecisionStatus::Approved
    }

    /// Serializable boundary view of this decision.
    #[must_use]
    pub fn to_record(&self) -> DecisionRecord {
        DecisionRecord::from(self)
    }
}

/// One violation as reported at the boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FindingRecord {
    /// Detector name.
    pub detector: String,
    /// Violation kind.
    pub kind: ViolationKind,
    /// Confidence in `[0, 1]`.
    pub confidence: f32,
    /// Whether the violation can be fixed automatically.
    pub autofixable: bool,
    /// Human-readable reason.
    pub message: String,
}

/// Structured decision record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionRecord {
    /// Outcome status.
    pub status: DecisionStatus,
    /// Numeric status code (0 approved, 1 needs correction, 2 rejected).
    pub status_code: u8,
    /// Ordered violations.
    pub findings: Vec<FindingRecord>,
    /// Human-readable explanation.
    pub message: String,
    /// 0-100, higher is better.
    pub overall_score: u8,
    /// Validation passes run.
    pub attempts: u32,
    /// Applied corrections.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub corrections: Vec<AppliedCorrection>,
}

impl From<&Decision> for DecisionRecord {
    fn from(decision: &Decision) -> Self {
        Self {
            status: decision.status,
            status_code: decision.status.code(),
            findings: decision
                .findings
                .iter()
                .map(|f| FindingRecord {
                    detector: f.detector.clone(),
                    kind: f.kind,
                    confidence: f.confidence,
                    autofixable: f.autofixable,
                    message: f.kind.describe().to_string(),
                })
                .collect(),
            message: decision.message.clone(),
            overall_score: decision.overall_score,
            attempts: decision.attempts,
            corrections: decision.corrections.clone(),
        }
    }
}
