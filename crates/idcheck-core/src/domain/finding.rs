//! Violation findings produced by detectors and the quality checker.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Kind of compliance violation.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    /// An object (mask, sunglasses, hand) obscures facial features.
    Occlusion,
    /// Head covering is non-compliant or misframed.
    HeadCovering,
    /// Attire does not meet the dress code.
    DressCode,
    /// Face is not centred in the frame.
    OffCenter,
    /// Face occupies too little or too much of the frame.
    FaceSize,
    /// Frame aspect ratio is outside tolerance.
    AspectRatio,
    /// Background is not uniform or not white.
    Background,
    /// Face is under- or overexposed.
    Lighting,
    /// The detector itself failed to produce a score.
    ScoringFailure,
}

impl ViolationKind {
    /// Short label used in messages and serialized records.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Occlusion => "occlusion",
            Self::HeadCovering => "head_covering",
            Self::DressCode => "dress_code",
            Self::OffCenter => "off_center",
            Self::FaceSize => "face_size",
            Self::AspectRatio => "aspect_ratio",
            Self::Background => "background",
            Self::Lighting => "lighting",
            Self::ScoringFailure => "scoring_failure",
        }
    }

    /// Human-readable description of the violation.
    #[must_use]
    pub const fn describe(self) -> &'static str {
        match self {
            Self::Occlusion => "facial features are obscured",
            Self::HeadCovering => "head covering is not compliant",
            Self::DressCode => "attire does not meet the dress code",
            Self::OffCenter => "face is not centred",
            Self::FaceSize => "face size is out of range",
            Self::AspectRatio => "aspect ratio is out of range",
            Self::Background => "background is not plain white",
            Self::Lighting => "face is not evenly lit",
            Self::ScoringFailure => "the check could not be completed",
        }
    }
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A single detector verdict. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViolationFinding {
    /// Name of the detector that produced this finding.
    pub detector: String,
    /// Kind of violation.
    pub kind: ViolationKind,
    /// Calibrated confidence in `[0, 1]`.
    pub confidence: f32,
    /// Whether a deterministic geometric or background transform can fix it.
    pub autofixable: bool,
}

impl ViolationFinding {
    /// Creates a finding.
    #[must_use]
    pub fn new(
        detector: impl Into<String>,
        kind: ViolationKind,
        confidence: f32,
        autofixable: bool,
    ) -> Self {
        Self {
            detector: detector.into(),
            kind,
            confidence,
            autofixable,
        }
    }

    /// Finding recorded when a detector fails: a non-autofixable violation
    /// at full confidence.
    #[must_use]
    pub fn scoring_failure(detector: impl Into<String>) -> Self {
        Self::new(detector, ViolationKind::ScoringFailure, 1.0, false)
    }

    /// Whether this finding blocks approval under `threshold`.
    ///
    /// Scoring failures always exceed.
    #[must_use]
    pub fn exceeds(&self, threshold: f32) -> bool {
        self.kind == ViolationKind::ScoringFailure || self.confidence > threshold
    }

    /// One-line description used in decision messages.
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "{}: {} ({}, confidence {:.2})",
            self.detector,
            self.kind.describe(),
            self.kind,
            self.confidence
        )
    }
}
