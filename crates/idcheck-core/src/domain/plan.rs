//! Correction plans derived from autofixable findings.

use serde::{Deserialize, Serialize};

use super::ViolationKind;

/// A single deterministic image operation.
///
/// Parameters are relative to the face box tracked through the plan, so
/// steps compose regardless of what ran before them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "operation", rename_all = "snake_case")]
pub enum CorrectionOp {
    /// Crop to the given width/height ratio around the face.
    Crop {
        /// Target width over height.
        aspect_ratio: f32,
    },
    /// Rescale the frame content about the face centre.
    Scale {
        /// Multiplier applied to the content.
        factor: f32,
    },
    /// Move the face centre to a target position.
    Translate {
        /// Target centre x as a fraction of frame width.
        target_x: f32,
        /// Target centre y as a fraction of frame height.
        target_y: f32,
    },
    /// Move the content down until the frame holds the area above the face.
    Headroom {
        /// Space above the face as a fraction of face height.
        margin: f32,
    },
    /// Scale and place the content in a fixed output frame.
    Frame {
        /// Output width in pixels.
        width: u32,
        /// Output height in pixels.
        height: u32,
        /// Face height as a fraction of output height.
        face_fraction: f32,
        /// Face centre y as a fraction of output height.
        face_center_y: f32,
    },
    /// Replace background pixels with a flat colour.
    BackgroundReplace {
        /// Fill colour.
        fill: [u8; 3],
    },
}

impl CorrectionOp {
    /// Operation name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Crop { .. } => "crop",
            Self::Scale { .. } => "scale",
            Self::Translate { .. } => "translate",
            Self::Headroom { .. } => "headroom",
            Self::Frame { .. } => "frame",
            Self::BackgroundReplace { .. } => "background_replace",
        }
    }

    /// Application rank: local geometry first, then the output frame, then
    /// background.
    #[must_use]
    pub const fn rank(&self) -> u8 {
        match self {
            Self::Crop { .. } => 0,
            Self::Scale { .. } => 1,
            Self::Translate { .. } => 2,
            Self::Headroom { .. } => 3,
            Self::Frame { .. } => 4,
            Self::BackgroundReplace { .. } => 5,
        }
    }

    /// Whether the operation changes geometry.
    #[must_use]
    pub const fn is_geometric(&self) -> bool {
        !matches!(self, Self::BackgroundReplace { .. })
    }
}

/// One plan step and the violation it addresses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrectionStep {
    /// Violation this step fixes.
    pub source: ViolationKind,
    /// Operation to apply.
    pub op: CorrectionOp,
}

/// Ordered correction steps, consumed once by the adjuster.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CorrectionPlan {
    steps: Vec<CorrectionStep>,
}

impl CorrectionPlan {
    /// Creates an empty plan.
    #[must_use]
    pub const fn new() -> Self {
        Self { steps: Vec::new() }
    }

    /// Adds a step.
    ///
    /// At most one step per operation kind is kept; the first one wins.
    /// Returns `false` if the step was dropped as a duplicate.
    pub fn push(&mut self, source: ViolationKind, op: CorrectionOp) -> bool {
        if self.steps.iter().any(|s| s.op.name() == op.name()) {
            return false;
        }
        self.steps.push(CorrectionStep { source, op });
        self.steps.sort_by_key(|s| s.op.rank());
        true
    }

    /// Steps in application order.
    #[must_use]
    pub fn steps(&self) -> &[CorrectionStep] {
        &self.steps
    }

    /// Whether the plan has no steps.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

impl IntoIterator for CorrectionPlan {
    type Item = CorrectionStep;
    type IntoIter = std::vec::IntoIter<CorrectionStep>;

    fn into_iter(self) -> Self::IntoIter {
        self.steps.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geometry_sorted_before_background() {
        let mut plan = CorrectionPlan::new();
        plan.push(
            ViolationKind::Background,
            CorrectionOp::BackgroundReplace {
                fill: [255, 255, 255],
            },
        );
        plan.push(
            ViolationKind::OffCenter,
            CorrectionOp::Translate {
                target_x: 0.5,
                target_y: 0.5,
            },
        );
        plan.push(ViolationKind::FaceSize, CorrectionOp::Scale { factor: 1.2 });
        plan.push(
            ViolationKind::HeadCovering,
            CorrectionOp::Headroom { margin: 0.6 },
        );
        plan.push(
            ViolationKind::AspectRatio,
            CorrectionOp::Crop { aspect_ratio: 0.75 },
        );

        let names: Vec<_> = plan.steps().iter().map(|s| s.op.name()).collect();
        assert_eq!(
            names,
            ["crop", "scale", "translate", "headroom", "background_replace"]
        );
    }

    #[test]
    fn test_duplicate_operation_dropped() {
        let mut plan = CorrectionPlan::new();
        let translate = CorrectionOp::Translate {
            target_x: 0.5,
            target_y: 0.5,
        };
        assert!(plan.push(ViolationKind::OffCenter, translate));
        assert!(!plan.push(ViolationKind::FaceSize, translate));
        assert_eq!(plan.steps().len(), 1);
        assert_eq!(plan.steps()[0].source, ViolationKind::OffCenter);
    }
}
