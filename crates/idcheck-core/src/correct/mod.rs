//! Corrective adjuster.
//!
//! Derives a [`CorrectionPlan`] from autofixable findings and applies it to
//! produce a new image. Geometry steps run before background replacement
//! because they move the face box the background mask is built from. When
//! an output frame is configured, every plan ends with fitting the result
//! to it.

mod ops;

pub use ops::{
    add_headroom, crop_to_aspect, fit_to_frame, replace_background, scale_about_face,
    translate_face, OpOutput,
};

use tracing::debug;

use crate::detectors::{missing_headroom, HEAD_TOP_MARGIN};
use crate::domain::{
    AppliedCorrection, CorrectionError, CorrectionOp, CorrectionPlan, FrameTarget, Image,
    QualityReport, ValidationConfig, ViolationFinding, ViolationKind,
};

/// Image produced by applying a plan.
#[derive(Debug, Clone)]
pub struct CorrectedImage {
    /// The new image.
    pub image: Image,
    /// Steps applied, in order.
    pub applied: Vec<AppliedCorrection>,
}

/// Stateless corrective adjuster.
#[derive(Debug, Clone, Copy, Default)]
pub struct CorrectiveAdjuster;

impl CorrectiveAdjuster {
    /// Creates an adjuster.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Derives one plan step per autofixable finding, followed by an output
    /// frame step when one is configured.
    ///
    /// A head covering finding is only addressable when the top of the
    /// frame clips the area above the face; the step then adds headroom so
    /// the detector sees the whole head on re-validation.
    ///
    /// # Errors
    ///
    /// Returns [`CorrectionError::NoStepFor`] if a finding has no matching
    /// operation, or [`CorrectionError::ScaleOutOfRange`] if no permitted
    /// scale factor brings the face size into range.
    pub fn plan(
        &self,
        findings: &[ViolationFinding],
        report: &QualityReport,
        config: &ValidationConfig,
    ) -> Result<CorrectionPlan, CorrectionError> {
        let q = &config.quality;
        let c = &config.correction;
        let mut plan = CorrectionPlan::new();

        for finding in findings.iter().filter(|f| f.autofixable) {
            let op = match finding.kind {
                ViolationKind::OffCenter => CorrectionOp::Translate {
                    target_x: q.target_center.0,
                    target_y: q.target_center.1,
                },
                ViolationKind::HeadCovering if missing_headroom(report.face_bbox) > 0 => {
                    CorrectionOp::Headroom {
                        margin: HEAD_TOP_MARGIN,
                    }
                }
                ViolationKind::FaceSize => CorrectionOp::Scale {
                    factor: scale_factor(report.face_fraction, config)?,
                },
                ViolationKind::AspectRatio => CorrectionOp::Crop {
                    aspect_ratio: (q.aspect_range.0 + q.aspect_range.1) / 2.0,
                },
                ViolationKind::Background => CorrectionOp::BackgroundReplace {
                    fill: c.background_fill,
                },
                ViolationKind::HeadCovering
                | ViolationKind::Occlusion
                | ViolationKind::DressCode
                | ViolationKind::Lighting
                | ViolationKind::ScoringFailure => {
                    return Err(CorrectionError::NoStepFor(finding.detector.clone()));
                }
            };
            if !plan.push(finding.kind, op) {
                debug!(detector = %finding.detector, op = op.name(), "Step already planned");
            }
        }

        let first_source = plan.steps().first().map(|s| s.source);
        if let (Some(frame), Some(source)) = (c.output_frame, first_source) {
            plan.push(
                source,
                CorrectionOp::Frame {
                    width: frame.width,
                    height: frame.height,
                    face_fraction: frame.face_fraction,
                    face_center_y: frame.face_center_y,
                },
            );
        }

        Ok(plan)
    }

    /// Applies a plan to `image`; the input is left untouched.
    ///
    /// # Errors
    ///
    /// Returns a [`CorrectionError`] if any step cannot be applied.
    pub fn apply(
        &self,
        image: &Image,
        plan: &CorrectionPlan,
        report: &QualityReport,
        config: &ValidationConfig,
    ) -> Result<CorrectedImage, CorrectionError> {
        let c = &config.correction;
        let mut pixels = image.pixels().clone();
        let mut face = report.face_bbox;
        let mut applied = Vec::with_capacity(plan.steps().len());

        for step in plan.steps() {
            let out = match step.op {
                CorrectionOp::Crop { aspect_ratio } => {
                    crop_to_aspect(&pixels, face, aspect_ratio, config.min_resolution)?
                }
                CorrectionOp::Scale { factor } => {
                    scale_about_face(&pixels, face, factor, c.background_fill)?
                }
                CorrectionOp::Translate { target_x, target_y } => {
                    translate_face(&pixels, face, target_x, target_y, c.background_fill)?
                }
                CorrectionOp::Headroom { margin } => {
                    add_headroom(&pixels, face, margin, c.background_fill)?
                }
                CorrectionOp::Frame {
                    width,
                    height,
                    face_fraction,
                    face_center_y,
                } => fit_to_frame(
                    &pixels,
                    face,
                    FrameTarget {
                        width,
                        height,
                        face_fraction,
                        face_center_y,
                    },
                    c.background_fill,
                )?,
                CorrectionOp::BackgroundReplace { fill } => replace_background(
                    &pixels,
                    face,
                    report.background_color,
                    fill,
                    c.background_tolerance,
                ),
            };
            debug!(op = step.op.name(), source = %step.source, "{}", out.description);
            applied.push(AppliedCorrection {
                operation: step.op.name().to_string(),
                description: out.description,
            });
            pixels = out.pixels;
            face = out.face;
        }

        Ok(CorrectedImage {
            image: Image::from_rgb(pixels),
            applied,
        })
    }
}

/// Scale factor that moves the face fraction toward the target, clamped
/// to the permitted range.
fn scale_factor(face_fraction: f32, config: &ValidationConfig) -> Result<f32, CorrectionError> {
    let (lo, hi) = config.quality.face_fraction_range;
    let (min_scale, max_scale) = config.correction.scale_range;
    let wanted = config.correction.target_face_fraction / face_fraction.max(f32::EPSILON);
    let factor = wanted.clamp(min_scale, max_scale);
    let result = face_fraction * factor;
    if result < lo || result > hi {
        return Err(CorrectionError::ScaleOutOfRange(wanted));
    }
    Ok(factor)
}
