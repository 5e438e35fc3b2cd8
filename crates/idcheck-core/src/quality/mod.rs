//! Classical geometry and quality checks.
//!
//! Runs before any detector. Structural problems that no correction can
//! address abort with a [`QualityError`]; everything else is reported as a
//! [`ViolationFinding`] so it flows through the same aggregation as the
//! detector findings.

#![allow(clippy::cast_precision_loss)]

mod background;
mod face;
mod lighting;

pub use background::{subject_region, BackgroundStats};
pub use face::{FaceLocator, SkinToneConfig, SkinToneLocator};
pub use lighting::{luma, Histogram, LightingAnalysis};

use tracing::debug;

use crate::domain::{
    BoundingBox, CenteringOffset, Image, QualityConfig, QualityError, QualityReport,
    ValidationConfig, ViolationFinding, ViolationKind,
};

/// Finding name for face centring.
pub const CENTERING: &str = "centering";
/// Finding name for face size within the frame.
pub const FACE_SIZE: &str = "face_size";
/// Finding name for frame aspect ratio.
pub const ASPECT_RATIO: &str = "aspect_ratio";
/// Finding name for background tone and uniformity.
pub const BACKGROUND: &str = "background";
/// Finding name for face lighting.
pub const LIGHTING: &str = "lighting";

/// Default thresholds for the quality findings, in reporting order.
pub const DEFAULT_THRESHOLDS: [(&str, f32); 5] = [
    (CENTERING, 0.5),
    (FACE_SIZE, 0.5),
    (ASPECT_RATIO, 0.5),
    (BACKGROUND, 0.5),
    (LIGHTING, 0.3),
];

/// Share of the face box, centred, used for lighting analysis.
const FACE_CORE: f32 = 0.6;

/// Report plus soft findings from one quality pass.
#[derive(Debug, Clone)]
pub struct QualityAssessment {
    /// Structural measurements.
    pub report: QualityReport,
    /// Geometry, background and lighting findings.
    pub findings: Vec<ViolationFinding>,
}

/// Geometry and quality checker.
pub struct QualityChecker {
    locator: Box<dyn FaceLocator>,
}

impl Default for QualityChecker {
    fn default() -> Self {
        Self::new(Box::new(SkinToneLocator::default()))
    }
}

impl QualityChecker {
    /// Creates a checker with a custom face locator.
    #[must_use]
    pub fn new(locator: Box<dyn FaceLocator>) -> Self {
        Self { locator }
    }

    /// Measures the photo.
    ///
    /// # Errors
    ///
    /// Returns a [`QualityError`] if the resolution is too low, the aspect
    /// ratio is beyond repair, or there is not exactly one fully visible
    /// face of usable size.
    pub fn check(
        &self,
        image: &Image,
        config: &ValidationConfig,
    ) -> Result<QualityAssessment, QualityError> {
        let q = &config.quality;
        let (width, height) = (image.width(), image.height());
        let (min_width, min_height) = config.min_resolution;

        if width < min_width || height < min_height {
            return Err(QualityError::ResolutionTooLow {
                width,
                height,
                min_width,
                min_height,
            });
        }

        let aspect_ratio = width as f32 / height as f32;
        if aspect_ratio < q.aspect_hard_limits.0 || aspect_ratio > q.aspect_hard_limits.1 {
            return Err(QualityError::AspectRatioOutOfRange {
                actual: aspect_ratio,
            });
        }

        let face = self.locator.locate(image)?;
        let face_fraction = face.height as f32 / height as f32;
        if face_fraction < q.min_face_fraction {
            return Err(QualityError::FaceTooSmall {
                fraction: face_fraction,
            });
        }
        if face.touches_edge(width, height) {
            return Err(QualityError::FaceCropped);
        }

        let (cx, cy) = face.center();
        let centering_offset = CenteringOffset {
            dx: cx / width as f32 - q.target_center.0,
            dy: cy / height as f32 - q.target_center.1,
        };

        let subject = subject_region(face, width, height);
        let background = BackgroundStats::measure(image.pixels(), subject);

        let report = QualityReport {
            width,
            height,
            resolution_ok: true,
            face_bbox: face,
            subject_bbox: subject,
            centering_offset,
            face_fraction,
            aspect_ratio,
            background_uniformity_score: background.uniformity(),
            background_color: background.mean,
            background_luma: background.luma,
        };
        debug!(?report, "Quality report");

        let findings = soft_findings(image, &report, &background, q);
        Ok(QualityAssessment { report, findings })
    }
}

/// Confidence for a value measured against an accepted band.
///
/// 0.0 anywhere inside the band, 0.5 at its edge, reaching 1.0 one
/// half-width outside it.
fn band_confidence(value: f32, (lo, hi): (f32, f32)) -> f32 {
    let half = ((hi - lo) / 2.0).max(f32::EPSILON);
    let outside = (lo - value).max(value - hi);
    if outside < 0.0 {
        return 0.0;
    }
    (0.5 + 0.5 * outside / half).clamp(0.0, 1.0)
}

/// Central part of the face box.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn face_core(face: BoundingBox) -> BoundingBox {
    let margin_x = (face.width as f32 * (1.0 - FACE_CORE) / 2.0).round() as u32;
    let margin_y = (face.height as f32 * (1.0 - FACE_CORE) / 2.0).round() as u32;
    BoundingBox::new(
        face.x + margin_x,
        face.y + margin_y,
        face.width.saturating_sub(2 * margin_x).max(1),
        face.height.saturating_sub(2 * margin_y).max(1),
    )
}

fn soft_findings(
    image: &Image,
    report: &QualityReport,
    background: &BackgroundStats,
    q: &QualityConfig,
) -> Vec<ViolationFinding> {
    let centering = (report.centering_offset.magnitude() / (2.0 * q.centering_tolerance))
        .clamp(0.0, 1.0);
    let face_size = band_confidence(report.face_fraction, q.face_fraction_range);
    let aspect = band_confidence(report.aspect_ratio, q.aspect_range);
    let (background_confidence, background_fixable) = background.assess(q);
    let lighting = LightingAnalysis::analyze(
        image.pixels(),
        face_core(report.face_bbox),
        q.shadow_clip_level,
        q.highlight_clip_level,
    );
    debug!(
        centering,
        face_size,
        aspect,
        background = background_confidence,
        lighting = lighting.score(),
        "Quality scores"
    );

    [
        (CENTERING, ViolationKind::OffCenter, centering, true),
        (FACE_SIZE, ViolationKind::FaceSize, face_size, true),
        (ASPECT_RATIO, ViolationKind::AspectRatio, aspect, true),
        (
            BACKGROUND,
            ViolationKind::Background,
            background_confidence,
            background_fixable,
        ),
        (LIGHTING, ViolationKind::Lighting, lighting.score(), false),
    ]
    .into_iter()
    .filter(|&(_, _, confidence, _)| confidence >= q.borderline_floor)
    .map(|(name, kind, confidence, fixable)| ViolationFinding::new(name, kind, confidence, fixable))
    .collect()
}
