//! Regions of interest and the colour-grid features fed to scoring models.

#![allow(clippy::cast_precision_loss)]

use image::imageops::{self, FilterType};

use super::ScoringModel;
use crate::domain::{BoundingBox, DetectorInput, Image, QualityReport, ScoringError};

/// Side length of the feature grid.
pub const GRID: u32 = 16;
/// Length of a feature vector: mean RGB per grid cell.
pub const FEATURE_LEN: usize = (GRID * GRID * 3) as usize;

/// Face box only.
#[must_use]
pub fn face_region(report: &QualityReport) -> BoundingBox {
    report.face_bbox
}

/// Space above the face, as a fraction of face height, that the head
/// region reaches up to.
pub const HEAD_TOP_MARGIN: f32 = 0.6;

/// Face plus hair line, ears and the area a head covering occupies.
#[must_use]
pub fn head_region(report: &QualityReport) -> BoundingBox {
    report
        .face_bbox
        .expand(0.3, 0.3, HEAD_TOP_MARGIN, 0.1, report.width, report.height)
}

/// Rows by which the top of the frame clips the head region of `face`.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn missing_headroom(face: BoundingBox) -> u32 {
    let needed = (face.height as f32 * HEAD_TOP_MARGIN).round() as u32;
    needed.saturating_sub(face.y)
}

/// Shoulders and upper torso below the face.
#[must_use]
pub fn torso_region(report: &QualityReport) -> BoundingBox {
    let face = report.face_bbox;
    let span = face.expand(0.75, 0.75, 0.0, 0.0, report.width, report.height);
    BoundingBox::new(
        span.x,
        face.bottom(),
        span.width,
        report.height.saturating_sub(face.bottom()),
    )
}

/// Resamples a region to the feature grid and flattens it to `[0, 1]` RGB.
///
/// # Errors
///
/// Returns [`ScoringError::EmptyRegion`] if the region has no pixels inside
/// the frame.
pub fn region_features(image: &Image, region: BoundingBox) -> Result<Vec<f32>, ScoringError> {
    let pixels = image.pixels();
    let width = region.width.min(pixels.width().saturating_sub(region.x));
    let height = region.height.min(pixels.height().saturating_sub(region.y));
    if width == 0 || height == 0 {
        return Err(ScoringError::EmptyRegion);
    }

    let crop = imageops::crop_imm(pixels, region.x, region.y, width, height).to_image();
    let grid = imageops::resize(&crop, GRID, GRID, FilterType::Triangle);
    Ok(grid
        .pixels()
        .flat_map(|p| p.0)
        .map(|v| f32::from(v) / 255.0)
        .collect())
}

/// Shared scoring path for region-based detectors.
///
/// Checks the cancel token before and after feature extraction so a late
/// detector stops before invoking its model.
pub(crate) fn score_region(
    model: &dyn ScoringModel,
    input: &DetectorInput<'_>,
    region: BoundingBox,
) -> Result<f32, ScoringError> {
    if input.cancel.is_cancelled() {
        return Err(ScoringError::Cancelled);
    }
    let features = region_features(input.image, region)?;
    if input.cancel.is_cancelled() {
        return Err(ScoringError::Cancelled);
    }
    model.predict(&features)
}
