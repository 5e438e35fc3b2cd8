//! Quality report produced once per pipeline pass.

use serde::{Deserialize, Serialize};

use super::BoundingBox;

/// Face centre offset from the target position, as fractions of the frame.
///
/// Positive `dx` means the face sits right of target, positive `dy` below.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CenteringOffset {
    /// Horizontal offset as a fraction of frame width.
    pub dx: f32,
    /// Vertical offset as a fraction of frame height.
    pub dy: f32,
}

impl CenteringOffset {
    /// Largest absolute component.
    #[must_use]
    pub fn magnitude(&self) -> f32 {
        self.dx.abs().max(self.dy.abs())
    }
}

/// Structural measurements of a photo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityReport {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Resolution meets the configured minimum.
    pub resolution_ok: bool,
    /// Dominant face region.
    pub face_bbox: BoundingBox,
    /// Face plus head and shoulders; everything outside is background.
    pub subject_bbox: BoundingBox,
    /// Face centre offset from target.
    pub centering_offset: CenteringOffset,
    /// Face height as a fraction of frame height.
    pub face_fraction: f32,
    /// Width over height.
    pub aspect_ratio: f32,
    /// 1.0 for a perfectly flat background, falling toward 0.0 with variance.
    pub background_uniformity_score: f32,
    /// Mean background colour.
    pub background_color: [u8; 3],
    /// Mean background luminance (0-255).
    pub background_luma: f32,
}
