//! Per-call validation configuration.

use std::collections::BTreeMap;
use std::time::Duration;

/// Immutable configuration for one `validate` call.
///
/// Passed explicitly on every call so concurrent validations with different
/// settings never interfere.
#[derive(Debug, Clone)]
pub struct ValidationConfig {
    /// Minimum `(width, height)` in pixels.
    pub min_resolution: (u32, u32),
    /// Threshold overrides keyed by detector name.
    pub detector_thresholds: BTreeMap<String, f32>,
    /// Maximum number of correct-and-revalidate rounds.
    pub max_correction_retries: u32,
    /// Whether to attempt automatic correction at all.
    pub enable_autofix: bool,
    /// Wall-clock budget for the whole call.
    pub deadline: Option<Duration>,
    /// Quality checker tuning.
    pub quality: QualityConfig,
    /// Adjuster tuning.
    pub correction: CorrectionConfig,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            min_resolution: (300, 300),
            detector_thresholds: BTreeMap::new(),
            max_correction_retries: 1,
            enable_autofix: true,
            deadline: None,
            quality: QualityConfig::default(),
            correction: CorrectionConfig::default(),
        }
    }
}

impl ValidationConfig {
    /// Sets a threshold override for one detector.
    #[must_use]
    pub fn with_threshold(mut self, detector: impl Into<String>, threshold: f32) -> Self {
        self.detector_thresholds.insert(detector.into(), threshold);
        self
    }

    /// Sets the deadline.
    #[must_use]
    pub const fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Enables or disables automatic correction.
    #[must_use]
    pub const fn with_autofix(mut self, enabled: bool) -> Self {
        self.enable_autofix = enabled;
        self
    }

    /// Sets the retry cap.
    #[must_use]
    pub const fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_correction_retries = retries;
        self
    }

    /// Sets the minimum resolution.
    #[must_use]
    pub const fn with_min_resolution(mut self, width: u32, height: u32) -> Self {
        self.min_resolution = (width, height);
        self
    }

    /// Fits corrected photos to a fixed output frame.
    #[must_use]
    pub const fn with_output_frame(mut self, frame: FrameTarget) -> Self {
        self.correction.output_frame = Some(frame);
        self
    }
}

/// Configuration for the geometry/quality checker.
#[derive(Debug, Clone)]
pub struct QualityConfig {
    /// Accepted width/height range.
    pub aspect_range: (f32, f32),
    /// Hard limits beyond which the frame cannot be cropped into range.
    pub aspect_hard_limits: (f32, f32),
    /// Accepted face height as a fraction of frame height.
    pub face_fraction_range: (f32, f32),
    /// Below this fraction the face is not a dominant region at all.
    pub min_face_fraction: f32,
    /// Target face centre as fractions of the frame.
    pub target_center: (f32, f32),
    /// Centre offset (fraction of frame) at which centring is violated.
    pub centering_tolerance: f32,
    /// Background uniformity score below which the background is violated.
    pub background_uniformity_min: f32,
    /// Uniformity below which the background is clutter, not fixable.
    pub background_clutter_floor: f32,
    /// Mean luminance at or above which the background counts as white.
    pub background_white_floor: f32,
    /// Mean luminance at or above which a background is light enough to replace.
    pub background_light_floor: f32,
    /// Shadow clipping level for face lighting (0-255).
    pub shadow_clip_level: u8,
    /// Highlight clipping level for face lighting (0-255).
    pub highlight_clip_level: u8,
    /// Geometry findings below this confidence are not reported at all.
    pub borderline_floor: f32,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            aspect_range: (0.70, 1.05),
            aspect_hard_limits: (0.5, 1.6),
            face_fraction_range: (0.25, 0.65),
            min_face_fraction: 0.08,
            target_center: (0.5, 0.5),
            centering_tolerance: 0.05,
            background_uniformity_min: 0.85,
            background_clutter_floor: 0.5,
            background_white_floor: 235.0,
            background_light_floor: 170.0,
            shadow_clip_level: 8,
            highlight_clip_level: 247,
            borderline_floor: 0.25,
        }
    }
}

/// Configuration for the corrective adjuster.
#[derive(Debug, Clone)]
pub struct CorrectionConfig {
    /// Colour used for padding and background replacement.
    pub background_fill: [u8; 3],
    /// Face height fraction that scale corrections aim for.
    pub target_face_fraction: f32,
    /// Permitted scale factor range.
    pub scale_range: (f32, f32),
    /// Colour distance under which a pixel in the subject region still
    /// counts as background.
    pub background_tolerance: f32,
    /// Frame every corrected photo is fitted to; `None` keeps the input
    /// frame size.
    pub output_frame: Option<FrameTarget>,
}

/// Output frame for corrected photos.
///
/// The content is scaled so the face fills `face_fraction` of the frame
/// height, then placed with the face centred horizontally and its centre
/// at `face_center_y`. Uncovered margins take the background fill.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameTarget {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Face height as a fraction of frame height.
    pub face_fraction: f32,
    /// Face centre y as a fraction of frame height.
    pub face_center_y: f32,
}

impl FrameTarget {
    /// 480x640 portrait with the face at half the frame height, centred
    /// slightly below the middle so the shoulders reach the bottom edge.
    pub const STANDARD: Self = Self {
        width: 480,
        height: 640,
        face_fraction: 0.5,
        face_center_y: 0.52,
    };

    /// Same placement in a frame of a different size.
    #[must_use]
    pub const fn with_size(self, width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ..self
        }
    }
}

impl Default for FrameTarget {
    fn default() -> Self {
        Self::STANDARD
    }
}

impl Default for CorrectionConfig {
    fn default() -> Self {
        Self {
            background_fill: [255, 255, 255],
            target_face_fraction: 0.45,
            scale_range: (0.5, 2.0),
            background_tolerance: 40.0,
            output_frame: None,
        }
    }
}
