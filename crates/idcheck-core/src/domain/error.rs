use std::time::Duration;

use thiserror::Error;

/// The submitted bytes are not a usable image.
#[derive(Debug, Error)]
pub enum InputError {
    #[error("image data is empty")]
    Empty,

    #[error("unsupported image format")]
    UnsupportedFormat,

    #[error("failed to decode image: {0}")]
    Decode(String),

    #[error("image dimensions are zero")]
    ZeroDimensions,
}

/// A structural problem no automatic correction can address.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum QualityError {
    #[error("resolution {width}x{height} is below the required {min_width}x{min_height}")]
    ResolutionTooLow {
        width: u32,
        height: u32,
        min_width: u32,
        min_height: u32,
    },

    #[error("aspect ratio {actual:.2} is far outside the accepted range")]
    AspectRatioOutOfRange { actual: f32 },

    #[error("no face detected")]
    NoFace,

    #[error("{count} faces detected, exactly one is required")]
    MultipleFaces { count: usize },

    #[error("face is cut off by the frame edge")]
    FaceCropped,

    #[error("face region is too small to validate ({fraction:.2} of frame height)")]
    FaceTooSmall { fraction: f32 },
}

/// A single detector could not produce a score.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ScoringError {
    #[error("confidence {0} is outside [0, 1]")]
    OutOfRange(f32),

    #[error("model invocation failed: {0}")]
    Model(String),

    #[error("region of interest is empty")]
    EmptyRegion,

    #[error("detector panicked: {0}")]
    Panicked(String),

    #[error("scoring cancelled")]
    Cancelled,
}

/// The adjuster could not apply a correction plan.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CorrectionError {
    #[error("no correction step addresses {0}")]
    NoStepFor(String),

    #[error("correction would move the face out of the frame")]
    FaceOutOfFrame,

    #[error("scale factor {0:.2} is outside the permitted range")]
    ScaleOutOfRange(f32),

    #[error("crop would leave {width}x{height}, below the minimum resolution")]
    CropTooSmall { width: u32, height: u32 },

    #[error("corrected photo failed re-validation: {0}")]
    Revalidation(QualityError),
}

/// Failure of a whole `validate` call.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid input: {0}")]
    Input(#[from] InputError),

    #[error("quality check failed: {0}")]
    Quality(#[from] QualityError),

    #[error("validation did not finish within {deadline:?}")]
    Timeout { deadline: Duration },

    #[error("detector stage failed: {0}")]
    Internal(String),
}

impl PipelineError {
    /// Stable kind label for boundary records.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Input(_) => "input",
            Self::Quality(_) => "quality",
            Self::Timeout { .. } => "timeout",
            Self::Internal(_) => "internal",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_labels() {
        assert_eq!(PipelineError::from(InputError::Empty).kind(), "input");
        assert_eq!(PipelineError::from(QualityError::NoFace).kind(), "quality");
        let timeout = PipelineError::Timeout {
            deadline: Duration::from_millis(50),
        };
        assert_eq!(timeout.kind(), "timeout");
        assert!(timeout.to_string().contains("50ms"));
    }

    #[test]
    fn test_quality_messages() {
        let err = QualityError::ResolutionTooLow {
            width: 100,
            height: 120,
            min_width: 300,
            min_height: 400,
        };
        assert_eq!(
            err.to_string(),
            "resolution 100x120 is below the required 300x400"
        );
    }
}
