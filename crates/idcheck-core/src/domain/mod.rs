//! Core domain types for ID photo validation.

mod config;
mod decision;
mod detector;
mod error;
mod finding;
mod image;
mod plan;
mod quality;
mod result;

pub use config::{CorrectionConfig, FrameTarget, QualityConfig, ValidationConfig};
pub use decision::{AppliedCorrection, Decision, DecisionRecord, DecisionStatus, FindingRecord};
pub use detector::{AutofixPolicy, CancelToken, Detector, DetectorInput};
pub use error::{CorrectionError, InputError, PipelineError, QualityError, ScoringError};
pub use finding::{ViolationFinding, ViolationKind};
pub use image::{BoundingBox, Image, InputFormat};
pub use plan::{CorrectionOp, CorrectionPlan, CorrectionStep};
pub use quality::{CenteringOffset, QualityReport};
pub use result::{CorrectedImageRecord, ErrorRecord, ImageDimensions, Outcome, PhotoResult};
