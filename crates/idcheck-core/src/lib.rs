//! idcheck core - ID photo compliance pipeline.
//!
//! This crate contains the domain types, the detector trait and its
//! implementations, the classical quality checker, the aggregator, the
//! corrective adjuster and the pipeline orchestrator that ties them together.

pub mod aggregate;
pub mod correct;
pub mod detectors;
pub mod domain;
pub mod inference;
pub mod pipeline;
pub mod ports;
pub mod quality;

pub use aggregate::{Aggregator, ThresholdTable};
pub use correct::{CorrectedImage, CorrectiveAdjuster};
pub use detectors::{
    AutofixPolicy, DetectorRegistry, DressCodeConfig, DressCodeDetector, HeadCoveringConfig,
    HeadCoveringDetector, OcclusionConfig, OcclusionDetector, ScoringModel, StandardModels,
};
pub use domain::{
    AppliedCorrection, BoundingBox, CancelToken, CorrectedImageRecord, CorrectionConfig,
    CorrectionOp, CorrectionPlan, Decision, DecisionRecord, DecisionStatus, Detector,
    DetectorInput, ErrorRecord, FrameTarget, Image, ImageDimensions, InputFormat, Outcome,
    PhotoResult, QualityConfig, QualityReport, ValidationConfig, ViolationFinding, ViolationKind,
};
pub use domain::{CorrectionError, InputError, PipelineError, QualityError, ScoringError};
pub use pipeline::{validate, Pipeline, PipelineState};
pub use ports::{ImageSource, ProgressEvent, ProgressSink, ResultOutput, SourceImage};
pub use quality::{FaceLocator, QualityAssessment, QualityChecker, SkinToneLocator};
