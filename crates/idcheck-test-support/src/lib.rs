//! Test support utilities for idcheck.
//!
//! Provides synthetic portraits, scoring-model stubs and port mocks for
//! testing the validation pipeline.
//!
//! # Example
//!
//! ```
//! use idcheck_test_support::{fixed_models, PortraitBuilder};
//! use idcheck_core::{DetectorRegistry, InputFormat, Pipeline, ValidationConfig};
//!
//! let bytes = PortraitBuilder::new().png_bytes().unwrap();
//! let pipeline = Pipeline::new(DetectorRegistry::standard(fixed_models(0.1, 0.1, 0.1)));
//! let decision = pipeline
//!     .validate(&bytes, InputFormat::Png, &ValidationConfig::default())
//!     .unwrap();
//! assert!(decision.is_approved());
//! ```

mod builders;
mod mocks;

pub use builders::{PortraitBuilder, SKIN, TORSO};
pub use mocks::{
    fixed_models, FailingModel, FixedScoreModel, MockImageSource, MockProgressSink,
    MockResultOutput, PanickingModel, SlowModel,
};
