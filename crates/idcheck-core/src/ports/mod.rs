//! Port definitions for hexagonal architecture.
//!
//! These traits define the boundaries between the validation core and the
//! adapters that feed it photos and consume its results.

mod image_source;
mod progress;
mod result_output;

pub use image_source::{ImageSource, SourceImage};
pub use progress::{ProgressEvent, ProgressSink};
pub use result_output::ResultOutput;
