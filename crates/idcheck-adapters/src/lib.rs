//! idcheck adapters - external adapters for idcheck.
//!
//! This crate provides adapters for:
//! - Filesystem photo source
//! - Detector model catalogue (location, presence, checksums, loading)

pub mod fs;
pub mod models;

pub use fs::FsImageSource;
pub use models::{load_standard_models, model_path, models_dir, ModelInfo, ModelStatus, MODELS};
