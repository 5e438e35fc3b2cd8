//! Detector model catalogue adapter.
//!
//! Detector weights live as safetensors files in a models directory. A
//! file may be accompanied by a `<file>.sha256` sidecar holding the
//! expected hex digest, which `verify` checks against.

use anyhow::{Context, Result};
use idcheck_core::inference::{get_device, CandleScorer};
use idcheck_core::{ScoringModel, StandardModels};
use sha2::{Digest, Sha256};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Model metadata.
#[derive(Debug, Clone, Copy)]
pub struct ModelInfo {
    /// Detector name the model serves.
    pub name: &'static str,
    /// Filename in the models directory.
    pub filename: &'static str,
}

impl ModelInfo {
    /// Path of the weights file inside `dir`.
    #[must_use]
    pub fn path_in(&self, dir: &Path) -> PathBuf {
        dir.join(self.filename)
    }

    fn checksum_path_in(&self, dir: &Path) -> PathBuf {
        dir.join(format!("{}.sha256", self.filename))
    }
}

/// Known detector models, in registration order.
pub const MODELS: &[ModelInfo] = &[
    ModelInfo {
        name: "occlusion",
        filename: "occlusion.safetensors",
    },
    ModelInfo {
        name: "head_covering",
        filename: "head_covering.safetensors",
    },
    ModelInfo {
        name: "dress_code",
        filename: "dress_code.safetensors",
    },
];

/// Installation and integrity state of one model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelStatus {
    /// No weights file.
    Missing,
    /// Installed with no checksum sidecar to compare against.
    Unverified {
        /// Actual digest.
        sha256: String,
    },
    /// Digest matches the sidecar.
    Verified {
        /// Actual digest.
        sha256: String,
    },
    /// Digest differs from the sidecar.
    Mismatch {
        /// Digest from the sidecar.
        expected: String,
        /// Actual digest.
        actual: String,
    },
}

impl ModelStatus {
    /// Whether the weights are present and not known to be corrupt.
    #[must_use]
    pub const fn is_usable(&self) -> bool {
        matches!(self, Self::Unverified { .. } | Self::Verified { .. })
    }
}

/// Returns the default models directory path.
///
/// Uses `XDG_DATA_HOME/idcheck/models` or `~/.local/share/idcheck/models`.
#[must_use]
pub fn models_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("idcheck")
        .join("models")
}

/// Returns the path to a specific model file in `dir`.
#[must_use]
pub fn model_path(dir: &Path, name: &str) -> Option<PathBuf> {
    MODELS.iter().find(|m| m.name == name).map(|m| m.path_in(dir))
}

/// Lists models with whether each is installed in `dir`.
#[must_use]
pub fn list_models(dir: &Path) -> Vec<(&'static str, bool)> {
    MODELS
        .iter()
        .map(|m| (m.name, m.path_in(dir).is_file()))
        .collect()
}

/// Hex SHA-256 digest of a file.
///
/// # Errors
///
/// Returns an error if the file cannot be read.
pub fn sha256_file(path: &Path) -> Result<String> {
    let mut file =
        fs::File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(format!("{:x}", hasher.finalize()))
}

/// Checks one model in `dir`.
///
/// # Errors
///
/// Returns an error if an existing weights or sidecar file cannot be read.
pub fn verify_model(dir: &Path, model: &ModelInfo) -> Result<ModelStatus> {
    let path = model.path_in(dir);
    if !path.is_file() {
        return Ok(ModelStatus::Missing);
    }
    let actual = sha256_file(&path)?;

    let sidecar = model.checksum_path_in(dir);
    if !sidecar.is_file() {
        debug!(model = model.name, "No checksum sidecar");
        return Ok(ModelStatus::Unverified { sha256: actual });
    }
    let expected = fs::read_to_string(&sidecar)
        .with_context(|| format!("Failed to read {}", sidecar.display()))?
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase();

    if expected == actual {
        Ok(ModelStatus::Verified { sha256: actual })
    } else {
        Ok(ModelStatus::Mismatch { expected, actual })
    }
}

/// Checks every known model in `dir`.
///
/// # Errors
///
/// Returns an error if an existing file cannot be read.
pub fn verify_models(dir: &Path) -> Result<Vec<(&'static str, ModelStatus)>> {
    MODELS
        .iter()
        .map(|m| verify_model(dir, m).map(|status| (m.name, status)))
        .collect()
}

/// Builds scoring models for every installed detector in `dir`.
///
/// Detectors whose weights are missing are left out. Weights are loaded
/// lazily on first prediction, so a corrupt file surfaces as a scoring
/// failure for that detector only.
#[must_use]
pub fn load_standard_models(dir: &Path) -> StandardModels {
    let device = get_device();
    let load = |name: &str| -> Option<Arc<dyn ScoringModel>> {
        let path = model_path(dir, name)?;
        if path.is_file() {
            debug!(model = name, path = %path.display(), "Using detector weights");
            Some(Arc::new(CandleScorer::new(path, device.clone())))
        } else {
            info!(
                model = name,
                "Detector weights not installed at {}; detector disabled",
                path.display()
            );
            None
        }
    };

    StandardModels {
        occlusion: load("occlusion"),
        head_covering: load("head_covering"),
        dress_code: load("dress_code"),
    }
}
