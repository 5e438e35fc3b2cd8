//! Calibrated linear scoring head.
//!
//! Each detector model is a single linear layer over the region-of-interest
//! colour grid, followed by temperature scaling and a sigmoid. Weights are
//! stored as `head.weight` (`[1, FEATURE_LEN]`), `head.bias` (`[1]`) and an
//! optional scalar `temperature`.

use std::path::Path;

use anyhow::{Context, Result};
use candle_core::{Device, Module, Tensor};
use candle_nn::{linear, Linear, VarBuilder};

use super::{sigmoid, LazyModel};
use crate::detectors::{ScoringModel, FEATURE_LEN};
use crate::domain::ScoringError;

/// Linear head with temperature calibration.
pub struct LinearHead {
    head: Linear,
    temperature: f32,
    device: Device,
}

impl LinearHead {
    /// Builds the head from weights.
    ///
    /// # Errors
    ///
    /// Returns an error if `head.weight` or `head.bias` is missing or has
    /// the wrong shape, or the temperature is not positive.
    #[allow(clippy::needless_pass_by_value)]
    pub fn new(vb: VarBuilder) -> Result<Self> {
        let device = vb.device().clone();
        let head = linear(FEATURE_LEN, 1, vb.pp("head"))?;

        let temperature = if vb.contains_tensor("temperature") {
            vb.get(1, "temperature")?
                .to_vec1::<f32>()?
                .first()
                .copied()
                .unwrap_or(1.0)
        } else {
            1.0
        };
        anyhow::ensure!(
            temperature.is_finite() && temperature > 0.0,
            "temperature must be positive, got {temperature}"
        );

        Ok(Self {
            head,
            temperature,
            device,
        })
    }

    /// Calibration temperature.
    #[must_use]
    pub const fn temperature(&self) -> f32 {
        self.temperature
    }

    /// Returns the calibrated probability for one feature vector.
    ///
    /// # Errors
    ///
    /// Returns an error if the feature length is wrong or inference fails.
    pub fn probability(&self, features: &[f32]) -> Result<f32> {
        anyhow::ensure!(
            features.len() == FEATURE_LEN,
            "expected {FEATURE_LEN} features, got {}",
            features.len()
        );
        let input = Tensor::from_slice(features, (1, FEATURE_LEN), &self.device)
            .context("Failed to create feature tensor")?;
        let logit = self
            .forward(&input)?
            .squeeze(0)?
            .squeeze(0)?
            .to_scalar::<f32>()?;
        Ok(sigmoid(logit / self.temperature))
    }
}

impl Module for LinearHead {
    fn forward(&self, x: &Tensor) -> candle_core::Result<Tensor> {
        self.head.forward(x)
    }
}

/// [`ScoringModel`] backed by a lazily loaded [`LinearHead`].
pub struct CandleScorer {
    model: LazyModel<LinearHead>,
}

impl CandleScorer {
    /// Creates a scorer; the weights are read on the first prediction.
    #[must_use]
    pub fn new(path: impl AsRef<Path>, device: Device) -> Self {
        Self {
            model: LazyModel::new(path, device, LinearHead::new),
        }
    }
}

impl ScoringModel for CandleScorer {
    fn predict(&self, features: &[f32]) -> Result<f32, ScoringError> {
        let head = self
            .model
            .get()
            .map_err(|e| ScoringError::Model(format!("{e:#}")))?;
        head.probability(features)
            .map_err(|e| ScoringError::Model(format!("{e:#}")))
    }
}
