//! Violation detectors and their registry.
//!
//! Each detector wraps one [`ScoringModel`] and scores one region of
//! interest derived from the quality report's face box.

mod dress_code;
mod head_covering;
mod model;
mod occlusion;
mod roi;

use std::fmt;
use std::sync::Arc;

pub use crate::domain::AutofixPolicy;
pub use dress_code::{DressCodeConfig, DressCodeDetector};
pub use head_covering::{HeadCoveringConfig, HeadCoveringDetector};
pub use model::ScoringModel;
pub use occlusion::{OcclusionConfig, OcclusionDetector};
pub use roi::{
    face_region, head_region, missing_headroom, region_features, torso_region, FEATURE_LEN, GRID,
    HEAD_TOP_MARGIN,
};

use crate::domain::Detector;

/// Models for the standard detector set; `None` leaves a detector out.
#[derive(Default, Clone)]
pub struct StandardModels {
    /// Occlusion model.
    pub occlusion: Option<Arc<dyn ScoringModel>>,
    /// Head covering model.
    pub head_covering: Option<Arc<dyn ScoringModel>>,
    /// Dress code model.
    pub dress_code: Option<Arc<dyn ScoringModel>>,
}

/// Ordered detector registry.
///
/// Registration order is the order findings are reported in, which keeps
/// tie-breaking reproducible.
#[derive(Clone, Default)]
pub struct DetectorRegistry {
    detectors: Vec<Arc<dyn Detector>>,
}

impl DetectorRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the standard detectors in their fixed order: occlusion,
    /// head covering, dress code.
    #[must_use]
    pub fn standard(models: StandardModels) -> Self {
        let mut registry = Self::new();
        if let Some(model) = models.occlusion {
            registry.register(Arc::new(OcclusionDetector::new(
                model,
                OcclusionConfig::default(),
            )));
        }
        if let Some(model) = models.head_covering {
            registry.register(Arc::new(HeadCoveringDetector::new(
                model,
                HeadCoveringConfig::default(),
            )));
        }
        if let Some(model) = models.dress_code {
            registry.register(Arc::new(DressCodeDetector::new(
                model,
                DressCodeConfig::default(),
            )));
        }
        registry
    }

    /// Appends a detector.
    ///
    /// Returns `false` and keeps the existing entry if a detector with the
    /// same name is already registered.
    pub fn register(&mut self, detector: Arc<dyn Detector>) -> bool {
        if self.detectors.iter().any(|d| d.name() == detector.name()) {
            return false;
        }
        self.detectors.push(detector);
        true
    }

    /// Builder form of [`DetectorRegistry::register`].
    #[must_use]
    pub fn with(mut self, detector: Arc<dyn Detector>) -> Self {
        self.register(detector);
        self
    }

    /// Detectors in registration order.
    #[must_use]
    pub fn detectors(&self) -> &[Arc<dyn Detector>] {
        &self.detectors
    }

    /// Detector names in registration order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.detectors.iter().map(|d| d.name()).collect()
    }

    /// Number of registered detectors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.detectors.len()
    }

    /// Whether no detectors are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.detectors.is_empty()
    }
}

impl fmt::Debug for DetectorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}
