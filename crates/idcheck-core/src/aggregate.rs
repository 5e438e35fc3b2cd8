//! Aggregation of findings into a decision status.

use std::collections::BTreeMap;

use tracing::warn;

use crate::detectors::DetectorRegistry;
use crate::domain::{DecisionStatus, ValidationConfig, ViolationFinding};
use crate::quality::DEFAULT_THRESHOLDS;

/// Threshold used for names with no registered default.
const FALLBACK_THRESHOLD: f32 = 0.5;

/// Rejection thresholds by finding name.
#[derive(Debug, Clone, Default)]
pub struct ThresholdTable {
    thresholds: BTreeMap<String, f32>,
}

impl ThresholdTable {
    /// Builds the table from quality defaults, each detector's declared
    /// threshold and the configured overrides, in that order of precedence.
    ///
    /// Overrides naming an unknown detector are ignored with a warning.
    #[must_use]
    pub fn new(registry: &DetectorRegistry, config: &ValidationConfig) -> Self {
        let mut thresholds: BTreeMap<String, f32> = DEFAULT_THRESHOLDS
            .iter()
            .map(|&(name, t)| (name.to_string(), t))
            .collect();
        for detector in registry.detectors() {
            thresholds.insert(detector.name().to_string(), detector.threshold());
        }
        for (name, &t) in &config.detector_thresholds {
            match thresholds.get_mut(name) {
                Some(slot) => *slot = t,
                None => warn!(detector = %name, "Threshold override for unknown detector"),
            }
        }
        Self { thresholds }
    }

    /// Threshold for a finding name.
    #[must_use]
    pub fn get(&self, name: &str) -> f32 {
        self.thresholds
            .get(name)
            .copied()
            .unwrap_or(FALLBACK_THRESHOLD)
    }
}

/// Result of aggregating one pass.
#[derive(Debug, Clone)]
pub struct Aggregation {
    /// Derived status.
    pub status: DecisionStatus,
    /// Findings over threshold, by descending confidence then input order.
    pub violations: Vec<ViolationFinding>,
    /// Human-readable explanation.
    pub message: String,
    /// 0-100 score over every finding, including those under threshold.
    pub overall_score: u8,
}

/// Turns an ordered list of findings into a status.
#[derive(Debug, Clone, Copy, Default)]
pub struct Aggregator;

impl Aggregator {
    /// Creates an aggregator.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Aggregates findings given in registration order.
    ///
    /// - no finding over threshold: `Approved`
    /// - any over-threshold finding not autofixable: `Rejected`
    /// - otherwise: `NeedsCorrection`
    #[must_use]
    pub fn aggregate(
        &self,
        findings: &[ViolationFinding],
        thresholds: &ThresholdTable,
    ) -> Aggregation {
        let mut violations: Vec<ViolationFinding> = findings
            .iter()
            .filter(|f| f.exceeds(thresholds.get(&f.detector)))
            .cloned()
            .collect();
        // Stable sort keeps registration order among equal confidences.
        violations.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

        let status = if violations.is_empty() {
            DecisionStatus::Approved
        } else if violations.iter().any(|f| !f.autofixable) {
            DecisionStatus::Rejected
        } else {
            DecisionStatus::NeedsCorrection
        };

        let message = match status {
            DecisionStatus::Approved => "Photo approved: meets all requirements".to_string(),
            DecisionStatus::Rejected => format!("Photo rejected: {}", summarize(&violations)),
            DecisionStatus::NeedsCorrection => {
                format!("Photo needs correction: {}", summarize(&violations))
            }
        };

        Aggregation {
            status,
            violations,
            message,
            overall_score: overall_score(findings),
        }
    }
}

/// Joins finding summaries in order.
#[must_use]
pub fn summarize(findings: &[ViolationFinding]) -> String {
    findings
        .iter()
        .map(ViolationFinding::summary)
        .collect::<Vec<_>>()
        .join("; ")
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn overall_score(findings: &[ViolationFinding]) -> u8 {
    let worst = findings
        .iter()
        .map(|f| f.confidence)
        .fold(0.0_f32, f32::max)
        .clamp(0.0, 1.0);
    (100.0 * (1.0 - worst)).round() as u8
}
