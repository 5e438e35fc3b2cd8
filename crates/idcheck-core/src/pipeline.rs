//! Pipeline orchestrator.
//!
//! One call runs `decode → quality check → detectors → aggregate` and, when
//! every violation is autofixable, `correct → re-validate` up to the
//! configured number of retries. Nothing is kept between calls.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::aggregate::{summarize, Aggregation, Aggregator, ThresholdTable};
use crate::correct::CorrectiveAdjuster;
use crate::detectors::DetectorRegistry;
use crate::domain::{
    AppliedCorrection, CancelToken, CorrectionError, Decision, DecisionStatus, Detector,
    DetectorInput, Image, InputFormat, PipelineError, QualityReport, ScoringError,
    ValidationConfig, ViolationFinding,
};
use crate::quality::QualityChecker;

/// Orchestrator states, logged at debug level as a call progresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    /// Bytes accepted.
    Received,
    /// Quality report produced.
    QualityChecked,
    /// Detectors running.
    Detecting,
    /// Findings aggregated into a status.
    Aggregated,
    /// Applying a correction plan.
    Correcting,
    /// Terminal: approved.
    Approved,
    /// Terminal: rejected.
    Rejected,
    /// Terminal: correction needed but autofix is disabled.
    Returned,
}

fn enter(state: PipelineState, attempt: u32) {
    debug!(?state, attempt, "Pipeline state");
}

/// Wall-clock budget measured from the start of a call.
struct Deadline {
    started: Instant,
    limit: Option<Duration>,
}

impl Deadline {
    fn start(limit: Option<Duration>) -> Self {
        Self {
            started: Instant::now(),
            limit,
        }
    }

    fn exceeded(&self) -> PipelineError {
        PipelineError::Timeout {
            deadline: self.limit.unwrap_or_default(),
        }
    }

    /// Time left, `None` when unbounded.
    fn remaining(&self) -> Result<Option<Duration>, PipelineError> {
        match self.limit {
            None => Ok(None),
            Some(limit) => limit
                .checked_sub(self.started.elapsed())
                .filter(|left| !left.is_zero())
                .map(Some)
                .ok_or_else(|| self.exceeded()),
        }
    }
}

/// Validation pipeline.
///
/// Holds only immutable collaborators, so one instance can serve many
/// calls with different configurations.
pub struct Pipeline {
    checker: QualityChecker,
    registry: DetectorRegistry,
    aggregator: Aggregator,
    adjuster: CorrectiveAdjuster,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new(DetectorRegistry::new())
    }
}

impl Pipeline {
    /// Creates a pipeline with the default quality checker.
    #[must_use]
    pub fn new(registry: DetectorRegistry) -> Self {
        Self {
            checker: QualityChecker::default(),
            registry,
            aggregator: Aggregator::new(),
            adjuster: CorrectiveAdjuster::new(),
        }
    }

    /// Replaces the quality checker.
    #[must_use]
    pub fn with_checker(mut self, checker: QualityChecker) -> Self {
        self.checker = checker;
        self
    }

    /// Registered detectors.
    #[must_use]
    pub const fn registry(&self) -> &DetectorRegistry {
        &self.registry
    }

    /// Validates one photo.
    ///
    /// # Errors
    ///
    /// - [`PipelineError::Input`] if the bytes cannot be decoded
    /// - [`PipelineError::Quality`] if the photo has a structural problem
    /// - [`PipelineError::Timeout`] if the configured deadline passes
    ///
    /// Detector failures and correction failures are reported in the
    /// returned [`Decision`] instead.
    pub fn validate(
        &self,
        bytes: &[u8],
        format: InputFormat,
        config: &ValidationConfig,
    ) -> Result<Decision, PipelineError> {
        let deadline = Deadline::start(config.deadline);
        enter(PipelineState::Received, 1);
        let mut image = Image::decode(bytes, format)?;
        let thresholds = ThresholdTable::new(&self.registry, config);
        let mut corrections: Vec<AppliedCorrection> = Vec::new();
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            deadline.remaining()?;

            let assessment = match self.checker.check(&image, config) {
                Ok(assessment) => assessment,
                Err(err) if attempt == 1 => return Err(err.into()),
                Err(err) => {
                    // Only reachable after a correction was applied.
                    return Ok(reject_correction(
                        CorrectionError::Revalidation(err),
                        None,
                        attempt,
                        corrections,
                    ));
                }
            };
            enter(PipelineState::QualityChecked, attempt);

            enter(PipelineState::Detecting, attempt);
            let detected = self.run_detectors(&image, &assessment.report, &deadline)?;
            let mut findings = assessment.findings;
            findings.extend(detected);

            let aggregation = self.aggregator.aggregate(&findings, &thresholds);
            enter(PipelineState::Aggregated, attempt);

            match aggregation.status {
                DecisionStatus::Approved => {
                    enter(PipelineState::Approved, attempt);
                    let corrected = (!corrections.is_empty()).then(|| image.clone());
                    return Ok(finish(aggregation, attempt, corrections, corrected));
                }
                DecisionStatus::Rejected => {
                    enter(PipelineState::Rejected, attempt);
                    return Ok(finish(aggregation, attempt, corrections, None));
                }
                DecisionStatus::NeedsCorrection => {}
            }

            if !config.enable_autofix {
                enter(PipelineState::Returned, attempt);
                return Ok(finish(aggregation, attempt, corrections, None));
            }

            if attempt > config.max_correction_retries {
                enter(PipelineState::Rejected, attempt);
                let message = format!(
                    "Photo rejected: manual correction required after {} automatic attempt(s): {}",
                    attempt - 1,
                    summarize(&aggregation.violations)
                );
                return Ok(finish(
                    Aggregation {
                        status: DecisionStatus::Rejected,
                        message,
                        ..aggregation
                    },
                    attempt,
                    corrections,
                    None,
                ));
            }

            enter(PipelineState::Correcting, attempt);
            let corrected = self
                .adjuster
                .plan(&aggregation.violations, &assessment.report, config)
                .and_then(|plan| {
                    self.adjuster
                        .apply(&image, &plan, &assessment.report, config)
                });
            match corrected {
                Ok(corrected) => {
                    info!(
                        attempt,
                        steps = corrected.applied.len(),
                        "Applied automatic correction"
                    );
                    corrections.extend(corrected.applied);
                    image = corrected.image;
                }
                Err(err) => {
                    return Ok(reject_correction(
                        err,
                        Some(aggregation),
                        attempt,
                        corrections,
                    ));
                }
            }
        }
    }

    /// Runs every detector in parallel on a pool owned by this call and
    /// waits for all of them or the deadline, whichever comes first.
    fn run_detectors(
        &self,
        image: &Image,
        report: &QualityReport,
        deadline: &Deadline,
    ) -> Result<Vec<ViolationFinding>, PipelineError> {
        if self.registry.is_empty() {
            return Ok(Vec::new());
        }

        let detectors: Vec<Arc<dyn Detector>> = self.registry.detectors().to_vec();
        let image = image.clone();
        let report = report.clone();
        let cancel = CancelToken::new();
        let worker_cancel = cancel.clone();
        let (tx, rx) = mpsc::channel();

        // Detectors abandoned at a deadline must not hold workers of later calls.
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(detectors.len())
            .thread_name(|i| format!("idcheck-detector-{i}"))
            .build()
            .map_err(|e| PipelineError::Internal(format!("failed to start detectors: {e}")))?;

        thread::Builder::new()
            .name("idcheck-detectors".to_string())
            .spawn(move || {
                let input = DetectorInput {
                    image: &image,
                    report: &report,
                    cancel: &worker_cancel,
                };
                let findings: Vec<ViolationFinding> = pool.install(|| {
                    detectors
                        .par_iter()
                        .map(|detector| run_detector(detector.as_ref(), &input))
                        .collect()
                });
                // The receiver is gone if the deadline already passed.
                let _ = tx.send(findings);
            })
            .map_err(|e| PipelineError::Internal(format!("failed to start detectors: {e}")))?;

        let received = match deadline.remaining()? {
            None => rx.recv().map_err(|_| disconnected()),
            Some(left) => rx.recv_timeout(left).map_err(|e| match e {
                RecvTimeoutError::Timeout => {
                    cancel.cancel();
                    warn!("Detector stage exceeded the deadline; discarding partial results");
                    deadline.exceeded()
                }
                RecvTimeoutError::Disconnected => disconnected(),
            }),
        }?;
        Ok(received)
    }
}

fn reject_correction(
    err: CorrectionError,
    aggregation: Option<Aggregation>,
    attempt: u32,
    corrections: Vec<AppliedCorrection>,
) -> Decision {
    enter(PipelineState::Rejected, attempt);
    warn!(error = %err, "Automatic correction failed");
    let (violations, overall_score) = aggregation
        .map(|a| (a.violations, a.overall_score))
        .unwrap_or_default();
    let decision = Decision {
        status: DecisionStatus::Rejected,
        findings: violations,
        message: format!("Photo rejected: automatic correction failed: {err}"),
        overall_score,
        attempts: attempt,
        corrections,
        corrected_image: None,
    };
    log_decision(&decision);
    decision
}

fn disconnected() -> PipelineError {
    PipelineError::Internal("detector stage ended without results".to_string())
}

/// Scores one detector, turning errors and panics into a scoring-failure
/// finding so one broken model never blocks the others.
fn run_detector(detector: &dyn Detector, input: &DetectorInput<'_>) -> ViolationFinding {
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| detector.evaluate(input)))
        .unwrap_or_else(|payload| Err(ScoringError::Panicked(panic_message(payload.as_ref()))));

    match outcome {
        Ok(finding) => {
            debug!(
                detector = %finding.detector,
                confidence = finding.confidence,
                autofixable = finding.autofixable,
                "Detector scored"
            );
            finding
        }
        Err(err) => {
            warn!(detector = detector.name(), error = %err, "Detector failed");
            ViolationFinding::scoring_failure(detector.name())
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

fn finish(
    aggregation: Aggregation,
    attempts: u32,
    corrections: Vec<AppliedCorrection>,
    corrected_image: Option<Image>,
) -> Decision {
    let message = if corrected_image.is_some() {
        let steps: Vec<&str> = corrections.iter().map(|c| c.description.as_str()).collect();
        format!(
            "Photo approved after automatic correction: {}",
            steps.join("; ")
        )
    } else {
        aggregation.message
    };
    let decision = Decision {
        status: aggregation.status,
        findings: aggregation.violations,
        message,
        overall_score: aggregation.overall_score,
        attempts,
        corrections,
        corrected_image,
    };
    log_decision(&decision);
    decision
}

fn log_decision(decision: &Decision) {
    info!(
        status = ?decision.status,
        attempts = decision.attempts,
        score = decision.overall_score,
        violations = decision.findings.len(),
        "Validation finished"
    );
}

/// Validates one photo with the classical checks and no detectors.
///
/// Use [`Pipeline`] with a populated [`DetectorRegistry`] to include the
/// model-based detectors.
///
/// # Errors
///
/// See [`Pipeline::validate`].
pub fn validate(
    bytes: &[u8],
    format: InputFormat,
    config: &ValidationConfig,
) -> Result<Decision, PipelineError> {
    Pipeline::default().validate(bytes, format, config)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_deadline_unbounded() {
        let deadline = Deadline::start(None);
        assert!(deadline.remaining().unwrap().is_none());
    }

    #[test]
    fn test_deadline_expired() {
        let deadline = Deadline::start(Some(Duration::ZERO));
        assert!(matches!(
            deadline.remaining(),
            Err(PipelineError::Timeout { .. })
        ));
    }

    #[test]
    fn test_panic_message() {
        let payload: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(payload.as_ref()), "boom");
        let payload: Box<dyn Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(payload.as_ref()), "bang");
        let payload: Box<dyn Any + Send> = Box::new(7_u8);
        assert_eq!(panic_message(payload.as_ref()), "unknown panic");
    }

    #[test]
    fn test_empty_bytes_is_input_error() {
        let err = validate(&[], InputFormat::Auto, &ValidationConfig::default()).unwrap_err();
        assert_eq!(err.kind(), "input");
    }

    #[test]
    fn test_garbage_is_input_error() {
        let err = validate(b"not an image", InputFormat::Auto, &ValidationConfig::default())
            .unwrap_err();
        assert!(matches!(err, PipelineError::Input(_)));
    }
}
