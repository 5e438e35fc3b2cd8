//! Progress reporting port.

use crate::domain::DecisionStatus;

/// Events emitted while a batch is validated.
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    /// Validation started for a photo.
    Started {
        /// Path to the photo.
        path: String,
        /// Index in the batch (0-based).
        index: usize,
        /// Total photos in the batch, if known.
        total: Option<usize>,
    },
    /// A photo reached a decision.
    Completed {
        /// Path to the photo.
        path: String,
        /// Decision status.
        status: DecisionStatus,
    },
    /// A photo failed with an error.
    Skipped {
        /// Path to the photo.
        path: String,
        /// Reason for skipping.
        reason: String,
    },
    /// The batch is done.
    Finished {
        /// Photos that reached a decision.
        processed: usize,
        /// Photos that failed.
        skipped: usize,
    },
}

/// Port for receiving progress events.
pub trait ProgressSink: Send + Sync {
    /// Called when a progress event occurs.
    fn on_event(&self, event: ProgressEvent);
}
