//! Result output port.

use crate::domain::PhotoResult;

/// Port for writing per-photo results.
pub trait ResultOutput: Send + Sync {
    /// Writes one result.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    fn write(&self, result: &PhotoResult) -> anyhow::Result<()>;

    /// Flushes any buffered output.
    ///
    /// # Errors
    ///
    /// Returns an error if flushing fails.
    fn flush(&self) -> anyhow::Result<()>;
}
