//! Image source port.

use crate::domain::InputFormat;

/// Encoded photo as read from a source, not yet decoded.
#[derive(Debug, Clone)]
pub struct SourceImage {
    /// Where the photo came from.
    pub path: String,
    /// Raw encoded bytes.
    pub bytes: Vec<u8>,
    /// Format hint, usually from the file extension.
    pub format: InputFormat,
}

/// Port for reading submitted photos.
pub trait ImageSource: Send + Sync {
    /// Returns an iterator over the photos in this source.
    ///
    /// # Errors
    ///
    /// Individual items are errors if a photo cannot be read.
    fn images(&self) -> Box<dyn Iterator<Item = anyhow::Result<SourceImage>> + Send + '_>;

    /// Returns the total number of photos, if known.
    fn count_hint(&self) -> Option<usize>;
}
