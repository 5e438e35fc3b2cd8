//! Filesystem adapter for reading submitted photos.

use anyhow::{Context, Result};
use idcheck_core::{ImageSource, InputFormat, SourceImage};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Filesystem photo source adapter.
///
/// Yields the encoded bytes of every supported file; decoding is left to
/// the pipeline so that decode failures surface as input errors.
pub struct FsImageSource {
    paths: Vec<PathBuf>,
    recursive: bool,
}

impl FsImageSource {
    /// Creates a new filesystem photo source.
    ///
    /// # Arguments
    ///
    /// * `paths` - Files or directories to scan
    /// * `recursive` - Whether to recurse into subdirectories
    #[must_use]
    pub const fn new(paths: Vec<PathBuf>, recursive: bool) -> Self {
        Self { paths, recursive }
    }

    /// Collects all supported files from the configured paths, sorted
    /// within each directory.
    fn collect_files(&self) -> Vec<PathBuf> {
        let mut files = Vec::new();

        for path in &self.paths {
            if path.is_file() {
                if format_of(path).is_some() {
                    files.push(path.clone());
                } else {
                    warn!("Unsupported file type: {}", path.display());
                }
            } else if path.is_dir() {
                self.collect_from_dir(path, &mut files);
            } else {
                warn!("Path does not exist: {}", path.display());
            }
        }

        files
    }

    fn collect_from_dir(&self, dir: &Path, files: &mut Vec<PathBuf>) {
        let mut entries: Vec<PathBuf> = match std::fs::read_dir(dir) {
            Ok(e) => e.flatten().map(|entry| entry.path()).collect(),
            Err(e) => {
                warn!("Failed to read directory {}: {e}", dir.display());
                return;
            }
        };
        entries.sort();

        for path in entries {
            if path.is_file() && format_of(&path).is_some() {
                files.push(path);
            } else if path.is_dir() && self.recursive {
                self.collect_from_dir(&path, files);
            }
        }
    }
}

impl ImageSource for FsImageSource {
    fn images(&self) -> Box<dyn Iterator<Item = Result<SourceImage>> + Send + '_> {
        let files = self.collect_files();
        debug!("Found {} photo files", files.len());

        Box::new(files.into_iter().map(|path| read_photo(&path)))
    }

    fn count_hint(&self) -> Option<usize> {
        Some(self.collect_files().len())
    }
}

/// Input format for a path, from its extension.
fn format_of(path: &Path) -> Option<InputFormat> {
    path.extension()
        .and_then(|e| e.to_str())
        .and_then(InputFormat::from_extension)
}

/// Reads a photo's bytes from the filesystem.
fn read_photo(path: &Path) -> Result<SourceImage> {
    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read photo: {}", path.display()))?;
    Ok(SourceImage {
        path: path.to_string_lossy().into_owned(),
        bytes,
        format: format_of(path).unwrap_or_default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_of() {
        assert_eq!(format_of(Path::new("a.jpg")), Some(InputFormat::Jpeg));
        assert_eq!(format_of(Path::new("a.JPEG")), Some(InputFormat::Jpeg));
        assert_eq!(format_of(Path::new("a.png")), Some(InputFormat::Png));
        assert_eq!(format_of(Path::new("a.webp")), Some(InputFormat::Webp));
        assert_eq!(format_of(Path::new("a.txt")), None);
        assert_eq!(format_of(Path::new("a")), None);
    }

    #[test]
    fn test_missing_path_yields_nothing() {
        let source = FsImageSource::new(vec![PathBuf::from("/nonexistent/photo.jpg")], false);
        assert_eq!(source.count_hint(), Some(0));
        assert_eq!(source.images().count(), 0);
    }
}
