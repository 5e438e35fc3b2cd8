//! Face localisation.
//!
//! The default locator is a classical skin-tone segmenter: pixels are
//! classified in YCbCr space, grouped into column runs, and the run with the
//! most skin mass is taken as the face.

#![allow(
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::cast_sign_loss
)]

use tracing::debug;

use crate::domain::{BoundingBox, Image, QualityError};

/// Finds the single dominant face in a photo.
pub trait FaceLocator: Send + Sync {
    /// Returns the bounding box of the only face in the photo.
    ///
    /// # Errors
    ///
    /// Returns [`QualityError::NoFace`] or [`QualityError::MultipleFaces`].
    fn locate(&self, image: &Image) -> Result<BoundingBox, QualityError>;
}

/// Configuration for [`SkinToneLocator`].
#[derive(Debug, Clone)]
pub struct SkinToneConfig {
    /// Minimum luma for a skin pixel.
    pub min_luma: u8,
    /// Accepted Cb range.
    pub cb_range: (u8, u8),
    /// Accepted Cr range.
    pub cr_range: (u8, u8),
    /// Minimum fraction of skin pixels in the frame.
    pub min_skin_fraction: f32,
    /// A second region with at least this share of the largest region's
    /// mass counts as another face.
    pub secondary_face_ratio: f32,
}

impl Default for SkinToneConfig {
    fn default() -> Self {
        Self {
            min_luma: 40,
            cb_range: (77, 127),
            cr_range: (140, 173),
            min_skin_fraction: 0.005,
            secondary_face_ratio: 0.5,
        }
    }
}

/// Skin-tone face locator.
#[derive(Debug, Clone, Default)]
pub struct SkinToneLocator {
    config: SkinToneConfig,
}

/// Contiguous span with its accumulated skin mass.
#[derive(Debug, Clone, Copy)]
struct Run {
    start: u32,
    end: u32,
    mass: u64,
}

impl SkinToneLocator {
    /// Creates a locator with the given configuration.
    #[must_use]
    pub const fn new(config: SkinToneConfig) -> Self {
        Self { config }
    }

    /// Whether an RGB pixel falls inside the skin chroma box.
    #[must_use]
    pub fn is_skin(&self, [r, g, b]: [u8; 3]) -> bool {
        let (r, g, b) = (f32::from(r), f32::from(g), f32::from(b));
        let y = 0.299 * r + 0.587 * g + 0.114 * b;
        let cb = 128.0 - 0.168_736 * r - 0.331_264 * g + 0.5 * b;
        let cr = 128.0 + 0.5 * r - 0.418_688 * g - 0.081_312 * b;

        let c = &self.config;
        y > f32::from(c.min_luma)
            && (f32::from(c.cb_range.0)..=f32::from(c.cb_range.1)).contains(&cb)
            && (f32::from(c.cr_range.0)..=f32::from(c.cr_range.1)).contains(&cr)
    }

    fn skin_mask(&self, image: &Image) -> Vec<bool> {
        image.pixels().pixels().map(|p| self.is_skin(p.0)).collect()
    }
}

/// Splits per-index counts into runs of indices whose count reaches `floor`.
fn runs(counts: &[u64], floor: u64) -> Vec<Run> {
    let mut out = Vec::new();
    let mut current: Option<Run> = None;
    for (i, &count) in counts.iter().enumerate() {
        let i = i as u32;
        if count >= floor {
            match current.as_mut() {
                Some(run) => {
                    run.end = i;
                    run.mass += count;
                }
                None => {
                    current = Some(Run {
                        start: i,
                        end: i,
                        mass: count,
                    });
                }
            }
        } else if let Some(run) = current.take() {
            out.push(run);
        }
    }
    out.extend(current);
    out
}

impl FaceLocator for SkinToneLocator {
    fn locate(&self, image: &Image) -> Result<BoundingBox, QualityError> {
        let (width, height) = (image.width(), image.height());
        let mask = self.skin_mask(image);
        let w = width as usize;

        let total: u64 = mask.iter().map(|&s| u64::from(s)).sum();
        let min_skin = (width as f32 * height as f32 * self.config.min_skin_fraction) as u64;
        if total == 0 || total < min_skin {
            debug!(total, min_skin, "Too few skin pixels");
            return Err(QualityError::NoFace);
        }

        let mut columns = vec![0u64; w];
        for (i, &skin) in mask.iter().enumerate() {
            columns[i % w] += u64::from(skin);
        }

        let column_floor = u64::from((height / 100).max(2));
        let column_runs = runs(&columns, column_floor);
        let Some(largest) = column_runs.iter().max_by_key(|r| r.mass).copied() else {
            return Err(QualityError::NoFace);
        };

        let faces = column_runs
            .iter()
            .filter(|r| r.mass as f32 >= largest.mass as f32 * self.config.secondary_face_ratio)
            .count();
        if faces > 1 {
            debug!(faces, "Multiple skin regions");
            return Err(QualityError::MultipleFaces { count: faces });
        }

        let mut rows = vec![0u64; height as usize];
        for (y, row) in rows.iter_mut().enumerate() {
            let offset = y * w;
            *row = mask[offset + largest.start as usize..=offset + largest.end as usize]
                .iter()
                .map(|&s| u64::from(s))
                .sum();
        }
        let Some(vertical) = runs(&rows, 1).into_iter().max_by_key(|r| r.mass) else {
            return Err(QualityError::NoFace);
        };

        let bbox = BoundingBox::new(
            largest.start,
            vertical.start,
            largest.end - largest.start + 1,
            vertical.end - vertical.start + 1,
        );
        debug!(?bbox, "Located face");
        Ok(bbox)
    }
}
