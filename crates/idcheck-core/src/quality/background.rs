//! Background measurements.

#![allow(
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::cast_sign_loss
)]

use image::RgbImage;

use super::lighting::luma;
use crate::domain::{BoundingBox, QualityConfig};

/// Channel standard deviation at which uniformity reaches zero.
const UNIFORMITY_SPREAD: f64 = 64.0;

/// Face plus head and shoulders.
///
/// Grows the face box sideways and upward by fixed fractions and extends it
/// down to the bottom of the frame; anything outside is background.
#[must_use]
pub fn subject_region(face: BoundingBox, width: u32, height: u32) -> BoundingBox {
    face.expand(0.6, 0.6, 0.5, f32::from(u16::MAX), width, height)
}

/// Colour statistics of the background region.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackgroundStats {
    /// Mean colour.
    pub mean: [u8; 3],
    /// Mean of the per-channel standard deviations.
    pub std_dev: f32,
    /// Luma of the mean colour.
    pub luma: f32,
    /// Pixels sampled.
    pub samples: u64,
}

impl BackgroundStats {
    /// Measures every pixel outside `subject`.
    ///
    /// When the subject covers the whole frame the top row is sampled
    /// instead.
    #[must_use]
    pub fn measure(image: &RgbImage, subject: BoundingBox) -> Self {
        let outside = accumulate(
            image
                .enumerate_pixels()
                .filter(|(x, y, _)| !subject.contains(*x, *y))
                .map(|(_, _, p)| p.0),
        );
        if outside.count > 0 {
            return outside.finish();
        }
        accumulate((0..image.width()).map(|x| image.get_pixel(x, 0).0)).finish()
    }

    /// 1.0 for a flat background, falling to 0.0 as variance grows.
    #[must_use]
    pub fn uniformity(&self) -> f32 {
        (1.0 - f64::from(self.std_dev) / UNIFORMITY_SPREAD).clamp(0.0, 1.0) as f32
    }

    /// Violation confidence and whether replacement can fix it.
    ///
    /// Confidence is 0.0 for a flat white background and crosses 0.5 as soon
    /// as the background is off-white or less uniform than configured.
    /// Only light, moderately uniform backgrounds are replaceable.
    #[must_use]
    pub fn assess(&self, config: &QualityConfig) -> (f32, bool) {
        let uniformity = self.uniformity();

        let tone = if self.luma >= config.background_white_floor {
            0.0
        } else {
            let span = (config.background_white_floor - config.background_light_floor).max(1.0);
            0.5 + 0.5 * (config.background_white_floor - self.luma) / span
        };
        let clutter = if uniformity >= config.background_uniformity_min {
            0.0
        } else {
            let span = (config.background_uniformity_min - config.background_clutter_floor)
                .max(f32::EPSILON);
            0.5 + 0.5 * (config.background_uniformity_min - uniformity) / span
        };

        let confidence = tone.max(clutter).clamp(0.0, 1.0);
        let autofixable = self.luma >= config.background_light_floor
            && uniformity >= config.background_clutter_floor;
        (confidence, autofixable)
    }
}

#[derive(Default)]
struct Accumulator {
    sum: [f64; 3],
    sum_sq: [f64; 3],
    count: u64,
}

fn accumulate(pixels: impl Iterator<Item = [u8; 3]>) -> Accumulator {
    let mut acc = Accumulator::default();
    for pixel in pixels {
        for (c, &v) in pixel.iter().enumerate() {
            let v = f64::from(v);
            acc.sum[c] += v;
            acc.sum_sq[c] += v * v;
        }
        acc.count += 1;
    }
    acc
}

impl Accumulator {
    fn finish(&self) -> BackgroundStats {
        if self.count == 0 {
            return BackgroundStats {
                mean: [0; 3],
                std_dev: 0.0,
                luma: 0.0,
                samples: 0,
            };
        }
        let n = self.count as f64;
        let mut mean = [0u8; 3];
        let mut spread = 0.0;
        for c in 0..3 {
            let m = self.sum[c] / n;
            spread += (self.sum_sq[c] / n - m * m).max(0.0).sqrt();
            mean[c] = m.round().clamp(0.0, 255.0) as u8;
        }
        BackgroundStats {
            mean,
            std_dev: (spread / 3.0) as f32,
            luma: f32::from(luma(mean)),
            samples: self.count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn stats(mean: u8, std_dev: f32) -> BackgroundStats {
        BackgroundStats {
            mean: [mean; 3],
            std_dev,
            luma: f32::from(mean),
            samples: 100,
        }
    }

    #[test]
    fn test_measure_excludes_subject() {
        let mut img = RgbImage::from_pixel(100, 100, Rgb([250, 250, 250]));
        for y in 20..80 {
            for x in 20..80 {
                img.put_pixel(x, y, Rgb([0, 0, 0]));
            }
        }
        let measured = BackgroundStats::measure(&img, BoundingBox::new(20, 20, 60, 60));
        assert_eq!(measured.mean, [250, 250, 250]);
        assert!(measured.std_dev < 1e-3);
        assert_eq!(measured.samples, 100 * 100 - 60 * 60);
        assert!((measured.uniformity() - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_measure_falls_back_to_top_row() {
        let img = RgbImage::from_pixel(10, 10, Rgb([200, 200, 200]));
        let measured = BackgroundStats::measure(&img, BoundingBox::new(0, 0, 10, 10));
        assert_eq!(measured.samples, 10);
        assert_eq!(measured.mean, [200, 200, 200]);
    }

    #[test]
    fn test_checkerboard_is_cluttered() {
        let img = RgbImage::from_fn(40, 40, |x, y| {
            if (x / 4 + y / 4) % 2 == 0 {
                Rgb([20, 20, 20])
            } else {
                Rgb([200, 200, 200])
            }
        });
        let measured = BackgroundStats::measure(&img, BoundingBox::new(0, 0, 0, 0));
        assert!(measured.uniformity() < 0.1);
    }

    #[test]
    fn test_assess_white() {
        let (confidence, _) = stats(255, 0.0).assess(&QualityConfig::default());
        assert!(confidence.abs() < f32::EPSILON);
    }

    #[test]
    fn test_assess_light_grey_fixable() {
        let (confidence, autofixable) = stats(200, 2.0).assess(&QualityConfig::default());
        assert!(confidence > 0.5);
        assert!(autofixable);
    }

    #[test]
    fn test_assess_dark_not_fixable() {
        let (confidence, autofixable) = stats(40, 0.0).assess(&QualityConfig::default());
        assert!((confidence - 1.0).abs() < f32::EPSILON);
        assert!(!autofixable);
    }

    #[test]
    fn test_assess_cluttered_not_fixable() {
        let (confidence, autofixable) = stats(240, 60.0).assess(&QualityConfig::default());
        assert!(confidence > 0.5);
        assert!(!autofixable);
    }

    #[test]
    fn test_subject_region_reaches_bottom() {
        let face = BoundingBox::new(100, 100, 100, 120);
        let subject = subject_region(face, 400, 500);
        assert_eq!(subject.bottom(), 500);
        assert_eq!(subject.x, 40);
        assert_eq!(subject.y, 40);
        assert_eq!(subject.right(), 260);
    }
}
