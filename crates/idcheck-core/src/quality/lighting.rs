//! Face lighting analysis.
//!
//! Scores under- and over-exposure of the face region from a luminance
//! histogram, using clipping fractions, tail percentiles and the mean.

use image::RgbImage;

use crate::domain::BoundingBox;

/// 256-bin histogram of luminance values.
#[derive(Debug, Clone)]
pub struct Histogram {
    bins: [u64; 256],
    total: u64,
}

/// Rec. 601 luma of an RGB pixel.
#[must_use]
pub fn luma([r, g, b]: [u8; 3]) -> u8 {
    let weighted = 299 * u32::from(r) + 587 * u32::from(g) + 114 * u32::from(b);
    u8::try_from(weighted / 1000).unwrap_or(u8::MAX)
}

impl Histogram {
    /// Builds a histogram over one region of an RGB image.
    #[must_use]
    pub fn from_region(image: &RgbImage, region: BoundingBox) -> Self {
        let mut bins = [0u64; 256];
        let right = region.right().min(image.width());
        let bottom = region.bottom().min(image.height());
        for y in region.y..bottom {
            for x in region.x..right {
                bins[usize::from(luma(image.get_pixel(x, y).0))] += 1;
            }
        }
        let total = bins.iter().sum();
        Self { bins, total }
    }

    /// Number of pixels counted.
    #[must_use]
    pub const fn total(&self) -> u64 {
        self.total
    }

    /// Luminance at percentile `p` (0.0-1.0).
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    #[must_use]
    pub fn percentile(&self, p: f64) -> u8 {
        if self.total == 0 {
            return 0;
        }
        let target = (self.total as f64 * p).round() as u64;
        let mut cumulative = 0u64;
        for (level, &count) in (0u8..=255).zip(self.bins.iter()) {
            cumulative += count;
            if cumulative >= target {
                return level;
            }
        }
        u8::MAX
    }

    /// Mean luminance.
    #[allow(clippy::cast_precision_loss)]
    #[must_use]
    pub fn mean(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        let sum: u64 = (0u64..).zip(self.bins.iter()).map(|(l, &c)| l * c).sum();
        sum as f64 / self.total as f64
    }

    /// Fraction of pixels at or below `level`.
    #[allow(clippy::cast_precision_loss)]
    #[must_use]
    pub fn fraction_at_or_below(&self, level: u8) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        let count: u64 = self.bins[..=usize::from(level)].iter().sum();
        count as f64 / self.total as f64
    }

    /// Fraction of pixels at or above `level`.
    #[allow(clippy::cast_precision_loss)]
    #[must_use]
    pub fn fraction_at_or_above(&self, level: u8) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        let count: u64 = self.bins[usize::from(level)..].iter().sum();
        count as f64 / self.total as f64
    }
}

/// Lighting scores for a face region.
#[derive(Debug, Clone, Copy)]
pub struct LightingAnalysis {
    /// 5th percentile luminance.
    pub p5: u8,
    /// 95th percentile luminance.
    pub p95: u8,
    /// Mean luminance.
    pub mean: f64,
    /// Underexposure score (0.0-1.0).
    pub under: f32,
    /// Overexposure score (0.0-1.0).
    pub over: f32,
}

impl LightingAnalysis {
    /// Analyses one region.
    #[must_use]
    pub fn analyze(
        image: &RgbImage,
        region: BoundingBox,
        shadow_clip: u8,
        highlight_clip: u8,
    ) -> Self {
        let histogram = Histogram::from_region(image, region);
        let p5 = histogram.percentile(0.05);
        let p95 = histogram.percentile(0.95);
        let mean = histogram.mean();

        let under = under_score(p5, histogram.fraction_at_or_below(shadow_clip), mean);
        let over = over_score(p95, histogram.fraction_at_or_above(highlight_clip), mean);

        Self {
            p5,
            p95,
            mean,
            under,
            over,
        }
    }

    /// Worse of the two scores.
    #[must_use]
    pub fn score(&self) -> f32 {
        self.under.max(self.over)
    }
}

/// Weighted mix of tail, clipping and mean terms.
#[allow(clippy::cast_possible_truncation)]
fn combine(tail: f64, clipped: f64, mean: f64) -> f32 {
    let clipped = (clipped / 0.15).min(1.0);
    ((tail * 0.4 + clipped * 0.4 + mean * 0.2) as f32).clamp(0.0, 1.0)
}

fn under_score(p5: u8, shadow_fraction: f64, mean: f64) -> f32 {
    let tail = (16.0 - f64::from(p5)).max(0.0) / 16.0;
    let dark = (50.0 - mean).max(0.0) / 50.0;
    combine(tail, shadow_fraction, dark)
}

fn over_score(p95: u8, highlight_fraction: f64, mean: f64) -> f32 {
    let tail = f64::from(p95.saturating_sub(240)) / 15.0;
    let bright = (mean - 200.0).max(0.0) / 55.0;
    combine(tail, highlight_fraction, bright)
}

#[cfg(test)]
#[allow(clippy::cast_possible_truncation)]
mod tests {
    use super::*;
    use image::Rgb;

    fn flat(value: u8) -> RgbImage {
        RgbImage::from_pixel(50, 50, Rgb([value, value, value]))
    }

    fn full(image: &RgbImage) -> BoundingBox {
        BoundingBox::new(0, 0, image.width(), image.height())
    }

    #[test]
    fn test_luma() {
        assert_eq!(luma([0, 0, 0]), 0);
        assert_eq!(luma([255, 255, 255]), 255);
        assert_eq!(luma([224, 172, 140]), 183);
    }

    #[test]
    fn test_histogram_percentiles() {
        let img = RgbImage::from_fn(256, 10, |x, _| Rgb([x as u8; 3]));
        let hist = Histogram::from_region(&img, full(&img));
        assert_eq!(hist.total(), 2560);
        assert_eq!(hist.percentile(0.0), 0);
        assert_eq!(hist.percentile(1.0), 255);
        let p50 = hist.percentile(0.5);
        assert!(p50 > 120 && p50 < 136, "p50={p50}");
    }

    #[test]
    fn test_histogram_region_only() {
        let mut img = flat(255);
        for y in 10..20 {
            for x in 10..20 {
                img.put_pixel(x, y, Rgb([100, 100, 100]));
            }
        }
        let hist = Histogram::from_region(&img, BoundingBox::new(10, 10, 10, 10));
        assert_eq!(hist.total(), 100);
        assert!((hist.mean() - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_histogram() {
        let img = flat(128);
        let hist = Histogram::from_region(&img, BoundingBox::new(0, 0, 0, 0));
        assert_eq!(hist.percentile(0.5), 0);
        assert!(hist.mean().abs() < f64::EPSILON);
        assert!(hist.fraction_at_or_below(128).abs() < f64::EPSILON);
    }

    #[test]
    fn test_dark_face() {
        let img = flat(0);
        let analysis = LightingAnalysis::analyze(&img, full(&img), 8, 247);
        assert!(analysis.under > 0.9, "under={}", analysis.under);
        assert!(analysis.over < f32::EPSILON);
    }

    #[test]
    fn test_blown_face() {
        let img = flat(255);
        let analysis = LightingAnalysis::analyze(&img, full(&img), 8, 247);
        assert!(analysis.over > 0.9, "over={}", analysis.over);
        assert!((analysis.score() - analysis.over).abs() < f32::EPSILON);
    }

    #[test]
    fn test_skin_tone_well_lit() {
        let img = RgbImage::from_pixel(40, 40, Rgb([224, 172, 140]));
        let analysis = LightingAnalysis::analyze(&img, full(&img), 8, 247);
        assert!(analysis.score() < 0.05, "score={}", analysis.score());
    }
}
