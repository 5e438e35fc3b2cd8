//! Immutable image buffer and pixel-space geometry.

use std::io::Cursor;
use std::sync::Arc;

use image::{DynamicImage, GenericImageView, RgbImage};
use serde::{Deserialize, Serialize};

use super::InputError;

/// Encoded input formats accepted at the boundary.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputFormat {
    /// Sniff the format from the leading bytes.
    #[default]
    Auto,
    /// JPEG.
    Jpeg,
    /// PNG.
    Png,
    /// WebP.
    Webp,
    /// BMP.
    Bmp,
    /// TIFF.
    Tiff,
}

impl InputFormat {
    /// Maps a file extension to a format, if supported.
    #[must_use]
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "png" => Some(Self::Png),
            "webp" => Some(Self::Webp),
            "bmp" => Some(Self::Bmp),
            "tif" | "tiff" => Some(Self::Tiff),
            _ => None,
        }
    }

    fn resolve(self, bytes: &[u8]) -> Result<image::ImageFormat, InputError> {
        let format = match self {
            Self::Auto => image::guess_format(bytes).map_err(|_| InputError::UnsupportedFormat)?,
            Self::Jpeg => image::ImageFormat::Jpeg,
            Self::Png => image::ImageFormat::Png,
            Self::Webp => image::ImageFormat::WebP,
            Self::Bmp => image::ImageFormat::Bmp,
            Self::Tiff => image::ImageFormat::Tiff,
        };
        match format {
            image::ImageFormat::Jpeg
            | image::ImageFormat::Png
            | image::ImageFormat::WebP
            | image::ImageFormat::Bmp
            | image::ImageFormat::Tiff => Ok(format),
            _ => Err(InputError::UnsupportedFormat),
        }
    }
}

/// Immutable RGB pixel buffer.
///
/// Cloning is cheap: the pixels are shared behind an `Arc`, so the same
/// buffer can be handed to every detector at once. Transforms always build a
/// new `Image`.
#[derive(Debug, Clone)]
pub struct Image {
    pixels: Arc<RgbImage>,
    color_depth: u16,
}

impl Image {
    /// Decodes encoded bytes.
    ///
    /// # Errors
    ///
    /// Returns an [`InputError`] if the bytes are empty, the format is not
    /// supported, decoding fails, or the image has a zero dimension.
    pub fn decode(bytes: &[u8], format: InputFormat) -> Result<Self, InputError> {
        if bytes.is_empty() {
            return Err(InputError::Empty);
        }
        let format = format.resolve(bytes)?;
        let decoded = image::load_from_memory_with_format(bytes, format)
            .map_err(|e| InputError::Decode(e.to_string()))?;
        Self::from_dynamic(decoded)
    }

    /// Reads the dimensions from the encoded header without decoding the
    /// pixels.
    ///
    /// # Errors
    ///
    /// Returns an [`InputError`] if the header cannot be read.
    pub fn probe_dimensions(bytes: &[u8], format: InputFormat) -> Result<(u32, u32), InputError> {
        if bytes.is_empty() {
            return Err(InputError::Empty);
        }
        let format = format.resolve(bytes)?;
        image::ImageReader::with_format(Cursor::new(bytes), format)
            .into_dimensions()
            .map_err(|e| InputError::Decode(e.to_string()))
    }

    /// Wraps an already decoded image.
    ///
    /// # Errors
    ///
    /// Returns [`InputError::ZeroDimensions`] for an empty image.
    pub fn from_dynamic(image: DynamicImage) -> Result<Self, InputError> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(InputError::ZeroDimensions);
        }
        let color_depth = image.color().bits_per_pixel();
        Ok(Self {
            pixels: Arc::new(image.to_rgb8()),
            color_depth,
        })
    }

    /// Builds an image from an RGB buffer produced by a transform.
    #[must_use]
    pub fn from_rgb(pixels: RgbImage) -> Self {
        Self {
            pixels: Arc::new(pixels),
            color_depth: 24,
        }
    }

    /// Width in pixels.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    /// Height in pixels.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// Bits per pixel of the source encoding.
    #[must_use]
    pub const fn color_depth(&self) -> u16 {
        self.color_depth
    }

    /// Read-only access to the RGB pixels.
    #[must_use]
    pub fn pixels(&self) -> &RgbImage {
        &self.pixels
    }

    /// Full-frame bounding box.
    #[must_use]
    pub fn frame(&self) -> BoundingBox {
        BoundingBox::new(0, 0, self.width(), self.height())
    }

    /// Encodes the image as PNG.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding fails.
    pub fn encode_png(&self) -> image::ImageResult<Vec<u8>> {
        let mut buf = Cursor::new(Vec::new());
        self.pixels.write_to(&mut buf, image::ImageFormat::Png)?;
        Ok(buf.into_inner())
    }
}

/// Axis-aligned rectangle in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Left edge.
    pub x: u32,
    /// Top edge.
    pub y: u32,
    /// Width.
    pub width: u32,
    /// Height.
    pub height: u32,
}

impl BoundingBox {
    /// Creates a new bounding box.
    #[must_use]
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Exclusive right edge.
    #[must_use]
    pub const fn right(&self) -> u32 {
        self.x + self.width
    }

    /// Exclusive bottom edge.
    #[must_use]
    pub const fn bottom(&self) -> u32 {
        self.y + self.height
    }

    /// Area in pixels.
    #[must_use]
    pub const fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Centre point as floating-point pixel coordinates.
    #[allow(clippy::cast_precision_loss)]
    #[must_use]
    pub fn center(&self) -> (f32, f32) {
        (
            self.x as f32 + self.width as f32 / 2.0,
            self.y as f32 + self.height as f32 / 2.0,
        )
    }

    /// Whether the point lies inside the box.
    #[must_use]
    pub const fn contains(&self, px: u32, py: u32) -> bool {
        px >= self.x && px < self.right() && py >= self.y && py < self.bottom()
    }

    /// Whether the box touches any edge of a `width` x `height` frame.
    #[must_use]
    pub const fn touches_edge(&self, width: u32, height: u32) -> bool {
        self.x == 0 || self.y == 0 || self.right() >= width || self.bottom() >= height
    }

    /// Grows the box by fractions of its own size and clamps it to the frame.
    ///
    /// `left`, `right`, `up` and `down` are multiples of the box width or
    /// height added on each side.
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_precision_loss,
        clippy::cast_sign_loss
    )]
    #[must_use]
    pub fn expand(
        &self,
        left: f32,
        right: f32,
        up: f32,
        down: f32,
        frame_width: u32,
        frame_height: u32,
    ) -> Self {
        let w = self.width as f32;
        let h = self.height as f32;
        let x0 = (self.x as f32 - w * left).round().max(0.0);
        let y0 = (self.y as f32 - h * up).round().max(0.0);
        let x1 = (self.right() as f32 + w * right)
            .round()
            .min(frame_width as f32);
        let y1 = (self.bottom() as f32 + h * down)
            .round()
            .min(frame_height as f32);
        Self::new(
            x0 as u32,
            y0 as u32,
            (x1 - x0).max(0.0) as u32,
            (y1 - y0).max(0.0) as u32,
        )
    }

    /// Shifts the box by a signed offset, returning `None` if any part of it
    /// would leave the frame.
    #[must_use]
    pub fn shifted(&self, dx: i64, dy: i64, frame_width: u32, frame_height: u32) -> Option<Self> {
        let x = i64::from(self.x) + dx;
        let y = i64::from(self.y) + dy;
        if x < 0
            || y < 0
            || x + i64::from(self.width) > i64::from(frame_width)
            || y + i64::from(self.height) > i64::from(frame_height)
        {
            return None;
        }
        Some(Self::new(
            u32::try_from(x).ok()?,
            u32::try_from(y).ok()?,
            self.width,
            self.height,
        ))
    }
}
