//! Synthetic portrait builder for testing.

#![allow(
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::cast_sign_loss
)]

use idcheck_core::{BoundingBox, Image};
use image::{Rgb, RgbImage};

/// Skin tone used for synthetic faces.
pub const SKIN: [u8; 3] = [224, 172, 140];
/// Clothing colour used for the synthetic torso.
pub const TORSO: [u8; 3] = [30, 40, 80];

const WHITE: [u8; 3] = [255, 255, 255];
const STRIPE: [u8; 3] = [60, 60, 60];

/// Builder for synthetic head-and-shoulders portraits.
///
/// The face is a flat skin-tone block, the torso a dark block below it, and
/// the background a flat colour or vertical stripes. The defaults produce a
/// compliant photo: 600x600, white background, face centred and filling
/// 45% of the frame height.
#[derive(Debug, Clone)]
pub struct PortraitBuilder {
    width: u32,
    height: u32,
    face_fraction: f32,
    face_aspect: f32,
    center: (f32, f32),
    background: [u8; 3],
    striped: bool,
    torso: bool,
    face: bool,
    second_face: Option<f32>,
}

impl Default for PortraitBuilder {
    fn default() -> Self {
        Self {
            width: 600,
            height: 600,
            face_fraction: 0.45,
            face_aspect: 0.75,
            center: (0.5, 0.5),
            background: WHITE,
            striped: false,
            torso: true,
            face: true,
            second_face: None,
        }
    }
}

impl PortraitBuilder {
    /// Starts from the compliant defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Frame size in pixels.
    #[must_use]
    pub fn size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Face height as a fraction of the frame height.
    #[must_use]
    pub fn face_fraction(mut self, fraction: f32) -> Self {
        self.face_fraction = fraction;
        self
    }

    /// Face centre as fractions of the frame.
    #[must_use]
    pub fn center(mut self, x: f32, y: f32) -> Self {
        self.center = (x, y);
        self
    }

    /// Flat background colour.
    #[must_use]
    pub fn background(mut self, color: [u8; 3]) -> Self {
        self.background = color;
        self.striped = false;
        self
    }

    /// Busy background of alternating white and dark stripes.
    #[must_use]
    pub fn striped_background(mut self) -> Self {
        self.striped = true;
        self
    }

    /// Leaves out the torso.
    #[must_use]
    pub fn without_torso(mut self) -> Self {
        self.torso = false;
        self
    }

    /// Leaves out the face.
    #[must_use]
    pub fn without_face(mut self) -> Self {
        self.face = false;
        self
    }

    /// Adds a second face of the same size centred at `x` (fraction of the
    /// frame width) on the same row.
    #[must_use]
    pub fn second_face(mut self, x: f32) -> Self {
        self.second_face = Some(x);
        self
    }

    /// Face box the builder draws for a centre at `x`.
    fn face_box_at(&self, x: f32) -> BoundingBox {
        let h = (self.face_fraction * self.height as f32).round();
        let w = (h * self.face_aspect).round();
        let x0 = (x * self.width as f32 - w / 2.0).round().max(0.0);
        let y0 = (self.center.1 * self.height as f32 - h / 2.0).round().max(0.0);
        BoundingBox::new(x0 as u32, y0 as u32, w as u32, h as u32)
    }

    /// Box of the main face.
    #[must_use]
    pub fn face_box(&self) -> BoundingBox {
        self.face_box_at(self.center.0)
    }

    /// Renders the pixels.
    #[must_use]
    pub fn build(&self) -> RgbImage {
        let face = self.face_box();
        let second = self.second_face.map(|x| self.face_box_at(x));

        let gap = self.height / 20;
        let (cx, _) = face.center();
        let torso = BoundingBox::new(
            (cx - face.width as f32).round().max(0.0) as u32,
            face.bottom() + gap,
            face.width * 2,
            self.height.saturating_sub(face.bottom() + gap),
        );

        RgbImage::from_fn(self.width, self.height, |x, y| {
            let is_face =
                self.face && (face.contains(x, y) || second.is_some_and(|b| b.contains(x, y)));
            if is_face {
                Rgb(SKIN)
            } else if self.torso && torso.contains(x, y) {
                Rgb(TORSO)
            } else if self.striped {
                if (x / 10) % 2 == 0 {
                    Rgb(WHITE)
                } else {
                    Rgb(STRIPE)
                }
            } else {
                Rgb(self.background)
            }
        })
    }

    /// Renders into a core [`Image`].
    #[must_use]
    pub fn image(&self) -> Image {
        Image::from_rgb(self.build())
    }

    /// Renders and encodes as PNG.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding fails.
    pub fn png_bytes(&self) -> image::ImageResult<Vec<u8>> {
        self.image().encode_png()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_default_face_box() {
        let builder = PortraitBuilder::new();
        assert_eq!(builder.face_box(), BoundingBox::new(199, 165, 203, 270));
    }

    #[test]
    fn test_pixels() {
        let img = PortraitBuilder::new().build();
        assert_eq!(img.dimensions(), (600, 600));
        assert_eq!(img.get_pixel(300, 300).0, SKIN);
        assert_eq!(img.get_pixel(300, 550).0, TORSO);
        assert_eq!(img.get_pixel(5, 5).0, WHITE);
    }

    #[test]
    fn test_background_and_face_options() {
        let img = PortraitBuilder::new()
            .background([200, 200, 200])
            .without_face()
            .build();
        assert_eq!(img.get_pixel(300, 300).0, [200, 200, 200]);
    }

    #[test]
    fn test_second_face() {
        let builder = PortraitBuilder::new().center(0.27, 0.5).second_face(0.73);
        let img = builder.build();
        assert_eq!(img.get_pixel(162, 300).0, SKIN);
        assert_eq!(img.get_pixel(438, 300).0, SKIN);
        assert_eq!(img.get_pixel(300, 300).0, WHITE);
    }

    #[test]
    fn test_striped_background() {
        let img = PortraitBuilder::new().striped_background().build();
        assert_eq!(img.get_pixel(5, 5).0, WHITE);
        assert_eq!(img.get_pixel(15, 5).0, STRIPE);
    }

    #[test]
    fn test_png_roundtrip_decodes() {
        let bytes = PortraitBuilder::new().size(320, 320).png_bytes().unwrap();
        let image = Image::decode(&bytes, idcheck_core::InputFormat::Png).unwrap();
        assert_eq!((image.width(), image.height()), (320, 320));
    }
}
