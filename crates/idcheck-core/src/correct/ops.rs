//! Deterministic image operations used by the adjuster.
//!
//! Every operation returns a new buffer together with the face box mapped
//! into the new frame. Facial pixels are only ever moved or resampled as a
//! whole, never edited.

#![allow(
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::cast_sign_loss
)]

use image::imageops::{self, FilterType};
use image::{Rgb, RgbImage};

use crate::domain::{BoundingBox, CorrectionError, FrameTarget};
use crate::quality::subject_region;

/// Output of one operation.
#[derive(Debug, Clone)]
pub struct OpOutput {
    /// Transformed pixels.
    pub pixels: RgbImage,
    /// Face box in the transformed frame.
    pub face: BoundingBox,
    /// What was done.
    pub description: String,
}

/// Crops to `aspect_ratio` (width / height) keeping the face as central as
/// the frame allows.
///
/// # Errors
///
/// Returns [`CorrectionError::CropTooSmall`] if the result would fall below
/// `min_resolution`, or [`CorrectionError::FaceOutOfFrame`] if the face
/// does not fit in the crop window.
pub fn crop_to_aspect(
    pixels: &RgbImage,
    face: BoundingBox,
    aspect_ratio: f32,
    min_resolution: (u32, u32),
) -> Result<OpOutput, CorrectionError> {
    let (width, height) = pixels.dimensions();
    let current = width as f32 / height as f32;
    let (new_w, new_h) = if current > aspect_ratio {
        (((height as f32) * aspect_ratio).round() as u32, height)
    } else {
        (width, ((width as f32) / aspect_ratio).round() as u32)
    };
    let (new_w, new_h) = (new_w.clamp(1, width), new_h.clamp(1, height));

    if new_w < min_resolution.0 || new_h < min_resolution.1 {
        return Err(CorrectionError::CropTooSmall {
            width: new_w,
            height: new_h,
        });
    }

    let (cx, cy) = face.center();
    let x0 = window_start(cx, new_w, width);
    let y0 = window_start(cy, new_h, height);
    let window = BoundingBox::new(x0, y0, new_w, new_h);
    if face.x < window.x
        || face.y < window.y
        || face.right() > window.right()
        || face.bottom() > window.bottom()
    {
        return Err(CorrectionError::FaceOutOfFrame);
    }

    let cropped = imageops::crop_imm(pixels, x0, y0, new_w, new_h).to_image();
    Ok(OpOutput {
        pixels: cropped,
        face: BoundingBox::new(face.x - x0, face.y - y0, face.width, face.height),
        description: format!("cropped to {new_w}x{new_h} (aspect ratio {aspect_ratio:.2})"),
    })
}

/// Start of a `len` window centred on `center`, clamped to `[0, total]`.
fn window_start(center: f32, len: u32, total: u32) -> u32 {
    let start = (center - len as f32 / 2.0).round().max(0.0) as u32;
    start.min(total - len)
}

/// Rescales the content by `factor` about the face centre, keeping the
/// frame size. Uncovered margins take the `fill` colour.
///
/// # Errors
///
/// Returns [`CorrectionError::FaceOutOfFrame`] if the scaled face would not
/// fit in the frame.
pub fn scale_about_face(
    pixels: &RgbImage,
    face: BoundingBox,
    factor: f32,
    fill: [u8; 3],
) -> Result<OpOutput, CorrectionError> {
    let (width, height) = pixels.dimensions();
    let (cx, cy) = face.center();

    let scaled_face = BoundingBox::new(
        (cx + (face.x as f32 - cx) * factor).round().max(0.0) as u32,
        (cy + (face.y as f32 - cy) * factor).round().max(0.0) as u32,
        (face.width as f32 * factor).round() as u32,
        (face.height as f32 * factor).round() as u32,
    );
    let left = cx - (cx - face.x as f32) * factor;
    let top = cy - (cy - face.y as f32) * factor;
    if left < 0.0
        || top < 0.0
        || scaled_face.right() > width
        || scaled_face.bottom() > height
    {
        return Err(CorrectionError::FaceOutOfFrame);
    }

    let resized_w = ((width as f32) * factor).round().max(1.0) as u32;
    let resized_h = ((height as f32) * factor).round().max(1.0) as u32;
    let resized = imageops::resize(pixels, resized_w, resized_h, FilterType::Lanczos3);

    let mut canvas = RgbImage::from_pixel(width, height, Rgb(fill));
    let offset_x = (cx - cx * factor).round() as i64;
    let offset_y = (cy - cy * factor).round() as i64;
    imageops::replace(&mut canvas, &resized, offset_x, offset_y);

    Ok(OpOutput {
        pixels: canvas,
        face: scaled_face,
        description: format!("scaled content by {factor:.2} about the face centre"),
    })
}

/// Moves the content so the face centre lands on `(target_x, target_y)`,
/// given as fractions of the frame. Uncovered margins take the `fill`
/// colour.
///
/// # Errors
///
/// Returns [`CorrectionError::FaceOutOfFrame`] if the face would leave the
/// frame.
pub fn translate_face(
    pixels: &RgbImage,
    face: BoundingBox,
    target_x: f32,
    target_y: f32,
    fill: [u8; 3],
) -> Result<OpOutput, CorrectionError> {
    let (width, height) = pixels.dimensions();
    let (cx, cy) = face.center();
    let dx = (target_x * width as f32 - cx).round() as i64;
    let dy = (target_y * height as f32 - cy).round() as i64;

    let moved = face
        .shifted(dx, dy, width, height)
        .ok_or(CorrectionError::FaceOutOfFrame)?;

    let mut canvas = RgbImage::from_pixel(width, height, Rgb(fill));
    imageops::replace(&mut canvas, pixels, dx, dy);

    Ok(OpOutput {
        pixels: canvas,
        face: moved,
        description: format!("moved the face by ({dx}, {dy}) px to the frame centre"),
    })
}

/// Moves the content down until `margin` face heights fit above the face.
/// Leaves the frame unchanged when there is already room.
///
/// # Errors
///
/// Returns [`CorrectionError::FaceOutOfFrame`] if the face would be pushed
/// past the bottom edge.
pub fn add_headroom(
    pixels: &RgbImage,
    face: BoundingBox,
    margin: f32,
    fill: [u8; 3],
) -> Result<OpOutput, CorrectionError> {
    let (width, height) = pixels.dimensions();
    let needed = (face.height as f32 * margin).round() as u32;
    let dy = needed.saturating_sub(face.y);
    if dy == 0 {
        return Ok(OpOutput {
            pixels: pixels.clone(),
            face,
            description: "headroom already sufficient".to_string(),
        });
    }

    let moved = face
        .shifted(0, i64::from(dy), width, height)
        .ok_or(CorrectionError::FaceOutOfFrame)?;

    let mut canvas = RgbImage::from_pixel(width, height, Rgb(fill));
    imageops::replace(&mut canvas, pixels, 0, i64::from(dy));

    Ok(OpOutput {
        pixels: canvas,
        face: moved,
        description: format!("moved the content down by {dy} px to clear the top of the head"),
    })
}

/// Scales the content so the face fills `target.face_fraction` of the
/// output height and places it in a `target.width` x `target.height` frame,
/// face centred horizontally with its centre at `target.face_center_y`.
///
/// # Errors
///
/// Returns [`CorrectionError::FaceOutOfFrame`] if the scaled face does not
/// fit in the output frame.
pub fn fit_to_frame(
    pixels: &RgbImage,
    face: BoundingBox,
    target: FrameTarget,
    fill: [u8; 3],
) -> Result<OpOutput, CorrectionError> {
    let (width, height) = pixels.dimensions();
    let factor = target.face_fraction * target.height as f32 / face.height.max(1) as f32;
    let (cx, cy) = face.center();

    let offset_x = (target.width as f32 / 2.0 - cx * factor).round() as i64;
    let offset_y = (target.face_center_y * target.height as f32 - cy * factor).round() as i64;
    let scaled_face = BoundingBox::new(
        0,
        0,
        (face.width as f32 * factor).round() as u32,
        (face.height as f32 * factor).round() as u32,
    );
    let placed = scaled_face
        .shifted(
            offset_x + (face.x as f32 * factor).round() as i64,
            offset_y + (face.y as f32 * factor).round() as i64,
            target.width,
            target.height,
        )
        .ok_or(CorrectionError::FaceOutOfFrame)?;

    let resized_w = ((width as f32) * factor).round().max(1.0) as u32;
    let resized_h = ((height as f32) * factor).round().max(1.0) as u32;
    let resized = imageops::resize(pixels, resized_w, resized_h, FilterType::Lanczos3);

    let mut canvas = RgbImage::from_pixel(target.width, target.height, Rgb(fill));
    imageops::replace(&mut canvas, &resized, offset_x, offset_y);

    Ok(OpOutput {
        pixels: canvas,
        face: placed,
        description: format!(
            "fitted to a {}x{} frame (content scaled by {factor:.2})",
            target.width, target.height
        ),
    })
}

/// Replaces background pixels with `fill`.
///
/// Everything outside the subject region is replaced; inside it, pixels
/// within `tolerance` of the measured background colour are replaced too.
/// The face box is never touched.
#[must_use]
pub fn replace_background(
    pixels: &RgbImage,
    face: BoundingBox,
    background: [u8; 3],
    fill: [u8; 3],
    tolerance: f32,
) -> OpOutput {
    let (width, height) = pixels.dimensions();
    let subject = subject_region(face, width, height);
    let mut out = pixels.clone();
    let mut replaced = 0u64;

    for (x, y, pixel) in out.enumerate_pixels_mut() {
        if face.contains(x, y) {
            continue;
        }
        if !subject.contains(x, y) || distance(pixel.0, background) <= tolerance {
            *pixel = Rgb(fill);
            replaced += 1;
        }
    }

    OpOutput {
        pixels: out,
        face,
        description: format!(
            "replaced {replaced} background pixels with #{:02X}{:02X}{:02X}",
            fill[0], fill[1], fill[2]
        ),
    }
}

fn distance(a: [u8; 3], b: [u8; 3]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(&p, &q)| {
            let d = f32::from(p) - f32::from(q);
            d * d
        })
        .sum::<f32>()
        .sqrt()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const WHITE: [u8; 3] = [255, 255, 255];
    const SKIN: Rgb<u8> = Rgb([224, 172, 140]);

    fn frame(width: u32, height: u32, face: BoundingBox, background: [u8; 3]) -> RgbImage {
        RgbImage::from_fn(width, height, |x, y| {
            if face.contains(x, y) {
                SKIN
            } else {
                Rgb(background)
            }
        })
    }

    #[test]
    fn test_translate_centres_face() {
        let face = BoundingBox::new(250, 100, 100, 200);
        let img = frame(400, 400, face, WHITE);
        let out = translate_face(&img, face, 0.5, 0.5, WHITE).unwrap();
        assert_eq!(out.face, BoundingBox::new(150, 100, 100, 200));
        assert_eq!(*out.pixels.get_pixel(150, 100), SKIN);
        assert_eq!(*out.pixels.get_pixel(380, 200), Rgb(WHITE));
        assert_eq!(*img.get_pixel(150, 100), Rgb(WHITE));
    }

    #[test]
    fn test_translate_out_of_frame() {
        let face = BoundingBox::new(10, 10, 380, 100);
        let img = frame(400, 400, face, WHITE);
        assert_eq!(
            translate_face(&img, face, 0.9, 0.5, WHITE).unwrap_err(),
            CorrectionError::FaceOutOfFrame
        );
    }

    #[test]
    fn test_scale_grows_face() {
        let face = BoundingBox::new(150, 150, 100, 100);
        let img = frame(400, 400, face, WHITE);
        let out = scale_about_face(&img, face, 1.5, WHITE).unwrap();
        assert_eq!(out.pixels.dimensions(), (400, 400));
        assert_eq!(out.face, BoundingBox::new(125, 125, 150, 150));
        assert_eq!(*out.pixels.get_pixel(200, 200), SKIN);
    }

    #[test]
    fn test_scale_shrink_pads_with_fill() {
        let face = BoundingBox::new(150, 150, 100, 100);
        let img = frame(400, 400, face, [0, 0, 0]);
        let out = scale_about_face(&img, face, 0.5, WHITE).unwrap();
        assert_eq!(out.face, BoundingBox::new(175, 175, 50, 50));
        assert_eq!(*out.pixels.get_pixel(5, 5), Rgb(WHITE));
    }

    #[test]
    fn test_scale_out_of_frame() {
        let face = BoundingBox::new(100, 100, 200, 200);
        let img = frame(400, 400, face, WHITE);
        assert_eq!(
            scale_about_face(&img, face, 2.5, WHITE).unwrap_err(),
            CorrectionError::FaceOutOfFrame
        );
    }

    #[test]
    fn test_crop_to_aspect() {
        let face = BoundingBox::new(350, 100, 100, 150);
        let img = frame(800, 400, face, WHITE);
        let out = crop_to_aspect(&img, face, 0.75, (200, 200)).unwrap();
        assert_eq!(out.pixels.dimensions(), (300, 400));
        assert_eq!(out.face, BoundingBox::new(100, 100, 100, 150));
    }

    #[test]
    fn test_crop_too_small() {
        let face = BoundingBox::new(350, 100, 100, 150);
        let img = frame(800, 400, face, WHITE);
        assert_eq!(
            crop_to_aspect(&img, face, 0.75, (400, 400)).unwrap_err(),
            CorrectionError::CropTooSmall {
                width: 300,
                height: 400
            }
        );
    }

    #[test]
    fn test_headroom_moves_content_down() {
        let face = BoundingBox::new(150, 20, 100, 100);
        let img = frame(400, 400, face, WHITE);
        let out = add_headroom(&img, face, 0.6, [0, 0, 0]).unwrap();
        assert_eq!(out.face, BoundingBox::new(150, 60, 100, 100));
        assert_eq!(*out.pixels.get_pixel(200, 30), Rgb([0, 0, 0]));
        assert_eq!(*out.pixels.get_pixel(200, 60), SKIN);
        assert_eq!(*out.pixels.get_pixel(200, 59), Rgb([0, 0, 0]));
    }

    #[test]
    fn test_headroom_noop_when_room() {
        let face = BoundingBox::new(150, 100, 100, 100);
        let img = frame(400, 400, face, WHITE);
        let out = add_headroom(&img, face, 0.6, WHITE).unwrap();
        assert_eq!(out.face, face);
        assert_eq!(out.pixels, img);
    }

    #[test]
    fn test_headroom_out_of_frame() {
        let face = BoundingBox::new(100, 10, 100, 380);
        let img = frame(400, 400, face, WHITE);
        assert_eq!(
            add_headroom(&img, face, 0.6, WHITE).unwrap_err(),
            CorrectionError::FaceOutOfFrame
        );
    }

    #[test]
    fn test_fit_to_standard_frame() {
        let face = BoundingBox::new(20, 100, 120, 160);
        let img = frame(400, 400, face, [200, 200, 200]);
        let out = fit_to_frame(&img, face, FrameTarget::STANDARD, WHITE).unwrap();
        assert_eq!(out.pixels.dimensions(), (480, 640));
        assert_eq!(out.face, BoundingBox::new(120, 173, 240, 320));
        assert_eq!(*out.pixels.get_pixel(240, 333), SKIN);
        // Uncovered left margin takes the fill colour.
        assert_eq!(*out.pixels.get_pixel(5, 300), Rgb(WHITE));
    }

    #[test]
    fn test_fit_to_frame_face_too_wide() {
        let face = BoundingBox::new(0, 150, 400, 100);
        let img = frame(400, 400, face, WHITE);
        assert_eq!(
            fit_to_frame(&img, face, FrameTarget::STANDARD, WHITE).unwrap_err(),
            CorrectionError::FaceOutOfFrame
        );
    }

    #[test]
    fn test_replace_background_keeps_face() {
        let face = BoundingBox::new(150, 100, 100, 150);
        let img = frame(400, 400, face, [200, 200, 200]);
        let out = replace_background(&img, face, [200, 200, 200], WHITE, 40.0);
        assert_eq!(*out.pixels.get_pixel(5, 5), Rgb(WHITE));
        assert_eq!(*out.pixels.get_pixel(200, 300), Rgb(WHITE));
        assert_eq!(*out.pixels.get_pixel(200, 200), SKIN);
        assert_eq!(out.face, face);
    }
}
