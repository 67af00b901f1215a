//! Frame annotation: face boxes and label chips.
//!
//! Every detected face gets a box outline plus a filled chip above it,
//! both in the label's fixed color. The color is the label encoding on
//! the pixel surface; the label text itself travels in the frame's
//! side-channel info, not in the pixels.

use image::{Rgb, RgbImage};

use crate::vision::detect::FaceRegion;
use crate::vision::label::EmotionLabel;

/// Outline thickness of the face box, in pixels.
pub const BOX_THICKNESS: u32 = 2;
/// Height of the filled label chip drawn above the face box.
pub const CHIP_HEIGHT: u32 = 12;
const CHIP_GAP: u32 = 2;

/// Draw the box and label chip for one observation onto the frame.
///
/// Coordinates are clamped to the frame, so faces at the image border
/// (including a chip that would extend above row zero) are clipped
/// rather than rejected.
pub fn draw_face_marker(frame: &mut RgbImage, region: &FaceRegion, label: EmotionLabel) {
    let color = Rgb(label.color_rgb());
    draw_rect(
        frame,
        region.x as i64,
        region.y as i64,
        region.right() as i64,
        region.bottom() as i64,
        color,
        BOX_THICKNESS,
    );
    let chip_bottom = region.y as i64 - CHIP_GAP as i64;
    fill_rect(
        frame,
        region.x as i64,
        chip_bottom - CHIP_HEIGHT as i64,
        region.right() as i64,
        chip_bottom,
        color,
    );
}

/// Outline the half-open rectangle `[x0, x1) x [y0, y1)`, inset ring by
/// ring until `thickness` rings are drawn or the rectangle collapses.
pub fn draw_rect(
    img: &mut RgbImage,
    x0: i64,
    y0: i64,
    x1: i64,
    y1: i64,
    color: Rgb<u8>,
    thickness: u32,
) {
    for inset in 0..thickness as i64 {
        let left = x0 + inset;
        let top = y0 + inset;
        let right = x1 - 1 - inset;
        let bottom = y1 - 1 - inset;
        if left > right || top > bottom {
            break;
        }
        for x in left..=right {
            put_clamped(img, x, top, color);
            put_clamped(img, x, bottom, color);
        }
        for y in top..=bottom {
            put_clamped(img, left, y, color);
            put_clamped(img, right, y, color);
        }
    }
}

/// Fill the half-open rectangle `[x0, x1) x [y0, y1)`, clipped to the frame.
pub fn fill_rect(img: &mut RgbImage, x0: i64, y0: i64, x1: i64, y1: i64, color: Rgb<u8>) {
    let (width, height) = img.dimensions();
    let left = x0.clamp(0, width as i64);
    let top = y0.clamp(0, height as i64);
    let right = x1.clamp(0, width as i64);
    let bottom = y1.clamp(0, height as i64);
    for y in top..bottom {
        for x in left..right {
            img.put_pixel(x as u32, y as u32, color);
        }
    }
}

fn put_clamped(img: &mut RgbImage, x: i64, y: i64, color: Rgb<u8>) {
    let (width, height) = img.dimensions();
    if x >= 0 && y >= 0 && (x as u32) < width && (y as u32) < height {
        img.put_pixel(x as u32, y as u32, color);
    }
}
