//! Canvas operations: cover-scale normalization, the fit-inside center-fit
//! canvas, alpha flattening, and the neutral placeholder.

use image::imageops::{self, FilterType};
use image::{DynamicImage, Rgb, RgbImage, RgbaImage};

/// Fill color for the center-fit canvas and alpha compositing.
const CANVAS_FILL: Rgb<u8> = Rgb([255, 255, 255]);

/// Neutral fill for the decode-failure placeholder.
const PLACEHOLDER_FILL: Rgb<u8> = Rgb([240, 240, 240]);

/// Sources within this many pixels of the target on both axes are resized
/// directly, avoiding a resize-then-crop double pass.
const DIRECT_RESIZE_TOLERANCE: i64 = 2;

/// Map an arbitrary-sized image to exactly `target_w` × `target_h` with a
/// uniform cover scale and a centered crop of the overflow.
///
/// The output is pixel-exact to the target for any source of at least 1 × 1,
/// including rounding that leaves a ±1 px mismatch after the center crop.
pub(crate) fn normalize_to_target(image: &RgbImage, target_w: u32, target_h: u32) -> RgbImage {
    let (src_w, src_h) = image.dimensions();

    if (src_w as i64 - target_w as i64).abs() <= DIRECT_RESIZE_TOLERANCE
        && (src_h as i64 - target_h as i64).abs() <= DIRECT_RESIZE_TOLERANCE
    {
        return imageops::resize(image, target_w, target_h, FilterType::Lanczos3);
    }

    // Cover scale: the larger ratio fills one axis exactly, the other overflows.
    let scale = (target_w as f64 / src_w as f64).max(target_h as f64 / src_h as f64);
    let new_w = ((src_w as f64 * scale).round() as u32).max(1);
    let new_h = ((src_h as f64 * scale).round() as u32).max(1);
    let resized = imageops::resize(image, new_w, new_h, FilterType::Lanczos3);

    if new_w == target_w && new_h == target_h {
        return resized;
    }

    let left = new_w.saturating_sub(target_w) / 2;
    let top = new_h.saturating_sub(target_h) / 2;
    let crop_w = target_w.min(new_w - left);
    let crop_h = target_h.min(new_h - top);
    let cropped = imageops::crop_imm(&resized, left, top, crop_w, crop_h).to_image();

    if cropped.dimensions() == (target_w, target_h) {
        cropped
    } else {
        imageops::resize(&cropped, target_w, target_h, FilterType::Lanczos3)
    }
}

/// Scale the whole source to fit inside the target and place it centered on
/// a white target-sized canvas. Never crops content; always succeeds.
pub(crate) fn center_fit_canvas(image: &RgbImage, target_w: u32, target_h: u32) -> RgbImage {
    let (src_w, src_h) = image.dimensions();
    let scale = (target_w as f64 / src_w as f64).min(target_h as f64 / src_h as f64);
    let new_w = ((src_w as f64 * scale) as u32).max(1);
    let new_h = ((src_h as f64 * scale) as u32).max(1);
    let resized = imageops::resize(image, new_w, new_h, FilterType::Lanczos3);

    let mut canvas = RgbImage::from_pixel(target_w, target_h, CANVAS_FILL);
    let x = (target_w.saturating_sub(new_w) / 2) as i64;
    let y = (target_h.saturating_sub(new_h) / 2) as i64;
    imageops::replace(&mut canvas, &resized, x, y);
    canvas
}

/// Uniform neutral-color image at the target size, used when decode fails
/// and as the retry subject when encoding fails.
pub(crate) fn placeholder(target_w: u32, target_h: u32) -> RgbImage {
    RgbImage::from_pixel(target_w.max(1), target_h.max(1), PLACEHOLDER_FILL)
}

/// Flatten any alpha channel by compositing onto the white canvas fill.
pub(crate) fn flatten_alpha(image: &DynamicImage) -> RgbImage {
    let rgba: RgbaImage = image.to_rgba8();
    let (width, height) = rgba.dimensions();
    let mut rgb = RgbImage::new(width, height);

    for (x, y, pixel) in rgba.enumerate_pixels() {
        let [r, g, b, a] = pixel.0;
        let alpha = a as f32 / 255.0;
        let inv = 1.0 - alpha;
        let out = [
            (r as f32 * alpha + CANVAS_FILL.0[0] as f32 * inv).round() as u8,
            (g as f32 * alpha + CANVAS_FILL.0[1] as f32 * inv).round() as u8,
            (b as f32 * alpha + CANVAS_FILL.0[2] as f32 * inv).round() as u8,
        ];
        rgb.put_pixel(x, y, Rgb(out));
    }

    rgb
}
