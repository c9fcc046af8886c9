//! Resolution and sharpness advisors.
//!
//! Both checks are diagnostic only: they push an [`Advisory`] and log a
//! warning, and the low-sharpness case applies one unsharp-mask pass, but
//! neither ever aborts processing.

use image::imageops;
use image::RgbImage;
use imageproc::filter::laplacian_filter;
use tracing::{debug, warn};

use crate::rules::CompositionRule;
use crate::Advisory;

/// Laplacian variance below this counts as soft.
const SHARPNESS_THRESHOLD: f64 = 30.0;

/// Unsharp-mask parameters for the enhancement pass.
const UNSHARP_SIGMA: f32 = 1.0;
const UNSHARP_CLAMP: i32 = 3;

/// Flag sources too small for a clean print of the rule's target size.
pub(crate) fn check_resolution(
    width: u32,
    height: u32,
    rule: &CompositionRule,
    advisories: &mut Vec<Advisory>,
) {
    let short_edge = width.min(height);
    let area = width as u64 * height as u64;
    if short_edge < rule.min_short_edge || area < rule.min_area() {
        warn!(
            width,
            height,
            min_short_edge = rule.min_short_edge,
            "source resolution below recommended minimum"
        );
        advisories.push(Advisory::LowResolution { width, height });
    }
}

/// Variance of the Laplacian edge response over the grayscale image.
/// Low values indicate blur or motion smearing.
pub(crate) fn sharpness_variance(image: &RgbImage) -> f64 {
    let gray = imageops::grayscale(image);
    let lap = laplacian_filter(&gray);
    let samples = lap.as_raw();
    if samples.is_empty() {
        return 0.0;
    }

    let n = samples.len() as f64;
    let mut sum = 0.0;
    let mut sum_sq = 0.0;
    for &v in samples {
        let v = v as f64;
        sum += v;
        sum_sq += v * v;
    }
    let mean = sum / n;
    sum_sq / n - mean * mean
}

/// Apply one unsharp-mask pass when the image measures soft, recording an
/// advisory. Sharp images pass through untouched.
pub(crate) fn enhance_if_soft(image: RgbImage, advisories: &mut Vec<Advisory>) -> RgbImage {
    let variance = sharpness_variance(&image);
    if variance >= SHARPNESS_THRESHOLD {
        debug!(variance, "sharpness acceptable, no enhancement");
        return image;
    }
    warn!(
        variance,
        threshold = SHARPNESS_THRESHOLD,
        "low sharpness, applying unsharp mask"
    );
    advisories.push(Advisory::LowSharpness { variance });
    imageops::unsharpen(&image, UNSHARP_SIGMA, UNSHARP_CLAMP)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::TWO_INCH;
    use image::Rgb;

    fn flat(width: u32, height: u32) -> RgbImage {
        RgbImage::from_pixel(width, height, Rgb([128, 128, 128]))
    }

    fn checkerboard(width: u32, height: u32) -> RgbImage {
        let mut img = RgbImage::new(width, height);
        for (x, y, pixel) in img.enumerate_pixels_mut() {
            let v = if (x + y) % 2 == 0 { 255 } else { 0 };
            *pixel = Rgb([v, v, v]);
        }
        img
    }

    #[test]
    fn small_source_raises_low_resolution() {
        let mut advisories = Vec::new();
        check_resolution(300, 400, &TWO_INCH, &mut advisories);
        assert_eq!(
            advisories,
            vec![Advisory::LowResolution {
                width: 300,
                height: 400
            }]
        );
    }

    #[test]
    fn large_source_passes_resolution_check() {
        let mut advisories = Vec::new();
        check_resolution(2000, 3000, &TWO_INCH, &mut advisories);
        assert!(advisories.is_empty());
    }

    #[test]
    fn short_edge_alone_triggers_advisory() {
        // Plenty of area, but one edge under the minimum.
        let mut advisories = Vec::new();
        check_resolution(400, 5000, &TWO_INCH, &mut advisories);
        assert_eq!(advisories.len(), 1);
    }

    #[test]
    fn flat_image_measures_soft() {
        assert!(sharpness_variance(&flat(64, 64)) < SHARPNESS_THRESHOLD);
    }

    #[test]
    fn checkerboard_measures_sharp() {
        assert!(sharpness_variance(&checkerboard(64, 64)) > SHARPNESS_THRESHOLD);
    }

    #[test]
    fn soft_image_gets_enhanced_with_advisory() {
        let mut advisories = Vec::new();
        let out = enhance_if_soft(flat(64, 64), &mut advisories);
        assert_eq!(out.dimensions(), (64, 64));
        assert!(matches!(
            advisories.as_slice(),
            [Advisory::LowSharpness { .. }]
        ));
    }

    #[test]
    fn sharp_image_passes_through_unchanged() {
        let img = checkerboard(64, 64);
        let mut advisories = Vec::new();
        let out = enhance_if_soft(img.clone(), &mut advisories);
        assert!(advisories.is_empty());
        assert_eq!(out, img);
    }
}
