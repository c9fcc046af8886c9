//! The composition pipeline and its fallback selector.
//!
//! Stage order: decode (placeholder on failure) → resolution advisory →
//! alpha flattening → crop selection → optional sharpness enhancement →
//! canvas normalization → size-constrained encode. Every stage degrades to
//! a safer fallback; only a twice-failed encode escapes as an error.

use image::imageops;
use image::{DynamicImage, RgbImage};
use tracing::warn;

use crate::error::ComposeError;
use crate::geometry::{self, CropRect};
use crate::landmarks::{Anchors, LandmarkDetector};
use crate::rules::CompositionRule;
use crate::{advisor, canvas, encode};
use crate::{Advisory, ComposedPhoto, CropStrategy};

/// Decode input bytes, treating undecodable input and zero-dimension decodes
/// as "no image" so the caller can substitute the placeholder.
fn decode_image(input: &[u8]) -> Option<DynamicImage> {
    match image::load_from_memory(input) {
        Ok(img) if img.width() > 0 && img.height() > 0 => Some(img),
        Ok(_) => {
            warn!("decoded image has zero dimensions, using placeholder");
            None
        }
        Err(err) => {
            warn!(%err, "failed to decode input image, using placeholder");
            None
        }
    }
}

/// Run the landmark stage end to end: detector → anchors → crop rectangle.
/// Any miss (no detector, no face, degenerate geometry, out-of-bounds crop)
/// returns `None` and the selector advances to the center-fit stage.
fn landmark_crop(
    image: &RgbImage,
    rule: &CompositionRule,
    detector: Option<&dyn LandmarkDetector>,
) -> Option<CropRect> {
    let Some(detector) = detector else {
        warn!("composition enabled but no landmark detector configured");
        return None;
    };

    let (width, height) = image.dimensions();
    let Some(landmarks) = detector.detect(image.as_raw(), width, height) else {
        warn!("no face found, falling back to center fit");
        return None;
    };

    let anchors = Anchors::from_landmarks(&landmarks, width, height);
    match geometry::compute_crop(&anchors, width, height, rule) {
        Ok(rect) => Some(rect),
        Err(err) => {
            warn!(%err, "landmark crop failed, falling back to center fit");
            None
        }
    }
}

/// The fallback selector: landmark crop, then center fit, then pass-through.
///
/// Pass-through is reserved for composition being disabled by policy; once
/// composition is requested, a failed landmark stage always lands on the
/// center-fit canvas, never on an abort.
fn select_crop(
    image: &RgbImage,
    rule: &CompositionRule,
    composition: bool,
    detector: Option<&dyn LandmarkDetector>,
) -> (RgbImage, CropStrategy) {
    if !composition {
        return (image.clone(), CropStrategy::PassThrough);
    }

    if let Some(rect) = landmark_crop(image, rule, detector) {
        let cropped =
            imageops::crop_imm(image, rect.left, rect.top, rect.width(), rect.height()).to_image();
        return (cropped, CropStrategy::Landmark);
    }

    (
        canvas::center_fit_canvas(image, rule.target_w, rule.target_h),
        CropStrategy::CenterFit,
    )
}

/// Full pipeline: always produces an artifact of exactly the rule's target
/// size, or the terminal [`ComposeError::Encode`] when even the placeholder
/// cannot be encoded.
pub(crate) fn compose_pipeline(
    input: &[u8],
    rule: &CompositionRule,
    composition: bool,
    sharpness_enhancement: bool,
    max_bytes: Option<usize>,
    dpi: u16,
    detector: Option<&dyn LandmarkDetector>,
) -> Result<ComposedPhoto, ComposeError> {
    let mut advisories = Vec::new();

    let flattened = match decode_image(input) {
        Some(decoded) => {
            advisor::check_resolution(decoded.width(), decoded.height(), rule, &mut advisories);
            canvas::flatten_alpha(&decoded)
        }
        None => {
            advisories.push(Advisory::DecodeFallback);
            canvas::placeholder(rule.target_w, rule.target_h)
        }
    };

    let (selected, strategy) = select_crop(&flattened, rule, composition, detector);

    let selected = if sharpness_enhancement {
        advisor::enhance_if_soft(selected, &mut advisories)
    } else {
        selected
    };

    let normalized = canvas::normalize_to_target(&selected, rule.target_w, rule.target_h);
    let (width, height) = normalized.dimensions();

    let encoded = match encode::encode_with_budget(&normalized, max_bytes, dpi) {
        Ok(encoded) => encoded,
        Err(err) => {
            warn!(%err, "encoding failed, retrying with placeholder");
            let fallback = canvas::placeholder(rule.target_w, rule.target_h);
            encode::encode_with_budget(&fallback, max_bytes, dpi)?
        }
    };

    Ok(ComposedPhoto {
        data: encoded.data,
        width,
        height,
        dpi,
        quality: encoded.quality,
        within_budget: encoded.within_budget,
        strategy,
        advisories,
        original_size: input.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::landmarks::{CoordSpace, FaceLandmarks, Point};
    use crate::rules::TWO_INCH;
    use image::{Rgb, RgbImage};

    struct FixedDetector(Option<FaceLandmarks>);

    impl LandmarkDetector for FixedDetector {
        fn detect(&self, _rgb: &[u8], _width: u32, _height: u32) -> Option<FaceLandmarks> {
            self.0.clone()
        }
    }

    fn gradient(width: u32, height: u32) -> RgbImage {
        let mut img = RgbImage::new(width, height);
        for (x, y, pixel) in img.enumerate_pixels_mut() {
            *pixel = Rgb([
                (x * 255 / width.max(1)) as u8,
                (y * 255 / height.max(1)) as u8,
                128,
            ]);
        }
        img
    }

    fn face_at(cx: f64, cy: f64, height: f64) -> FaceLandmarks {
        FaceLandmarks {
            chin: Point::new(cx, cy + height / 2.0),
            brow: Point::new(cx, cy - height / 2.0 + 40.0),
            forehead: Point::new(cx, cy - height / 2.0),
            left_cheek: Point::new(cx - height * 0.35, cy),
            right_cheek: Point::new(cx + height * 0.35, cy),
            eyelids: None,
            space: CoordSpace::Pixel,
        }
    }

    #[test]
    fn composition_disabled_passes_through() {
        let img = gradient(800, 600);
        let (_, strategy) = select_crop(&img, &TWO_INCH, false, None);
        assert_eq!(strategy, CropStrategy::PassThrough);
    }

    #[test]
    fn no_detector_falls_back_to_center_fit() {
        let img = gradient(800, 600);
        let (out, strategy) = select_crop(&img, &TWO_INCH, true, None);
        assert_eq!(strategy, CropStrategy::CenterFit);
        assert_eq!(out.dimensions(), (413, 626));
    }

    #[test]
    fn no_face_falls_back_to_center_fit() {
        let img = gradient(800, 600);
        let detector = FixedDetector(None);
        let (out, strategy) = select_crop(&img, &TWO_INCH, true, Some(&detector));
        assert_eq!(strategy, CropStrategy::CenterFit);
        assert_eq!(out.dimensions(), (413, 626));
    }

    #[test]
    fn detected_face_uses_landmark_crop() {
        let img = gradient(2000, 1500);
        let detector = FixedDetector(Some(face_at(1000.0, 700.0, 400.0)));
        let (out, strategy) = select_crop(&img, &TWO_INCH, true, Some(&detector));
        assert_eq!(strategy, CropStrategy::Landmark);
        // crop_height = 400 / 0.55 ≈ 727
        assert!((out.height() as i64 - 727).abs() <= 1, "{}", out.height());
    }

    #[test]
    fn degenerate_landmarks_fall_back_to_center_fit() {
        let img = gradient(800, 600);
        let mut lm = face_at(400.0, 300.0, 200.0);
        lm.chin.y = 0.0; // chin above head top
        let detector = FixedDetector(Some(lm));
        let (_, strategy) = select_crop(&img, &TWO_INCH, true, Some(&detector));
        assert_eq!(strategy, CropStrategy::CenterFit);
    }

    #[test]
    fn undecodable_input_yields_placeholder_artifact() {
        let result =
            compose_pipeline(b"not an image", &TWO_INCH, false, false, None, 300, None).unwrap();
        assert_eq!((result.width, result.height), (413, 626));
        assert!(result.advisories.contains(&Advisory::DecodeFallback));
        assert_eq!(&result.data[0..2], &[0xFF, 0xD8]);
    }
}
