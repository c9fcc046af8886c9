//! Crop geometry: from face anchors to a source-space crop rectangle.
//!
//! The calculator sizes the crop so the face fills the rule's target
//! head-height ratio, positions it so the eyes sit on the rule's eye line,
//! and centers it horizontally on the face with a minimum lateral margin.
//! It only ever selects a sub-rectangle of the source; aspect and resolution
//! reconciliation happen later in the canvas normalizer.

use thiserror::Error;

use crate::landmarks::Anchors;
use crate::rules::CompositionRule;

/// Eye-line estimate used when the detector provides no eyelid points:
/// this far down from head top, as a fraction of face height.
const EYE_FALLBACK_RATIO: f64 = 0.45;

/// Minimum gap between a crop edge and the nearer cheek, as a fraction of
/// crop width.
const LATERAL_MARGIN: f64 = 0.05;

/// Why a landmark-based crop could not be produced. Both variants are
/// recovered by the fallback selector and never surface to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CropError {
    /// The landmarks imply a non-positive face height.
    #[error("face landmarks produced a non-positive face height")]
    DegenerateFace,
    /// The crop rectangle has no overlap with the source image.
    #[error("crop rectangle falls outside the source image")]
    OutOfBounds,
}

/// Integer crop bounds in source pixel space, clamped to the source image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRect {
    /// Left edge, inclusive.
    pub left: u32,
    /// Top edge, inclusive.
    pub top: u32,
    /// Right edge, exclusive.
    pub right: u32,
    /// Bottom edge, exclusive.
    pub bottom: u32,
}

impl CropRect {
    /// Crop width in pixels.
    pub fn width(&self) -> u32 {
        self.right - self.left
    }

    /// Crop height in pixels.
    pub fn height(&self) -> u32 {
        self.bottom - self.top
    }
}

/// Compute the crop rectangle for a face in a `src_w` × `src_h` source.
///
/// The crop height is `face_height / head_ratio_target`, the width follows
/// from the rule's aspect ratio, and the rectangle is placed so the eye line
/// lands at `eye_line_ratio` of the crop height. The lateral margin rule
/// shifts the crop horizontally, never vertically and never by resizing:
/// the left edge is checked first, then the right edge, which wins when a
/// face is too wide for both margins to hold.
pub fn compute_crop(
    anchors: &Anchors,
    src_w: u32,
    src_h: u32,
    rule: &CompositionRule,
) -> Result<CropRect, CropError> {
    let face_height = anchors.face_height();
    if face_height <= 0.0 {
        return Err(CropError::DegenerateFace);
    }
    let head_top_y = anchors.head_top_y();

    let crop_height = face_height / rule.head_ratio_target();
    let crop_width = crop_height * rule.aspect_ratio();

    let eye_y = anchors
        .eye_y
        .unwrap_or(head_top_y + EYE_FALLBACK_RATIO * face_height);

    let crop_top = eye_y - rule.eye_line_ratio * crop_height;
    let crop_bottom = crop_top + crop_height;

    let face_left = anchors.face_left_x();
    let face_right = anchors.face_right_x();
    let min_side = LATERAL_MARGIN * crop_width;

    let mut crop_left = anchors.face_center_x() - crop_width / 2.0;
    let mut crop_right = crop_left + crop_width;

    if face_left - crop_left < min_side {
        let shift = min_side - (face_left - crop_left);
        crop_left -= shift;
        crop_right -= shift;
    }
    if crop_right - face_right < min_side {
        let shift = min_side - (crop_right - face_right);
        crop_left += shift;
        crop_right += shift;
    }

    // Intersect the rounded rectangle with the source bounds.
    let left = (crop_left.round() as i64).max(0);
    let top = (crop_top.round() as i64).max(0);
    let right = (crop_right.round() as i64).min(src_w as i64);
    let bottom = (crop_bottom.round() as i64).min(src_h as i64);

    if right <= left || bottom <= top {
        return Err(CropError::OutOfBounds);
    }

    Ok(CropRect {
        left: left as u32,
        top: top as u32,
        right: right as u32,
        bottom: bottom as u32,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::landmarks::Point;
    use crate::rules::{CompositionRule, TWO_INCH};
    use approx::assert_relative_eq;

    /// Anchors for a face of `height` px whose vertical extent is centered on
    /// `(cx, cy)`, with cheeks `half_width` either side of the center.
    fn face_anchors(cx: f64, cy: f64, height: f64, half_width: f64) -> Anchors {
        let head_top = cy - height / 2.0;
        Anchors {
            chin: Point::new(cx, cy + height / 2.0),
            brow: Point::new(cx, head_top + 50.0),
            forehead: Point::new(cx, head_top),
            left_cheek: Point::new(cx - half_width, cy),
            right_cheek: Point::new(cx + half_width, cy),
            eye_y: None,
        }
    }

    #[test]
    fn nominal_face_produces_expected_crop() {
        // 4000x3000 source, 2-inch preset, 600 px face centered at (2000, 1400):
        // crop_height = 600 / 0.55 ≈ 1091, crop_width ≈ 1091 * (413/626) ≈ 720.
        let anchors = face_anchors(2000.0, 1400.0, 600.0, 220.0);
        let rect = compute_crop(&anchors, 4000, 3000, &TWO_INCH).unwrap();

        assert!((rect.width() as i64 - 720).abs() <= 1, "width {}", rect.width());
        assert!(
            (rect.height() as i64 - 1091).abs() <= 1,
            "height {}",
            rect.height()
        );
        // Eye fallback: 1100 + 0.45*600 = 1370; top = 1370 - 0.45*1091 ≈ 879.
        assert!((rect.top as i64 - 879).abs() <= 1, "top {}", rect.top);
    }

    #[test]
    fn head_ratio_lands_in_band() {
        // When nothing clamps, face_height / crop_height must hit the band
        // midpoint within 1%.
        for face_height in [300.0, 600.0, 900.0] {
            let anchors = face_anchors(2000.0, 1500.0, face_height, face_height * 0.35);
            let rect = compute_crop(&anchors, 4000, 3000, &TWO_INCH).unwrap();
            let ratio = face_height / rect.height() as f64;
            assert!(
                ratio >= TWO_INCH.head_ratio_min && ratio <= TWO_INCH.head_ratio_max,
                "ratio {ratio} outside band for face_height {face_height}"
            );
            assert_relative_eq!(ratio, TWO_INCH.head_ratio_target(), max_relative = 0.01);
        }
    }

    #[test]
    fn eye_anchor_overrides_geometric_fallback() {
        let mut anchors = face_anchors(2000.0, 1400.0, 600.0, 220.0);
        anchors.eye_y = Some(1300.0);
        let rect = compute_crop(&anchors, 4000, 3000, &TWO_INCH).unwrap();
        // top = 1300 - 0.45 * 1090.9 ≈ 809
        assert!((rect.top as i64 - 809).abs() <= 1, "top {}", rect.top);
    }

    #[test]
    fn degenerate_face_rejected() {
        let mut anchors = face_anchors(2000.0, 1400.0, 600.0, 220.0);
        // Chin above the head top.
        anchors.chin.y = anchors.head_top_y() - 10.0;
        assert_eq!(
            compute_crop(&anchors, 4000, 3000, &TWO_INCH),
            Err(CropError::DegenerateFace)
        );
    }

    #[test]
    fn crop_fully_outside_source_rejected() {
        // Face entirely above the frame: the whole crop lands at negative y.
        let anchors = face_anchors(2000.0, -1800.0, 600.0, 220.0);
        assert_eq!(
            compute_crop(&anchors, 4000, 3000, &TWO_INCH),
            Err(CropError::OutOfBounds)
        );
    }

    #[test]
    fn lateral_margin_shifts_crop_without_resizing() {
        // Cheeks at 300 and 1000: the initial crop leaves less than 5% margin
        // on the left, shifting left; that breaks the right margin, which
        // shifts back right and wins.
        let anchors = Anchors {
            chin: Point::new(650.0, 1700.0),
            brow: Point::new(650.0, 1150.0),
            forehead: Point::new(650.0, 1100.0),
            left_cheek: Point::new(300.0, 1400.0),
            right_cheek: Point::new(1000.0, 1400.0),
            eye_y: None,
        };
        let rect = compute_crop(&anchors, 4000, 3000, &TWO_INCH).unwrap();
        // crop_width ≈ 719.7, min_side ≈ 36: right edge ends up at
        // face_right + min_side ≈ 1036, left at ≈ 316.
        assert!((rect.right as i64 - 1036).abs() <= 1, "right {}", rect.right);
        assert!((rect.left as i64 - 316).abs() <= 1, "left {}", rect.left);
        assert!((rect.width() as i64 - 720).abs() <= 1);
    }

    #[test]
    fn crop_clamps_to_source_bounds() {
        // Face near the top-left corner: the ideal crop extends past both
        // the top and left edges and gets intersected away.
        let anchors = face_anchors(200.0, 300.0, 400.0, 150.0);
        let rect = compute_crop(&anchors, 1000, 800, &TWO_INCH).unwrap();
        assert_eq!(rect.top, 0);
        assert!(rect.right <= 1000);
        assert!(rect.bottom <= 800);
        assert!(rect.width() > 0 && rect.height() > 0);
    }

    #[test]
    fn custom_rule_drives_crop_size() {
        let rule = CompositionRule {
            target_w: 100,
            target_h: 100,
            head_ratio_min: 0.5,
            head_ratio_max: 0.5,
            ..TWO_INCH
        };
        let anchors = face_anchors(2000.0, 1500.0, 500.0, 175.0);
        let rect = compute_crop(&anchors, 4000, 3000, &rule).unwrap();
        // Square aspect: crop is 1000 x 1000.
        assert!((rect.width() as i64 - 1000).abs() <= 1);
        assert!((rect.height() as i64 - 1000).abs() <= 1);
    }
}
