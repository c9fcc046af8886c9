//! Composition rules and output presets.
//!
//! A [`CompositionRule`] bundles everything a delivery preset prescribes:
//! exact output pixel size, the acceptable head-height band, the eye-line
//! position, the print resolution tag, and the advisory threshold for
//! low-resolution sources. Presets are looked up by key; unknown keys fall
//! back to the default 2-inch preset.

use tracing::warn;

use crate::error::ComposeError;

/// Head-height band shared by the standard photo sizes: the face (head top to
/// chin) should fill 50–60% of the output frame height.
const HEAD_RATIO_RANGE: (f64, f64) = (0.50, 0.60);

/// Eye line at 45% of the frame height from the top.
const EYE_LINE_RATIO: f64 = 0.45;

/// Print resolution for compliant deliveries.
const PRINT_DPI: u16 = 300;

/// Sources with a short edge below this trigger a low-resolution advisory.
const MIN_SHORT_EDGE: u32 = 500;

/// Per-preset composition and delivery parameters.
///
/// Immutable configuration; one instance per output preset. Custom rules can
/// be built with struct literal syntax and passed to
/// [`crate::PhotoComposer::rule`]; they are validated when composition runs.
#[derive(Debug, Clone, PartialEq)]
pub struct CompositionRule {
    /// Output width in pixels.
    pub target_w: u32,
    /// Output height in pixels.
    pub target_h: u32,
    /// Lower bound of the acceptable head-height ratio.
    pub head_ratio_min: f64,
    /// Upper bound of the acceptable head-height ratio.
    pub head_ratio_max: f64,
    /// Vertical eye position as a fraction of frame height from the top.
    pub eye_line_ratio: f64,
    /// Resolution tag stamped into the delivered artifact.
    pub dpi: u16,
    /// Minimum source short edge before a low-resolution advisory is raised.
    pub min_short_edge: u32,
}

/// 1-inch print size, 295 × 413 px at 300 DPI.
pub const ONE_INCH: CompositionRule = CompositionRule {
    target_w: 295,
    target_h: 413,
    head_ratio_min: HEAD_RATIO_RANGE.0,
    head_ratio_max: HEAD_RATIO_RANGE.1,
    eye_line_ratio: EYE_LINE_RATIO,
    dpi: PRINT_DPI,
    min_short_edge: MIN_SHORT_EDGE,
};

/// 2-inch print size, 413 × 626 px at 300 DPI. The default preset.
pub const TWO_INCH: CompositionRule = CompositionRule {
    target_w: 413,
    target_h: 626,
    head_ratio_min: HEAD_RATIO_RANGE.0,
    head_ratio_max: HEAD_RATIO_RANGE.1,
    eye_line_ratio: EYE_LINE_RATIO,
    dpi: PRINT_DPI,
    min_short_edge: MIN_SHORT_EDGE,
};

/// Key of the preset used when a lookup key is unknown.
pub const DEFAULT_PRESET: &str = "2inch";

/// Look up a preset rule by key, falling back to the 2-inch default for
/// unknown keys.
pub fn preset(key: &str) -> &'static CompositionRule {
    match key {
        "1inch" => &ONE_INCH,
        "2inch" => &TWO_INCH,
        other => {
            warn!(preset = other, "unknown preset key, using {DEFAULT_PRESET}");
            &TWO_INCH
        }
    }
}

impl CompositionRule {
    /// Midpoint of the head-height band, the value the crop geometry aims for.
    pub fn head_ratio_target(&self) -> f64 {
        (self.head_ratio_min + self.head_ratio_max) / 2.0
    }

    /// Output aspect ratio (width / height).
    pub fn aspect_ratio(&self) -> f64 {
        self.target_w as f64 / self.target_h as f64
    }

    /// Recommended minimum source area: the output pixel count.
    pub fn min_area(&self) -> u64 {
        self.target_w as u64 * self.target_h as u64
    }

    /// Check the rule invariants.
    pub fn validate(&self) -> Result<(), ComposeError> {
        if self.target_w == 0 || self.target_h == 0 {
            return Err(ComposeError::InvalidRule(
                "target dimensions must be > 0".into(),
            ));
        }
        if !(self.head_ratio_min > 0.0
            && self.head_ratio_min <= self.head_ratio_max
            && self.head_ratio_max < 1.0)
        {
            return Err(ComposeError::InvalidRule(format!(
                "head ratio range must satisfy 0 < min <= max < 1, got {}..{}",
                self.head_ratio_min, self.head_ratio_max
            )));
        }
        if !(self.eye_line_ratio > 0.0 && self.eye_line_ratio < 1.0) {
            return Err(ComposeError::InvalidRule(format!(
                "eye line ratio must be in (0, 1), got {}",
                self.eye_line_ratio
            )));
        }
        Ok(())
    }
}
