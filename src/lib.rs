//! Identity photo composition: landmark-driven cropping, canvas
//! normalization, and size-constrained JPEG delivery.
//!
//! Turns an arbitrary portrait into a regulation-compliant ID photo: the
//! face fills the preset's head-height band, the eyes sit on its eye line,
//! the output is pixel-exact to the preset's dimensions, carries a DPI tag,
//! and optionally fits a byte budget. Landmark detection is pluggable; when
//! it is unavailable or fails, composition degrades to a center-fit canvas
//! rather than an error.
//!
//! # Example
//!
//! ```no_run
//! use idcompose::PhotoComposer;
//!
//! let raw_bytes = std::fs::read("portrait.jpg").unwrap();
//! let photo = PhotoComposer::new(raw_bytes)
//!     .preset("2inch")
//!     .max_bytes(200 * 1024)
//!     .compose()
//!     .unwrap();
//! println!("{} bytes at quality {}", photo.data.len(), photo.quality);
//! ```
#![warn(missing_docs)]

mod advisor;
mod canvas;
mod encode;
mod error;
/// Crop geometry: anchors to a source-space crop rectangle.
pub mod geometry;
/// JFIF density (DPI) tagging for JPEG artifacts.
pub mod jfif;
/// Landmark detection traits and the anchor adapter.
pub mod landmarks;
mod pipeline;
/// Composition rules and output presets.
pub mod rules;

/// Error type returned by composition operations.
pub use error::ComposeError;
/// Crop calculator types.
pub use geometry::{compute_crop, CropError, CropRect};
/// Landmark types and the detector trait.
pub use landmarks::{Anchors, CoordSpace, FaceLandmarks, LandmarkDetector, Point};
/// Rule model.
pub use rules::CompositionRule;

/// Which stage of the fallback chain produced the delivered framing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CropStrategy {
    /// Landmark-based composition crop.
    Landmark,
    /// Whole source scaled to fit, centered on a white canvas.
    CenterFit,
    /// Source left unframed (composition disabled by policy).
    PassThrough,
}

/// Non-fatal diagnostics surfaced alongside a successful result.
#[derive(Debug, Clone, PartialEq)]
pub enum Advisory {
    /// Source resolution is below the rule's recommended minimum.
    LowResolution {
        /// Source width in pixels.
        width: u32,
        /// Source height in pixels.
        height: u32,
    },
    /// Source measured soft and an unsharp-mask pass was applied.
    LowSharpness {
        /// Measured Laplacian variance.
        variance: f64,
    },
    /// Input could not be decoded; the neutral placeholder was delivered.
    DecodeFallback,
}

/// Result of a single composition operation.
#[derive(Debug, Clone)]
pub struct ComposedPhoto {
    /// Final JPEG bytes, DPI density tag included.
    pub data: Vec<u8>,

    /// Output width in pixels; always the rule's target width.
    pub width: u32,

    /// Output height in pixels; always the rule's target height.
    pub height: u32,

    /// DPI stamped into the artifact.
    pub dpi: u16,

    /// JPEG quality level used.
    pub quality: u8,

    /// `Some(true)` if a byte budget was set and met, `Some(false)` if the
    /// quality ladder was exhausted, `None` when no budget was requested.
    pub within_budget: Option<bool>,

    /// Fallback stage that produced the framing.
    pub strategy: CropStrategy,

    /// Advisory diagnostics collected during processing.
    pub advisories: Vec<Advisory>,

    /// Size of the original input in bytes.
    pub original_size: usize,
}

/// Builder for composing identity photos.
///
/// Carries the caller's policy: which preset (or custom rule) to deliver,
/// whether composition and sharpness enhancement run, the byte budget, the
/// DPI override, and the landmark detector to consume.
pub struct PhotoComposer {
    input: Vec<u8>,
    preset: String,
    rule: Option<CompositionRule>,
    composition: bool,
    sharpness_enhancement: bool,
    max_bytes: Option<usize>,
    dpi: Option<u16>,
    detector: Option<Box<dyn LandmarkDetector>>,
}

impl PhotoComposer {
    /// Create a composer from raw image bytes (JPEG, PNG, or WebP).
    ///
    /// Input is not validated here: undecodable bytes still produce an
    /// artifact, a neutral placeholder at the preset's size, flagged with
    /// [`Advisory::DecodeFallback`].
    pub fn new(input: Vec<u8>) -> Self {
        Self {
            input,
            preset: rules::DEFAULT_PRESET.to_string(),
            rule: None,
            composition: false,
            sharpness_enhancement: false,
            max_bytes: None,
            dpi: None,
            detector: None,
        }
    }

    /// Select an output preset by key (default: `"2inch"`). Unknown keys
    /// fall back to the default preset.
    pub fn preset(mut self, key: impl Into<String>) -> Self {
        self.preset = key.into();
        self
    }

    /// Supply a custom composition rule, overriding the preset lookup.
    /// The rule is validated when [`compose`](Self::compose) runs.
    pub fn rule(mut self, rule: CompositionRule) -> Self {
        self.rule = Some(rule);
        self
    }

    /// Enable or disable landmark-based composition (default: disabled).
    ///
    /// When disabled the source framing is kept as is. When enabled, a
    /// failed or unavailable detection falls back to a center-fit canvas.
    pub fn composition(mut self, enable: bool) -> Self {
        self.composition = enable;
        self
    }

    /// Enable or disable the automatic sharpness enhancement pass
    /// (default: disabled).
    pub fn sharpness_enhancement(mut self, enable: bool) -> Self {
        self.sharpness_enhancement = enable;
        self
    }

    /// Set a best-effort byte budget for the encoded artifact.
    ///
    /// The encoder descends a quality ladder until the budget is met; an
    /// unmet budget is reported via [`ComposedPhoto::within_budget`], never
    /// as an error.
    pub fn max_bytes(mut self, max_bytes: usize) -> Self {
        self.max_bytes = Some(max_bytes);
        self
    }

    /// Override the DPI stamped into the artifact (default: the rule's DPI).
    pub fn dpi(mut self, dpi: u16) -> Self {
        self.dpi = Some(dpi);
        self
    }

    /// Provide the landmark detector consumed by composition.
    ///
    /// ```no_run
    /// use idcompose::{FaceLandmarks, LandmarkDetector, PhotoComposer};
    ///
    /// struct MyDetector;
    /// impl LandmarkDetector for MyDetector {
    ///     fn detect(&self, rgb: &[u8], width: u32, height: u32) -> Option<FaceLandmarks> {
    ///         // Your detection engine here
    ///         None
    ///     }
    /// }
    ///
    /// let bytes = std::fs::read("portrait.jpg").unwrap();
    /// let photo = PhotoComposer::new(bytes)
    ///     .composition(true)
    ///     .landmark_detector(Box::new(MyDetector))
    ///     .compose()
    ///     .unwrap();
    /// ```
    pub fn landmark_detector(mut self, detector: Box<dyn LandmarkDetector>) -> Self {
        self.detector = Some(detector);
        self
    }

    /// Compose the photo with the configured policy.
    ///
    /// Always yields an artifact of exactly the rule's target dimensions;
    /// the only terminal failure is a twice-failed encode.
    pub fn compose(self) -> Result<ComposedPhoto, ComposeError> {
        let rule = match self.rule {
            Some(rule) => rule,
            None => rules::preset(&self.preset).clone(),
        };
        rule.validate()?;
        let dpi = self.dpi.unwrap_or(rule.dpi);

        pipeline::compose_pipeline(
            &self.input,
            &rule,
            self.composition,
            self.sharpness_enhancement,
            self.max_bytes,
            dpi,
            self.detector.as_deref(),
        )
    }
}
