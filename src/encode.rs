//! Size-constrained JPEG encoding.
//!
//! Without a byte budget the normalized image is encoded once at fixed high
//! quality. With a budget, a descending quality ladder is walked and the
//! first rung that fits wins; an exhausted ladder returns the lowest-quality
//! result rather than failing. Every rung gets the DPI density tag stamped.

use image::codecs::jpeg::JpegEncoder;
use image::{ExtendedColorType, ImageEncoder, RgbImage};
use tracing::debug;

use crate::error::ComposeError;
use crate::jfif;

/// Quality used when no byte budget is set.
const FIXED_QUALITY: u8 = 95;

/// Descending quality rungs tried under a byte budget.
const QUALITY_LADDER: [u8; 8] = [95, 90, 85, 80, 75, 70, 65, 60];

/// One encoded JPEG plus the parameters that produced it.
pub(crate) struct EncodedJpeg {
    /// Final artifact bytes, density tag included.
    pub data: Vec<u8>,
    /// Quality rung used.
    pub quality: u8,
    /// `Some(true)` if a budget was set and met, `Some(false)` if the ladder
    /// was exhausted, `None` when no budget was requested.
    pub within_budget: Option<bool>,
}

/// Encode at one quality level and stamp the density tag.
fn encode_jpeg(image: &RgbImage, quality: u8, dpi: u16) -> Result<Vec<u8>, ComposeError> {
    let mut buffer = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut buffer, quality);
    encoder
        .write_image(
            image.as_raw(),
            image.width(),
            image.height(),
            ExtendedColorType::Rgb8,
        )
        .map_err(|e| ComposeError::Encode(e.to_string()))?;
    Ok(jfif::stamp_density(&buffer, dpi))
}

/// Encode within an optional byte budget.
///
/// The budget is best-effort: when even the lowest rung exceeds it, the
/// lowest-quality result is returned with `within_budget = Some(false)`.
pub(crate) fn encode_with_budget(
    image: &RgbImage,
    max_bytes: Option<usize>,
    dpi: u16,
) -> Result<EncodedJpeg, ComposeError> {
    let Some(budget) = max_bytes else {
        let data = encode_jpeg(image, FIXED_QUALITY, dpi)?;
        return Ok(EncodedJpeg {
            data,
            quality: FIXED_QUALITY,
            within_budget: None,
        });
    };

    let mut data = Vec::new();
    let mut quality = FIXED_QUALITY;
    for &rung in &QUALITY_LADDER {
        data = encode_jpeg(image, rung, dpi)?;
        quality = rung;
        if data.len() <= budget {
            return Ok(EncodedJpeg {
                data,
                quality,
                within_budget: Some(true),
            });
        }
        debug!(
            quality = rung,
            size = data.len(),
            budget,
            "quality rung over budget, descending"
        );
    }

    Ok(EncodedJpeg {
        data,
        quality,
        within_budget: Some(false),
    })
}
