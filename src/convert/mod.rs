//! Pixel-format conversion engine.
//!
//! Two layers: a fast-path table of direct byte-shuffle conversions for
//! common format pairs, and a canonical-RGBA general path that handles
//! everything else.

mod fast_path;
mod general;
pub mod geometry;

use crate::error::Status;
use crate::model::{Image, PixelFormat};

/// Behavior knobs for [`convert`].
#[derive(Clone, Copy, Debug)]
pub struct ConvertOptions {
    pub blend_alpha: bool,
    pub preserve_iccp: bool,
    /// Background composited under the image when `blend_alpha` is set and
    /// the target has no alpha channel. Default `0xFFFFFF` (white).
    pub background: (u8, u8, u8),
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            blend_alpha: false,
            preserve_iccp: true,
            background: (0xFF, 0xFF, 0xFF),
        }
    }
}

/// Convert `image` to `target`, choosing the fast-path table when the
/// `(source, target)` pair is in it, otherwise the general canonical-RGBA
/// path. Indexed targets route through the quantizer (`crate::quantize`).
pub fn convert(image: &Image, target: PixelFormat, options: ConvertOptions) -> Result<Image, Status> {
    if image.pixel_format == target {
        return Ok(image.clone());
    }
    if target.is_indexed() {
        return crate::quantize::quantize(image, target, true);
    }
    let wants_alpha_blend = options.blend_alpha && !target.has_alpha() && image.pixel_format.has_alpha();
    if !wants_alpha_blend {
        if let Some(out) = fast_path::try_convert(image, target) {
            return out;
        }
    }
    general::convert_general(image, target, options)
}

/// Pick the candidate pixel format in `candidates` that most closely
/// matches `from`, by `(channel-family mismatch, bit-depth delta, alpha
/// loss, indexedness change)`.
pub fn closest_pixel_format(from: PixelFormat, candidates: &[PixelFormat]) -> Option<PixelFormat> {
    candidates
        .iter()
        .copied()
        .min_by_key(|&candidate| cost(from, candidate))
}

fn cost(from: PixelFormat, to: PixelFormat) -> (u32, u32, u32, u32) {
    let family_mismatch = u32::from(family(from) != family(to));
    let depth_delta = (from.bits_per_pixel() as i64 - to.bits_per_pixel() as i64).unsigned_abs() as u32;
    let alpha_loss = u32::from(from.has_alpha() && !to.has_alpha());
    let indexed_change = u32::from(from.is_indexed() != to.is_indexed());
    (family_mismatch, depth_delta, alpha_loss, indexed_change)
}

#[derive(PartialEq, Eq)]
enum Family {
    Gray,
    Rgb,
    Other,
}

fn family(format: PixelFormat) -> Family {
    if format.is_grayscale() {
        Family::Gray
    } else if format.is_rgb_family() {
        Family::Rgb
    } else {
        Family::Other
    }
}

pub use geometry::{mirror_horizontal, mirror_vertical, rotate_180, rotate_270, rotate_90};
