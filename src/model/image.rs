//! `Image` and its attached sub-objects.
//!
//! `Image::pixels` is a plain owned `Vec<u8>` allocated by the
//! [`Driver`](crate::driver::Driver); callers who want a genuinely
//! zero-copy view get one through the `probe()`/fast-path PNM lane instead
//! of through this type. See DESIGN.md, "Pixel ownership".

use crate::error::Status;
use crate::model::metadata::MetaData;
use crate::model::pixel_format::PixelFormat;
use crate::variant::Properties;

/// 8 EXIF-style orientation values.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Orientation {
    #[default]
    Normal,
    Rotated90,
    Rotated180,
    Rotated270,
    MirroredHorizontal,
    MirroredVertical,
    MirroredHorizontalRotated90,
    MirroredHorizontalRotated270,
}

/// Physical resolution unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ResolutionUnit {
    #[default]
    Unknown,
    Micrometer,
    Centimeter,
    Meter,
    Inch,
}

/// Physical resolution attached to an image.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct Resolution {
    pub x: f64,
    pub y: f64,
    pub unit: ResolutionUnit,
}

/// An opaque ICC color profile, plus its human-readable name.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct IccProfile {
    pub data: Vec<u8>,
    pub name: String,
}

/// A palette attached to an indexed image.
#[derive(Clone, Debug, PartialEq)]
pub struct Palette {
    /// Typically [`PixelFormat::Bpp24Rgb`] or [`PixelFormat::Bpp32Rgba`].
    pub pixel_format: PixelFormat,
    pub data: Vec<u8>,
}

impl Palette {
    pub fn color_count(&self) -> usize {
        let bpp = self.pixel_format.bits_per_pixel() as usize;
        if bpp == 0 {
            0
        } else {
            self.data.len() * 8 / bpp
        }
    }

    /// The default two-entry white/black palette auto-attached to 1-bit
    /// monochrome images: index 0 = white, index 1 = black, matching the
    /// PBM/PSD-bitmap convention that a set bit is black.
    pub fn default_monochrome() -> Self {
        Self {
            pixel_format: PixelFormat::Bpp24Rgb,
            data: vec![255, 255, 255, 0, 0, 0],
        }
    }
}

/// Broad compression enumeration shared across codecs that support more
/// than one compression scheme (GIF/LZW, PSD RLE, TIFF's wide set, PNG
/// Deflate, OpenEXR's zip/piz/dwa family, …). Individual codecs accept only
/// a subset; each codec's `SaveFeatures::accepted_compressions` names its
/// own accepted set.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Compression {
    #[default]
    None,
    Rle,
    Lzw,
    Deflate,
    AdobeDeflate,
    PackBits,
    Jpeg,
    Webp,
    Zstd,
    CcittRle,
    CcittFax3,
    CcittFax4,
    // OpenEXR family.
    ExrZips,
    ExrZip,
    ExrPiz,
    ExrPxr24,
    ExrB44,
    ExrB44a,
    ExrDwaa,
    ExrDwab,
}

/// Provenance of a decoded image, preserved when `preserve_source_image` is
/// requested in [`LoadOptions`](crate::codec::LoadOptions).
#[derive(Clone, Debug, PartialEq, Default)]
pub struct SourceImage {
    pub pixel_format: PixelFormat,
    pub compression: Compression,
    pub chroma_subsampling: Option<String>,
    pub interlaced: bool,
}

/// A decoded or to-be-encoded image: pixels plus the full metadata graph.
#[derive(Clone, Debug)]
pub struct Image {
    pub width: u32,
    pub height: u32,
    pub pixel_format: PixelFormat,
    /// Scanline stride in bytes; `>= pixel_format.min_bytes_per_line(width)`.
    pub bytes_per_line: u32,
    pub pixels: Vec<u8>,
    pub gamma: f64,
    /// `-1` for a static image, `>= 0` for an animation frame's delay in ms.
    pub delay_ms: i64,
    pub orientation: Orientation,
    pub palette: Option<Palette>,
    pub icc_profile: Option<IccProfile>,
    pub resolution: Option<Resolution>,
    pub source_image: Option<SourceImage>,
    pub meta_data: Vec<MetaData>,
    pub special_properties: Properties,
}

impl Image {
    /// Allocate an image skeleton (no pixel buffer yet) — what
    /// `load_seek_next_frame` returns.
    pub fn skeleton(width: u32, height: u32, pixel_format: PixelFormat) -> Self {
        let bytes_per_line = pixel_format.min_bytes_per_line(width);
        Self {
            width,
            height,
            pixel_format,
            bytes_per_line,
            pixels: Vec::new(),
            gamma: 1.0,
            delay_ms: -1,
            orientation: Orientation::Normal,
            palette: None,
            icc_profile: None,
            resolution: None,
            source_image: None,
            meta_data: Vec::new(),
            special_properties: Properties::new(),
        }
    }

    /// Allocate the pixel buffer for this skeleton (`bytes_per_line * height`
    /// zero-filled bytes), as the driver does between `seek_next_frame` and
    /// `frame`.
    pub fn allocate_pixels(&mut self) {
        let size = self.bytes_per_line as usize * self.height as usize;
        self.pixels = vec![0u8; size];
    }

    /// Check the invariants that don't require a palette lookup
    /// (palette-range checking is `check_indexed_pixels`).
    pub fn validate(&self) -> Result<(), Status> {
        if self.width == 0 || self.height == 0 {
            return Err(Status::InvalidImageDimensions {
                width: self.width,
                height: self.height,
            });
        }
        let min_stride = self.pixel_format.min_bytes_per_line(self.width);
        if self.bytes_per_line < min_stride {
            return Err(Status::InvalidBytesPerLine {
                bytes_per_line: self.bytes_per_line,
                width: self.width,
            });
        }
        let expected = self.bytes_per_line as usize * self.height as usize;
        if self.pixels.len() != expected {
            return Err(Status::InvalidImage(format!(
                "pixel buffer is {} bytes, expected {expected} (bytes_per_line {} x height {})",
                self.pixels.len(),
                self.bytes_per_line,
                self.height
            )));
        }
        if self.pixel_format.is_indexed() && self.palette.is_none() {
            return Err(Status::MissingPalette);
        }
        Ok(())
    }

    /// Check every indexed pixel addresses a valid palette entry. Only
    /// meaningful for 8-bit indexed images; sub-byte indexed formats are
    /// checked by the codec that packs them.
    pub fn check_indexed_pixels_bpp8(&self) -> Result<(), Status> {
        if self.pixel_format != PixelFormat::Bpp8Indexed {
            return Ok(());
        }
        let Some(palette) = &self.palette else {
            return Err(Status::MissingPalette);
        };
        let count = palette.color_count();
        for row in self.pixels.chunks(self.bytes_per_line as usize) {
            for &idx in &row[..self.width as usize] {
                if idx as usize >= count {
                    return Err(Status::InvalidImage(format!(
                        "palette index {idx} out of range (palette has {count} colors)"
                    )));
                }
            }
        }
        Ok(())
    }

    /// Row-major scanline accessor, respecting `bytes_per_line`.
    pub fn row(&self, y: u32) -> &[u8] {
        let stride = self.bytes_per_line as usize;
        let start = y as usize * stride;
        &self.pixels[start..start + stride]
    }

    pub fn row_mut(&mut self, y: u32) -> &mut [u8] {
        let stride = self.bytes_per_line as usize;
        let start = y as usize * stride;
        &mut self.pixels[start..start + stride]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_indexed_image_without_a_palette_passes_the_indexed_check() {
        let mut image = Image::skeleton(2, 2, PixelFormat::Bpp24Rgb);
        image.allocate_pixels();
        assert!(image.check_indexed_pixels_bpp8().is_ok());
    }

    #[test]
    fn bpp8_indexed_image_without_a_palette_is_rejected() {
        let mut image = Image::skeleton(2, 2, PixelFormat::Bpp8Indexed);
        image.allocate_pixels();
        assert!(matches!(image.check_indexed_pixels_bpp8(), Err(Status::MissingPalette)));
    }

    #[test]
    fn bpp8_indexed_pixel_past_the_palette_end_is_rejected() {
        let mut image = Image::skeleton(1, 1, PixelFormat::Bpp8Indexed);
        image.allocate_pixels();
        image.palette = Some(Palette::default_monochrome());
        image.pixels[0] = 5;
        assert!(image.check_indexed_pixels_bpp8().is_err());
    }

    #[test]
    fn zero_width_image_fails_validation() {
        let image = Image::skeleton(0, 4, PixelFormat::Bpp24Rgb);
        assert!(matches!(image.validate(), Err(Status::InvalidImageDimensions { .. })));
    }
}
