//! `PixelFormat`: the closed sum type over every pixel layout this crate
//! moves bytes in.
//!
//! A plain enum with `bytes_per_pixel()`/`channels()` match arms, scaled up
//! to over 80 layouts. A hand-written match arm per variant here would
//! dwarf every other module, so the table is generated once by a
//! declarative macro — still a plain `match` under the hood, just written
//! once as data instead of once per variant as control flow.

/// One row of the pixel-format table: variant name, bits per pixel, channel
/// count, and four classification flags
/// (`is_indexed`, `is_grayscale`, `is_rgb_family`, `is_floating_point`).
macro_rules! pixel_formats {
    ($(($variant:ident, $bpp:expr, $channels:expr, $indexed:expr, $gray:expr, $rgb_family:expr, $float:expr)),* $(,)?) => {
        /// Pixel memory layout. A closed enumeration; every
        /// variant carries an intrinsic bits-per-pixel and channel count.
        #[non_exhaustive]
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
        pub enum PixelFormat {
            Unknown,
            $($variant),*
        }

        impl PixelFormat {
            /// Intrinsic bits per pixel.
            pub fn bits_per_pixel(self) -> u32 {
                match self {
                    PixelFormat::Unknown => 0,
                    $(PixelFormat::$variant => $bpp),*
                }
            }

            /// Channel count (e.g. 3 for RGB, 4 for RGBA).
            pub fn channels(self) -> u32 {
                match self {
                    PixelFormat::Unknown => 0,
                    $(PixelFormat::$variant => $channels),*
                }
            }

            pub fn is_indexed(self) -> bool {
                match self {
                    PixelFormat::Unknown => false,
                    $(PixelFormat::$variant => $indexed),*
                }
            }

            pub fn is_grayscale(self) -> bool {
                match self {
                    PixelFormat::Unknown => false,
                    $(PixelFormat::$variant => $gray),*
                }
            }

            pub fn is_rgb_family(self) -> bool {
                match self {
                    PixelFormat::Unknown => false,
                    $(PixelFormat::$variant => $rgb_family),*
                }
            }

            pub fn is_floating_point(self) -> bool {
                match self {
                    PixelFormat::Unknown => false,
                    $(PixelFormat::$variant => $float),*
                }
            }
        }
    };
}

// (variant, bpp, channels, indexed, grayscale, rgb_family, float)
pixel_formats! {
    // Anonymous bit depths — no implied channel layout.
    (Bpp1,   1,   1, false, false, false, false),
    (Bpp2,   2,   1, false, false, false, false),
    (Bpp4,   4,   1, false, false, false, false),
    (Bpp8,   8,   1, false, false, false, false),
    (Bpp16,  16,  1, false, false, false, false),
    (Bpp24,  24,  1, false, false, false, false),
    (Bpp32,  32,  1, false, false, false, false),
    (Bpp48,  48,  1, false, false, false, false),
    (Bpp64,  64,  1, false, false, false, false),
    (Bpp72,  72,  1, false, false, false, false),
    (Bpp96,  96,  1, false, false, false, false),
    (Bpp128, 128, 1, false, false, false, false),

    // Indexed.
    (Bpp1Indexed,  1,  1, true, false, false, false),
    (Bpp2Indexed,  2,  1, true, false, false, false),
    (Bpp4Indexed,  4,  1, true, false, false, false),
    (Bpp8Indexed,  8,  1, true, false, false, false),
    (Bpp16Indexed, 16, 1, true, false, false, false),

    // Grayscale / grayscale-alpha.
    (Bpp1Grayscale,   1,  1, false, true, false, false),
    (Bpp2Grayscale,   2,  1, false, true, false, false),
    (Bpp4Grayscale,   4,  1, false, true, false, false),
    (Bpp8Grayscale,   8,  1, false, true, false, false),
    (Bpp16Grayscale,  16, 1, false, true, false, false),
    (Bpp8GrayscaleAlpha,  16, 2, false, true, false, false),
    (Bpp16GrayscaleAlpha, 32, 2, false, true, false, false),

    // Packed RGB.
    (Bpp16Rgb555, 16, 3, false, false, true, false),
    (Bpp16Bgr555, 16, 3, false, false, true, false),
    (Bpp16Rgb565, 16, 3, false, false, true, false),
    (Bpp16Bgr565, 16, 3, false, false, true, false),
    (Bpp30Rgb, 30, 3, false, false, true, false),
    (Bpp32Rgba1010102, 32, 4, false, false, true, false),

    // RGB family at 8/16-bit-per-channel, with and without alpha/padding.
    (Bpp24Rgb, 24, 3, false, false, true, false),
    (Bpp24Bgr, 24, 3, false, false, true, false),
    (Bpp32Rgba, 32, 4, false, false, true, false),
    (Bpp32Bgra, 32, 4, false, false, true, false),
    (Bpp32Argb, 32, 4, false, false, true, false),
    (Bpp32Abgr, 32, 4, false, false, true, false),
    (Bpp32Rgbx, 32, 4, false, false, true, false),
    (Bpp32Bgrx, 32, 4, false, false, true, false),
    (Bpp32Xrgb, 32, 4, false, false, true, false),
    (Bpp32Xbgr, 32, 4, false, false, true, false),
    (Bpp48Rgb, 48, 3, false, false, true, false),
    (Bpp48Bgr, 48, 3, false, false, true, false),
    (Bpp64Rgba, 64, 4, false, false, true, false),
    (Bpp64Bgra, 64, 4, false, false, true, false),
    (Bpp64Argb, 64, 4, false, false, true, false),
    (Bpp64Abgr, 64, 4, false, false, true, false),
    (Bpp64Rgbx, 64, 4, false, false, true, false),
    (Bpp64Bgrx, 64, 4, false, false, true, false),
    (Bpp64Xrgb, 64, 4, false, false, true, false),
    (Bpp64Xbgr, 64, 4, false, false, true, false),

    // CMYK family.
    (Bpp32Cmyk, 32, 4, false, false, false, false),
    (Bpp64Cmyk, 64, 4, false, false, false, false),
    (Bpp40Cmyka, 40, 5, false, false, false, false),
    (Bpp80Cmyka, 80, 5, false, false, false, false),

    // YCbCr / YCCK / YUV family.
    (Bpp24Ycbcr, 24, 3, false, false, false, false),
    (Bpp32Ycck, 32, 4, false, false, false, false),
    (Bpp24Yuv, 24, 3, false, false, false, false),
    (Bpp32Yuva, 32, 4, false, false, false, false),
    (Bpp32Ayuv, 32, 4, false, false, false, false),
    (Bpp48Yuv, 48, 3, false, false, false, false),
    (Bpp64Yuva, 64, 4, false, false, false, false),

    // CIE color spaces, with optional alpha.
    (Bpp24Lab, 24, 3, false, false, false, false),
    (Bpp32Laba, 32, 4, false, false, false, false),
    (Bpp24Luv, 24, 3, false, false, false, false),
    (Bpp32Luva, 32, 4, false, false, false, false),
    (Bpp24Xyz, 24, 3, false, false, false, false),
    (Bpp32Xyza, 32, 4, false, false, false, false),
    (Bpp96LabFloat, 96, 3, false, false, false, true),
    (Bpp128LabaFloat, 128, 4, false, false, false, true),

    // HSV / HSL.
    (Bpp24Hsv, 24, 3, false, false, false, false),
    (Bpp24Hsl, 24, 3, false, false, false, false),

    // Floating point, 16-bit half and 32-bit per channel.
    (Bpp16GrayscaleHalf, 16, 1, false, true, false, true),
    (Bpp32GrayscaleFloat, 32, 1, false, true, false, true),
    (Bpp32GrayscaleAlphaHalf, 32, 2, false, true, false, true),
    (Bpp64GrayscaleAlphaFloat, 64, 2, false, true, false, true),
    (Bpp48RgbHalf, 48, 3, false, false, true, true),
    (Bpp96RgbFloat, 96, 3, false, false, true, true),
    (Bpp64RgbaHalf, 64, 4, false, false, true, true),
    (Bpp128RgbaFloat, 128, 4, false, false, true, true),
}

impl Default for PixelFormat {
    fn default() -> Self {
        PixelFormat::Unknown
    }
}

impl PixelFormat {
    /// True for any format whose channel precision exceeds 8 bits.
    pub fn is_16_bit_per_channel(self) -> bool {
        matches!(
            self,
            PixelFormat::Bpp16Grayscale
                | PixelFormat::Bpp16GrayscaleAlpha
                | PixelFormat::Bpp48Rgb
                | PixelFormat::Bpp48Bgr
                | PixelFormat::Bpp64Rgba
                | PixelFormat::Bpp64Bgra
                | PixelFormat::Bpp64Argb
                | PixelFormat::Bpp64Abgr
                | PixelFormat::Bpp64Rgbx
                | PixelFormat::Bpp64Bgrx
                | PixelFormat::Bpp64Xrgb
                | PixelFormat::Bpp64Xbgr
                | PixelFormat::Bpp64Cmyk
                | PixelFormat::Bpp64Yuva
                | PixelFormat::Bpp48Yuv
        )
    }

    /// Whether this format carries an alpha channel.
    pub fn has_alpha(self) -> bool {
        matches!(
            self,
            PixelFormat::Bpp8GrayscaleAlpha
                | PixelFormat::Bpp16GrayscaleAlpha
                | PixelFormat::Bpp32Rgba1010102
                | PixelFormat::Bpp32Rgba
                | PixelFormat::Bpp32Bgra
                | PixelFormat::Bpp32Argb
                | PixelFormat::Bpp32Abgr
                | PixelFormat::Bpp64Rgba
                | PixelFormat::Bpp64Bgra
                | PixelFormat::Bpp64Argb
                | PixelFormat::Bpp64Abgr
                | PixelFormat::Bpp40Cmyka
                | PixelFormat::Bpp80Cmyka
                | PixelFormat::Bpp32Yuva
                | PixelFormat::Bpp32Ayuv
                | PixelFormat::Bpp64Yuva
                | PixelFormat::Bpp32Laba
                | PixelFormat::Bpp32Luva
                | PixelFormat::Bpp32Xyza
                | PixelFormat::Bpp128LabaFloat
                | PixelFormat::Bpp32GrayscaleAlphaHalf
                | PixelFormat::Bpp64GrayscaleAlphaFloat
                | PixelFormat::Bpp64RgbaHalf
                | PixelFormat::Bpp128RgbaFloat
        )
    }

    /// Minimum scanline stride in bytes for `width` pixels of this format:
    /// `ceil(width * bits_per_pixel / 8)`.
    pub fn min_bytes_per_line(self, width: u32) -> u32 {
        let bits = width as u64 * self.bits_per_pixel() as u64;
        ((bits + 7) / 8) as u32
    }
}
