//! The general conversion path: decode every source pixel to a canonical
//! RGBA intermediate, then encode into the target format.
//!
//! Canonical RGBA is `(f64, f64, f64, f64)` in `[0, 1]` — wide enough to
//! losslessly round-trip every format this crate supports (8/16-bit
//! integer and half/float), unlike a fixed 64-bit-RGBA intermediate which
//! would clip HDR float content.

use crate::convert::ConvertOptions;
use crate::error::Status;
use crate::model::{Image, PixelFormat};

type Rgba = (f64, f64, f64, f64);

pub fn convert_general(image: &Image, target: PixelFormat, options: ConvertOptions) -> Result<Image, Status> {
    let mut out = Image::skeleton(image.width, image.height, target);
    out.allocate_pixels();

    let in_bpp = (image.pixel_format.bits_per_pixel() as usize + 7) / 8;
    let out_bpp = (target.bits_per_pixel() as usize + 7) / 8;
    let width = image.width as usize;

    for y in 0..image.height {
        let src_row = image.row(y);
        let dst_row = out.row_mut(y);
        for x in 0..width {
            let src_px = &src_row[x * in_bpp..x * in_bpp + in_bpp];
            let mut rgba = decode_pixel(src_px, image.pixel_format)?;
            if options.blend_alpha && !target.has_alpha() && image.pixel_format.has_alpha() {
                rgba = blend_over(rgba, options.background);
            }
            let dst_px = &mut dst_row[x * out_bpp..x * out_bpp + out_bpp];
            encode_pixel(rgba, dst_px, target)?;
        }
    }

    if options.preserve_iccp {
        out.icc_profile = image.icc_profile.clone();
    }
    out.orientation = image.orientation;
    out.gamma = image.gamma;
    out.delay_ms = image.delay_ms;
    out.resolution = image.resolution.clone();
    out.meta_data = image.meta_data.clone();
    out.special_properties = image.special_properties.clone();
    Ok(out)
}

fn blend_over(rgba: Rgba, background: (u8, u8, u8)) -> Rgba {
    let (r, g, b, a) = rgba;
    let (br, bg, bb) = (
        background.0 as f64 / 255.0,
        background.1 as f64 / 255.0,
        background.2 as f64 / 255.0,
    );
    (
        r * a + br * (1.0 - a),
        g * a + bg * (1.0 - a),
        b * a + bb * (1.0 - a),
        1.0,
    )
}

fn decode_pixel(src: &[u8], format: PixelFormat) -> Result<Rgba, Status> {
    use PixelFormat::*;
    Ok(match format {
        Bpp1Grayscale | Bpp2Grayscale | Bpp4Grayscale | Bpp8Grayscale => {
            let v = src[0] as f64 / 255.0;
            (v, v, v, 1.0)
        }
        Bpp16Grayscale => {
            let v = u16::from_be_bytes([src[0], src[1]]) as f64 / 65535.0;
            (v, v, v, 1.0)
        }
        Bpp8GrayscaleAlpha => {
            let v = src[0] as f64 / 255.0;
            (v, v, v, src[1] as f64 / 255.0)
        }
        Bpp16GrayscaleAlpha => {
            let v = u16::from_be_bytes([src[0], src[1]]) as f64 / 65535.0;
            let a = u16::from_be_bytes([src[2], src[3]]) as f64 / 65535.0;
            (v, v, v, a)
        }
        Bpp24Rgb => (
            src[0] as f64 / 255.0,
            src[1] as f64 / 255.0,
            src[2] as f64 / 255.0,
            1.0,
        ),
        Bpp24Bgr => (
            src[2] as f64 / 255.0,
            src[1] as f64 / 255.0,
            src[0] as f64 / 255.0,
            1.0,
        ),
        Bpp32Rgba => (
            src[0] as f64 / 255.0,
            src[1] as f64 / 255.0,
            src[2] as f64 / 255.0,
            src[3] as f64 / 255.0,
        ),
        Bpp32Bgra => (
            src[2] as f64 / 255.0,
            src[1] as f64 / 255.0,
            src[0] as f64 / 255.0,
            src[3] as f64 / 255.0,
        ),
        Bpp32Argb => (
            src[1] as f64 / 255.0,
            src[2] as f64 / 255.0,
            src[3] as f64 / 255.0,
            src[0] as f64 / 255.0,
        ),
        Bpp32Abgr => (
            src[3] as f64 / 255.0,
            src[2] as f64 / 255.0,
            src[1] as f64 / 255.0,
            src[0] as f64 / 255.0,
        ),
        Bpp32Rgbx | Bpp32Xrgb => {
            let (r, g, b) = if format == Bpp32Rgbx {
                (src[0], src[1], src[2])
            } else {
                (src[1], src[2], src[3])
            };
            (r as f64 / 255.0, g as f64 / 255.0, b as f64 / 255.0, 1.0)
        }
        Bpp32Bgrx | Bpp32Xbgr => {
            let (b, g, r) = if format == Bpp32Bgrx {
                (src[0], src[1], src[2])
            } else {
                (src[1], src[2], src[3])
            };
            (r as f64 / 255.0, g as f64 / 255.0, b as f64 / 255.0, 1.0)
        }
        Bpp48Rgb => (
            u16::from_be_bytes([src[0], src[1]]) as f64 / 65535.0,
            u16::from_be_bytes([src[2], src[3]]) as f64 / 65535.0,
            u16::from_be_bytes([src[4], src[5]]) as f64 / 65535.0,
            1.0,
        ),
        Bpp48Bgr => (
            u16::from_be_bytes([src[4], src[5]]) as f64 / 65535.0,
            u16::from_be_bytes([src[2], src[3]]) as f64 / 65535.0,
            u16::from_be_bytes([src[0], src[1]]) as f64 / 65535.0,
            1.0,
        ),
        Bpp64Rgba => (
            u16::from_be_bytes([src[0], src[1]]) as f64 / 65535.0,
            u16::from_be_bytes([src[2], src[3]]) as f64 / 65535.0,
            u16::from_be_bytes([src[4], src[5]]) as f64 / 65535.0,
            u16::from_be_bytes([src[6], src[7]]) as f64 / 65535.0,
        ),
        Bpp64Bgra => (
            u16::from_be_bytes([src[4], src[5]]) as f64 / 65535.0,
            u16::from_be_bytes([src[2], src[3]]) as f64 / 65535.0,
            u16::from_be_bytes([src[0], src[1]]) as f64 / 65535.0,
            u16::from_be_bytes([src[6], src[7]]) as f64 / 65535.0,
        ),
        Bpp64Rgbx | Bpp64Xrgb => {
            let (r, g, b) = if format == Bpp64Rgbx {
                (
                    u16::from_be_bytes([src[0], src[1]]),
                    u16::from_be_bytes([src[2], src[3]]),
                    u16::from_be_bytes([src[4], src[5]]),
                )
            } else {
                (
                    u16::from_be_bytes([src[2], src[3]]),
                    u16::from_be_bytes([src[4], src[5]]),
                    u16::from_be_bytes([src[6], src[7]]),
                )
            };
            (r as f64 / 65535.0, g as f64 / 65535.0, b as f64 / 65535.0, 1.0)
        }
        Bpp64Bgrx | Bpp64Xbgr => {
            let (b, g, r) = if format == Bpp64Bgrx {
                (
                    u16::from_be_bytes([src[0], src[1]]),
                    u16::from_be_bytes([src[2], src[3]]),
                    u16::from_be_bytes([src[4], src[5]]),
                )
            } else {
                (
                    u16::from_be_bytes([src[2], src[3]]),
                    u16::from_be_bytes([src[4], src[5]]),
                    u16::from_be_bytes([src[6], src[7]]),
                )
            };
            (r as f64 / 65535.0, g as f64 / 65535.0, b as f64 / 65535.0, 1.0)
        }
        Bpp32Cmyk => cmyk_to_rgba(src[0], src[1], src[2], src[3], 255),
        Bpp40Cmyka => {
            let (r, g, b, _a) = cmyk_to_rgba(src[0], src[1], src[2], src[3], 255);
            (r, g, b, src[4] as f64 / 255.0)
        }
        Bpp24Ycbcr => {
            let (r, g, b) = ycbcr_to_rgb(src[0], src[1], src[2]);
            (r, g, b, 1.0)
        }
        Bpp24Lab => {
            let (l, a, b) = lab_bytes_to_components(src[0], src[1], src[2]);
            lab_to_rgba(l, a, b)
        }
        Bpp96RgbFloat => (
            f32::from_be_bytes([src[0], src[1], src[2], src[3]]) as f64,
            f32::from_be_bytes([src[4], src[5], src[6], src[7]]) as f64,
            f32::from_be_bytes([src[8], src[9], src[10], src[11]]) as f64,
            1.0,
        ),
        Bpp128RgbaFloat => (
            f32::from_be_bytes([src[0], src[1], src[2], src[3]]) as f64,
            f32::from_be_bytes([src[4], src[5], src[6], src[7]]) as f64,
            f32::from_be_bytes([src[8], src[9], src[10], src[11]]) as f64,
            f32::from_be_bytes([src[12], src[13], src[14], src[15]]) as f64,
        ),
        _ => {
            return Err(Status::UnsupportedPixelFormat);
        }
    })
}

/// ITU-R BT.601 full-range YCbCr -> RGB, the matrix JPEG's own YCbCr uses.
fn ycbcr_to_rgb(y: u8, cb: u8, cr: u8) -> (f64, f64, f64) {
    let y = y as f64;
    let cb = cb as f64 - 128.0;
    let cr = cr as f64 - 128.0;
    let r = y + 1.402 * cr;
    let g = y - 0.344136 * cb - 0.714136 * cr;
    let b = y + 1.772 * cb;
    (
        r.clamp(0.0, 255.0) / 255.0,
        g.clamp(0.0, 255.0) / 255.0,
        b.clamp(0.0, 255.0) / 255.0,
    )
}

/// Inverse of [`ycbcr_to_rgb`], same BT.601 full-range matrix.
fn rgb_to_ycbcr(r: f64, g: f64, b: f64) -> (u8, u8, u8) {
    let (r, g, b) = (r * 255.0, g * 255.0, b * 255.0);
    let y = 0.299 * r + 0.587 * g + 0.114 * b;
    let cb = 128.0 - 0.168736 * r - 0.331264 * g + 0.5 * b;
    let cr = 128.0 + 0.5 * r - 0.418688 * g - 0.081312 * b;
    let clamp = |v: f64| v.round().clamp(0.0, 255.0) as u8;
    (clamp(y), clamp(cb), clamp(cr))
}

/// 8-bit Lab channel bytes (Photoshop convention: L 0..255 -> L* 0..100,
/// a/b 0..255 -> -128..127 centered on 128) to CIE L*a*b* components.
fn lab_bytes_to_components(l: u8, a: u8, b: u8) -> (f64, f64, f64) {
    (l as f64 * 100.0 / 255.0, a as f64 - 128.0, b as f64 - 128.0)
}

fn lab_components_to_bytes(l: f64, a: f64, b: f64) -> (u8, u8, u8) {
    let l = (l.clamp(0.0, 100.0) * 255.0 / 100.0).round() as u8;
    let a = (a.clamp(-128.0, 127.0) + 128.0).round() as u8;
    let b = (b.clamp(-128.0, 127.0) + 128.0).round() as u8;
    (l, a, b)
}

/// CIE L*a*b* (D65 reference white) to linear-sRGB-gamma-encoded RGBA, via
/// XYZ. Standard two-piece inverse f(t) and the sRGB XYZ matrix.
fn lab_to_rgba(l: f64, a: f64, b: f64) -> Rgba {
    const XN: f64 = 95.047;
    const YN: f64 = 100.0;
    const ZN: f64 = 108.883;

    let fy = (l + 16.0) / 116.0;
    let fx = fy + a / 500.0;
    let fz = fy - b / 200.0;

    let finv = |t: f64| {
        if t > 6.0 / 29.0 {
            t * t * t
        } else {
            3.0 * (6.0f64 / 29.0).powi(2) * (t - 4.0 / 29.0)
        }
    };

    let x = XN * finv(fx) / 100.0;
    let y = YN * finv(fy) / 100.0;
    let z = ZN * finv(fz) / 100.0;

    let r_lin = 3.2406 * x - 1.5372 * y - 0.4986 * z;
    let g_lin = -0.9689 * x + 1.8758 * y + 0.0415 * z;
    let b_lin = 0.0557 * x - 0.2040 * y + 1.0570 * z;

    let gamma = |c: f64| {
        let c = c.clamp(0.0, 1.0);
        if c <= 0.0031308 {
            12.92 * c
        } else {
            1.055 * c.powf(1.0 / 2.4) - 0.055
        }
    };

    (gamma(r_lin), gamma(g_lin), gamma(b_lin), 1.0)
}

/// Inverse of [`lab_to_rgba`]: sRGB -> linear -> XYZ -> CIE L*a*b*.
fn rgb_to_lab(r: f64, g: f64, b: f64) -> (f64, f64, f64) {
    let inv_gamma = |c: f64| {
        if c <= 0.04045 {
            c / 12.92
        } else {
            ((c + 0.055) / 1.055).powf(2.4)
        }
    };
    let (r_lin, g_lin, b_lin) = (inv_gamma(r), inv_gamma(g), inv_gamma(b));

    let x = (0.4124 * r_lin + 0.3576 * g_lin + 0.1805 * b_lin) * 100.0;
    let y = (0.2126 * r_lin + 0.7152 * g_lin + 0.0722 * b_lin) * 100.0;
    let z = (0.0193 * r_lin + 0.1192 * g_lin + 0.9505 * b_lin) * 100.0;

    const XN: f64 = 95.047;
    const YN: f64 = 100.0;
    const ZN: f64 = 108.883;

    let f = |t: f64| if t > 0.008856 { t.cbrt() } else { 7.787 * t + 16.0 / 116.0 };
    let (fx, fy, fz) = (f(x / XN), f(y / YN), f(z / ZN));

    (116.0 * fy - 16.0, 500.0 * (fx - fy), 200.0 * (fy - fz))
}

fn cmyk_to_rgba(c: u8, m: u8, y: u8, k: u8, max: u32) -> Rgba {
    let (c, m, y, k) = (
        c as f64 / max as f64,
        m as f64 / max as f64,
        y as f64 / max as f64,
        k as f64 / max as f64,
    );
    (
        (1.0 - c) * (1.0 - k),
        (1.0 - m) * (1.0 - k),
        (1.0 - y) * (1.0 - k),
        1.0,
    )
}

fn encode_pixel(rgba: Rgba, dst: &mut [u8], format: PixelFormat) -> Result<(), Status> {
    let (r, g, b, a) = rgba;
    let clamp8 = |v: f64| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
    let clamp16 = |v: f64| (v.clamp(0.0, 1.0) * 65535.0).round() as u16;
    use PixelFormat::*;
    match format {
        Bpp1Grayscale | Bpp2Grayscale | Bpp4Grayscale | Bpp8Grayscale => {
            dst[0] = clamp8(luma(r, g, b));
        }
        Bpp16Grayscale => {
            dst.copy_from_slice(&clamp16(luma(r, g, b)).to_be_bytes());
        }
        Bpp8GrayscaleAlpha => {
            dst[0] = clamp8(luma(r, g, b));
            dst[1] = clamp8(a);
        }
        Bpp16GrayscaleAlpha => {
            dst[0..2].copy_from_slice(&clamp16(luma(r, g, b)).to_be_bytes());
            dst[2..4].copy_from_slice(&clamp16(a).to_be_bytes());
        }
        Bpp24Rgb => {
            dst[0] = clamp8(r);
            dst[1] = clamp8(g);
            dst[2] = clamp8(b);
        }
        Bpp24Bgr => {
            dst[0] = clamp8(b);
            dst[1] = clamp8(g);
            dst[2] = clamp8(r);
        }
        Bpp32Rgba => {
            dst[0] = clamp8(r);
            dst[1] = clamp8(g);
            dst[2] = clamp8(b);
            dst[3] = clamp8(a);
        }
        Bpp32Bgra => {
            dst[0] = clamp8(b);
            dst[1] = clamp8(g);
            dst[2] = clamp8(r);
            dst[3] = clamp8(a);
        }
        Bpp32Argb => {
            dst[0] = clamp8(a);
            dst[1] = clamp8(r);
            dst[2] = clamp8(g);
            dst[3] = clamp8(b);
        }
        Bpp32Abgr => {
            dst[0] = clamp8(a);
            dst[1] = clamp8(b);
            dst[2] = clamp8(g);
            dst[3] = clamp8(r);
        }
        Bpp32Rgbx => {
            dst[0] = clamp8(r);
            dst[1] = clamp8(g);
            dst[2] = clamp8(b);
            dst[3] = 0xFF;
        }
        Bpp32Xrgb => {
            dst[0] = 0xFF;
            dst[1] = clamp8(r);
            dst[2] = clamp8(g);
            dst[3] = clamp8(b);
        }
        Bpp48Rgb => {
            dst[0..2].copy_from_slice(&clamp16(r).to_be_bytes());
            dst[2..4].copy_from_slice(&clamp16(g).to_be_bytes());
            dst[4..6].copy_from_slice(&clamp16(b).to_be_bytes());
        }
        Bpp48Bgr => {
            dst[0..2].copy_from_slice(&clamp16(b).to_be_bytes());
            dst[2..4].copy_from_slice(&clamp16(g).to_be_bytes());
            dst[4..6].copy_from_slice(&clamp16(r).to_be_bytes());
        }
        Bpp64Rgba => {
            dst[0..2].copy_from_slice(&clamp16(r).to_be_bytes());
            dst[2..4].copy_from_slice(&clamp16(g).to_be_bytes());
            dst[4..6].copy_from_slice(&clamp16(b).to_be_bytes());
            dst[6..8].copy_from_slice(&clamp16(a).to_be_bytes());
        }
        Bpp64Bgra => {
            dst[0..2].copy_from_slice(&clamp16(b).to_be_bytes());
            dst[2..4].copy_from_slice(&clamp16(g).to_be_bytes());
            dst[4..6].copy_from_slice(&clamp16(r).to_be_bytes());
            dst[6..8].copy_from_slice(&clamp16(a).to_be_bytes());
        }
        Bpp64Rgbx => {
            dst[0..2].copy_from_slice(&clamp16(r).to_be_bytes());
            dst[2..4].copy_from_slice(&clamp16(g).to_be_bytes());
            dst[4..6].copy_from_slice(&clamp16(b).to_be_bytes());
            dst[6..8].copy_from_slice(&0xFFFFu16.to_be_bytes());
        }
        Bpp64Xrgb => {
            dst[0..2].copy_from_slice(&0xFFFFu16.to_be_bytes());
            dst[2..4].copy_from_slice(&clamp16(r).to_be_bytes());
            dst[4..6].copy_from_slice(&clamp16(g).to_be_bytes());
            dst[6..8].copy_from_slice(&clamp16(b).to_be_bytes());
        }
        Bpp64Bgrx => {
            dst[0..2].copy_from_slice(&clamp16(b).to_be_bytes());
            dst[2..4].copy_from_slice(&clamp16(g).to_be_bytes());
            dst[4..6].copy_from_slice(&clamp16(r).to_be_bytes());
            dst[6..8].copy_from_slice(&0xFFFFu16.to_be_bytes());
        }
        Bpp64Xbgr => {
            dst[0..2].copy_from_slice(&0xFFFFu16.to_be_bytes());
            dst[2..4].copy_from_slice(&clamp16(b).to_be_bytes());
            dst[4..6].copy_from_slice(&clamp16(g).to_be_bytes());
            dst[6..8].copy_from_slice(&clamp16(r).to_be_bytes());
        }
        Bpp32Cmyk => {
            let (c, m, y, k) = rgb_to_cmyk(r, g, b);
            dst[0] = clamp8(c);
            dst[1] = clamp8(m);
            dst[2] = clamp8(y);
            dst[3] = clamp8(k);
        }
        Bpp24Ycbcr => {
            let (y, cb, cr) = rgb_to_ycbcr(r, g, b);
            dst[0] = y;
            dst[1] = cb;
            dst[2] = cr;
        }
        Bpp24Lab => {
            let (l, a, b) = rgb_to_lab(r, g, b);
            let (l, a, b) = lab_components_to_bytes(l, a, b);
            dst[0] = l;
            dst[1] = a;
            dst[2] = b;
        }
        Bpp96RgbFloat => {
            dst[0..4].copy_from_slice(&(r as f32).to_be_bytes());
            dst[4..8].copy_from_slice(&(g as f32).to_be_bytes());
            dst[8..12].copy_from_slice(&(b as f32).to_be_bytes());
        }
        Bpp128RgbaFloat => {
            dst[0..4].copy_from_slice(&(r as f32).to_be_bytes());
            dst[4..8].copy_from_slice(&(g as f32).to_be_bytes());
            dst[8..12].copy_from_slice(&(b as f32).to_be_bytes());
            dst[12..16].copy_from_slice(&(a as f32).to_be_bytes());
        }
        _ => return Err(Status::UnsupportedPixelFormat),
    }
    Ok(())
}

fn luma(r: f64, g: f64, b: f64) -> f64 {
    0.299 * r + 0.587 * g + 0.114 * b
}

fn rgb_to_cmyk(r: f64, g: f64, b: f64) -> (f64, f64, f64, f64) {
    let k = 1.0 - r.max(g).max(b);
    if k >= 1.0 {
        return (0.0, 0.0, 0.0, 1.0);
    }
    (
        (1.0 - r - k) / (1.0 - k),
        (1.0 - g - k) / (1.0 - k),
        (1.0 - b - k) / (1.0 - k),
        k,
    )
}
