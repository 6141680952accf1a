//! The fast-path table: tight per-scanline byte-shuffle loops for the
//! common pixel-format pairs, dispatched by `(src, dst)` rather than routed
//! through the general canonical-RGBA conversion.

use crate::error::Status;
use crate::model::{Image, PixelFormat};

type Pair = (PixelFormat, PixelFormat);

/// Reorders/extends one pixel's bytes in place into `out`. `src` and `out`
/// are exactly one pixel's worth of bytes each.
type PixelShuffle = fn(src: &[u8], out: &mut [u8]);

fn swap3(src: &[u8], out: &mut [u8]) {
    out[0] = src[2];
    out[1] = src[1];
    out[2] = src[0];
}

fn swap3_16(src: &[u8], out: &mut [u8]) {
    // Two bytes per channel; swap channel order, keep byte order within a channel.
    out[0..2].copy_from_slice(&src[4..6]);
    out[2..4].copy_from_slice(&src[2..4]);
    out[4..6].copy_from_slice(&src[0..2]);
}

fn rgba_to_bgra(src: &[u8], out: &mut [u8]) {
    out[0] = src[2];
    out[1] = src[1];
    out[2] = src[0];
    out[3] = src[3];
}

fn rgba_to_argb(src: &[u8], out: &mut [u8]) {
    out[0] = src[3];
    out[1] = src[0];
    out[2] = src[1];
    out[3] = src[2];
}

fn rgba_to_abgr(src: &[u8], out: &mut [u8]) {
    out[0] = src[3];
    out[1] = src[2];
    out[2] = src[1];
    out[3] = src[0];
}

fn rgba64_to_bgra64(src: &[u8], out: &mut [u8]) {
    out[0..2].copy_from_slice(&src[4..6]);
    out[2..4].copy_from_slice(&src[2..4]);
    out[4..6].copy_from_slice(&src[0..2]);
    out[6..8].copy_from_slice(&src[6..8]);
}

fn rgba64_to_argb64(src: &[u8], out: &mut [u8]) {
    out[0..2].copy_from_slice(&src[6..8]);
    out[2..4].copy_from_slice(&src[0..2]);
    out[4..6].copy_from_slice(&src[2..4]);
    out[6..8].copy_from_slice(&src[4..6]);
}

fn rgba64_to_abgr64(src: &[u8], out: &mut [u8]) {
    out[0..2].copy_from_slice(&src[6..8]);
    out[2..4].copy_from_slice(&src[4..6]);
    out[4..6].copy_from_slice(&src[2..4]);
    out[6..8].copy_from_slice(&src[0..2]);
}

fn rgb_to_rgba_opaque(src: &[u8], out: &mut [u8]) {
    out[0..3].copy_from_slice(src);
    out[3] = 0xFF;
}

fn rgba_drop_alpha(src: &[u8], out: &mut [u8]) {
    out.copy_from_slice(&src[0..3]);
}

fn rgb48_to_rgba64_opaque(src: &[u8], out: &mut [u8]) {
    out[0..6].copy_from_slice(src);
    out[6..8].copy_from_slice(&0xFFFFu16.to_ne_bytes());
}

fn rgba64_drop_alpha(src: &[u8], out: &mut [u8]) {
    out.copy_from_slice(&src[0..6]);
}

fn rgb555_to_bgr555(src: &[u8], out: &mut [u8]) {
    let v = u16::from_le_bytes([src[0], src[1]]);
    let r = (v >> 10) & 0x1F;
    let g = (v >> 5) & 0x1F;
    let b = v & 0x1F;
    let swapped = (b << 10) | (g << 5) | r;
    out.copy_from_slice(&swapped.to_le_bytes());
}

fn rgb565_to_bgr565(src: &[u8], out: &mut [u8]) {
    let v = u16::from_le_bytes([src[0], src[1]]);
    let r = (v >> 11) & 0x1F;
    let g = (v >> 5) & 0x3F;
    let b = v & 0x1F;
    let swapped = (b << 11) | (g << 5) | r;
    out.copy_from_slice(&swapped.to_le_bytes());
}

/// (pair, bytes-per-pixel-in, bytes-per-pixel-out, shuffle fn).
fn table_entry(pair: Pair) -> Option<(usize, usize, PixelShuffle)> {
    use PixelFormat::*;
    Some(match pair {
        (Bpp24Rgb, Bpp24Bgr) | (Bpp24Bgr, Bpp24Rgb) => (3, 3, swap3),
        (Bpp48Rgb, Bpp48Bgr) | (Bpp48Bgr, Bpp48Rgb) => (6, 6, swap3_16),
        (Bpp32Rgba, Bpp32Bgra) | (Bpp32Bgra, Bpp32Rgba) => (4, 4, rgba_to_bgra),
        (Bpp32Rgba, Bpp32Argb) => (4, 4, rgba_to_argb),
        (Bpp32Rgba, Bpp32Abgr) => (4, 4, rgba_to_abgr),
        (Bpp64Rgba, Bpp64Bgra) | (Bpp64Bgra, Bpp64Rgba) => (8, 8, rgba64_to_bgra64),
        (Bpp64Rgba, Bpp64Argb) => (8, 8, rgba64_to_argb64),
        (Bpp64Rgba, Bpp64Abgr) => (8, 8, rgba64_to_abgr64),
        (Bpp24Rgb, Bpp32Rgba) => (3, 4, rgb_to_rgba_opaque),
        (Bpp32Rgba, Bpp24Rgb) => (4, 3, rgba_drop_alpha),
        (Bpp48Rgb, Bpp64Rgba) => (6, 8, rgb48_to_rgba64_opaque),
        (Bpp64Rgba, Bpp48Rgb) => (8, 6, rgba64_drop_alpha),
        (Bpp16Rgb555, Bpp16Bgr555) | (Bpp16Bgr555, Bpp16Rgb555) => (2, 2, rgb555_to_bgr555),
        (Bpp16Rgb565, Bpp16Bgr565) | (Bpp16Bgr565, Bpp16Rgb565) => (2, 2, rgb565_to_bgr565),
        _ => return None,
    })
}

pub fn try_convert(image: &Image, target: PixelFormat) -> Option<Result<Image, Status>> {
    let (in_bpp, out_bpp, shuffle) = table_entry((image.pixel_format, target))?;
    Some(run(image, target, in_bpp, out_bpp, shuffle))
}

fn run(
    image: &Image,
    target: PixelFormat,
    in_bpp: usize,
    out_bpp: usize,
    shuffle: PixelShuffle,
) -> Result<Image, Status> {
    let mut out = Image::skeleton(image.width, image.height, target);
    out.allocate_pixels();
    let width = image.width as usize;
    let src_stride = image.bytes_per_line as usize;
    let dst_stride = out.bytes_per_line as usize;

    // Row-parallel when `parallel` is enabled and the buffers don't alias.
    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;
        out.pixels
            .par_chunks_mut(dst_stride)
            .zip(image.pixels.par_chunks(src_stride))
            .for_each(|(dst_row, src_row)| {
                shuffle_row(src_row, dst_row, width, in_bpp, out_bpp, shuffle);
            });
    }
    #[cfg(not(feature = "parallel"))]
    {
        for (dst_row, src_row) in out
            .pixels
            .chunks_mut(dst_stride)
            .zip(image.pixels.chunks(src_stride))
        {
            shuffle_row(src_row, dst_row, width, in_bpp, out_bpp, shuffle);
        }
    }

    out.orientation = image.orientation;
    out.gamma = image.gamma;
    out.delay_ms = image.delay_ms;
    out.resolution = image.resolution.clone();
    out.icc_profile = image.icc_profile.clone();
    out.meta_data = image.meta_data.clone();
    out.special_properties = image.special_properties.clone();
    Ok(out)
}

fn shuffle_row(
    src_row: &[u8],
    dst_row: &mut [u8],
    width: usize,
    in_bpp: usize,
    out_bpp: usize,
    shuffle: PixelShuffle,
) {
    for x in 0..width {
        let src = &src_row[x * in_bpp..x * in_bpp + in_bpp];
        let dst = &mut dst_row[x * out_bpp..x * out_bpp + out_bpp];
        shuffle(src, dst);
    }
}
