//! Mirror/rotate operations.
//!
//! Implemented as strided copy with index permutation; 90/270 rotation
//! allocates a new buffer with swapped width/height.

use crate::error::Status;
use crate::model::Image;

fn bytes_per_pixel(image: &Image) -> usize {
    (image.pixel_format.bits_per_pixel() as usize + 7) / 8
}

/// Flip left-right, in place.
pub fn mirror_horizontal(image: &mut Image) -> Result<(), Status> {
    let bpp = bytes_per_pixel(image);
    let width = image.width as usize;
    let stride = image.bytes_per_line as usize;
    for row in image.pixels.chunks_mut(stride) {
        let pixels = &mut row[..width * bpp];
        let mut i = 0;
        let mut j = width - 1;
        while i < j {
            let (left, right) = pixels.split_at_mut(j * bpp);
            left[i * bpp..i * bpp + bpp].swap_with_slice(&mut right[..bpp]);
            i += 1;
            j -= 1;
        }
    }
    Ok(())
}

/// Flip top-bottom, in place.
pub fn mirror_vertical(image: &mut Image) -> Result<(), Status> {
    let stride = image.bytes_per_line as usize;
    let height = image.height as usize;
    for i in 0..height / 2 {
        let j = height - 1 - i;
        let (top, bottom) = image.pixels.split_at_mut(j * stride);
        top[i * stride..(i + 1) * stride].swap_with_slice(&mut bottom[..stride]);
    }
    Ok(())
}

/// Rotate 180 degrees, in place (equivalent to mirror-horizontal +
/// mirror-vertical, done here as one pass).
pub fn rotate_180(image: &mut Image) -> Result<(), Status> {
    mirror_horizontal(image)?;
    mirror_vertical(image)
}

/// Rotate 90 degrees clockwise, returning a new image with swapped
/// dimensions.
pub fn rotate_90(image: &Image) -> Result<Image, Status> {
    rotate_90_impl(image, true)
}

/// Rotate 270 degrees clockwise (90 counter-clockwise).
pub fn rotate_270(image: &Image) -> Result<Image, Status> {
    rotate_90_impl(image, false)
}

fn rotate_90_impl(image: &Image, clockwise: bool) -> Result<Image, Status> {
    let bpp = bytes_per_pixel(image);
    let (w, h) = (image.width as usize, image.height as usize);
    let mut out = Image::skeleton(image.height, image.width, image.pixel_format);
    out.allocate_pixels();
    let src_stride = image.bytes_per_line as usize;
    let dst_stride = out.bytes_per_line as usize;

    for y in 0..h {
        for x in 0..w {
            let (dx, dy) = if clockwise {
                (h - 1 - y, x)
            } else {
                (y, w - 1 - x)
            };
            let src = &image.pixels[y * src_stride + x * bpp..y * src_stride + x * bpp + bpp];
            let dst_off = dy * dst_stride + dx * bpp;
            out.pixels[dst_off..dst_off + bpp].copy_from_slice(src);
        }
    }

    out.orientation = image.orientation;
    out.gamma = image.gamma;
    out.delay_ms = image.delay_ms;
    out.palette = image.palette.clone();
    out.icc_profile = image.icc_profile.clone();
    out.meta_data = image.meta_data.clone();
    out.special_properties = image.special_properties.clone();
    Ok(out)
}
