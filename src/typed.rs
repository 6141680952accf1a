//! Typed-pixel convenience layer (`typed-pixels` feature): `rgb`/`imgref`
//! interop scoped to this crate's [`Image`](crate::model::Image)/
//! [`PixelFormat`] model instead of a single fixed pixel layout.

use imgref::{Img, ImgVec};
use rgb::{AsPixels as _, RGBA8};

use crate::error::Status;
use crate::model::{Image, PixelFormat};

/// Borrow an [`Image`] already in `Bpp32Rgba` as a typed, row-strided pixel
/// grid. Returns `UnsupportedPixelFormat` for any other layout — convert
/// first with [`crate::convert::convert`] if needed.
pub fn as_rgba8(image: &Image) -> Result<Img<&[RGBA8]>, Status> {
    if image.pixel_format != PixelFormat::Bpp32Rgba {
        return Err(Status::UnsupportedPixelFormat);
    }
    let pixels: &[RGBA8] = image.pixels.as_pixels();
    let stride = image.bytes_per_line as usize / 4;
    Ok(Img::new_stride(pixels, image.width as usize, image.height as usize, stride))
}

/// Build an owned [`ImgVec`] copy of an RGBA8 image's pixels.
pub fn to_rgba8_vec(image: &Image) -> Result<ImgVec<RGBA8>, Status> {
    let view = as_rgba8(image)?;
    Ok(ImgVec::new(view.pixels().collect(), view.width(), view.height()))
}

/// Build a skeleton+pixels [`Image`] from an owned RGBA8 grid.
pub fn from_rgba8(grid: &Img<Vec<RGBA8>>) -> Image {
    let width = grid.width() as u32;
    let height = grid.height() as u32;
    let mut image = Image::skeleton(width, height, PixelFormat::Bpp32Rgba);
    image.allocate_pixels();
    for (y, row) in grid.rows().enumerate() {
        let dst = image.row_mut(y as u32);
        for (x, px) in row.iter().enumerate() {
            let off = x * 4;
            dst[off] = px.r;
            dst[off + 1] = px.g;
            dst[off + 2] = px.b;
            dst[off + 3] = px.a;
        }
    }
    image
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn as_rgba8_rejects_wrong_format() {
        let image = Image::skeleton(2, 2, PixelFormat::Bpp24Rgb);
        assert!(as_rgba8(&image).is_err());
    }
}
