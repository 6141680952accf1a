//! OpenEXR wrapper codec, driven through the `exr` crate's
//! `rgba_channels`/`SpecificChannels::rgba` convenience API.
//!
//! Scope decision (see DESIGN.md): the full `Y`/`RGB`/`RGBA` ×
//! `HALF`/`FLOAT`/`UINT` channel-type matrix a complete implementation
//! would expose is simplified to the RGBA float case `rgba_channels`
//! already normalizes to — `PixelFormat::Bpp128RgbaFloat` is the sole
//! canonical load/save format.

use enough::Stop;
use exr::prelude::*;

use crate::codec::{Codec, LoadOptions, LoadState, SaveOptions, SaveState};
use crate::codecs::io_adapter::OwnedIoAdapter;
use crate::error::Status;
use crate::io::Io;
use crate::model::image::Compression;
use crate::model::{Image, PixelFormat};
use crate::registry::{CodecInfo, Signature};

pub fn info() -> CodecInfo {
    CodecInfo {
        name: "OpenEXR",
        description: "OpenEXR",
        mime_types: &["image/x-exr"],
        extensions: &["exr"],
        signatures: &[Signature {
            offset: 0,
            pattern: &[0x76, 0x2F, 0x31, 0x01],
        }],
        load_features: crate::codec::LoadFeatures {
            supports_metadata: true,
            ..Default::default()
        },
        save_features: crate::codec::SaveFeatures {
            accepted_pixel_formats: &[PixelFormat::Bpp128RgbaFloat],
            accepted_compressions: &[
                Compression::None,
                Compression::Rle,
                Compression::ExrZips,
                Compression::ExrZip,
                Compression::ExrPiz,
                Compression::ExrPxr24,
                Compression::ExrB44,
                Compression::ExrB44a,
            ],
            default_compression: Compression::ExrZip,
            ..Default::default()
        },
    }
}

fn compression_from_exr(c: exr::meta::attribute::Compression) -> Compression {
    use exr::meta::attribute::Compression as ExrCompression;
    match c {
        ExrCompression::Uncompressed => Compression::None,
        ExrCompression::RLE => Compression::Rle,
        ExrCompression::ZIP1 => Compression::ExrZips,
        ExrCompression::ZIP16 => Compression::ExrZip,
        ExrCompression::PIZ => Compression::ExrPiz,
        ExrCompression::PXR24 => Compression::ExrPxr24,
        ExrCompression::B44 => Compression::ExrB44,
        ExrCompression::B44A => Compression::ExrB44a,
        ExrCompression::DWAA(_) => Compression::ExrDwaa,
        ExrCompression::DWAB(_) => Compression::ExrDwab,
    }
}

fn compression_to_exr(c: Compression) -> exr::meta::attribute::Compression {
    use exr::meta::attribute::Compression as ExrCompression;
    match c {
        Compression::None => ExrCompression::Uncompressed,
        Compression::Rle => ExrCompression::RLE,
        Compression::ExrZips => ExrCompression::ZIP1,
        Compression::ExrZip => ExrCompression::ZIP16,
        Compression::ExrPiz => ExrCompression::PIZ,
        Compression::ExrPxr24 => ExrCompression::PXR24,
        Compression::ExrB44 => ExrCompression::B44,
        Compression::ExrB44a => ExrCompression::B44A,
        _ => ExrCompression::ZIP16,
    }
}

pub struct OpenExrCodec;

impl Codec for OpenExrCodec {
    fn load_init<'io>(
        &self,
        io: Box<dyn Io + 'io>,
        _options: LoadOptions,
    ) -> Result<Box<dyn LoadState + 'io>, Status> {
        Ok(Box::new(OpenExrLoadState {
            io: Some(io),
            done: false,
            decoded: None,
        }))
    }

    fn save_init<'io>(
        &self,
        io: Box<dyn Io + 'io>,
        options: SaveOptions,
    ) -> Result<Box<dyn SaveState + 'io>, Status> {
        Ok(Box::new(OpenExrSaveState {
            io: Some(io),
            options,
            done: false,
        }))
    }
}

struct OpenExrLoadState<'io> {
    io: Option<Box<dyn Io + 'io>>,
    done: bool,
    /// Decoded eagerly in `seek_next_frame` (the `exr` crate's `rgba_channels`
    /// reader has no header-only split), then moved into the image's pixel
    /// buffer by `frame` — mirrors the two-step load contract the other
    /// codecs get from their library's separate header/scanline calls.
    decoded: Option<Vec<u8>>,
}

/// Mirrors the EXR pixel buffer in row-major order; `rgba_channels` hands
/// callbacks pixel-at-a-time so we collect into a flat `Vec` sized up front,
/// keeping the row width alongside it so the per-pixel callback can compute
/// a row-major index.
struct RgbaBuffer {
    width: usize,
    pixels: Vec<(f32, f32, f32, f32)>,
}

impl<'io> LoadState for OpenExrLoadState<'io> {
    fn seek_next_frame(&mut self, _stop: &dyn Stop) -> Result<Option<Image>, Status> {
        if self.done {
            return Ok(None);
        }
        let io = self.io.take().ok_or(Status::ConflictingOperation)?;
        let adapter = OwnedIoAdapter::new(io);

        let reader = read()
            .no_deep_data()
            .largest_resolution_level()
            .rgba_channels(
                |resolution, _channels: &RgbaChannels| -> RgbaBuffer {
                    RgbaBuffer {
                        width: resolution.width(),
                        pixels: vec![(0.0, 0.0, 0.0, 1.0); resolution.area()],
                    }
                },
                |buffer: &mut RgbaBuffer, position, (r, g, b, a): (f32, f32, f32, f32)| {
                    // framebuffer already laid out by the crate per the
                    // data window's origin.
                    let width = buffer.width;
                    buffer.pixels[position.1 * width + position.0] = (r, g, b, a);
                },
            )
            .first_valid_layer()
            .all_attributes();

        let image_result = reader
            .from_buffered(adapter)
            .map_err(|e| Status::UnderlyingCodec(e.to_string()))?;

        let layer = &image_result.layer_data;
        let size = layer.size;
        let width = size.width() as u32;
        let height = size.height() as u32;
        let pixels_rgba = &layer.channel_data.pixels.pixels;

        let mut bytes = Vec::with_capacity(pixels_rgba.len() * 16);
        for (r, g, b, a) in pixels_rgba.iter() {
            bytes.extend_from_slice(&r.to_be_bytes());
            bytes.extend_from_slice(&g.to_be_bytes());
            bytes.extend_from_slice(&b.to_be_bytes());
            bytes.extend_from_slice(&a.to_be_bytes());
        }

        let mut img = Image::skeleton(width, height, PixelFormat::Bpp128RgbaFloat);
        img.source_image = Some(crate::model::image::SourceImage {
            pixel_format: PixelFormat::Bpp128RgbaFloat,
            compression: compression_from_exr(layer.attributes.compression),
            chroma_subsampling: None,
            interlaced: false,
        });

        self.decoded = Some(bytes);
        self.done = true;
        Ok(Some(img))
    }

    fn frame(&mut self, image: &mut Image, _stop: &dyn Stop) -> Result<(), Status> {
        image.pixels = self.decoded.take().ok_or(Status::ConflictingOperation)?;
        image.bytes_per_line = image.pixel_format.min_bytes_per_line(image.width);
        Ok(())
    }
}

struct OpenExrSaveState<'io> {
    io: Option<Box<dyn Io + 'io>>,
    options: SaveOptions,
    done: bool,
}

impl<'io> SaveState for OpenExrSaveState<'io> {
    fn seek_next_frame(&mut self, image: &Image, _stop: &dyn Stop) -> Result<(), Status> {
        if self.done {
            return Err(Status::ConflictingOperation);
        }
        if image.pixel_format != PixelFormat::Bpp128RgbaFloat {
            return Err(Status::InvalidArgument(
                "OpenEXR save requires Bpp128RgbaFloat pixels".to_string(),
            ));
        }
        Ok(())
    }

    fn frame(&mut self, image: &Image, _stop: &dyn Stop) -> Result<(), Status> {
        let io = self.io.take().ok_or(Status::ConflictingOperation)?;
        let adapter = OwnedIoAdapter::new(io);

        let width = image.width as usize;
        let height = image.height as usize;
        let compression = compression_to_exr(self.options.compression);

        let read_pixel = |position: Vec2<usize>| -> (f32, f32, f32, f32) {
            let idx = (position.1 * width + position.0) * 16;
            let r = f32::from_be_bytes(image.pixels[idx..idx + 4].try_into().unwrap());
            let g = f32::from_be_bytes(image.pixels[idx + 4..idx + 8].try_into().unwrap());
            let b = f32::from_be_bytes(image.pixels[idx + 8..idx + 12].try_into().unwrap());
            let a = f32::from_be_bytes(image.pixels[idx + 12..idx + 16].try_into().unwrap());
            (r, g, b, a)
        };

        let layer = Layer::new(
            (width, height),
            LayerAttributes::named("image"),
            Encoding {
                compression,
                ..Encoding::FAST_LOSSLESS
            },
            SpecificChannels::rgba(read_pixel),
        );
        let exr_image = exr::image::Image::from_layer(layer);
        exr_image
            .write()
            .to_buffered(adapter)
            .map_err(|e| Status::UnderlyingCodec(e.to_string()))?;
        Ok(())
    }

    fn finish(&mut self) -> Result<(), Status> {
        self.done = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compression_round_trips_non_dwa_variants() {
        for c in [
            Compression::None,
            Compression::ExrZips,
            Compression::ExrZip,
            Compression::ExrPiz,
            Compression::ExrPxr24,
            Compression::ExrB44,
            Compression::ExrB44a,
        ] {
            assert_eq!(compression_from_exr(compression_to_exr(c)), c);
        }
    }
}
