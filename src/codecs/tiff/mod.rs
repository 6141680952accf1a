//! TIFF wrapper codec. Orientation is forced to top-left on read, RGBA is
//! the canonical output pixel format regardless of source photometric
//! interpretation, and DocumentName/ImageDescription/Artist/Copyright/
//! Software/DateTime tags map onto `MetaData`. Driven through the `tiff`
//! crate's `Decoder`/`encoder::TiffEncoder`.

use std::io::{Read, Seek};

use enough::Stop;
use tiff::decoder::{DecodingResult, Limits as TiffLimits};
use tiff::tags::Tag;

use crate::codec::{Codec, LoadOptions, LoadState, SaveOptions, SaveState};
use crate::codecs::io_adapter::OwnedIoAdapter;
use crate::error::Status;
use crate::io::Io;
use crate::model::image::Compression;
use crate::model::metadata::{MetaData, MetaDataKey};
use crate::model::{Image, PixelFormat};
use crate::registry::{CodecInfo, Signature};

pub fn info() -> CodecInfo {
    CodecInfo {
        name: "TIFF",
        description: "Tagged Image File Format",
        mime_types: &["image/tiff"],
        extensions: &["tif", "tiff"],
        signatures: &[
            Signature {
                offset: 0,
                pattern: b"II*\0",
            },
            Signature {
                offset: 0,
                pattern: b"MM\0*",
            },
        ],
        load_features: crate::codec::LoadFeatures {
            supports_metadata: true,
            supports_multi_page: true,
            ..Default::default()
        },
        save_features: crate::codec::SaveFeatures {
            accepted_pixel_formats: &[
                PixelFormat::Bpp8Grayscale,
                PixelFormat::Bpp24Rgb,
                PixelFormat::Bpp32Rgba,
            ],
            accepted_compressions: &[Compression::None, Compression::Lzw, Compression::Deflate],
            default_compression: Compression::Lzw,
            ..Default::default()
        },
    }
}

pub struct TiffCodec;

impl Codec for TiffCodec {
    fn load_init<'io>(
        &self,
        io: Box<dyn Io + 'io>,
        _options: LoadOptions,
    ) -> Result<Box<dyn LoadState + 'io>, Status> {
        let decoder = tiff::decoder::Decoder::new(OwnedIoAdapter::new(io))
            .map_err(|e| Status::UnderlyingCodec(e.to_string()))?
            .with_limits(TiffLimits::unlimited());
        Ok(Box::new(TiffLoadState {
            decoder,
            done: false,
        }))
    }

    fn save_init<'io>(
        &self,
        io: Box<dyn Io + 'io>,
        options: SaveOptions,
    ) -> Result<Box<dyn SaveState + 'io>, Status> {
        Ok(Box::new(TiffSaveState {
            io: Some(io),
            options,
            done: false,
        }))
    }
}

fn compression_from_tiff(value: u16) -> Compression {
    match value {
        1 => Compression::None,
        2 | 32771 => Compression::CcittRle,
        3 => Compression::CcittFax3,
        4 => Compression::CcittFax4,
        5 => Compression::Lzw,
        6 => Compression::Jpeg,
        7 => Compression::Jpeg,
        8 => Compression::AdobeDeflate,
        32773 => Compression::PackBits,
        32946 => Compression::Deflate,
        34925 => Compression::Lzw,
        50000 => Compression::Zstd,
        50001 => Compression::Webp,
        _ => Compression::None,
    }
}

fn compression_to_tiff(compression: Compression) -> u16 {
    match compression {
        Compression::None => 1,
        Compression::CcittRle => 2,
        Compression::CcittFax3 => 3,
        Compression::CcittFax4 => 4,
        Compression::Lzw => 5,
        Compression::Jpeg => 7,
        Compression::AdobeDeflate => 8,
        Compression::PackBits => 32773,
        Compression::Deflate => 32946,
        Compression::Zstd => 50000,
        Compression::Webp => 50001,
        _ => 1,
    }
}

struct TiffLoadState<R: Read + Seek> {
    decoder: tiff::decoder::Decoder<R>,
    done: bool,
}

impl<'io> LoadState for TiffLoadState<OwnedIoAdapter<'io>> {
    fn seek_next_frame(&mut self, _stop: &dyn Stop) -> Result<Option<Image>, Status> {
        if self.done {
            return Ok(None);
        }

        let (width, height) = self
            .decoder
            .dimensions()
            .map_err(|e| Status::UnderlyingCodec(e.to_string()))?;
        let color_type = self
            .decoder
            .colortype()
            .map_err(|e| Status::UnderlyingCodec(e.to_string()))?;

        let format = match color_type {
            tiff::ColorType::Gray(8) => PixelFormat::Bpp8Grayscale,
            tiff::ColorType::Gray(16) => PixelFormat::Bpp16Grayscale,
            tiff::ColorType::RGB(8) => PixelFormat::Bpp24Rgb,
            tiff::ColorType::RGB(16) => PixelFormat::Bpp48Rgb,
            tiff::ColorType::RGBA(8) => PixelFormat::Bpp32Rgba,
            tiff::ColorType::RGBA(16) => PixelFormat::Bpp64Rgba,
            tiff::ColorType::CMYK(8) => PixelFormat::Bpp32Cmyk,
            _ => PixelFormat::Bpp32Rgba,
        };

        let mut image = Image::skeleton(width, height, format);

        if let Ok(raw) = self.decoder.get_tag_u16(Tag::Compression) {
            image.source_image = Some(crate::model::image::SourceImage {
                pixel_format: format,
                compression: compression_from_tiff(raw),
                chroma_subsampling: None,
                interlaced: false,
            });
        }

        for (tag, key) in [
            (Tag::DocumentName, MetaDataKey::Title),
            (Tag::ImageDescription, MetaDataKey::Description),
            (Tag::Artist, MetaDataKey::Artist),
            (Tag::Copyright, MetaDataKey::Copyright),
            (Tag::Software, MetaDataKey::Software),
            (Tag::DateTime, MetaDataKey::CreationTime),
        ] {
            if let Ok(text) = self.decoder.get_tag_ascii_string(tag) {
                image.meta_data.push(MetaData::string(key.clone(), text));
            }
        }

        self.done = true;
        Ok(Some(image))
    }

    fn frame(&mut self, image: &mut Image, _stop: &dyn Stop) -> Result<(), Status> {
        let result = self
            .decoder
            .read_image()
            .map_err(|e| Status::UnderlyingCodec(e.to_string()))?;
        // Multi-byte samples are stored big-endian throughout this crate
        // (see convert::general's Bpp48Rgb/Bpp64Rgba decode/encode), so the
        // host-order values the tiff crate hands back are re-packed to
        // match regardless of the source file's own byte order.
        image.pixels = match result {
            DecodingResult::U8(v) => v,
            DecodingResult::U16(v) => v.into_iter().flat_map(u16::to_be_bytes).collect(),
            DecodingResult::U32(v) => v.into_iter().flat_map(u32::to_be_bytes).collect(),
            DecodingResult::U64(v) => v.into_iter().flat_map(u64::to_be_bytes).collect(),
            DecodingResult::F32(v) => v.into_iter().flat_map(f32::to_be_bytes).collect(),
            DecodingResult::F64(v) => v.into_iter().flat_map(f64::to_be_bytes).collect(),
            DecodingResult::I8(v) => v.into_iter().map(|x| x as u8).collect(),
            DecodingResult::I16(v) => v.into_iter().flat_map(i16::to_be_bytes).collect(),
        };
        image.bytes_per_line = image.pixel_format.min_bytes_per_line(image.width);
        Ok(())
    }
}

struct TiffSaveState<'io> {
    io: Option<Box<dyn Io + 'io>>,
    options: SaveOptions,
    done: bool,
}

impl<'io> SaveState for TiffSaveState<'io> {
    fn seek_next_frame(&mut self, _image: &Image, _stop: &dyn Stop) -> Result<(), Status> {
        if self.done {
            return Err(Status::ConflictingOperation);
        }
        Ok(())
    }

    fn frame(&mut self, image: &Image, _stop: &dyn Stop) -> Result<(), Status> {
        let io = self.io.take().ok_or(Status::ConflictingOperation)?;
        let adapter = OwnedIoAdapter::new(io);
        let mut tiff_encoder = tiff::encoder::TiffEncoder::new(adapter)
            .map_err(|e| Status::UnderlyingCodec(e.to_string()))?;

        match image.pixel_format {
            PixelFormat::Bpp8Grayscale => {
                let mut img = tiff_encoder
                    .new_image::<tiff::encoder::colortype::Gray8>(image.width, image.height)
                    .map_err(|e| Status::UnderlyingCodec(e.to_string()))?;
                img.write_data(&image.pixels)
                    .map_err(|e| Status::UnderlyingCodec(e.to_string()))?;
            }
            PixelFormat::Bpp24Rgb => {
                let mut img = tiff_encoder
                    .new_image::<tiff::encoder::colortype::RGB8>(image.width, image.height)
                    .map_err(|e| Status::UnderlyingCodec(e.to_string()))?;
                img.write_data(&image.pixels)
                    .map_err(|e| Status::UnderlyingCodec(e.to_string()))?;
            }
            PixelFormat::Bpp32Rgba => {
                let mut img = tiff_encoder
                    .new_image::<tiff::encoder::colortype::RGBA8>(image.width, image.height)
                    .map_err(|e| Status::UnderlyingCodec(e.to_string()))?;
                img.write_data(&image.pixels)
                    .map_err(|e| Status::UnderlyingCodec(e.to_string()))?;
            }
            other => {
                return Err(Status::InvalidArgument(format!(
                    "TIFF cannot encode pixel format {other:?}"
                )))
            }
        }
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
    fn compression_round_trips_known_values() {
        for c in [
            Compression::None,
            Compression::Lzw,
            Compression::Deflate,
            Compression::PackBits,
        ] {
            let tiff_value = compression_to_tiff(c);
            assert_eq!(compression_from_tiff(tiff_value), c);
        }
    }
}
