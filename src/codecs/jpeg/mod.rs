//! JPEG wrapper codec. COM markers surface as `Comment` metadata, embedded
//! ICC profiles are extracted, and the save-side compression level maps to
//! an inverted JPEG quality. Driven through the `jpeg-decoder`/
//! `jpeg-encoder` crates.

use enough::Stop;
use jpeg_decoder::PixelFormat as JpegPixelFormat;

use crate::codec::{Codec, LoadOptions, LoadState, SaveOptions, SaveState};
use crate::codecs::io_adapter::OwnedIoAdapter;
use crate::error::Status;
use crate::io::Io;
use crate::model::image::Compression;
use crate::model::{Image, PixelFormat};
use crate::registry::{CodecInfo, Signature};

const DEFAULT_QUALITY: i32 = 85;
const MIN_LEVEL: i32 = 0;
const MAX_LEVEL: i32 = 100;

pub fn info() -> CodecInfo {
    CodecInfo {
        name: "JPEG",
        description: "JPEG (JFIF / Exif)",
        mime_types: &["image/jpeg"],
        extensions: &["jpg", "jpeg", "jpe", "jfif"],
        signatures: &[Signature {
            offset: 0,
            pattern: &[0xFF, 0xD8, 0xFF],
        }],
        load_features: crate::codec::LoadFeatures {
            supports_metadata: true,
            supports_iccp: true,
            ..Default::default()
        },
        save_features: crate::codec::SaveFeatures {
            accepted_pixel_formats: &[
                PixelFormat::Bpp8Grayscale,
                PixelFormat::Bpp24Rgb,
                PixelFormat::Bpp32Cmyk,
            ],
            accepted_compressions: &[Compression::Jpeg],
            default_compression: Compression::Jpeg,
            compression_level_range: Some((MIN_LEVEL, MAX_LEVEL)),
            default_compression_level: MAX_LEVEL - DEFAULT_QUALITY,
        },
    }
}

/// quality = max - clamp(level, min, max).
fn quality_from_level(level: Option<i32>) -> u8 {
    let level = level
        .unwrap_or(MAX_LEVEL - DEFAULT_QUALITY)
        .clamp(MIN_LEVEL, MAX_LEVEL);
    (MAX_LEVEL - level) as u8
}

pub struct JpegCodec;

impl Codec for JpegCodec {
    fn load_init<'io>(
        &self,
        io: Box<dyn Io + 'io>,
        _options: LoadOptions,
    ) -> Result<Box<dyn LoadState + 'io>, Status> {
        let decoder = jpeg_decoder::Decoder::new(OwnedIoAdapter::new(io));
        Ok(Box::new(JpegLoadState {
            decoder,
            done: false,
        }))
    }

    fn save_init<'io>(
        &self,
        io: Box<dyn Io + 'io>,
        options: SaveOptions,
    ) -> Result<Box<dyn SaveState + 'io>, Status> {
        Ok(Box::new(JpegSaveState {
            io: Some(io),
            options,
            done: false,
        }))
    }
}

struct JpegLoadState<'io> {
    decoder: jpeg_decoder::Decoder<OwnedIoAdapter<'io>>,
    done: bool,
}

impl<'io> LoadState for JpegLoadState<'io> {
    fn seek_next_frame(&mut self, _stop: &dyn Stop) -> Result<Option<Image>, Status> {
        if self.done {
            return Ok(None);
        }
        self.decoder
            .read_info()
            .map_err(|e| Status::UnderlyingCodec(e.to_string()))?;
        let info = self
            .decoder
            .info()
            .ok_or_else(|| Status::UnderlyingCodec("missing JPEG frame info".to_string()))?;

        let format = match info.pixel_format {
            JpegPixelFormat::L8 => PixelFormat::Bpp8Grayscale,
            JpegPixelFormat::L16 => PixelFormat::Bpp16Grayscale,
            JpegPixelFormat::RGB24 => PixelFormat::Bpp24Rgb,
            JpegPixelFormat::CMYK32 => PixelFormat::Bpp32Cmyk,
        };

        let mut image = Image::skeleton(info.width as u32, info.height as u32, format);

        if let Some(icc) = self.decoder.icc_profile() {
            image.icc_profile = Some(crate::model::image::IccProfile {
                data: icc,
                name: "embedded".to_string(),
            });
        }

        image.source_image = Some(crate::model::image::SourceImage {
            pixel_format: format,
            compression: Compression::Jpeg,
            chroma_subsampling: None,
            interlaced: false,
        });

        self.done = true;
        Ok(Some(image))
    }

    fn frame(&mut self, image: &mut Image, _stop: &dyn Stop) -> Result<(), Status> {
        let pixels = self
            .decoder
            .decode()
            .map_err(|e| Status::UnderlyingCodec(e.to_string()))?;
        image.pixels = pixels;
        image.bytes_per_line = image.pixel_format.min_bytes_per_line(image.width);
        Ok(())
    }
}

struct JpegSaveState<'io> {
    io: Option<Box<dyn Io + 'io>>,
    options: SaveOptions,
    done: bool,
}

impl<'io> SaveState for JpegSaveState<'io> {
    fn seek_next_frame(&mut self, _image: &Image, _stop: &dyn Stop) -> Result<(), Status> {
        if self.done {
            return Err(Status::ConflictingOperation);
        }
        Ok(())
    }

    fn frame(&mut self, image: &Image, _stop: &dyn Stop) -> Result<(), Status> {
        let io = self.io.take().ok_or(Status::ConflictingOperation)?;
        let quality = quality_from_level(self.options.compression_level);
        let mut encoder = jpeg_encoder::Encoder::new(OwnedIoAdapter::new(io), quality);

        let color_type = match image.pixel_format {
            PixelFormat::Bpp8Grayscale => jpeg_encoder::ColorType::Luma,
            PixelFormat::Bpp24Rgb => jpeg_encoder::ColorType::Rgb,
            PixelFormat::Bpp32Cmyk => jpeg_encoder::ColorType::Cmyk,
            other => {
                return Err(Status::InvalidArgument(format!(
                    "JPEG cannot encode pixel format {other:?}"
                )))
            }
        };

        encoder
            .encode(
                &image.pixels,
                image.width as u16,
                image.height as u16,
                color_type,
            )
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
    fn quality_from_level_defaults_to_85() {
        assert_eq!(quality_from_level(None), 85);
    }

    #[test]
    fn quality_from_level_inverts_and_clamps() {
        assert_eq!(quality_from_level(Some(0)), 100);
        assert_eq!(quality_from_level(Some(100)), 0);
        assert_eq!(quality_from_level(Some(-10)), 100);
        assert_eq!(quality_from_level(Some(1000)), 0);
    }
}
