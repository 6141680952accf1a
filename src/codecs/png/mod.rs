//! PNG wrapper codec: tEXt/zTXt/iTXt text chunks surface as `MetaData`,
//! embedded ICC profiles are extracted, driven through the `png` crate's
//! `Reader`/`Writer` split. zlib inflate/deflate and filtering are the
//! library's concern, not reimplemented here.

use enough::Stop;
use png::{BitDepth, ColorType};

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
        name: "PNG",
        description: "Portable Network Graphics",
        mime_types: &["image/png"],
        extensions: &["png"],
        signatures: &[Signature {
            offset: 0,
            pattern: &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A],
        }],
        load_features: crate::codec::LoadFeatures {
            supports_metadata: true,
            supports_iccp: true,
            ..Default::default()
        },
        save_features: crate::codec::SaveFeatures {
            accepted_pixel_formats: &[
                PixelFormat::Bpp8Grayscale,
                PixelFormat::Bpp16Grayscale,
                PixelFormat::Bpp8Indexed,
                PixelFormat::Bpp24Rgb,
                PixelFormat::Bpp32Rgba,
                PixelFormat::Bpp48Rgb,
                PixelFormat::Bpp64Rgba,
            ],
            accepted_compressions: &[Compression::None, Compression::Deflate],
            default_compression: Compression::Deflate,
            compression_level_range: Some((0, 9)),
            default_compression_level: 6,
        },
    }
}

pub struct PngCodec;

impl Codec for PngCodec {
    fn load_init<'io>(
        &self,
        io: Box<dyn Io + 'io>,
        _options: LoadOptions,
    ) -> Result<Box<dyn LoadState + 'io>, Status> {
        let decoder = png::Decoder::new(OwnedIoAdapter::new(io));
        let reader = decoder
            .read_info()
            .map_err(|e| Status::UnderlyingCodec(e.to_string()))?;
        Ok(Box::new(PngLoadState {
            reader,
            done: false,
        }))
    }

    fn save_init<'io>(
        &self,
        io: Box<dyn Io + 'io>,
        options: SaveOptions,
    ) -> Result<Box<dyn SaveState + 'io>, Status> {
        Ok(Box::new(PngSaveState {
            io: Some(io),
            writer: None,
            options,
            done: false,
        }))
    }
}

struct PngLoadState<'io> {
    reader: png::Reader<OwnedIoAdapter<'io>>,
    done: bool,
}

impl<'io> LoadState for PngLoadState<'io> {
    fn seek_next_frame(&mut self, _stop: &dyn Stop) -> Result<Option<Image>, Status> {
        if self.done {
            return Ok(None);
        }
        let info = self.reader.info();
        let width = info.width;
        let height = info.height;
        let format = match (info.color_type, info.bit_depth) {
            (ColorType::Grayscale, BitDepth::Eight) => PixelFormat::Bpp8Grayscale,
            (ColorType::Grayscale, BitDepth::Sixteen) => PixelFormat::Bpp16Grayscale,
            (ColorType::GrayscaleAlpha, BitDepth::Eight) => PixelFormat::Bpp8GrayscaleAlpha,
            (ColorType::Rgb, BitDepth::Eight) => PixelFormat::Bpp24Rgb,
            (ColorType::Rgb, BitDepth::Sixteen) => PixelFormat::Bpp48Rgb,
            (ColorType::Rgba, BitDepth::Eight) => PixelFormat::Bpp32Rgba,
            (ColorType::Rgba, BitDepth::Sixteen) => PixelFormat::Bpp64Rgba,
            (ColorType::Indexed, _) => PixelFormat::Bpp8Indexed,
            _ => return Err(Status::UnsupportedBitDepth(info.bit_depth as u32)),
        };

        let mut image = Image::skeleton(width, height, format);

        if let Some(palette) = info.palette.clone() {
            image.palette = Some(crate::model::image::Palette {
                pixel_format: PixelFormat::Bpp24Rgb,
                data: palette.to_vec(),
            });
        }

        if let Some(icc) = &info.icc_profile {
            image.icc_profile = Some(crate::model::image::IccProfile {
                data: icc.to_vec(),
                name: "embedded".to_string(),
            });
        }

        for text in &info.uncompressed_latin1_text {
            image
                .meta_data
                .push(text_to_metadata(&text.keyword, &text.text));
        }
        for text in &info.compressed_latin1_text {
            if let Ok(text) = text.get_text() {
                image.meta_data.push(text_to_metadata(&text.keyword, &text));
            }
        }
        for text in &info.utf8_text {
            if let Ok(text) = text.get_text() {
                image.meta_data.push(text_to_metadata(&text.keyword, &text));
            }
        }

        // png 0.17's `Reader` exposes one image per stream; APNG animation
        // frames are out of scope for this single-shot wrapper codec.
        self.done = true;
        Ok(Some(image))
    }

    fn frame(&mut self, image: &mut Image, _stop: &dyn Stop) -> Result<(), Status> {
        let mut buf = vec![0u8; self.reader.output_buffer_size()];
        let frame_info = self
            .reader
            .next_frame(&mut buf)
            .map_err(|e| Status::UnderlyingCodec(e.to_string()))?;
        buf.truncate(frame_info.buffer_size());
        image.pixels = buf;
        image.bytes_per_line = image.pixel_format.min_bytes_per_line(image.width);
        Ok(())
    }
}

fn text_to_metadata(keyword: &str, text: &str) -> MetaData {
    let key = match keyword.to_ascii_lowercase().as_str() {
        "author" => MetaDataKey::Author,
        "comment" => MetaDataKey::Comment,
        "copyright" => MetaDataKey::Copyright,
        "creation time" => MetaDataKey::CreationTime,
        "description" => MetaDataKey::Description,
        "software" => MetaDataKey::Software,
        "title" => MetaDataKey::Title,
        other => MetaDataKey::Unknown(other.to_string()),
    };
    MetaData::string(key, text.to_string())
}

struct PngSaveState<'io> {
    io: Option<Box<dyn Io + 'io>>,
    writer: Option<png::Writer<OwnedIoAdapter<'io>>>,
    options: SaveOptions,
    done: bool,
}

impl<'io> SaveState for PngSaveState<'io> {
    fn seek_next_frame(&mut self, image: &Image, _stop: &dyn Stop) -> Result<(), Status> {
        if self.done || self.writer.is_some() {
            return Err(Status::ConflictingOperation);
        }
        let (color_type, bit_depth) = match image.pixel_format {
            PixelFormat::Bpp8Grayscale => (ColorType::Grayscale, BitDepth::Eight),
            PixelFormat::Bpp16Grayscale => (ColorType::Grayscale, BitDepth::Sixteen),
            PixelFormat::Bpp8Indexed => (ColorType::Indexed, BitDepth::Eight),
            PixelFormat::Bpp24Rgb => (ColorType::Rgb, BitDepth::Eight),
            PixelFormat::Bpp48Rgb => (ColorType::Rgb, BitDepth::Sixteen),
            PixelFormat::Bpp32Rgba => (ColorType::Rgba, BitDepth::Eight),
            PixelFormat::Bpp64Rgba => (ColorType::Rgba, BitDepth::Sixteen),
            other => {
                return Err(Status::InvalidArgument(format!(
                    "PNG cannot encode pixel format {other:?}"
                )))
            }
        };

        let io = self.io.take().ok_or(Status::ConflictingOperation)?;
        let mut encoder = png::Encoder::new(OwnedIoAdapter::new(io), image.width, image.height);
        encoder.set_color(color_type);
        encoder.set_depth(bit_depth);
        let compression = match self.options.compression_level {
            Some(level) if level <= 2 => png::Compression::Fast,
            Some(level) if level >= 7 => png::Compression::Best,
            _ => png::Compression::Default,
        };
        encoder.set_compression(compression);

        if let Some(palette) = &image.palette {
            encoder.set_palette(palette.data.clone());
        }
        if let Some(icc) = &image.icc_profile {
            let _ = encoder.set_icc_profile(icc.data.clone());
        }

        let writer = encoder
            .write_header()
            .map_err(|e| Status::UnderlyingCodec(e.to_string()))?;
        self.writer = Some(writer);
        Ok(())
    }

    fn frame(&mut self, image: &Image, _stop: &dyn Stop) -> Result<(), Status> {
        let writer = self.writer.as_mut().ok_or(Status::ConflictingOperation)?;
        writer
            .write_image_data(&image.pixels)
            .map_err(|e| Status::UnderlyingCodec(e.to_string()))?;
        Ok(())
    }

    fn finish(&mut self) -> Result<(), Status> {
        self.done = true;
        if let Some(writer) = self.writer.take() {
            writer
                .finish()
                .map_err(|e| Status::UnderlyingCodec(e.to_string()))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_to_metadata_recognizes_standard_keywords() {
        let md = text_to_metadata("Author", "Jane");
        assert!(matches!(md.key, MetaDataKey::Author));
        let md = text_to_metadata("Weird", "x");
        assert!(matches!(md.key, MetaDataKey::Unknown(ref s) if s == "weird"));
    }
}
