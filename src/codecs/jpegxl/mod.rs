//! JPEG-XL wrapper codec, driven through the `jxl-oxide` crate. `jxl-oxide`
//! is decode-only, so this codec's `save_init` reports `NotImplemented`,
//! matching the GIF/WebP codecs' decode-only precedent elsewhere in this
//! crate.

use enough::Stop;
use jxl_oxide::{JxlImage, PixelFormat as JxlPixelFormat};

use crate::codec::{Codec, LoadOptions, LoadState, SaveOptions, SaveState};
use crate::codecs::io_adapter::OwnedIoAdapter;
use crate::error::Status;
use crate::io::Io;
use crate::model::{Image, PixelFormat};
use crate::registry::{CodecInfo, Signature};

pub fn info() -> CodecInfo {
    CodecInfo {
        name: "JPEG-XL",
        description: "JPEG XL",
        mime_types: &["image/jxl"],
        extensions: &["jxl"],
        signatures: &[
            Signature {
                offset: 0,
                pattern: &[0xFF, 0x0A],
            },
            Signature {
                offset: 0,
                pattern: &[
                    0x00, 0x00, 0x00, 0x0C, b'J', b'X', b'L', b' ', 0x0D, 0x0A, 0x87, 0x0A,
                ],
            },
        ],
        load_features: crate::codec::LoadFeatures {
            supports_metadata: true,
            supports_iccp: true,
            supports_animated: true,
            ..Default::default()
        },
        save_features: crate::codec::SaveFeatures::default(),
    }
}

pub struct JpegXlCodec;

impl Codec for JpegXlCodec {
    fn load_init<'io>(
        &self,
        io: Box<dyn Io + 'io>,
        _options: LoadOptions,
    ) -> Result<Box<dyn LoadState + 'io>, Status> {
        let image = JxlImage::builder()
            .read(OwnedIoAdapter::new(io))
            .map_err(|e| Status::UnderlyingCodec(e.to_string()))?;
        let frame_count = image.num_loaded_keyframes();
        Ok(Box::new(JxlLoadState {
            image,
            index: 0,
            frame_count,
        }))
    }

    fn save_init<'io>(
        &self,
        _io: Box<dyn Io + 'io>,
        _options: SaveOptions,
    ) -> Result<Box<dyn SaveState + 'io>, Status> {
        Err(Status::NotImplemented("JPEG-XL encoding".to_string()))
    }
}

struct JxlLoadState {
    image: JxlImage,
    index: usize,
    frame_count: usize,
}

/// `bits_per_sample × num_color_channels + alpha_bits`.
fn pixel_format_for(format: JxlPixelFormat) -> PixelFormat {
    match format {
        JxlPixelFormat::Gray => PixelFormat::Bpp32GrayscaleFloat,
        JxlPixelFormat::Graya => PixelFormat::Bpp64GrayscaleAlphaFloat,
        JxlPixelFormat::Rgb => PixelFormat::Bpp96RgbFloat,
        JxlPixelFormat::Rgba => PixelFormat::Bpp128RgbaFloat,
        JxlPixelFormat::Cmyk | JxlPixelFormat::Cmyka => PixelFormat::Bpp128RgbaFloat,
    }
}

impl LoadState for JxlLoadState {
    fn seek_next_frame(&mut self, _stop: &dyn Stop) -> Result<Option<Image>, Status> {
        if self.index >= self.frame_count.max(1) {
            return Ok(None);
        }

        let render = self
            .image
            .render_frame(self.index)
            .map_err(|e| Status::UnderlyingCodec(e.to_string()))?;
        let fb = render.image();
        let format = pixel_format_for(fb.pixel_format());
        let width = fb.width() as u32;
        let height = fb.height() as u32;

        let mut image = Image::skeleton(width, height, format);

        if let Some(icc) = self.image.rendered_icc() {
            image.icc_profile = Some(crate::model::image::IccProfile {
                data: icc,
                name: "embedded".to_string(),
            });
        }

        // duration × 1000 × tps_denominator / tps_numerator.
        let header = self.image.image_header();
        let tps_num = header.metadata.animation.as_ref().map(|a| a.tps_numerator).unwrap_or(1).max(1);
        let tps_den = header.metadata.animation.as_ref().map(|a| a.tps_denominator).unwrap_or(1).max(1);
        let duration = render.duration();
        image.delay_ms = (duration as u64 * 1000 * tps_den as u64 / tps_num as u64) as i64;

        self.index += 1;
        Ok(Some(image))
    }

    fn frame(&mut self, image: &mut Image, _stop: &dyn Stop) -> Result<(), Status> {
        let render = self
            .image
            .render_frame(self.index - 1)
            .map_err(|e| Status::UnderlyingCodec(e.to_string()))?;
        let fb = render.image();
        let mut pixels = Vec::with_capacity(fb.buf().len() * 4);
        for sample in fb.buf() {
            pixels.extend_from_slice(&sample.to_be_bytes());
        }
        image.pixels = pixels;
        image.bytes_per_line = image.pixel_format.min_bytes_per_line(image.width);
        Ok(())
    }
}
