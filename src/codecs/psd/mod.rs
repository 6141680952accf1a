//! Photoshop PSD.
//!
//! PSD stores whole-image channels planar on disk (never interleaved), so
//! the decode path always ends with an explicit plane-interleave pass,
//! unlike every other codec here which decodes directly into the
//! interleaved target format. PackBits is the same scanline-RLE shape as
//! TIFF's PackBits compression, just applied per-channel here.

use enough::Stop;

use crate::codec::{Codec, LoadOptions, LoadState, SaveOptions, SaveState};
use crate::error::Status;
use crate::io::Io;
use crate::model::{Image, Palette, PixelFormat};
use crate::registry::{CodecInfo, Signature};

pub fn info() -> CodecInfo {
    CodecInfo {
        name: "PSD",
        description: "Adobe Photoshop Document",
        mime_types: &["image/vnd.adobe.photoshop"],
        extensions: &["psd", "psb"],
        signatures: &[Signature { offset: 0, pattern: b"8BPS" }],
        load_features: crate::codec::LoadFeatures {
            supports_source_image: true,
            ..Default::default()
        },
        save_features: crate::codec::SaveFeatures {
            accepted_pixel_formats: &[
                PixelFormat::Bpp1Indexed,
                PixelFormat::Bpp8Grayscale,
                PixelFormat::Bpp8Indexed,
                PixelFormat::Bpp24Rgb,
                PixelFormat::Bpp32Rgba,
                PixelFormat::Bpp32Cmyk,
            ],
            accepted_compressions: &[crate::model::Compression::None, crate::model::Compression::Rle],
            default_compression: crate::model::Compression::Rle,
            ..Default::default()
        },
    }
}

pub struct PsdCodec;

impl Codec for PsdCodec {
    fn load_init<'io>(
        &self,
        io: Box<dyn Io + 'io>,
        _options: LoadOptions,
    ) -> Result<Box<dyn LoadState + 'io>, Status> {
        Ok(Box::new(PsdLoadState { io, done: false, header: None }))
    }

    fn save_init<'io>(
        &self,
        io: Box<dyn Io + 'io>,
        _options: SaveOptions,
    ) -> Result<Box<dyn SaveState + 'io>, Status> {
        Ok(Box::new(PsdSaveState { io, done: false }))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ColorMode {
    Bitmap,
    Grayscale,
    Indexed,
    Rgb,
    Cmyk,
    Multichannel,
    Duotone,
    Lab,
}

impl ColorMode {
    fn from_u16(v: u16) -> Option<Self> {
        Some(match v {
            0 => ColorMode::Bitmap,
            1 => ColorMode::Grayscale,
            2 => ColorMode::Indexed,
            3 => ColorMode::Rgb,
            4 => ColorMode::Cmyk,
            7 => ColorMode::Multichannel,
            8 => ColorMode::Duotone,
            9 => ColorMode::Lab,
            _ => return None,
        })
    }
}

struct PsdHeader {
    channels: u16,
    width: u32,
    height: u32,
    depth: u16,
    mode: ColorMode,
}

fn read_u16(io: &mut dyn Io) -> Result<u16, Status> {
    let mut b = [0u8; 2];
    io.strict_read(&mut b)?;
    Ok(u16::from_be_bytes(b))
}

fn read_u32(io: &mut dyn Io) -> Result<u32, Status> {
    let mut b = [0u8; 4];
    io.strict_read(&mut b)?;
    Ok(u32::from_be_bytes(b))
}

fn parse_header(io: &mut dyn Io) -> Result<PsdHeader, Status> {
    let mut magic = [0u8; 4];
    io.strict_read(&mut magic)?;
    if &magic != b"8BPS" {
        return Err(Status::ParseFile("not a PSD file".into()));
    }
    let version = read_u16(io)?;
    if version != 1 {
        return Err(Status::UnsupportedCodecFeature(format!("PSD version {version}")));
    }
    let mut reserved = [0u8; 6];
    io.strict_read(&mut reserved)?;
    let channels = read_u16(io)?;
    let height = read_u32(io)?;
    let width = read_u32(io)?;
    let depth = read_u16(io)?;
    let mode_raw = read_u16(io)?;
    let mode = ColorMode::from_u16(mode_raw)
        .ok_or_else(|| Status::UnsupportedCodecFeature(format!("PSD color mode {mode_raw}")))?;
    Ok(PsdHeader { channels, width, height, depth, mode })
}

/// Reads the color-mode-data section; returns a palette for Indexed mode.
fn read_color_mode_data(io: &mut dyn Io, mode: ColorMode) -> Result<Option<Palette>, Status> {
    let len = read_u32(io)?;
    if len == 0 {
        if mode == ColorMode::Indexed {
            // Open question in the format grammar: indexed mode with no
            // color table has no defined behavior here, so this errors
            // rather than guessing a palette.
            return Err(Status::ParseFile("PSD indexed mode with zero-length color data".into()));
        }
        return Ok(None);
    }
    let mut data = vec![0u8; len as usize];
    io.strict_read(&mut data)?;
    if mode != ColorMode::Indexed {
        return Ok(None);
    }
    if data.len() < 768 {
        return Err(Status::ParseFile("PSD indexed color table is short".into()));
    }
    // R plane, G plane, B plane, 256 bytes each — transpose to interleaved RGB.
    let mut rgb = Vec::with_capacity(768);
    for i in 0..256 {
        rgb.push(data[i]);
        rgb.push(data[256 + i]);
        rgb.push(data[512 + i]);
    }
    Ok(Some(Palette { pixel_format: PixelFormat::Bpp24Rgb, data: rgb }))
}

fn skip_length_prefixed(io: &mut dyn Io) -> Result<(), Status> {
    let len = read_u32(io)?;
    io.seek(len as i64, crate::io::Whence::Cur)
}

fn target_format(header: &PsdHeader) -> Result<PixelFormat, Status> {
    use ColorMode::*;
    let has_alpha = match header.mode {
        Rgb => header.channels >= 4,
        Grayscale => header.channels >= 2,
        Cmyk => header.channels >= 5,
        _ => false,
    };
    Ok(match (header.mode, header.depth, has_alpha) {
        (Bitmap, 1, _) => PixelFormat::Bpp1Indexed,
        (Indexed, 8, _) => PixelFormat::Bpp8Indexed,
        (Grayscale, 8, false) => PixelFormat::Bpp8Grayscale,
        (Grayscale, 16, false) => PixelFormat::Bpp16Grayscale,
        (Grayscale, 8, true) => PixelFormat::Bpp8GrayscaleAlpha,
        (Grayscale, 16, true) => PixelFormat::Bpp16GrayscaleAlpha,
        (Rgb, 8, false) => PixelFormat::Bpp24Rgb,
        (Rgb, 16, false) => PixelFormat::Bpp48Rgb,
        (Rgb, 8, true) => PixelFormat::Bpp32Rgba,
        (Rgb, 16, true) => PixelFormat::Bpp64Rgba,
        (Cmyk, 8, false) => PixelFormat::Bpp32Cmyk,
        (Cmyk, 16, false) => PixelFormat::Bpp64Cmyk,
        (Cmyk, 8, true) => PixelFormat::Bpp40Cmyka,
        (Cmyk, 16, true) => PixelFormat::Bpp80Cmyka,
        (Lab, 8, false) => PixelFormat::Bpp24Lab,
        _ => return Err(Status::UnsupportedPixelFormat),
    })
}

struct PsdLoadState<'io> {
    io: Box<dyn Io + 'io>,
    done: bool,
    header: Option<PsdHeader>,
}

impl LoadState for PsdLoadState<'_> {
    fn seek_next_frame(&mut self, _stop: &dyn Stop) -> Result<Option<Image>, Status> {
        if self.done {
            return Ok(None);
        }
        self.done = true;
        let header = parse_header(self.io.as_mut())?;
        if header.width == 0 || header.height == 0 {
            return Err(Status::InvalidImageDimensions { width: header.width, height: header.height });
        }
        let palette = read_color_mode_data(self.io.as_mut(), header.mode)?;
        skip_length_prefixed(self.io.as_mut())?; // image resources
        skip_length_prefixed(self.io.as_mut())?; // layer and mask info

        let format = target_format(&header)?;
        let mut skeleton = Image::skeleton(header.width, header.height, format);
        skeleton.palette = palette.or_else(|| {
            (format == PixelFormat::Bpp1Indexed).then(Palette::default_monochrome)
        });
        self.header = Some(header);
        Ok(Some(skeleton))
    }

    fn frame(&mut self, image: &mut Image, _stop: &dyn Stop) -> Result<(), Status> {
        let header = self.header.take().ok_or(Status::ConflictingOperation)?;
        decode_planes(self.io.as_mut(), &header, image)
    }
}

fn decode_planes(io: &mut dyn Io, header: &PsdHeader, image: &mut Image) -> Result<(), Status> {
    let compression = read_u16(io)?;
    let width = header.width as usize;
    let height = header.height as usize;
    let bytes_per_sample = if header.depth == 16 { 2 } else { 1 };
    let row_samples = if header.depth == 1 { (width + 7) / 8 } else { width };

    let mut planes = Vec::with_capacity(header.channels as usize);

    match compression {
        0 => {
            for _ in 0..header.channels {
                let mut plane = vec![0u8; row_samples * bytes_per_sample * height];
                io.strict_read(&mut plane)?;
                planes.push(plane);
            }
        }
        1 => {
            // Byte-count table: height * channels rows, 2 bytes each, big-endian.
            let mut counts = vec![0u16; header.channels as usize * height];
            for c in counts.iter_mut() {
                *c = read_u16(io)?;
            }
            for ch in 0..header.channels as usize {
                let mut plane = Vec::with_capacity(row_samples * bytes_per_sample * height);
                for row in 0..height {
                    let compressed_len = counts[ch * height + row] as usize;
                    let mut compressed = vec![0u8; compressed_len];
                    io.strict_read(&mut compressed)?;
                    packbits_decode(&compressed, row_samples * bytes_per_sample, &mut plane);
                }
                planes.push(plane);
            }
        }
        other => {
            return Err(Status::UnsupportedCodecFeature(format!(
                "PSD compression mode {other}"
            )))
        }
    }

    interleave_planes(&planes, header, image);
    Ok(())
}

/// PackBits: `c > 128` → repeat the next byte `(c ^ 0xFF) + 2` times;
/// `c < 128` → literal run of `c + 1` bytes; `c == 128` is a no-op.
fn packbits_decode(input: &[u8], expected_len: usize, out: &mut Vec<u8>) {
    let mut i = 0;
    let start = out.len();
    while i < input.len() && out.len() - start < expected_len {
        let c = input[i];
        i += 1;
        if c == 128 {
            continue;
        } else if c > 128 {
            let run = (c ^ 0xFF) as usize + 2;
            if i < input.len() {
                let byte = input[i];
                i += 1;
                out.extend(std::iter::repeat(byte).take(run));
            }
        } else {
            let run = c as usize + 1;
            let end = (i + run).min(input.len());
            out.extend_from_slice(&input[i..end]);
            i = end;
        }
    }
    out.resize(start + expected_len, 0);
}

fn interleave_planes(planes: &[Vec<u8>], header: &PsdHeader, image: &mut Image) {
    let width = header.width as usize;
    let height = header.height as usize;
    let channels = header.channels as usize;
    let bytes_per_sample = if header.depth == 16 { 2 } else { 1 };
    let row_samples = if header.depth == 1 { (width + 7) / 8 } else { width };
    let plane_channel_stride = row_samples * bytes_per_sample;

    if header.depth == 1 {
        // Single-channel packed bitmap: copy directly, no interleave needed.
        for y in 0..height {
            let src = &planes[0][y * plane_channel_stride..(y + 1) * plane_channel_stride];
            image.row_mut(y as u32)[..src.len()].copy_from_slice(src);
        }
        return;
    }

    let out_channels = image.pixel_format.channels() as usize;
    for y in 0..height {
        let dst = image.row_mut(y as u32);
        for x in 0..width {
            for c in 0..channels.min(out_channels) {
                let plane = &planes[c];
                let src_off = y * plane_channel_stride + x * bytes_per_sample;
                let dst_off = (x * out_channels + c) * bytes_per_sample;
                dst[dst_off..dst_off + bytes_per_sample]
                    .copy_from_slice(&plane[src_off..src_off + bytes_per_sample]);
            }
        }
    }
}

struct PsdSaveState<'io> {
    io: Box<dyn Io + 'io>,
    done: bool,
}

impl SaveState for PsdSaveState<'_> {
    fn seek_next_frame(&mut self, image: &Image, _stop: &dyn Stop) -> Result<(), Status> {
        if self.done {
            return Err(Status::UnsupportedCodecFeature("PSD does not support animation".into()));
        }
        self.done = true;
        let (mode, channels, depth): (u16, u16, u16) = match image.pixel_format {
            PixelFormat::Bpp1Indexed => (0, 1, 1),
            PixelFormat::Bpp8Grayscale => (1, 1, 8),
            PixelFormat::Bpp8Indexed => (2, 1, 8),
            PixelFormat::Bpp24Rgb => (3, 3, 8),
            PixelFormat::Bpp32Rgba => (3, 4, 8),
            PixelFormat::Bpp32Cmyk => (4, 4, 8),
            _ => return Err(Status::UnsupportedPixelFormat),
        };
        self.io.strict_write(b"8BPS")?;
        self.io.strict_write(&1u16.to_be_bytes())?;
        self.io.strict_write(&[0u8; 6])?;
        self.io.strict_write(&channels.to_be_bytes())?;
        self.io.strict_write(&image.height.to_be_bytes())?;
        self.io.strict_write(&image.width.to_be_bytes())?;
        self.io.strict_write(&depth.to_be_bytes())?;
        self.io.strict_write(&mode.to_be_bytes())?;

        // Color-mode data: empty, except Indexed which writes its palette
        // transposed to planar RR…GG…BB….
        if mode == 2 {
            let palette = image.palette.as_ref().ok_or(Status::MissingPalette)?;
            self.io.strict_write(&768u32.to_be_bytes())?;
            let mut planar = vec![0u8; 768];
            for i in 0..256.min(palette.color_count()) {
                planar[i] = palette.data[i * 3];
                planar[256 + i] = palette.data[i * 3 + 1];
                planar[512 + i] = palette.data[i * 3 + 2];
            }
            self.io.strict_write(&planar)?;
        } else {
            self.io.strict_write(&0u32.to_be_bytes())?;
        }
        self.io.strict_write(&0u32.to_be_bytes())?; // image resources
        self.io.strict_write(&0u32.to_be_bytes())?; // layer and mask info
        self.io.strict_write(&0u16.to_be_bytes())?; // compression: none
        Ok(())
    }

    fn frame(&mut self, image: &Image, _stop: &dyn Stop) -> Result<(), Status> {
        let width = image.width as usize;
        let height = image.height as usize;
        let out_channels = image.pixel_format.channels() as usize;
        let bytes_per_sample = if image.pixel_format.is_16_bit_per_channel() { 2 } else { 1 };

        if image.pixel_format == PixelFormat::Bpp1Indexed {
            for y in 0..height {
                let row = image.row(y as u32);
                self.io.strict_write(&row[..(width + 7) / 8])?;
            }
            return Ok(());
        }

        for c in 0..out_channels {
            for y in 0..height {
                let row = image.row(y as u32);
                let mut plane_row = vec![0u8; width * bytes_per_sample];
                for x in 0..width {
                    let src_off = (x * out_channels + c) * bytes_per_sample;
                    let dst_off = x * bytes_per_sample;
                    plane_row[dst_off..dst_off + bytes_per_sample]
                        .copy_from_slice(&row[src_off..src_off + bytes_per_sample]);
                }
                self.io.strict_write(&plane_row)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packbits_literal_run() {
        let mut out = Vec::new();
        // c=2 (literal run of 3) then 3 data bytes.
        packbits_decode(&[2, 10, 20, 30], 3, &mut out);
        assert_eq!(out, vec![10, 20, 30]);
    }

    #[test]
    fn packbits_repeat_run() {
        let mut out = Vec::new();
        // c=0xFD (253) => run = (253^0xFF)+2 = 4, repeat next byte 4 times.
        packbits_decode(&[0xFD, 99], 4, &mut out);
        assert_eq!(out, vec![99, 99, 99, 99]);
    }

    #[test]
    fn packbits_noop_byte_is_skipped() {
        let mut out = Vec::new();
        packbits_decode(&[128, 1, 5, 6], 2, &mut out);
        assert_eq!(out, vec![5, 6]);
    }
}
