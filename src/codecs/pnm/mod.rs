//! PNM/PAM/PFM (P1–P7).
//!
//! Covers the full P1–P7 + PFM grammar, driven through this crate's
//! `Io`/`Codec` traits rather than a one-shot byte-slice entry point.
//!
//! Multi-byte in-memory samples are big-endian throughout this crate (see
//! DESIGN.md, "Sample endianness") rather than literally host-endian — PNM
//! samples are already big-endian on disk, so this is a no-op swap here and
//! keeps every codec's in-memory layout uniform.

use enough::Stop;

use crate::codec::{Codec, LoadOptions, LoadState, SaveOptions, SaveState};
use crate::error::Status;
use crate::io::Io;
use crate::model::{Image, Palette, PixelFormat};
use crate::registry::{CodecInfo, Signature};

pub fn info() -> CodecInfo {
    CodecInfo {
        name: "PNM",
        description: "Portable Any-map (PBM/PGM/PPM/PAM/PFM)",
        mime_types: &["image/x-portable-anymap"],
        extensions: &["pbm", "pgm", "ppm", "pam", "pnm", "pfm"],
        signatures: &[
            Signature { offset: 0, pattern: b"P1" },
            Signature { offset: 0, pattern: b"P2" },
            Signature { offset: 0, pattern: b"P3" },
            Signature { offset: 0, pattern: b"P4" },
            Signature { offset: 0, pattern: b"P5" },
            Signature { offset: 0, pattern: b"P6" },
            Signature { offset: 0, pattern: b"P7" },
            Signature { offset: 0, pattern: b"PF" },
            Signature { offset: 0, pattern: b"Pf" },
        ],
        load_features: crate::codec::LoadFeatures::default(),
        save_features: crate::codec::SaveFeatures {
            accepted_pixel_formats: &[
                PixelFormat::Bpp1Indexed,
                PixelFormat::Bpp8Grayscale,
                PixelFormat::Bpp16Grayscale,
                PixelFormat::Bpp24Rgb,
                PixelFormat::Bpp48Rgb,
                PixelFormat::Bpp96RgbFloat,
            ],
            ..Default::default()
        },
    }
}

pub struct PnmCodec;

impl Codec for PnmCodec {
    fn load_init<'io>(
        &self,
        io: Box<dyn Io + 'io>,
        _options: LoadOptions,
    ) -> Result<Box<dyn LoadState + 'io>, Status> {
        Ok(Box::new(PnmLoadState { io, done: false, header: None }))
    }

    fn save_init<'io>(
        &self,
        io: Box<dyn Io + 'io>,
        options: SaveOptions,
    ) -> Result<Box<dyn SaveState + 'io>, Status> {
        Ok(Box::new(PnmSaveState { io, done: false, options }))
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Kind {
    Bitmap,    // P1/P4
    Grayscale, // P2/P5
    Rgb,       // P3/P6
    Pam,       // P7
    Pfm { color: bool },
}

struct Header {
    kind: Kind,
    ascii: bool,
    width: u32,
    height: u32,
    maxval: u32,
    depth: u32,
    pfm_scale: f32,
}

fn skip_whitespace_and_comments(io: &mut dyn Io) -> Result<u8, Status> {
    loop {
        let b = io.read_byte()?.ok_or(Status::ParseFile("unexpected end of PNM header".into()))?;
        if b == b'#' {
            while !matches!(io.read_byte()?, None | Some(b'\n')) {}
            continue;
        }
        if b.is_ascii_whitespace() {
            continue;
        }
        return Ok(b);
    }
}

fn read_token(io: &mut dyn Io) -> Result<String, Status> {
    let first = skip_whitespace_and_comments(io)?;
    let mut token = vec![first];
    loop {
        match io.read_byte()? {
            Some(b) if !b.is_ascii_whitespace() => token.push(b),
            _ => break,
        }
    }
    Ok(String::from_utf8_lossy(&token).to_string())
}

fn read_uint(io: &mut dyn Io) -> Result<u32, Status> {
    read_token(io)?
        .parse()
        .map_err(|_| Status::ParseFile("expected integer in PNM header".into()))
}

fn parse_header(io: &mut dyn Io) -> Result<Header, Status> {
    let mut magic = [0u8; 2];
    io.strict_read(&mut magic)?;
    match &magic {
        b"P1" => Ok(Header { kind: Kind::Bitmap, ascii: true, width: read_uint(io)?, height: read_uint(io)?, maxval: 1, depth: 1, pfm_scale: 1.0 }),
        b"P4" => Ok(Header { kind: Kind::Bitmap, ascii: false, width: read_uint(io)?, height: read_uint(io)?, maxval: 1, depth: 1, pfm_scale: 1.0 }),
        b"P2" | b"P5" => {
            let ascii = &magic == b"P2";
            let width = read_uint(io)?;
            let height = read_uint(io)?;
            let maxval = read_uint(io)?;
            // read_token already consumed the single separating whitespace byte.
            Ok(Header { kind: Kind::Grayscale, ascii, width, height, maxval, depth: 1, pfm_scale: 1.0 })
        }
        b"P3" | b"P6" => {
            let ascii = &magic == b"P3";
            let width = read_uint(io)?;
            let height = read_uint(io)?;
            let maxval = read_uint(io)?;
            Ok(Header { kind: Kind::Rgb, ascii, width, height, maxval, depth: 3, pfm_scale: 1.0 })
        }
        b"P7" => parse_pam_header(io),
        b"PF" | b"Pf" => {
            let color = &magic == b"PF";
            let width = read_uint(io)?;
            let height = read_uint(io)?;
            let scale: f32 = read_token(io)?
                .parse()
                .map_err(|_| Status::ParseFile("bad PFM scale".into()))?;
            Ok(Header {
                kind: Kind::Pfm { color },
                ascii: false,
                width,
                height,
                maxval: 255,
                depth: if color { 3 } else { 1 },
                pfm_scale: scale,
            })
        }
        _ => Err(Status::ParseFile("not a recognized PNM magic".into())),
    }
}

fn parse_pam_header(io: &mut dyn Io) -> Result<Header, Status> {
    let (mut width, mut height, mut depth, mut maxval) = (0u32, 0u32, 0u32, 255u32);
    loop {
        let line = read_pam_line(io)?;
        let mut parts = line.split_whitespace();
        match parts.next() {
            Some("WIDTH") => width = parts.next().and_then(|v| v.parse().ok()).unwrap_or(0),
            Some("HEIGHT") => height = parts.next().and_then(|v| v.parse().ok()).unwrap_or(0),
            Some("DEPTH") => depth = parts.next().and_then(|v| v.parse().ok()).unwrap_or(0),
            Some("MAXVAL") => maxval = parts.next().and_then(|v| v.parse().ok()).unwrap_or(255),
            Some("TUPLTYPE") | Some("#") | None => {}
            Some("ENDHDR") => break,
            _ => {}
        }
    }
    Ok(Header { kind: Kind::Pam, ascii: false, width, height, maxval, depth, pfm_scale: 1.0 })
}

fn read_pam_line(io: &mut dyn Io) -> Result<String, Status> {
    let mut line = Vec::new();
    loop {
        match io.read_byte()? {
            None => break,
            Some(b'\n') => break,
            Some(b) => line.push(b),
        }
    }
    Ok(String::from_utf8_lossy(&line).to_string())
}

fn target_pixel_format(header: &Header) -> PixelFormat {
    match header.kind {
        Kind::Bitmap => PixelFormat::Bpp1Indexed,
        Kind::Grayscale => {
            if header.maxval > 255 {
                PixelFormat::Bpp16Grayscale
            } else {
                PixelFormat::Bpp8Grayscale
            }
        }
        Kind::Rgb => {
            if header.maxval > 255 {
                PixelFormat::Bpp48Rgb
            } else {
                PixelFormat::Bpp24Rgb
            }
        }
        Kind::Pam => match (header.depth, header.maxval > 255) {
            (1, false) => PixelFormat::Bpp8Grayscale,
            (1, true) => PixelFormat::Bpp16Grayscale,
            (2, false) => PixelFormat::Bpp8GrayscaleAlpha,
            (2, true) => PixelFormat::Bpp16GrayscaleAlpha,
            (3, false) => PixelFormat::Bpp24Rgb,
            (3, true) => PixelFormat::Bpp48Rgb,
            (4, false) => PixelFormat::Bpp32Rgba,
            (4, true) => PixelFormat::Bpp64Rgba,
            _ => PixelFormat::Unknown,
        },
        Kind::Pfm { color } => {
            if color {
                PixelFormat::Bpp96RgbFloat
            } else {
                PixelFormat::Bpp32GrayscaleFloat
            }
        }
    }
}

struct PnmLoadState<'io> {
    io: Box<dyn Io + 'io>,
    done: bool,
    header: Option<Header>,
}

impl LoadState for PnmLoadState<'_> {
    fn seek_next_frame(&mut self, _stop: &dyn Stop) -> Result<Option<Image>, Status> {
        if self.done {
            return Ok(None);
        }
        self.done = true;
        let header = parse_header(self.io.as_mut())?;
        if header.width == 0 || header.height == 0 {
            return Err(Status::InvalidImageDimensions { width: header.width, height: header.height });
        }
        let format = target_pixel_format(&header);
        if format == PixelFormat::Unknown {
            return Err(Status::UnsupportedPixelFormat);
        }
        let mut skeleton = Image::skeleton(header.width, header.height, format);
        if format == PixelFormat::Bpp1Indexed {
            skeleton.palette = Some(Palette::default_monochrome());
        }
        self.header = Some(header);
        Ok(Some(skeleton))
    }

    fn frame(&mut self, image: &mut Image, _stop: &dyn Stop) -> Result<(), Status> {
        let header = self.header.take().ok_or(Status::ConflictingOperation)?;
        decode_body(self.io.as_mut(), &header, image)
    }
}

fn decode_body(io: &mut dyn Io, header: &Header, image: &mut Image) -> Result<(), Status> {
    let width = header.width as usize;
    let height = header.height as usize;

    match header.kind {
        Kind::Bitmap => {
            for y in 0..height {
                let row = image.row_mut(y as u32);
                if header.ascii {
                    for x in 0..width {
                        let bit = read_token(io)?.trim().parse::<u8>().unwrap_or(0);
                        set_bit(row, x, bit != 0);
                    }
                } else {
                    let bytes = (width + 7) / 8;
                    let mut buf = vec![0u8; bytes];
                    io.strict_read(&mut buf)?;
                    row[..bytes].copy_from_slice(&buf);
                }
            }
        }
        Kind::Grayscale | Kind::Rgb | Kind::Pam => {
            let is16 = header.maxval > 255;
            let sample_bytes = if is16 { 2 } else { 1 };
            let channels = header.depth.max(1) as usize;
            for y in 0..height {
                let row = image.row_mut(y as u32);
                for x in 0..width {
                    for c in 0..channels {
                        let raw = if header.ascii {
                            read_uint(io)?
                        } else if is16 {
                            let mut b = [0u8; 2];
                            io.strict_read(&mut b)?;
                            u16::from_be_bytes(b) as u32
                        } else {
                            let mut b = [0u8; 1];
                            io.strict_read(&mut b)?;
                            b[0] as u32
                        };
                        let scaled = scale_sample(raw, header.maxval, is16);
                        let offset = x * channels * sample_bytes + c * sample_bytes;
                        if is16 {
                            row[offset..offset + 2].copy_from_slice(&(scaled as u16).to_be_bytes());
                        } else {
                            row[offset] = scaled as u8;
                        }
                    }
                }
            }
        }
        Kind::Pfm { .. } => {
            // PFM rows are stored bottom-to-top on disk; this crate always
            // emits top-to-bottom, so rows are reversed on load.
            let channels = header.depth as usize;
            for y in (0..height).rev() {
                let row = image.row_mut(y as u32);
                for x in 0..width {
                    for c in 0..channels {
                        let mut b = [0u8; 4];
                        io.strict_read(&mut b)?;
                        // Negative scale means little-endian samples, positive
                        // means big-endian (PFM convention).
                        let v = if header.pfm_scale.is_sign_negative() {
                            f32::from_le_bytes(b)
                        } else {
                            f32::from_be_bytes(b)
                        };
                        let offset = (x * channels + c) * 4;
                        row[offset..offset + 4].copy_from_slice(&v.to_be_bytes());
                    }
                }
            }
        }
    }
    Ok(())
}

fn scale_sample(raw: u32, maxval: u32, is16: bool) -> u32 {
    let target_max = if is16 { 65535 } else { 255 };
    if maxval == target_max || maxval == 0 {
        raw.min(target_max)
    } else {
        ((raw as u64 * target_max as u64) / maxval as u64) as u32
    }
}

fn set_bit(row: &mut [u8], x: usize, black: bool) {
    let byte = x / 8;
    let shift = 7 - (x % 8);
    if black {
        row[byte] |= 1 << shift;
    } else {
        row[byte] &= !(1 << shift);
    }
}

struct PnmSaveState<'io> {
    io: Box<dyn Io + 'io>,
    done: bool,
    #[allow(dead_code)]
    options: SaveOptions,
}

impl SaveState for PnmSaveState<'_> {
    fn seek_next_frame(&mut self, image: &Image, _stop: &dyn Stop) -> Result<(), Status> {
        if self.done {
            return Err(Status::UnsupportedCodecFeature("PNM does not support animation".into()));
        }
        self.done = true;
        let header = match image.pixel_format {
            PixelFormat::Bpp1Indexed => format!("P4\n{} {}\n", image.width, image.height),
            PixelFormat::Bpp8Grayscale => format!("P5\n{} {}\n255\n", image.width, image.height),
            PixelFormat::Bpp16Grayscale => format!("P5\n{} {}\n65535\n", image.width, image.height),
            PixelFormat::Bpp24Rgb => format!("P6\n{} {}\n255\n", image.width, image.height),
            PixelFormat::Bpp48Rgb => format!("P6\n{} {}\n65535\n", image.width, image.height),
            PixelFormat::Bpp96RgbFloat => format!("PF\n{} {}\n-1.0\n", image.width, image.height),
            _ => return Err(Status::UnsupportedPixelFormat),
        };
        self.io.strict_write(header.as_bytes())
    }

    fn frame(&mut self, image: &Image, _stop: &dyn Stop) -> Result<(), Status> {
        let width = image.width as usize;
        match image.pixel_format {
            PixelFormat::Bpp1Indexed => {
                for y in 0..image.height {
                    let row = image.row(y);
                    let bytes = (width + 7) / 8;
                    self.io.strict_write(&row[..bytes])?;
                }
            }
            PixelFormat::Bpp8Grayscale | PixelFormat::Bpp24Rgb => {
                for y in 0..image.height {
                    let row = image.row(y);
                    let stride = row.len().min(width * image.pixel_format.channels() as usize);
                    self.io.strict_write(&row[..stride])?;
                }
            }
            PixelFormat::Bpp16Grayscale | PixelFormat::Bpp48Rgb => {
                for y in 0..image.height {
                    let row = image.row(y);
                    let stride = width * image.pixel_format.channels() as usize * 2;
                    self.io.strict_write(&row[..stride])?;
                }
            }
            PixelFormat::Bpp96RgbFloat => {
                // PFM rows are bottom-to-top on disk.
                for y in (0..image.height).rev() {
                    let row = image.row(y);
                    for x in 0..width {
                        for c in 0..3 {
                            let off = (x * 3 + c) * 4;
                            let v = f32::from_be_bytes(row[off..off + 4].try_into().unwrap());
                            self.io.strict_write(&v.to_le_bytes())?;
                        }
                    }
                }
            }
            _ => return Err(Status::UnsupportedPixelFormat),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scale_sample_identity_at_target_max() {
        assert_eq!(scale_sample(200, 255, false), 200);
    }

    #[test]
    fn scale_sample_rescales_nonstandard_maxval() {
        assert_eq!(scale_sample(15, 15, false), 255);
        assert_eq!(scale_sample(0, 15, false), 0);
    }
}
