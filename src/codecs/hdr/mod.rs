//! HDR / Radiance RGBE.
//!
//! ASCII header until a blank line, then a resolution line, then either
//! old-style or new-style RLE scanlines of shared-exponent RGBE pixels.
//! Single-frame only — Radiance has no animation concept.

use std::collections::HashMap;

use enough::Stop;

use crate::codec::{Codec, LoadOptions, LoadState, SaveOptions, SaveState};
use crate::error::Status;
use crate::io::Io;
use crate::model::metadata::{MetaData, MetaDataKey};
use crate::model::{Image, PixelFormat};
use crate::registry::{CodecInfo, Signature};
use crate::variant::Variant;

pub fn info() -> CodecInfo {
    CodecInfo {
        name: "HDR",
        description: "Radiance RGBE",
        mime_types: &["image/vnd.radiance"],
        extensions: &["hdr", "pic"],
        signatures: &[
            Signature {
                offset: 0,
                pattern: b"#?RADIANCE",
            },
            Signature {
                offset: 0,
                pattern: b"#?RGBE",
            },
        ],
        load_features: crate::codec::LoadFeatures {
            supports_metadata: true,
            ..Default::default()
        },
        save_features: crate::codec::SaveFeatures {
            accepted_pixel_formats: &[PixelFormat::Bpp96RgbFloat],
            accepted_compressions: &[crate::model::image::Compression::Rle],
            default_compression: crate::model::image::Compression::Rle,
            ..Default::default()
        },
    }
}

pub struct HdrCodec;

impl Codec for HdrCodec {
    fn load_init<'io>(
        &self,
        io: Box<dyn Io + 'io>,
        _options: LoadOptions,
    ) -> Result<Box<dyn LoadState + 'io>, Status> {
        Ok(Box::new(HdrLoadState { io, done: false }))
    }

    fn save_init<'io>(
        &self,
        io: Box<dyn Io + 'io>,
        _options: SaveOptions,
    ) -> Result<Box<dyn SaveState + 'io>, Status> {
        Ok(Box::new(HdrSaveState { io, done: false }))
    }
}

struct HdrLoadState<'io> {
    io: Box<dyn Io + 'io>,
    done: bool,
}

fn read_line(io: &mut dyn Io) -> Result<Option<String>, Status> {
    let mut line = Vec::new();
    loop {
        match io.read_byte()? {
            None => {
                if line.is_empty() {
                    return Ok(None);
                }
                break;
            }
            Some(b'\n') => break,
            Some(b) => line.push(b),
        }
    }
    Ok(Some(String::from_utf8_lossy(&line).trim_end_matches('\r').to_string()))
}

impl LoadState for HdrLoadState<'_> {
    fn seek_next_frame(&mut self, _stop: &dyn Stop) -> Result<Option<Image>, Status> {
        if self.done {
            return Ok(None);
        }
        self.done = true;

        let magic = read_line(self.io.as_mut())?.ok_or(Status::ParseFile("empty HDR stream".into()))?;
        if !magic.starts_with("#?RADIANCE") && !magic.starts_with("#?RGBE") {
            return Err(Status::ParseFile("missing Radiance magic".into()));
        }

        let mut meta_data = Vec::new();
        let mut software: Option<String> = None;
        let mut special = crate::variant::Properties::new();
        let resolution_line;
        loop {
            let line = read_line(self.io.as_mut())?.ok_or(Status::ParseFile("truncated HDR header".into()))?;
            if line.is_empty() {
                resolution_line = read_line(self.io.as_mut())?
                    .ok_or(Status::ParseFile("missing resolution line".into()))?;
                break;
            }
            if let Some(rest) = line.strip_prefix('#') {
                if software.is_none() {
                    software = Some(rest.trim().to_string());
                }
                continue;
            }
            if let Some((key, value)) = line.split_once('=') {
                match key {
                    "EXPOSURE" => {
                        if let Ok(v) = value.parse::<f64>() {
                            special.insert("hdr-exposure".into(), Variant::Double(v));
                        }
                    }
                    "GAMMA" => {
                        if let Ok(v) = value.parse::<f64>() {
                            special.insert("hdr-gamma".into(), Variant::Double(v));
                        }
                    }
                    "FORMAT" => {
                        special.insert("hdr-format".into(), Variant::String(value.to_string()));
                    }
                    "VIEW" | "PRIMARIES" | "COLORCORR" => {
                        special.insert(
                            format!("hdr-{}", key.to_lowercase()),
                            Variant::String(value.to_string()),
                        );
                    }
                    _ => {}
                }
            }
        }
        if let Some(software) = software {
            meta_data.push(MetaData::string(MetaDataKey::Software, software));
        }

        let (height, width) = parse_resolution(&resolution_line)?;

        let mut skeleton = Image::skeleton(width, height, PixelFormat::Bpp96RgbFloat);
        skeleton.meta_data = meta_data;
        skeleton.special_properties = special;
        Ok(Some(skeleton))
    }

    fn frame(&mut self, image: &mut Image, _stop: &dyn Stop) -> Result<(), Status> {
        let width = image.width as usize;
        let height = image.height as usize;
        let mut rshift;
        for y in 0..height {
            let mut rgbe_row = vec![[0u8; 4]; width];
            let mut peek = [0u8; 4];
            let got = self.io.tolerant_read(&mut peek)?;
            let is_new_rle = got == 4
                && peek[0] == 2
                && peek[1] == 2
                && ((peek[2] as usize) << 8 | peek[3] as usize) == width
                && (8..=32767).contains(&width);

            if is_new_rle {
                for channel in 0..4 {
                    let mut x = 0;
                    while x < width {
                        let c = read_u8(self.io.as_mut())?;
                        if c > 128 {
                            let count = (c & 0x7F) as usize;
                            let value = read_u8(self.io.as_mut())?;
                            for _ in 0..count {
                                rgbe_row[x][channel] = value;
                                x += 1;
                            }
                        } else {
                            let count = c as usize;
                            for _ in 0..count {
                                rgbe_row[x][channel] = read_u8(self.io.as_mut())?;
                                x += 1;
                            }
                        }
                    }
                }
            } else {
                // Old RLE / flat RGBE, starting from the 4 bytes already peeked.
                rshift = 0;
                let mut x = 0;
                let mut pending = Some(peek);
                let mut prev = [0u8; 4];
                while x < width {
                    let rgbe = match pending.take() {
                        Some(b) => b,
                        None => read_rgbe(self.io.as_mut())?,
                    };
                    if rgbe[0] == 1 && rgbe[1] == 1 && rgbe[2] == 1 {
                        let count = (rgbe[3] as usize) << rshift;
                        for _ in 0..count {
                            if x >= width {
                                break;
                            }
                            rgbe_row[x] = prev;
                            x += 1;
                        }
                        rshift += 8;
                    } else {
                        rgbe_row[x] = rgbe;
                        prev = rgbe;
                        rshift = 0;
                        x += 1;
                    }
                }
            }

            let row = image.row_mut(y as u32);
            for (x, rgbe) in rgbe_row.iter().enumerate() {
                let (r, g, b) = rgbe_to_float(*rgbe);
                row[x * 12..x * 12 + 4].copy_from_slice(&r.to_be_bytes());
                row[x * 12 + 4..x * 12 + 8].copy_from_slice(&g.to_be_bytes());
                row[x * 12 + 8..x * 12 + 12].copy_from_slice(&b.to_be_bytes());
            }
        }
        Ok(())
    }
}

fn read_u8(io: &mut dyn Io) -> Result<u8, Status> {
    let mut b = [0u8; 1];
    io.strict_read(&mut b)?;
    Ok(b[0])
}

fn read_rgbe(io: &mut dyn Io) -> Result<[u8; 4], Status> {
    let mut b = [0u8; 4];
    io.strict_read(&mut b)?;
    Ok(b)
}

fn parse_resolution(line: &str) -> Result<(u32, u32), Status> {
    // "{+|-}Y n {+|-}X m" — sign determines scanline direction; this crate
    // always emits top-to-bottom, left-to-right, so only the magnitudes are consumed.
    let parts: Vec<&str> = line.split_whitespace().collect();
    if parts.len() != 4 {
        return Err(Status::ParseFile(format!("malformed resolution line: {line}")));
    }
    let height = parts[1]
        .parse::<u32>()
        .map_err(|_| Status::ParseFile("bad height in resolution line".into()))?;
    let width = parts[3]
        .parse::<u32>()
        .map_err(|_| Status::ParseFile("bad width in resolution line".into()))?;
    Ok((height, width))
}

/// RGBE → linear float RGB.
fn rgbe_to_float(rgbe: [u8; 4]) -> (f32, f32, f32) {
    if rgbe[3] == 0 {
        return (0.0, 0.0, 0.0);
    }
    let f = ldexp(1.0, rgbe[3] as i32 - (128 + 8));
    (rgbe[0] as f32 * f, rgbe[1] as f32 * f, rgbe[2] as f32 * f)
}

/// Float RGB → RGBE.
fn float_to_rgbe(r: f32, g: f32, b: f32) -> [u8; 4] {
    let max = r.max(g).max(b);
    if max < 1e-32 {
        return [0, 0, 0, 0];
    }
    let (mantissa, exponent) = frexp(max);
    let scale = mantissa * 256.0 / max;
    [
        (r * scale).floor() as u8,
        (g * scale).floor() as u8,
        (b * scale).floor() as u8,
        (exponent + 128) as u8,
    ]
}

fn ldexp(x: f32, exp: i32) -> f32 {
    x * 2f32.powi(exp)
}

fn frexp(x: f32) -> (f32, i32) {
    if x == 0.0 {
        return (0.0, 0);
    }
    let bits = x.to_bits();
    let exponent = ((bits >> 23) & 0xFF) as i32 - 126;
    let mantissa = f32::from_bits((bits & 0x807FFFFF) | (126 << 23));
    (mantissa, exponent)
}

struct HdrSaveState<'io> {
    io: Box<dyn Io + 'io>,
    done: bool,
}

impl SaveState for HdrSaveState<'_> {
    fn seek_next_frame(&mut self, image: &Image, _stop: &dyn Stop) -> Result<(), Status> {
        if self.done {
            return Err(Status::UnsupportedCodecFeature("HDR does not support animation".into()));
        }
        if image.pixel_format != PixelFormat::Bpp96RgbFloat {
            return Err(Status::UnsupportedPixelFormat);
        }
        self.io.strict_write(b"#?RADIANCE\n")?;
        self.io.strict_write(b"FORMAT=32-bit_rle_rgbe\n\n")?;
        self.io
            .strict_write(format!("-Y {} +X {}\n", image.height, image.width).as_bytes())?;
        self.done = true;
        Ok(())
    }

    fn frame(&mut self, image: &Image, _stop: &dyn Stop) -> Result<(), Status> {
        let width = image.width as usize;
        for y in 0..image.height {
            let row = image.row(y);
            for x in 0..width {
                let r = f32::from_be_bytes(row[x * 12..x * 12 + 4].try_into().unwrap());
                let g = f32::from_be_bytes(row[x * 12 + 4..x * 12 + 8].try_into().unwrap());
                let b = f32::from_be_bytes(row[x * 12 + 8..x * 12 + 12].try_into().unwrap());
                let rgbe = float_to_rgbe(r, g, b);
                self.io.strict_write(&rgbe)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rgbe_float_roundtrip_within_tolerance() {
        let original = (2.0f32, 0.5f32, 10.0f32);
        let rgbe = float_to_rgbe(original.0, original.1, original.2);
        let (r, g, b) = rgbe_to_float(rgbe);
        assert!((r - original.0).abs() / original.0 < 1.0 / 256.0);
        assert!((g - original.1).abs() / original.1 < 1.0 / 256.0);
        assert!((b - original.2).abs() / original.2 < 1.0 / 256.0);
    }

    #[test]
    fn rgbe_zero_exponent_is_black() {
        assert_eq!(rgbe_to_float([10, 20, 30, 0]), (0.0, 0.0, 0.0));
    }

    #[test]
    fn resolution_line_parses_magnitudes() {
        assert_eq!(parse_resolution("-Y 10 +X 20").unwrap(), (10, 20));
    }
}
