//! Animated WebP.
//!
//! The RIFF container demuxing (locating `VP8X`/`ANIM`/`ANMF` chunks,
//! extracting each frame's dispose/blend flags) and the canvas-composition
//! algorithm are this crate's own code — the wrapped `image-webp` crate
//! only decodes a single static bitstream into RGBA8, so each `ANMF`
//! sub-chunk is re-wrapped into a minimal standalone RIFF/WEBP buffer and
//! handed to it individually.

use std::io::Cursor;

use enough::Stop;

use crate::codec::{Codec, LoadOptions, LoadState, SaveOptions, SaveState};
use crate::error::Status;
use crate::io::Io;
use crate::model::{Image, MetaData, MetaDataKey, PixelFormat};
use crate::registry::{CodecInfo, Signature};

pub fn info() -> CodecInfo {
    CodecInfo {
        name: "WEBP",
        description: "WebP (RIFF container, possibly animated)",
        mime_types: &["image/webp"],
        extensions: &["webp"],
        signatures: &[Signature { offset: 0, pattern: b"RIFF" }],
        load_features: crate::codec::LoadFeatures {
            supports_animated: true,
            supports_metadata: true,
            supports_iccp: true,
            ..Default::default()
        },
        save_features: crate::codec::SaveFeatures::default(),
    }
}

pub struct WebpCodec;

impl Codec for WebpCodec {
    fn load_init<'io>(
        &self,
        mut io: Box<dyn Io + 'io>,
        _options: LoadOptions,
    ) -> Result<Box<dyn LoadState + 'io>, Status> {
        let mut bytes = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let n = io.tolerant_read(&mut chunk)?;
            if n == 0 {
                break;
            }
            bytes.extend_from_slice(&chunk[..n]);
        }
        let container = Container::parse(&bytes)?;
        Ok(Box::new(WebpLoadState { container, index: 0, canvas: None }))
    }

    fn save_init<'io>(
        &self,
        _io: Box<dyn Io + 'io>,
        _options: SaveOptions,
    ) -> Result<Box<dyn SaveState + 'io>, Status> {
        Err(Status::NotImplemented("WebP encoding".into()))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Dispose {
    None,
    Background,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Blend {
    Blend,
    NoBlend,
}

struct Frame {
    x: u32,
    y: u32,
    width: u32,
    height: u32,
    duration_ms: u32,
    dispose: Dispose,
    blend: Blend,
    bitstream: Vec<u8>, // a standalone RIFF/WEBP buffer for this frame's image
}

struct Container {
    canvas_width: u32,
    canvas_height: u32,
    background: [u8; 4], // BGRA as stored in the ANIM chunk
    icc_profile: Option<Vec<u8>>,
    exif: Option<Vec<u8>>,
    xmp: Option<String>,
    frames: Vec<Frame>,
}

fn read_u32_le(b: &[u8]) -> u32 {
    u32::from_le_bytes([b[0], b[1], b[2], b[3]])
}

fn read_u24_le(b: &[u8]) -> u32 {
    u32::from_le_bytes([b[0], b[1], b[2], 0])
}

impl Container {
    fn parse(data: &[u8]) -> Result<Self, Status> {
        if data.len() < 12 || &data[0..4] != b"RIFF" || &data[8..12] != b"WEBP" {
            return Err(Status::ParseFile("not a RIFF/WEBP container".into()));
        }
        let mut pos = 12usize;
        let mut canvas_width = 0u32;
        let mut canvas_height = 0u32;
        let mut background = [255u8, 255, 255, 255];
        let mut icc_profile = None;
        let mut exif = None;
        let mut xmp = None;
        let mut frames = Vec::new();
        let mut animated = false;
        let mut static_bitstream: Option<Vec<u8>> = None;

        while pos + 8 <= data.len() {
            let fourcc = &data[pos..pos + 4];
            let size = read_u32_le(&data[pos + 4..pos + 8]) as usize;
            let body_start = pos + 8;
            let body_end = (body_start + size).min(data.len());
            let body = &data[body_start..body_end];

            match fourcc {
                b"VP8X" => {
                    if body.len() >= 10 {
                        canvas_width = read_u24_le(&body[4..7]) + 1;
                        canvas_height = read_u24_le(&body[7..10]) + 1;
                    }
                }
                b"ANIM" => {
                    animated = true;
                    if body.len() >= 4 {
                        background = [body[0], body[1], body[2], body[3]];
                    }
                }
                b"ANMF" => {
                    frames.push(parse_anmf(body)?);
                }
                b"ICCP" => icc_profile = Some(body.to_vec()),
                b"EXIF" => exif = Some(body.to_vec()),
                b"XMP " => xmp = Some(String::from_utf8_lossy(body).to_string()),
                b"VP8 " | b"VP8L" => {
                    static_bitstream = Some(wrap_single_image(fourcc, body));
                }
                _ => {}
            }

            pos = body_end + (size % 2); // chunks are padded to even length
        }

        if !animated {
            let bitstream = static_bitstream
                .ok_or_else(|| Status::ParseFile("WebP container has no image data".into()))?;
            let (w, h) = peek_dimensions(&bitstream)?;
            frames.push(Frame {
                x: 0,
                y: 0,
                width: w,
                height: h,
                duration_ms: 0,
                dispose: Dispose::None,
                blend: Blend::NoBlend,
                bitstream,
            });
            canvas_width = w;
            canvas_height = h;
        }

        if canvas_width == 0 || canvas_height == 0 {
            return Err(Status::InvalidImageDimensions { width: canvas_width, height: canvas_height });
        }

        Ok(Container { canvas_width, canvas_height, background, icc_profile, exif, xmp, frames })
    }
}

fn parse_anmf(body: &[u8]) -> Result<Frame, Status> {
    if body.len() < 16 {
        return Err(Status::ParseFile("truncated ANMF chunk".into()));
    }
    let x = read_u24_le(&body[0..3]) * 2;
    let y = read_u24_le(&body[3..6]) * 2;
    let width = read_u24_le(&body[6..9]) + 1;
    let height = read_u24_le(&body[9..12]) + 1;
    let duration_ms = read_u24_le(&body[12..15]);
    let flags = body[15];
    let blend = if flags & 0b10 != 0 { Blend::NoBlend } else { Blend::Blend };
    let dispose = if flags & 0b01 != 0 { Dispose::Background } else { Dispose::None };

    let mut sub = &body[16..];
    let mut bitstream = None;
    while sub.len() >= 8 {
        let fourcc = &sub[0..4];
        let size = read_u32_le(&sub[4..8]) as usize;
        let chunk_end = (8 + size).min(sub.len());
        let chunk_body = &sub[8..chunk_end];
        if fourcc == b"VP8 " || fourcc == b"VP8L" {
            bitstream = Some(wrap_single_image(fourcc, chunk_body));
        }
        sub = &sub[(chunk_end + (size % 2)).min(sub.len())..];
    }

    Ok(Frame {
        x,
        y,
        width,
        height,
        duration_ms,
        dispose,
        blend,
        bitstream: bitstream.ok_or_else(|| Status::ParseFile("ANMF frame has no bitstream".into()))?,
    })
}

/// Wraps a bare `VP8 `/`VP8L` chunk body back into a minimal standalone
/// RIFF/WEBP container `image-webp` can decode on its own.
fn wrap_single_image(fourcc: &[u8], body: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(20 + body.len());
    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&((4 + 8 + body.len()) as u32).to_le_bytes());
    out.extend_from_slice(b"WEBP");
    out.extend_from_slice(fourcc);
    out.extend_from_slice(&(body.len() as u32).to_le_bytes());
    out.extend_from_slice(body);
    if body.len() % 2 == 1 {
        out.push(0);
    }
    out
}

fn peek_dimensions(standalone: &[u8]) -> Result<(u32, u32), Status> {
    let decoder = image_webp::WebPDecoder::new(Cursor::new(standalone))
        .map_err(|e| Status::UnderlyingCodec(e.to_string()))?;
    Ok(decoder.dimensions())
}

fn decode_frame_rgba(bitstream: &[u8]) -> Result<(u32, u32, Vec<u8>, bool), Status> {
    let mut decoder = image_webp::WebPDecoder::new(Cursor::new(bitstream))
        .map_err(|e| Status::UnderlyingCodec(e.to_string()))?;
    let (w, h) = decoder.dimensions();
    let has_alpha = decoder.has_alpha();
    let mut buf = vec![0u8; decoder.output_buffer_size().unwrap_or(w as usize * h as usize * 4)];
    decoder
        .read_image(&mut buf)
        .map_err(|e| Status::UnderlyingCodec(e.to_string()))?;
    if !has_alpha && buf.len() == w as usize * h as usize * 3 {
        // Decoder returned tightly-packed RGB; expand to RGBA (opaque).
        let mut rgba = vec![255u8; w as usize * h as usize * 4];
        for (src, dst) in buf.chunks_exact(3).zip(rgba.chunks_exact_mut(4)) {
            dst[..3].copy_from_slice(src);
        }
        return Ok((w, h, rgba, false));
    }
    Ok((w, h, buf, has_alpha))
}

struct WebpLoadState {
    container: Container,
    index: usize,
    canvas: Option<Vec<u8>>, // RGBA8, canvas_width * canvas_height * 4
}

impl LoadState for WebpLoadState {
    fn seek_next_frame(&mut self, _stop: &dyn Stop) -> Result<Option<Image>, Status> {
        if self.index >= self.container.frames.len() {
            return Ok(None);
        }
        let mut skeleton = Image::skeleton(
            self.container.canvas_width,
            self.container.canvas_height,
            PixelFormat::Bpp32Rgba,
        );
        if self.index == 0 {
            if let Some(icc) = &self.container.icc_profile {
                skeleton.icc_profile = Some(crate::model::IccProfile { data: icc.clone(), name: String::new() });
            }
            if let Some(exif) = &self.container.exif {
                skeleton.meta_data.push(MetaData::bytes(MetaDataKey::Exif, exif.clone()));
            }
            if let Some(xmp) = &self.container.xmp {
                skeleton.meta_data.push(MetaData::string(MetaDataKey::Xmp, xmp.clone()));
            }
        }
        Ok(Some(skeleton))
    }

    fn frame(&mut self, image: &mut Image, _stop: &dyn Stop) -> Result<(), Status> {
        let canvas_w = self.container.canvas_width as usize;
        let canvas_h = self.container.canvas_height as usize;

        if self.canvas.is_none() {
            let bg = &self.container.background;
            let mut canvas = vec![0u8; canvas_w * canvas_h * 4];
            for px in canvas.chunks_exact_mut(4) {
                // ANIM background is stored BGRA.
                px.copy_from_slice(&[bg[2], bg[1], bg[0], bg[3]]);
            }
            self.canvas = Some(canvas);
        } else {
            // Apply the *previous* frame's disposal before decoding this one.
            let prev = &self.container.frames[self.index - 1];
            if prev.dispose == Dispose::Background {
                let canvas = self.canvas.as_mut().unwrap();
                fill_rect(canvas, canvas_w, prev.x as usize, prev.y as usize, prev.width as usize, prev.height as usize, [0, 0, 0, 0]);
            }
        }

        let frame = &self.container.frames[self.index];
        let (fw, fh, pixels, _has_alpha) = decode_frame_rgba(&frame.bitstream)?;
        let canvas = self.canvas.as_mut().unwrap();

        match frame.blend {
            Blend::NoBlend => {
                blit_rect(canvas, canvas_w, frame.x as usize, frame.y as usize, fw as usize, fh as usize, &pixels);
            }
            Blend::Blend => {
                blend_rect(canvas, canvas_w, frame.x as usize, frame.y as usize, fw as usize, fh as usize, &pixels);
            }
        }

        image.pixels.copy_from_slice(canvas);
        image.delay_ms = if frame.duration_ms == 0 { 100 } else { frame.duration_ms as i64 };
        self.index += 1;
        Ok(())
    }
}

fn fill_rect(canvas: &mut [u8], canvas_w: usize, x: usize, y: usize, w: usize, h: usize, color: [u8; 4]) {
    for row in y..y + h {
        for col in x..x + w {
            let off = (row * canvas_w + col) * 4;
            canvas[off..off + 4].copy_from_slice(&color);
        }
    }
}

fn blit_rect(canvas: &mut [u8], canvas_w: usize, x: usize, y: usize, w: usize, h: usize, pixels: &[u8]) {
    for row in 0..h {
        let dst_off = ((y + row) * canvas_w + x) * 4;
        let src_off = row * w * 4;
        canvas[dst_off..dst_off + w * 4].copy_from_slice(&pixels[src_off..src_off + w * 4]);
    }
}

/// Source-over compositing of the decoded frame onto the canvas rectangle.
fn blend_rect(canvas: &mut [u8], canvas_w: usize, x: usize, y: usize, w: usize, h: usize, pixels: &[u8]) {
    for row in 0..h {
        for col in 0..w {
            let dst_off = ((y + row) * canvas_w + (x + col)) * 4;
            let src_off = (row * w + col) * 4;
            let sa = pixels[src_off + 3] as f64 / 255.0;
            let da = canvas[dst_off + 3] as f64 / 255.0;
            let out_a = sa + (1.0 - sa) * da;
            for c in 0..3 {
                let sc = pixels[src_off + c] as f64 / 255.0;
                let dc = canvas[dst_off + c] as f64 / 255.0;
                let out_c = if out_a > 0.0 { (sa * sc + (1.0 - sa) * da * dc) / out_a } else { 0.0 };
                canvas[dst_off + c] = (out_c * 255.0).round().clamp(0.0, 255.0) as u8;
            }
            canvas[dst_off + 3] = (out_a * 255.0).round().clamp(0.0, 255.0) as u8;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrap_single_image_round_trips_riff_header() {
        let body = [1u8, 2, 3, 4];
        let wrapped = wrap_single_image(b"VP8 ", &body);
        assert_eq!(&wrapped[0..4], b"RIFF");
        assert_eq!(&wrapped[8..12], b"WEBP");
        assert_eq!(&wrapped[12..16], b"VP8 ");
    }

    #[test]
    fn blend_rect_is_opaque_over_opaque() {
        let mut canvas = vec![0u8, 0, 0, 255];
        let pixels = vec![255u8, 0, 0, 255];
        blend_rect(&mut canvas, 1, 0, 0, 1, 1, &pixels);
        assert_eq!(canvas, vec![255, 0, 0, 255]);
    }
}
