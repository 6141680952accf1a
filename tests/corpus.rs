//! Test corpus: roundtrip and hand-built-bitstream tests with various
//! patterns, sizes, and formats. GIF, HDR, and PSD's compressed code paths
//! are exercised here against minimal bitstreams assembled by hand, since
//! none of the three gets there through this crate's own encoder (GIF/WebP
//! are decode-only; PSD encodes uncompressed; HDR's own encoder always
//! emits flat scanlines — see DESIGN.md).

use multipix::{Driver, Image, Limits, LoadOptions, PixelFormat, Registry, SliceIo, Status};

fn checkerboard(width: u32, height: u32, a: [u8; 3], b: [u8; 3]) -> Image {
    let mut image = Image::skeleton(width, height, PixelFormat::Bpp24Rgb);
    image.allocate_pixels();
    for y in 0..height {
        let row = image.row_mut(y);
        for x in 0..width as usize {
            let color = if (x + y as usize) % 2 == 0 { a } else { b };
            row[x * 3..x * 3 + 3].copy_from_slice(&color);
        }
    }
    image
}

fn noise_pattern(width: u32, height: u32) -> Image {
    let mut image = Image::skeleton(width, height, PixelFormat::Bpp24Rgb);
    image.allocate_pixels();
    let mut state: u32 = 0xDEAD_BEEF;
    for byte in image.pixels.iter_mut() {
        state ^= state << 13;
        state ^= state >> 17;
        state ^= state << 5;
        *byte = state as u8;
    }
    image
}

fn ppm_roundtrip(image: &Image) -> Image {
    let codec = Registry::global().codec_from_extension("ppm").unwrap();
    let bytes = Driver::save_to_bytes(image, codec).expect("encode");
    Driver::load_bytes(&bytes).expect("decode")
}

// ── PNM patterns and edge cases ──────────────────────────────────────

#[test]
fn checkerboard_pattern_round_trips_losslessly() {
    let image = checkerboard(9, 7, [200, 20, 40], [10, 100, 230]);
    let decoded = ppm_roundtrip(&image);
    assert_eq!(decoded.pixels, image.pixels);
    assert_eq!((decoded.width, decoded.height), (9, 7));
}

#[test]
fn noise_pattern_round_trips_losslessly() {
    let image = noise_pattern(11, 13);
    let decoded = ppm_roundtrip(&image);
    assert_eq!(decoded.pixels, image.pixels);
}

#[test]
fn single_pixel_image_round_trips() {
    let image = checkerboard(1, 1, [77, 88, 99], [0, 0, 0]);
    let decoded = ppm_roundtrip(&image);
    assert_eq!(decoded.width, 1);
    assert_eq!(decoded.height, 1);
    assert_eq!(decoded.pixels, vec![77, 88, 99]);
}

#[test]
fn single_row_wide_image_round_trips() {
    let image = checkerboard(97, 1, [1, 2, 3], [4, 5, 6]);
    let decoded = ppm_roundtrip(&image);
    assert_eq!((decoded.width, decoded.height), (97, 1));
    assert_eq!(decoded.pixels, image.pixels);
}

#[test]
fn single_column_tall_image_round_trips() {
    let image = checkerboard(1, 97, [1, 2, 3], [4, 5, 6]);
    let decoded = ppm_roundtrip(&image);
    assert_eq!((decoded.width, decoded.height), (1, 97));
    assert_eq!(decoded.pixels, image.pixels);
}

#[test]
fn ascii_p3_ppm_decodes_to_rgb24() {
    let data = b"P3\n2 1\n255\n255 0 0 0 255 0\n";
    let decoded = Driver::load_bytes(data).expect("decode ascii ppm");
    assert_eq!(decoded.pixel_format, PixelFormat::Bpp24Rgb);
    assert_eq!((decoded.width, decoded.height), (2, 1));
    assert_eq!(decoded.pixels, vec![255, 0, 0, 0, 255, 0]);
}

#[test]
fn ascii_p1_bitmap_decodes_with_monochrome_palette() {
    // 3x1, bits: 1 0 1.
    let data = b"P1\n3 1\n1 0 1\n";
    let decoded = Driver::load_bytes(data).expect("decode ascii pbm");
    assert_eq!(decoded.pixel_format, PixelFormat::Bpp1Indexed);
    let palette = decoded.palette.as_ref().expect("default monochrome palette");
    assert_eq!(palette.color_count(), 2);
    // PBM convention: a set bit is black, so index 0 must be white and
    // index 1 black.
    assert_eq!(&palette.data[0..3], &[255, 255, 255]);
    assert_eq!(&palette.data[3..6], &[0, 0, 0]);
}

#[test]
fn pam_rgba_header_decodes_to_rgba32() {
    let mut data = Vec::new();
    data.extend_from_slice(b"P7\nWIDTH 2\nHEIGHT 1\nDEPTH 4\nMAXVAL 255\nTUPLTYPE RGB_ALPHA\nENDHDR\n");
    data.extend_from_slice(&[10, 20, 30, 255, 40, 50, 60, 128]);
    let decoded = Driver::load_bytes(&data).expect("decode pam rgba");
    assert_eq!(decoded.pixel_format, PixelFormat::Bpp32Rgba);
    assert_eq!(decoded.pixels, vec![10, 20, 30, 255, 40, 50, 60, 128]);
}

#[test]
fn limits_reject_images_wider_than_configured_maximum() {
    let image = checkerboard(10, 1, [1, 1, 1], [2, 2, 2]);
    let codec = Registry::global().codec_from_extension("ppm").unwrap();
    let bytes = Driver::save_to_bytes(&image, codec).expect("encode");

    let io: Box<dyn multipix::Io> = Box::new(SliceIo::new(&bytes));
    let limits = Limits { max_width: Some(4), ..Limits::none() };
    let mut session = Driver::start_loading_with(io, None, LoadOptions::new(), limits).expect("start");
    let err = session.next_frame().unwrap_err();
    assert!(matches!(err, Status::InvalidImageDimensions { .. }));
}

// ── GIF: hand-built LZW bitstream ────────────────────────────────────

#[test]
fn gif_hand_built_lzw_stream_decodes_to_solid_row() {
    // GIF87a, 3x1 canvas, a 4-entry global color table (index 0 = red),
    // one image using LZW min-code-size 2: clear(4), literal 0 x3.
    // Packed LSB-first into 3-bit codes: 0b100 then three 0b000 = bytes
    // [0x04, 0x00].
    let mut data = Vec::new();
    data.extend_from_slice(b"GIF87a");
    data.extend_from_slice(&3u16.to_le_bytes()); // width
    data.extend_from_slice(&1u16.to_le_bytes()); // height
    data.push(0x81); // GCT present, size = 2^(1+1) = 4
    data.push(0); // background color index
    data.push(0); // pixel aspect ratio
    data.extend_from_slice(&[255, 0, 0]); // index 0: red
    data.extend_from_slice(&[0, 255, 0]); // index 1: green
    data.extend_from_slice(&[0, 0, 255]); // index 2: blue
    data.extend_from_slice(&[255, 255, 255]); // index 3: white
    data.push(0x2C); // image descriptor
    data.extend_from_slice(&0u16.to_le_bytes()); // left
    data.extend_from_slice(&0u16.to_le_bytes()); // top
    data.extend_from_slice(&3u16.to_le_bytes()); // width
    data.extend_from_slice(&1u16.to_le_bytes()); // height
    data.push(0x00); // no local color table, not interlaced
    data.push(2); // LZW minimum code size
    data.push(2); // sub-block length
    data.extend_from_slice(&[0x04, 0x00]); // LZW data: clear, 0, 0, 0
    data.push(0); // block terminator
    data.push(0x3B); // trailer

    let decoded = Driver::load_bytes(&data).expect("decode hand-built gif");
    assert_eq!(decoded.pixel_format, PixelFormat::Bpp32Rgba);
    assert_eq!((decoded.width, decoded.height), (3, 1));
    assert_eq!(decoded.pixels, vec![255, 0, 0, 255, 255, 0, 0, 255, 255, 0, 0, 255]);
}

// ── HDR: hand-built flat RGBE scanlines ──────────────────────────────

#[test]
fn hdr_flat_rgbe_scanlines_decode_to_expected_floats() {
    // Width 2 is below the new-RLE minimum of 8, so the decoder always
    // takes the flat/old-RLE fallback for this stream, one 4-byte RGBE
    // pixel at a time.
    let mut data = Vec::new();
    data.extend_from_slice(b"#?RADIANCE\n");
    data.extend_from_slice(b"\n");
    data.extend_from_slice(b"-Y 2 +X 2\n");
    for _ in 0..4 {
        data.extend_from_slice(&[128, 64, 32, 128]);
    }

    let decoded = Driver::load_bytes(&data).expect("decode hand-built hdr");
    assert_eq!(decoded.pixel_format, PixelFormat::Bpp96RgbFloat);
    assert_eq!((decoded.width, decoded.height), (2, 2));

    let row = decoded.row(0);
    let r = f32::from_be_bytes(row[0..4].try_into().unwrap());
    let g = f32::from_be_bytes(row[4..8].try_into().unwrap());
    let b = f32::from_be_bytes(row[8..12].try_into().unwrap());
    assert!((r - 0.5).abs() < 1e-6);
    assert!((g - 0.25).abs() < 1e-6);
    assert!((b - 0.125).abs() < 1e-6);
}

#[test]
fn hdr_new_rle_scanline_decodes_to_expected_floats() {
    // S3: width 8 meets the new-RLE minimum, so each of the four RGBE
    // planes is separately run-length encoded behind a `02 02 hi lo`
    // scanline header. Every plane here is a single 8-long repeat run.
    let mut data = Vec::new();
    data.extend_from_slice(b"#?RADIANCE\n");
    data.extend_from_slice(b"FORMAT=32-bit_rle_rgbe\n");
    data.extend_from_slice(b"\n");
    data.extend_from_slice(b"-Y 1 +X 8\n");
    data.extend_from_slice(&[0x02, 0x02, 0x00, 0x08]);
    for plane_value in [128u8, 64, 32, 128] {
        data.push(128 + 8); // repeat-run header: next byte repeats 8 times
        data.push(plane_value);
    }

    let decoded = Driver::load_bytes(&data).expect("decode hand-built hdr new-RLE");
    assert_eq!(decoded.pixel_format, PixelFormat::Bpp96RgbFloat);
    assert_eq!((decoded.width, decoded.height), (8, 1));

    let row = decoded.row(0);
    for pixel in 0..8 {
        let base = pixel * 12;
        let r = f32::from_be_bytes(row[base..base + 4].try_into().unwrap());
        let g = f32::from_be_bytes(row[base + 4..base + 8].try_into().unwrap());
        let b = f32::from_be_bytes(row[base + 8..base + 12].try_into().unwrap());
        assert!((r - 0.5).abs() < 1e-6);
        assert!((g - 0.25).abs() < 1e-6);
        assert!((b - 0.125).abs() < 1e-6);
    }
}

// ── PSD: hand-built PackBits-compressed channel ──────────────────────

#[test]
fn psd_packbits_compressed_grayscale_channel_decodes() {
    let mut data = Vec::new();
    data.extend_from_slice(b"8BPS");
    data.extend_from_slice(&1u16.to_be_bytes()); // version
    data.extend_from_slice(&[0u8; 6]); // reserved
    data.extend_from_slice(&1u16.to_be_bytes()); // channels
    data.extend_from_slice(&1u32.to_be_bytes()); // height
    data.extend_from_slice(&4u32.to_be_bytes()); // width
    data.extend_from_slice(&8u16.to_be_bytes()); // depth
    data.extend_from_slice(&1u16.to_be_bytes()); // mode: grayscale
    data.extend_from_slice(&0u32.to_be_bytes()); // color mode data
    data.extend_from_slice(&0u32.to_be_bytes()); // image resources
    data.extend_from_slice(&0u32.to_be_bytes()); // layer and mask info
    data.extend_from_slice(&1u16.to_be_bytes()); // compression: RLE
    data.extend_from_slice(&2u16.to_be_bytes()); // byte count for the one row
    data.extend_from_slice(&[0xFD, 100]); // repeat 100 four times

    let decoded = Driver::load_bytes(&data).expect("decode hand-built psd");
    assert_eq!(decoded.pixel_format, PixelFormat::Bpp8Grayscale);
    assert_eq!((decoded.width, decoded.height), (4, 1));
    assert_eq!(decoded.pixels, vec![100, 100, 100, 100]);
}

// ── GIF: multi-frame walk, delay and disposal ────────────────────────

fn gce_block(delay_100ms: u16, disposal: u8) -> Vec<u8> {
    let mut block = vec![0x21, 0xF9, 0x04]; // extension introducer, GCE label, block size
    block.push(disposal << 2); // packed: disposal bits, no transparency
    block.extend_from_slice(&delay_100ms.to_le_bytes());
    block.push(0); // transparent color index (unused)
    block.push(0); // block terminator
    block
}

fn image_descriptor(left: u16, top: u16, width: u16, height: u16, color_index: u8) -> Vec<u8> {
    let mut block = vec![0x2C];
    block.extend_from_slice(&left.to_le_bytes());
    block.extend_from_slice(&top.to_le_bytes());
    block.extend_from_slice(&width.to_le_bytes());
    block.extend_from_slice(&height.to_le_bytes());
    block.push(0x00); // no local color table, not interlaced
    block.push(2); // LZW minimum code size
    // clear(4), literal `color_index`, twice.
    block.push(2); // sub-block length
    block.extend_from_slice(&[0x04 | ((color_index as u16) << 3) as u8, 0x00]);
    block.push(0); // block terminator
    block
}

#[test]
fn gif_multi_frame_walk_reports_each_frames_delay_and_disposal_result() {
    // 2x1 canvas, a 4-entry global color table, two single-pixel-wide frames:
    // frame 1 paints index 0 (red) with a 50ms delay and "restore to
    // background" disposal; frame 2 paints index 1 (green) with a 100ms delay.
    let mut data = Vec::new();
    data.extend_from_slice(b"GIF89a");
    data.extend_from_slice(&2u16.to_le_bytes());
    data.extend_from_slice(&1u16.to_le_bytes());
    data.push(0x81); // GCT present, size 4
    data.push(0);
    data.push(0);
    data.extend_from_slice(&[255, 0, 0]); // 0: red
    data.extend_from_slice(&[0, 255, 0]); // 1: green
    data.extend_from_slice(&[0, 0, 255]); // 2: blue
    data.extend_from_slice(&[0, 0, 0]); // 3: black

    data.extend_from_slice(&gce_block(5, 2)); // 50ms, restore-to-background
    data.extend_from_slice(&image_descriptor(0, 0, 1, 1, 0));

    data.extend_from_slice(&gce_block(10, 0)); // 100ms, unspecified disposal
    data.extend_from_slice(&image_descriptor(1, 0, 1, 1, 1));

    data.push(0x3B);

    let io: Box<dyn multipix::Io> = Box::new(SliceIo::new(&data));
    let mut session = Driver::start_loading(io, None).expect("start loading");

    let first = session.next_frame().expect("frame 1").expect("present");
    assert_eq!(first.delay_ms, 50);
    assert_eq!(&first.pixels[0..4], &[255, 0, 0, 255], "frame 1 paints red at x=0");
    assert_eq!(&first.pixels[4..8], &[0, 0, 0, 0], "x=1 untouched before frame 2 arrives");

    let second = session.next_frame().expect("frame 2").expect("present");
    assert_eq!(second.delay_ms, 100);
    // Frame 1's "restore to background" disposal clears its rect before
    // frame 2 is composited, so x=0 goes back to transparent black...
    assert_eq!(&second.pixels[0..4], &[0, 0, 0, 0]);
    // ...while frame 2 paints green at x=1.
    assert_eq!(&second.pixels[4..8], &[0, 255, 0, 255]);

    assert!(session.next_frame().expect("no more frames").is_none());
}
