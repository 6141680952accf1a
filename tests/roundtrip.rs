//! Save-then-load round trips for every codec that implements both sides
//! of the ABI (PNM, HDR, PSD). GIF and WebP are decode-only in this crate
//! (see DESIGN.md) and are exercised in `corpus.rs` against hand-built
//! bitstreams instead.

use multipix::{Driver, Image, PixelFormat, Registry};

fn solid_image(width: u32, height: u32, format: PixelFormat, fill: &[u8]) -> Image {
    let mut image = Image::skeleton(width, height, format);
    image.allocate_pixels();
    let stride = image.bytes_per_line as usize;
    for row in 0..height {
        let line = image.row_mut(row);
        for chunk in line[..stride].chunks_mut(fill.len()) {
            chunk.copy_from_slice(&fill[..chunk.len()]);
        }
    }
    image
}

#[test]
fn pnm_rgb24_round_trips_through_bytes() {
    let image = solid_image(4, 3, PixelFormat::Bpp24Rgb, &[10, 20, 30]);
    let codec = Registry::global().codec_from_extension("ppm").unwrap();

    let bytes = Driver::save_to_bytes(&image, codec).expect("encode");
    let decoded = Driver::load_bytes(&bytes).expect("decode");

    assert_eq!(decoded.width, 4);
    assert_eq!(decoded.height, 3);
    assert_eq!(decoded.pixel_format, PixelFormat::Bpp24Rgb);
    assert_eq!(decoded.pixels, image.pixels);
}

#[test]
fn pnm_grayscale8_round_trips() {
    let image = solid_image(5, 2, PixelFormat::Bpp8Grayscale, &[128]);
    let codec = Registry::global().codec_from_extension("pgm").unwrap();

    let bytes = Driver::save_to_bytes(&image, codec).expect("encode");
    let decoded = Driver::load_bytes(&bytes).expect("decode");

    assert_eq!(decoded.pixel_format, PixelFormat::Bpp8Grayscale);
    assert_eq!(decoded.pixels, image.pixels);
}

#[test]
fn hdr_rgb_float_round_trips_through_file() {
    let mut image = Image::skeleton(2, 2, PixelFormat::Bpp96RgbFloat);
    image.allocate_pixels();
    for (i, chunk) in image.pixels.chunks_mut(4).enumerate() {
        chunk.copy_from_slice(&(i as f32 * 0.25).to_be_bytes());
    }

    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("out.hdr");
    let codec = Registry::global().codec_from_extension("hdr").unwrap();

    Driver::save(&image, &path, codec).expect("save");
    let decoded = Driver::load(&path).expect("load");

    assert_eq!(decoded.width, 2);
    assert_eq!(decoded.height, 2);
    assert_eq!(decoded.pixel_format, PixelFormat::Bpp96RgbFloat);
}

#[test]
fn psd_rgb24_round_trips_through_bytes() {
    let image = solid_image(6, 4, PixelFormat::Bpp24Rgb, &[200, 100, 50]);
    let codec = Registry::global().codec_from_extension("psd").unwrap();

    let bytes = Driver::save_to_bytes(&image, codec).expect("encode");
    let decoded = Driver::load_bytes(&bytes).expect("decode");

    assert_eq!(decoded.width, 6);
    assert_eq!(decoded.height, 4);
    assert_eq!(decoded.pixel_format, PixelFormat::Bpp24Rgb);
}

#[test]
fn probe_reads_dimensions_without_requiring_pixel_decode() {
    let image = solid_image(8, 6, PixelFormat::Bpp24Rgb, &[1, 2, 3]);
    let codec = Registry::global().codec_from_extension("ppm").unwrap();
    let bytes = Driver::save_to_bytes(&image, codec).expect("encode");

    let io: Box<dyn multipix::Io> = Box::new(multipix::SliceIo::new(&bytes));
    let (skeleton, info) = Driver::probe(io).expect("probe");

    assert_eq!(skeleton.width, 8);
    assert_eq!(skeleton.height, 6);
    assert_eq!(info.name, "PNM");
}

#[test]
fn gif_and_webp_save_report_not_implemented() {
    let image = solid_image(2, 2, PixelFormat::Bpp24Rgb, &[0, 0, 0]);
    for ext in ["gif", "webp"] {
        let codec = Registry::global().codec_from_extension(ext).unwrap();
        let err = Driver::save_to_bytes(&image, codec).unwrap_err();
        assert!(matches!(err, multipix::Status::NotImplemented(_)));
    }
}
