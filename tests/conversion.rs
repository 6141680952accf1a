//! Pixel-format conversion coverage: fast-path pairs, the general
//! canonical-RGBA path, closest-format search, and geometry transforms.

use multipix::convert::{closest_pixel_format, convert, mirror_horizontal, rotate_90, ConvertOptions};
use multipix::{Image, PixelFormat};

fn image_from_rows(width: u32, height: u32, format: PixelFormat, bytes: &[u8]) -> Image {
    let mut image = Image::skeleton(width, height, format);
    image.allocate_pixels();
    image.pixels.copy_from_slice(bytes);
    image
}

#[test]
fn rgb24_to_bgr24_swaps_channel_order() {
    // One red, one green, one blue pixel.
    let src = image_from_rows(3, 1, PixelFormat::Bpp24Rgb, &[255, 0, 0, 0, 255, 0, 0, 0, 255]);
    let out = convert(&src, PixelFormat::Bpp24Bgr, ConvertOptions::default()).expect("convert");

    assert_eq!(out.pixel_format, PixelFormat::Bpp24Bgr);
    assert_eq!(out.pixels, vec![0, 0, 255, 0, 255, 0, 255, 0, 0]);
}

#[test]
fn rgba32_to_rgb24_drops_alpha() {
    let src = image_from_rows(2, 1, PixelFormat::Bpp32Rgba, &[10, 20, 30, 128, 40, 50, 60, 0]);
    let options = ConvertOptions { blend_alpha: false, ..ConvertOptions::default() };
    let out = convert(&src, PixelFormat::Bpp24Rgb, options).expect("convert");

    assert_eq!(out.pixel_format, PixelFormat::Bpp24Rgb);
    assert_eq!(out.pixels, vec![10, 20, 30, 40, 50, 60]);
}

#[test]
fn identity_conversion_is_passthrough() {
    let src = image_from_rows(2, 2, PixelFormat::Bpp24Rgb, &[1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12]);
    let out = convert(&src, PixelFormat::Bpp24Rgb, ConvertOptions::default()).expect("convert");
    assert_eq!(out.pixels, src.pixels);
}

#[test]
fn general_path_converts_grayscale_to_rgba() {
    let src = image_from_rows(2, 1, PixelFormat::Bpp8Grayscale, &[0, 255]);
    let out = convert(&src, PixelFormat::Bpp32Rgba, ConvertOptions::default()).expect("convert");

    assert_eq!(out.pixel_format, PixelFormat::Bpp32Rgba);
    assert_eq!(&out.pixels[0..4], &[0, 0, 0, 255]);
    assert_eq!(&out.pixels[4..8], &[255, 255, 255, 255]);
}

#[test]
fn rgba32_to_rgb24_blends_alpha_instead_of_taking_the_fast_path() {
    // Bpp32Rgba -> Bpp24Rgb is in the fast-path table (plain alpha-drop),
    // but with blend_alpha requested the alpha must be composited over
    // the background, not silently discarded.
    let src = image_from_rows(1, 1, PixelFormat::Bpp32Rgba, &[255, 0, 0, 128]);
    let options = ConvertOptions { blend_alpha: true, ..ConvertOptions::default() };
    let out = convert(&src, PixelFormat::Bpp24Rgb, options).expect("convert");

    // Half-transparent red over the default white background lands at
    // roughly the midpoint on green/blue, not at the dropped-alpha value.
    assert_eq!(out.pixels[0], 255);
    assert!(out.pixels[1] > 100 && out.pixels[1] < 160);
    assert!(out.pixels[2] > 100 && out.pixels[2] < 160);
}

#[test]
fn ycbcr_round_trips_back_to_rgb_within_rounding_tolerance() {
    let src = image_from_rows(1, 1, PixelFormat::Bpp24Rgb, &[200, 80, 40]);
    let ycbcr = convert(&src, PixelFormat::Bpp24Ycbcr, ConvertOptions::default()).expect("to ycbcr");
    assert_eq!(ycbcr.pixel_format, PixelFormat::Bpp24Ycbcr);
    let back = convert(&ycbcr, PixelFormat::Bpp24Rgb, ConvertOptions::default()).expect("back to rgb");

    for (a, b) in src.pixels.iter().zip(back.pixels.iter()) {
        assert!((*a as i16 - *b as i16).abs() <= 2, "{:?} vs {:?}", src.pixels, back.pixels);
    }
}

#[test]
fn lab_round_trips_back_to_rgb_within_rounding_tolerance() {
    let src = image_from_rows(1, 1, PixelFormat::Bpp24Rgb, &[180, 120, 60]);
    let lab = convert(&src, PixelFormat::Bpp24Lab, ConvertOptions::default()).expect("to lab");
    assert_eq!(lab.pixel_format, PixelFormat::Bpp24Lab);
    let back = convert(&lab, PixelFormat::Bpp24Rgb, ConvertOptions::default()).expect("back to rgb");

    for (a, b) in src.pixels.iter().zip(back.pixels.iter()) {
        assert!((*a as i16 - *b as i16).abs() <= 3, "{:?} vs {:?}", src.pixels, back.pixels);
    }
}

#[test]
fn general_path_blends_alpha_over_background_when_target_has_no_alpha() {
    // Half-transparent red (ARGB, not in the fast-path table) over the
    // default white background should land roughly at the midpoint on the
    // green/blue channels, not at pure red.
    let src = image_from_rows(1, 1, PixelFormat::Bpp32Argb, &[128, 255, 0, 0]);
    let options = ConvertOptions { blend_alpha: true, ..ConvertOptions::default() };
    let out = convert(&src, PixelFormat::Bpp24Rgb, options).expect("convert");

    assert!(out.pixels[0] > 200); // red channel stays high
    assert!(out.pixels[1] > 100 && out.pixels[1] < 160); // green lifted by white background
}

#[test]
fn mirror_horizontal_reverses_each_row() {
    let mut image = image_from_rows(3, 1, PixelFormat::Bpp24Rgb, &[1, 1, 1, 2, 2, 2, 3, 3, 3]);
    mirror_horizontal(&mut image).expect("mirror");
    assert_eq!(image.pixels, vec![3, 3, 3, 2, 2, 2, 1, 1, 1]);
}

#[test]
fn rotate_90_swaps_dimensions() {
    let image = image_from_rows(2, 1, PixelFormat::Bpp24Rgb, &[1, 1, 1, 2, 2, 2]);
    let rotated = rotate_90(&image).expect("rotate");
    assert_eq!(rotated.width, image.height);
    assert_eq!(rotated.height, image.width);
}

#[test]
fn closest_pixel_format_prefers_same_family_and_depth() {
    let candidates = [PixelFormat::Bpp8Grayscale, PixelFormat::Bpp24Rgb, PixelFormat::Bpp32Rgba];
    let best = closest_pixel_format(PixelFormat::Bpp24Bgr, &candidates).expect("some candidate");
    assert_eq!(best, PixelFormat::Bpp24Rgb);
}

#[test]
fn converting_to_the_same_format_twice_is_idempotent() {
    let src = image_from_rows(2, 1, PixelFormat::Bpp32Rgba, &[1, 2, 3, 4, 5, 6, 7, 8]);
    let once = convert(&src, PixelFormat::Bpp24Rgb, ConvertOptions::default()).expect("convert");
    let twice = convert(&once, PixelFormat::Bpp24Rgb, ConvertOptions::default()).expect("convert");
    assert_eq!(once.pixels, twice.pixels);
}
