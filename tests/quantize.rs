//! Wu quantization and Floyd-Steinberg dithering coverage.

use multipix::convert::{convert, ConvertOptions};
use multipix::quantize::quantize;
use multipix::{Image, PixelFormat};

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

#[test]
fn quantize_to_bpp8indexed_attaches_an_rgb24_palette() {
    let image = checkerboard(8, 8, [255, 0, 0], [0, 0, 255]);
    let out = quantize(&image, PixelFormat::Bpp8Indexed, false).expect("quantize");

    assert_eq!(out.pixel_format, PixelFormat::Bpp8Indexed);
    let palette = out.palette.as_ref().expect("palette");
    assert_eq!(palette.pixel_format, PixelFormat::Bpp24Rgb);
    assert!(palette.color_count() <= 256);
    assert!(palette.color_count() >= 1);
}

#[test]
fn two_color_image_quantizes_to_two_palette_entries_or_fewer() {
    let image = checkerboard(8, 8, [255, 0, 0], [0, 0, 255]);
    let out = quantize(&image, PixelFormat::Bpp1Indexed, false).expect("quantize");
    let palette = out.palette.as_ref().expect("palette");
    assert!(palette.color_count() <= 2);
}

#[test]
fn quantizing_a_solid_color_image_yields_a_single_palette_entry() {
    let image = checkerboard(4, 4, [100, 150, 200], [100, 150, 200]);
    let out = quantize(&image, PixelFormat::Bpp8Indexed, false).expect("quantize");
    let palette = out.palette.as_ref().expect("palette");
    assert_eq!(palette.color_count(), 1);
    assert_eq!(&palette.data[0..3], &[100, 150, 200]);
}

#[test]
fn every_index_addresses_a_valid_palette_entry() {
    let image = checkerboard(6, 6, [10, 20, 30], [200, 210, 220]);
    let out = quantize(&image, PixelFormat::Bpp8Indexed, true).expect("quantize");
    out.check_indexed_pixels_bpp8().expect("valid indices");
}

#[test]
fn finer_bit_depth_never_allocates_fewer_colors_than_a_coarser_one() {
    // Monotonicity: K(1-bit) <= K(2-bit) <= K(4-bit) <= K(8-bit) for a
    // source with plenty of distinct colors to spend the budget on.
    let mut image = Image::skeleton(16, 16, PixelFormat::Bpp24Rgb);
    image.allocate_pixels();
    for y in 0..16u32 {
        let row = image.row_mut(y);
        for x in 0..16usize {
            row[x * 3] = (x * 16) as u8;
            row[x * 3 + 1] = (y as usize * 16) as u8;
            row[x * 3 + 2] = ((x + y as usize) * 8) as u8;
        }
    }

    let counts: Vec<usize> = [
        PixelFormat::Bpp1Indexed,
        PixelFormat::Bpp2Indexed,
        PixelFormat::Bpp4Indexed,
        PixelFormat::Bpp8Indexed,
    ]
    .iter()
    .map(|&fmt| {
        quantize(&image, fmt, false)
            .expect("quantize")
            .palette
            .expect("palette")
            .color_count()
    })
    .collect();

    for pair in counts.windows(2) {
        assert!(pair[0] <= pair[1], "counts should be non-decreasing: {counts:?}");
    }
}

#[test]
fn three_distinct_colors_quantize_one_to_one_into_a_four_entry_palette() {
    // S5: a 3x1 RGB strip of pure red/green/blue quantized to 2-bit indexed
    // (K=4) should keep all three colors distinct, each addressed by its
    // own palette index.
    let mut image = Image::skeleton(3, 1, PixelFormat::Bpp24Rgb);
    image.allocate_pixels();
    image.pixels.copy_from_slice(&[255, 0, 0, 0, 255, 0, 0, 0, 255]);

    let out = quantize(&image, PixelFormat::Bpp2Indexed, false).expect("quantize");
    let palette = out.palette.as_ref().expect("palette");
    assert!(palette.color_count() <= 4);
    assert_eq!(palette.color_count(), 3);

    let colors: Vec<[u8; 3]> = (0..palette.color_count())
        .map(|i| [palette.data[i * 3], palette.data[i * 3 + 1], palette.data[i * 3 + 2]])
        .collect();
    for expected in [[255u8, 0, 0], [0, 255, 0], [0, 0, 255]] {
        assert!(colors.contains(&expected), "missing {expected:?} in {colors:?}");
    }
}

#[test]
fn quantizing_through_convert_routes_indexed_targets_to_the_quantizer() {
    let image = checkerboard(4, 4, [255, 255, 0], [0, 255, 255]);
    let out = convert(&image, PixelFormat::Bpp8Indexed, ConvertOptions::default()).expect("convert");
    assert_eq!(out.pixel_format, PixelFormat::Bpp8Indexed);
    assert!(out.palette.is_some());
}
