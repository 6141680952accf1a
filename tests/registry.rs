//! Codec registry resolution: extension, MIME, and magic-byte lookup.

use multipix::{Io, Registry, SliceIo, Status};

#[test]
fn codecs_list_is_stable_and_non_empty() {
    let registry = Registry::global();
    let names: Vec<&str> = registry.codecs().iter().map(|c| c.name).collect();
    assert!(!names.is_empty());
    // Calling global() twice returns the same memoized list.
    let names2: Vec<&str> = Registry::global().codecs().iter().map(|c| c.name).collect();
    assert_eq!(names, names2);
}

#[test]
fn jpg_jpeg_and_image_jpeg_mime_all_resolve_to_the_same_codec() {
    let registry = Registry::global();
    let by_jpg = registry.codec_from_extension("jpg").expect("jpg");
    let by_jpeg = registry.codec_from_extension("jpeg").expect("jpeg");
    let by_mime = registry.codec_from_mime("image/jpeg").expect("mime");

    assert_eq!(by_jpg.name, "JPEG");
    assert_eq!(by_jpeg.name, "JPEG");
    assert_eq!(by_mime.name, "JPEG");
}

#[test]
fn extension_lookup_is_case_insensitive_and_strips_leading_dot() {
    let registry = Registry::global();
    assert_eq!(registry.codec_from_extension("PNG").unwrap().name, "PNG");
    assert_eq!(registry.codec_from_extension(".png").unwrap().name, "PNG");
}

#[test]
fn codec_from_path_uses_the_final_extension() {
    let registry = Registry::global();
    let codec = registry.codec_from_path("archive/photos/beach.party.webp").expect("webp");
    assert_eq!(codec.name, "WEBP");
}

#[test]
fn unknown_extension_reports_codec_not_found() {
    let registry = Registry::global();
    let err = registry.codec_from_extension("xyz123").unwrap_err();
    assert!(matches!(err, Status::CodecNotFound));
}

#[test]
fn magic_probe_identifies_png_without_consuming_the_stream() {
    let registry = Registry::global();
    let png_bytes: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];
    let mut io = SliceIo::new(png_bytes);

    let codec = registry.codec_from_magic(&mut io).expect("magic match");
    assert_eq!(codec.name, "PNG");
    assert_eq!(io.tell().expect("tell"), 0, "probe must not move the stream position");
}

#[test]
fn magic_probe_identifies_gif87a_and_gif89a() {
    let registry = Registry::global();
    for magic in [b"GIF87a".as_slice(), b"GIF89a".as_slice()] {
        let codec = registry.codec_from_magic_bytes(magic).expect("gif magic");
        assert_eq!(codec.name, "GIF");
    }
}

#[test]
fn magic_probe_reports_codec_not_found_for_unrecognized_bytes() {
    let registry = Registry::global();
    let err = registry.codec_from_magic_bytes(b"not-an-image-at-all").unwrap_err();
    assert!(matches!(err, Status::CodecNotFound));
}

#[test]
fn every_codec_extension_round_trips_through_codec_from_extension() {
    let registry = Registry::global();
    for codec in registry.codecs() {
        for ext in codec.extensions {
            let found = registry.codec_from_extension(ext).expect("extension resolves");
            assert_eq!(found.name, codec.name);
        }
    }
}
