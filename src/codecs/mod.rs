//! The built-in codec set: one submodule per format, each exposing a
//! `info() -> CodecInfo` and a zero-sized `Codec` impl.

#[cfg(any(feature = "png-codec", feature = "jpeg", feature = "tiff-codec", feature = "jpegxl", feature = "openexr"))]
pub(crate) mod io_adapter;

#[cfg(feature = "gif")]
pub mod gif;
#[cfg(feature = "hdr")]
pub mod hdr;
#[cfg(feature = "jpeg")]
pub mod jpeg;
#[cfg(feature = "jpegxl")]
pub mod jpegxl;
#[cfg(feature = "openexr")]
pub mod openexr;
#[cfg(feature = "png-codec")]
pub mod png;
#[cfg(feature = "pnm")]
pub mod pnm;
#[cfg(feature = "psd")]
pub mod psd;
#[cfg(feature = "tiff-codec")]
pub mod tiff;
#[cfg(feature = "webp")]
pub mod webp;

use crate::codec::Codec;
use crate::error::Status;
use crate::registry::CodecInfo;

/// Every compiled-in format's static descriptor, in a fixed order.
pub fn built_in_codec_infos() -> Vec<CodecInfo> {
    #[allow(unused_mut)]
    let mut infos = Vec::new();
    #[cfg(feature = "png-codec")]
    infos.push(png::info());
    #[cfg(feature = "jpeg")]
    infos.push(jpeg::info());
    #[cfg(feature = "gif")]
    infos.push(gif::info());
    #[cfg(feature = "webp")]
    infos.push(webp::info());
    #[cfg(feature = "tiff-codec")]
    infos.push(tiff::info());
    #[cfg(feature = "hdr")]
    infos.push(hdr::info());
    #[cfg(feature = "pnm")]
    infos.push(pnm::info());
    #[cfg(feature = "psd")]
    infos.push(psd::info());
    #[cfg(feature = "jpegxl")]
    infos.push(jpegxl::info());
    #[cfg(feature = "openexr")]
    infos.push(openexr::info());
    infos
}

/// Resolve a `CodecInfo` (by name) back to the `Codec` implementation that
/// drives it.
pub fn codec_impl(info: &CodecInfo) -> Result<Box<dyn Codec>, Status> {
    match info.name {
        #[cfg(feature = "png-codec")]
        "PNG" => Ok(Box::new(png::PngCodec)),
        #[cfg(feature = "jpeg")]
        "JPEG" => Ok(Box::new(jpeg::JpegCodec)),
        #[cfg(feature = "gif")]
        "GIF" => Ok(Box::new(gif::GifCodec)),
        #[cfg(feature = "webp")]
        "WEBP" => Ok(Box::new(webp::WebpCodec)),
        #[cfg(feature = "tiff-codec")]
        "TIFF" => Ok(Box::new(tiff::TiffCodec)),
        #[cfg(feature = "hdr")]
        "HDR" => Ok(Box::new(hdr::HdrCodec)),
        #[cfg(feature = "pnm")]
        "PNM" => Ok(Box::new(pnm::PnmCodec)),
        #[cfg(feature = "psd")]
        "PSD" => Ok(Box::new(psd::PsdCodec)),
        #[cfg(feature = "jpegxl")]
        "JPEG-XL" => Ok(Box::new(jpegxl::JpegXlCodec)),
        #[cfg(feature = "openexr")]
        "OpenEXR" => Ok(Box::new(openexr::OpenExrCodec)),
        _ => Err(Status::CodecNotFound),
    }
}
