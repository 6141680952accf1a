//! # multipix
//!
//! A multi-format still-image decoder/encoder: one uniform codec ABI in
//! front of GIF, HDR/Radiance, PNM/PAM/PFM, PSD, WebP (representative state
//! machines implemented directly in this crate) and PNG, JPEG, TIFF,
//! JPEG-XL, OpenEXR (thinner contracts wrapping third-party libraries).
//!
//! ## Quick start
//!
//! ```no_run
//! use multipix::{Driver, Registry};
//!
//! let image = Driver::load("photo.png")?;
//! println!("{}x{} {:?}", image.width, image.height, image.pixel_format);
//!
//! let ppm = Registry::global().codec_from_extension("ppm").unwrap();
//! Driver::save(&image, "photo.ppm", ppm)?;
//! # Ok::<(), multipix::Status>(())
//! ```
//!
//! ## Architecture
//!
//! - [`Driver`] drives [`LoadSession`]/[`SaveSession`] through a codec's
//!   [`LoadState`]/[`SaveState`], guaranteeing `finish()` on drop.
//! - [`Registry`] holds one [`CodecInfo`] per compiled-in format, matched by
//!   extension, MIME type, or magic bytes.
//! - [`Image`] is the in-memory pixel + metadata representation; [`convert`]
//!   and [`quantize`] reshape it between [`PixelFormat`]s.
//! - [`Io`] abstracts the byte source/sink; [`FileIo`], [`MemoryIo`], and
//!   [`SliceIo`] are the first-party implementations.
//!
//! Every codec behind a cargo feature (`gif`, `hdr`, `pnm`, `psd`, `webp`,
//! `png-codec`, `jpeg`, `tiff-codec`, `jpegxl`, `openexr`) is optional; `all`
//! enables the full set. `logging` wires codec-boundary diagnostics through
//! the `log` facade, `parallel` row-parallelizes conversion/quantization via
//! `rayon`, and `typed-pixels` adds an `rgb`/`imgref` convenience layer.

#![forbid(unsafe_code)]

pub mod codec;
pub mod codecs;
pub mod convert;
pub mod driver;
pub mod error;
pub mod io;
pub mod limits;
pub mod model;
pub mod quantize;
pub mod registry;
pub mod variant;

#[cfg(feature = "typed-pixels")]
pub mod typed;

pub use codec::{
    Codec, LoadFeatures, LoadOptions, LoadOptionsFlags, LoadState, SaveFeatures, SaveOptions,
    SaveState,
};
pub use driver::{Driver, LoadSession, SaveSession};
pub use enough::{Stop, StopReason, Unstoppable};
pub use error::{Result, Status};
pub use io::{FileIo, Io, MemoryIo, SliceIo, Whence};
pub use limits::Limits;
pub use model::image::{
    Compression, IccProfile, Orientation, Palette, Resolution, ResolutionUnit, SourceImage,
};
pub use model::metadata::{MetaData, MetaDataKey};
pub use model::{Image, PixelFormat};
pub use registry::{CodecInfo, Registry, Signature};
pub use variant::{Properties, Variant};
