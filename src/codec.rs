//! The uniform codec ABI.
//!
//! A first-party `EncoderConfig`/`EncodeJob`/`Encoder`/`FrameEncoder`-shaped
//! trait family (mirrored on the decode side), kept in-crate rather than
//! pulled from an external job-queue codec crate — see DESIGN.md.

use enough::Stop;

use crate::error::Status;
use crate::io::Io;
use crate::model::image::Compression;
use crate::model::Image;
use crate::variant::Properties;

bitflags::bitflags! {
    /// Bit-set of load-time switches.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct LoadOptionsFlags: u32 {
        const LOAD_METADATA        = 0b0001;
        const LOAD_ICCP            = 0b0010;
        const PRESERVE_SOURCE_IMAGE = 0b0100;
        const DEINTERLACE          = 0b1000;
    }
}

impl Default for LoadOptionsFlags {
    fn default() -> Self {
        Self::LOAD_METADATA | Self::LOAD_ICCP
    }
}

/// Per-call load configuration.
#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub flags: LoadOptionsFlags,
    pub tuning: Properties,
}

impl LoadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load_metadata(&self) -> bool {
        self.flags.contains(LoadOptionsFlags::LOAD_METADATA)
    }

    pub fn load_iccp(&self) -> bool {
        self.flags.contains(LoadOptionsFlags::LOAD_ICCP)
    }

    pub fn preserve_source_image(&self) -> bool {
        self.flags.contains(LoadOptionsFlags::PRESERVE_SOURCE_IMAGE)
    }

    pub fn deinterlace(&self) -> bool {
        self.flags.contains(LoadOptionsFlags::DEINTERLACE)
    }
}

/// Per-call save configuration.
#[derive(Clone, Debug, Default)]
pub struct SaveOptions {
    pub compression: Compression,
    /// Clamped by the codec to `CodecInfo::save_features.compression_level_range`.
    pub compression_level: Option<i32>,
    pub flags: LoadOptionsFlags,
    pub tuning: Properties,
}

impl SaveOptions {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Load-time capability bits reported by a [`CodecInfo`](crate::registry::CodecInfo).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LoadFeatures {
    pub supports_animated: bool,
    pub supports_multi_page: bool,
    pub supports_metadata: bool,
    pub supports_interlaced: bool,
    pub supports_iccp: bool,
    pub supports_source_image: bool,
}

/// Save-time capability description.
#[derive(Clone, Debug, Default)]
pub struct SaveFeatures {
    pub accepted_pixel_formats: &'static [crate::model::PixelFormat],
    pub accepted_compressions: &'static [Compression],
    pub default_compression: Compression,
    pub compression_level_range: Option<(i32, i32)>,
    pub default_compression_level: i32,
}

/// The per-codec decode state machine.
///
/// A codec's `load_init` produces a `Box<dyn LoadState>`; the driver
/// (`crate::driver`) drives it to completion and guarantees `finish` runs
/// exactly once via `Drop`.
pub trait LoadState {
    /// Advance to the next frame's skeleton (no pixel buffer yet).
    /// Returns `Ok(None)` when the frame sequence is exhausted — a normal
    /// terminator, not an error, so it lives in `Option` rather than in
    /// `Result`'s `Err` side.
    fn seek_next_frame(&mut self, stop: &dyn Stop) -> Result<Option<Image>, Status>;

    /// Fill `image`'s already-allocated pixel buffer.
    fn frame(&mut self, image: &mut Image, stop: &dyn Stop) -> Result<(), Status>;

    /// Release any codec-internal resources. The driver always calls this,
    /// even on error exit.
    fn finish(&mut self) -> Result<(), Status> {
        Ok(())
    }
}

/// The per-codec encode state machine.
pub trait SaveState {
    fn seek_next_frame(&mut self, image: &Image, stop: &dyn Stop) -> Result<(), Status>;
    fn frame(&mut self, image: &Image, stop: &dyn Stop) -> Result<(), Status>;
    fn finish(&mut self) -> Result<(), Status> {
        Ok(())
    }
}

/// A format's load/save entry points.
pub trait Codec {
    fn load_init<'io>(
        &self,
        io: Box<dyn Io + 'io>,
        options: LoadOptions,
    ) -> Result<Box<dyn LoadState + 'io>, Status>;

    fn save_init<'io>(
        &self,
        io: Box<dyn Io + 'io>,
        options: SaveOptions,
    ) -> Result<Box<dyn SaveState + 'io>, Status>;
}
