//! Orchestrates the uniform codec ABI behind convenience entry points.
//!
//! `LoadSession`/`SaveSession` own a codec's `Box<dyn LoadState>`/
//! `Box<dyn SaveState>` and guarantee `finish()` runs via `Drop`, so a
//! session releases its underlying resources on every exit path, including
//! early returns and panics during unwinding.

use std::fs::File;
use std::path::Path;

use enough::{Stop, Unstoppable};

use crate::codec::{LoadOptions, SaveOptions};
use crate::error::Status;
use crate::io::{FileIo, Io};
use crate::limits::Limits;
use crate::model::Image;
use crate::registry::{CodecInfo, Registry};

/// A single load-side walk through a stream's frames.
///
/// Owns the codec's `Box<dyn LoadState>`; `finish()` is called once, either
/// explicitly or on drop.
pub struct LoadSession<'io> {
    state: Option<Box<dyn crate::codec::LoadState + 'io>>,
    limits: Limits,
}

impl<'io> LoadSession<'io> {
    fn new(state: Box<dyn crate::codec::LoadState + 'io>, limits: Limits) -> Self {
        Self {
            state: Some(state),
            limits,
        }
    }

    /// Advance to the next frame, allocate its pixel buffer, and fill it.
    /// Returns `Ok(None)` once the sequence is exhausted.
    pub fn next_frame(&mut self) -> Result<Option<Image>, Status> {
        self.next_frame_with_stop(&Unstoppable)
    }

    pub fn next_frame_with_stop(&mut self, stop: &dyn Stop) -> Result<Option<Image>, Status> {
        let state = self.state.as_mut().ok_or(Status::ConflictingOperation)?;
        let Some(mut skeleton) = state.seek_next_frame(stop)? else {
            return Ok(None);
        };
        if let Err(e) = self.limits.check(skeleton.width, skeleton.height) {
            #[cfg(feature = "logging")]
            log::warn!(
                "rejecting {}x{} frame: {e}",
                skeleton.width,
                skeleton.height
            );
            return Err(e);
        }
        skeleton.allocate_pixels();
        self.limits.check_memory(skeleton.pixels.len() as u64)?;
        state.frame(&mut skeleton, stop)?;
        skeleton.check_indexed_pixels_bpp8()?;
        Ok(Some(skeleton))
    }

    /// Release the codec state early. Idempotent.
    pub fn finish(&mut self) -> Result<(), Status> {
        if let Some(mut state) = self.state.take() {
            state.finish()?;
        }
        Ok(())
    }
}

impl Drop for LoadSession<'_> {
    fn drop(&mut self) {
        let _ = self.finish();
    }
}

/// A single save-side walk that accepts frames one at a time.
pub struct SaveSession<'io> {
    state: Option<Box<dyn crate::codec::SaveState + 'io>>,
}

impl<'io> SaveSession<'io> {
    fn new(state: Box<dyn crate::codec::SaveState + 'io>) -> Self {
        Self { state: Some(state) }
    }

    pub fn next_frame(&mut self, image: &Image) -> Result<(), Status> {
        self.next_frame_with_stop(image, &Unstoppable)
    }

    pub fn next_frame_with_stop(&mut self, image: &Image, stop: &dyn Stop) -> Result<(), Status> {
        image.validate()?;
        let state = self.state.as_mut().ok_or(Status::ConflictingOperation)?;
        state.seek_next_frame(image, stop)?;
        state.frame(image, stop)
    }

    pub fn finish(&mut self) -> Result<(), Status> {
        if let Some(mut state) = self.state.take() {
            state.finish()?;
        }
        Ok(())
    }
}

impl Drop for SaveSession<'_> {
    fn drop(&mut self) {
        let _ = self.finish();
    }
}

/// The public entry point: convenience `load`/`save` plus session-based
/// `start_loading`/`start_saving` for multi-frame / streaming use.
pub struct Driver;

impl Driver {
    /// Open `io`, resolving the codec either from `codec` or (if `None`) by
    /// magic-byte probe, and start a load session with default options and
    /// limits.
    pub fn start_loading<'io>(
        io: Box<dyn Io + 'io>,
        codec: Option<&CodecInfo>,
    ) -> Result<LoadSession<'io>, Status> {
        Self::start_loading_with(io, codec, LoadOptions::new(), Limits::none())
    }

    pub fn start_loading_with<'io>(
        mut io: Box<dyn Io + 'io>,
        codec: Option<&CodecInfo>,
        options: LoadOptions,
        limits: Limits,
    ) -> Result<LoadSession<'io>, Status> {
        let registry = Registry::global();
        let info = match codec {
            Some(info) => info,
            None => registry.codec_from_magic(io.as_mut())?,
        };
        #[cfg(feature = "logging")]
        log::debug!("loading with codec {}", info.name);
        let codec_impl = crate::codecs::codec_impl(info)?;
        let state = codec_impl.load_init(io, options)?;
        Ok(LoadSession::new(state, limits))
    }

    /// Single-frame convenience load: init, one `seek_next_frame`, one
    /// `frame`, `finish`.
    pub fn load(path: impl AsRef<Path>) -> Result<Image, Status> {
        let file = File::open(path).map_err(Status::ReadIo)?;
        let io: Box<dyn Io> = Box::new(FileIo::new(file));
        let mut session = Self::start_loading(io, None)?;
        session
            .next_frame()?
            .ok_or_else(|| Status::InvalidImage("stream contains no frames".into()))
    }

    pub fn load_bytes(data: &[u8]) -> Result<Image, Status> {
        let io: Box<dyn Io> = Box::new(crate::io::SliceIo::new(data));
        let mut session = Self::start_loading(io, None)?;
        session
            .next_frame()?
            .ok_or_else(|| Status::InvalidImage("stream contains no frames".into()))
    }

    /// Read metadata and a pixel-less skeleton without decoding pixels.
    pub fn probe(mut io: Box<dyn Io>) -> Result<(Image, CodecInfo), Status> {
        let registry = Registry::global();
        let info = registry.codec_from_magic(io.as_mut())?.clone();
        let codec_impl = crate::codecs::codec_impl(&info)?;
        let mut state = codec_impl.load_init(io, LoadOptions::new())?;
        let skeleton = state
            .seek_next_frame(&Unstoppable)?
            .ok_or_else(|| Status::InvalidImage("stream contains no frames".into()))?;
        state.finish()?;
        Ok((skeleton, info))
    }

    pub fn start_saving<'io>(
        io: Box<dyn Io + 'io>,
        codec: &CodecInfo,
        options: SaveOptions,
    ) -> Result<SaveSession<'io>, Status> {
        let codec_impl = crate::codecs::codec_impl(codec)?;
        let state = codec_impl.save_init(io, options)?;
        Ok(SaveSession::new(state))
    }

    /// Single-frame convenience save.
    pub fn save(image: &Image, path: impl AsRef<Path>, codec: &CodecInfo) -> Result<(), Status> {
        let file = File::create(path).map_err(Status::WriteIo)?;
        let io: Box<dyn Io> = Box::new(FileIo::new(file));
        let mut session = Self::start_saving(io, codec, SaveOptions::new())?;
        session.next_frame(image)?;
        session.finish()
    }

    pub fn save_to_bytes(image: &Image, codec: &CodecInfo) -> Result<Vec<u8>, Status> {
        let mut mem = crate::io::MemoryIo::new();
        {
            let io: Box<dyn Io> = Box::new(&mut mem);
            let mut session = Self::start_saving(io, codec, SaveOptions::new())?;
            session.next_frame(image)?;
            session.finish()?;
        }
        Ok(mem.into_inner())
    }
}
