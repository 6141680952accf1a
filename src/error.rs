//! The crate-wide error sum type.
//!
//! `#[non_exhaustive]`, one variant per failure mode, plus a `Cancelled`
//! variant wrapping the cooperative-cancellation reason.

use enough::StopReason;

/// Every fallible operation in this crate returns `Result<T, Status>`.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Status {
    // ── Common ───────────────────────────────────────────────────────
    #[error("memory allocation failed")]
    MemoryAllocation,
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("failed to parse file: {0}")]
    ParseFile(String),

    // ── I/O ──────────────────────────────────────────────────────────
    #[error("I/O read error: {0}")]
    ReadIo(std::io::Error),
    #[error("I/O write error: {0}")]
    WriteIo(std::io::Error),
    #[error("I/O seek error: {0}")]
    SeekIo(std::io::Error),
    #[error("I/O tell error: {0}")]
    TellIo(std::io::Error),
    #[error("I/O flush error: {0}")]
    FlushIo(std::io::Error),
    #[error("unexpected end of stream")]
    EndOfStream,
    #[error("unsupported seek whence")]
    UnsupportedSeekWhence,
    #[error("invalid I/O stream")]
    InvalidIo,

    // ── Image ────────────────────────────────────────────────────────
    #[error("invalid image dimensions: {width}x{height}")]
    InvalidImageDimensions { width: u32, height: u32 },
    #[error("unsupported pixel format for this operation")]
    UnsupportedPixelFormat,
    #[error("invalid pixel format")]
    InvalidPixelFormat,
    #[error("unsupported compression")]
    UnsupportedCompression,
    #[error("unsupported metadata")]
    UnsupportedMetaData,
    #[error("interlacing is not supported by this codec")]
    InterlacingUnsupported,
    #[error("invalid bytes-per-line: {bytes_per_line} for width {width}")]
    InvalidBytesPerLine { bytes_per_line: u32, width: u32 },
    #[error("unsupported bit depth: {0}")]
    UnsupportedBitDepth(u32),
    #[error("indexed image is missing its palette")]
    MissingPalette,
    #[error("invalid image: {0}")]
    InvalidImage(String),

    // ── Frame flow ───────────────────────────────────────────────────
    #[error("no more frames")]
    NoMoreFrames,

    // ── Codec ────────────────────────────────────────────────────────
    #[error("no codec found for the given selector")]
    CodecNotFound,
    #[error("underlying codec error: {0}")]
    UnderlyingCodec(String),
    #[error("unsupported codec feature: {0}")]
    UnsupportedCodecFeature(String),
    #[error("incomplete codec info")]
    IncompleteCodecInfo,
    #[error("conflicting operation requested on this session")]
    ConflictingOperation,

    // ── Generic ──────────────────────────────────────────────────────
    #[error("operation not implemented: {0}")]
    NotImplemented(String),
    #[error("empty string where a value was required")]
    EmptyString,
    #[error("invalid variant: type tag not set")]
    InvalidVariant,
    #[error("operation cancelled: {0:?}")]
    Cancelled(StopReason),
}

impl From<StopReason> for Status {
    fn from(r: StopReason) -> Self {
        Status::Cancelled(r)
    }
}

impl From<std::num::TryFromIntError> for Status {
    fn from(_: std::num::TryFromIntError) -> Self {
        Status::InvalidArgument("integer conversion overflow".into())
    }
}

impl From<std::str::Utf8Error> for Status {
    fn from(e: std::str::Utf8Error) -> Self {
        Status::ParseFile(format!("invalid UTF-8: {e}"))
    }
}

pub type Result<T> = core::result::Result<T, Status>;
