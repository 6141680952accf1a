//! Resource limits consulted by codecs at `load_init`/`save_init`.

use crate::error::Status;

/// Resource limits for decode/encode operations.
///
/// All fields default to `None` (no limit). Every codec's `load_init`
/// consults these before allocating a frame's pixel buffer.
#[derive(Clone, Debug, Default)]
pub struct Limits {
    pub max_width: Option<u64>,
    pub max_height: Option<u64>,
    /// Maximum pixel count (width * height).
    pub max_pixels: Option<u64>,
    /// Maximum memory bytes for output buffer allocation.
    pub max_memory_bytes: Option<u64>,
}

impl Limits {
    /// No limits at all.
    pub fn none() -> Self {
        Self::default()
    }

    /// Check dimensions against limits.
    pub(crate) fn check(&self, width: u32, height: u32) -> Result<(), Status> {
        if let Some(max_w) = self.max_width {
            if u64::from(width) > max_w {
                return Err(Status::InvalidImageDimensions { width, height });
            }
        }
        if let Some(max_h) = self.max_height {
            if u64::from(height) > max_h {
                return Err(Status::InvalidImageDimensions { width, height });
            }
        }
        if let Some(max_px) = self.max_pixels {
            let pixels = u64::from(width) * u64::from(height);
            if pixels > max_px {
                return Err(Status::InvalidImageDimensions { width, height });
            }
        }
        Ok(())
    }

    /// Check that an allocation size is within memory limits.
    pub(crate) fn check_memory(&self, bytes: u64) -> Result<(), Status> {
        if let Some(max_mem) = self.max_memory_bytes {
            if bytes > max_mem {
                return Err(Status::InvalidArgument(format!(
                    "allocation of {bytes} bytes exceeds memory limit of {max_mem} bytes"
                )));
            }
        }
        Ok(())
    }
}
