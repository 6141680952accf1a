//! The codec registry: static per-format descriptors plus signature/
//! extension/MIME lookup.
//!
//! A data table of [`CodecInfo`] descriptors, scaled to the full format
//! list, in place of a hand-written `match` over magic bytes per format.
//! The registry itself is a lazily-initialized, memoized global
//! (`std::sync::OnceLock`).

use std::sync::OnceLock;

use crate::codec::{LoadFeatures, SaveFeatures};
use crate::error::Status;
use crate::io::Io;

/// `(offset, pattern)`; a codec matches if `pattern` occurs at `offset`.
#[derive(Clone, Copy, Debug)]
pub struct Signature {
    pub offset: usize,
    pub pattern: &'static [u8],
}

/// Static per-format descriptor.
#[derive(Clone, Debug)]
pub struct CodecInfo {
    pub name: &'static str,
    pub description: &'static str,
    pub mime_types: &'static [&'static str],
    pub extensions: &'static [&'static str],
    pub signatures: &'static [Signature],
    pub load_features: LoadFeatures,
    pub save_features: SaveFeatures,
}

impl CodecInfo {
    pub fn matches_extension(&self, ext: &str) -> bool {
        self.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext))
    }

    pub fn matches_mime(&self, mime: &str) -> bool {
        self.mime_types.iter().any(|m| m.eq_ignore_ascii_case(mime))
    }

    pub fn matches_magic(&self, bytes: &[u8]) -> bool {
        self.signatures.iter().any(|sig| {
            bytes.len() >= sig.offset + sig.pattern.len()
                && &bytes[sig.offset..sig.offset + sig.pattern.len()] == sig.pattern
        })
    }

    /// The maximum byte count any signature of this codec needs to peek.
    pub fn max_signature_len(&self) -> usize {
        self.signatures
            .iter()
            .map(|s| s.offset + s.pattern.len())
            .max()
            .unwrap_or(0)
    }
}

/// The immutable, process-wide set of built-in codecs. Lookups are lock-free reads of a `OnceLock`-memoized
/// vector.
pub struct Registry {
    codecs: Vec<CodecInfo>,
}

static REGISTRY: OnceLock<Registry> = OnceLock::new();

impl Registry {
    /// Returns the process-wide registry, building it on first use.
    pub fn global() -> &'static Registry {
        REGISTRY.get_or_init(Registry::build)
    }

    fn build() -> Self {
        Self {
            codecs: crate::codecs::built_in_codec_infos(),
        }
    }

    /// Immutable ordered list of every registered codec.
    pub fn codecs(&self) -> &[CodecInfo] {
        &self.codecs
    }

    pub fn codec_from_extension(&self, ext: &str) -> Result<&CodecInfo, Status> {
        let ext = ext.trim_start_matches('.');
        self.codecs
            .iter()
            .find(|c| c.matches_extension(ext))
            .ok_or(Status::CodecNotFound)
    }

    pub fn codec_from_path(&self, path: &str) -> Result<&CodecInfo, Status> {
        let ext = path.rsplit('.').next().ok_or(Status::CodecNotFound)?;
        self.codec_from_extension(ext)
    }

    pub fn codec_from_mime(&self, mime: &str) -> Result<&CodecInfo, Status> {
        self.codecs
            .iter()
            .find(|c| c.matches_mime(mime))
            .ok_or(Status::CodecNotFound)
    }

    /// Probes `io` for a magic signature, leaving the stream position
    /// unchanged on return.
    pub fn codec_from_magic(&self, io: &mut dyn Io) -> Result<&CodecInfo, Status> {
        let max_len = self
            .codecs
            .iter()
            .map(CodecInfo::max_signature_len)
            .max()
            .unwrap_or(0);
        let start = io.tell()?;
        let mut buf = vec![0u8; max_len];
        let read = io.tolerant_read(&mut buf)?;
        io.seek(start as i64, crate::io::Whence::Set)?;
        let buf = &buf[..read];
        let found = self.codecs.iter().find(|c| c.matches_magic(buf));
        #[cfg(feature = "logging")]
        match found {
            Some(c) => log::debug!("magic probe matched {}", c.name),
            None => log::debug!("magic probe matched no registered codec"),
        }
        found.ok_or(Status::CodecNotFound)
    }

    pub fn codec_from_magic_bytes(&self, bytes: &[u8]) -> Result<&CodecInfo, Status> {
        self.codecs
            .iter()
            .find(|c| c.matches_magic(bytes))
            .ok_or(Status::CodecNotFound)
    }
}
