//! Metadata keys and nodes.
//!
//! Owned, deep-copied storage throughout rather than borrowing into the
//! source stream. A `Vec<MetaData>` stands in for the linked-list shape a
//! C codec would use here — order is preserved and there are no cycles to
//! worry about.

use crate::variant::Variant;

/// The closed set of well-known metadata tags.
///
/// `Unknown` carries a free-form key so unknown tags round-trip losslessly.
#[non_exhaustive]
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum MetaDataKey {
    Artist,
    Author,
    Comment,
    Copyright,
    CreationTime,
    Description,
    Exif,
    Iccp,
    Iptc,
    Xmp,
    Jumbf,
    Software,
    Title,
    Url,
    Unknown(String),
}

/// One metadata entry: a tagged key and a dynamically typed value.
#[derive(Clone, Debug, PartialEq)]
pub struct MetaData {
    pub key: MetaDataKey,
    pub value: Variant,
}

impl MetaData {
    pub fn new(key: MetaDataKey, value: Variant) -> Self {
        Self { key, value }
    }

    pub fn string(key: MetaDataKey, value: impl Into<String>) -> Self {
        Self::new(key, Variant::String(value.into()))
    }

    pub fn bytes(key: MetaDataKey, value: Vec<u8>) -> Self {
        Self::new(key, Variant::Bytes(value))
    }
}
