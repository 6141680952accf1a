//! A dynamically typed value, and the properties map keyed by string that
//! carries codec-specific tuning knobs through a load/save round trip.
//!
//! A type-tagged enum with deep-copy, structural equality, and a derived
//! `Display`: `Clone`/`PartialEq`/`Debug` fall out of `#[derive]`, and
//! `Display` is hand-written to format each variant's payload.
//!
//! The properties map is a plain `std::collections::HashMap<String, Variant>`
//! rather than a hand-rolled bucket-chained table — `HashMap` already covers
//! that case generically.

use std::collections::HashMap;
use std::fmt;

use crate::error::Status;

/// A dynamically typed value carried by [`MetaData`](crate::model::MetaData)
/// entries and by per-codec special-properties maps.
#[derive(Clone, Debug, PartialEq)]
pub enum Variant {
    Bool(bool),
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    UInt8(u8),
    UInt16(u16),
    UInt32(u32),
    UInt64(u64),
    Float(f32),
    Double(f64),
    String(String),
    Bytes(Vec<u8>),
}

impl Variant {
    /// Read this variant back as a string, if it is one.
    pub fn as_str(&self) -> Result<&str, Status> {
        match self {
            Variant::String(s) => Ok(s),
            _ => Err(Status::InvalidVariant),
        }
    }

    /// Read this variant back as a float (accepts `Float` or `Double`),
    /// mirroring `sail_variant_to_float`'s acceptance of either width.
    pub fn as_f64(&self) -> Result<f64, Status> {
        match self {
            Variant::Float(f) => Ok(*f as f64),
            Variant::Double(d) => Ok(*d),
            _ => Err(Status::InvalidVariant),
        }
    }

    /// Read this variant back as a 64-bit signed integer, widening any
    /// narrower signed variant.
    pub fn as_i64(&self) -> Result<i64, Status> {
        match self {
            Variant::Int8(v) => Ok(*v as i64),
            Variant::Int16(v) => Ok(*v as i64),
            Variant::Int32(v) => Ok(*v as i64),
            Variant::Int64(v) => Ok(*v),
            _ => Err(Status::InvalidVariant),
        }
    }

    /// Read this variant back as a 64-bit unsigned integer, widening any
    /// narrower unsigned variant.
    pub fn as_u64(&self) -> Result<u64, Status> {
        match self {
            Variant::UInt8(v) => Ok(*v as u64),
            Variant::UInt16(v) => Ok(*v as u64),
            Variant::UInt32(v) => Ok(*v as u64),
            Variant::UInt64(v) => Ok(*v),
            _ => Err(Status::InvalidVariant),
        }
    }

    pub fn as_bytes(&self) -> Result<&[u8], Status> {
        match self {
            Variant::Bytes(b) => Ok(b),
            _ => Err(Status::InvalidVariant),
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Variant::Bool(v) => write!(f, "{v}"),
            Variant::Int8(v) => write!(f, "{v}"),
            Variant::Int16(v) => write!(f, "{v}"),
            Variant::Int32(v) => write!(f, "{v}"),
            Variant::Int64(v) => write!(f, "{v}"),
            Variant::UInt8(v) => write!(f, "{v}"),
            Variant::UInt16(v) => write!(f, "{v}"),
            Variant::UInt32(v) => write!(f, "{v}"),
            Variant::UInt64(v) => write!(f, "{v}"),
            Variant::Float(v) => write!(f, "{v}"),
            Variant::Double(v) => write!(f, "{v}"),
            Variant::String(v) => write!(f, "{v}"),
            Variant::Bytes(v) => write!(f, "<{} bytes>", v.len()),
        }
    }
}

/// A codec-specific tuning/properties map.
///
/// Keys follow the `{codec-name}-{property}` convention, e.g.
/// `hdr-exposure`, `hdr-gamma`, `jpegxl-bits-per-sample`.
pub type Properties = HashMap<String, Variant>;
