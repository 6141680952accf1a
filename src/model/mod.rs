//! The image data model and metadata graph.

pub mod image;
pub mod metadata;
pub mod pixel_format;

pub use image::{Compression, IccProfile, Image, Orientation, Palette, Resolution, ResolutionUnit, SourceImage};
pub use metadata::{MetaData, MetaDataKey};
pub use pixel_format::PixelFormat;
