//! Data models for frameart.
//!
//! Image identity, resolved/normalized payloads and the display cosmetic
//! options shared by the resolvers, the ledger and the device layer.

mod display;
mod image;

pub use display::{MatteColor, MatteOption, MatteStyle, PhotoFilter};
pub use image::{
    EncodingHint, ImageIdentifier, ImageLocation, NormalizedImage, ResolvedImage, SourceName,
};
