//! Avatar assets
//!
//! An avatar is a static RGBA image plus one texture coordinate per landmark.
//! Decoding is pluggable through [`AvatarDecoder`].

pub mod asset;
pub mod decoder;

pub use asset::AvatarAsset;
pub use decoder::{AvatarDecoder, ImageAvatarDecoder, LandmarkSidecar};
