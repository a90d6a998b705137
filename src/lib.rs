//! facemime - recorded facial expression playback
//!
//! Replays a landmark animation by deforming a static avatar image over a fixed
//! triangle mesh:
//! - Parses 66-landmark JSON animations and the packaged mesh topology
//! - Loads avatars and animations off the render thread
//! - Maps playback time to frames and fits the face into any view
//! - Renders through any [`render::FaceRenderer`] (headless or wgpu)

pub mod animation;
pub mod avatar;
pub mod config;
pub mod error;
pub mod mesh;
pub mod playback;
pub mod projection;
pub mod render;

#[cfg(feature = "native-ui")]
pub mod ui;

pub use config::Config;
pub use error::{FacemimeError, Result};

/// Landmarks per animation frame, per avatar and per mesh vertex set
pub const NUM_LANDMARKS: usize = 66;

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
