//! Avatar decoding.
//!
//! [`ImageAvatarDecoder`] reads an image plus a landmark sidecar next to it:
//!
//! ```text
//! face.png
//! face.landmarks.json   { "origin": [xmin, ymin], "points": [[x, y], ... 66 entries] }
//! ```
//!
//! Landmark pixel positions are turned into texture coordinates relative to
//! `origin` and the image size.

use std::path::{Path, PathBuf};

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::AvatarAsset;
use crate::error::AvatarError;
use crate::NUM_LANDMARKS;

/// Source of decoded avatars.
pub trait AvatarDecoder: Send + Sync {
    /// Decode the avatar stored at `path`.
    fn decode(&self, path: &Path) -> Result<AvatarAsset, AvatarError>;
}

/// Landmark positions in avatar image pixels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LandmarkSidecar {
    /// Top-left corner of the face region the image was cropped from
    #[serde(default)]
    pub origin: [f32; 2],
    /// One `[x, y]` pixel position per landmark
    pub points: Vec<[f32; 2]>,
}

impl LandmarkSidecar {
    /// Convert pixel positions into texture-space coordinates.
    pub fn to_uv(&self, width: u32, height: u32) -> Result<Vec<Vec2>, AvatarError> {
        if self.points.len() != NUM_LANDMARKS {
            return Err(AvatarError::UvCount {
                expected: NUM_LANDMARKS,
                found: self.points.len(),
            });
        }

        let origin = Vec2::from(self.origin);
        let size = Vec2::new(width as f32, height as f32);
        Ok(self
            .points
            .iter()
            .map(|&p| (Vec2::from(p) - origin) / size)
            .collect())
    }
}

/// Decodes PNG/JPEG avatars with a `.landmarks.json` sidecar.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageAvatarDecoder;

impl ImageAvatarDecoder {
    pub fn new() -> Self {
        Self
    }

    /// Where the landmark sidecar for `image_path` lives.
    pub fn sidecar_path(image_path: &Path) -> PathBuf {
        image_path.with_extension("landmarks.json")
    }

    fn read_sidecar(path: &Path) -> Result<LandmarkSidecar, AvatarError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| AvatarError::Landmarks(format!("{}: {}", path.display(), e)))?;
        serde_json::from_str(&contents)
            .map_err(|e| AvatarError::Landmarks(format!("{}: {}", path.display(), e)))
    }
}

impl AvatarDecoder for ImageAvatarDecoder {
    fn decode(&self, path: &Path) -> Result<AvatarAsset, AvatarError> {
        if !path.exists() {
            return Err(AvatarError::NotFound(path.display().to_string()));
        }

        let image = image::open(path)
            .map_err(|e| AvatarError::Decode(format!("{}: {}", path.display(), e)))?
            .into_rgba8();
        let (width, height) = image.dimensions();

        let mut pixels = image.into_raw();
        fill_background(&mut pixels);

        let sidecar = Self::read_sidecar(&Self::sidecar_path(path))?;
        let uv = sidecar.to_uv(width, height)?;

        tracing::debug!("Decoded avatar {} ({}x{})", path.display(), width, height);

        AvatarAsset::new(width, height, pixels, uv)
    }
}

/// Pixels outside the face mask (fully transparent) become opaque white.
fn fill_background(pixels: &mut [u8]) {
    for px in pixels.chunks_exact_mut(4) {
        if px[3] == 0 {
            px.copy_from_slice(&[0xff, 0xff, 0xff, 0xff]);
        }
    }
}
