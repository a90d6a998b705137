//! Decoded avatar image and per-landmark texture coordinates

use glam::Vec2;

use crate::error::AvatarError;
use crate::NUM_LANDMARKS;

/// A decoded avatar, immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct AvatarAsset {
    width: u32,
    height: u32,
    /// RGBA8, row-major, `width * height * 4` bytes
    pixels: Vec<u8>,
    /// Index-parallel with every frame's landmark points
    uv: Vec<Vec2>,
}

impl AvatarAsset {
    /// Validate and assemble an avatar.
    pub fn new(width: u32, height: u32, pixels: Vec<u8>, uv: Vec<Vec2>) -> Result<Self, AvatarError> {
        if width == 0 || height == 0 {
            return Err(AvatarError::InvalidDimensions { width, height });
        }

        let expected = width as usize * height as usize * 4;
        if pixels.len() != expected {
            return Err(AvatarError::PixelCount {
                expected,
                found: pixels.len(),
            });
        }

        if uv.len() != NUM_LANDMARKS {
            return Err(AvatarError::UvCount {
                expected: NUM_LANDMARKS,
                found: uv.len(),
            });
        }

        let unit = 0.0..=1.0;
        if let Some((index, coord)) = uv
            .iter()
            .enumerate()
            .find(|(_, c)| !(unit.contains(&c.x) && unit.contains(&c.y)))
        {
            return Err(AvatarError::UvOutOfRange {
                index,
                u: coord.x,
                v: coord.y,
            });
        }

        Ok(Self {
            width,
            height,
            pixels,
            uv,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn uv(&self) -> &[Vec2] {
        &self.uv
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uvs() -> Vec<Vec2> {
        (0..NUM_LANDMARKS)
            .map(|i| Vec2::new(i as f32 / NUM_LANDMARKS as f32, 0.5))
            .collect()
    }

    #[test]
    fn test_valid_asset() {
        let asset = AvatarAsset::new(2, 3, vec![255; 24], uvs()).unwrap();
        assert_eq!(asset.dimensions(), (2, 3));
        assert_eq!(asset.pixels().len(), 24);
        assert_eq!(asset.uv().len(), NUM_LANDMARKS);
    }

    #[test]
    fn test_rejects_zero_dimensions() {
        assert!(matches!(
            AvatarAsset::new(0, 3, Vec::new(), uvs()),
            Err(AvatarError::InvalidDimensions { .. })
        ));
    }

    #[test]
    fn test_rejects_short_pixel_buffer() {
        assert!(matches!(
            AvatarAsset::new(2, 2, vec![0; 15], uvs()),
            Err(AvatarError::PixelCount {
                expected: 16,
                found: 15
            })
        ));
    }

    #[test]
    fn test_rejects_wrong_uv_count() {
        assert!(matches!(
            AvatarAsset::new(1, 1, vec![0; 4], vec![Vec2::ZERO; 10]),
            Err(AvatarError::UvCount { found: 10, .. })
        ));
    }

    #[test]
    fn test_rejects_uv_outside_unit_square() {
        let mut coords = uvs();
        coords[7] = Vec2::new(1.2, 0.0);
        assert!(matches!(
            AvatarAsset::new(1, 1, vec![0; 4], coords),
            Err(AvatarError::UvOutOfRange { index: 7, .. })
        ));
    }
}
