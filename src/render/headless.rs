//! CPU-only renderer that records what it was asked to do.
//!
//! Used by the headless CLI to simulate playback and by tests to observe draw calls.

use glam::{Mat4, Vec3};

use super::{FaceRenderer, MeshDraw};
use crate::avatar::AvatarAsset;
use crate::error::RenderError;

/// Summary of one recorded draw.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedDraw {
    pub transform: Mat4,
    pub vertex_count: usize,
    pub uv_count: usize,
    pub index_count: usize,
    pub triangle_count: usize,
    /// Landmark positions after the transform
    pub projected: Vec<Vec3>,
}

#[derive(Debug, Default)]
pub struct HeadlessRenderer {
    uploads: usize,
    texture_size: Option<(u32, u32)>,
    viewport: Option<(u32, u32)>,
    clears: usize,
    draws: usize,
    last_draw: Option<RecordedDraw>,
}

impl HeadlessRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upload_count(&self) -> usize {
        self.uploads
    }

    pub fn texture_size(&self) -> Option<(u32, u32)> {
        self.texture_size
    }

    pub fn viewport(&self) -> Option<(u32, u32)> {
        self.viewport
    }

    pub fn clear_count(&self) -> usize {
        self.clears
    }

    pub fn draw_count(&self) -> usize {
        self.draws
    }

    pub fn last_draw(&self) -> Option<&RecordedDraw> {
        self.last_draw.as_ref()
    }
}

impl FaceRenderer for HeadlessRenderer {
    fn upload_avatar(&mut self, avatar: &AvatarAsset) -> Result<(), RenderError> {
        self.uploads += 1;
        self.texture_size = Some(avatar.dimensions());
        Ok(())
    }

    fn set_viewport(&mut self, width: u32, height: u32) {
        self.viewport = Some((width, height));
    }

    fn clear(&mut self) {
        self.clears += 1;
    }

    fn draw_indexed(&mut self, draw: &MeshDraw<'_>) {
        debug_assert_eq!(draw.indices.len(), draw.triangle_count * 3);
        debug_assert!(draw
            .indices
            .iter()
            .all(|&i| (i as usize) < draw.positions.len()));

        self.draws += 1;
        self.last_draw = Some(RecordedDraw {
            transform: *draw.transform,
            vertex_count: draw.positions.len(),
            uv_count: draw.uvs.len(),
            index_count: draw.indices.len(),
            triangle_count: draw.triangle_count,
            projected: draw
                .positions
                .iter()
                .map(|&p| draw.transform.transform_point3(p))
                .collect(),
        });
    }
}
