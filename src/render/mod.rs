//! Draw-call contract and per-frame rendering.
//!
//! Any graphics backend that implements [`FaceRenderer`] can display playback.
//! [`render_frame`] is a pure consumer of its inputs: it reads the frame, the
//! avatar, the topology and the projection and issues at most one draw.

pub mod headless;

use glam::{Mat4, Vec2, Vec3};

use crate::animation::Frame;
use crate::avatar::AvatarAsset;
use crate::error::RenderError;
use crate::mesh::MeshTopology;

/// Everything one indexed draw of the face mesh needs.
#[derive(Debug, Clone, Copy)]
pub struct MeshDraw<'a> {
    /// Bound to `u_camera`
    pub transform: &'a Mat4,
    /// Bound to `a_position`, one per landmark
    pub positions: &'a [Vec3],
    /// Bound to `a_uv`, index-parallel with `positions`
    pub uvs: &'a [Vec2],
    /// Triangle list, three indices per triangle
    pub indices: &'a [u32],
    pub triangle_count: usize,
}

/// A graphics backend able to show the avatar mesh.
pub trait FaceRenderer {
    /// Upload the avatar image as the texture sampled by `u_texture`.
    /// Called once per avatar, before any draw.
    fn upload_avatar(&mut self, avatar: &AvatarAsset) -> Result<(), RenderError>;

    /// Configure the rasterizer viewport.
    fn set_viewport(&mut self, width: u32, height: u32);

    /// Clear the color target.
    fn clear(&mut self);

    /// Issue one indexed triangle draw with the uploaded avatar texture bound.
    fn draw_indexed(&mut self, draw: &MeshDraw<'_>);
}

/// What a call to [`render_frame`] produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawOutcome {
    /// Target cleared, nothing drawn (no face in this frame)
    Cleared,
    /// Target cleared and the mesh drawn
    Drawn,
}

/// Clear the target and, if the frame has a face, draw the deformed avatar.
pub fn render_frame<R: FaceRenderer + ?Sized>(
    renderer: &mut R,
    frame: &Frame,
    avatar: &AvatarAsset,
    topology: &MeshTopology,
    projection: &Mat4,
) -> DrawOutcome {
    renderer.clear();

    if !frame.is_drawable() {
        return DrawOutcome::Cleared;
    }

    renderer.draw_indexed(&MeshDraw {
        transform: projection,
        positions: frame.points(),
        uvs: avatar.uv(),
        indices: topology.indices(),
        triangle_count: topology.triangle_count(),
    });
    DrawOutcome::Drawn
}

#[cfg(test)]
mod tests {
    use super::headless::HeadlessRenderer;
    use super::*;
    use crate::NUM_LANDMARKS;

    fn avatar() -> AvatarAsset {
        AvatarAsset::new(1, 1, vec![255; 4], vec![Vec2::splat(0.5); NUM_LANDMARKS]).unwrap()
    }

    #[test]
    fn test_faceless_frame_only_clears() {
        let mut renderer = HeadlessRenderer::new();
        let topology = MeshTopology::parse("n_tri: 1 { 0 1 2 }").unwrap();

        let outcome = render_frame(
            &mut renderer,
            &Frame::faceless(),
            &avatar(),
            &topology,
            &Mat4::IDENTITY,
        );

        assert_eq!(outcome, DrawOutcome::Cleared);
        assert_eq!(renderer.clear_count(), 1);
        assert_eq!(renderer.draw_count(), 0);
    }

    #[test]
    fn test_face_frame_draws_once() {
        let mut renderer = HeadlessRenderer::new();
        let topology = MeshTopology::parse("n_tri: 2 { 0 1 2 2 3 0 }").unwrap();
        let frame = Frame::with_face(vec![Vec3::ONE; NUM_LANDMARKS]);
        let projection = Mat4::from_scale(Vec3::new(0.5, -0.5, 0.5));

        let outcome = render_frame(&mut renderer, &frame, &avatar(), &topology, &projection);

        assert_eq!(outcome, DrawOutcome::Drawn);
        assert_eq!(renderer.clear_count(), 1);
        assert_eq!(renderer.draw_count(), 1);

        let last = renderer.last_draw().unwrap();
        assert_eq!(last.transform, projection);
        assert_eq!(last.vertex_count, NUM_LANDMARKS);
        assert_eq!(last.uv_count, NUM_LANDMARKS);
        assert_eq!(last.triangle_count, 2);
        assert_eq!(last.index_count, 6);
    }
}
