//! Normalization + viewport-fit transform.
//!
//! Composition, applied to an identity basis in order:
//! 1. uniform scale by `1 / max_coord`
//! 2. aspect fit: the longer view axis is shrunk so the face is letterboxed, never stretched
//! 3. Y flip (animation Y grows downward)

use glam::{Mat4, Vec3};

/// Build the projection for an animation extent and view size.
pub fn build(max_coord: f32, view_width: u32, view_height: u32) -> Mat4 {
    let (aspect_x, aspect_y) = aspect_scale(view_width, view_height);

    Mat4::IDENTITY
        * Mat4::from_scale(Vec3::splat(1.0 / max_coord))
        * Mat4::from_scale(Vec3::new(aspect_x, aspect_y, 1.0))
        * Mat4::from_scale(Vec3::new(1.0, -1.0, 1.0))
}

/// Per-axis scale that fits a square into the view.
///
/// A zero dimension yields `(1, 1)`.
pub fn aspect_scale(view_width: u32, view_height: u32) -> (f32, f32) {
    if view_width == 0 || view_height == 0 {
        return (1.0, 1.0);
    }

    let (w, h) = (view_width as f32, view_height as f32);
    if view_width > view_height {
        (h / w, 1.0)
    } else {
        (1.0, w / h)
    }
}

/// Cached projection, recomputed only when its inputs change.
#[derive(Debug, Clone)]
pub struct Projection {
    inputs: Option<(f32, u32, u32)>,
    matrix: Mat4,
}

impl Default for Projection {
    fn default() -> Self {
        Self {
            inputs: None,
            matrix: Mat4::IDENTITY,
        }
    }
}

impl Projection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recompute if any input changed. Returns whether the matrix was rebuilt.
    pub fn update(&mut self, max_coord: f32, view_width: u32, view_height: u32) -> bool {
        let inputs = (max_coord, view_width, view_height);
        if self.inputs == Some(inputs) {
            return false;
        }

        self.matrix = build(max_coord, view_width, view_height);
        self.inputs = Some(inputs);
        tracing::debug!(
            "Projection rebuilt: max_coord={} view={}x{}",
            max_coord,
            view_width,
            view_height
        );
        true
    }

    /// Forget the inputs so the next `update` rebuilds.
    pub fn invalidate(&mut self) {
        self.inputs = None;
    }

    pub fn matrix(&self) -> &Mat4 {
        &self.matrix
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn diagonal(m: &Mat4) -> Vec3 {
        Vec3::new(m.x_axis.x, m.y_axis.y, m.z_axis.z)
    }

    #[test]
    fn test_landscape_view() {
        let m = build(2.0, 1000, 500);
        assert_eq!(diagonal(&m), Vec3::new(0.25, -0.5, 0.5));
    }

    #[test]
    fn test_portrait_view() {
        let m = build(2.0, 500, 1000);
        assert_eq!(diagonal(&m), Vec3::new(0.5, -0.25, 0.5));
    }

    #[test]
    fn test_resize_swaps_aspect_axis() {
        let landscape = build(4.0, 1000, 500);
        let portrait = build(4.0, 500, 1000);

        assert_eq!(landscape.x_axis.x, -portrait.y_axis.y);
        assert_eq!(-landscape.y_axis.y, portrait.x_axis.x);
        // Extent-derived scale is untouched
        assert_eq!(landscape.z_axis.z, 0.25);
        assert_eq!(portrait.z_axis.z, 0.25);
    }

    #[test]
    fn test_square_view_only_normalizes_and_flips() {
        let m = build(1.0, 640, 640);
        let p = m.transform_point3(Vec3::new(0.5, 0.5, 0.5));
        assert_eq!(p, Vec3::new(0.5, -0.5, 0.5));
        assert_eq!(m.w_axis, glam::Vec4::W);
    }

    #[test]
    fn test_extent_maps_into_unit_cube() {
        let m = build(250.0, 800, 600);
        let p = m.transform_point3(Vec3::new(250.0, 250.0, 250.0));
        assert!(p.x.abs() <= 1.0 && p.y.abs() <= 1.0 && p.z.abs() <= 1.0);
        assert!((p.y + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_zero_view_dimension() {
        assert_eq!(aspect_scale(0, 480), (1.0, 1.0));
        assert_eq!(aspect_scale(640, 0), (1.0, 1.0));
    }

    #[test]
    fn test_cached_projection() {
        let mut projection = Projection::new();
        assert!(projection.update(1.0, 100, 50));
        assert!(!projection.update(1.0, 100, 50));
        assert!(projection.update(1.0, 50, 100));
        assert!(projection.update(3.0, 50, 100));

        projection.invalidate();
        assert!(projection.update(3.0, 50, 100));
        assert_eq!(*projection.matrix(), build(3.0, 50, 100));
    }
}
