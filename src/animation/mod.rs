//! Recorded expression animations.
//!
//! An animation is an immutable sequence of per-frame landmark snapshots plus a
//! playback rate. Files are decoded all-or-nothing by [`parser`].

pub mod parser;

use std::path::Path;
use std::time::Duration;

use glam::Vec3;

use crate::error::AnimationError;

/// Smallest extent an animation is normalized against.
pub const MIN_EXTENT: f32 = 1.0;

/// One snapshot of all landmark positions.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    has_face: bool,
    points: Vec<Vec3>,
}

impl Frame {
    /// A frame where tracking found a face.
    pub fn with_face(points: Vec<Vec3>) -> Self {
        Self {
            has_face: true,
            points,
        }
    }

    /// A frame where tracking lost the face.
    pub fn faceless() -> Self {
        Self {
            has_face: false,
            points: Vec::new(),
        }
    }

    pub fn has_face(&self) -> bool {
        self.has_face
    }

    /// Landmark positions; empty when there is no face.
    pub fn points(&self) -> &[Vec3] {
        &self.points
    }

    /// Whether this frame produces geometry.
    pub fn is_drawable(&self) -> bool {
        self.has_face && !self.points.is_empty()
    }
}

/// Running maximum over every coordinate component, floored at [`MIN_EXTENT`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoordinateExtent {
    max_coord: f32,
}

impl Default for CoordinateExtent {
    fn default() -> Self {
        Self {
            max_coord: MIN_EXTENT,
        }
    }
}

impl CoordinateExtent {
    /// Fold one point into the extent.
    pub fn include(&mut self, point: Vec3) {
        self.max_coord = self.max_coord.max(point.max_element());
    }

    pub fn max_coord(&self) -> f32 {
        self.max_coord
    }
}

/// A fully decoded animation.
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationFile {
    fps: f64,
    frames: Vec<Frame>,
    extent: CoordinateExtent,
}

impl AnimationFile {
    /// Build an animation from already-validated parts.
    ///
    /// Fails if `frames` is empty or `fps` is not a positive finite number.
    pub fn new(fps: f64, frames: Vec<Frame>) -> Result<Self, AnimationError> {
        if !(fps.is_finite() && fps > 0.0) {
            return Err(AnimationError::InvalidFps(fps));
        }
        if frames.is_empty() {
            return Err(AnimationError::Empty);
        }

        let mut extent = CoordinateExtent::default();
        for frame in &frames {
            for &point in frame.points() {
                extent.include(point);
            }
        }

        Ok(Self {
            fps,
            frames,
            extent,
        })
    }

    /// Read and decode an animation file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, AnimationError> {
        parser::parse_file(path.as_ref())
    }

    /// Decode an animation from JSON text.
    pub fn from_json_str(source: &str) -> Result<Self, AnimationError> {
        parser::parse_str(source)
    }

    pub fn fps(&self) -> f64 {
        self.fps
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    /// Always at least 1.
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    pub fn frame(&self, index: usize) -> Option<&Frame> {
        self.frames.get(index)
    }

    pub fn extent(&self) -> CoordinateExtent {
        self.extent
    }

    pub fn max_coord(&self) -> f32 {
        self.extent.max_coord()
    }

    /// Time until the last frame is reached, saturating at [`Duration::MAX`].
    pub fn duration(&self) -> Duration {
        let secs = (self.frames.len() - 1) as f64 / self.fps;
        Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
    }

    /// Number of frames without a tracked face.
    pub fn faceless_frames(&self) -> usize {
        self.frames.iter().filter(|f| !f.has_face()).count()
    }
}
