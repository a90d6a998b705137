//! JSON animation decoding.
//!
//! ```json
//! { "fps": 30, "frames": [ { "has_face": true, "points3d": [[x, y, z], ...] }, ... ] }
//! ```
//!
//! Decoding is all-or-nothing: any bad frame, including one whose point count
//! is not [`NUM_LANDMARKS`], rejects the whole file.

use std::path::Path;

use glam::Vec3;
use serde::Deserialize;

use super::{AnimationFile, Frame};
use crate::error::AnimationError;
use crate::NUM_LANDMARKS;

#[derive(Debug, Deserialize)]
struct RawAnimation {
    fps: f64,
    frames: Vec<RawFrame>,
}

#[derive(Debug, Deserialize)]
struct RawFrame {
    has_face: bool,
    /// Only decoded when `has_face` is set.
    #[serde(default)]
    points3d: Option<serde_json::Value>,
}

/// Read and decode an animation file.
pub fn parse_file(path: &Path) -> Result<AnimationFile, AnimationError> {
    let contents = std::fs::read_to_string(path).map_err(|source| AnimationError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let animation = parse_str(&contents)?;
    tracing::info!(
        "reading {} frames from '{}'",
        animation.frame_count(),
        path.display()
    );
    Ok(animation)
}

/// Decode an animation from JSON text.
pub fn parse_str(source: &str) -> Result<AnimationFile, AnimationError> {
    let raw: RawAnimation =
        serde_json::from_str(source).map_err(|e| AnimationError::Malformed(e.to_string()))?;

    if raw.frames.is_empty() {
        return Err(AnimationError::Empty);
    }

    let frames = raw
        .frames
        .into_iter()
        .enumerate()
        .map(|(index, frame)| decode_frame(index, frame))
        .collect::<Result<Vec<_>, _>>()?;

    AnimationFile::new(raw.fps, frames)
}

fn decode_frame(index: usize, raw: RawFrame) -> Result<Frame, AnimationError> {
    if !raw.has_face {
        return Ok(Frame::faceless());
    }

    let value = raw.points3d.ok_or_else(|| {
        AnimationError::Malformed(format!("frame {}: missing field `points3d`", index))
    })?;
    let points: Vec<[f32; 3]> = serde_json::from_value(value)
        .map_err(|e| AnimationError::Malformed(format!("frame {}: {}", index, e)))?;

    if let Some(point) = points.iter().find(|p| p.iter().any(|c| !c.is_finite())) {
        return Err(AnimationError::Malformed(format!(
            "frame {}: coordinate out of range: {:?}",
            index, point
        )));
    }

    if points.len() != NUM_LANDMARKS {
        return Err(AnimationError::MalformedFrame {
            index,
            expected: NUM_LANDMARKS,
            found: points.len(),
        });
    }

    Ok(Frame::with_face(points.into_iter().map(Vec3::from).collect()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn face_points(value: f32) -> serde_json::Value {
        json!(vec![[value, value, value]; NUM_LANDMARKS])
    }

    #[test]
    fn test_single_frame_at_floor() {
        let source = json!({
            "fps": 30,
            "frames": [{ "has_face": true, "points3d": face_points(1.0) }]
        })
        .to_string();

        let animation = parse_str(&source).unwrap();
        assert_eq!(animation.fps(), 30.0);
        assert_eq!(animation.frame_count(), 1);
        assert_eq!(animation.max_coord(), 1.0);
        assert_eq!(animation.frame(0).unwrap().points().len(), NUM_LANDMARKS);
    }

    #[test]
    fn test_max_coord_tracks_any_component() {
        let mut points = vec![[0.0f32, 0.0, 0.0]; NUM_LANDMARKS];
        points[10] = [3.0, -40.0, 0.0];
        points[20] = [0.0, 0.0, 7.5];
        let source = json!({
            "fps": 25.0,
            "frames": [
                { "has_face": true, "points3d": points },
                { "has_face": false }
            ]
        })
        .to_string();

        let animation = parse_str(&source).unwrap();
        assert_eq!(animation.max_coord(), 7.5);
    }

    #[test]
    fn test_negative_coordinates_stay_at_floor() {
        let source = json!({
            "fps": 10,
            "frames": [{ "has_face": true, "points3d": face_points(-250.0) }]
        })
        .to_string();

        assert_eq!(parse_str(&source).unwrap().max_coord(), 1.0);
    }

    #[test]
    fn test_empty_frames_rejected() {
        let err = parse_str(r#"{ "fps": 30, "frames": [] }"#).unwrap_err();
        assert!(matches!(err, AnimationError::Empty));
    }

    #[test]
    fn test_faceless_frame_ignores_points() {
        let source = json!({
            "fps": 30,
            "frames": [
                { "has_face": false, "points3d": "not even an array" },
                { "has_face": false }
            ]
        })
        .to_string();

        let animation = parse_str(&source).unwrap();
        assert_eq!(animation.faceless_frames(), 2);
        assert!(animation.frames().iter().all(|f| f.points().is_empty()));
    }

    #[test]
    fn test_wrong_point_count_aborts_file() {
        let source = json!({
            "fps": 30,
            "frames": [
                { "has_face": true, "points3d": face_points(0.5) },
                { "has_face": true, "points3d": vec![[0.0f32; 3]; 3] }
            ]
        })
        .to_string();

        let err = parse_str(&source).unwrap_err();
        assert!(matches!(
            err,
            AnimationError::MalformedFrame {
                index: 1,
                expected: NUM_LANDMARKS,
                found: 3
            }
        ));
    }

    #[test]
    fn test_missing_fields() {
        assert!(matches!(
            parse_str(r#"{ "frames": [{ "has_face": false }] }"#),
            Err(AnimationError::Malformed(_))
        ));
        assert!(matches!(
            parse_str(r#"{ "fps": 30 }"#),
            Err(AnimationError::Malformed(_))
        ));
        assert!(matches!(
            parse_str(r#"{ "fps": 30, "frames": [{ "points3d": [] }] }"#),
            Err(AnimationError::Malformed(_))
        ));
        assert!(matches!(
            parse_str(r#"{ "fps": 30, "frames": [{ "has_face": true }] }"#),
            Err(AnimationError::Malformed(_))
        ));
    }

    #[test]
    fn test_non_numeric_values() {
        assert!(matches!(
            parse_str(r#"{ "fps": "fast", "frames": [{ "has_face": false }] }"#),
            Err(AnimationError::Malformed(_))
        ));

        let mut points = vec![json!([0.0, 0.0, 0.0]); NUM_LANDMARKS];
        points[5] = json!([0.0, "y", 0.0]);
        let source = json!({
            "fps": 30,
            "frames": [{ "has_face": true, "points3d": points }]
        })
        .to_string();
        assert!(matches!(parse_str(&source), Err(AnimationError::Malformed(_))));
    }

    #[test]
    fn test_out_of_range_coordinate() {
        let mut points = vec![[0.5f64, 0.5, 0.5]; NUM_LANDMARKS];
        points[7] = [1e39, 0.0, 0.0];
        let source = json!({
            "fps": 30,
            "frames": [{ "has_face": true, "points3d": points }]
        })
        .to_string();

        assert!(matches!(
            parse_str(&source),
            Err(AnimationError::Malformed(_))
        ));
    }

    #[test]
    fn test_point_with_two_components() {
        let mut points = vec![json!([0.0, 0.0, 0.0]); NUM_LANDMARKS];
        points[0] = json!([1.0, 2.0]);
        let source = json!({
            "fps": 30,
            "frames": [{ "has_face": true, "points3d": points }]
        })
        .to_string();
        assert!(matches!(parse_str(&source), Err(AnimationError::Malformed(_))));
    }

    #[test]
    fn test_invalid_json_and_fps() {
        assert!(matches!(
            parse_str("{ not json"),
            Err(AnimationError::Malformed(_))
        ));
        assert!(matches!(
            parse_str(r#"{ "fps": -1, "frames": [{ "has_face": false }] }"#),
            Err(AnimationError::InvalidFps(_))
        ));
    }

    #[test]
    fn test_parse_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("smile.json");
        let source = json!({
            "fps": 15,
            "frames": [
                { "has_face": true, "points3d": face_points(12.0) },
                { "has_face": false }
            ]
        })
        .to_string();
        std::fs::write(&path, source).unwrap();

        let animation = parse_file(&path).unwrap();
        assert_eq!(animation.frame_count(), 2);
        assert_eq!(animation.max_coord(), 12.0);

        let err = parse_file(&dir.path().join("missing.json")).unwrap_err();
        assert!(matches!(err, AnimationError::Io { .. }));
    }
}
