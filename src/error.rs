//! Error types for facemime

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for facemime
#[derive(Error, Debug)]
pub enum FacemimeError {
    #[error("Animation error: {0}")]
    Animation(#[from] AnimationError),

    #[error("Topology error: {0}")]
    Topology(#[from] TopologyError),

    #[error("Avatar error: {0}")]
    Avatar(#[from] AvatarError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Animation file errors
#[derive(Error, Debug)]
pub enum AnimationError {
    #[error("Failed to read animation {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed animation: {0}")]
    Malformed(String),

    #[error("Animation has no frames")]
    Empty,

    #[error("Invalid playback rate: {0} fps")]
    InvalidFps(f64),

    #[error("Frame {index} has {found} points, expected {expected}")]
    MalformedFrame {
        index: usize,
        expected: usize,
        found: usize,
    },
}

/// Mesh topology resource errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TopologyError {
    #[error("Failed to read topology: {0}")]
    Io(String),

    #[error("Missing 'n_tri:' header")]
    MissingHeader,

    #[error("Invalid triangle count: {0}")]
    InvalidCount(String),

    #[error("Expected '{0}'")]
    MissingDelimiter(char),

    #[error("Invalid index '{token}' at position {position}")]
    InvalidIndex { position: usize, token: String },

    #[error("Declared {declared} indices but found {found}")]
    CountMismatch { declared: usize, found: usize },

    #[error("Index {index} is out of range (landmarks: {limit})")]
    IndexOutOfRange { index: u32, limit: usize },

    #[error("Unexpected data after closing brace: {0}")]
    TrailingData(String),
}

/// Avatar decoding errors
#[derive(Error, Debug)]
pub enum AvatarError {
    #[error("Avatar not found: {0}")]
    NotFound(String),

    #[error("Failed to decode avatar: {0}")]
    Decode(String),

    #[error("Invalid avatar dimensions: {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("Pixel buffer holds {found} bytes, expected {expected}")]
    PixelCount { expected: usize, found: usize },

    #[error("Avatar has {found} UV coordinates, expected {expected}")]
    UvCount { expected: usize, found: usize },

    #[error("UV coordinate {index} is outside [0, 1]: [{u}, {v}]")]
    UvOutOfRange { index: usize, u: f32, v: f32 },

    #[error("Failed to read landmarks: {0}")]
    Landmarks(String),
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadFile(String),

    #[error("Failed to parse config: {0}")]
    Parse(String),

    #[error("Invalid configuration value: {field} - {message}")]
    InvalidValue { field: String, message: String },
}

/// Rendering backend errors
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Rendering unavailable: {0}")]
    Unavailable(String),

    #[error("Texture upload failed: {0}")]
    TextureUpload(String),
}

/// Result type alias for facemime operations
pub type Result<T> = std::result::Result<T, FacemimeError>;
