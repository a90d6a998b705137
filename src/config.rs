//! Configuration parsing and management for facemime

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{ConfigError, FacemimeError};

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub playback: PlaybackConfig,
    pub render: RenderConfig,
    pub window: WindowConfig,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, FacemimeError> {
        let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            ConfigError::ReadFile(format!("{}: {}", path.as_ref().display(), e))
        })?;

        Self::from_str(&contents)
    }

    /// Parse configuration from a TOML string
    pub fn from_str(s: &str) -> Result<Self, FacemimeError> {
        toml::from_str(s).map_err(|e| ConfigError::Parse(e.to_string()).into())
    }

    /// Load configuration from default paths
    pub fn load() -> Result<Self, FacemimeError> {
        let paths = [
            PathBuf::from("facemime.toml"),
            PathBuf::from("config/facemime.toml"),
            dirs_path().join("config.toml"),
        ];

        for path in &paths {
            if path.exists() {
                tracing::info!("Loading config from: {}", path.display());
                return Self::from_file(path);
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), FacemimeError> {
        if self.window.width == 0 || self.window.height == 0 {
            return Err(ConfigError::InvalidValue {
                field: "window.width/window.height".to_string(),
                message: "Window dimensions must be greater than 0".to_string(),
            }
            .into());
        }

        if self
            .render
            .clear_color
            .iter()
            .any(|c| !(0.0..=1.0).contains(c))
        {
            return Err(ConfigError::InvalidValue {
                field: "render.clear_color".to_string(),
                message: "Color components must be between 0.0 and 1.0".to_string(),
            }
            .into());
        }

        if self.playback.load_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "playback.load_timeout_secs".to_string(),
                message: "Load timeout must be greater than 0".to_string(),
            }
            .into());
        }

        for (field, path) in [
            ("playback.avatar_path", &self.playback.avatar_path),
            ("playback.animation_path", &self.playback.animation_path),
            ("render.topology_path", &self.render.topology_path),
        ] {
            if let Some(path) = path {
                if !path.exists() {
                    tracing::warn!("{} does not exist: {}", field, path.display());
                }
            }
        }

        Ok(())
    }
}

/// What to play back and how
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Avatar image (a `.landmarks.json` sidecar must sit next to it)
    pub avatar_path: Option<PathBuf>,
    /// Recorded expression animation (JSON)
    pub animation_path: Option<PathBuf>,
    /// Restart from the first frame instead of holding the last one
    pub loop_playback: bool,
    /// How long headless mode waits for assets to load
    pub load_timeout_secs: u64,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            avatar_path: None,
            animation_path: None,
            loop_playback: false,
            load_timeout_secs: 10,
        }
    }
}

/// Rendering configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// RGBA clear color
    pub clear_color: [f32; 4],
    /// Replace the packaged triangle topology
    pub topology_path: Option<PathBuf>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            clear_color: [0.0, 0.0, 0.0, 1.0],
            topology_path: None,
        }
    }
}

/// Native window configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "facemime".to_string(),
            width: 800,
            height: 600,
        }
    }
}

/// Get the platform-specific configuration directory
fn dirs_path() -> PathBuf {
    #[cfg(target_os = "linux")]
    {
        if let Some(config_dir) = std::env::var_os("XDG_CONFIG_HOME") {
            return PathBuf::from(config_dir).join("facemime");
        }
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home).join(".config/facemime");
        }
    }

    #[cfg(target_os = "macos")]
    {
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home).join("Library/Application Support/facemime");
        }
    }

    #[cfg(target_os = "windows")]
    {
        if let Some(appdata) = std::env::var_os("APPDATA") {
            return PathBuf::from(appdata).join("facemime");
        }
    }

    PathBuf::from(".")
}
