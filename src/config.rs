//! # Viewer Configuration
//!
//! Every tunable the viewer reads at start-up, with defaults matching the
//! showcase scene. A JSON file may override any subset of fields:
//!
//! ```json
//! { "assets": { "texture": { "kind": "image", "path": "img/grid.png" } },
//!   "animation": { "time_scale": 0.5 } }
//! ```
//!
//! The file is taken from `$VITRINE_CONFIG`, or `vitrine.json` in the working
//! directory when present.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const CONFIG_ENV_VAR: &str = "VITRINE_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "vitrine.json";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub window: WindowConfig,
    pub assets: AssetConfig,
    pub camera: CameraConfig,
    pub animation: AnimationConfig,
    pub shadows: ShadowSettings,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            window: WindowConfig::default(),
            assets: AssetConfig::default(),
            camera: CameraConfig::default(),
            animation: AnimationConfig::default(),
            shadows: ShadowSettings::default(),
        }
    }
}

impl ViewerConfig {
    /// Resolves the config file from the environment and falls back to the
    /// defaults when there is none.
    pub fn load() -> Result<Self, ConfigError> {
        if let Some(path) = std::env::var_os(CONFIG_ENV_VAR) {
            return Self::from_path(Path::new(&path));
        }
        let local = Path::new(DEFAULT_CONFIG_FILE);
        if local.is_file() {
            return Self::from_path(local);
        }
        log::info!("no {DEFAULT_CONFIG_FILE} found, using built-in defaults");
        Ok(Self::default())
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        log::info!("loaded config from {}", path.display());
        Ok(config)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub title: String,
    /// Logical pixels.
    pub width: u32,
    pub height: u32,
    pub vsync: bool,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "vitrine".to_string(),
            width: 1200,
            height: 800,
            vsync: true,
        }
    }
}

/// Diffuse texture applied to the shared material.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TextureSourceConfig {
    /// A video pre-decoded into numbered image frames inside `frames`.
    Video { frames: PathBuf, fps: f32 },
    Image { path: PathBuf },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetConfig {
    pub model: PathBuf,
    /// Cube faces in +X, -X, +Y, -Y, +Z, -Z order.
    pub environment: [PathBuf; 6],
    pub texture: TextureSourceConfig,
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            model: PathBuf::from("models/objects.glb"),
            environment: ["px", "nx", "py", "ny", "pz", "nz"]
                .map(|face| PathBuf::from(format!("img/{face}_50.png"))),
            texture: TextureSourceConfig::Video {
                frames: PathBuf::from("video"),
                fps: 30.0,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub fov_degrees: f32,
    pub near: f32,
    pub far: f32,
    pub position: [f32; 3],
    pub target: [f32; 3],
    pub damping: f32,
    pub rotate_speed: f32,
    pub zoom_speed: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov_degrees: 75.0,
            near: 0.1,
            far: 1000.0,
            position: [-9.5736, 7.1802, 31.9121],
            target: [0.0, 0.0, 0.0],
            damping: 0.05,
            rotate_speed: 0.005,
            zoom_speed: 0.1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationConfig {
    /// Time factor applied to every action created for the model.
    pub time_scale: f32,
    /// Yaw added to the tracked mesh each frame, in radians.
    pub rotation_step: f32,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            time_scale: 1.0,
            rotation_step: 0.01,
        }
    }
}

/// Shadow settings forced onto every light of the loaded model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShadowSettings {
    pub enabled: bool,
    pub map_size: u32,
    pub bias: f32,
}

impl Default for ShadowSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            map_size: 2048,
            bias: -0.001,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_keeps_other_defaults() {
        let config: ViewerConfig = serde_json::from_str(
            r#"{ "animation": { "time_scale": 0.5 },
                 "assets": { "texture": { "kind": "image", "path": "img/grid.png" } } }"#,
        )
        .unwrap();

        assert_eq!(config.animation.time_scale, 0.5);
        assert_eq!(config.animation.rotation_step, 0.01);
        assert_eq!(
            config.assets.texture,
            TextureSourceConfig::Image {
                path: PathBuf::from("img/grid.png")
            }
        );
        assert_eq!(config.assets.model, PathBuf::from("models/objects.glb"));
        assert_eq!(config.shadows, ShadowSettings::default());
    }

    #[test]
    fn test_default_faces_are_in_canonical_order() {
        let faces = ViewerConfig::default().assets.environment;
        assert_eq!(faces[0], PathBuf::from("img/px_50.png"));
        assert_eq!(faces[5], PathBuf::from("img/nz_50.png"));
    }

    #[test]
    fn test_unknown_texture_kind_is_a_parse_error() {
        let path = std::env::temp_dir().join(format!("vitrine-config-{}.json", std::process::id()));
        std::fs::write(&path, r#"{ "assets": { "texture": { "kind": "webcam" } } }"#).unwrap();
        let result = ViewerConfig::from_path(&path);
        let _ = std::fs::remove_file(&path);
        assert!(matches!(result, Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_missing_file_is_an_io_error() {
        let result = ViewerConfig::from_path(Path::new("/definitely/not/here.json"));
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }
}
