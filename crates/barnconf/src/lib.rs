//! Minimal configuration loading for Barnraiser.
//!
//! This crate provides the composition configuration with minimal
//! dependencies, designed to be imported by every Barnraiser crate without
//! causing circular dependency issues. The surrounding CLI owns argument
//! parsing; the core consumes the resulting struct.
//!
//! # Config File Locations
//!
//! Files are loaded in order (later wins):
//! 1. `/etc/barnraiser/config.toml` (system)
//! 2. `~/.config/barnraiser/config.toml` (user)
//! 3. `./barnraiser.toml` (local override)
//! 4. Environment variables (`BARNRAISER_*`)
//!
//! # Example Config
//!
//! ```toml
//! layout = "hgrid"
//! width = 1920
//! height = 1080
//! frame-rate = 30
//! margin = 4
//! screen-weight = 3
//! camera-weight = 1
//! crop = true
//! ```

pub mod loader;

pub use loader::{discover_config_files, load_from_file};

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("invalid config value for {field}: {message}")]
    Invalid { field: String, message: String },
}

/// Built-in layout strategies plus the external script hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum LayoutKind {
    /// Participants end-to-end along the horizontal axis.
    Hstack,
    /// Participants end-to-end along the vertical axis.
    Vstack,
    /// Row-major grid.
    Hgrid,
    /// Column-major grid.
    #[default]
    Vgrid,
    /// Delegate placement to an external Lua script.
    Script,
}

impl LayoutKind {
    /// True for the horizontally-packing kinds (hstack, hgrid).
    pub fn is_horizontal(&self) -> bool {
        matches!(self, LayoutKind::Hstack | LayoutKind::Hgrid)
    }
}

impl FromStr for LayoutKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "hstack" => Ok(LayoutKind::Hstack),
            "vstack" => Ok(LayoutKind::Vstack),
            "hgrid" => Ok(LayoutKind::Hgrid),
            "vgrid" => Ok(LayoutKind::Vgrid),
            "script" => Ok(LayoutKind::Script),
            other => Err(ConfigError::Invalid {
                field: "layout".to_string(),
                message: format!("unknown layout kind: {other}"),
            }),
        }
    }
}

/// Composition configuration consumed by the core pipeline.
///
/// Owned and populated by the external CLI; the core only reads it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct CompositionConfig {
    /// Tiling strategy for participant placement.
    pub layout: LayoutKind,

    /// Relative share of the canvas given to camera content when mixed
    /// with screen content. Must be >= 1.
    pub camera_weight: u32,

    /// Relative share of the canvas given to screen content. Must be >= 1.
    pub screen_weight: u32,

    /// Pixels inserted between placed participants.
    pub margin: u32,

    /// Output canvas width in pixels.
    pub width: u32,

    /// Output canvas height in pixels.
    pub height: u32,

    /// Output frame rate.
    pub frame_rate: u32,

    /// Crop participants to fill their cell instead of letterboxing.
    pub crop: bool,

    /// Recompute the layout for each chunk's active set. When false, seat
    /// positions stay fixed across the whole session.
    pub dynamic: bool,

    /// Trim audio that precedes the first chunk with video content.
    pub audio_trim_first: bool,

    /// Trim audio that follows the last chunk with video content.
    pub audio_trim_last: bool,

    /// Lua layout script, required when `layout = "script"`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub script_file: Option<PathBuf>,

    /// Plan only: synthesize segments instead of consuming probed ones.
    pub dry_run: bool,
}

impl Default for CompositionConfig {
    fn default() -> Self {
        Self {
            layout: LayoutKind::Vgrid,
            camera_weight: 1,
            screen_weight: 1,
            margin: 0,
            width: 1280,
            height: 720,
            frame_rate: 30,
            crop: false,
            dynamic: false,
            audio_trim_first: false,
            audio_trim_last: false,
            script_file: None,
            dry_run: false,
        }
    }
}

impl CompositionConfig {
    /// Load configuration from all standard sources.
    ///
    /// Load order (later wins):
    /// 1. Compiled defaults
    /// 2. `/etc/barnraiser/config.toml`
    /// 3. `~/.config/barnraiser/config.toml`
    /// 4. `./barnraiser.toml`
    /// 5. Environment variables
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Load configuration, optionally replacing the local override with an
    /// explicit file path.
    pub fn load_from(config_path: Option<&std::path::Path>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        for path in loader::discover_config_files_with_override(config_path) {
            let layer = loader::load_from_file(&path)?;
            config = layer;
        }

        loader::apply_env_overrides(&mut config)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values no layout or graph computation can work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.camera_weight < 1 {
            return Err(ConfigError::Invalid {
                field: "camera-weight".to_string(),
                message: "must be >= 1".to_string(),
            });
        }
        if self.screen_weight < 1 {
            return Err(ConfigError::Invalid {
                field: "screen-weight".to_string(),
                message: "must be >= 1".to_string(),
            });
        }
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::Invalid {
                field: "width/height".to_string(),
                message: "canvas dimensions must be non-zero".to_string(),
            });
        }
        if self.frame_rate == 0 {
            return Err(ConfigError::Invalid {
                field: "frame-rate".to_string(),
                message: "must be non-zero".to_string(),
            });
        }
        if self.layout == LayoutKind::Script && self.script_file.is_none() {
            return Err(ConfigError::Invalid {
                field: "script-file".to_string(),
                message: "required when layout = \"script\"".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults_are_valid() {
        let config = CompositionConfig::default();
        config.validate().unwrap();
        assert_eq!(config.layout, LayoutKind::Vgrid);
        assert_eq!(config.width, 1280);
        assert_eq!(config.frame_rate, 30);
    }

    #[test]
    fn layout_kind_from_str() {
        assert_eq!("hgrid".parse::<LayoutKind>().unwrap(), LayoutKind::Hgrid);
        assert_eq!("HStack".parse::<LayoutKind>().unwrap(), LayoutKind::Hstack);
        assert!("diagonal".parse::<LayoutKind>().is_err());
    }

    #[test]
    fn zero_weight_rejected() {
        let config = CompositionConfig {
            camera_weight: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { field, .. }) if field == "camera-weight"
        ));
    }

    #[test]
    fn script_layout_requires_script_file() {
        let config = CompositionConfig {
            layout: LayoutKind::Script,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = CompositionConfig {
            layout: LayoutKind::Script,
            script_file: Some(PathBuf::from("layout.lua")),
            ..Default::default()
        };
        config.validate().unwrap();
    }

    #[test]
    fn toml_roundtrip_uses_kebab_case() {
        let config = CompositionConfig {
            layout: LayoutKind::Hstack,
            frame_rate: 60,
            audio_trim_first: true,
            ..Default::default()
        };
        let text = toml::to_string(&config).unwrap();
        assert!(text.contains("frame-rate = 60"));
        assert!(text.contains("layout = \"hstack\""));
        let parsed: CompositionConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed.layout, LayoutKind::Hstack);
        assert_eq!(parsed.frame_rate, 60);
        assert!(parsed.audio_trim_first);
    }
}
