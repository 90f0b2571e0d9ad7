//! Config file discovery, loading, and environment variable overlay.

use crate::{CompositionConfig, ConfigError, LayoutKind};
use std::env;
use std::path::{Path, PathBuf};

/// Discover config files in standard locations.
///
/// Returns paths in load order (system, user, local).
/// Only returns files that exist.
pub fn discover_config_files() -> Vec<PathBuf> {
    discover_config_files_with_override(None)
}

/// Discover config files, optionally with a CLI override path.
///
/// If `cli_path` is provided and exists, it replaces the local override.
pub fn discover_config_files_with_override(cli_path: Option<&Path>) -> Vec<PathBuf> {
    let mut files = Vec::new();

    let system = PathBuf::from("/etc/barnraiser/config.toml");
    if system.exists() {
        files.push(system);
    }

    if let Some(config_dir) = directories::BaseDirs::new().map(|d| d.config_dir().to_path_buf()) {
        let user = config_dir.join("barnraiser/config.toml");
        if user.exists() {
            files.push(user);
        }
    }

    // CLI override takes precedence over local
    if let Some(path) = cli_path {
        if path.exists() {
            files.push(path.to_path_buf());
            return files;
        }
    }

    let local = PathBuf::from("barnraiser.toml");
    if local.exists() {
        files.push(local);
    }

    files
}

/// Load config from a TOML file.
pub fn load_from_file(path: &Path) -> Result<CompositionConfig, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    toml::from_str(&contents).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Overlay `BARNRAISER_*` environment variables onto a config.
///
/// Recognized variables mirror the TOML keys: `BARNRAISER_LAYOUT`,
/// `BARNRAISER_WIDTH`, `BARNRAISER_HEIGHT`, `BARNRAISER_FRAME_RATE`,
/// `BARNRAISER_MARGIN`, `BARNRAISER_CAMERA_WEIGHT`,
/// `BARNRAISER_SCREEN_WEIGHT`, `BARNRAISER_CROP`, `BARNRAISER_DYNAMIC`,
/// `BARNRAISER_SCRIPT_FILE`, `BARNRAISER_DRY_RUN`.
pub fn apply_env_overrides(config: &mut CompositionConfig) -> Result<(), ConfigError> {
    if let Ok(v) = env::var("BARNRAISER_LAYOUT") {
        config.layout = v.parse::<LayoutKind>()?;
    }
    if let Ok(v) = env::var("BARNRAISER_WIDTH") {
        config.width = parse_number("BARNRAISER_WIDTH", &v)?;
    }
    if let Ok(v) = env::var("BARNRAISER_HEIGHT") {
        config.height = parse_number("BARNRAISER_HEIGHT", &v)?;
    }
    if let Ok(v) = env::var("BARNRAISER_FRAME_RATE") {
        config.frame_rate = parse_number("BARNRAISER_FRAME_RATE", &v)?;
    }
    if let Ok(v) = env::var("BARNRAISER_MARGIN") {
        config.margin = parse_number("BARNRAISER_MARGIN", &v)?;
    }
    if let Ok(v) = env::var("BARNRAISER_CAMERA_WEIGHT") {
        config.camera_weight = parse_number("BARNRAISER_CAMERA_WEIGHT", &v)?;
    }
    if let Ok(v) = env::var("BARNRAISER_SCREEN_WEIGHT") {
        config.screen_weight = parse_number("BARNRAISER_SCREEN_WEIGHT", &v)?;
    }
    if let Ok(v) = env::var("BARNRAISER_CROP") {
        config.crop = parse_bool("BARNRAISER_CROP", &v)?;
    }
    if let Ok(v) = env::var("BARNRAISER_DYNAMIC") {
        config.dynamic = parse_bool("BARNRAISER_DYNAMIC", &v)?;
    }
    if let Ok(v) = env::var("BARNRAISER_AUDIO_TRIM_FIRST") {
        config.audio_trim_first = parse_bool("BARNRAISER_AUDIO_TRIM_FIRST", &v)?;
    }
    if let Ok(v) = env::var("BARNRAISER_AUDIO_TRIM_LAST") {
        config.audio_trim_last = parse_bool("BARNRAISER_AUDIO_TRIM_LAST", &v)?;
    }
    if let Ok(v) = env::var("BARNRAISER_SCRIPT_FILE") {
        config.script_file = Some(PathBuf::from(v));
    }
    if let Ok(v) = env::var("BARNRAISER_DRY_RUN") {
        config.dry_run = parse_bool("BARNRAISER_DRY_RUN", &v)?;
    }
    Ok(())
}

fn parse_number(name: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse().map_err(|_| ConfigError::Invalid {
        field: name.to_string(),
        message: format!("expected a number, got {value:?}"),
    })
}

fn parse_bool(name: &str, value: &str) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::Invalid {
            field: name.to_string(),
            message: format!("expected a boolean, got {other:?}"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn load_from_file_parses_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "layout = \"hgrid\"\nwidth = 1920\nheight = 1080\nmargin = 8"
        )
        .unwrap();

        let config = load_from_file(file.path()).unwrap();
        assert_eq!(config.layout, LayoutKind::Hgrid);
        assert_eq!(config.width, 1920);
        assert_eq!(config.height, 1080);
        assert_eq!(config.margin, 8);
        // Unspecified keys keep their defaults
        assert_eq!(config.frame_rate, 30);
    }

    #[test]
    fn load_from_file_reports_parse_errors() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "width = \"wide\"").unwrap();

        let err = load_from_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn load_missing_file_is_file_read_error() {
        let err = load_from_file(Path::new("/nonexistent/barnraiser.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::FileRead { .. }));
    }

    #[test]
    fn bool_parsing_accepts_common_spellings() {
        assert!(parse_bool("X", "true").unwrap());
        assert!(parse_bool("X", "ON").unwrap());
        assert!(!parse_bool("X", "0").unwrap());
        assert!(parse_bool("X", "maybe").is_err());
    }
}
