use anyhow::{Context, Result, ensure};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::magnify::{DockLayout, Falloff};

pub const DEFAULT_SPACING: f32 = 8.0;
pub const DEFAULT_DOCK_HEIGHT: f32 = 60.0;
pub const DEFAULT_MIN_ICON_SIZE: f32 = 1.0;
pub const CORNER_RADIUS: f32 = 14.0;
pub const BAR_OPACITY: f32 = 0.2;
/// Upper bound for any surface or icon edge, in logical pixels.
pub const MAX_EXTENT: f32 = 4096.0;

pub const fn bar_alpha() -> u8 {
    let clamped = if BAR_OPACITY < 0.0 {
        0.0
    } else if BAR_OPACITY > 1.0 {
        1.0
    } else {
        BAR_OPACITY
    };
    (clamped * 255.0 + 0.5) as u8
}

const DEFAULT_ICONS: [&str; 8] = [
    "internet-mail",
    "internet-web-browser",
    "accessories-text-editor",
    "utilities-terminal",
    "camera-photo",
    "image-viewer",
    "accessories-calculator",
    "preferences-system",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DockConfig {
    /// Icon identifiers, left to right. Theme names, app ids or `.desktop` names.
    pub icons: Vec<String>,
    pub spacing: f32,
    /// Height of the bar. Padding is a quarter of it, resting icons at most half.
    pub dock_height: f32,
    pub falloff: Falloff,
    pub min_icon_size: f32,
    pub corner_radius: f32,
    /// Fixed surface width in logical pixels; `None` spans the output.
    pub width: Option<u32>,
}

impl Default for DockConfig {
    fn default() -> Self {
        Self {
            icons: DEFAULT_ICONS.iter().map(|name| name.to_string()).collect(),
            spacing: DEFAULT_SPACING,
            dock_height: DEFAULT_DOCK_HEIGHT,
            falloff: Falloff::default(),
            min_icon_size: DEFAULT_MIN_ICON_SIZE,
            corner_radius: CORNER_RADIUS,
            width: None,
        }
    }
}

impl DockConfig {
    /// Loads `path`, or the default location when `path` is `None`.
    ///
    /// A missing default file yields defaults; an explicit path must exist.
    /// Not validated here, overrides still get applied on top.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => match default_config_path() {
                Some(path) if path.exists() => Self::from_file(&path)?,
                Some(path) => {
                    tracing::debug!("no config at {}, using defaults", path.display());
                    Self::default()
                }
                None => {
                    tracing::debug!("no config directory available, using defaults");
                    Self::default()
                }
            },
        };
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read config {}", path.display()))?;
        let config = Self::from_json(&text)
            .with_context(|| format!("parse config {}", path.display()))?;
        tracing::info!("loaded config from {}", path.display());
        Ok(config)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(!self.icons.is_empty(), "dock needs at least one icon");
        ensure!(
            self.spacing.is_finite() && self.spacing >= 0.0,
            "spacing must be non-negative, got {}",
            self.spacing
        );
        ensure!(
            self.dock_height.is_finite() && self.dock_height > 0.0,
            "dock_height must be positive, got {}",
            self.dock_height
        );
        ensure!(
            self.falloff.is_valid(),
            "falloff needs 0 < near <= far, got {}..{}",
            self.falloff.near,
            self.falloff.far
        );
        ensure!(
            self.min_icon_size.is_finite() && self.min_icon_size > 0.0,
            "min_icon_size must be positive, got {}",
            self.min_icon_size
        );
        ensure!(
            self.corner_radius.is_finite() && self.corner_radius >= 0.0,
            "corner_radius must be non-negative, got {}",
            self.corner_radius
        );
        if let Some(width) = self.width {
            ensure!(
                width > 0 && width as f32 <= MAX_EXTENT,
                "width must be within 1..={MAX_EXTENT}, got {width}"
            );
        }

        let layout = DockLayout::from_config(self);
        ensure!(
            layout.magnified_max_size() <= MAX_EXTENT,
            "magnified icons would be {} px, limit is {MAX_EXTENT}",
            layout.magnified_max_size()
        );
        ensure!(
            layout.surface_height() <= MAX_EXTENT,
            "dock would be {} px tall, limit is {MAX_EXTENT}",
            layout.surface_height()
        );
        Ok(())
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    let base = std::env::var_os("XDG_CONFIG_HOME")
        .filter(|dir| !dir.is_empty())
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".config")))?;
    Some(base.join("magdock").join("config.json"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_reference_dock() {
        let config = DockConfig::default();
        assert_eq!(config.icons.len(), 8);
        assert_eq!(config.spacing, 8.0);
        assert_eq!(config.dock_height, 60.0);
        assert_eq!(config.falloff, Falloff { near: 0.5, far: 2.5 });
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_json_keeps_other_defaults() {
        let config = DockConfig::from_json(r#"{ "icons": ["a", "b"], "spacing": 4 }"#).unwrap();
        assert_eq!(config.icons, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(config.spacing, 4.0);
        assert_eq!(config.dock_height, DEFAULT_DOCK_HEIGHT);
        assert_eq!(config.width, None);
    }

    #[test]
    fn falloff_is_configurable() {
        let config =
            DockConfig::from_json(r#"{ "falloff": { "near": 0.4, "far": 3.0 } }"#).unwrap();
        assert_eq!(config.falloff, Falloff { near: 0.4, far: 3.0 });
    }

    #[test]
    fn rejects_invalid_values() {
        let empty = DockConfig {
            icons: Vec::new(),
            ..DockConfig::default()
        };
        assert!(empty.validate().is_err());

        let negative_spacing = DockConfig {
            spacing: -1.0,
            ..DockConfig::default()
        };
        assert!(negative_spacing.validate().is_err());

        let flat = DockConfig {
            dock_height: 0.0,
            ..DockConfig::default()
        };
        assert!(flat.validate().is_err());

        let reversed = DockConfig {
            falloff: Falloff { near: 2.5, far: 0.5 },
            ..DockConfig::default()
        };
        assert!(reversed.validate().is_err());

        let zero_width = DockConfig {
            width: Some(0),
            ..DockConfig::default()
        };
        assert!(zero_width.validate().is_err());
    }

    #[test]
    fn loads_explicit_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "icons": ["firefox"], "dock_height": 80 }}"#).unwrap();
        let config = DockConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.icons, vec!["firefox".to_string()]);
        assert_eq!(config.dock_height, 80.0);
    }

    #[test]
    fn explicit_file_must_exist_and_parse() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();
        assert!(DockConfig::load(Some(file.path())).is_err());

        let missing = file.path().with_extension("missing");
        assert!(DockConfig::load(Some(&missing)).is_err());
    }

    #[test]
    fn load_leaves_validation_to_the_caller() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "icons": [] }}"#).unwrap();
        let config = DockConfig::load(Some(file.path())).unwrap();
        assert!(config.icons.is_empty());
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_oversized_magnification() {
        let tiny_near = DockConfig {
            falloff: Falloff { near: 1e-9, far: 2.5 },
            ..DockConfig::default()
        };
        assert!(tiny_near.validate().is_err());

        let tall = DockConfig {
            dock_height: 1e12,
            ..DockConfig::default()
        };
        assert!(tall.validate().is_err());

        let wide = DockConfig {
            width: Some(u32::MAX),
            ..DockConfig::default()
        };
        assert!(wide.validate().is_err());

        // 1024 px resting icons, 2048 magnified, 3072 tall surface
        let limit = DockConfig {
            dock_height: 2048.0,
            ..DockConfig::default()
        };
        assert!(limit.validate().is_ok());
    }

    #[test]
    fn bar_alpha_rounds() {
        assert_eq!(bar_alpha(), 51);
    }
}
