//! Tool configuration shared by the look-and-feel and desktop-layout tools.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),
    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),
    #[error("No config directory found")]
    NoConfigDir,
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Config {
    pub packages: PackagesConfig,
    pub lookandfeel: EnableFlags,
    pub tools: ToolsConfig,
    pub logging: LoggingConfig,
}

/// Package discovery configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PackagesConfig {
    /// Extra data directories searched before the XDG ones
    pub extra_dirs: Vec<String>,
    /// Package the loader hands back for unknown ids
    pub fallback: String,
    /// The designated default desktop layout package
    pub default_layout: String,
}

impl Default for PackagesConfig {
    fn default() -> Self {
        Self {
            extra_dirs: Vec::new(),
            fallback: "org.kde.breeze.desktop".to_string(),
            default_layout: "org.feren.default".to_string(),
        }
    }
}

/// Which components a look-and-feel save touches.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnableFlags {
    pub colors: bool,
    pub widget_style: bool,
    pub icons: bool,
    pub plasma_theme: bool,
    pub cursors: bool,
    pub window_switcher: bool,
    pub desktop_switcher: bool,
    pub window_decoration: bool,
}

impl Default for EnableFlags {
    fn default() -> Self {
        Self {
            colors: true,
            widget_style: true,
            icons: true,
            plasma_theme: true,
            cursors: true,
            window_switcher: true,
            desktop_switcher: true,
            window_decoration: true,
        }
    }
}

/// External helper programs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    /// Vendor theme tool (shadow fix, dark decoration, files layout)
    pub theme_tool: String,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            theme_tool: "/usr/bin/feren-theme-tool-plasma".to_string(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level used when no -v flag is given (trace, debug, info, warn, error)
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from the default location or create default if not exists
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            let config = Config::default();
            config.save()?;
            Ok(config)
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to the default location
    pub fn save(&self) -> Result<(), ConfigError> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(&config_path, content)?;
        Ok(())
    }

    /// Get the default config file path
    pub fn config_path() -> Result<PathBuf, ConfigError> {
        let dirs = directories::ProjectDirs::from("", "", "plasma-lnf")
            .ok_or(ConfigError::NoConfigDir)?;
        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Get expanded extra package directories as PathBufs
    pub fn package_directories(&self) -> Vec<PathBuf> {
        self.packages
            .extra_dirs
            .iter()
            .map(|d| PathBuf::from(shellexpand::tilde(d).as_ref()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.packages.default_layout, "org.feren.default");
        assert_eq!(config.packages.fallback, "org.kde.breeze.desktop");
        assert!(config.lookandfeel.colors);
        assert!(config.lookandfeel.window_decoration);
    }

    #[test]
    fn test_package_directories_expand_tilde() {
        let mut config = Config::default();
        config.packages.extra_dirs = vec!["~/themes".to_string(), "/opt/share".to_string()];

        let dirs = config.package_directories();
        assert_eq!(dirs.len(), 2);
        assert!(!dirs[0].starts_with("~"));
        assert_eq!(dirs[1], PathBuf::from("/opt/share"));
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: Config = toml::from_str(
            "[lookandfeel]\ncursors = false\n\n[packages]\ndefault_layout = \"org.example.layout\"\n",
        )
        .unwrap();

        assert!(!config.lookandfeel.cursors);
        assert!(config.lookandfeel.icons);
        assert_eq!(config.packages.default_layout, "org.example.layout");
        assert_eq!(config.tools.theme_tool, "/usr/bin/feren-theme-tool-plasma");
    }

    #[test]
    fn test_serialize_deserialize() {
        let config = Config::default();
        let serialized = toml::to_string_pretty(&config).unwrap();
        let deserialized: Config = toml::from_str(&serialized).unwrap();

        assert_eq!(config.lookandfeel, deserialized.lookandfeel);
        assert_eq!(config.packages.fallback, deserialized.packages.fallback);
    }
}
