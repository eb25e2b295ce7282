//! Desktop entry files: installed application services and autostart entries.

use crate::kconfig::{ConfigFile, KConfigError};
use crate::paths::Paths;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

const GROUP: &[&str] = &["Desktop Entry"];

#[derive(Error, Debug)]
pub enum DesktopError {
    #[error("Config error: {0}")]
    Config(#[from] KConfigError),
    #[error("Missing required field: {0}")]
    MissingField(String),
}

/// Represents a parsed .desktop file
#[derive(Debug, Clone)]
pub struct DesktopEntry {
    config: ConfigFile,
    /// Path the entry was parsed from
    pub source_path: Option<PathBuf>,
}

impl DesktopEntry {
    /// Parse a .desktop file
    pub fn parse(path: &Path) -> Result<Self, DesktopError> {
        let config = ConfigFile::open(path)?;

        if config.read(GROUP, "Name").is_none() {
            return Err(DesktopError::MissingField("Name".to_string()));
        }

        Ok(Self {
            config,
            source_path: Some(path.to_path_buf()),
        })
    }

    /// A fresh application entry with only `Type` and `Name` set.
    pub fn new(name: &str) -> Self {
        let mut config = ConfigFile::default();
        config.write(GROUP, "Type", "Application");
        config.write(GROUP, "Name", name);
        Self {
            config,
            source_path: None,
        }
    }

    /// Get the application name
    pub fn name(&self) -> Option<String> {
        self.config.read(GROUP, "Name")
    }

    /// Get the Exec command
    pub fn exec(&self) -> Option<String> {
        self.config.read(GROUP, "Exec")
    }

    /// D-Bus name the running application registers, if declared
    pub fn dbus_service_name(&self) -> Option<String> {
        self.config.read(GROUP, "X-DBUS-ServiceName")
    }

    pub fn is_hidden(&self) -> bool {
        self.config.read(GROUP, "Hidden").as_deref() == Some("true")
    }

    pub fn set_exec(&mut self, exec: &str) {
        self.config.write(GROUP, "Exec", exec);
    }

    pub fn set_hidden(&mut self, hidden: bool) {
        self.config
            .write(GROUP, "Hidden", if hidden { "true" } else { "false" });
    }

    /// Write the desktop entry to a file
    pub fn write(&self, path: &Path) -> Result<(), DesktopError> {
        self.config.save_as(path)?;
        debug!("Wrote desktop entry: {:?}", path);
        Ok(())
    }
}

/// Locate an installed application service (`applications/<name>.desktop`).
pub fn find_service(paths: &Paths, service: &str) -> Option<DesktopEntry> {
    let path = paths.locate(&format!("applications/{}.desktop", service))?;
    match DesktopEntry::parse(&path) {
        Ok(entry) => Some(entry),
        Err(e) => {
            debug!("Ignoring service {:?}: {}", path, e);
            None
        }
    }
}

/// Split an Exec line into argv, dropping `%f`-style field codes.
pub fn exec_argv(exec: &str) -> Vec<String> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut has_token = false;
    let mut chars = exec.chars();

    while let Some(c) = chars.next() {
        match c {
            '"' => {
                in_quotes = !in_quotes;
                has_token = true;
            }
            '\\' if in_quotes => {
                if let Some(next) = chars.next() {
                    current.push(next);
                }
            }
            c if c.is_whitespace() && !in_quotes => {
                if has_token {
                    args.push(std::mem::take(&mut current));
                    has_token = false;
                }
            }
            _ => {
                current.push(c);
                has_token = true;
            }
        }
    }
    if has_token {
        args.push(current);
    }

    args.into_iter().filter(|a| !is_field_code(a)).collect()
}

fn is_field_code(arg: &str) -> bool {
    let mut chars = arg.chars();
    chars.next() == Some('%') && chars.next().is_some() && chars.next().is_none()
}
