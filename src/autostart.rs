//! Autostart helpers for managing XDG autostart entries.

use crate::desktop::{self, DesktopEntry, DesktopError};
use crate::paths::Paths;
use std::path::PathBuf;
use tracing::info;

/// Get the path to the user autostart desktop file of `service`.
pub fn autostart_path(paths: &Paths, service: &str) -> PathBuf {
    paths.store(&format!("autostart/{}.desktop", service))
}

/// Check if autostart is currently enabled.
pub fn is_autostart_enabled(paths: &Paths, service: &str) -> bool {
    let path = autostart_path(paths, service);
    DesktopEntry::parse(&path)
        .map(|e| !e.is_hidden())
        .unwrap_or(false)
}

/// Enable or disable autostart of `service`, optionally replacing its command.
///
/// The user entry starts from an existing autostart file, then from the
/// installed application entry, then from a blank entry.
pub fn set_autostart(
    paths: &Paths,
    service: &str,
    enabled: bool,
    command: Option<&str>,
) -> Result<(), DesktopError> {
    let path = autostart_path(paths, service);

    let mut entry = DesktopEntry::parse(&path)
        .ok()
        .or_else(|| desktop::find_service(paths, service))
        .unwrap_or_else(|| DesktopEntry::new(service));

    if let Some(command) = command {
        entry.set_exec(command);
    }
    entry.set_hidden(!enabled);
    entry.write(&path)?;

    info!(
        "Autostart {} for {}",
        if enabled { "enabled" } else { "disabled" },
        service
    );
    Ok(())
}
