//! Filesystem search paths and session environment.

use crate::config::Config;
use std::path::{Path, PathBuf};

/// Directories Xcursor scans when `XCURSOR_PATH` is unset.
const DEFAULT_CURSOR_PATH: &str = "~/.icons:/usr/share/icons:/usr/share/pixmaps:/usr/X11R6/lib/X11/icons";

/// What the running session allows the appliers to touch live.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Session {
    /// Running inside a full Plasma session (`KDE_FULL_SESSION`).
    pub full_session: bool,
    /// An X11 display is reachable, so cursors and X resources can be reloaded.
    pub x11: bool,
}

impl Session {
    pub fn from_env() -> Self {
        Self {
            full_session: std::env::var_os("KDE_FULL_SESSION").is_some(),
            x11: std::env::var_os("DISPLAY").is_some_and(|d| !d.is_empty()),
        }
    }
}

/// Resolved locations used by the enumerator and the appliers.
#[derive(Debug, Clone)]
pub struct Paths {
    /// Where target stores (`kdeglobals`, `kwinrc`, ...) live.
    pub config_dir: PathBuf,
    /// Generic data dirs in priority order (user dir first).
    pub data_dirs: Vec<PathBuf>,
    /// Xcursor theme search path.
    pub cursor_dirs: Vec<PathBuf>,
    pub session: Session,
}

impl Paths {
    /// Resolve paths from the XDG environment plus the tool configuration.
    pub fn from_env(config: &Config) -> Self {
        let base = directories::BaseDirs::new();

        let config_dir = base
            .as_ref()
            .map(|b| b.config_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from(shellexpand::tilde("~/.config").as_ref()));

        let mut data_dirs = config.package_directories();
        if let Some(b) = &base {
            data_dirs.push(b.data_dir().to_path_buf());
        }
        let system = std::env::var("XDG_DATA_DIRS")
            .ok()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "/usr/local/share:/usr/share".to_string());
        data_dirs.extend(split_search_path(&system));
        dedup(&mut data_dirs);

        let cursor_path = std::env::var("XCURSOR_PATH")
            .ok()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_CURSOR_PATH.to_string());

        Self {
            config_dir,
            data_dirs,
            cursor_dirs: split_search_path(&cursor_path),
            session: Session::from_env(),
        }
    }

    /// Paths rooted in a single directory, with no live session.
    pub fn rooted(root: &Path) -> Self {
        Self {
            config_dir: root.join("config"),
            data_dirs: vec![root.join("share")],
            cursor_dirs: vec![root.join("icons")],
            session: Session::default(),
        }
    }

    /// Full path of a target store such as `kdeglobals` or `Kvantum/kvantum.kvconfig`.
    pub fn store(&self, name: &str) -> PathBuf {
        self.config_dir.join(name)
    }

    /// Every existing `<data dir>/<sub>` in priority order.
    pub fn locate_all(&self, sub: &str) -> Vec<PathBuf> {
        self.data_dirs
            .iter()
            .map(|d| d.join(sub))
            .filter(|p| p.is_dir())
            .collect()
    }

    /// First `<data dir>/<sub>` that exists.
    pub fn locate(&self, sub: &str) -> Option<PathBuf> {
        self.data_dirs.iter().map(|d| d.join(sub)).find(|p| p.exists())
    }
}

/// Split a colon separated search path, expanding `~` and dropping duplicates.
pub fn split_search_path(value: &str) -> Vec<PathBuf> {
    let mut dirs: Vec<PathBuf> = value
        .split(':')
        .filter(|s| !s.is_empty())
        .map(|s| PathBuf::from(shellexpand::tilde(s).as_ref()))
        .collect();
    dedup(&mut dirs);
    dirs
}

/// Remove later duplicates while keeping the first occurrence's position.
fn dedup(dirs: &mut Vec<PathBuf>) {
    let mut seen = Vec::with_capacity(dirs.len());
    dirs.retain(|d| {
        if seen.contains(d) {
            false
        } else {
            seen.push(d.clone());
            true
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_split_search_path() {
        let dirs = split_search_path("/usr/share/icons::/usr/share/pixmaps:/usr/share/icons");
        assert_eq!(
            dirs,
            vec![
                PathBuf::from("/usr/share/icons"),
                PathBuf::from("/usr/share/pixmaps")
            ]
        );
    }

    #[test]
    fn test_split_search_path_expands_tilde() {
        for dir in split_search_path("~/.icons:/usr/share/icons") {
            assert!(!dir.starts_with("~"));
        }
    }

    #[test]
    fn test_locate_all_skips_missing() {
        let tmp = TempDir::new().unwrap();
        let first = tmp.path().join("a");
        let second = tmp.path().join("b");
        fs::create_dir_all(second.join("color-schemes")).unwrap();

        let mut paths = Paths::rooted(tmp.path());
        paths.data_dirs = vec![first, second.clone()];

        assert_eq!(paths.locate_all("color-schemes"), vec![second.join("color-schemes")]);
        assert!(paths.locate("plasma").is_none());
    }

    #[test]
    fn test_store_path() {
        let paths = Paths::rooted(Path::new("/tmp/root"));
        assert_eq!(
            paths.store("Kvantum/kvantum.kvconfig"),
            PathBuf::from("/tmp/root/config/Kvantum/kvantum.kvconfig")
        );
    }
}
