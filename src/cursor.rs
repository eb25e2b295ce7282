//! Locating Xcursor themes on the cursor search path.

use crate::kconfig::ConfigFile;
use std::path::{Path, PathBuf};

const MAX_INHERIT_DEPTH: usize = 10;

/// Directory of the cursor theme `theme`, if installed.
///
/// A directory counts when it has a `cursors/` subdir, or when its
/// `index.theme` inherits (transitively) from a theme that does.
pub fn cursor_theme_dir(search_dirs: &[PathBuf], theme: &str) -> Option<PathBuf> {
    resolve(search_dirs, theme, 0)
}

fn resolve(search_dirs: &[PathBuf], theme: &str, depth: usize) -> Option<PathBuf> {
    if depth > MAX_INHERIT_DEPTH || theme.is_empty() || theme.contains('/') {
        return None;
    }

    for base in search_dirs {
        let dir = base.join(theme);
        if !dir.is_dir() {
            continue;
        }

        if dir.join("cursors").is_dir() {
            return Some(dir);
        }

        if inherits_cursor_theme(search_dirs, &dir, theme, depth) {
            return Some(dir);
        }
    }

    None
}

fn inherits_cursor_theme(search_dirs: &[PathBuf], dir: &Path, theme: &str, depth: usize) -> bool {
    let index = dir.join("index.theme");
    if !index.is_file() {
        return false;
    }
    let Ok(config) = ConfigFile::open(&index) else {
        return false;
    };

    config
        .read_list(&["Icon Theme"], "Inherits")
        .iter()
        .filter(|parent| parent.as_str() != theme)
        .any(|parent| resolve(search_dirs, parent, depth + 1).is_some())
}
