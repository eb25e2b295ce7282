//! Color scheme resolution and merging into `kdeglobals`.
//!
//! Packages usually name a scheme rather than ship one. Installed schemes
//! carry no metadata, so the name is normalized the same way scheme file
//! names are produced and matched against the end of each file name (store
//! downloads prepend an id).

use crate::kconfig::{ConfigFile, KConfigError};
use crate::paths::Paths;
use std::fs;
use std::path::{Path, PathBuf};

pub const SCHEME_DIR: &str = "color-schemes";
pub const SCHEME_EXTENSION: &str = ".colors";

/// Turn a display name into the file-name form: apostrophes dropped, every
/// run of punctuation/space removed and the character after it upper-cased,
/// first character upper-cased.
///
/// `"Breeze Dark"` becomes `"BreezeDark"`, `"Foo's theme"` becomes `"FoosTheme"`.
pub fn normalize_scheme_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut chars = name.chars().filter(|c| *c != '\'').peekable();

    while let Some(c) = chars.next() {
        if is_word(c) {
            out.push(c);
            continue;
        }
        while chars.peek().is_some_and(|n| !is_word(*n)) {
            chars.next();
        }
        if let Some(next) = chars.next() {
            out.extend(next.to_uppercase());
        }
    }

    let mut rest = out.chars();
    match rest.next() {
        Some(first) => first.to_uppercase().chain(rest).collect(),
        None => out,
    }
}

fn is_word(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// First installed scheme file whose name ends with `<normalized>.colors`.
/// Data dirs are searched in priority order, files within a dir by name.
pub fn find_scheme_file(paths: &Paths, normalized: &str) -> Option<PathBuf> {
    let suffix = format!("{}{}", normalized, SCHEME_EXTENSION);

    paths
        .locate_all(SCHEME_DIR)
        .iter()
        .find_map(|dir| scheme_files(dir).into_iter().find(|f| ends_with(f, &suffix)))
}

fn ends_with(path: &Path, suffix: &str) -> bool {
    path.file_name()
        .is_some_and(|n| n.to_string_lossy().ends_with(suffix))
}

fn scheme_files(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)
        .map(|rd| {
            rd.flatten()
                .map(|e| e.path())
                .filter(|p| p.is_file() && ends_with(p, SCHEME_EXTENSION))
                .collect()
        })
        .unwrap_or_default();
    files.sort();
    files
}

/// Copy every group of `colors_file` into `kdeglobals` and record `scheme`
/// as the active scheme name.
pub fn merge_scheme(
    kdeglobals: &mut ConfigFile,
    scheme: &str,
    colors_file: &Path,
) -> Result<(), KConfigError> {
    let colors = ConfigFile::open(colors_file)?;
    kdeglobals.merge(&colors);
    kdeglobals.write(&["General"], "ColorScheme", scheme);
    Ok(())
}
