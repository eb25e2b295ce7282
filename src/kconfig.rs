//! KConfig-style key/value files (`kdeglobals`, `kwinrc`, package `defaults`, ...).
//!
//! Groups are written as `[Group]` headers, nested groups as `[Outer][Inner]`.
//! Group and entry order from the file is preserved so rewriting a store does
//! not reshuffle keys the user or other tools wrote.

use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum KConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to replace {path:?}: {source}")]
    Persist {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Config has no backing file")]
    NoPath,
}

#[derive(Debug, Clone, Default)]
struct Group {
    path: Vec<String>,
    entries: Vec<(String, String)>,
}

impl Group {
    fn matches(&self, path: &[&str]) -> bool {
        self.path.len() == path.len() && self.path.iter().zip(path).all(|(a, b)| a == b)
    }

    /// Entries keep their key text as written, flags included; lookups go
    /// by the bare name.
    fn entry(&self, key: &str) -> Option<&(String, String)> {
        self.entries.iter().find(|(k, _)| strip_key_flags(k) == key)
    }

    fn raw(&self, key: &str) -> Option<&str> {
        self.entry(key).map(|(_, v)| v.as_str())
    }

    /// Set the value for `raw_key`'s name. An existing entry keeps its
    /// flags; an entry marked immutable (`[$i]`) is left alone.
    fn set_raw(&mut self, raw_key: &str, value: String) {
        let name = strip_key_flags(raw_key);
        match self.entries.iter_mut().find(|(k, _)| strip_key_flags(k) == name) {
            Some((key, _)) if is_immutable(key) => {
                debug!("Not overwriting immutable entry {}", key);
            }
            Some(entry) => entry.1 = value,
            None => self.entries.push((raw_key.to_string(), value)),
        }
    }
}

/// An in-memory KConfig file, optionally bound to a path on disk.
#[derive(Debug, Clone, Default)]
pub struct ConfigFile {
    groups: Vec<Group>,
    path: Option<PathBuf>,
}

impl ConfigFile {
    /// Open a config file. A missing file yields an empty config bound to
    /// `path`, which is created on the first [`ConfigFile::sync`].
    pub fn open(path: &Path) -> Result<Self, KConfigError> {
        let mut config = match fs::read_to_string(path) {
            Ok(content) => Self::parse(&content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Self::default(),
            Err(e) => return Err(e.into()),
        };
        config.path = Some(path.to_path_buf());
        Ok(config)
    }

    /// Parse config text that is not bound to any file.
    pub fn parse(content: &str) -> Self {
        let mut config = Self::default();
        let mut current: Vec<String> = Vec::new();

        for line in content.lines() {
            let trimmed = line.trim();

            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            if trimmed.starts_with('[') && trimmed.ends_with(']') {
                current = parse_header(trimmed);
                continue;
            }

            if let Some(eq_pos) = trimmed.find('=') {
                let key = trimmed[..eq_pos].trim();
                let value = trimmed[eq_pos + 1..].trim().to_string();
                let path: Vec<&str> = current.iter().map(String::as_str).collect();
                config.group_mut(&path).set_raw(key, value);
            }
        }

        config
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn has_group(&self, group: &[&str]) -> bool {
        self.find(group).is_some_and(|g| !g.entries.is_empty())
    }

    /// Read a string entry. Missing and empty entries both read as `None`.
    pub fn read(&self, group: &[&str], key: &str) -> Option<String> {
        self.find(group)
            .and_then(|g| g.raw(key))
            .filter(|v| !v.is_empty())
            .map(unescape)
    }

    /// Read a comma separated list entry (`\,` escapes a literal comma).
    pub fn read_list(&self, group: &[&str], key: &str) -> Vec<String> {
        let Some(raw) = self.find(group).and_then(|g| g.raw(key)) else {
            return Vec::new();
        };

        split_list(raw)
            .into_iter()
            .map(|item| unescape(&item).replace("\\,", ","))
            .filter(|item| !item.is_empty())
            .collect()
    }

    pub fn write(&mut self, group: &[&str], key: &str, value: &str) {
        self.group_mut(group).set_raw(key, escape(value));
    }

    /// Copy every entry of every group in `other` into this config,
    /// overwriting keys that already exist.
    pub fn merge(&mut self, other: &ConfigFile) {
        for group in &other.groups {
            let path: Vec<&str> = group.path.iter().map(String::as_str).collect();
            let target = self.group_mut(&path);
            for (key, value) in &group.entries {
                target.set_raw(key, value.clone());
            }
        }
    }


    /// Atomically write the config back to its file.
    pub fn sync(&self) -> Result<(), KConfigError> {
        let path = self.path.as_deref().ok_or(KConfigError::NoPath)?;
        self.save_as(path)
    }

    /// Atomically write the config to `path`, leaving its own binding alone.
    pub fn save_as(&self, path: &Path) -> Result<(), KConfigError> {
        let parent = path.parent().unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(parent)?;

        let mut tmp = NamedTempFile::new_in(parent)?;
        tmp.write_all(self.to_string().as_bytes())?;
        tmp.persist(path).map_err(|e| KConfigError::Persist {
            path: path.to_path_buf(),
            source: e.error,
        })?;

        debug!("Wrote config: {:?}", path);
        Ok(())
    }

    fn find(&self, group: &[&str]) -> Option<&Group> {
        self.groups.iter().find(|g| g.matches(group))
    }

    fn group_mut(&mut self, group: &[&str]) -> &mut Group {
        let index = match self.groups.iter().position(|g| g.matches(group)) {
            Some(index) => index,
            None => {
                self.groups.push(Group {
                    path: group.iter().map(|s| s.to_string()).collect(),
                    entries: Vec::new(),
                });
                self.groups.len() - 1
            }
        };
        &mut self.groups[index]
    }
}

impl fmt::Display for ConfigFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;

        // Entries outside any group must come before the first header.
        let ordered = self
            .groups
            .iter()
            .filter(|g| g.path.is_empty())
            .chain(self.groups.iter().filter(|g| !g.path.is_empty()));

        for group in ordered {
            if group.entries.is_empty() {
                continue;
            }
            if !first {
                writeln!(f)?;
            }
            first = false;

            if !group.path.is_empty() {
                writeln!(f, "[{}]", group.path.join("]["))?;
            }
            for (key, value) in &group.entries {
                writeln!(f, "{}={}", key, value)?;
            }
        }

        Ok(())
    }
}

/// `[kdeglobals][KDE]` -> `["kdeglobals", "KDE"]`
fn parse_header(header: &str) -> Vec<String> {
    header[1..header.len() - 1]
        .split("][")
        .map(|s| s.to_string())
        .collect()
}

/// Drop KConfig entry flags such as `[$e]` or `[$i]` from a key.
fn strip_key_flags(key: &str) -> &str {
    match key.find("[$") {
        Some(pos) => key[..pos].trim_end(),
        None => key,
    }
}

fn is_immutable(raw_key: &str) -> bool {
    raw_key
        .find("[$")
        .is_some_and(|pos| raw_key[pos..].contains('i'))
}

fn split_list(raw: &str) -> Vec<String> {
    let mut items = Vec::new();
    let mut current = String::new();
    let mut chars = raw.chars();

    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                current.push(c);
                if let Some(next) = chars.next() {
                    current.push(next);
                }
            }
            ',' => items.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    items.push(current);

    items
}

fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('s') => out.push(' '),
            Some('t') => out.push('\t'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('\\') => out.push('\\'),
            // Unknown escapes (`\,`, `\;`) are left for list handling.
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }

    out
}

fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let last = value.chars().count().saturating_sub(1);

    for (i, c) in value.chars().enumerate() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            ' ' if i == 0 || i == last => out.push_str("\\s"),
            _ => out.push(c),
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SAMPLE: &str = "\
[kdeglobals][KDE]
widgetStyle=Breeze

[kdeglobals][General]
ColorScheme=Breeze Dark
Empty=

[Autostart]
Services=org.kde.latte-dock,org.kde.yakuake

[Desktop Entry]
Exec[$e]=foo %u
Name[de]=Thema
";

    #[test]
    fn test_read_nested_groups() {
        let config = ConfigFile::parse(SAMPLE);
        assert_eq!(
            config.read(&["kdeglobals", "KDE"], "widgetStyle").as_deref(),
            Some("Breeze")
        );
        assert_eq!(
            config.read(&["kdeglobals", "General"], "ColorScheme").as_deref(),
            Some("Breeze Dark")
        );
        // Nested group is not visible through its parent name alone.
        assert_eq!(config.read(&["kdeglobals"], "widgetStyle"), None);
    }

    #[test]
    fn test_empty_and_missing_read_as_none() {
        let config = ConfigFile::parse(SAMPLE);
        assert_eq!(config.read(&["kdeglobals", "General"], "Empty"), None);
        assert_eq!(config.read(&["kdeglobals", "General"], "Missing"), None);
        assert_eq!(config.read(&["NoSuchGroup"], "Missing"), None);
    }

    #[test]
    fn test_key_flags_are_stripped() {
        let config = ConfigFile::parse(SAMPLE);
        assert_eq!(
            config.read(&["Desktop Entry"], "Exec").as_deref(),
            Some("foo %u")
        );
        assert_eq!(
            config.read(&["Desktop Entry"], "Name[de]").as_deref(),
            Some("Thema")
        );
    }

    #[test]
    fn test_read_list() {
        let config = ConfigFile::parse(SAMPLE);
        assert_eq!(
            config.read_list(&["Autostart"], "Services"),
            vec!["org.kde.latte-dock", "org.kde.yakuake"]
        );

        let escaped = ConfigFile::parse("[G]\nK=a\\,b,c\n");
        assert_eq!(escaped.read_list(&["G"], "K"), vec!["a,b", "c"]);
        assert!(escaped.read_list(&["G"], "Missing").is_empty());
    }

    #[test]
    fn test_escapes() {
        let mut config = ConfigFile::default();
        config.write(&["G"], "K", " padded\tvalue ");
        let text = config.to_string();
        assert!(text.contains("K=\\spadded\\tvalue\\s"));

        let reparsed = ConfigFile::parse(&text);
        assert_eq!(reparsed.read(&["G"], "K").as_deref(), Some(" padded\tvalue "));
    }

    #[test]
    fn test_write_sync_and_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sub/kwinrc");

        let mut config = ConfigFile::open(&path).unwrap();
        assert!(!config.has_group(&["TabBox"]));
        config.write(&["TabBox"], "LayoutName", "thumbnails");
        config.write(&["org.kde.kdecoration2"], "library", "org.kde.breeze");
        config.sync().unwrap();

        let reopened = ConfigFile::open(&path).unwrap();
        assert_eq!(
            reopened.read(&["TabBox"], "LayoutName").as_deref(),
            Some("thumbnails")
        );
        assert_eq!(
            reopened.read(&["org.kde.kdecoration2"], "library").as_deref(),
            Some("org.kde.breeze")
        );
    }

    #[test]
    fn test_key_flags_survive_rewrite() {
        let mut config = ConfigFile::parse(
            "[General]\nBrowserApplication[$e]=$HOME/bin/browser.desktop\n\n\
             [KDE]\nSingleClick[$i]=false\n",
        );
        config.write(&["Icons"], "Theme", "Papirus");

        assert_eq!(
            config.to_string(),
            "[General]\nBrowserApplication[$e]=$HOME/bin/browser.desktop\n\n\
             [KDE]\nSingleClick[$i]=false\n\n\
             [Icons]\nTheme=Papirus\n"
        );
    }

    #[test]
    fn test_write_keeps_flags_and_respects_immutable() {
        let mut config = ConfigFile::parse("[KDE]\nwidgetStyle[$e]=Oxygen\nSingleClick[$i]=false\n");
        config.write(&["KDE"], "widgetStyle", "Breeze");
        config.write(&["KDE"], "SingleClick", "true");

        assert_eq!(config.read(&["KDE"], "SingleClick").as_deref(), Some("false"));
        assert_eq!(
            config.to_string(),
            "[KDE]\nwidgetStyle[$e]=Breeze\nSingleClick[$i]=false\n"
        );
    }

    #[test]
    fn test_write_preserves_unrelated_entries() {
        let mut config = ConfigFile::parse("[KDE]\nSingleClick=false\nwidgetStyle=Oxygen\n");
        config.write(&["KDE"], "widgetStyle", "Breeze");

        let text = config.to_string();
        assert_eq!(text, "[KDE]\nSingleClick=false\nwidgetStyle=Breeze\n");
    }

    #[test]
    fn test_merge_overwrites_and_adds() {
        let mut target = ConfigFile::parse("[Colors:Window]\nBackgroundNormal=1,2,3\nKeep=yes\n");
        let colors = ConfigFile::parse(
            "[Colors:Window]\nBackgroundNormal=49,54,59\n\n[WM]\nactiveBackground=71,80,87\n",
        );

        target.merge(&colors);

        assert_eq!(
            target.read(&["Colors:Window"], "BackgroundNormal").as_deref(),
            Some("49,54,59")
        );
        assert_eq!(target.read(&["Colors:Window"], "Keep").as_deref(), Some("yes"));
        assert_eq!(
            target.read(&["WM"], "activeBackground").as_deref(),
            Some("71,80,87")
        );
    }

    #[test]
    fn test_sync_without_path_fails() {
        let config = ConfigFile::default();
        assert!(matches!(config.sync(), Err(KConfigError::NoPath)));
    }
}
