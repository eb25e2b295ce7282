//! X resource database export of colors, cursor and font settings.

use crate::kconfig::{ConfigFile, KConfigError};
use crate::paths::Paths;
use std::fmt::Write as _;
use std::ops::BitOr;

/// Which groups of settings to export.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResourceFlags(u8);

impl ResourceFlags {
    pub const NONE: Self = Self(0);
    pub const QT_COLORS: Self = Self(1);
    /// GTK themes are pushed through the GtkConfig bridge and add no lines here.
    pub const GTK_THEME: Self = Self(1 << 1);
    pub const COLORS: Self = Self(1 << 2);
    pub const QT_SETTINGS: Self = Self(1 << 3);
    pub const XFT_SETTINGS: Self = Self(1 << 4);

    /// The set exported after a look-and-feel save.
    pub const ALL: Self = Self(0b1_1111);

    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for ResourceFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// Build the resource text `xrdb -merge` expects for `flags`.
pub fn generate(flags: ResourceFlags, paths: &Paths) -> Result<String, KConfigError> {
    let mut out = String::new();

    if flags.contains(ResourceFlags::COLORS) || flags.contains(ResourceFlags::QT_COLORS) {
        let kdeglobals = ConfigFile::open(&paths.store("kdeglobals"))?;
        if flags.contains(ResourceFlags::COLORS) {
            palette(&mut out, &kdeglobals);
        }
        if flags.contains(ResourceFlags::QT_COLORS) {
            widget_colors(&mut out, &kdeglobals);
        }
    }

    if flags.contains(ResourceFlags::QT_SETTINGS) {
        let kcminputrc = ConfigFile::open(&paths.store("kcminputrc"))?;
        line(&mut out, "Xcursor.theme", kcminputrc.read(&["Mouse"], "cursorTheme"));
        line(&mut out, "Xcursor.size", kcminputrc.read(&["Mouse"], "cursorSize"));
    }

    if flags.contains(ResourceFlags::XFT_SETTINGS) {
        let kcmfonts = ConfigFile::open(&paths.store("kcmfonts"))?;
        xft(&mut out, &kcmfonts);
    }

    Ok(out)
}

fn palette(out: &mut String, kdeglobals: &ConfigFile) {
    let color = |group: &str, key: &str| kdeglobals.read(&[group], key).and_then(|v| hex_color(&v));

    line(out, "*background", color("Colors:Window", "BackgroundNormal"));
    line(out, "*foreground", color("Colors:Window", "ForegroundNormal"));
    line(out, "*selectBackground", color("Colors:Selection", "BackgroundNormal"));
    line(out, "*selectForeground", color("Colors:Selection", "ForegroundNormal"));
}

fn widget_colors(out: &mut String, kdeglobals: &ConfigFile) {
    let color = |group: &str, key: &str| kdeglobals.read(&[group], key).and_then(|v| hex_color(&v));

    line(out, "*Button.background", color("Colors:Button", "BackgroundNormal"));
    line(out, "*Button.foreground", color("Colors:Button", "ForegroundNormal"));
    line(out, "*Text.background", color("Colors:View", "BackgroundNormal"));
    line(out, "*Text.foreground", color("Colors:View", "ForegroundNormal"));
}

fn xft(out: &mut String, kcmfonts: &ConfigFile) {
    let general = ["General"];

    let antialias = kcmfonts
        .read(&general, "XftAntialias")
        .map(|v| if v == "true" { "1" } else { "0" }.to_string());
    line(out, "Xft.antialias", antialias);

    if let Some(style) = kcmfonts.read(&general, "XftHintStyle") {
        let hinting = if style == "hintnone" { "0" } else { "1" };
        line(out, "Xft.hinting", Some(hinting.to_string()));
        line(out, "Xft.hintstyle", Some(style));
    }

    line(out, "Xft.rgba", kcmfonts.read(&general, "XftSubPixel"));
    line(
        out,
        "Xft.dpi",
        kcmfonts
            .read(&general, "forceFontDPI")
            .filter(|dpi| dpi != "0"),
    );
}

fn line(out: &mut String, name: &str, value: Option<String>) {
    if let Some(value) = value {
        let _ = writeln!(out, "{}: {}", name, value);
    }
}

/// `"239,240,241"` to `"#eff0f1"`.
fn hex_color(value: &str) -> Option<String> {
    let parts: Vec<u8> = value
        .split(',')
        .map(|c| c.trim().parse::<u8>())
        .collect::<Result<_, _>>()
        .ok()?;

    match parts.as_slice() {
        [r, g, b] | [r, g, b, _] => Some(format!("#{:02x}{:02x}{:02x}", r, g, b)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_flags() {
        let flags = ResourceFlags::COLORS | ResourceFlags::XFT_SETTINGS;
        assert!(flags.contains(ResourceFlags::COLORS));
        assert!(!flags.contains(ResourceFlags::QT_SETTINGS));
        assert!(ResourceFlags::ALL.contains(flags));
        assert!(ResourceFlags::NONE.is_empty());
    }

    #[test]
    fn test_hex_color() {
        assert_eq!(hex_color("239,240,241").as_deref(), Some("#eff0f1"));
        assert_eq!(hex_color("0, 0, 0, 128").as_deref(), Some("#000000"));
        assert_eq!(hex_color("300,0,0"), None);
        assert_eq!(hex_color("#ffffff"), None);
    }

    #[test]
    fn test_generate() {
        let tmp = TempDir::new().unwrap();
        let paths = Paths::rooted(tmp.path());
        fs::create_dir_all(&paths.config_dir).unwrap();
        fs::write(
            paths.store("kdeglobals"),
            "[Colors:Window]\nBackgroundNormal=239,240,241\nForegroundNormal=35,38,39\n\n\
             [Colors:Selection]\nBackgroundNormal=61,174,233\n",
        )
        .unwrap();
        fs::write(
            paths.store("kcmfonts"),
            "[General]\nXftAntialias=true\nXftHintStyle=hintslight\nXftSubPixel=rgb\nforceFontDPI=0\n",
        )
        .unwrap();

        let text = generate(ResourceFlags::ALL, &paths).unwrap();
        assert!(text.contains("*background: #eff0f1\n"));
        assert!(text.contains("*foreground: #232627\n"));
        assert!(text.contains("*selectBackground: #3daee9\n"));
        assert!(!text.contains("*selectForeground"));
        assert!(text.contains("Xft.antialias: 1\n"));
        assert!(text.contains("Xft.hinting: 1\n"));
        assert!(text.contains("Xft.hintstyle: hintslight\n"));
        assert!(text.contains("Xft.rgba: rgb\n"));
        assert!(!text.contains("Xft.dpi"));
        assert!(!text.contains("Xcursor"));

        assert_eq!(generate(ResourceFlags::NONE, &paths).unwrap(), "");
    }
}
