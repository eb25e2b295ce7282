//! Group/key names read out of a package's bundled `defaults` file.

use crate::kconfig::ConfigFile;

/// One entry of the defaults file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Key {
    pub group: &'static [&'static str],
    pub key: &'static str,
}

impl Key {
    const fn new(group: &'static [&'static str], key: &'static str) -> Self {
        Self { group, key }
    }

    /// Non-empty value of this key, if set.
    pub fn read(&self, defaults: &ConfigFile) -> Option<String> {
        defaults.read(self.group, self.key)
    }

    pub fn is_set(&self, defaults: &ConfigFile) -> bool {
        self.read(defaults).is_some()
    }
}

pub const WIDGET_STYLE: Key = Key::new(&["kdeglobals", "KDE"], "widgetStyle");
pub const KVANTUM_THEME: Key = Key::new(&["kvantum.kvconfig", "General"], "theme");
pub const COLOR_SCHEME: Key = Key::new(&["kdeglobals", "General"], "ColorScheme");
pub const ICON_THEME: Key = Key::new(&["kdeglobals", "Icons"], "Theme");
pub const PLASMA_THEME: Key = Key::new(&["plasmarc", "Theme"], "name");
pub const CURSOR_THEME: Key = Key::new(&["kcminputrc", "Mouse"], "cursorTheme");
pub const WINDOW_SWITCHER: Key = Key::new(&["kwinrc", "WindowSwitcher"], "LayoutName");
pub const DESKTOP_SWITCHER: Key = Key::new(&["kwinrc", "DesktopSwitcher"], "LayoutName");
pub const DECORATION_LIBRARY: Key = Key::new(&["kwinrc", "org.kde.kdecoration2"], "library");
pub const DECORATION_THEME: Key = Key::new(&["kwinrc", "org.kde.kdecoration2"], "theme");
pub const BUTTONS_ON_LEFT: Key = Key::new(&["kwinrc", "org.kde.kdecoration2"], "ButtonsOnLeft");
pub const BUTTONS_ON_RIGHT: Key = Key::new(&["kwinrc", "org.kde.kdecoration2"], "ButtonsOnRight");
pub const BORDERLESS_MAXIMIZED: Key =
    Key::new(&["kwinrc", "Windows"], "BorderlessMaximizedWindows");
pub const DARK_DECORATION_SCHEME: Key =
    Key::new(&["FerenThemer", "Options"], "DarkAppsDecoColourScheme");
pub const FILES_LAYOUT: Key = Key::new(&["FerenThemer", "Options"], "FilesLayout");
pub const GTK2_THEME: Key = Key::new(&[".gtkrc-2.0"], "gtk-theme-name");
pub const GTK3_THEME: Key = Key::new(&["gtk-3.0/settings.ini", "Settings"], "gtk-theme-name");
pub const SPLASH_THEME: Key = Key::new(&["ksplashrc", "KSplash"], "Theme");
pub const LATTE_LAYOUT: Key = Key::new(&["lattedockrc", "UniversalSettings"], "currentLayout");
pub const AUTOSTART_SERVICES: Key = Key::new(&["Autostart"], "Services");

/// Decoration used when the defaults file names none.
pub const FALLBACK_DECORATION_LIBRARY: &str = "org.kde.breeze";
pub const FALLBACK_DECORATION_THEME: &str = "Breeze";

/// Services a package registers for autostart.
pub fn autostart_services(defaults: &ConfigFile) -> Vec<String> {
    defaults.read_list(AUTOSTART_SERVICES.group, AUTOSTART_SERVICES.key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_read_nested_groups() {
        let defaults = ConfigFile::parse(
            "[kwinrc][org.kde.kdecoration2]\nlibrary=org.kde.kwin.aurorae\nButtonsOnLeft=XIA\n\n\
             [.gtkrc-2.0]\ngtk-theme-name=Breeze\n\n\
             [gtk-3.0/settings.ini][Settings]\ngtk-theme-name=Breeze-dark\n\n\
             [Autostart]\nServices=org.kde.latte-dock\n",
        );

        assert_eq!(DECORATION_LIBRARY.read(&defaults).as_deref(), Some("org.kde.kwin.aurorae"));
        assert_eq!(BUTTONS_ON_LEFT.read(&defaults).as_deref(), Some("XIA"));
        assert!(!BUTTONS_ON_RIGHT.is_set(&defaults));
        assert_eq!(GTK2_THEME.read(&defaults).as_deref(), Some("Breeze"));
        assert_eq!(GTK3_THEME.read(&defaults).as_deref(), Some("Breeze-dark"));
        assert_eq!(autostart_services(&defaults), vec!["org.kde.latte-dock"]);
    }
}
