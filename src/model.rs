//! Role-based package list backing the settings view.
//!
//! The model is rebuilt wholesale on every reload. Because the view binds the
//! active selection by row, every rebuild is followed by a
//! [`ModelEvent::SelectionChanged`] so listeners re-resolve the selected row.

use crate::defaults;
use crate::enumerate::{self, PackageKind};
use crate::kconfig::ConfigFile;
use crate::package::{Package, Resource};
use crate::paths::Paths;
use std::path::PathBuf;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Display,
    PluginName,
    Description,
    Screenshot,
    FullScreenPreview,
    HasSplash,
    HasLockScreen,
    HasRunCommand,
    HasLogout,
    HasColors,
    HasWidgetStyle,
    HasIcons,
    HasPlasmaTheme,
    HasCursors,
    HasWindowSwitcher,
    HasDesktopSwitcher,
    HasWindowDecoration,
}

const COMMON_ROLES: &[Role] = &[
    Role::Display,
    Role::PluginName,
    Role::Description,
    Role::Screenshot,
    Role::FullScreenPreview,
];

const LOOK_AND_FEEL_ROLES: &[Role] = &[
    Role::HasSplash,
    Role::HasLockScreen,
    Role::HasRunCommand,
    Role::HasLogout,
    Role::HasColors,
    Role::HasWidgetStyle,
    Role::HasIcons,
    Role::HasPlasmaTheme,
    Role::HasCursors,
    Role::HasWindowSwitcher,
    Role::HasDesktopSwitcher,
    Role::HasWindowDecoration,
];

impl Role {
    /// Name the view binds to.
    pub fn name(self) -> &'static str {
        match self {
            Role::Display => "display",
            Role::PluginName => "pluginName",
            Role::Description => "description",
            Role::Screenshot => "screenshot",
            Role::FullScreenPreview => "fullScreenPreview",
            Role::HasSplash => "hasSplash",
            Role::HasLockScreen => "hasLockScreen",
            Role::HasRunCommand => "hasRunCommand",
            Role::HasLogout => "hasLogout",
            Role::HasColors => "hasColors",
            Role::HasWidgetStyle => "hasWidgetStyle",
            Role::HasIcons => "hasIcons",
            Role::HasPlasmaTheme => "hasPlasmaTheme",
            Role::HasCursors => "hasCursors",
            Role::HasWindowSwitcher => "hasWindowSwitcher",
            Role::HasDesktopSwitcher => "hasDesktopSwitcher",
            Role::HasWindowDecoration => "hasWindowDecoration",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RoleValue {
    Text(String),
    Path(Option<PathBuf>),
    Flag(bool),
}

/// Components a package's defaults file configures.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Components {
    pub colors: bool,
    pub widget_style: bool,
    pub icons: bool,
    pub plasma_theme: bool,
    pub cursors: bool,
    pub window_switcher: bool,
    pub desktop_switcher: bool,
    pub window_decoration: bool,
}

impl Components {
    pub fn detect(package: &Package, defaults: &ConfigFile) -> Self {
        Self {
            colors: defaults::COLOR_SCHEME.is_set(defaults) || package.has(Resource::Colors),
            widget_style: defaults::WIDGET_STYLE.is_set(defaults),
            icons: defaults::ICON_THEME.is_set(defaults),
            plasma_theme: defaults::PLASMA_THEME.is_set(defaults),
            cursors: defaults::CURSOR_THEME.is_set(defaults),
            window_switcher: defaults::WINDOW_SWITCHER.is_set(defaults),
            desktop_switcher: defaults::DESKTOP_SWITCHER.is_set(defaults),
            window_decoration: defaults::DECORATION_LIBRARY.is_set(defaults),
        }
    }
}

/// One entry of the list.
#[derive(Debug, Clone, PartialEq)]
pub struct PackageRow {
    pub name: String,
    pub plugin_id: String,
    pub description: String,
    pub screenshot: Option<PathBuf>,
    pub full_screen_preview: Option<PathBuf>,
    pub has_splash: bool,
    pub has_lock_screen: bool,
    pub has_run_command: bool,
    pub has_logout: bool,
    pub components: Components,
}

impl PackageRow {
    fn from_package(package: &Package, kind: PackageKind) -> Self {
        let components = match kind {
            PackageKind::LookAndFeel => match package.defaults() {
                Ok(Some(defaults)) => Components::detect(package, &defaults),
                Ok(None) => Components::default(),
                Err(e) => {
                    warn!("Unreadable defaults in {}: {}", package.plugin_id(), e);
                    Components::default()
                }
            },
            PackageKind::DesktopLayout => Components::default(),
        };

        Self {
            name: package.name().to_string(),
            plugin_id: package.plugin_id().to_string(),
            description: package.description().to_string(),
            screenshot: package.file_path(Resource::Preview),
            full_screen_preview: package.file_path(Resource::FullScreenPreview),
            has_splash: package.has(Resource::SplashMainScript),
            has_lock_screen: package.has(Resource::LockScreenMainScript),
            has_run_command: package.has(Resource::RunCommandMainScript),
            has_logout: package.has(Resource::LogoutMainScript),
            components,
        }
    }

    fn value(&self, role: Role) -> RoleValue {
        let c = &self.components;
        match role {
            Role::Display => RoleValue::Text(self.name.clone()),
            Role::PluginName => RoleValue::Text(self.plugin_id.clone()),
            Role::Description => RoleValue::Text(self.description.clone()),
            Role::Screenshot => RoleValue::Path(self.screenshot.clone()),
            Role::FullScreenPreview => RoleValue::Path(self.full_screen_preview.clone()),
            Role::HasSplash => RoleValue::Flag(self.has_splash),
            Role::HasLockScreen => RoleValue::Flag(self.has_lock_screen),
            Role::HasRunCommand => RoleValue::Flag(self.has_run_command),
            Role::HasLogout => RoleValue::Flag(self.has_logout),
            Role::HasColors => RoleValue::Flag(c.colors),
            Role::HasWidgetStyle => RoleValue::Flag(c.widget_style),
            Role::HasIcons => RoleValue::Flag(c.icons),
            Role::HasPlasmaTheme => RoleValue::Flag(c.plasma_theme),
            Role::HasCursors => RoleValue::Flag(c.cursors),
            Role::HasWindowSwitcher => RoleValue::Flag(c.window_switcher),
            Role::HasDesktopSwitcher => RoleValue::Flag(c.desktop_switcher),
            Role::HasWindowDecoration => RoleValue::Flag(c.window_decoration),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelEvent {
    /// Rows were rebuilt from scratch.
    Reset,
    /// The active selection must be re-resolved against the new rows.
    SelectionChanged,
}

type Listener = Box<dyn FnMut(ModelEvent)>;

pub struct PackageModel {
    kind: PackageKind,
    rows: Vec<PackageRow>,
    listeners: Vec<Listener>,
}

impl PackageModel {
    pub fn new(kind: PackageKind) -> Self {
        Self {
            kind,
            rows: Vec::new(),
            listeners: Vec::new(),
        }
    }

    pub fn subscribe(&mut self, listener: impl FnMut(ModelEvent) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    /// Rebuild every row from the installed packages.
    pub fn reload(&mut self, paths: &Paths) {
        let packages = enumerate::packages_for(paths, self.kind);
        self.rows = packages
            .iter()
            .map(|p| PackageRow::from_package(p, self.kind))
            .collect();
        debug!("Model reloaded with {} packages", self.rows.len());

        self.emit(ModelEvent::Reset);
        self.emit(ModelEvent::SelectionChanged);
    }

    pub fn rows(&self) -> &[PackageRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Roles this model exposes, with the names the view binds to.
    pub fn role_names(&self) -> Vec<(Role, &'static str)> {
        self.roles().iter().map(|r| (*r, r.name())).collect()
    }

    pub fn data(&self, row: usize, role: Role) -> Option<RoleValue> {
        if !self.roles().contains(&role) {
            return None;
        }
        self.rows.get(row).map(|r| r.value(role))
    }

    /// Row holding `plugin_id`. Anything but exactly one match is "not found".
    pub fn plugin_index(&self, plugin_id: &str) -> Option<usize> {
        let mut matches = self
            .rows
            .iter()
            .enumerate()
            .filter(|(_, r)| r.plugin_id == plugin_id)
            .map(|(i, _)| i);

        match (matches.next(), matches.next()) {
            (Some(index), None) => Some(index),
            _ => None,
        }
    }

    pub fn row_for(&self, plugin_id: &str) -> Option<&PackageRow> {
        self.plugin_index(plugin_id).map(|i| &self.rows[i])
    }

    fn roles(&self) -> Vec<Role> {
        match self.kind {
            PackageKind::LookAndFeel => COMMON_ROLES
                .iter()
                .chain(LOOK_AND_FEEL_ROLES)
                .copied()
                .collect(),
            PackageKind::DesktopLayout => COMMON_ROLES.to_vec(),
        }
    }

    fn emit(&mut self, event: ModelEvent) {
        for listener in &mut self.listeners {
            listener(event);
        }
    }

    #[cfg(test)]
    fn push_row(&mut self, row: PackageRow) {
        self.rows.push(row);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::package::fixtures::{touch, write_package};
    use std::cell::RefCell;
    use std::rc::Rc;
    use tempfile::TempDir;

    const FULL_DEFAULTS: &str = "\
[kdeglobals][KDE]
widgetStyle=Breeze

[kdeglobals][Icons]
Theme=breeze-dark

[plasmarc][Theme]
name=feren

[kcminputrc][Mouse]
cursorTheme=breeze_cursors

[kwinrc][WindowSwitcher]
LayoutName=thumbnail_grid
";

    fn fixture() -> (TempDir, Paths) {
        let tmp = TempDir::new().unwrap();
        let share = tmp.path().join("share");
        let full = write_package(&share, "org.example.full", "Full", Some(FULL_DEFAULTS));
        touch(&full, "contents/splash/Splash.qml");
        touch(&full, "contents/colors");
        touch(&full, "contents/previews/preview.png");
        write_package(&share, "org.example.bare", "Bare", Some(""));
        let paths = Paths::rooted(tmp.path());
        (tmp, paths)
    }

    #[test]
    fn test_reload_builds_rows_and_flags() {
        let (_tmp, paths) = fixture();
        let mut model = PackageModel::new(PackageKind::LookAndFeel);
        model.reload(&paths);

        assert_eq!(model.len(), 2);
        let full = model.row_for("org.example.full").unwrap();
        assert!(full.has_splash);
        assert!(!full.has_logout);
        assert!(full.screenshot.is_some());
        assert_eq!(
            full.components,
            Components {
                colors: true,
                widget_style: true,
                icons: true,
                plasma_theme: true,
                cursors: true,
                window_switcher: true,
                desktop_switcher: false,
                window_decoration: false,
            }
        );

        let bare = model.row_for("org.example.bare").unwrap();
        assert_eq!(bare.components, Components::default());
    }

    #[test]
    fn test_reload_emits_selection_change_after_reset() {
        let (_tmp, paths) = fixture();
        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&events);

        let mut model = PackageModel::new(PackageKind::LookAndFeel);
        model.subscribe(move |e| sink.borrow_mut().push(e));
        model.reload(&paths);
        model.reload(&paths);

        assert_eq!(
            *events.borrow(),
            vec![
                ModelEvent::Reset,
                ModelEvent::SelectionChanged,
                ModelEvent::Reset,
                ModelEvent::SelectionChanged
            ]
        );
    }

    #[test]
    fn test_data_by_role() {
        let (_tmp, paths) = fixture();
        let mut model = PackageModel::new(PackageKind::LookAndFeel);
        model.reload(&paths);

        // Sorted by display name: Bare, Full.
        assert_eq!(
            model.data(0, Role::PluginName),
            Some(RoleValue::Text("org.example.bare".to_string()))
        );
        assert_eq!(model.data(1, Role::HasIcons), Some(RoleValue::Flag(true)));
        assert_eq!(model.data(1, Role::FullScreenPreview), Some(RoleValue::Path(None)));
        assert_eq!(model.data(5, Role::PluginName), None);
    }

    #[test]
    fn test_layout_model_has_fewer_roles() {
        let model = PackageModel::new(PackageKind::DesktopLayout);
        let names: Vec<&str> = model.role_names().into_iter().map(|(_, n)| n).collect();
        assert_eq!(
            names,
            vec!["display", "pluginName", "description", "screenshot", "fullScreenPreview"]
        );
    }

    #[test]
    fn test_plugin_index_requires_unique_match() {
        let (_tmp, paths) = fixture();
        let mut model = PackageModel::new(PackageKind::LookAndFeel);
        model.reload(&paths);

        assert_eq!(model.plugin_index("org.example.full"), Some(1));
        assert_eq!(model.plugin_index("org.example.missing"), None);

        let duplicate = model.rows()[1].clone();
        model.push_row(duplicate);
        assert_eq!(model.plugin_index("org.example.full"), None);
    }
}
