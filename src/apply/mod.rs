//! Applying a package to the user's configuration stores.
//!
//! A save is planned as an ordered list of [`ApplyStep`]s. Each step writes
//! one target store and sends the notifications that make the running
//! session pick the change up. Steps are independent: a failing step is
//! logged and the rest still run, so a partial failure leaves earlier stores
//! in their new state.

pub mod layout;
pub mod lookandfeel;

use crate::autostart;
use crate::colors;
use crate::cursor;
use crate::desktop::{self, DesktopError};
use crate::kconfig::{ConfigFile, KConfigError};
use crate::model::PackageModel;
use crate::notifications::{
    ChangeType, GtkVersion, ICON_GROUPS, Notification, Notifier,
};
use crate::package::PackageError;
use crate::paths::Paths;
use crate::resources::ResourceFlags;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, info, warn};

pub use layout::DesktopLayoutModule;
pub use lookandfeel::LookAndFeelModule;

/// Store and group holding both persisted selections.
pub const SELECTION_STORE: &str = "kdeglobals";
pub const SELECTION_GROUP: &[&str] = &["KDE"];
pub const GLOBAL_THEME_KEY: &str = "GlobalThemePackage";
pub const LAYOUT_KEY: &str = "LookAndFeelPackage";

const LATTE_PROCESS: &str = "latte-dock";
const LATTE_SERVICE: &str = "org.kde.latte-dock";
const LATTE_NO_LAYOUT: &str = "None";
const AURORAE_LIBRARY: &str = "org.kde.kwin.aurorae";

#[derive(Error, Debug)]
pub enum ApplyError {
    #[error("Unable to find the theme named {0}")]
    PackageNotFound(String),
    #[error("Config error: {0}")]
    Config(#[from] KConfigError),
    #[error("Package error: {0}")]
    Package(#[from] PackageError),
    #[error("Desktop entry error: {0}")]
    Desktop(#[from] DesktopError),
}

/// The package a module had applied when it was loaded.
///
/// Passed from `load` to `save`; `save` returns the next one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Baseline {
    pub plugin_id: Option<String>,
    /// Services the package registered for autostart.
    pub autostart: Vec<String>,
}

impl Baseline {
    pub(crate) fn from_package(package: Option<&crate::package::Package>) -> Result<Self, ApplyError> {
        let Some(package) = package else {
            return Ok(Self::default());
        };
        let autostart = package
            .defaults()?
            .map(|d| crate::defaults::autostart_services(&d))
            .unwrap_or_default();
        Ok(Self {
            plugin_id: Some(package.plugin_id().to_string()),
            autostart,
        })
    }
}

/// Result of a save that found its package.
#[derive(Debug, Clone, PartialEq)]
pub struct SaveOutcome {
    /// Baseline for the next save.
    pub baseline: Baseline,
    pub applied: usize,
    pub failed: usize,
}

/// A settings module driven headlessly by the command line tools.
pub trait SettingsModule {
    /// Read the persisted selection and snapshot the applied package.
    fn load(&mut self) -> Result<Baseline, ApplyError>;

    /// Currently selected plugin id.
    fn selection(&self) -> &str;

    fn select(&mut self, plugin_id: &str);

    /// Apply the selected package. Fails with
    /// [`ApplyError::PackageNotFound`] before touching any store when the
    /// selection is not an installed package.
    fn save(
        &mut self,
        baseline: &Baseline,
        notifier: &mut dyn Notifier,
    ) -> Result<SaveOutcome, ApplyError>;

    fn model(&self) -> &PackageModel;
}

/// Stores and notification channel the steps work against.
pub struct ApplyContext<'a> {
    pub paths: &'a Paths,
    pub notifier: &'a mut dyn Notifier,
}

impl<'a> ApplyContext<'a> {
    pub fn new(paths: &'a Paths, notifier: &'a mut dyn Notifier) -> Self {
        Self { paths, notifier }
    }

    /// Open `store`, let `f` mutate it, write it back.
    fn edit(&self, store: &str, f: impl FnOnce(&mut ConfigFile)) -> Result<(), ApplyError> {
        let mut config = ConfigFile::open(&self.paths.store(store))?;
        f(&mut config);
        config.sync()?;
        Ok(())
    }

    fn notify(&mut self, notification: Notification) {
        self.notifier.send(notification);
    }

    fn theme_tool(&mut self, args: &[&str]) {
        self.notify(Notification::ThemeTool(
            args.iter().map(|a| a.to_string()).collect(),
        ));
    }
}

/// Read a value from a target store.
pub fn read_store(
    paths: &Paths,
    store: &str,
    group: &[&str],
    key: &str,
) -> Result<Option<String>, ApplyError> {
    Ok(ConfigFile::open(&paths.store(store))?.read(group, key))
}

/// One read-write-notify unit of a save.
#[derive(Debug, Clone, PartialEq)]
pub enum ApplyStep {
    /// Persist the module's selection in `kdeglobals [KDE]`.
    Selection { key: &'static str, plugin_id: String },
    WidgetStyle {
        style: Option<String>,
        kvantum: Option<String>,
    },
    Colors { scheme: String, file: PathBuf },
    Icons(String),
    PlasmaTheme(String),
    CursorTheme(String),
    WindowSwitcher(String),
    DesktopSwitcher(String),
    WindowDecoration { library: String, theme: String },
    DarkDecoration(String),
    ReloadKWin,
    /// GTK3 goes first; GTK2 is only sent along with a GTK3 theme.
    Gtk {
        gtk2: Option<String>,
        gtk3: Option<String>,
    },
    SplashScreen(String),
    LockScreen(String),
    WindowButtons {
        left: Option<String>,
        right: Option<String>,
    },
    BorderlessMaximized(String),
    LatteLayout(String),
    FilesLayout(String),
    DefaultPanelLayout(String),
    Autostart {
        disable: Vec<String>,
        enable: Vec<String>,
    },
    ExportResources(ResourceFlags),
}

impl ApplyStep {
    pub fn apply(&self, ctx: &mut ApplyContext<'_>) -> Result<(), ApplyError> {
        match self {
            ApplyStep::Selection { key, plugin_id } => {
                ctx.edit(SELECTION_STORE, |c| c.write(SELECTION_GROUP, key, plugin_id))?;
            }

            ApplyStep::WidgetStyle { style, kvantum } => {
                if let Some(kvantum) = kvantum {
                    ctx.edit("Kvantum/kvantum.kvconfig", |c| {
                        c.write(&["General"], "theme", kvantum)
                    })?;
                }
                if let Some(style) = style {
                    ctx.edit("kdeglobals", |c| c.write(&["KDE"], "widgetStyle", style))?;
                    ctx.notify(Notification::GlobalSettingsChanged(ChangeType::Style));
                }
            }

            ApplyStep::Colors { scheme, file } => {
                let mut kdeglobals = ConfigFile::open(&ctx.paths.store("kdeglobals"))?;
                colors::merge_scheme(&mut kdeglobals, scheme, file)?;
                kdeglobals.sync()?;
                ctx.notify(Notification::GlobalSettingsChanged(ChangeType::Palette));
            }

            ApplyStep::Icons(theme) => {
                ctx.edit("kdeglobals", |c| c.write(&["Icons"], "Theme", theme))?;
                for group in 0..ICON_GROUPS {
                    ctx.notify(Notification::IconGroupChanged(group));
                }
            }

            ApplyStep::PlasmaTheme(theme) => {
                ctx.edit("plasmarc", |c| c.write(&["Theme"], "name", theme))?;
            }

            ApplyStep::CursorTheme(theme) => {
                ctx.edit("kcminputrc", |c| c.write(&["Mouse"], "cursorTheme", theme))?;

                if !ctx.paths.session.x11 {
                    debug!("No X11 display, cursor takes effect on next login");
                    return Ok(());
                }
                if cursor::cursor_theme_dir(&ctx.paths.cursor_dirs, theme).is_none() {
                    debug!("Cursor theme {} not installed, live reload skipped", theme);
                    return Ok(());
                }
                ctx.notify(Notification::LaunchEnv {
                    name: "XCURSOR_THEME".to_string(),
                    value: theme.clone(),
                });
                ctx.notify(Notification::ExportResources(ResourceFlags::QT_SETTINGS));
                ctx.notify(Notification::GlobalSettingsChanged(ChangeType::Cursor));
            }

            ApplyStep::WindowSwitcher(layout) => {
                ctx.edit("kwinrc", |c| c.write(&["TabBox"], "LayoutName", layout))?;
            }

            ApplyStep::DesktopSwitcher(layout) => {
                ctx.edit("kwinrc", |c| {
                    c.write(&["TabBox"], "DesktopLayout", layout);
                    c.write(&["TabBox"], "DesktopListLayout", layout);
                })?;
            }

            ApplyStep::WindowDecoration { library, theme } => {
                ctx.edit("kwinrc", |c| {
                    c.write(&["org.kde.kdecoration2"], "library", library);
                    c.write(&["org.kde.kdecoration2"], "theme", theme);
                })?;
                if library == AURORAE_LIBRARY {
                    ctx.theme_tool(&["disableshadowfix"]);
                } else {
                    ctx.theme_tool(&["shadowfix"]);
                }
                ctx.notify(Notification::ReloadKWin);
            }

            ApplyStep::DarkDecoration(scheme) => {
                ctx.theme_tool(&["setdarktheme", scheme]);
            }

            ApplyStep::ReloadKWin => ctx.notify(Notification::ReloadKWin),

            ApplyStep::Gtk { gtk2, gtk3 } => {
                let Some(gtk3) = gtk3 else {
                    debug!("No GTK3 theme, GTK themes left alone");
                    return Ok(());
                };
                ctx.notify(Notification::GtkTheme {
                    version: GtkVersion::Gtk3,
                    name: gtk3.clone(),
                });
                if let Some(gtk2) = gtk2 {
                    ctx.notify(Notification::GtkTheme {
                        version: GtkVersion::Gtk2,
                        name: gtk2.clone(),
                    });
                }
            }

            ApplyStep::SplashScreen(theme) => {
                ctx.edit("ksplashrc", |c| {
                    c.write(&["KSplash"], "Theme", theme);
                    c.write(&["KSplash"], "Engine", "KSplashQML");
                })?;
            }

            ApplyStep::LockScreen(theme) => {
                ctx.edit("kscreenlockerrc", |c| c.write(&["Greeter"], "Theme", theme))?;
            }

            ApplyStep::WindowButtons { left, right } => {
                ctx.edit("kwinrc", |c| {
                    if let Some(left) = left {
                        c.write(&["org.kde.kdecoration2"], "ButtonsOnLeft", left);
                    }
                    if let Some(right) = right {
                        c.write(&["org.kde.kdecoration2"], "ButtonsOnRight", right);
                    }
                })?;
            }

            ApplyStep::BorderlessMaximized(value) => {
                ctx.edit("kwinrc", |c| {
                    c.write(&["Windows"], "BorderlessMaximizedWindows", value)
                })?;
            }

            ApplyStep::LatteLayout(layout) => {
                ctx.notify(Notification::KillProcess(LATTE_PROCESS.to_string()));

                if layout == LATTE_NO_LAYOUT {
                    autostart::set_autostart(ctx.paths, LATTE_SERVICE, false, None)?;
                    ctx.notify(Notification::LatteQuit);
                    return Ok(());
                }

                ctx.edit("lattedockrc", |c| {
                    c.write(&["UniversalSettings"], "currentLayout", layout);
                    c.write(&["UniversalSettings"], "lastNonAssignedLayout", layout);
                })?;
                autostart::set_autostart(ctx.paths, LATTE_SERVICE, true, Some(LATTE_PROCESS))?;
                if ctx.paths.session.full_session {
                    ctx.notify(Notification::Launch(vec![LATTE_PROCESS.to_string()]));
                }
            }

            ApplyStep::FilesLayout(layout) => {
                ctx.theme_tool(&["setfileslayout", layout]);
            }

            ApplyStep::DefaultPanelLayout(plugin_id) => {
                ctx.notify(Notification::PlasmaShellLayout(plugin_id.clone()));
            }

            ApplyStep::Autostart { disable, enable } => {
                apply_autostart(ctx, disable, enable)?;
            }

            ApplyStep::ExportResources(flags) => {
                ctx.notify(Notification::ExportResources(*flags));
            }
        }

        Ok(())
    }
}

fn apply_autostart(
    ctx: &mut ApplyContext<'_>,
    disable: &[String],
    enable: &[String],
) -> Result<(), ApplyError> {
    let full_session = ctx.paths.session.full_session;

    // Services of the previous package are only stopped inside a running session.
    for service in disable.iter().filter(|_| full_session) {
        autostart::set_autostart(ctx.paths, service, false, None)?;
        match desktop::find_service(ctx.paths, service).and_then(|e| e.dbus_service_name()) {
            Some(bus_name) => ctx.notify(Notification::QuitService(bus_name)),
            None => debug!("{} has no D-Bus service name, left running", service),
        }
    }

    for service in enable {
        let exec = desktop::find_service(ctx.paths, service).and_then(|e| e.exec());
        autostart::set_autostart(ctx.paths, service, true, exec.as_deref())?;

        if let (true, Some(exec)) = (full_session, exec) {
            let argv = desktop::exec_argv(&exec);
            if !argv.is_empty() {
                ctx.notify(Notification::Launch(argv));
            }
        }
    }

    Ok(())
}

/// Run `steps` in order. Failures are logged and do not stop later steps.
/// Returns `(applied, failed)`.
pub fn run_steps(steps: &[ApplyStep], ctx: &mut ApplyContext<'_>) -> (usize, usize) {
    let mut applied = 0;
    let mut failed = 0;

    for step in steps {
        match step.apply(ctx) {
            Ok(()) => {
                debug!("Applied {:?}", step);
                applied += 1;
            }
            Err(e) => {
                warn!("Failed to apply {:?}: {}", step, e);
                failed += 1;
            }
        }
    }

    info!("Applied {} settings ({} failed)", applied, failed);
    (applied, failed)
}

/// Plasma theme to store for `theme` while `layout_id` is the active desktop
/// layout. The vendor themes use an `-alt` variant on every layout except
/// the default one.
pub fn resolve_plasma_theme(theme: &str, layout_id: &str, default_layout: &str) -> String {
    const ALT_THEMES: [&str; 2] = ["feren", "feren-light"];

    if layout_id == default_layout {
        if let Some(base) = theme.strip_suffix("-alt") {
            if ALT_THEMES.contains(&base) {
                return base.to_string();
            }
        }
    } else if ALT_THEMES.contains(&theme) {
        return format!("{}-alt", theme);
    }

    theme.to_string()
}
