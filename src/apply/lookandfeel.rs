//! The global theme ("Look and Feel") module.

use super::{
    ApplyContext, ApplyError, ApplyStep, Baseline, GLOBAL_THEME_KEY, LAYOUT_KEY, SELECTION_GROUP,
    SELECTION_STORE, SaveOutcome, SettingsModule, read_store, resolve_plasma_theme, run_steps,
};
use crate::colors;
use crate::config::{Config, EnableFlags};
use crate::defaults;
use crate::enumerate::PackageKind;
use crate::kconfig::ConfigFile;
use crate::model::PackageModel;
use crate::notifications::Notifier;
use crate::package::{Package, PackageLoader, Resource};
use crate::paths::Paths;
use crate::resources::ResourceFlags;
use tracing::{debug, info};

/// Selection and per-component toggles of the module.
#[derive(Debug, Clone, PartialEq)]
pub struct LookAndFeelSettings {
    pub package: String,
    pub flags: EnableFlags,
}

pub struct LookAndFeelModule {
    paths: Paths,
    loader: PackageLoader,
    fallback: String,
    default_layout: String,
    settings: LookAndFeelSettings,
    model: PackageModel,
}

impl LookAndFeelModule {
    pub fn new(paths: Paths, config: &Config) -> Self {
        let loader = PackageLoader::new(&paths, &config.packages.fallback);
        Self {
            paths,
            loader,
            fallback: config.packages.fallback.clone(),
            default_layout: config.packages.default_layout.clone(),
            settings: LookAndFeelSettings {
                package: config.packages.fallback.clone(),
                flags: config.lookandfeel,
            },
            model: PackageModel::new(PackageKind::LookAndFeel),
        }
    }

    pub fn set_flags(&mut self, flags: EnableFlags) {
        self.settings.flags = flags;
    }

    pub fn reload(&mut self) {
        self.model.reload(&self.paths);
    }

    /// Steps a save of `package` runs, in order.
    pub fn plan(&self, package: &Package) -> Result<Vec<ApplyStep>, ApplyError> {
        let plugin_id = package.plugin_id().to_string();
        let mut steps = vec![ApplyStep::Selection {
            key: GLOBAL_THEME_KEY,
            plugin_id: plugin_id.clone(),
        }];

        let defaults = package.defaults()?;
        if let Some(defaults) = &defaults {
            self.plan_components(package, defaults, &mut steps)?;
        }

        // Packages without a defaults file still get their own splash.
        let splash = defaults
            .as_ref()
            .and_then(|d| defaults::SPLASH_THEME.read(d));
        if self.has_splash(package) {
            steps.push(ApplyStep::SplashScreen(splash.unwrap_or_else(|| plugin_id.clone())));
        }

        steps.push(ApplyStep::LockScreen(plugin_id));
        steps.push(ApplyStep::ExportResources(ResourceFlags::ALL));
        Ok(steps)
    }

    fn plan_components(
        &self,
        package: &Package,
        defaults: &ConfigFile,
        steps: &mut Vec<ApplyStep>,
    ) -> Result<(), ApplyError> {
        let flags = self.settings.flags;

        if flags.widget_style {
            let kvantum = defaults::KVANTUM_THEME.read(defaults);
            let style = defaults::WIDGET_STYLE
                .read(defaults)
                .map(|s| widget_style_for(&s, kvantum.is_some()));
            if style.is_some() || kvantum.is_some() {
                steps.push(ApplyStep::WidgetStyle { style, kvantum });
            }
        }

        if flags.colors {
            if let Some(step) = self.colors_step(package, defaults) {
                steps.push(step);
            }
        }

        if flags.icons {
            if let Some(theme) = defaults::ICON_THEME.read(defaults) {
                steps.push(ApplyStep::Icons(theme));
            }
        }

        if flags.plasma_theme {
            if let Some(theme) = defaults::PLASMA_THEME.read(defaults) {
                let layout = read_store(&self.paths, SELECTION_STORE, SELECTION_GROUP, LAYOUT_KEY)?
                    .unwrap_or_default();
                steps.push(ApplyStep::PlasmaTheme(resolve_plasma_theme(
                    &theme,
                    &layout,
                    &self.default_layout,
                )));
            }
        }

        if flags.cursors {
            if let Some(theme) = defaults::CURSOR_THEME.read(defaults) {
                steps.push(ApplyStep::CursorTheme(theme));
            }
        }

        if flags.window_switcher {
            if let Some(layout) = defaults::WINDOW_SWITCHER.read(defaults) {
                steps.push(ApplyStep::WindowSwitcher(layout));
            }
        }

        if flags.desktop_switcher {
            if let Some(layout) = defaults::DESKTOP_SWITCHER.read(defaults) {
                steps.push(ApplyStep::DesktopSwitcher(layout));
            }
        }

        if flags.window_decoration {
            steps.push(ApplyStep::WindowDecoration {
                library: defaults::DECORATION_LIBRARY
                    .read(defaults)
                    .unwrap_or_else(|| defaults::FALLBACK_DECORATION_LIBRARY.to_string()),
                theme: defaults::DECORATION_THEME
                    .read(defaults)
                    .unwrap_or_else(|| defaults::FALLBACK_DECORATION_THEME.to_string()),
            });
        }

        if let Some(scheme) = defaults::DARK_DECORATION_SCHEME.read(defaults) {
            steps.push(ApplyStep::DarkDecoration(scheme));
        }

        if flags.window_switcher || flags.desktop_switcher || flags.window_decoration {
            steps.push(ApplyStep::ReloadKWin);
        }

        let gtk2 = defaults::GTK2_THEME.read(defaults);
        let gtk3 = defaults::GTK3_THEME.read(defaults);
        if gtk2.is_some() || gtk3.is_some() {
            steps.push(ApplyStep::Gtk { gtk2, gtk3 });
        }

        Ok(())
    }

    fn colors_step(&self, package: &Package, defaults: &ConfigFile) -> Option<ApplyStep> {
        let scheme = defaults::COLOR_SCHEME.read(defaults);

        if let Some(file) = package.file_path(Resource::Colors) {
            return Some(ApplyStep::Colors {
                scheme: scheme.unwrap_or_else(|| package.name().to_string()),
                file,
            });
        }

        let normalized = colors::normalize_scheme_name(&scheme?);
        match colors::find_scheme_file(&self.paths, &normalized) {
            Some(file) => Some(ApplyStep::Colors {
                scheme: normalized,
                file,
            }),
            None => {
                debug!("Color scheme {} is not installed", normalized);
                None
            }
        }
    }

    fn has_splash(&self, package: &Package) -> bool {
        self.model
            .row_for(package.plugin_id())
            .map(|row| row.has_splash)
            .unwrap_or_else(|| package.has(Resource::SplashMainScript))
    }

    /// Apply only a widget style, as the style tool does.
    pub fn set_widget_style(
        &self,
        style: &str,
        notifier: &mut dyn Notifier,
    ) -> Result<(), ApplyError> {
        if style.is_empty() {
            return Ok(());
        }
        let mut ctx = ApplyContext::new(&self.paths, notifier);
        ApplyStep::WidgetStyle {
            style: Some(style.to_string()),
            kvantum: None,
        }
        .apply(&mut ctx)
    }
}

/// Some packages name Breeze in lower case, and a Kvantum style without a
/// Kvantum theme is unreadable, so it becomes Breeze.
fn widget_style_for(style: &str, has_kvantum_theme: bool) -> String {
    match style {
        "breeze" => "Breeze".to_string(),
        "kvantum" | "kvantum-dark" if !has_kvantum_theme => "Breeze".to_string(),
        other => other.to_string(),
    }
}

impl SettingsModule for LookAndFeelModule {
    fn load(&mut self) -> Result<Baseline, ApplyError> {
        if let Some(current) =
            read_store(&self.paths, SELECTION_STORE, SELECTION_GROUP, GLOBAL_THEME_KEY)?
        {
            self.settings.package = current;
        } else {
            self.settings.package = self.fallback.clone();
        }
        self.reload();

        let package = self.loader.load(&self.settings.package);
        Baseline::from_package(package.as_ref())
    }

    fn selection(&self) -> &str {
        &self.settings.package
    }

    fn select(&mut self, plugin_id: &str) {
        self.settings.package = plugin_id.to_string();
    }

    fn save(
        &mut self,
        _baseline: &Baseline,
        notifier: &mut dyn Notifier,
    ) -> Result<SaveOutcome, ApplyError> {
        let id = self.settings.package.clone();
        let package = self
            .loader
            .find(&id)
            .ok_or_else(|| ApplyError::PackageNotFound(id.clone()))?;

        let steps = self.plan(&package)?;
        let mut ctx = ApplyContext::new(&self.paths, notifier);
        let (applied, failed) = run_steps(&steps, &mut ctx);
        info!("Applied global theme {}", id);

        Ok(SaveOutcome {
            baseline: Baseline::from_package(Some(&package))?,
            applied,
            failed,
        })
    }

    fn model(&self) -> &PackageModel {
        &self.model
    }
}
