//! The desktop layout module: panel layout, window buttons, dock and
//! autostart services of a layout package.

use super::{
    ApplyContext, ApplyError, ApplyStep, Baseline, LAYOUT_KEY, SELECTION_GROUP, SELECTION_STORE,
    SaveOutcome, SettingsModule, read_store, resolve_plasma_theme, run_steps,
};
use crate::config::Config;
use crate::defaults;
use crate::enumerate::PackageKind;
use crate::model::PackageModel;
use crate::notifications::Notifier;
use crate::package::{Package, PackageLoader};
use crate::paths::Paths;
use tracing::info;

pub struct DesktopLayoutModule {
    paths: Paths,
    loader: PackageLoader,
    default_layout: String,
    package: String,
    model: PackageModel,
}

impl DesktopLayoutModule {
    pub fn new(paths: Paths, config: &Config) -> Self {
        let loader = PackageLoader::new(&paths, &config.packages.fallback);
        Self {
            paths,
            loader,
            default_layout: config.packages.default_layout.clone(),
            package: config.packages.default_layout.clone(),
            model: PackageModel::new(PackageKind::DesktopLayout),
        }
    }

    pub fn reload(&mut self) {
        self.model.reload(&self.paths);
    }

    /// Steps a save of `package` runs, given what was applied before.
    pub fn plan(&self, package: &Package, baseline: &Baseline) -> Result<Vec<ApplyStep>, ApplyError> {
        let plugin_id = package.plugin_id().to_string();
        let mut steps = vec![
            ApplyStep::Selection {
                key: LAYOUT_KEY,
                plugin_id: plugin_id.clone(),
            },
            ApplyStep::DefaultPanelLayout(plugin_id.clone()),
        ];

        if let Some(defaults) = package.defaults()? {
            let left = defaults::BUTTONS_ON_LEFT.read(&defaults);
            let right = defaults::BUTTONS_ON_RIGHT.read(&defaults);
            let borderless = defaults::BORDERLESS_MAXIMIZED.read(&defaults);
            let reload_kwin = left.is_some() || right.is_some() || borderless.is_some();

            if left.is_some() || right.is_some() {
                steps.push(ApplyStep::WindowButtons { left, right });
            }
            if let Some(value) = borderless {
                steps.push(ApplyStep::BorderlessMaximized(value));
            }
            if reload_kwin {
                steps.push(ApplyStep::ReloadKWin);
            }
            if let Some(layout) = defaults::LATTE_LAYOUT.read(&defaults) {
                steps.push(ApplyStep::LatteLayout(layout));
            }
            if let Some(layout) = defaults::FILES_LAYOUT.read(&defaults) {
                steps.push(ApplyStep::FilesLayout(layout));
            }

            steps.push(ApplyStep::Autostart {
                disable: baseline.autostart.clone(),
                enable: defaults::autostart_services(&defaults),
            });
        }

        // Swap the vendor plasma theme between its normal and alt variants.
        if let Some(current) = read_store(&self.paths, "plasmarc", &["Theme"], "name")? {
            let resolved = resolve_plasma_theme(&current, &plugin_id, &self.default_layout);
            if resolved != current {
                steps.push(ApplyStep::PlasmaTheme(resolved));
            }
        }

        Ok(steps)
    }
}

impl SettingsModule for DesktopLayoutModule {
    fn load(&mut self) -> Result<Baseline, ApplyError> {
        self.package = read_store(&self.paths, SELECTION_STORE, SELECTION_GROUP, LAYOUT_KEY)?
            .unwrap_or_else(|| self.default_layout.clone());
        self.reload();

        let package = self.loader.load(&self.package);
        Baseline::from_package(package.as_ref())
    }

    fn selection(&self) -> &str {
        &self.package
    }

    fn select(&mut self, plugin_id: &str) {
        self.package = plugin_id.to_string();
    }

    fn save(
        &mut self,
        baseline: &Baseline,
        notifier: &mut dyn Notifier,
    ) -> Result<SaveOutcome, ApplyError> {
        let id = self.package.clone();
        let package = self
            .loader
            .find(&id)
            .ok_or_else(|| ApplyError::PackageNotFound(id.clone()))?;

        let steps = self.plan(&package, baseline)?;
        let mut ctx = ApplyContext::new(&self.paths, notifier);
        let (applied, failed) = run_steps(&steps, &mut ctx);
        info!("Applied desktop layout {}", id);

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
