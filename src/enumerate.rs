//! Discovery of installed look-and-feel packages.

use crate::package::{
    LAYOUT_ONLY_SENTINEL, LAYOUT_SCRIPT, PACKAGE_ROOT, Package, Resource,
};
use crate::paths::Paths;
use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;
use tracing::debug;

/// Which settings module a package list is built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageKind {
    /// Global themes; layout-only packages are hidden.
    LookAndFeel,
    /// Desktop layouts; the package must ship the layout script.
    DesktopLayout,
}

impl PackageKind {
    pub fn accepts(self, package: &Package) -> bool {
        match self {
            PackageKind::LookAndFeel => package.layout_file(LAYOUT_ONLY_SENTINEL).is_none(),
            PackageKind::DesktopLayout => package.layout_file(LAYOUT_SCRIPT).is_some(),
        }
    }
}

/// Every valid installed package exposing at least one of `components`
/// (or every package when `components` is empty), sorted by display name.
///
/// A plugin id installed in several data dirs is reported once, from the
/// highest priority dir, matching what the loader resolves.
pub fn available_packages(paths: &Paths, components: &[Resource]) -> Vec<Package> {
    let mut seen = HashSet::new();
    let mut packages = Vec::new();

    for root in paths.locate_all(PACKAGE_ROOT) {
        for candidate in subdirectories(&root) {
            let package = match Package::load(&candidate) {
                Ok(p) => p,
                Err(e) => {
                    debug!("Skipping {:?}: {}", candidate, e);
                    continue;
                }
            };

            if !components.is_empty() && !components.iter().any(|c| package.has(*c)) {
                continue;
            }

            if seen.insert(package.plugin_id().to_string()) {
                packages.push(package);
            }
        }
    }

    sort_by_name(&mut packages);
    packages
}

/// Packages listed by the given settings module.
pub fn packages_for(paths: &Paths, kind: PackageKind) -> Vec<Package> {
    available_packages(paths, &[Resource::Defaults, Resource::Layouts])
        .into_iter()
        .filter(|p| kind.accepts(p))
        .collect()
}

fn sort_by_name(packages: &mut [Package]) {
    packages.sort_by(|a, b| {
        a.name()
            .cmp(b.name())
            .then_with(|| a.plugin_id().cmp(b.plugin_id()))
    });
}

fn subdirectories(dir: &std::path::Path) -> Vec<PathBuf> {
    let mut dirs: Vec<PathBuf> = fs::read_dir(dir)
        .map(|rd| {
            rd.flatten()
                .map(|e| e.path())
                .filter(|p| p.is_dir())
                .collect()
        })
        .unwrap_or_default();
    dirs.sort();
    dirs
}
