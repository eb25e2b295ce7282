//! Shared plumbing for the command line tools.

use crate::apply::{ApplyError, SettingsModule};
use crate::config::{Config, ConfigError};
use crate::enumerate::{self, PackageKind};
use crate::notifications::Notifier;
use crate::paths::Paths;
use std::io::{self, Write};
use std::path::Path;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Log to stderr. `RUST_LOG` wins over `-v`, which wins over the config.
pub fn init_logging(verbose: u8, configured_level: &str) {
    let level = match verbose {
        0 => configured_level,
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("warn,plasma_lnf={}", level)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

/// Load the config from `path`, or from the default location.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    match path {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
}

/// Print the plugin id of every package of `kind`, one per line.
pub fn list_packages(paths: &Paths, kind: PackageKind, out: &mut dyn Write) -> io::Result<()> {
    for package in enumerate::packages_for(paths, kind) {
        writeln!(out, "{}", package.plugin_id())?;
    }
    Ok(())
}

/// Load `module`, select `name` and save it.
///
/// Returns `Ok(false)` after printing a message when `name` is not an
/// installed package; nothing is written in that case.
pub fn apply_package(
    module: &mut dyn SettingsModule,
    name: &str,
    notifier: &mut dyn Notifier,
    out: &mut dyn Write,
) -> Result<bool, ApplyError> {
    let baseline = module.load()?;
    module.select(name);

    match module.save(&baseline, notifier) {
        Ok(outcome) => {
            info!(
                "{} applied ({} steps, {} failed)",
                name, outcome.applied, outcome.failed
            );
            Ok(true)
        }
        Err(e @ ApplyError::PackageNotFound(_)) => {
            if let Err(write_err) = writeln!(out, "{}", e) {
                warn!("Failed to print \"{}\": {}", e, write_err);
            }
            Ok(false)
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::apply::{DesktopLayoutModule, LookAndFeelModule, read_store};
    use crate::notifications::RecordingNotifier;
    use crate::package::fixtures::{touch, write_package};
    use tempfile::TempDir;

    fn fixture() -> TempDir {
        let tmp = TempDir::new().unwrap();
        let share = tmp.path().join("share");
        let b = write_package(
            &share,
            "org.example.b",
            "Alpha",
            Some("[kdeglobals][KDE]\nwidgetStyle=Fusion\n\n[kwinrc][Windows]\nBorderlessMaximizedWindows=false\n"),
        );
        let a = write_package(
            &share,
            "org.example.a",
            "Beta",
            Some("[kdeglobals][KDE]\nwidgetStyle=Oxygen\n\n[kwinrc][Windows]\nBorderlessMaximizedWindows=true\n"),
        );
        touch(&a, "contents/layouts/org.kde.plasma.desktop-layout.js");
        touch(&b, "contents/layouts/org.kde.plasma.desktop-layout.js");
        tmp
    }

    #[test]
    fn test_list_in_display_name_order() {
        let tmp = fixture();
        let paths = Paths::rooted(tmp.path());

        for kind in [PackageKind::LookAndFeel, PackageKind::DesktopLayout] {
            let mut out: Vec<u8> = Vec::new();
            list_packages(&paths, kind, &mut out).unwrap();
            assert_eq!(String::from_utf8(out).unwrap(), "org.example.b\norg.example.a\n");
        }
    }

    #[test]
    fn test_apply_look_and_feel() {
        let tmp = fixture();
        let paths = Paths::rooted(tmp.path());
        let mut module = LookAndFeelModule::new(paths.clone(), &Config::default());
        let mut out: Vec<u8> = Vec::new();

        let ok = apply_package(&mut module, "org.example.a", &mut RecordingNotifier::default(), &mut out)
            .unwrap();

        assert!(ok);
        assert!(out.is_empty());
        assert_eq!(
            read_store(&paths, "kdeglobals", &["KDE"], "widgetStyle").unwrap().as_deref(),
            Some("Oxygen")
        );
    }

    #[test]
    fn test_apply_desktop_layout() {
        let tmp = fixture();
        let paths = Paths::rooted(tmp.path());
        let mut module = DesktopLayoutModule::new(paths.clone(), &Config::default());

        let ok = apply_package(
            &mut module,
            "org.example.a",
            &mut RecordingNotifier::default(),
            &mut Vec::<u8>::new(),
        )
        .unwrap();

        assert!(ok);
        assert_eq!(
            read_store(&paths, "kwinrc", &["Windows"], "BorderlessMaximizedWindows")
                .unwrap()
                .as_deref(),
            Some("true")
        );
    }

    #[test]
    fn test_apply_unknown_package() {
        let tmp = fixture();
        let paths = Paths::rooted(tmp.path());
        let mut module = LookAndFeelModule::new(paths, &Config::default());
        let mut notifier = RecordingNotifier::default();
        let mut out: Vec<u8> = Vec::new();

        let ok = apply_package(&mut module, "org.nonexistent", &mut notifier, &mut out).unwrap();

        assert!(!ok);
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "Unable to find the theme named org.nonexistent\n"
        );
        assert!(notifier.sent.is_empty());
        assert!(!tmp.path().join("config").exists());
    }

    struct ClosedPipe;

    impl Write for ClosedPipe {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::from(io::ErrorKind::BrokenPipe))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_apply_unknown_package_with_closed_output() {
        let tmp = fixture();
        let mut module = LookAndFeelModule::new(Paths::rooted(tmp.path()), &Config::default());

        let ok = apply_package(
            &mut module,
            "org.nonexistent",
            &mut RecordingNotifier::default(),
            &mut ClosedPipe,
        )
        .unwrap();

        assert!(!ok);
        assert!(!tmp.path().join("config").exists());
    }
}
