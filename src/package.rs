//! Look-and-feel packages: metadata, bundled resources and loading by id.

use crate::kconfig::{ConfigFile, KConfigError};
use crate::paths::Paths;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Subdirectory of every data dir holding look-and-feel packages.
pub const PACKAGE_ROOT: &str = "plasma/look-and-feel";

/// Script whose presence marks a package as a desktop layout.
pub const LAYOUT_SCRIPT: &str = "org.kde.plasma.desktop-layout.js";

/// Sentinel inside `layouts/` hiding a package from the global theme list.
pub const LAYOUT_ONLY_SENTINEL: &str = "layout-only";

#[derive(Error, Debug)]
pub enum PackageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid metadata.json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Config error: {0}")]
    Config(#[from] KConfigError),
    #[error("No metadata in package {0:?}")]
    MissingMetadata(PathBuf),
}

/// Named files a package may ship under `contents/`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Defaults,
    Colors,
    Layouts,
    Preview,
    FullScreenPreview,
    SplashMainScript,
    LockScreenMainScript,
    RunCommandMainScript,
    LogoutMainScript,
}

impl Resource {
    pub fn relative_path(self) -> &'static str {
        match self {
            Resource::Defaults => "contents/defaults",
            Resource::Colors => "contents/colors",
            Resource::Layouts => "contents/layouts",
            Resource::Preview => "contents/previews/preview.png",
            Resource::FullScreenPreview => "contents/previews/fullscreenpreview.jpg",
            Resource::SplashMainScript => "contents/splash/Splash.qml",
            Resource::LockScreenMainScript => "contents/lockscreen/LockScreen.qml",
            Resource::RunCommandMainScript => "contents/runcommand/RunCommand.qml",
            Resource::LogoutMainScript => "contents/logout/Logout.qml",
        }
    }

    fn is_dir(self) -> bool {
        matches!(self, Resource::Layouts)
    }
}

#[derive(Debug, Deserialize)]
struct MetadataJson {
    #[serde(rename = "KPlugin", default)]
    kplugin: KPluginJson,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct KPluginJson {
    id: Option<String>,
    name: Option<String>,
    description: Option<String>,
}

/// Identity and presentation data of a package.
#[derive(Debug, Clone, PartialEq)]
pub struct Metadata {
    pub plugin_id: String,
    pub name: String,
    pub description: String,
}

impl Metadata {
    /// Read `metadata.json`, falling back to `metadata.desktop`.
    pub fn load(root: &Path) -> Result<Self, PackageError> {
        let dir_name = root
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        let json_path = root.join("metadata.json");
        let (id, name, description) = if json_path.is_file() {
            let content = fs::read_to_string(&json_path)?;
            let parsed: MetadataJson = serde_json::from_str(&content)?;
            let k = parsed.kplugin;
            (k.id, k.name, k.description)
        } else {
            let desktop_path = root.join("metadata.desktop");
            if !desktop_path.is_file() {
                return Err(PackageError::MissingMetadata(root.to_path_buf()));
            }
            let config = ConfigFile::open(&desktop_path)?;
            let group = &["Desktop Entry"];
            (
                config.read(group, "X-KDE-PluginInfo-Name"),
                config.read(group, "Name"),
                config.read(group, "Comment"),
            )
        };

        let plugin_id = id.filter(|s| !s.is_empty()).unwrap_or(dir_name);
        if plugin_id.is_empty() {
            return Err(PackageError::MissingMetadata(root.to_path_buf()));
        }

        Ok(Self {
            name: name.filter(|s| !s.is_empty()).unwrap_or_else(|| plugin_id.clone()),
            description: description.unwrap_or_default(),
            plugin_id,
        })
    }
}

/// An installed package rooted at a directory.
#[derive(Debug, Clone)]
pub struct Package {
    root: PathBuf,
    metadata: Metadata,
}

impl Package {
    pub fn load(root: &Path) -> Result<Self, PackageError> {
        let metadata = Metadata::load(root)?;
        Ok(Self {
            root: root.to_path_buf(),
            metadata,
        })
    }

    pub fn plugin_id(&self) -> &str {
        &self.metadata.plugin_id
    }

    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    pub fn description(&self) -> &str {
        &self.metadata.description
    }

    /// Path of a bundled resource, if the package ships it.
    pub fn file_path(&self, resource: Resource) -> Option<PathBuf> {
        let path = self.root.join(resource.relative_path());
        let present = if resource.is_dir() {
            path.is_dir()
        } else {
            path.is_file()
        };
        present.then_some(path)
    }

    pub fn has(&self, resource: Resource) -> bool {
        self.file_path(resource).is_some()
    }

    /// A file inside the package's `layouts/` directory.
    pub fn layout_file(&self, name: &str) -> Option<PathBuf> {
        let path = self.file_path(Resource::Layouts)?.join(name);
        path.is_file().then_some(path)
    }

    /// The bundled defaults file, if any.
    pub fn defaults(&self) -> Result<Option<ConfigFile>, PackageError> {
        match self.file_path(Resource::Defaults) {
            Some(path) => Ok(Some(ConfigFile::open(&path)?)),
            None => Ok(None),
        }
    }
}

/// Resolves package ids against the data dirs.
#[derive(Debug, Clone)]
pub struct PackageLoader {
    data_dirs: Vec<PathBuf>,
    fallback: String,
}

impl PackageLoader {
    pub fn new(paths: &Paths, fallback: &str) -> Self {
        Self {
            data_dirs: paths.data_dirs.clone(),
            fallback: fallback.to_string(),
        }
    }

    /// Load `id`, handing back the fallback package when `id` is not
    /// installed. Callers that need the exact package use [`Self::find`].
    pub fn load(&self, id: &str) -> Option<Package> {
        self.load_exact(id).or_else(|| {
            debug!("Package {} not found, using fallback {}", id, self.fallback);
            self.load_exact(&self.fallback)
        })
    }

    /// Load `id` and reject the fallback: the loaded plugin id must equal `id`.
    pub fn find(&self, id: &str) -> Option<Package> {
        if id.is_empty() {
            return None;
        }
        self.load(id).filter(|p| p.plugin_id() == id)
    }

    fn load_exact(&self, id: &str) -> Option<Package> {
        if id.is_empty() || id.contains('/') {
            return None;
        }

        self.data_dirs
            .iter()
            .map(|d| d.join(PACKAGE_ROOT).join(id))
            .filter(|p| p.is_dir())
            .find_map(|p| match Package::load(&p) {
                Ok(pkg) => Some(pkg),
                Err(e) => {
                    debug!("Skipping {:?}: {}", p, e);
                    None
                }
            })
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    //! Package trees for tests.

    use std::fs;
    use std::path::{Path, PathBuf};

    /// Write a package under `<share>/plasma/look-and-feel/<id>`.
    pub fn write_package(share: &Path, id: &str, name: &str, defaults: Option<&str>) -> PathBuf {
        let root = share.join(super::PACKAGE_ROOT).join(id);
        fs::create_dir_all(root.join("contents")).unwrap();
        fs::write(
            root.join("metadata.json"),
            format!(
                r#"{{"KPlugin": {{"Id": "{}", "Name": "{}", "Description": "{} description"}}}}"#,
                id, name, name
            ),
        )
        .unwrap();
        if let Some(defaults) = defaults {
            fs::write(root.join("contents/defaults"), defaults).unwrap();
        }
        root
    }

    pub fn touch(root: &Path, relative: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "").unwrap();
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::{touch, write_package};
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_metadata_json() {
        let tmp = TempDir::new().unwrap();
        let root = write_package(tmp.path(), "org.example.a", "Example A", None);

        let pkg = Package::load(&root).unwrap();
        assert_eq!(pkg.plugin_id(), "org.example.a");
        assert_eq!(pkg.name(), "Example A");
        assert_eq!(pkg.description(), "Example A description");
    }

    #[test]
    fn test_metadata_desktop_and_dir_name_fallback() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("org.example.legacy");
        fs::create_dir_all(&root).unwrap();
        fs::write(
            root.join("metadata.desktop"),
            "[Desktop Entry]\nName=Legacy\nComment=Old style\n",
        )
        .unwrap();

        let meta = Metadata::load(&root).unwrap();
        assert_eq!(meta.plugin_id, "org.example.legacy");
        assert_eq!(meta.name, "Legacy");
        assert_eq!(meta.description, "Old style");
    }

    #[test]
    fn test_missing_metadata() {
        let tmp = TempDir::new().unwrap();
        assert!(matches!(
            Package::load(tmp.path()),
            Err(PackageError::MissingMetadata(_))
        ));
    }

    #[test]
    fn test_resources() {
        let tmp = TempDir::new().unwrap();
        let root = write_package(tmp.path(), "org.example.a", "A", Some("[kdeglobals][KDE]\nwidgetStyle=Breeze\n"));
        touch(&root, "contents/splash/Splash.qml");
        touch(&root, "contents/layouts/org.kde.plasma.desktop-layout.js");

        let pkg = Package::load(&root).unwrap();
        assert!(pkg.has(Resource::Defaults));
        assert!(pkg.has(Resource::SplashMainScript));
        assert!(pkg.has(Resource::Layouts));
        assert!(!pkg.has(Resource::Colors));
        assert!(pkg.layout_file(LAYOUT_SCRIPT).is_some());
        assert!(pkg.layout_file(LAYOUT_ONLY_SENTINEL).is_none());

        let defaults = pkg.defaults().unwrap().unwrap();
        assert_eq!(
            defaults.read(&["kdeglobals", "KDE"], "widgetStyle").as_deref(),
            Some("Breeze")
        );
    }

    #[test]
    fn test_loader_fallback_is_rejected_by_find() {
        let tmp = TempDir::new().unwrap();
        let paths = Paths::rooted(tmp.path());
        let share = tmp.path().join("share");
        write_package(&share, "org.kde.breeze.desktop", "Breeze", None);
        write_package(&share, "org.example.a", "A", None);

        let loader = PackageLoader::new(&paths, "org.kde.breeze.desktop");

        // Unknown ids still load something...
        let fallback = loader.load("org.nonexistent").unwrap();
        assert_eq!(fallback.plugin_id(), "org.kde.breeze.desktop");
        // ...but never count as the requested package.
        assert!(loader.find("org.nonexistent").is_none());
        assert!(loader.find("").is_none());
        assert_eq!(loader.find("org.example.a").unwrap().name(), "A");
    }

    #[test]
    fn test_loader_prefers_first_data_dir() {
        let tmp = TempDir::new().unwrap();
        let user = tmp.path().join("user");
        let system = tmp.path().join("system");
        write_package(&user, "org.example.a", "User copy", None);
        write_package(&system, "org.example.a", "System copy", None);

        let mut paths = Paths::rooted(tmp.path());
        paths.data_dirs = vec![user, system];

        let loader = PackageLoader::new(&paths, "org.kde.breeze.desktop");
        assert_eq!(loader.find("org.example.a").unwrap().name(), "User copy");
    }
}
