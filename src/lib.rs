//! Plasma Look and Feel library
//!
//! Discovers installed look-and-feel packages and applies global themes and
//! desktop layouts to the user's configuration, notifying the running
//! session so changes take effect live.

pub mod apply;
pub mod autostart;
pub mod colors;
pub mod config;
pub mod cursor;
pub mod defaults;
pub mod desktop;
pub mod enumerate;
pub mod kconfig;
pub mod model;
pub mod notifications;
pub mod package;
pub mod paths;
pub mod resources;
pub mod tool;

pub use config::Config;
pub use package::{Package, PackageLoader};
pub use paths::Paths;
