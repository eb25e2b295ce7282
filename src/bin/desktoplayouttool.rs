//! Command line tool to apply a desktop layout package.

use clap::{CommandFactory, Parser};
use plasma_lnf::apply::DesktopLayoutModule;
use plasma_lnf::enumerate::PackageKind;
use plasma_lnf::notifications::LiveNotifier;
use plasma_lnf::{Paths, tool};
use std::path::PathBuf;
use tracing::error;

#[derive(Parser)]
#[command(name = "desktoplayouttool")]
#[command(about = "Command line tool to apply desktop layout packages")]
#[command(version)]
struct Cli {
    /// List available desktop layout packages
    #[arg(short, long)]
    list: bool,

    /// Apply a desktop layout package
    #[arg(short, long, value_name = "packagename")]
    apply: Option<String>,

    /// Path to config file (default: ~/.config/plasma-lnf/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Verbose output (can be repeated: -v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() {
    let cli = Cli::parse();

    if !cli.list && cli.apply.is_none() {
        let _ = Cli::command().print_help();
        return;
    }

    let config = match tool::load_config(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config: {}", e);
            std::process::exit(1);
        }
    };
    tool::init_logging(cli.verbose, &config.logging.level);

    let paths = Paths::from_env(&config);
    let mut stdout = std::io::stdout();

    if cli.list {
        if let Err(e) = tool::list_packages(&paths, PackageKind::DesktopLayout, &mut stdout) {
            error!("Failed to list packages: {}", e);
            std::process::exit(1);
        }
    }

    if let Some(name) = cli.apply {
        let mut notifier = LiveNotifier::new(paths.clone(), &config.tools.theme_tool);
        let mut module = DesktopLayoutModule::new(paths, &config);

        match tool::apply_package(&mut module, &name, &mut notifier, &mut stdout) {
            Ok(true) => {}
            Ok(false) => std::process::exit(1),
            Err(e) => {
                error!("Failed to apply {}: {}", name, e);
                std::process::exit(1);
            }
        }
    }
}
