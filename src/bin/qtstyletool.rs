//! Command line tool to apply a Qt application style.

use clap::{CommandFactory, Parser};
use plasma_lnf::apply::LookAndFeelModule;
use plasma_lnf::notifications::LiveNotifier;
use plasma_lnf::{Paths, tool};
use std::path::PathBuf;
use tracing::error;

#[derive(Parser)]
#[command(name = "qtstyletool")]
#[command(about = "Command line tool to apply a Qt Application Style")]
#[command(version)]
struct Cli {
    /// Apply an Application Style
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

    let Some(style) = cli.apply else {
        let _ = Cli::command().print_help();
        return;
    };

    let config = match tool::load_config(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config: {}", e);
            std::process::exit(1);
        }
    };
    tool::init_logging(cli.verbose, &config.logging.level);

    let paths = Paths::from_env(&config);
    let mut notifier = LiveNotifier::new(paths.clone(), &config.tools.theme_tool);
    let module = LookAndFeelModule::new(paths, &config);

    if let Err(e) = module.set_widget_style(&style, &mut notifier) {
        error!("Failed to apply style {}: {}", style, e);
        std::process::exit(1);
    }
}
