//! Best-effort notifications that make a running session pick up new settings.
//!
//! Every store write in [`crate::apply`] is followed by one or more
//! [`Notification`]s. Delivery never fails the caller: D-Bus errors and
//! process spawn failures are logged and dropped.

use crate::paths::Paths;
use crate::resources::{self, ResourceFlags};
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use tracing::{debug, warn};
use zbus::blocking::Connection;
use zbus::message::{Flags, Message};

/// Change categories understood by `org.kde.KGlobalSettings.notifyChange`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeType {
    Palette = 0,
    Style = 2,
    Cursor = 5,
}

/// Number of KIconLoader groups (desktop, toolbar, main toolbar, small,
/// panel, dialog).
pub const ICON_GROUPS: i32 = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GtkVersion {
    Gtk2,
    Gtk3,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    /// `KGlobalSettings` change broadcast.
    GlobalSettingsChanged(ChangeType),
    /// `KIconLoader` change broadcast for one icon group.
    IconGroupChanged(i32),
    /// Ask KWin to re-read `kwinrc`.
    ReloadKWin,
    /// Push a GTK theme through the GtkConfig bridge.
    GtkTheme { version: GtkVersion, name: String },
    /// Set a variable in the session launch environment.
    LaunchEnv { name: String, value: String },
    /// Run the vendor theme tool with these arguments.
    ThemeTool(Vec<String>),
    /// Ask Plasmashell to load a package's default layout.
    PlasmaShellLayout(String),
    /// Quit a running service by its D-Bus name.
    QuitService(String),
    /// Terminate every process with this name and wait for it.
    KillProcess(String),
    /// Ask Latte Dock to quit.
    LatteQuit,
    /// Start a program detached from this process.
    Launch(Vec<String>),
    /// Merge settings into the X resource database.
    ExportResources(ResourceFlags),
}

/// Where apply steps send their notifications.
pub trait Notifier {
    fn send(&mut self, notification: Notification);
}

/// Delivers notifications to the running session.
pub struct LiveNotifier {
    paths: Paths,
    theme_tool: PathBuf,
    connection: Option<Connection>,
    bus_failed: bool,
}

impl LiveNotifier {
    pub fn new(paths: Paths, theme_tool: impl Into<PathBuf>) -> Self {
        Self {
            paths,
            theme_tool: theme_tool.into(),
            connection: None,
            bus_failed: false,
        }
    }

    /// Session bus connection, opened on first use. A failed connect is
    /// reported once and not retried.
    fn bus(&mut self) -> Option<&Connection> {
        if self.connection.is_none() && !self.bus_failed {
            match Connection::session() {
                Ok(c) => self.connection = Some(c),
                Err(e) => {
                    warn!("Session bus unavailable, live updates skipped: {}", e);
                    self.bus_failed = true;
                }
            }
        }
        self.connection.as_ref()
    }

    fn signal<B>(&mut self, path: &str, interface: &str, member: &str, body: &B)
    where
        B: serde::Serialize + zbus::zvariant::DynamicType,
    {
        let Some(bus) = self.bus() else { return };
        if let Err(e) = bus.emit_signal(None::<&str>, path, interface, member, body) {
            warn!("Failed to emit {}.{}: {}", interface, member, e);
        }
    }

    fn call<B>(&mut self, destination: &str, path: &str, interface: Option<&str>, method: &str, body: &B)
    where
        B: serde::Serialize + zbus::zvariant::DynamicType,
    {
        let Some(bus) = self.bus() else { return };
        let sent = method_call(destination, path, interface, method, body).and_then(|msg| bus.send(&msg));
        if let Err(e) = sent {
            warn!("Call to {} {} failed: {}", destination, method, e);
        }
    }

    fn export_resources(&self, flags: ResourceFlags) {
        if !self.paths.session.x11 {
            debug!("No X11 display, resource export skipped");
            return;
        }

        let text = match resources::generate(flags, &self.paths) {
            Ok(t) => t,
            Err(e) => {
                warn!("Failed to build X resources: {}", e);
                return;
            }
        };

        let child = Command::new("xrdb")
            .args(["-quiet", "-merge", "-nocpp"])
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn();

        let result = child.and_then(|mut child| {
            if let Some(mut stdin) = child.stdin.take() {
                stdin.write_all(text.as_bytes())?;
            }
            child.wait()
        });
        if let Err(e) = result {
            warn!("xrdb failed: {}", e);
        }
    }
}

impl Notifier for LiveNotifier {
    fn send(&mut self, notification: Notification) {
        debug!("Notify: {:?}", notification);

        match notification {
            Notification::GlobalSettingsChanged(change) => self.signal(
                "/KGlobalSettings",
                "org.kde.KGlobalSettings",
                "notifyChange",
                &(change as i32, 0i32),
            ),
            Notification::IconGroupChanged(group) => {
                self.signal("/KIconLoader", "org.kde.KIconLoader", "iconChanged", &(group,))
            }
            Notification::ReloadKWin => {
                self.signal("/KWin", "org.kde.KWin", "reloadConfig", &())
            }
            Notification::GtkTheme { version, name } => {
                let method = match version {
                    GtkVersion::Gtk2 => "setGtk2Theme",
                    GtkVersion::Gtk3 => "setGtk3Theme",
                };
                self.call("org.kde.GtkConfig", "/GtkConfig", None, method, &(name,))
            }
            Notification::LaunchEnv { name, value } => self.call(
                "org.kde.klauncher5",
                "/KLauncher",
                Some("org.kde.KLauncher"),
                "setLaunchEnv",
                &(name, value),
            ),
            Notification::PlasmaShellLayout(id) => self.call(
                "org.kde.plasmashell",
                "/PlasmaShell",
                Some("org.kde.PlasmaShell"),
                "loadLookAndFeelDefaultLayout",
                &(id,),
            ),
            Notification::LatteQuit => self.call(
                "org.kde.lattedock",
                "/Latte",
                Some("org.kde.LatteDock"),
                "quitApplication",
                &(),
            ),
            Notification::ThemeTool(args) => {
                run(Command::new(&self.theme_tool).args(&args));
            }
            Notification::KillProcess(name) => {
                run(Command::new("killall").arg(&name));
            }
            Notification::QuitService(service) => {
                detach(Command::new("kquitapp5").args(["--service", &service]));
            }
            Notification::Launch(argv) => {
                let Some((program, args)) = argv.split_first() else {
                    return;
                };
                detach(Command::new(program).args(args));
            }
            Notification::ExportResources(flags) => self.export_resources(flags),
        }
    }
}

/// Run a command to completion, logging a failure.
fn run(cmd: &mut Command) {
    let result = cmd
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status();
    match result {
        Ok(status) if !status.success() => warn!("{:?} exited with {}", cmd.get_program(), status),
        Ok(_) => {}
        Err(e) => warn!("Failed to run {:?}: {}", cmd.get_program(), e),
    }
}

/// A method call that asks for no reply, so sending it never waits on the peer.
fn method_call<B>(
    destination: &str,
    path: &str,
    interface: Option<&str>,
    method: &str,
    body: &B,
) -> zbus::Result<Message>
where
    B: serde::Serialize + zbus::zvariant::DynamicType,
{
    let mut builder = Message::method_call(path, method)?
        .destination(destination)?
        .with_flags(Flags::NoReplyExpected)?;
    if let Some(interface) = interface {
        builder = builder.interface(interface)?;
    }
    builder.build(body)
}

/// Start a command and leave it running.
fn detach(cmd: &mut Command) {
    if let Err(e) = cmd
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
    {
        warn!("Failed to start {:?}: {}", cmd.get_program(), e);
    }
}

/// Keeps every notification for inspection.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    pub sent: Vec<Notification>,
}

#[cfg(test)]
impl RecordingNotifier {
    pub fn count(&self, notification: &Notification) -> usize {
        self.sent.iter().filter(|n| *n == notification).count()
    }
}

#[cfg(test)]
impl Notifier for RecordingNotifier {
    fn send(&mut self, notification: Notification) {
        self.sent.push(notification);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_call_expects_no_reply() {
        let msg = method_call(
            "org.kde.plasmashell",
            "/PlasmaShell",
            Some("org.kde.PlasmaShell"),
            "loadLookAndFeelDefaultLayout",
            &("org.example.layout",),
        )
        .unwrap();

        assert!(msg.primary_header().flags().contains(Flags::NoReplyExpected));
        let header = msg.header();
        assert_eq!(header.destination().map(|d| d.as_str()), Some("org.kde.plasmashell"));
        assert_eq!(header.interface().map(|i| i.as_str()), Some("org.kde.PlasmaShell"));
        assert_eq!(header.member().map(|m| m.as_str()), Some("loadLookAndFeelDefaultLayout"));
    }

    #[test]
    fn test_method_call_without_interface() {
        let msg = method_call("org.kde.GtkConfig", "/GtkConfig", None, "setGtk3Theme", &("Breeze",))
            .unwrap();

        assert!(msg.primary_header().flags().contains(Flags::NoReplyExpected));
        assert!(msg.header().interface().is_none());
        assert_eq!(msg.body().deserialize::<(String,)>().unwrap().0, "Breeze");
    }
}
