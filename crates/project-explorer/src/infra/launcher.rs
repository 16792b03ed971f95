//! Running resolved commands and opening files with the OS default handler.

use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::thread;

use anyhow::{Context, Result, anyhow};

/// Executes command strings produced by the menu and open-with rules.
pub trait Launcher {
    /// Run `command` through the platform shell without waiting for it.
    fn launch(&self, command: &str) -> Result<()>;

    /// Open `path` with whatever the desktop associates with it.
    fn open_default(&self, path: &Path) -> Result<()>;
}

/// Launches through `sh -c` (or `cmd /C` on Windows).
#[derive(Debug, Default, Clone, Copy)]
pub struct ShellLauncher;

impl ShellLauncher {
    pub fn new() -> Self {
        Self
    }

    /// Start `command` detached from our stdio and hand back the child.
    pub fn spawn(&self, command: &str) -> Result<Child> {
        let (shell, flag) = shell();
        Command::new(shell)
            .arg(flag)
            .arg(command)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .with_context(|| format!("failed to launch: {command}"))
    }

    /// Spawn `command` and reap it in the background once it exits. Returns the child's pid.
    pub fn launch_reaped(&self, command: &str) -> Result<u32> {
        let child = self.spawn(command)?;
        let pid = child.id();
        tracing::info!(command, pid, "launched command");
        reap_in_background(child)?;
        Ok(pid)
    }
}

/// Wait for `child` on a detached thread so it does not linger as a zombie.
fn reap_in_background(mut child: Child) -> Result<()> {
    let pid = child.id();
    thread::Builder::new()
        .name(format!("reap-{pid}"))
        .spawn(move || match child.wait() {
            Ok(status) => tracing::debug!(pid, %status, "child exited"),
            Err(err) => tracing::warn!(pid, error = %err, "failed to wait for child"),
        })
        .context("failed to spawn reaper thread")?;
    Ok(())
}

impl Launcher for ShellLauncher {
    fn launch(&self, command: &str) -> Result<()> {
        self.launch_reaped(command)?;
        Ok(())
    }

    fn open_default(&self, path: &Path) -> Result<()> {
        for opener in open_commands() {
            let Some((program, args)) = opener.split_first() else {
                continue;
            };
            let spawned = Command::new(program)
                .args(args)
                .arg(path)
                .stdin(Stdio::null())
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .spawn();
            match spawned {
                Ok(child) => {
                    reap_in_background(child)?;
                    tracing::info!(
                        path = %path.display(),
                        opener = *program,
                        "opened with default handler"
                    );
                    return Ok(());
                }
                Err(err) => tracing::debug!(opener = *program, error = %err, "opener unavailable"),
            }
        }
        Err(anyhow!("no default opener available for {}", path.display()))
    }
}

#[cfg(windows)]
fn shell() -> (&'static str, &'static str) {
    ("cmd", "/C")
}

#[cfg(not(windows))]
fn shell() -> (&'static str, &'static str) {
    ("sh", "-c")
}

#[cfg(target_os = "macos")]
fn open_commands() -> Vec<&'static [&'static str]> {
    vec![&["open"]]
}

#[cfg(all(unix, not(target_os = "macos")))]
fn open_commands() -> Vec<&'static [&'static str]> {
    vec![&["xdg-open"], &["gio", "open"]]
}

#[cfg(target_os = "windows")]
fn open_commands() -> Vec<&'static [&'static str]> {
    vec![&["cmd", "/C", "start", ""]]
}

#[cfg(not(any(unix, target_os = "windows")))]
fn open_commands() -> Vec<&'static [&'static str]> {
    Vec::new()
}
