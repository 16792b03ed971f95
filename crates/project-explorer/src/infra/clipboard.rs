//! Clipboard integration for copying and pasting paths.

use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use anyhow::{Context, Result, anyhow};

/// Cross-platform clipboard helper with fallbacks for headless environments.
pub struct Clipboard {
    primary: Option<arboard::Clipboard>,
}

impl Clipboard {
    /// Attempt to initialize the system clipboard. When unavailable we fall back to shell-based
    /// clipboard utilities.
    pub fn new() -> Self {
        let primary = arboard::Clipboard::new().ok();
        Self { primary }
    }

    /// Place `paths` on the clipboard, one per line.
    pub fn copy_paths(&mut self, paths: &[PathBuf]) -> Result<()> {
        let text = join_paths(paths);
        self.copy(&text)?;
        tracing::debug!(count = paths.len(), "copied paths to clipboard");
        Ok(())
    }

    /// Paths currently on the clipboard, one per non-empty line.
    pub fn read_paths(&mut self) -> Result<Vec<PathBuf>> {
        Ok(split_paths(&self.read()?))
    }

    pub fn copy(&mut self, text: &str) -> Result<()> {
        if let Some(primary) = self.primary.as_mut()
            && primary.set_text(text.to_owned()).is_ok()
        {
            return Ok(());
        }

        self.primary = None;
        fallback_copy(text)
    }

    pub fn read(&mut self) -> Result<String> {
        if let Some(primary) = self.primary.as_mut()
            && let Ok(text) = primary.get_text()
        {
            return Ok(text);
        }

        self.primary = None;
        fallback_read()
    }
}

impl Default for Clipboard {
    fn default() -> Self {
        Self::new()
    }
}

fn join_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|path| path.display().to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

fn split_paths(text: &str) -> Vec<PathBuf> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(PathBuf::from)
        .collect()
}

fn fallback_copy(text: &str) -> Result<()> {
    first_backend(copy_commands(), "copy to", |command| {
        try_command_copy(command, text)
    })
}

fn fallback_read() -> Result<String> {
    first_backend(paste_commands(), "read", try_command_read)
}

/// Try each backend command in turn and return the first success.
fn first_backend<T>(
    commands: Vec<&'static [&'static str]>,
    action: &str,
    mut attempt: impl FnMut(&[&str]) -> Result<T>,
) -> Result<T> {
    for command in commands {
        match attempt(command) {
            Ok(value) => return Ok(value),
            Err(err) => {
                tracing::debug!(backend = ?command, error = %err, "clipboard backend failed");
            }
        }
    }
    Err(anyhow!("failed to {action} clipboard using available backends"))
}

fn try_command_copy(command: &[&str], text: &str) -> Result<()> {
    let (program, args) = command
        .split_first()
        .context("clipboard command missing program")?;

    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::piped())
        .spawn()
        .with_context(|| format!("failed to spawn clipboard command: {program}"))?;

    if let Some(stdin) = child.stdin.as_mut() {
        stdin
            .write_all(text.as_bytes())
            .context("failed to write clipboard contents")?;
    }

    let status = child
        .wait()
        .with_context(|| format!("clipboard command did not exit cleanly: {program}"))?;
    if status.success() {
        Ok(())
    } else {
        Err(anyhow!("clipboard command exited with status {status}"))
    }
}

fn try_command_read(command: &[&str]) -> Result<String> {
    let (program, args) = command
        .split_first()
        .context("clipboard command missing program")?;

    let output = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .output()
        .with_context(|| format!("failed to run clipboard command: {program}"))?;
    if !output.status.success() {
        return Err(anyhow!(
            "clipboard command exited with status {}",
            output.status
        ));
    }
    String::from_utf8(output.stdout).context("clipboard contents are not UTF-8")
}

#[cfg(target_os = "macos")]
fn copy_commands() -> Vec<&'static [&'static str]> {
    vec![&["pbcopy"]]
}

#[cfg(all(unix, not(target_os = "macos")))]
fn copy_commands() -> Vec<&'static [&'static str]> {
    vec![&["xclip", "-selection", "clipboard"], &["wl-copy"]]
}

#[cfg(target_os = "windows")]
fn copy_commands() -> Vec<&'static [&'static str]> {
    vec![&["powershell.exe", "-NoProfile", "-Command", "Set-Clipboard"]]
}

#[cfg(not(any(unix, target_os = "windows")))]
fn copy_commands() -> Vec<&'static [&'static str]> {
    Vec::new()
}

#[cfg(target_os = "macos")]
fn paste_commands() -> Vec<&'static [&'static str]> {
    vec![&["pbpaste"]]
}

#[cfg(all(unix, not(target_os = "macos")))]
fn paste_commands() -> Vec<&'static [&'static str]> {
    vec![&["xclip", "-selection", "clipboard", "-o"], &["wl-paste", "--no-newline"]]
}

#[cfg(target_os = "windows")]
fn paste_commands() -> Vec<&'static [&'static str]> {
    vec![&["powershell.exe", "-NoProfile", "-Command", "Get-Clipboard"]]
}

#[cfg(not(any(unix, target_os = "windows")))]
fn paste_commands() -> Vec<&'static [&'static str]> {
    Vec::new()
}
