//! Filesystem operations behind the browser's trash, delete, paste, and create actions.

use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use time::OffsetDateTime;
use time::format_description::FormatItem;
use time::macros::format_description;
use walkdir::WalkDir;

use crate::app::paths::versioned_name;

const NEW_FILE: &str = "new_file";
const NEW_DIRECTORY: &str = "new_directory";

/// Colons are not allowed in Windows file names, so the time uses `;`.
const TRASH_STAMP: &[FormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour];[minute];[second].[subsecond digits:6]");

/// Name given to `name` when it is moved to the trash at `at`.
pub fn trash_item_name(name: &str, at: OffsetDateTime) -> Result<String> {
    let stamp = at
        .format(TRASH_STAMP)
        .context("failed to format trash timestamp")?;
    Ok(format!("{name}@{stamp}"))
}

/// The trash directory configured in settings.
#[derive(Debug, Clone)]
pub struct Trash {
    directory: PathBuf,
}

impl Trash {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Move `path` into the trash, returning where it landed.
    pub fn move_to_trash(&self, path: &Path) -> Result<PathBuf> {
        self.move_to_trash_at(path, OffsetDateTime::now_utc())
    }

    pub fn move_to_trash_at(&self, path: &Path, at: OffsetDateTime) -> Result<PathBuf> {
        fs::symlink_metadata(path)
            .with_context(|| format!("cannot trash missing path {}", path.display()))?;
        fs::create_dir_all(&self.directory).with_context(|| {
            format!(
                "failed to create trash directory {}",
                self.directory.display()
            )
        })?;

        let name = file_name(path)?;
        let destination = versioned_name(&self.directory, &trash_item_name(&name, at)?, true);

        if let Err(err) = fs::rename(path, &destination) {
            tracing::debug!(
                error = %err,
                path = %path.display(),
                "rename failed, copying into trash"
            );
            copy_entry(path, &destination)?;
            delete_permanently(path)?;
        }

        tracing::info!(from = %path.display(), to = %destination.display(), "moved to trash");
        Ok(destination)
    }
}

/// Remove a file, symlink, or whole directory tree.
pub fn delete_permanently(path: &Path) -> Result<()> {
    let metadata = fs::symlink_metadata(path)
        .with_context(|| format!("cannot delete missing path {}", path.display()))?;
    if metadata.is_dir() {
        fs::remove_dir_all(path)
            .with_context(|| format!("failed to delete directory {}", path.display()))?;
    } else {
        fs::remove_file(path).with_context(|| format!("failed to delete {}", path.display()))?;
    }
    tracing::info!(path = %path.display(), "deleted");
    Ok(())
}

/// Copy each source into `directory` under a free name. Missing sources are skipped.
pub fn paste_into(directory: &Path, sources: &[PathBuf]) -> Result<Vec<PathBuf>> {
    if !directory.is_dir() {
        bail!("paste destination is not a directory: {}", directory.display());
    }

    let mut pasted = Vec::with_capacity(sources.len());
    for source in sources {
        if !source.exists() {
            tracing::warn!(path = %source.display(), "skipping missing paste source");
            continue;
        }
        if source.is_dir() && is_within(directory, source)? {
            bail!(
                "cannot paste {} into its own subdirectory {}",
                source.display(),
                directory.display()
            );
        }

        let name = file_name(source)?;
        let destination = versioned_name(directory, &name, source.is_dir());
        copy_entry(source, &destination)?;
        tracing::debug!(from = %source.display(), to = %destination.display(), "pasted");
        pasted.push(destination);
    }
    Ok(pasted)
}

/// Create an empty `new_file` in `directory`.
pub fn create_file(directory: &Path) -> Result<PathBuf> {
    let path = versioned_name(directory, NEW_FILE, false);
    OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    Ok(path)
}

/// Create an empty `new_directory` in `directory`.
pub fn create_directory(directory: &Path) -> Result<PathBuf> {
    let path = versioned_name(directory, NEW_DIRECTORY, true);
    fs::create_dir(&path).with_context(|| format!("failed to create {}", path.display()))?;
    Ok(path)
}

/// Whether `inner` is `outer` or lies below it, once both are resolved on disk.
fn is_within(inner: &Path, outer: &Path) -> Result<bool> {
    let inner = fs::canonicalize(inner)
        .with_context(|| format!("failed to resolve {}", inner.display()))?;
    let outer = fs::canonicalize(outer)
        .with_context(|| format!("failed to resolve {}", outer.display()))?;
    Ok(inner.starts_with(outer))
}

fn file_name(path: &Path) -> Result<String> {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .with_context(|| format!("path has no file name: {}", path.display()))
}

fn copy_entry(source: &Path, destination: &Path) -> Result<()> {
    if !source.is_dir() {
        fs::copy(source, destination).with_context(|| {
            format!(
                "failed to copy {} to {}",
                source.display(),
                destination.display()
            )
        })?;
        return Ok(());
    }

    for entry in WalkDir::new(source) {
        let entry = entry.with_context(|| format!("failed to walk {}", source.display()))?;
        let relative = entry
            .path()
            .strip_prefix(source)
            .context("walked entry outside of copy source")?;
        let target = destination.join(relative);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)
                .with_context(|| format!("failed to create {}", target.display()))?;
        } else {
            fs::copy(entry.path(), &target)
                .with_context(|| format!("failed to copy {}", entry.path().display()))?;
        }
    }
    Ok(())
}
