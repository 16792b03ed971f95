//! Path helpers: normalization, completion, free names, and listing order.

use std::cmp::Ordering;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;

use crate::app::filter::PathFilter;

/// Separator used when rendering normalized paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Separator {
    #[default]
    Slash,
    Backslash,
}

impl Separator {
    /// The separator of the platform we are running on.
    pub fn native() -> Self {
        if cfg!(windows) {
            Separator::Backslash
        } else {
            Separator::Slash
        }
    }

    pub fn as_char(self) -> char {
        match self {
            Separator::Slash => '/',
            Separator::Backslash => '\\',
        }
    }
}

fn is_separator(ch: char) -> bool {
    ch == '/' || ch == '\\'
}

/// Lexically normalize `path`.
///
/// Removes `.` components and empty components, resolves `..` against the preceding
/// component, drops trailing separators, and renders with `separator`. Case is folded on
/// Windows only.
pub fn normalize_path(path: &str, separator: Separator) -> String {
    let absolute = path.starts_with(is_separator);
    let mut parts: Vec<&str> = Vec::new();

    for component in path.split(is_separator) {
        match component {
            "" | "." => {}
            ".." => match parts.last() {
                Some(last) if *last != ".." => {
                    parts.pop();
                }
                _ if absolute => {}
                _ => parts.push(".."),
            },
            other => parts.push(other),
        }
    }

    let sep = separator.as_char();
    let mut normalized = String::with_capacity(path.len());
    if absolute {
        normalized.push(sep);
    }
    normalized.push_str(&parts.join(&sep.to_string()));
    if normalized.is_empty() {
        normalized.push('.');
    }

    if cfg!(windows) {
        normalized.to_lowercase()
    } else {
        normalized
    }
}

fn split_last(path: &str) -> (&str, &str) {
    match path.rfind(is_separator) {
        None => ("", path),
        Some(index) => {
            let head = &path[..=index];
            let tail = &path[index + 1..];
            let trimmed = head.trim_end_matches(is_separator);
            (if trimmed.is_empty() { head } else { trimmed }, tail)
        }
    }
}

/// Split `path` into its longest existing directory head and the component right after it.
///
/// Anything after that component is dropped. The head is empty when no prefix exists.
pub fn valid_split(path: &str) -> (String, String) {
    let mut head = path;

    loop {
        let (next_head, basename) = split_last(head);
        let stalled = next_head == head;
        if next_head.is_empty() || stalled || Path::new(next_head).is_dir() {
            return (next_head.trim().to_owned(), basename.trim().to_owned());
        }
        head = next_head;
    }
}

/// Complete a partially typed directory path.
///
/// Returns `None` when nothing completes, otherwise the normalized candidates in name order.
pub fn complete_path(path: &str, separator: Separator) -> Option<Vec<String>> {
    let path = path.trim();

    if cfg!(windows)
        && let Some(drive) = complete_drive(path)
    {
        return drive.map(|drive| vec![normalize_path(&drive, separator)]);
    }

    let (head, tail) = valid_split(path);
    if head.is_empty() {
        return None;
    }
    if tail.is_empty() {
        return Some(vec![normalize_path(&head, separator)]);
    }

    let tail = tail.to_lowercase();
    let mut names: Vec<String> = fs::read_dir(&head)
        .ok()?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_ok_and(|kind| kind.is_dir()))
        .filter_map(|entry| entry.file_name().into_string().ok())
        .filter(|name| name.to_lowercase().starts_with(&tail))
        .collect();

    if names.is_empty() {
        return None;
    }
    names.sort_by_key(|name| name.to_lowercase());

    let sep = separator.as_char();
    Some(
        names
            .into_iter()
            .map(|name| normalize_path(&format!("{head}{sep}{name}"), separator))
            .collect(),
    )
}

/// `Some(Some(drive))` for a completable drive letter, `Some(None)` for a drive-shaped input
/// that does not exist, and `None` when `path` is not a bare drive.
fn complete_drive(path: &str) -> Option<Option<String>> {
    let mut chars = path.chars();
    let drive = match (chars.next(), chars.next(), chars.next()) {
        (Some(letter), None, None) if letter.is_ascii_alphabetic() => format!("{letter}:"),
        (Some(letter), Some(':'), None) if letter.is_ascii_alphabetic() => path.to_owned(),
        _ => return None,
    };
    Some(Path::new(&format!("{drive}/")).is_dir().then_some(drive))
}

/// First free path for `name` inside `directory`.
///
/// Collisions become `stem (N).ext`; with `at_end` the counter follows the whole name,
/// which keeps dotted directory names and trash entries intact.
pub fn versioned_name(directory: &Path, name: &str, at_end: bool) -> PathBuf {
    let candidate = directory.join(name);
    if !occupied(&candidate) {
        return candidate;
    }

    let (stem, extension) = match name.rfind('.') {
        Some(index) if index > 0 && !at_end => name.split_at(index),
        _ => (name, ""),
    };

    (1u32..)
        .map(|counter| directory.join(format!("{stem} ({counter}){extension}")))
        .find(|path| !occupied(path))
        .unwrap_or(candidate)
}

fn occupied(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok()
}

/// A listed directory entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListedEntry {
    pub path: PathBuf,
    pub is_dir: bool,
}

/// Directories before files, then case-insensitive path order.
pub fn listing_order(a: &ListedEntry, b: &ListedEntry) -> Ordering {
    b.is_dir.cmp(&a.is_dir).then_with(|| {
        let left = a.path.to_string_lossy().to_lowercase();
        let right = b.path.to_string_lossy().to_lowercase();
        left.cmp(&right)
    })
}

/// List `directory`, dropping entries hidden by `filter`.
pub fn list_directory(directory: &Path, filter: &PathFilter) -> Result<Vec<ListedEntry>> {
    let reader = fs::read_dir(directory)
        .with_context(|| format!("failed to read directory {}", directory.display()))?;

    let mut entries = Vec::new();
    for entry in reader {
        let entry = entry
            .with_context(|| format!("failed to read entry in {}", directory.display()))?;
        let path = entry.path();
        if filter.is_hidden(&path.to_string_lossy()) {
            tracing::trace!(path = %path.display(), "hidden by regex_filters");
            continue;
        }
        let is_dir = entry.file_type().is_ok_and(|kind| kind.is_dir());
        entries.push(ListedEntry { path, is_dir });
    }

    entries.sort_by(listing_order);
    Ok(entries)
}
