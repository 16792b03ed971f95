//! Domain models for selections, focus, and resolved menu entries.

use std::path::{Path, PathBuf};

use serde::Serialize;

/// Ordered set of selected paths. Order drives positional `{N}` substitution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    paths: Vec<String>,
}

impl Selection {
    pub fn new<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            paths: paths.into_iter().map(Into::into).collect(),
        }
    }

    /// Build a selection from filesystem paths, converting lossily to strings.
    pub fn from_paths<I, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        Self {
            paths: paths
                .into_iter()
                .map(|path| path.as_ref().to_string_lossy().into_owned())
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.paths.get(index).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.paths.iter().map(String::as_str)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.paths
    }
}

/// Whether the focused item is a directory or something else.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemKind {
    Directory,
    File,
}

/// The single focused entry, distinct from the selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentItem {
    pub path: PathBuf,
    pub kind: ItemKind,
}

impl CurrentItem {
    pub fn directory(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            kind: ItemKind::Directory,
        }
    }

    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            kind: ItemKind::File,
        }
    }

    /// Classify `path` by querying the filesystem. Paths that cannot be stat'ed count as files.
    pub fn probe(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        if path.is_dir() {
            Self::directory(path)
        } else {
            Self::file(path)
        }
    }

    /// The item itself when it is a directory, otherwise its parent.
    ///
    /// Returns `None` for a bare file name with no parent component.
    pub fn current_directory(&self) -> Option<&Path> {
        match self.kind {
            ItemKind::Directory => Some(self.path.as_path()),
            ItemKind::File => self
                .path
                .parent()
                .filter(|parent| !parent.as_os_str().is_empty()),
        }
    }
}

/// One evaluated context-menu entry, ready for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedMenuEntry {
    pub label: String,
    pub enabled: bool,
    pub visible: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
}
