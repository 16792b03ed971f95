//! Project persistence.
//!
//! A project is a named tab holding one or more roots. Saved projects live in the configured
//! projects directory as `<name>.json` with the layout `[[root, ...], [pane size, ...]]`.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

const PROJECT_EXTENSION: &str = "json";
const PROJECT_NAME_PREFIX: &str = "project_";

/// An open project: its roots and the sizes of their panes.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Project {
    pub name: String,
    pub roots: Vec<PathBuf>,
    pub sizes: Vec<u32>,
}

impl Project {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Register another root. Pane sizes are left to the caller.
    pub fn add_root(&mut self, root: impl Into<PathBuf>) {
        self.roots.push(root.into());
    }
}

/// On-disk layout.
#[derive(Debug, Serialize, Deserialize)]
struct ProjectFile(Vec<String>, Vec<u32>);

/// Reads and writes projects under a single directory.
#[derive(Debug, Clone)]
pub struct ProjectStore {
    directory: PathBuf,
}

impl ProjectStore {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Location of the file for project `name`.
    pub fn path_for(&self, name: &str) -> PathBuf {
        self.directory.join(format!("{name}.{PROJECT_EXTENSION}"))
    }

    /// Persist `project`, creating the projects directory as needed.
    pub fn save(&self, project: &Project) -> Result<PathBuf> {
        validate_name(&project.name)?;
        fs::create_dir_all(&self.directory).with_context(|| {
            format!(
                "failed to create projects directory {}",
                self.directory.display()
            )
        })?;

        let file = ProjectFile(
            project
                .roots
                .iter()
                .map(|root| root.display().to_string())
                .collect(),
            project.sizes.clone(),
        );
        let data = serde_json::to_string(&file).context("failed to serialize project")?;
        let path = self.path_for(&project.name);
        fs::write(&path, data)
            .with_context(|| format!("failed to write project file {}", path.display()))?;
        tracing::info!(project = %project.name, path = %path.display(), "saved project");
        Ok(path)
    }

    /// Load project `name` from the store.
    pub fn open(&self, name: &str) -> Result<Project> {
        validate_name(name)?;
        Self::open_path(&self.path_for(name))
    }

    /// Load a project file from anywhere; the project is named after the file stem.
    pub fn open_path(path: &Path) -> Result<Project> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("failed to read project file {}", path.display()))?;
        let ProjectFile(roots, sizes) = serde_json::from_str(&data)
            .with_context(|| format!("invalid project data in {}", path.display()))?;
        let name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .with_context(|| format!("project path has no file name: {}", path.display()))?;

        Ok(Project {
            name,
            roots: roots.into_iter().map(PathBuf::from).collect(),
            sizes,
        })
    }

    /// Names of saved projects, sorted.
    pub fn list(&self) -> Result<Vec<String>> {
        if !self.directory.exists() {
            return Ok(Vec::new());
        }
        let reader = fs::read_dir(&self.directory).with_context(|| {
            format!(
                "failed to read projects directory {}",
                self.directory.display()
            )
        })?;

        let mut names = BTreeSet::new();
        for entry in reader {
            let path = entry?.path();
            if path.extension().and_then(|ext| ext.to_str()) == Some(PROJECT_EXTENSION)
                && let Some(stem) = path.file_stem()
            {
                names.insert(stem.to_string_lossy().into_owned());
            }
        }
        Ok(names.into_iter().collect())
    }

    /// First `project_N` not already saved and not in `open`.
    pub fn next_project_name<'a>(
        &self,
        open: impl IntoIterator<Item = &'a str>,
    ) -> Result<String> {
        let mut taken: BTreeSet<String> = self.list()?.into_iter().collect();
        taken.extend(open.into_iter().map(str::to_owned));

        let name = (0u32..)
            .map(|index| format!("{PROJECT_NAME_PREFIX}{index}"))
            .find(|name| !taken.contains(name))
            .context("no free project name")?;
        Ok(name)
    }
}

/// A project name must be a single file-name component.
fn validate_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        bail!("project name must not be empty");
    }
    if name == "." || name == ".." || name.contains(['/', '\\']) {
        bail!("invalid project name {name:?}: it must be a single path component");
    }
    Ok(())
}
