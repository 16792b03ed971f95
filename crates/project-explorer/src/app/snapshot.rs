//! Immutable compiled view of one settings load.

use std::path::{Path, PathBuf};

use crate::app::fileops::Trash;
use crate::app::filter::PathFilter;
use crate::app::menu::ContextMenu;
use crate::app::open_with::OpenWith;
use crate::app::project::ProjectStore;
use crate::domain::errors::ConfigError;
use crate::infra::settings::Settings;

/// Everything derived from a [`Settings`] value. Rebuilt on every reload, never mutated.
#[derive(Debug)]
pub struct Snapshot {
    pub menu: ContextMenu,
    pub open_with: OpenWith,
    pub filter: PathFilter,
    pub theme: Option<String>,
    trash_directory: PathBuf,
    projects_directory: PathBuf,
    diagnostics: Vec<ConfigError>,
}

impl Snapshot {
    pub fn compile(settings: &Settings) -> Self {
        let (menu, mut diagnostics) = ContextMenu::compile(&settings.context_menu);
        let (open_with, open_with_errors) = OpenWith::compile_value(&settings.open_with);
        let (filter, filter_errors) = PathFilter::compile(&settings.regex_filters);
        diagnostics.extend(open_with_errors);
        diagnostics.extend(filter_errors);

        for diagnostic in &diagnostics {
            tracing::warn!(
                section = diagnostic.entry().section,
                error = %diagnostic,
                "skipping settings entry"
            );
        }
        tracing::debug!(
            menu_rules = menu.len(),
            open_with_rules = open_with.len(),
            diagnostics = diagnostics.len(),
            "compiled settings snapshot"
        );

        Self {
            menu,
            open_with,
            filter,
            theme: settings.theme.clone(),
            trash_directory: settings.trash_directory(),
            projects_directory: settings.projects_directory(),
            diagnostics,
        }
    }

    /// Entries that were skipped while compiling.
    pub fn diagnostics(&self) -> &[ConfigError] {
        &self.diagnostics
    }

    pub fn trash_directory(&self) -> &Path {
        &self.trash_directory
    }

    pub fn projects_directory(&self) -> &Path {
        &self.projects_directory
    }

    pub fn trash(&self) -> Trash {
        Trash::new(&self.trash_directory)
    }

    pub fn projects(&self) -> ProjectStore {
        ProjectStore::new(&self.projects_directory)
    }
}
