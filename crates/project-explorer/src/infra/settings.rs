//! Settings file loading.
//!
//! Settings are JSON with `//` line comments. The embedded defaults form the base layer, the
//! user's settings file replaces any top-level keys it defines, and a few environment
//! variables override directories last.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use dirs_next::{config_dir, data_dir};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

static DEFAULT_SETTINGS: Lazy<&'static str> =
    Lazy::new(|| include_str!("../../assets/default-settings.json"));

const APP_DIR: &str = "project-explorer";
const SETTINGS_FILE: &str = "settings.json";
pub const SETTINGS_PATH_ENV: &str = "PROJECT_EXPLORER_SETTINGS";
const TRASH_DIRECTORY_ENV: &str = "PROJECT_EXPLORER_TRASH_DIRECTORY";
const PROJECTS_DIRECTORY_ENV: &str = "PROJECT_EXPLORER_PROJECTS_DIRECTORY";

/// Parsed settings. Entry lists stay as raw JSON so that one malformed entry can be reported
/// and skipped when the settings are compiled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub regex_filters: Vec<String>,
    #[serde(default)]
    pub open_with: Value,
    #[serde(default)]
    pub context_menu: Vec<Value>,
    #[serde(default)]
    pub trash_directory: Option<PathBuf>,
    #[serde(default)]
    pub projects_directory: Option<PathBuf>,
    #[serde(default)]
    pub theme: Option<String>,
}

/// Environment overrides for directories.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct EnvOverrides {
    trash_directory: Option<PathBuf>,
    projects_directory: Option<PathBuf>,
}

impl EnvOverrides {
    pub fn from_env() -> Self {
        Self {
            trash_directory: env::var_os(TRASH_DIRECTORY_ENV).map(PathBuf::from),
            projects_directory: env::var_os(PROJECTS_DIRECTORY_ENV).map(PathBuf::from),
        }
    }

    #[cfg(test)]
    fn for_tests(trash: &str, projects: &str) -> Self {
        Self {
            trash_directory: Some(trash.into()),
            projects_directory: Some(projects.into()),
        }
    }
}

impl Settings {
    /// Load the built-in defaults only.
    pub fn defaults() -> Result<Self> {
        Self::load_with_layers(None, EnvOverrides::default())
    }

    /// Load defaults, then the settings file at `path` if it exists, then env overrides.
    pub fn load(path: &Path) -> Result<Self> {
        Self::load_with_layers(Some(path), EnvOverrides::from_env())
    }

    pub fn load_with_layers(user: Option<&Path>, env_overrides: EnvOverrides) -> Result<Self> {
        let mut layers: Vec<Map<String, Value>> = Vec::new();

        layers.push(parse_object(&DEFAULT_SETTINGS).context("invalid built-in settings")?);

        if let Some(path) = user.filter(|path| path.exists()) {
            let data = fs::read_to_string(path)
                .with_context(|| format!("failed to read settings file: {}", path.display()))?;
            let layer = parse_object(&data)
                .with_context(|| format!("failed to parse settings file: {}", path.display()))?;
            layers.push(layer);
        }

        let merged = layers
            .into_iter()
            .reduce(|mut base, overlay| {
                base.extend(overlay);
                base
            })
            .unwrap_or_default();

        let settings: Settings = serde_json::from_value(Value::Object(merged))
            .context("settings have an unexpected shape")?;
        Ok(apply_env_overrides(settings, env_overrides))
    }

    /// Directory trashed items are moved into.
    pub fn trash_directory(&self) -> PathBuf {
        self.trash_directory
            .clone()
            .unwrap_or_else(|| app_data_dir().join("trash"))
    }

    /// Directory projects are saved into.
    pub fn projects_directory(&self) -> PathBuf {
        self.projects_directory
            .clone()
            .unwrap_or_else(|| app_data_dir().join("projects"))
    }
}

/// Where settings are read from: `explicit`, then `$PROJECT_EXPLORER_SETTINGS`, then the user
/// config directory.
pub fn settings_path(explicit: Option<PathBuf>) -> Option<PathBuf> {
    explicit
        .or_else(|| env::var_os(SETTINGS_PATH_ENV).map(PathBuf::from))
        .or_else(|| config_dir().map(|base| base.join(APP_DIR).join(SETTINGS_FILE)))
}

/// Write the built-in defaults to `path` unless a file is already there.
///
/// Returns `true` when a new file was written.
pub fn ensure_settings_file(path: &Path) -> Result<bool> {
    if path.exists() {
        return Ok(false);
    }
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).with_context(|| {
            format!("failed to create settings directory: {}", parent.display())
        })?;
    }
    fs::write(path, *DEFAULT_SETTINGS)
        .with_context(|| format!("failed to write default settings to {}", path.display()))?;
    tracing::info!(path = %path.display(), "created default settings file");
    Ok(true)
}

/// The embedded default settings document.
pub fn default_settings_text() -> &'static str {
    *DEFAULT_SETTINGS
}

fn app_data_dir() -> PathBuf {
    data_dir()
        .map(|base| base.join(APP_DIR))
        .unwrap_or_else(|| PathBuf::from(format!(".{APP_DIR}")))
}

fn parse_object(contents: &str) -> Result<Map<String, Value>> {
    let stripped = strip_line_comments(contents);
    match serde_json::from_str::<Value>(&stripped).context("failed to parse settings JSON")? {
        Value::Object(object) => Ok(object),
        other => bail!(
            "settings must be a JSON object, found {}",
            json_kind(&other)
        ),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Remove `//` comments that appear outside of string literals.
pub fn strip_line_comments(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    let mut in_string = false;
    let mut escaped = false;

    while let Some(ch) = chars.next() {
        if in_string {
            out.push(ch);
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }

        match ch {
            '"' => {
                in_string = true;
                out.push(ch);
            }
            '/' if chars.peek() == Some(&'/') => {
                for skipped in chars.by_ref() {
                    if skipped == '\n' {
                        out.push('\n');
                        break;
                    }
                }
            }
            _ => out.push(ch),
        }
    }
    out
}

fn apply_env_overrides(mut settings: Settings, env: EnvOverrides) -> Settings {
    if let Some(trash) = env.trash_directory {
        settings.trash_directory = Some(trash);
    }
    if let Some(projects) = env.projects_directory {
        settings.projects_directory = Some(projects);
    }
    settings
}
