//! Domain-specific errors.

use std::fmt;

use thiserror::Error;

/// Identifies a configured entry in diagnostics by position and, when known, its label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryRef {
    pub section: &'static str,
    pub index: usize,
    pub label: Option<String>,
}

impl EntryRef {
    pub fn new(section: &'static str, index: usize) -> Self {
        Self {
            section,
            index,
            label: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

impl fmt::Display for EntryRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.label {
            Some(label) => write!(f, "{} entry #{} ({label:?})", self.section, self.index),
            None => write!(f, "{} entry #{}", self.section, self.index),
        }
    }
}

/// A single malformed settings entry. The entry is skipped; the rest of the settings load.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{entry}: malformed entry: {source}")]
    InvalidEntry {
        entry: EntryRef,
        #[source]
        source: serde_json::Error,
    },
    #[error("{entry}: missing required field `{field}`")]
    MissingField {
        entry: EntryRef,
        field: &'static str,
    },
    #[error("{entry}: invalid pattern {pattern:?}: {source}")]
    InvalidPattern {
        entry: EntryRef,
        pattern: String,
        #[source]
        source: regex::Error,
    },
    #[error("{entry}: invalid command template: {source}")]
    InvalidTemplate {
        entry: EntryRef,
        #[source]
        source: TemplateError,
    },
    #[error("{entry}: unsupported placeholder `{{{placeholder}}}`")]
    UnsupportedPlaceholder {
        entry: EntryRef,
        placeholder: String,
    },
}

impl ConfigError {
    /// The entry the diagnostic refers to.
    pub fn entry(&self) -> &EntryRef {
        match self {
            ConfigError::InvalidEntry { entry, .. }
            | ConfigError::MissingField { entry, .. }
            | ConfigError::InvalidPattern { entry, .. }
            | ConfigError::InvalidTemplate { entry, .. }
            | ConfigError::UnsupportedPlaceholder { entry, .. } => entry,
        }
    }
}

/// Errors raised while parsing or rendering a `{placeholder}` command template.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TemplateError {
    #[error("unmatched '{{' at byte {0}")]
    UnmatchedOpen(usize),
    #[error("unmatched '}}' at byte {0}")]
    UnmatchedClose(usize),
    #[error("empty placeholder at byte {0}")]
    EmptyField(usize),
    #[error("format specs and conversions are not supported in `{{{0}}}`")]
    UnsupportedSpec(String),
    #[error("no value for placeholder `{{{0}}}`")]
    Unbound(String),
    #[error("positional placeholder `{{{0}}}` is out of range")]
    IndexOutOfRange(usize),
}
