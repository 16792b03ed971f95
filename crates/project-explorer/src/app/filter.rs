//! `regex_filters`: hide listing entries whose full path matches a pattern.

use regex::RegexSet;

use crate::domain::errors::{ConfigError, EntryRef};

const SECTION: &str = "regex_filters";

/// Full-match path filter compiled into a single [`RegexSet`].
#[derive(Debug, Clone)]
pub struct PathFilter {
    set: Option<RegexSet>,
}

impl PathFilter {
    /// A filter that hides nothing.
    pub fn empty() -> Self {
        Self { set: None }
    }

    /// Compile `patterns`; invalid patterns are reported and left out of the set.
    pub fn compile(patterns: &[String]) -> (Self, Vec<ConfigError>) {
        let mut anchored = Vec::with_capacity(patterns.len());
        let mut diagnostics = Vec::new();

        for (index, pattern) in patterns.iter().enumerate() {
            let wrapped = format!("^(?:{pattern})$");
            match regex::Regex::new(&wrapped) {
                Ok(_) => anchored.push(wrapped),
                Err(source) => diagnostics.push(ConfigError::InvalidPattern {
                    entry: EntryRef::new(SECTION, index),
                    pattern: pattern.clone(),
                    source,
                }),
            }
        }

        if anchored.is_empty() {
            return (Self::empty(), diagnostics);
        }

        match RegexSet::new(&anchored) {
            Ok(set) => (Self { set: Some(set) }, diagnostics),
            Err(source) => {
                diagnostics.push(ConfigError::InvalidPattern {
                    entry: EntryRef::new(SECTION, 0),
                    pattern: patterns.join(" | "),
                    source,
                });
                (Self::empty(), diagnostics)
            }
        }
    }

    /// Whether `path` is fully matched by any configured pattern.
    pub fn is_hidden(&self, path: &str) -> bool {
        self.set.as_ref().is_some_and(|set| set.is_match(path))
    }
}

impl Default for PathFilter {
    fn default() -> Self {
        Self::empty()
    }
}
