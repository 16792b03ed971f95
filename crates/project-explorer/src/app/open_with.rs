//! Open-with resolution for activated files.

use std::collections::BTreeMap;

use regex::Regex;
use serde::Deserialize;
use serde_json::Value;

use crate::app::template::{CommandTemplate, quote_if_needed};
use crate::domain::errors::{ConfigError, EntryRef};

const SECTION: &str = "open_with";
const PATH: &str = "path";

/// `open_with` as written in settings: ordered `[pattern, command]` pairs, or the older
/// extension-keyed table.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum OpenWithTable {
    Pairs(Vec<Value>),
    ByExtension(BTreeMap<String, String>),
}

impl Default for OpenWithTable {
    fn default() -> Self {
        OpenWithTable::Pairs(Vec::new())
    }
}

#[derive(Debug, Clone)]
struct OpenWithRule {
    pattern: Regex,
    template: CommandTemplate,
}

/// Compiled open-with rules. The first pattern that matches the path wins.
#[derive(Debug, Clone, Default)]
pub struct OpenWith {
    rules: Vec<OpenWithRule>,
}

impl OpenWith {
    /// Compile the raw `open_with` settings value. `null` means no rules.
    pub fn compile_value(value: &Value) -> (Self, Vec<ConfigError>) {
        if value.is_null() {
            return (Self::default(), Vec::new());
        }
        match serde_json::from_value::<OpenWithTable>(value.clone()) {
            Ok(table) => Self::compile(&table),
            Err(source) => (
                Self::default(),
                vec![ConfigError::InvalidEntry {
                    entry: EntryRef::new(SECTION, 0),
                    source,
                }],
            ),
        }
    }

    /// Compile the settings table. Malformed pairs are skipped and reported.
    pub fn compile(table: &OpenWithTable) -> (Self, Vec<ConfigError>) {
        let pairs: Vec<(EntryRef, Result<(String, String), ConfigError>)> = match table {
            OpenWithTable::Pairs(values) => values
                .iter()
                .enumerate()
                .map(|(index, value)| {
                    let entry = EntryRef::new(SECTION, index);
                    let pair = serde_json::from_value::<(String, String)>(value.clone()).map_err(
                        |source| ConfigError::InvalidEntry {
                            entry: entry.clone(),
                            source,
                        },
                    );
                    (entry, pair)
                })
                .collect(),
            OpenWithTable::ByExtension(map) => map
                .iter()
                .enumerate()
                .map(|(index, (extension, command))| {
                    let entry = EntryRef::new(SECTION, index).with_label(extension.clone());
                    (entry, Ok((extension_pattern(extension), command.clone())))
                })
                .collect(),
        };

        let mut rules = Vec::with_capacity(pairs.len());
        let mut diagnostics = Vec::new();
        for (entry, pair) in pairs {
            match pair.and_then(|(pattern, command)| compile_rule(&entry, &pattern, &command)) {
                Ok(rule) => rules.push(rule),
                Err(err) => diagnostics.push(err),
            }
        }
        (Self { rules }, diagnostics)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Command for opening `path`, or `None` when no rule matches.
    pub fn resolve(&self, path: &str) -> Option<String> {
        let rule = self.rules.iter().find(|rule| rule.pattern.is_match(path))?;
        rule.template
            .render(|field| field.is_named(PATH).then(|| quote_if_needed(path).into_owned()))
            .ok()
    }
}

fn compile_rule(
    entry: &EntryRef,
    pattern: &str,
    command: &str,
) -> Result<OpenWithRule, ConfigError> {
    let compiled = Regex::new(pattern).map_err(|source| ConfigError::InvalidPattern {
        entry: entry.clone(),
        pattern: pattern.to_owned(),
        source,
    })?;
    let template =
        CommandTemplate::parse(command).map_err(|source| ConfigError::InvalidTemplate {
            entry: entry.clone(),
            source,
        })?;
    if let Some(field) = template.fields().find(|field| !field.is_named(PATH)) {
        return Err(ConfigError::UnsupportedPlaceholder {
            entry: entry.clone(),
            placeholder: field.to_string(),
        });
    }
    Ok(OpenWithRule {
        pattern: compiled,
        template,
    })
}

fn extension_pattern(extension: &str) -> String {
    let extension = extension.trim();
    let dotted = if extension.starts_with('.') {
        extension.to_owned()
    } else {
        format!(".{extension}")
    };
    format!("{}$", regex::escape(&dotted))
}

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    fn table(value: Value) -> OpenWithTable {
        serde_json::from_value(value).expect("valid table")
    }

    #[test]
    fn first_matching_pair_wins() {
        let (open_with, diagnostics) = OpenWith::compile(&table(json!([
            [r"\.py$", "idle {path}"],
            [r"\.(py|txt)$", "notepad {path}"],
            [r".*", "less {path}"]
        ])));
        assert!(diagnostics.is_empty());
        assert_eq!(open_with.len(), 3);

        assert_eq!(open_with.resolve("/src/a.py").as_deref(), Some("idle /src/a.py"));
        assert_eq!(
            open_with.resolve("/notes/b.txt").as_deref(),
            Some("notepad /notes/b.txt")
        );
        assert_eq!(
            open_with.resolve("/bin/my tool").as_deref(),
            Some("less \"/bin/my tool\"")
        );
    }

    #[test]
    fn unmatched_path_resolves_to_none() {
        let (open_with, _) = OpenWith::compile(&table(json!([[r"\.md$", "glow {path}"]])));
        assert_eq!(open_with.resolve("/tmp/a.rs"), None);
    }

    #[test]
    fn extension_table_is_accepted() {
        let (open_with, diagnostics) = OpenWith::compile(&table(json!({
            ".py": "idle {path}",
            "md": "glow {path}"
        })));
        assert!(diagnostics.is_empty());
        assert_eq!(open_with.resolve("/a/run.py").as_deref(), Some("idle /a/run.py"));
        assert_eq!(open_with.resolve("/a/README.md").as_deref(), Some("glow /a/README.md"));
        assert_eq!(open_with.resolve("/a/python"), None);
    }

    #[test]
    fn compile_value_handles_null_and_wrong_shapes() {
        let (open_with, diagnostics) = OpenWith::compile_value(&Value::Null);
        assert!(open_with.is_empty() && diagnostics.is_empty());

        let (open_with, diagnostics) = OpenWith::compile_value(&json!("less {path}"));
        assert!(open_with.is_empty());
        assert_eq!(diagnostics.len(), 1);
    }

    #[test]
    fn malformed_pairs_are_skipped() {
        let (open_with, diagnostics) = OpenWith::compile(&table(json!([
            ["(", "x {path}"],
            ["a", "x {selected}"],
            ["only-pattern"],
            [r"\.rs$", "vim {path}"]
        ])));
        assert_eq!(open_with.len(), 1);
        assert_eq!(diagnostics.len(), 3);
        assert!(matches!(diagnostics[0], ConfigError::InvalidPattern { .. }));
        assert!(matches!(diagnostics[1], ConfigError::UnsupportedPlaceholder { .. }));
        assert!(matches!(diagnostics[2], ConfigError::InvalidEntry { .. }));
    }
}
