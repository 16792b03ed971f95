//! Context-menu rule engine.
//!
//! Each configured rule pairs a label with a command template and optional `require` /
//! `exclude` regex lists. Rules are compiled once per settings snapshot; evaluation against a
//! selection is a pure function of the compiled rules, the selection, and the focused item.

use regex::{Regex, RegexSet};
use serde::Deserialize;
use serde_json::Value;

use crate::app::template::{CommandTemplate, Field, quote_if_needed};
use crate::domain::errors::{ConfigError, EntryRef, TemplateError};
use crate::domain::model::{CurrentItem, ResolvedMenuEntry, Selection};

const SECTION: &str = "context_menu";
const SELECTED: &str = "selected";
const CURRENT_DIRECTORY: &str = "current_directory";

/// A context-menu entry as written in the settings file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RawMenuRule {
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub command: Option<String>,
    #[serde(default)]
    pub require: Vec<String>,
    #[serde(default)]
    pub exclude: Vec<String>,
    #[serde(default)]
    pub show_if_disabled: Option<bool>,
    /// Older settings files spell the flag inverted.
    #[serde(default)]
    pub hide_if_disabled: Option<bool>,
}

/// A compiled list of regex patterns matched with search semantics.
#[derive(Debug, Clone)]
pub struct PatternList {
    set: RegexSet,
}

impl PatternList {
    /// Compile `patterns`, returning `None` for an empty list.
    fn compile(patterns: &[String], entry: &EntryRef) -> Result<Option<Self>, ConfigError> {
        if patterns.is_empty() {
            return Ok(None);
        }
        for pattern in patterns {
            Regex::new(pattern).map_err(|source| ConfigError::InvalidPattern {
                entry: entry.clone(),
                pattern: pattern.clone(),
                source,
            })?;
        }
        let set = RegexSet::new(patterns).map_err(|source| ConfigError::InvalidPattern {
            entry: entry.clone(),
            pattern: patterns.join(" | "),
            source,
        })?;
        Ok(Some(Self { set }))
    }

    /// Whether any pattern matches somewhere in `path`.
    pub fn is_match(&self, path: &str) -> bool {
        self.set.is_match(path)
    }

    pub fn patterns(&self) -> &[String] {
        self.set.patterns()
    }
}

/// A validated, immutable context-menu rule.
#[derive(Debug, Clone)]
pub struct MenuRule {
    label: String,
    template: CommandTemplate,
    require: Option<PatternList>,
    exclude: Option<PatternList>,
    show_if_disabled: bool,
    arity: Option<usize>,
    needs_selected: bool,
    needs_current_directory: bool,
}

impl MenuRule {
    /// Validate a raw rule. `entry` identifies the rule in any returned diagnostic.
    pub fn compile(raw: RawMenuRule, entry: EntryRef) -> Result<Self, ConfigError> {
        let label = raw.label.ok_or_else(|| ConfigError::MissingField {
            entry: entry.clone(),
            field: "label",
        })?;
        let entry = entry.with_label(label.clone());
        let command = raw.command.ok_or_else(|| ConfigError::MissingField {
            entry: entry.clone(),
            field: "command",
        })?;

        let template =
            CommandTemplate::parse(&command).map_err(|source| ConfigError::InvalidTemplate {
                entry: entry.clone(),
                source,
            })?;
        if let Some(field) = template.fields().find(|field| !is_menu_field(field)) {
            return Err(ConfigError::UnsupportedPlaceholder {
                entry,
                placeholder: field.to_string(),
            });
        }

        let require = PatternList::compile(&raw.require, &entry)?;
        let exclude = PatternList::compile(&raw.exclude, &entry)?;
        let show_if_disabled = raw
            .show_if_disabled
            .or(raw.hide_if_disabled.map(|hide| !hide))
            .unwrap_or(false);

        let arity = match template.max_index() {
            Some(index) => Some(index.checked_add(1).ok_or_else(|| {
                ConfigError::InvalidTemplate {
                    entry: entry.clone(),
                    source: TemplateError::IndexOutOfRange(index),
                }
            })?),
            None => None,
        };

        Ok(Self {
            label,
            arity,
            needs_selected: template.uses(SELECTED),
            needs_current_directory: template.uses(CURRENT_DIRECTORY),
            template,
            require,
            exclude,
            show_if_disabled,
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn template(&self) -> &CommandTemplate {
        &self.template
    }

    pub fn show_if_disabled(&self) -> bool {
        self.show_if_disabled
    }

    /// Evaluate the rule for one selection and focus state.
    pub fn resolve(
        &self,
        selection: &Selection,
        current: Option<&CurrentItem>,
    ) -> ResolvedMenuEntry {
        let current_directory = current
            .and_then(CurrentItem::current_directory)
            .map(|dir| dir.to_string_lossy().into_owned());

        let enabled = self.requirements_met(selection)
            && !self.excluded(selection)
            && self.arity.is_none_or(|arity| selection.len() == arity)
            && (!self.needs_selected || !selection.is_empty())
            && (!self.needs_current_directory || current_directory.is_some());

        let command = if enabled {
            self.render(selection, current_directory.as_deref())
        } else {
            None
        };
        let enabled = command.is_some();

        ResolvedMenuEntry {
            label: self.label.clone(),
            enabled,
            visible: enabled || self.show_if_disabled,
            command,
        }
    }

    fn requirements_met(&self, selection: &Selection) -> bool {
        match &self.require {
            None => true,
            Some(require) => {
                !selection.is_empty() && selection.iter().all(|path| require.is_match(path))
            }
        }
    }

    fn excluded(&self, selection: &Selection) -> bool {
        self.exclude
            .as_ref()
            .is_some_and(|exclude| selection.iter().any(|path| exclude.is_match(path)))
    }

    fn render(&self, selection: &Selection, current_directory: Option<&str>) -> Option<String> {
        let rendered = self.template.render(|field| match field {
            Field::Index(index) => selection
                .get(*index)
                .map(|path| quote_if_needed(path).into_owned()),
            Field::Named(name) if name == SELECTED => Some(
                selection
                    .iter()
                    .map(quote_if_needed)
                    .collect::<Vec<_>>()
                    .join(" "),
            ),
            Field::Named(name) if name == CURRENT_DIRECTORY => {
                current_directory.map(|dir| quote_if_needed(dir).into_owned())
            }
            Field::Named(_) => None,
        });

        match rendered {
            Ok(command) => Some(command),
            Err(err) => {
                tracing::debug!(label = %self.label, error = %err, "menu command not rendered");
                None
            }
        }
    }
}

fn is_menu_field(field: &Field) -> bool {
    match field {
        Field::Index(_) => true,
        Field::Named(name) => name == SELECTED || name == CURRENT_DIRECTORY,
    }
}

/// Evaluate `rules` in order. Always returns exactly one entry per rule.
pub fn evaluate(
    rules: &[MenuRule],
    selection: &Selection,
    current: Option<&CurrentItem>,
) -> Vec<ResolvedMenuEntry> {
    rules
        .iter()
        .map(|rule| rule.resolve(selection, current))
        .collect()
}

/// The ordered, compiled context menu of one settings snapshot.
#[derive(Debug, Clone, Default)]
pub struct ContextMenu {
    rules: Vec<MenuRule>,
}

impl ContextMenu {
    pub fn from_rules(rules: Vec<MenuRule>) -> Self {
        Self { rules }
    }

    /// Compile the `context_menu` settings list. Malformed entries are skipped and reported.
    pub fn compile(entries: &[Value]) -> (Self, Vec<ConfigError>) {
        let mut rules = Vec::with_capacity(entries.len());
        let mut diagnostics = Vec::new();

        for (index, value) in entries.iter().enumerate() {
            let mut entry = EntryRef::new(SECTION, index);
            if let Some(label) = value.get("label").and_then(Value::as_str) {
                entry = entry.with_label(label);
            }

            let compiled = serde_json::from_value::<RawMenuRule>(value.clone())
                .map_err(|source| ConfigError::InvalidEntry {
                    entry: entry.clone(),
                    source,
                })
                .and_then(|raw| MenuRule::compile(raw, EntryRef::new(SECTION, index)));

            match compiled {
                Ok(rule) => rules.push(rule),
                Err(err) => diagnostics.push(err),
            }
        }

        (Self { rules }, diagnostics)
    }

    pub fn rules(&self) -> &[MenuRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Resolve every rule against the selection and focus state.
    pub fn evaluate(
        &self,
        selection: &Selection,
        current: Option<&CurrentItem>,
    ) -> Vec<ResolvedMenuEntry> {
        tracing::debug!(
            rules = self.rules.len(),
            selected = selection.len(),
            focused = current.is_some(),
            "evaluating context menu"
        );
        evaluate(&self.rules, selection, current)
    }

    /// Resolve the first rule labelled `label`, if one exists.
    pub fn resolve_label(
        &self,
        label: &str,
        selection: &Selection,
        current: Option<&CurrentItem>,
    ) -> Option<ResolvedMenuEntry> {
        self.rules
            .iter()
            .find(|rule| rule.label == label)
            .map(|rule| rule.resolve(selection, current))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    fn rule(label: &str, command: &str) -> RawMenuRule {
        RawMenuRule {
            label: Some(label.into()),
            command: Some(command.into()),
            ..Default::default()
        }
    }

    fn compile(raw: RawMenuRule) -> MenuRule {
        MenuRule::compile(raw, EntryRef::new(SECTION, 0)).expect("rule compiles")
    }

    fn selection(paths: &[&str]) -> Selection {
        Selection::new(paths.iter().copied())
    }

    #[test]
    fn unconstrained_rule_is_always_enabled() {
        let menu_rule = compile(rule("Refresh", "refresh-all"));
        let cases: [&[&str]; 3] = [&[], &["/a"], &["/a", "/b c"]];
        for paths in cases {
            for current in [None, Some(CurrentItem::file("/a/b.txt"))] {
                let entry = menu_rule.resolve(&selection(paths), current.as_ref());
                assert!(entry.enabled);
                assert!(entry.visible);
                assert_eq!(entry.command.as_deref(), Some("refresh-all"));
            }
        }
    }

    #[test]
    fn require_needs_every_selected_path_to_match() {
        let menu_rule = compile(RawMenuRule {
            require: vec![r".*\.py".into()],
            ..rule("Run Python", "python {selected}")
        });

        assert!(menu_rule.resolve(&selection(&["a.py"]), None).enabled);
        assert!(!menu_rule.resolve(&selection(&["a.py", "b.txt"]), None).enabled);
        assert!(!menu_rule.resolve(&selection(&[]), None).enabled);
    }

    #[test]
    fn require_uses_search_semantics() {
        let menu_rule = compile(RawMenuRule {
            require: vec![r"\.py".into()],
            ..rule("Lint", "lint")
        });
        assert!(menu_rule.resolve(&selection(&["/src/tool.py"]), None).enabled);
    }

    #[test]
    fn require_with_empty_selection_disables_even_without_placeholders() {
        let menu_rule = compile(RawMenuRule {
            require: vec![".*".into()],
            ..rule("Anything", "true")
        });
        assert!(!menu_rule.resolve(&selection(&[]), None).enabled);
    }

    #[test]
    fn exclude_overrides_require() {
        let menu_rule = compile(RawMenuRule {
            require: vec![r".*\.py".into()],
            exclude: vec![r".*/setup\.py".into()],
            ..rule("Run", "python {0}")
        });

        let excluded = menu_rule.resolve(&selection(&["/project/setup.py"]), None);
        assert!(!excluded.enabled);
        assert_eq!(excluded.command, None);

        let allowed = menu_rule.resolve(&selection(&["run.py"]), None);
        assert!(allowed.enabled);
        assert_eq!(allowed.command.as_deref(), Some("python run.py"));
    }

    #[test]
    fn empty_exclude_never_disables() {
        let menu_rule = compile(rule("Touch", "touch {selected}"));
        assert!(menu_rule.resolve(&selection(&["/x"]), None).enabled);
    }

    #[test]
    fn positional_placeholders_need_exact_arity() {
        let menu_rule = compile(rule("Compare", "meld {0} {1}"));

        let two = menu_rule.resolve(&selection(&["/left.txt", "/right.txt"]), None);
        assert!(two.enabled);
        assert_eq!(two.command.as_deref(), Some("meld /left.txt /right.txt"));

        assert!(!menu_rule.resolve(&selection(&["/left.txt"]), None).enabled);
        assert!(
            !menu_rule
                .resolve(&selection(&["/a", "/b", "/c"]), None)
                .enabled
        );
    }

    #[test]
    fn highest_index_sets_arity_even_when_lower_indexes_are_unused() {
        let menu_rule = compile(rule("Second", "echo {2}"));
        assert!(!menu_rule.resolve(&selection(&["/a", "/b"]), None).enabled);
        let entry = menu_rule.resolve(&selection(&["/a", "/b", "/c"]), None);
        assert_eq!(entry.command.as_deref(), Some("echo /c"));
    }

    #[test]
    fn selected_joins_and_quotes_paths() {
        let menu_rule = compile(rule("Edit", "code {selected}"));

        assert!(!menu_rule.resolve(&selection(&[]), None).enabled);

        let entry = menu_rule.resolve(&selection(&["a", "b c"]), None);
        assert!(entry.enabled);
        assert_eq!(entry.command.as_deref(), Some("code a \"b c\""));
    }

    #[test]
    fn current_directory_follows_focused_item() {
        let menu_rule = compile(rule("Shell Here", "cmd /K cd {current_directory}"));

        assert!(!menu_rule.resolve(&selection(&[]), None).enabled);

        let dir = CurrentItem::directory("/home/user/src");
        let entry = menu_rule.resolve(&selection(&[]), Some(&dir));
        assert_eq!(entry.command.as_deref(), Some("cmd /K cd /home/user/src"));

        let file = CurrentItem::file("/home/user/src/main.rs");
        let entry = menu_rule.resolve(&selection(&[]), Some(&file));
        assert_eq!(entry.command.as_deref(), Some("cmd /K cd /home/user/src"));
    }

    #[test]
    fn visibility_tracks_show_if_disabled() {
        let hidden = compile(rule("Hidden", "x {0}"));
        let shown = compile(RawMenuRule {
            show_if_disabled: Some(true),
            ..rule("Shown", "x {0}")
        });

        let empty = selection(&[]);
        let hidden_entry = hidden.resolve(&empty, None);
        assert!(!hidden_entry.enabled && !hidden_entry.visible);
        let shown_entry = shown.resolve(&empty, None);
        assert!(!shown_entry.enabled && shown_entry.visible);

        let one = selection(&["/a"]);
        assert!(hidden.resolve(&one, None).visible);
    }

    #[test]
    fn hide_if_disabled_is_accepted_as_inverse() {
        let raw = RawMenuRule {
            hide_if_disabled: Some(false),
            ..rule("Legacy", "x {0}")
        };
        assert!(compile(raw).show_if_disabled());

        let both = RawMenuRule {
            show_if_disabled: Some(false),
            hide_if_disabled: Some(false),
            ..rule("Both", "x {0}")
        };
        assert!(!compile(both).show_if_disabled());
    }

    #[test]
    fn compile_reports_and_skips_malformed_entries() {
        let entries = vec![
            json!({"label": "Good", "command": "ls"}),
            json!({"command": "ls"}),
            json!({"label": "No command"}),
            json!({"label": "Bad regex", "command": "ls", "require": ["("]}),
            json!({"label": "Bad field", "command": "ls {path}"}),
            json!({"label": "Bad braces", "command": "ls {0"}),
            json!({"label": 7, "command": "ls"}),
            json!({"label": "Also good", "command": "pwd", "show_if_disabled": true}),
        ];

        let (menu, diagnostics) = ContextMenu::compile(&entries);
        let labels: Vec<_> = menu.rules().iter().map(MenuRule::label).collect();
        assert_eq!(labels, vec!["Good", "Also good"]);
        assert_eq!(diagnostics.len(), 6);

        assert!(matches!(
            &diagnostics[0],
            ConfigError::MissingField { field: "label", .. }
        ));
        assert!(matches!(
            &diagnostics[1],
            ConfigError::MissingField { field: "command", entry } if entry.label.as_deref() == Some("No command")
        ));
        assert!(matches!(
            &diagnostics[2],
            ConfigError::InvalidPattern { pattern, .. } if pattern == "("
        ));
        assert!(matches!(
            &diagnostics[3],
            ConfigError::UnsupportedPlaceholder { placeholder, .. } if placeholder == "path"
        ));
        assert!(matches!(&diagnostics[4], ConfigError::InvalidTemplate { .. }));
        assert!(matches!(&diagnostics[5], ConfigError::InvalidEntry { .. }));
        assert_eq!(diagnostics[5].entry().index, 6);
    }

    #[test]
    fn oversized_positional_index_skips_only_that_rule() {
        let entries = vec![
            json!({"label": "Huge", "command": format!("x {{{}}}", usize::MAX)}),
            json!({"label": "Fine", "command": "y {0}"}),
        ];

        let (menu, diagnostics) = ContextMenu::compile(&entries);
        let labels: Vec<_> = menu.rules().iter().map(MenuRule::label).collect();
        assert_eq!(labels, vec!["Fine"]);
        assert_eq!(diagnostics.len(), 1);
        assert!(matches!(
            &diagnostics[0],
            ConfigError::InvalidTemplate {
                source: TemplateError::IndexOutOfRange(index),
                ..
            } if *index == usize::MAX
        ));
        assert_eq!(diagnostics[0].entry().label.as_deref(), Some("Huge"));
    }

    #[test]
    fn evaluation_preserves_order_and_is_idempotent() {
        let entries = vec![
            json!({"label": "One", "command": "one {0}"}),
            json!({"label": "Two", "command": "two"}),
            json!({"label": "Three", "command": "three {selected}", "show_if_disabled": true}),
        ];
        let (menu, diagnostics) = ContextMenu::compile(&entries);
        assert!(diagnostics.is_empty());

        let sel = selection(&["/a", "/b"]);
        let current = CurrentItem::directory("/");
        let first = menu.evaluate(&sel, Some(&current));
        let second = menu.evaluate(&sel, Some(&current));
        assert_eq!(first, second);

        let labels: Vec<_> = first.iter().map(|entry| entry.label.as_str()).collect();
        assert_eq!(labels, vec!["One", "Two", "Three"]);
        assert!(!first[0].enabled);
        assert!(first[1].enabled);
        assert_eq!(first[2].command.as_deref(), Some("three /a /b"));
    }

    #[test]
    fn resolve_label_finds_first_matching_rule() {
        let entries = vec![
            json!({"label": "Open", "command": "first"}),
            json!({"label": "Open", "command": "second"}),
        ];
        let (menu, _) = ContextMenu::compile(&entries);
        let entry = menu
            .resolve_label("Open", &Selection::default(), None)
            .expect("rule exists");
        assert_eq!(entry.command.as_deref(), Some("first"));
        assert!(menu.resolve_label("Missing", &Selection::default(), None).is_none());
    }
}
