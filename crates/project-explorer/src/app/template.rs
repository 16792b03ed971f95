//! `{placeholder}` command templates.
//!
//! Templates use the brace syntax of the settings file: `{0}`, `{1}`, ... refer to selected
//! paths by position, named fields such as `{selected}` or `{path}` are bound by the caller,
//! and `{{` / `}}` produce literal braces. Templates are parsed once when settings load so that
//! evaluation only has to walk precomputed segments.

use std::borrow::Cow;
use std::fmt;

use crate::domain::errors::TemplateError;

/// A placeholder inside a template.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Field {
    Index(usize),
    Named(String),
}

impl Field {
    fn parse(name: &str, offset: usize) -> Result<Self, TemplateError> {
        if name.is_empty() {
            return Err(TemplateError::EmptyField(offset));
        }
        if name.contains([':', '!', '[', '.']) {
            return Err(TemplateError::UnsupportedSpec(name.to_owned()));
        }
        if name.bytes().all(|byte| byte.is_ascii_digit()) {
            return name
                .parse()
                .map(Field::Index)
                .map_err(|_| TemplateError::UnsupportedSpec(name.to_owned()));
        }
        Ok(Field::Named(name.to_owned()))
    }

    /// Whether this is the named field `name`.
    pub fn is_named(&self, name: &str) -> bool {
        matches!(self, Field::Named(field) if field == name)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Field::Index(index) => write!(f, "{index}"),
            Field::Named(name) => f.write_str(name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Field(Field),
}

/// A parsed command template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandTemplate {
    source: String,
    segments: Vec<Segment>,
}

impl CommandTemplate {
    /// Parse `source`, rejecting unbalanced braces, empty fields, and format specs.
    pub fn parse(source: &str) -> Result<Self, TemplateError> {
        let bytes = source.as_bytes();
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut pos = 0;
        let mut pending = 0;

        while pos < bytes.len() {
            match bytes[pos] {
                b'{' if bytes.get(pos + 1) == Some(&b'{') => {
                    literal.push_str(&source[pending..pos]);
                    literal.push('{');
                    pos += 2;
                    pending = pos;
                }
                b'{' => {
                    literal.push_str(&source[pending..pos]);
                    let rest = &source[pos + 1..];
                    let end = rest
                        .find(|ch| ch == '{' || ch == '}')
                        .ok_or(TemplateError::UnmatchedOpen(pos))?;
                    if rest.as_bytes()[end] == b'{' {
                        return Err(TemplateError::UnmatchedOpen(pos));
                    }
                    let field = Field::parse(&rest[..end], pos)?;
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(Segment::Field(field));
                    pos += end + 2;
                    pending = pos;
                }
                b'}' if bytes.get(pos + 1) == Some(&b'}') => {
                    literal.push_str(&source[pending..pos]);
                    literal.push('}');
                    pos += 2;
                    pending = pos;
                }
                b'}' => return Err(TemplateError::UnmatchedClose(pos)),
                _ => pos += 1,
            }
        }

        literal.push_str(&source[pending..]);
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Ok(Self {
            source: source.to_owned(),
            segments,
        })
    }

    /// The template text as configured.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Every placeholder in order of appearance, duplicates included.
    pub fn fields(&self) -> impl Iterator<Item = &Field> {
        self.segments.iter().filter_map(|segment| match segment {
            Segment::Field(field) => Some(field),
            Segment::Literal(_) => None,
        })
    }

    /// Highest positional index referenced, if any.
    pub fn max_index(&self) -> Option<usize> {
        self.fields()
            .filter_map(|field| match field {
                Field::Index(index) => Some(*index),
                Field::Named(_) => None,
            })
            .max()
    }

    /// Whether the named placeholder `name` appears.
    pub fn uses(&self, name: &str) -> bool {
        self.fields().any(|field| field.is_named(name))
    }

    /// Substitute every placeholder with the value produced by `lookup`.
    pub fn render<F>(&self, mut lookup: F) -> Result<String, TemplateError>
    where
        F: FnMut(&Field) -> Option<String>,
    {
        let mut out = String::with_capacity(self.source.len());
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Field(field) => {
                    let value =
                        lookup(field).ok_or_else(|| TemplateError::Unbound(field.to_string()))?;
                    out.push_str(&value);
                }
            }
        }
        Ok(out)
    }
}

/// Wrap `value` in double quotes when it contains whitespace.
pub fn quote_if_needed(value: &str) -> Cow<'_, str> {
    if value.chars().any(char::is_whitespace) {
        Cow::Owned(format!("\"{value}\""))
    } else {
        Cow::Borrowed(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scans_positional_and_named_fields() {
        let template = CommandTemplate::parse("diff {1} {0} --cwd {current_directory}").unwrap();
        assert_eq!(template.max_index(), Some(1));
        assert!(template.uses("current_directory"));
        assert!(!template.uses("selected"));
        assert_eq!(template.fields().count(), 3);
    }

    #[test]
    fn plain_text_has_no_fields() {
        let template = CommandTemplate::parse("explorer.exe").unwrap();
        assert_eq!(template.max_index(), None);
        assert_eq!(template.fields().count(), 0);
        assert_eq!(template.render(|_| None).unwrap(), "explorer.exe");
    }

    #[test]
    fn doubled_braces_are_literals() {
        let template = CommandTemplate::parse("awk '{{print $1}}' {0}").unwrap();
        assert_eq!(template.max_index(), Some(0));
        let rendered = template
            .render(|field| (*field == Field::Index(0)).then(|| "log.txt".to_owned()))
            .unwrap();
        assert_eq!(rendered, "awk '{print $1}' log.txt");
    }

    #[test]
    fn rejects_malformed_templates() {
        assert_eq!(
            CommandTemplate::parse("echo {0"),
            Err(TemplateError::UnmatchedOpen(5))
        );
        assert_eq!(
            CommandTemplate::parse("echo 0}"),
            Err(TemplateError::UnmatchedClose(6))
        );
        assert_eq!(
            CommandTemplate::parse("echo {}"),
            Err(TemplateError::EmptyField(5))
        );
        assert_eq!(
            CommandTemplate::parse("echo {0!r}"),
            Err(TemplateError::UnsupportedSpec("0!r".into()))
        );
        assert_eq!(
            CommandTemplate::parse("echo {a{b}"),
            Err(TemplateError::UnmatchedOpen(5))
        );
    }

    #[test]
    fn render_reports_unbound_fields() {
        let template = CommandTemplate::parse("open {path}").unwrap();
        assert_eq!(
            template.render(|_| None),
            Err(TemplateError::Unbound("path".into()))
        );
    }

    #[test]
    fn quotes_only_values_with_whitespace() {
        assert_eq!(quote_if_needed("/tmp/a.txt"), "/tmp/a.txt");
        assert_eq!(quote_if_needed("/tmp/my file"), "\"/tmp/my file\"");
        assert_eq!(quote_if_needed("tab\there"), "\"tab\there\"");
    }
}
