//! Parse `$name` / `$name.field` strings into `Reference`s.

use serde::Serialize;

pub const REFERENCE_SIGIL: char = '$';

/// A reference to a parameter (`$name`) or a step output (`$step.output`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reference {
    pub name: String,
    pub field: Option<String>,
}

impl Reference {
    pub fn new(name: impl Into<String>, field: Option<&str>) -> Self {
        Reference {
            name: name.into(),
            field: field.map(str::to_string),
        }
    }

    /// Returns `None` when `text` is not a reference at all, and an error
    /// message when it starts with `$` but is malformed.
    pub fn parse(text: &str) -> Option<Result<Reference, String>> {
        let inner = text.strip_prefix(REFERENCE_SIGIL)?;
        Some(parse_inner(inner).ok_or_else(|| format!("Malformed reference '{}'", text)))
    }
}

fn parse_inner(inner: &str) -> Option<Reference> {
    let (name, field) = split_ref(inner);
    if !is_ref_part(name) {
        return None;
    }
    match field {
        Some(field) if !is_ref_part(field) => None,
        _ => Some(Reference::new(name, field)),
    }
}

fn split_ref(s: &str) -> (&str, Option<&str>) {
    match s.find('.') {
        Some(pos) => (&s[..pos], Some(&s[pos + 1..])),
        None => (s, None),
    }
}

fn is_ref_part(part: &str) -> bool {
    !part.is_empty() && !part.contains('.') && !part.chars().any(char::is_whitespace)
}

impl std::fmt::Display for Reference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.field {
            Some(field) => write!(f, "{}{}.{}", REFERENCE_SIGIL, self.name, field),
            None => write!(f, "{}{}", REFERENCE_SIGIL, self.name),
        }
    }
}
