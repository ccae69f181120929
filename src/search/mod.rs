//! Search query language for list endpoints.
//!
//! `name:mnist*, tag:"computer vision", resnet` is a list of terms. A term is
//! either bare text (matched fuzzily against every searchable field) or
//! `field:value` (matched against that field only).

pub mod filter;
pub mod grammar;

use std::fmt;

use serde::{Serialize, Serializer};
use thiserror::Error;

pub use filter::{
    FilterExpr, LIKE_ESCAPE, SearchableFields, construct_sql_query_filters,
    construct_sql_search_value,
};
pub use grammar::parse_search_text;

/// One piece of a search value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchToken {
    /// Literal text, already unescaped.
    Literal(String),
    /// `*`: any run of characters.
    AnyChars,
    /// `?`: exactly one character.
    OneChar,
}

impl SearchToken {
    pub fn literal(text: impl Into<String>) -> Self {
        SearchToken::Literal(text.into())
    }

    /// Query-syntax form: wildcards as-is, literal wildcard characters escaped.
    pub fn to_query_text(&self) -> String {
        match self {
            SearchToken::AnyChars => "*".into(),
            SearchToken::OneChar => "?".into(),
            SearchToken::Literal(text) => {
                let mut out = String::with_capacity(text.len());
                for c in text.chars() {
                    if matches!(c, '*' | '?' | '\\') {
                        out.push('\\');
                    }
                    out.push(c);
                }
                out
            }
        }
    }
}

impl Serialize for SearchToken {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_query_text())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchTerm {
    /// `None` searches across every searchable field.
    pub field: Option<String>,
    pub value: Vec<SearchToken>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    /// Position of `remaining` (a suffix of `text`) within `text`, 1-based.
    pub fn locate(text: &str, remaining: &str) -> Self {
        let offset = text.len().saturating_sub(remaining.len());
        let consumed = text.get(..offset).unwrap_or(text);
        let line = consumed.matches('\n').count() + 1;
        let column = consumed.rsplit('\n').next().map_or(0, |l| l.chars().count()) + 1;
        Position { line, column }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("Invalid search '{text}'{}: {message}", .position.map(|p| format!(" at {}", p)).unwrap_or_default())]
pub struct SearchParseError {
    pub text: String,
    pub message: String,
    pub position: Option<Position>,
}

impl SearchParseError {
    pub fn new(text: &str, message: impl Into<String>, position: Option<Position>) -> Self {
        SearchParseError {
            text: text.to_string(),
            message: message.into(),
            position,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_wildcards_are_escaped_in_query_text() {
        assert_eq!(SearchToken::literal("a*b?c\\").to_query_text(), "a\\*b\\?c\\\\");
        assert_eq!(SearchToken::AnyChars.to_query_text(), "*");
    }

    #[test]
    fn position_counts_lines_and_columns() {
        let text = "abc\ndef";
        assert_eq!(Position::locate(text, "ef"), Position { line: 2, column: 2 });
        assert_eq!(Position::locate(text, text), Position { line: 1, column: 1 });
    }
}
