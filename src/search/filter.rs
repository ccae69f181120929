//! Translation of parsed search terms into store-agnostic `LIKE` filters.

use serde::Serialize;

use super::{SearchParseError, SearchToken, parse_search_text};

/// Escape character emitted in `LIKE` patterns.
pub const LIKE_ESCAPE: char = '/';

/// A filter predicate. Binding it to a query engine is the caller's job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum FilterExpr {
    Like {
        column: String,
        pattern: String,
        escape: char,
    },
    And {
        filters: Vec<FilterExpr>,
    },
    Or {
        filters: Vec<FilterExpr>,
    },
}

impl FilterExpr {
    pub fn like(column: impl Into<String>, pattern: impl Into<String>) -> Self {
        FilterExpr::Like {
            column: column.into(),
            pattern: pattern.into(),
            escape: LIKE_ESCAPE,
        }
    }

    /// Evaluate the filter against a row; `column_value` looks up a column.
    /// A missing column never matches.
    pub fn matches<F>(&self, column_value: &F) -> bool
    where
        F: Fn(&str) -> Option<String>,
    {
        match self {
            FilterExpr::Like {
                column,
                pattern,
                escape,
            } => column_value(column).is_some_and(|value| like_matches(pattern, *escape, &value)),
            FilterExpr::And { filters } => filters.iter().all(|f| f.matches(column_value)),
            FilterExpr::Or { filters } => filters.iter().any(|f| f.matches(column_value)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LikeItem {
    Char(char),
    Any,
    One,
}

fn compile_like(pattern: &str, escape: char) -> Vec<LikeItem> {
    let mut items = Vec::new();
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        let item = match c {
            c if c == escape => LikeItem::Char(chars.next().unwrap_or(escape)),
            '%' => LikeItem::Any,
            '_' => LikeItem::One,
            c => LikeItem::Char(c),
        };
        items.push(item);
    }
    items
}

/// SQL `LIKE` semantics (case-sensitive).
fn like_matches(pattern: &str, escape: char, value: &str) -> bool {
    let items = compile_like(pattern, escape);
    let text: Vec<char> = value.chars().collect();

    // matched[j]: the first i items can match the first j characters.
    let mut matched = vec![false; text.len() + 1];
    matched[0] = true;
    for item in items {
        let mut next = vec![false; text.len() + 1];
        for j in 0..=text.len() {
            next[j] = match item {
                LikeItem::Any => matched[j] || (j > 0 && next[j - 1]),
                LikeItem::One => j > 0 && matched[j - 1],
                LikeItem::Char(c) => j > 0 && matched[j - 1] && text[j - 1] == c,
            };
        }
        matched = next;
    }
    matched[text.len()]
}

type FieldFilter = Box<dyn Fn(String) -> FilterExpr + Send + Sync>;

/// Fields a search may name, each with the filter built from a `LIKE` value.
#[derive(Default)]
pub struct SearchableFields {
    fields: Vec<(String, FieldFilter)>,
}

impl SearchableFields {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field<F>(mut self, name: impl Into<String>, filter: F) -> Self
    where
        F: Fn(String) -> FilterExpr + Send + Sync + 'static,
    {
        self.fields.push((name.into(), Box::new(filter)));
        self
    }

    /// A field matched with `LIKE` against a column.
    pub fn like_column(self, name: impl Into<String>, column: impl Into<String>) -> Self {
        let column = column.into();
        self.field(name, move |pattern| FilterExpr::like(column.clone(), pattern))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    fn get(&self, name: &str) -> Option<&FieldFilter> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, f)| f)
    }
}

impl std::fmt::Debug for SearchableFields {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

/// Render search tokens as a `LIKE` value.
///
/// Literal `/`, `%` and `_` are escaped with [`LIKE_ESCAPE`]; `*` and `?`
/// become `%` and `_`. A fuzzy value is wrapped in `%...%`.
pub fn construct_sql_search_value(tokens: &[SearchToken], fuzzy: bool) -> String {
    let mut value = String::new();
    if fuzzy {
        value.push('%');
    }
    for token in tokens {
        match token {
            SearchToken::AnyChars => value.push('%'),
            SearchToken::OneChar => value.push('_'),
            SearchToken::Literal(text) => {
                for c in text.chars() {
                    if matches!(c, '/' | '%' | '_') {
                        value.push(LIKE_ESCAPE);
                    }
                    value.push(c);
                }
            }
        }
    }
    if fuzzy {
        value.push('%');
    }
    value
}

/// Build the filter for a search string.
///
/// Terms are ANDed. A bare term ORs a fuzzy match over every searchable
/// field; a fielded term matches that field only.
pub fn construct_sql_query_filters(
    search: &str,
    searchable_fields: &SearchableFields,
) -> Result<FilterExpr, SearchParseError> {
    let terms = parse_search_text(search)?;

    let mut filters = Vec::with_capacity(terms.len());
    for term in terms {
        match term.field.as_deref() {
            None => {
                let value = construct_sql_search_value(&term.value, true);
                filters.push(FilterExpr::Or {
                    filters: searchable_fields
                        .fields
                        .iter()
                        .map(|(_, filter)| filter(value.clone()))
                        .collect(),
                });
            }
            Some(field) => {
                let filter = searchable_fields.get(field).ok_or_else(|| {
                    SearchParseError::new(
                        search,
                        format!("Unknown search field '{}'", field),
                        None,
                    )
                })?;
                filters.push(filter(construct_sql_search_value(&term.value, false)));
            }
        }
    }

    Ok(FilterExpr::And { filters })
}
