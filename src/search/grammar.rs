//! nom grammar for search text.
//!
//! ```text
//! query   := term ("," term)*
//! term    := field ":" value | bare
//! field   := [A-Za-z_]+
//! value   := word                          (no unescaped whitespace)
//! bare    := word (whitespace word)*
//! word    := segment+
//! segment := '"' ... '"' | "'" ... "'" | "*" | "?" | unquoted
//! ```
//!
//! A backslash escapes the next character anywhere (`\n` is a newline).
//! Unescaped `*` and `?` are wildcards, inside quotes as well.

use nom::{
    IResult,
    branch::alt,
    bytes::complete::take_while1,
    character::complete::{anychar, char, multispace0, multispace1, satisfy},
    combinator::{all_consuming, cut, map, not, value},
    error::{VerboseError, context, convert_error},
    multi::{fold_many0, fold_many1, separated_list1},
    sequence::{delimited, pair, preceded, terminated},
};

use super::{Position, SearchParseError, SearchTerm, SearchToken};

type ParseResult<'a, T> = IResult<&'a str, T, VerboseError<&'a str>>;

/// Parse search text into terms. Blank text yields no terms.
pub fn parse_search_text(text: &str) -> Result<Vec<SearchTerm>, SearchParseError> {
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }

    match all_consuming(query)(text) {
        Ok((_, terms)) => {
            tracing::debug!(search = text, terms = terms.len(), "parsed search text");
            Ok(terms)
        }
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => {
            let position = e
                .errors
                .first()
                .map(|(remaining, _)| Position::locate(text, remaining));
            let message = convert_error(text, e);
            Err(SearchParseError::new(text, message.trim_end(), position))
        }
        Err(nom::Err::Incomplete(_)) => Err(SearchParseError::new(text, "Incomplete input", None)),
    }
}

fn query(input: &str) -> ParseResult<'_, Vec<SearchTerm>> {
    delimited(
        multispace0,
        separated_list1(delimited(multispace0, char(','), multispace0), term),
        multispace0,
    )(input)
}

fn term(input: &str) -> ParseResult<'_, SearchTerm> {
    alt((
        fielded_term,
        map(bare_value, |value| SearchTerm { field: None, value }),
    ))(input)
}

fn fielded_term(input: &str) -> ParseResult<'_, SearchTerm> {
    let (input, field) = terminated(field_name, char(':'))(input)?;
    let (input, value) = preceded(multispace0, cut(context("field value", word)))(input)?;
    let (input, _) = cut(context(
        "quotes around multi-word field value",
        not(pair(multispace1, segment)),
    ))(input)?;

    Ok((
        input,
        SearchTerm {
            field: Some(field.to_string()),
            value,
        },
    ))
}

fn field_name(input: &str) -> ParseResult<'_, &str> {
    take_while1(|c: char| c.is_ascii_alphabetic() || c == '_')(input)
}

/// Adjacent segments joined into one value, e.g. `run_'2024 Q1'*`.
fn word(input: &str) -> ParseResult<'_, Vec<SearchToken>> {
    fold_many1(segment, Vec::new, |mut tokens, more| {
        extend_tokens(&mut tokens, more);
        tokens
    })(input)
}

fn bare_value(input: &str) -> ParseResult<'_, Vec<SearchToken>> {
    let (mut input, mut tokens) = word(input)?;
    loop {
        match pair(multispace1, word)(input) {
            Ok((rest, (space, more))) => {
                append_literal(&mut tokens, space);
                extend_tokens(&mut tokens, more);
                input = rest;
            }
            Err(nom::Err::Error(_)) => return Ok((input, tokens)),
            Err(e) => return Err(e),
        }
    }
}

fn segment(input: &str) -> ParseResult<'_, Vec<SearchToken>> {
    alt((
        quoted('"'),
        quoted('\''),
        map(wildcard, |token| vec![token]),
        map(unquoted_text, |text| vec![SearchToken::Literal(text)]),
    ))(input)
}

fn wildcard(input: &str) -> ParseResult<'_, SearchToken> {
    alt((
        value(SearchToken::AnyChars, char('*')),
        value(SearchToken::OneChar, char('?')),
    ))(input)
}

fn escaped_char(input: &str) -> ParseResult<'_, char> {
    preceded(
        char('\\'),
        cut(context("escaped character", map(anychar, unescape))),
    )(input)
}

fn unescape(c: char) -> char {
    match c {
        'n' => '\n',
        other => other,
    }
}

fn is_unquoted_char(c: char) -> bool {
    !c.is_whitespace() && !matches!(c, ',' | ':' | '\'' | '"' | '\\' | '*' | '?')
}

fn unquoted_text(input: &str) -> ParseResult<'_, String> {
    fold_many1(
        alt((escaped_char, satisfy(is_unquoted_char))),
        String::new,
        |mut text, c| {
            text.push(c);
            text
        },
    )(input)
}

#[derive(Debug, Clone)]
enum QuotedPiece {
    Char(char),
    Wildcard(SearchToken),
}

fn quoted<'a>(quote: char) -> impl FnMut(&'a str) -> ParseResult<'a, Vec<SearchToken>> {
    move |input| {
        delimited(
            char(quote),
            fold_many0(quoted_piece(quote), Vec::new, |mut tokens, piece| {
                match piece {
                    QuotedPiece::Char(c) => append_literal(&mut tokens, c.encode_utf8(&mut [0; 4])),
                    QuotedPiece::Wildcard(token) => tokens.push(token),
                }
                tokens
            }),
            cut(context("closing quote", char(quote))),
        )(input)
    }
}

fn quoted_piece<'a>(quote: char) -> impl FnMut(&'a str) -> ParseResult<'a, QuotedPiece> {
    move |input| {
        alt((
            map(escaped_char, QuotedPiece::Char),
            map(wildcard, QuotedPiece::Wildcard),
            map(satisfy(move |c| c != quote && c != '\\'), QuotedPiece::Char),
        ))(input)
    }
}

fn append_literal(tokens: &mut Vec<SearchToken>, text: &str) {
    match tokens.last_mut() {
        Some(SearchToken::Literal(last)) => last.push_str(text),
        _ => tokens.push(SearchToken::Literal(text.to_string())),
    }
}

fn extend_tokens(tokens: &mut Vec<SearchToken>, more: Vec<SearchToken>) {
    for token in more {
        match token {
            SearchToken::Literal(text) => append_literal(tokens, &text),
            wildcard => tokens.push(wildcard),
        }
    }
}
