//! SPARQL lexer built on winnow
//!
//! Produces the whole token stream up front and fails on the first
//! character that starts no token, reporting its line and column.

use nodex_core::{Error, Result};
use winnow::combinator::{alt, delimited, opt, preceded};
use winnow::error::{ContextError, ErrMode};
use winnow::stream::{Location, Stream};
use winnow::token::{any, take_till, take_while};
use winnow::{LocatingSlice, ModalResult, Parser};

/// Input type for the lexer; tracks the offset for error messages
pub type Input<'a> = LocatingSlice<&'a str>;

/// Kind of token
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    /// `<...>`
    Iri(String),
    /// `prefix:local`
    PrefixedName {
        /// Part before the colon, possibly empty
        prefix: String,
        /// Part after the colon
        local: String,
    },
    /// `prefix:` as written in a PREFIX declaration
    PrefixNs(String),
    /// `?name` or `$name`, without the sigil
    Var(String),
    /// `_:label`
    BlankNode(String),
    /// Quoted string, unescaped
    String(String),
    /// `@lang`
    LangTag(String),
    /// Integer literal
    Integer(String),
    /// Decimal literal
    Decimal(String),
    /// Keyword, uppercased (`SELECT`, `PREFIX`, ...)
    Keyword(String),
    /// `a`
    A,
    /// `true` / `false`
    Boolean(bool),
    /// `^^`
    DoubleCaret,
    /// `*`
    Star,
    /// `{`
    LBrace,
    /// `}`
    RBrace,
    /// `.`
    Dot,
    /// `;`
    Semicolon,
    /// `,`
    Comma,
    /// End of input
    Eof,
}

/// A token and its byte offset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// What was read
    pub kind: TokenKind,
    /// Byte offset of the first character
    pub start: usize,
}

/// Words recognised as keywords, case-insensitively
const KEYWORDS: [&str; 13] = [
    "PREFIX", "BASE", "SELECT", "DISTINCT", "REDUCED", "WHERE", "LIMIT", "OFFSET", "ASK",
    "CONSTRUCT", "DESCRIBE", "FILTER", "OPTIONAL",
];

/// Tokenize a query
///
/// # Errors
/// `Error::Query` naming the line and column of the first character that
/// starts no token.
pub fn tokenize(query: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut input = LocatingSlice::new(query);

    loop {
        skip_ws_and_comments(&mut input);

        let start = input.current_token_start();
        if input.is_empty() {
            tokens.push(Token {
                kind: TokenKind::Eof,
                start,
            });
            break;
        }

        match next_token(&mut input) {
            Ok(kind) => tokens.push(Token { kind, start }),
            Err(_) => {
                let (line, col) = line_col(query, start);
                let bad = input.chars().next().unwrap_or('?');
                return Err(Error::query(format!(
                    "unexpected character '{}' at line {}, column {}",
                    bad, line, col
                )));
            }
        }
    }
    Ok(tokens)
}

/// 1-based line and column of a byte offset
pub fn line_col(text: &str, position: usize) -> (usize, usize) {
    let mut line = 1;
    let mut col = 1;
    for (i, c) in text.char_indices() {
        if i >= position {
            break;
        }
        if c == '\n' {
            line += 1;
            col = 1;
        } else {
            col += 1;
        }
    }
    (line, col)
}

fn backtrack<T>() -> ModalResult<T> {
    Err(ErrMode::Backtrack(ContextError::new()))
}

fn skip_ws_and_comments(input: &mut Input<'_>) {
    loop {
        let _: ModalResult<&str> = take_while(0.., char::is_whitespace).parse_next(input);
        if input.starts_with('#') {
            let _: ModalResult<&str> = take_till(0.., |c| c == '\n' || c == '\r').parse_next(input);
        } else {
            break;
        }
    }
}

fn next_token(input: &mut Input<'_>) -> ModalResult<TokenKind> {
    alt((
        parse_double_caret,
        parse_iri_ref,
        parse_var,
        parse_blank_node,
        parse_lang_tag,
        parse_string,
        parse_number,
        parse_default_prefix,
        parse_word,
        parse_punctuation,
    ))
    .parse_next(input)
}

fn is_name_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '-'
}

fn parse_double_caret(input: &mut Input<'_>) -> ModalResult<TokenKind> {
    "^^".map(|_| TokenKind::DoubleCaret).parse_next(input)
}

fn parse_iri_ref(input: &mut Input<'_>) -> ModalResult<TokenKind> {
    delimited(
        '<',
        take_while(0.., |c: char| !matches!(c, '>' | '<' | '"' | '{' | '}' | '|' | '^' | '`' | '\\') && !c.is_whitespace()),
        '>',
    )
    .map(|s: &str| TokenKind::Iri(s.to_string()))
    .parse_next(input)
}

fn parse_var(input: &mut Input<'_>) -> ModalResult<TokenKind> {
    preceded(
        alt(('?', '$')),
        (take_while(1, |c: char| is_name_start(c) || c.is_ascii_digit()), take_while(0.., is_name_char)).take(),
    )
    .map(|name: &str| TokenKind::Var(name.to_string()))
    .parse_next(input)
}

fn parse_blank_node(input: &mut Input<'_>) -> ModalResult<TokenKind> {
    preceded("_:", take_while(1.., |c: char| is_name_char(c) || c == '.'))
        .verify(|label: &str| !label.ends_with('.'))
        .map(|label: &str| TokenKind::BlankNode(label.to_string()))
        .parse_next(input)
}

fn parse_lang_tag(input: &mut Input<'_>) -> ModalResult<TokenKind> {
    preceded('@', take_while(1.., |c: char| c.is_ascii_alphanumeric() || c == '-'))
        .map(|tag: &str| TokenKind::LangTag(tag.to_lowercase()))
        .parse_next(input)
}

fn parse_string(input: &mut Input<'_>) -> ModalResult<TokenKind> {
    let quote = alt(('"', '\'')).parse_next(input)?;
    let mut value = String::new();
    loop {
        let chunk: &str = take_till(0.., |c| c == quote || c == '\\' || c == '\n').parse_next(input)?;
        value.push_str(chunk);
        let next: char = any.parse_next(input)?;
        if next == quote {
            return Ok(TokenKind::String(value));
        }
        if next != '\\' {
            return backtrack();
        }
        let escaped: char = any.parse_next(input)?;
        value.push(match escaped {
            'n' => '\n',
            'r' => '\r',
            't' => '\t',
            'b' => '\u{8}',
            'f' => '\u{c}',
            '"' | '\'' | '\\' => escaped,
            _ => return backtrack(),
        });
    }
}

fn parse_number(input: &mut Input<'_>) -> ModalResult<TokenKind> {
    let text: &str = (
        opt(alt(('+', '-'))),
        take_while(1.., |c: char| c.is_ascii_digit()),
        opt(('.', take_while(1.., |c: char| c.is_ascii_digit()))),
    )
        .take()
        .parse_next(input)?;
    if text.contains('.') {
        Ok(TokenKind::Decimal(text.to_string()))
    } else {
        Ok(TokenKind::Integer(text.to_string()))
    }
}

fn parse_local(input: &mut Input<'_>) -> ModalResult<String> {
    let mut local = take_while(1.., is_name_char).parse_next(input)?.to_string();
    loop {
        // a dot only continues the name when a name character follows it
        let mut ahead = input.chars();
        if ahead.next() == Some('.') && ahead.next().is_some_and(is_name_char) {
            '.'.parse_next(input)?;
            local.push('.');
            local.push_str(take_while(1.., is_name_char).parse_next(input)?);
        } else {
            return Ok(local);
        }
    }
}

fn parse_default_prefix(input: &mut Input<'_>) -> ModalResult<TokenKind> {
    ':'.parse_next(input)?;
    match opt(parse_local).parse_next(input)? {
        Some(local) => Ok(TokenKind::PrefixedName {
            prefix: String::new(),
            local,
        }),
        None => Ok(TokenKind::PrefixNs(String::new())),
    }
}

fn parse_word(input: &mut Input<'_>) -> ModalResult<TokenKind> {
    let start = input.checkpoint();
    let word: &str = (take_while(1, is_name_start), take_while(0.., is_name_char))
        .take()
        .parse_next(input)?;

    if input.starts_with(':') {
        ':'.parse_next(input)?;
        return match opt(parse_local).parse_next(input)? {
            Some(local) => Ok(TokenKind::PrefixedName {
                prefix: word.to_string(),
                local,
            }),
            None => Ok(TokenKind::PrefixNs(word.to_string())),
        };
    }

    match word {
        "a" => return Ok(TokenKind::A),
        "true" => return Ok(TokenKind::Boolean(true)),
        "false" => return Ok(TokenKind::Boolean(false)),
        _ => {}
    }
    let upper = word.to_ascii_uppercase();
    if KEYWORDS.contains(&upper.as_str()) {
        Ok(TokenKind::Keyword(upper))
    } else {
        input.reset(&start);
        backtrack()
    }
}

fn parse_punctuation(input: &mut Input<'_>) -> ModalResult<TokenKind> {
    alt((
        '*'.value(TokenKind::Star),
        '{'.value(TokenKind::LBrace),
        '}'.value(TokenKind::RBrace),
        '.'.value(TokenKind::Dot),
        ';'.value(TokenKind::Semicolon),
        ','.value(TokenKind::Comma),
    ))
    .parse_next(input)
}
