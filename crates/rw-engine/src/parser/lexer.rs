//! Tokens of the action syntax.

use std::fmt;
use std::ops::Range;

use logos::Logos;

use crate::error::ParseError;

/// A token of `do_action(...)` calls and bare command lines.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// `(`
    LParen,
    /// `)`
    RParen,
    /// `,`
    Comma,
    /// A quoted string, escapes processed.
    Str(String),
    /// An integer literal.
    Int(i64),
    /// A floating-point literal.
    Float(f64),
    /// `null` or `None`.
    Null,
    /// A bare word.
    Word(String),
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
            Token::Comma => write!(f, ","),
            Token::Str(s) => write!(f, "{s:?}"),
            Token::Int(n) => write!(f, "{n}"),
            Token::Float(x) => write!(f, "{x}"),
            Token::Null => write!(f, "null"),
            Token::Word(w) => write!(f, "{w}"),
        }
    }
}

#[derive(Logos, Debug)]
#[logos(skip r"[ \t\r\n]+")]
enum RawToken {
    #[token("(")]
    LParen,

    #[token(")")]
    RParen,

    #[token(",")]
    Comma,

    #[regex(r#""([^"\\]|\\.)*""#)]
    DoubleStr,

    #[regex(r#"'([^'\\]|\\.)*'"#)]
    SingleStr,

    #[regex(r"-?[0-9]+\.[0-9]+")]
    Float,

    #[regex(r"-?[0-9]+")]
    Integer,

    #[regex(r"[A-Za-z_][A-Za-z0-9_-]*")]
    Word,
}

/// A lazy token stream over `source[offset..]`. Spans are absolute.
pub struct Tokens<'s> {
    inner: logos::Lexer<'s, RawToken>,
    offset: usize,
}

impl<'s> Tokens<'s> {
    /// Start lexing `source` at byte `offset`.
    pub fn new(source: &'s str, offset: usize) -> Self {
        Self {
            inner: RawToken::lexer(source.get(offset..).unwrap_or("")),
            offset,
        }
    }

    /// Absolute position of the next unread byte.
    pub fn offset(&self) -> usize {
        self.offset + self.inner.span().end
    }
}

impl Iterator for Tokens<'_> {
    type Item = Result<(Token, Range<usize>), ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        let raw = self.inner.next()?;
        let local = self.inner.span();
        let span = local.start + self.offset..local.end + self.offset;
        let slice = self.inner.slice();
        let token = match raw {
            Ok(RawToken::LParen) => Token::LParen,
            Ok(RawToken::RParen) => Token::RParen,
            Ok(RawToken::Comma) => Token::Comma,
            Ok(RawToken::DoubleStr | RawToken::SingleStr) => {
                Token::Str(unescape(&slice[1..slice.len() - 1]))
            }
            Ok(RawToken::Float) => match slice.parse::<f64>() {
                Ok(x) => Token::Float(x),
                Err(_) => {
                    return Some(Err(ParseError::new(
                        span,
                        format!("invalid number: {slice}"),
                    )));
                }
            },
            Ok(RawToken::Integer) => match slice.parse::<i64>() {
                Ok(n) => Token::Int(n),
                Err(_) => {
                    return Some(Err(ParseError::new(
                        span,
                        format!("integer out of range: {slice}"),
                    )));
                }
            },
            Ok(RawToken::Word) => match slice {
                "null" | "None" => Token::Null,
                word => Token::Word(word.to_string()),
            },
            Err(()) => {
                return Some(Err(ParseError::new(
                    span,
                    format!("unexpected character: {slice:?}"),
                )));
            }
        };
        Some(Ok((token, span)))
    }
}

/// Process `\\`, `\n`, `\t`, `\"` and `\'`. Unknown sequences are kept as-is.
fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('\\') => out.push('\\'),
            Some('"') => out.push('"'),
            Some('\'') => out.push('\''),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}
