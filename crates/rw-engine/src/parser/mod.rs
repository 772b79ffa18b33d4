//! Parsing narrator output into actions.
//!
//! The narrator writes calls of the form
//! `do_action("verb", arg, arg, arg, arg)` anywhere in its text. Arguments
//! are strings (single or double quoted), integers, floats, or
//! `null`/`None`. A terminal user may instead type `verb arg ...`.

pub mod lexer;

use std::fmt;
use std::ops::Range;

use crate::error::ParseError;
use lexer::{Token, Tokens};

/// The function name narrator calls use.
pub const CALL_NAME: &str = "do_action";

/// Most positional arguments a verb takes.
pub const MAX_ARGS: usize = 4;

/// A positional action argument.
#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    /// A string.
    Str(String),
    /// An integer.
    Int(i64),
    /// A float.
    Float(f64),
    /// An explicit absence.
    Null,
}

impl Arg {
    /// The argument as a name. Numbers are formatted; empty strings and nulls are absent.
    pub fn text(&self) -> Option<String> {
        match self {
            Arg::Str(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Arg::Int(n) => Some(n.to_string()),
            Arg::Float(x) => Some(x.to_string()),
            _ => None,
        }
    }

    /// The argument as a positive count.
    pub fn count(&self) -> Option<u32> {
        match self {
            Arg::Int(n) => u32::try_from(*n).ok().filter(|n| *n > 0),
            Arg::Str(s) => s.trim().parse::<u32>().ok().filter(|n| *n > 0),
            _ => None,
        }
    }
}

impl fmt::Display for Arg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arg::Str(s) => write!(f, "{s:?}"),
            Arg::Int(n) => write!(f, "{n}"),
            Arg::Float(x) => write!(f, "{x}"),
            Arg::Null => write!(f, "null"),
        }
    }
}

/// A verb with up to four positional arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct Action {
    /// The verb, lowercased.
    pub verb: String,
    /// Positional arguments.
    pub args: Vec<Arg>,
}

impl Action {
    /// A new action. The verb is normalized to lowercase.
    pub fn new(verb: impl Into<String>, args: Vec<Arg>) -> Self {
        Self {
            verb: verb.into().trim().to_lowercase(),
            args,
        }
    }

    /// Shorthand for an action whose arguments are all names.
    pub fn named(verb: impl Into<String>, args: &[&str]) -> Self {
        Self::new(
            verb,
            args.iter().map(|a| Arg::Str((*a).to_string())).collect(),
        )
    }

    /// Argument `i` as a name.
    pub fn text(&self, i: usize) -> Option<String> {
        self.args.get(i).and_then(Arg::text)
    }

    /// Argument `i` as a positive count.
    pub fn count(&self, i: usize) -> Option<u32> {
        self.args.get(i).and_then(Arg::count)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{CALL_NAME}({:?}", self.verb)?;
        for arg in &self.args {
            write!(f, ", {arg}")?;
        }
        write!(f, ")")
    }
}

/// Extract every `do_action(...)` call from free text.
///
/// Malformed calls are reported and skipped; the rest still parse.
pub fn parse_actions(text: &str) -> (Vec<Action>, Vec<ParseError>) {
    let mut actions = Vec::new();
    let mut errors = Vec::new();
    let mut resume = 0;
    for (start, _) in text.match_indices(CALL_NAME) {
        if start < resume || !is_call_name(text, start) {
            continue;
        }
        let mut tokens = Tokens::new(text, start);
        match parse_call(&mut tokens) {
            Ok(action) => actions.push(action),
            Err(e) => errors.push(e),
        }
        resume = tokens.offset();
    }
    (actions, errors)
}

/// Parse one line a user typed: either a `do_action(...)` call or `verb arg ...`.
pub fn parse_command_line(line: &str) -> Result<Action, ParseError> {
    let trimmed_start = line.len() - line.trim_start().len();
    if line.trim().is_empty() {
        return Err(ParseError::new(0..line.len(), "empty command"));
    }
    if line.trim_start().starts_with(CALL_NAME) {
        let mut tokens = Tokens::new(line, trimmed_start);
        let action = parse_call(&mut tokens)?;
        if let Some(extra) = tokens.next() {
            let span = match extra {
                Ok((_, span)) => span,
                Err(e) => e.span,
            };
            return Err(ParseError::new(span, "unexpected input after the call"));
        }
        return Ok(action);
    }

    let mut tokens = Tokens::new(line, trimmed_start);
    let (verb, verb_span) = match tokens.next() {
        Some(Ok((Token::Word(w) | Token::Str(w), span))) => (w, span),
        Some(Ok((other, span))) => {
            return Err(ParseError::new(span, format!("expected a verb, found {other}")));
        }
        Some(Err(e)) => return Err(e),
        None => return Err(ParseError::new(0..line.len(), "empty command")),
    };
    let mut args = Vec::new();
    for next in tokens {
        let (token, span) = next?;
        let arg = match token {
            Token::Word(w) | Token::Str(w) => Arg::Str(w),
            Token::Int(n) => Arg::Int(n),
            Token::Float(x) => Arg::Float(x),
            Token::Null => Arg::Null,
            other => {
                return Err(ParseError::new(span, format!("unexpected {other}")));
            }
        };
        args.push(arg);
    }
    check_arity(&args, verb_span.start..line.len())?;
    Ok(Action::new(verb, args))
}

fn is_call_name(text: &str, start: usize) -> bool {
    let ident = |c: char| c.is_alphanumeric() || c == '_';
    let before = text[..start].chars().next_back();
    let after = text[start + CALL_NAME.len()..].chars().next();
    !before.is_some_and(ident) && !after.is_some_and(ident)
}

fn check_arity(args: &[Arg], span: Range<usize>) -> Result<(), ParseError> {
    if args.len() > MAX_ARGS {
        return Err(ParseError::new(
            span,
            format!("at most {MAX_ARGS} arguments may follow the verb"),
        ));
    }
    Ok(())
}

fn expect(
    tokens: &mut Tokens<'_>,
    want: &Token,
    context: &str,
) -> Result<Range<usize>, ParseError> {
    let at = tokens.offset();
    match tokens.next() {
        Some(Ok((token, span))) if &token == want => Ok(span),
        Some(Ok((token, span))) => Err(ParseError::new(
            span,
            format!("expected {want}{context}, found {token}"),
        )),
        Some(Err(e)) => Err(e),
        None => Err(ParseError::new(
            at..at,
            format!("expected {want}{context}, found end of input"),
        )),
    }
}

fn parse_call(tokens: &mut Tokens<'_>) -> Result<Action, ParseError> {
    let name = expect(tokens, &Token::Word(CALL_NAME.to_string()), "")?;
    expect(tokens, &Token::LParen, " after do_action")?;

    let verb = match tokens.next() {
        Some(Ok((Token::Str(s) | Token::Word(s), _))) => s,
        Some(Ok((token, span))) => {
            return Err(ParseError::new(
                span,
                format!("the first argument must be the verb, found {token}"),
            ));
        }
        Some(Err(e)) => return Err(e),
        None => {
            let at = tokens.offset();
            return Err(ParseError::new(at..at, "unterminated do_action call"));
        }
    };

    let mut args = Vec::new();
    loop {
        let at = tokens.offset();
        match tokens.next() {
            Some(Ok((Token::RParen, span))) => {
                check_arity(&args, name.start..span.end)?;
                return Ok(Action::new(verb, args));
            }
            Some(Ok((Token::Comma, _))) => {}
            Some(Ok((token, span))) => {
                return Err(ParseError::new(
                    span,
                    format!("expected ',' or ')', found {token}"),
                ));
            }
            Some(Err(e)) => return Err(e),
            None => return Err(ParseError::new(at..at, "unterminated do_action call")),
        }

        let at = tokens.offset();
        let arg = match tokens.next() {
            Some(Ok((Token::Str(s), _))) => Arg::Str(s),
            Some(Ok((Token::Int(n), _))) => Arg::Int(n),
            Some(Ok((Token::Float(x), _))) => Arg::Float(x),
            Some(Ok((Token::Null, _))) => Arg::Null,
            // A trailing comma before the closing parenthesis.
            Some(Ok((Token::RParen, span))) => {
                check_arity(&args, name.start..span.end)?;
                return Ok(Action::new(verb, args));
            }
            Some(Ok((token, span))) => {
                return Err(ParseError::new(
                    span,
                    format!("expected a string, number or null, found {token}"),
                ));
            }
            Some(Err(e)) => return Err(e),
            None => return Err(ParseError::new(at..at, "unterminated do_action call")),
        };
        args.push(arg);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_calls_from_prose() {
        let text = r#"The goblin snarls. do_action("attack", "Alice", "Goblin")
Then Bob grabs the rope: do_action('pickup', 'Bob', 'Rope', 2)."#;
        let (actions, errors) = parse_actions(text);
        assert!(errors.is_empty(), "errors: {errors:?}");
        assert_eq!(actions.len(), 2);
        assert_eq!(actions[0], Action::named("attack", &["Alice", "Goblin"]));
        assert_eq!(actions[1].verb, "pickup");
        assert_eq!(actions[1].count(2), Some(2));
    }

    #[test]
    fn null_and_none_are_absent() {
        let (actions, _) = parse_actions(r#"do_action("pickup", "Alice", "Torch", null, None)"#);
        assert_eq!(actions[0].text(2), None);
        assert_eq!(actions[0].text(3), None);
        insta::assert_snapshot!(actions[0].to_string(), @r#"do_action("pickup", "Alice", "Torch", null, null)"#);
    }

    #[test]
    fn malformed_calls_are_skipped() {
        let text = r#"do_action("look" "Alice") and do_action("help")"#;
        let (actions, errors) = parse_actions(text);
        assert_eq!(actions, vec![Action::named("help", &[])]);
        assert_eq!(errors.len(), 1);
        assert_eq!(&text[errors[0].span.clone()], r#""Alice""#);
    }

    #[test]
    fn too_many_arguments() {
        let (actions, errors) = parse_actions(r#"do_action("give", "a", "b", "c", 1, 2)"#);
        assert!(actions.is_empty());
        assert!(errors[0].message.contains("at most 4"));
    }

    #[test]
    fn identifiers_containing_the_name_are_ignored() {
        let (actions, errors) = parse_actions("my_do_action(1) is not a call");
        assert!(actions.is_empty());
        assert!(errors.is_empty());
    }

    #[test]
    fn command_line_forms() {
        let bare = parse_command_line(r#"  Pickup Alice "Healing Potion" 2"#).unwrap();
        assert_eq!(bare.verb, "pickup");
        assert_eq!(bare.text(1).as_deref(), Some("Healing Potion"));
        assert_eq!(bare.count(2), Some(2));

        let call = parse_command_line(r#"do_action("complete-task", "Free the miller")"#).unwrap();
        assert_eq!(call, Action::named("complete-task", &["Free the miller"]));

        assert!(parse_command_line("   ").is_err());
        assert!(parse_command_line(r#"do_action("look") extra"#).is_err());
    }

    #[test]
    fn counts_reject_zero_and_negatives() {
        assert_eq!(Arg::Int(0).count(), None);
        assert_eq!(Arg::Int(-3).count(), None);
        assert_eq!(Arg::Str("7".to_string()).count(), Some(7));
    }
}
