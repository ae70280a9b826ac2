//! Generic reader for the DSL's surface syntax.
//!
//! The DSL is a small Lisp-like data notation (symbols, keywords, strings,
//! lists, vectors, maps) — the same shape a Clojure reader would hand back
//! before any spec-specific interpretation happens. [`parser`](super::parser)
//! interprets the resulting [`RawValue`] tree into [`TableSpec`](super::ast::TableSpec).

use nom::{
    branch::alt,
    bytes::complete::take_while1,
    character::complete::{char, multispace0},
    combinator::{cut, map},
    error::{context, ContextError, ParseError},
    multi::many0,
    sequence::delimited,
    IResult, Parser,
};

#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Symbol(String),
    Keyword(String),
    Str(String),
    List(Vec<RawValue>),
    Vector(Vec<RawValue>),
    Map(Vec<(RawValue, RawValue)>),
}

impl RawValue {
    pub fn as_symbol(&self) -> Option<&str> {
        match self {
            RawValue::Symbol(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_keyword(&self) -> Option<&str> {
        match self {
            RawValue::Keyword(k) => Some(k),
            _ => None,
        }
    }

    pub fn as_str_lit(&self) -> Option<&str> {
        match self {
            RawValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[RawValue]> {
        match self {
            RawValue::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_vector(&self) -> Option<&[RawValue]> {
        match self {
            RawValue::Vector(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&[(RawValue, RawValue)]> {
        match self {
            RawValue::Map(entries) => Some(entries),
            _ => None,
        }
    }
}

fn ws<'a, O, E: ParseError<&'a str>, F>(inner: F) -> impl Parser<&'a str, Output = O, Error = E>
where
    F: Parser<&'a str, Output = O, Error = E>,
{
    delimited(multispace0, inner, multispace0)
}

fn is_symbol_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | '/' | '?' | '!' | '*' | '+')
}

fn symbol<'a, E: ParseError<&'a str>>(input: &'a str) -> IResult<&'a str, RawValue, E> {
    map(take_while1(is_symbol_char), |s: &str| {
        RawValue::Symbol(s.to_owned())
    })
    .parse(input)
}

fn keyword<'a, E: ParseError<&'a str>>(input: &'a str) -> IResult<&'a str, RawValue, E> {
    let (input, _) = char(':').parse(input)?;
    map(take_while1(is_symbol_char), |s: &str| {
        RawValue::Keyword(s.to_owned())
    })
    .parse(input)
}

fn string_lit<'a, E: ParseError<&'a str>>(input: &'a str) -> IResult<&'a str, RawValue, E> {
    let (input, _) = char('"').parse(input)?;
    let mut content = String::new();
    let mut chars = input.char_indices();
    loop {
        match chars.next() {
            None => {
                return Err(nom::Err::Error(E::from_error_kind(
                    input,
                    nom::error::ErrorKind::Char,
                )))
            }
            Some((idx, '"')) => {
                let rest = &input[idx + 1..];
                return Ok((rest, RawValue::Str(content)));
            }
            Some((idx, '\\')) => match chars.next() {
                Some((_, next_ch)) => {
                    content.push(match next_ch {
                        'n' => '\n',
                        't' => '\t',
                        other => other,
                    });
                }
                None => {
                    let _ = idx;
                    return Err(nom::Err::Error(E::from_error_kind(
                        input,
                        nom::error::ErrorKind::Char,
                    )));
                }
            },
            Some((_, ch)) => content.push(ch),
        }
    }
}

fn list<'a, E: ParseError<&'a str> + ContextError<&'a str>>(
    input: &'a str,
) -> IResult<&'a str, RawValue, E> {
    map(
        delimited(char('('), many0(ws(value)), cut(char(')'))),
        RawValue::List,
    )
    .parse(input)
}

fn vector<'a, E: ParseError<&'a str> + ContextError<&'a str>>(
    input: &'a str,
) -> IResult<&'a str, RawValue, E> {
    map(
        delimited(char('['), many0(ws(value)), cut(char(']'))),
        RawValue::Vector,
    )
    .parse(input)
}

fn map_literal<'a, E: ParseError<&'a str> + ContextError<&'a str>>(
    input: &'a str,
) -> IResult<&'a str, RawValue, E> {
    let (input, _) = char('{').parse(input)?;
    let (input, _) = multispace0.parse(input)?;
    let mut entries = Vec::new();
    let mut rest = input;
    loop {
        let (after_ws, _) = multispace0::<&str, E>(rest)?;
        if after_ws.starts_with('}') {
            rest = after_ws;
            break;
        }
        let (after_k, k) = value(after_ws)?;
        let (after_ws2, _) = multispace0(after_k)?;
        let (after_v, v) = cut(value).parse(after_ws2)?;
        entries.push((k, v));
        rest = after_v;
    }
    let (rest, _) = cut(char('}')).parse(rest)?;
    Ok((rest, RawValue::Map(entries)))
}

pub fn value<'a, E: ParseError<&'a str> + ContextError<&'a str>>(
    input: &'a str,
) -> IResult<&'a str, RawValue, E> {
    context(
        "value",
        alt((
            list,
            vector,
            map_literal,
            string_lit,
            keyword,
            symbol,
        )),
    )
    .parse(input)
}

/// Parse the whole input as a single top-level form, failing if trailing
/// non-whitespace remains. On failure, returns the byte offset into `input`
/// where parsing gave up, plus a human-readable reason.
pub fn read_one(input: &str) -> Result<RawValue, (usize, String)> {
    let trimmed_result: IResult<&str, RawValue, nom::error::VerboseError<&str>> =
        ws(value).parse(input);
    match trimmed_result {
        Ok((rest, parsed)) if rest.trim().is_empty() => Ok(parsed),
        Ok((rest, _)) => Err((input.len() - rest.len(), "unexpected trailing input".into())),
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => {
            let pos = e
                .errors
                .first()
                .map(|(rest, _)| input.len() - rest.len())
                .unwrap_or(0);
            Err((pos, format!("{e}")))
        }
        Err(nom::Err::Incomplete(_)) => Err((input.len(), "incomplete input".into())),
    }
}
