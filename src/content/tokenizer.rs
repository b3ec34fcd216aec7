//! Content-stream tokenizer.
//!
//! Content streams use a postfix notation where operands come before the
//! operator: `10 10 20 20 re f` pushes four numbers, then paints. This
//! tokenizer turns decoded content bytes into a flat [`ContentToken`]
//! sequence; it does not interpret operators, that is the locator's job.
//!
//! Inline-image payloads (`BI ... EI`) are skipped wholesale since nothing
//! downstream consumes them.

use crate::content::tokens::ContentToken;
use crate::error::{Error, Result};
use crate::object::Object;
use nom::bytes::complete::{tag, take_while, take_while1};
use nom::IResult;
use std::collections::HashMap;

fn is_pdf_whitespace(b: u8) -> bool {
    matches!(b, 0x00 | 0x09 | 0x0A | 0x0C | 0x0D | 0x20)
}

fn is_delimiter(b: u8) -> bool {
    matches!(b, b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' | b'/' | b'%')
}

fn is_regular(b: u8) -> bool {
    !is_pdf_whitespace(b) && !is_delimiter(b)
}

/// Skip whitespace and `%` comments.
fn skip_ws(mut input: &[u8]) -> &[u8] {
    loop {
        let before = input.len();
        while let Some((&b, rest)) = input.split_first() {
            if is_pdf_whitespace(b) {
                input = rest;
            } else {
                break;
            }
        }
        if input.first() == Some(&b'%') {
            while let Some((&b, rest)) = input.split_first() {
                input = rest;
                if b == b'\n' || b == b'\r' {
                    break;
                }
            }
        }
        if input.len() == before {
            return input;
        }
    }
}

fn nom_error(input: &[u8]) -> nom::Err<nom::error::Error<&[u8]>> {
    nom::Err::Error(nom::error::Error::new(input, nom::error::ErrorKind::Fail))
}

fn number(input: &[u8]) -> IResult<&[u8], Object> {
    let (rest, tok) =
        take_while1(|b: u8| b.is_ascii_digit() || matches!(b, b'+' | b'-' | b'.'))(input)?;
    let s = std::str::from_utf8(tok).map_err(|_| nom_error(input))?;
    if let Ok(i) = s.parse::<i64>() {
        return Ok((rest, Object::Integer(i)));
    }
    match s.parse::<f64>() {
        Ok(r) => Ok((rest, Object::Real(r))),
        Err(_) => Err(nom_error(input)),
    }
}

fn decode_name(raw: &[u8]) -> String {
    let mut out = Vec::with_capacity(raw.len());
    let mut i = 0;
    while i < raw.len() {
        if raw[i] == b'#' && i + 2 < raw.len() {
            let hex = std::str::from_utf8(&raw[i + 1..i + 3]).ok();
            match hex.and_then(|h| u8::from_str_radix(h, 16).ok()) {
                Some(b) => {
                    out.push(b);
                    i += 3;
                    continue;
                },
                None => {},
            }
        }
        out.push(raw[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn name(input: &[u8]) -> IResult<&[u8], Object> {
    let (input, _) = tag(b"/" as &[u8])(input)?;
    let (rest, raw) = take_while(is_regular)(input)?;
    Ok((rest, Object::Name(decode_name(raw))))
}

fn literal_string(input: &[u8]) -> IResult<&[u8], Object> {
    let (body, _) = tag(b"(" as &[u8])(input)?;
    let mut out = Vec::new();
    let mut depth = 1usize;
    let mut i = 0;
    while i < body.len() {
        match body[i] {
            b'\\' if i + 1 < body.len() => {
                let c = body[i + 1];
                i += 2;
                match c {
                    b'n' => out.push(b'\n'),
                    b'r' => out.push(b'\r'),
                    b't' => out.push(b'\t'),
                    b'b' => out.push(0x08),
                    b'f' => out.push(0x0C),
                    b'(' | b')' | b'\\' => out.push(c),
                    b'0'..=b'7' => {
                        let mut val = (c - b'0') as u32;
                        let mut n = 1;
                        while n < 3 && i < body.len() && (b'0'..=b'7').contains(&body[i]) {
                            val = val * 8 + (body[i] - b'0') as u32;
                            i += 1;
                            n += 1;
                        }
                        out.push(val as u8);
                    },
                    b'\r' => {
                        // line continuation, swallow an optional LF
                        if body.get(i) == Some(&b'\n') {
                            i += 1;
                        }
                    },
                    b'\n' => {},
                    other => out.push(other),
                }
            },
            b'(' => {
                depth += 1;
                out.push(b'(');
                i += 1;
            },
            b')' => {
                depth -= 1;
                if depth == 0 {
                    return Ok((&body[i + 1..], Object::String(out)));
                }
                out.push(b')');
                i += 1;
            },
            b => {
                out.push(b);
                i += 1;
            },
        }
    }
    Err(nom_error(input))
}

fn hex_string(input: &[u8]) -> IResult<&[u8], Object> {
    let (body, _) = tag(b"<" as &[u8])(input)?;
    let mut out = Vec::new();
    let mut nibble: Option<u8> = None;
    let mut i = 0;
    while i < body.len() {
        let b = body[i];
        if b == b'>' {
            if let Some(hi) = nibble {
                out.push(hi << 4);
            }
            return Ok((&body[i + 1..], Object::String(out)));
        }
        if is_pdf_whitespace(b) {
            i += 1;
            continue;
        }
        let digit = match (b as char).to_digit(16) {
            Some(d) => d as u8,
            None => return Err(nom_error(input)),
        };
        match nibble.take() {
            Some(hi) => out.push((hi << 4) | digit),
            None => nibble = Some(digit),
        }
        i += 1;
    }
    Err(nom_error(input))
}

fn dictionary(input: &[u8]) -> IResult<&[u8], Object> {
    let (mut rest, _) = tag(b"<<" as &[u8])(input)?;
    let mut dict = HashMap::new();
    loop {
        rest = skip_ws(rest);
        if rest.starts_with(b">>") {
            return Ok((&rest[2..], Object::Dictionary(dict)));
        }
        let (r, key) = name(rest)?;
        let (r, value) = operand(r)?;
        if let Object::Name(k) = key {
            dict.insert(k, value);
        }
        rest = r;
    }
}

fn array(input: &[u8]) -> IResult<&[u8], Object> {
    let (mut rest, _) = tag(b"[" as &[u8])(input)?;
    let mut items = Vec::new();
    loop {
        rest = skip_ws(rest);
        if rest.first() == Some(&b']') {
            return Ok((&rest[1..], Object::Array(items)));
        }
        let (r, value) = operand(rest)?;
        items.push(value);
        rest = r;
    }
}

/// Keyword operands that look like operator words.
fn keyword(input: &[u8]) -> IResult<&[u8], Object> {
    let (rest, word) = take_while1(is_regular)(input)?;
    match word {
        b"true" => Ok((rest, Object::Boolean(true))),
        b"false" => Ok((rest, Object::Boolean(false))),
        b"null" => Ok((rest, Object::Null)),
        _ => Err(nom_error(input)),
    }
}

/// Parse one operand (scalar or composite).
fn operand(input: &[u8]) -> IResult<&[u8], Object> {
    let input = skip_ws(input);
    match input.first() {
        Some(b'/') => name(input),
        Some(b'(') => literal_string(input),
        Some(b'<') if input.get(1) == Some(&b'<') => dictionary(input),
        Some(b'<') => hex_string(input),
        Some(b'[') => array(input),
        Some(b) if b.is_ascii_digit() || matches!(b, b'+' | b'-' | b'.') => number(input),
        _ => keyword(input),
    }
}

/// Skip past an inline image payload up to and including the `EI` marker.
fn skip_inline_image(input: &[u8]) -> &[u8] {
    let mut i = 0;
    while i + 1 < input.len() {
        if input[i] == b'E'
            && input[i + 1] == b'I'
            && (i == 0 || is_pdf_whitespace(input[i - 1]))
            && input.get(i + 2).map_or(true, |&b| !is_regular(b))
        {
            return &input[i + 2..];
        }
        i += 1;
    }
    &input[input.len()..]
}

fn parse_error(data: &[u8], input: &[u8], reason: &str) -> Error {
    Error::ParseError {
        offset: data.len() - input.len(),
        reason: reason.to_string(),
    }
}

/// Tokenize decoded content-stream bytes into a flat token sequence.
///
/// # Examples
///
/// ```
/// use tagwalk::content::tokenize;
///
/// let tokens = tokenize(b"q 2 0 0 2 10 10 cm /Im1 Do Q").unwrap();
/// assert_eq!(tokens.len(), 11);
/// ```
pub fn tokenize(data: &[u8]) -> Result<Vec<ContentToken>> {
    let mut tokens = Vec::new();
    let mut input = skip_ws(data);

    while !input.is_empty() {
        let b = input[0];
        if b == b'/'
            || b == b'('
            || b == b'<'
            || b == b'['
            || b.is_ascii_digit()
            || matches!(b, b'+' | b'-' | b'.')
        {
            let (rest, obj) =
                operand(input).map_err(|_| parse_error(data, input, "malformed operand"))?;
            tokens.push(ContentToken::Operand(obj));
            input = skip_ws(rest);
            continue;
        }

        let (rest, word) = take_while1::<_, _, nom::error::Error<&[u8]>>(is_regular)(input)
            .map_err(|_| parse_error(data, input, "unexpected delimiter"))?;
        match word {
            b"true" => tokens.push(ContentToken::Operand(Object::Boolean(true))),
            b"false" => tokens.push(ContentToken::Operand(Object::Boolean(false))),
            b"null" => tokens.push(ContentToken::Operand(Object::Null)),
            b"BI" => {
                input = skip_ws(skip_inline_image(rest));
                continue;
            },
            _ => tokens.push(ContentToken::Operator(String::from_utf8_lossy(word).into_owned())),
        }
        input = skip_ws(rest);
    }

    Ok(tokens)
}
