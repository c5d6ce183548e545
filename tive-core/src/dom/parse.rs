//! Markup Parser
//!
//! A deliberately small parser for template markup. It understands
//! elements, attributes (quoted, unquoted or bare), comments, character
//! references and void elements. Attribute names keep their case and may
//! contain the binding prefixes `?`, `.`, `@` and the bare `...`.
//!
//! Children of a `<template>` element are placed in its content fragment,
//! not under the element itself.

use thiserror::Error;

use super::html::is_void;
use super::{Dom, NodeId};

/// Malformed markup.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} at byte {offset}")]
pub struct ParseError {
    /// Byte offset into the source where the problem was detected.
    pub offset: usize,
    pub message: String,
}

impl ParseError {
    fn new(offset: usize, message: impl Into<String>) -> Self {
        Self {
            offset,
            message: message.into(),
        }
    }
}

struct OpenElement {
    tag: String,
    /// Where children go: the element itself or its template content.
    container: NodeId,
}

struct Parser<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    fn take_while(&mut self, mut keep: impl FnMut(char, &str) -> bool) -> &'a str {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if !keep(c, self.rest()) {
                break;
            }
            self.bump();
        }
        &self.src[start..self.pos]
    }

    /// Whether a `<` at the cursor opens markup rather than being text.
    fn at_markup(&self) -> bool {
        let mut chars = self.rest().chars();
        chars.next() == Some('<')
            && chars
                .next()
                .is_some_and(|c| c.is_ascii_alphabetic() || c == '/' || c == '!')
    }
}

/// Parse `markup` into a new fragment owned by `dom`.
pub(super) fn parse_into(dom: &Dom, markup: &str) -> Result<NodeId, ParseError> {
    let root = dom.create_fragment();
    let mut stack: Vec<OpenElement> = Vec::new();
    let mut p = Parser { src: markup, pos: 0 };

    while p.peek().is_some() {
        let container = stack.last().map_or(root, |open| open.container);

        if p.rest().starts_with("<!--") {
            let start = p.pos;
            let body = &p.rest()[4..];
            let Some(end) = body.find("-->") else {
                return Err(ParseError::new(start, "unterminated comment"));
            };
            let comment = dom.create_comment(&body[..end]);
            dom.append_child(container, comment);
            p.pos += 4 + end + 3;
        } else if p.rest().starts_with("</") {
            let start = p.pos;
            p.pos += 2;
            let name = p.take_while(|c, _| c != '>').trim().to_owned();
            if p.bump() != Some('>') {
                return Err(ParseError::new(start, format!("unterminated closing tag </{name}")));
            }
            match stack.pop() {
                Some(open) if open.tag == name => {}
                Some(open) => {
                    return Err(ParseError::new(
                        start,
                        format!("expected </{}>, found </{name}>", open.tag),
                    ))
                }
                None => return Err(ParseError::new(start, format!("unexpected </{name}>"))),
            }
        } else if p.at_markup() {
            let start = p.pos;
            p.bump();
            let tag = p
                .take_while(|c, _| !c.is_whitespace() && c != '/' && c != '>')
                .to_owned();
            let element = dom.create_element(&tag);
            let self_closing = parse_attributes(&mut p, dom, element, start)?;

            dom.append_child(container, element);
            if !self_closing && !is_void(&tag) {
                let container = dom.template_content(element).unwrap_or(element);
                stack.push(OpenElement { tag, container });
            }
        } else {
            let mut first = true;
            let raw = p.take_while(|c, rest| {
                let keep = first || c != '<' || {
                    let mut chars = rest.chars().skip(1);
                    !chars
                        .next()
                        .is_some_and(|n| n.is_ascii_alphabetic() || n == '/' || n == '!')
                };
                first = false;
                keep
            });
            let text = dom.create_text(&decode_entities(raw));
            dom.append_child(container, text);
        }
    }

    if let Some(open) = stack.pop() {
        return Err(ParseError::new(markup.len(), format!("unclosed <{}>", open.tag)));
    }
    Ok(root)
}

/// Parse attributes up to and including the closing `>` of a start tag.
///
/// Returns whether the tag was self-closing.
fn parse_attributes(
    p: &mut Parser<'_>,
    dom: &Dom,
    element: NodeId,
    tag_start: usize,
) -> Result<bool, ParseError> {
    loop {
        p.skip_whitespace();
        match p.peek() {
            None => return Err(ParseError::new(tag_start, "unterminated start tag")),
            Some('>') => {
                p.bump();
                return Ok(false);
            }
            Some('/') if p.rest().starts_with("/>") => {
                p.pos += 2;
                return Ok(true);
            }
            Some(_) => {}
        }

        let name = p
            .take_while(|c, rest| {
                !c.is_whitespace() && c != '=' && c != '>' && !rest.starts_with("/>")
            })
            .to_owned();
        if name.is_empty() {
            return Err(ParseError::new(p.pos, "expected attribute name"));
        }

        p.skip_whitespace();
        let value = if p.peek() == Some('=') {
            p.bump();
            p.skip_whitespace();
            match p.peek() {
                Some(quote @ ('"' | '\'')) => {
                    let value_start = p.pos;
                    p.bump();
                    let raw = p.take_while(|c, _| c != quote);
                    if p.bump() != Some(quote) {
                        return Err(ParseError::new(value_start, "unterminated attribute value"));
                    }
                    decode_entities(raw)
                }
                _ => decode_entities(p.take_while(|c, _| !c.is_whitespace() && c != '>')),
            }
        } else {
            String::new()
        };
        dom.set_attribute(element, &name, &value);
    }
}

/// Replace the character references the serializer emits, plus numeric
/// references. Unknown references are kept verbatim.
fn decode_entities(raw: &str) -> String {
    if !raw.contains('&') {
        return raw.to_owned();
    }
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        let decoded = rest.find(';').and_then(|semi| {
            let name = &rest[1..semi];
            let c = match name {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                "nbsp" => Some('\u{a0}'),
                _ => name.strip_prefix('#').and_then(|num| {
                    let code = match num.strip_prefix(['x', 'X']) {
                        Some(hex) => u32::from_str_radix(hex, 16).ok(),
                        None => num.parse::<u32>().ok(),
                    };
                    code.and_then(char::from_u32)
                }),
            };
            c.map(|c| (c, semi))
        });
        match decoded {
            Some((c, semi)) => {
                out.push(c);
                rest = &rest[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}
