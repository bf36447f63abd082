//! Markup parser: turns the token stream into a [`Dom`].
//!
//! The parser is tolerant in the places editors need it to be: unclosed
//! elements are closed at end of input, an end tag closes every element opened
//! after its match, and stray end tags for void elements are ignored. An end
//! tag with no open match is reported, since silently dropping it would shift
//! the structure of everything that follows.

use crate::lexer::{TokenKind, lex};
use crate::node::{NodeId, is_void_tag};
use crate::tree::{Dom, DomError, TextTree};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum MarkupError {
    #[error("unexpected end tag </{tag}> at byte {position}")]
    UnexpectedEndTag { tag: String, position: usize },
    #[error(transparent)]
    Tree(#[from] DomError),
}

/// Parse a markup fragment into a tree rooted at a synthetic `<body>`.
pub fn parse_markup(input: &str) -> Result<Dom, MarkupError> {
    let mut dom = Dom::default();
    let root = dom.root();
    parse_into(&mut dom, root, input)?;
    Ok(dom)
}

/// Parse a markup fragment and append the result to `parent`.
///
/// Returns the top-level nodes that were created.
pub fn parse_into(dom: &mut Dom, parent: NodeId, input: &str) -> Result<Vec<NodeId>, MarkupError> {
    let mut stack = vec![parent];
    let mut created = Vec::new();

    for token in lex(input) {
        let current = *stack.last().unwrap_or(&parent);
        match token.kind {
            TokenKind::Comment | TokenKind::Declaration => {}
            TokenKind::Text => {
                let decoded = html_escape::decode_html_entities(token.text);
                // Pure layout whitespace between tags carries no content
                if decoded.trim().is_empty() && decoded.contains('\n') {
                    continue;
                }
                let text = dom.create_text(&decoded);
                dom.append_child(current, text)?;
                if current == parent {
                    created.push(text);
                }
            }
            TokenKind::StartTag => {
                let tag = parse_start_tag(token.text);
                let element = dom.create_element_with_attrs(&tag.name, tag.attrs);
                dom.append_child(current, element)?;
                if current == parent {
                    created.push(element);
                }
                if !tag.self_closing && !is_void_tag(&tag.name) {
                    stack.push(element);
                }
            }
            TokenKind::EndTag => {
                let name = token.text[2..token.text.len() - 1]
                    .trim()
                    .to_ascii_lowercase();
                // Never pop the fragment's own parent
                let open = stack
                    .iter()
                    .skip(1)
                    .rposition(|&node| dom.is_tag(node, &name));
                match open {
                    Some(index) => stack.truncate(index + 1),
                    None if is_void_tag(&name) => {}
                    None => {
                        return Err(MarkupError::UnexpectedEndTag {
                            tag: name,
                            position: token.span.start,
                        });
                    }
                }
            }
        }
    }

    Ok(created)
}

struct StartTag {
    name: String,
    attrs: Vec<(String, String)>,
    self_closing: bool,
}

/// Split `<name a="1" b c='2'>` into its name and decoded attributes.
fn parse_start_tag(source: &str) -> StartTag {
    let inner = source.trim_start_matches('<').trim_end_matches('>');
    let self_closing = inner.ends_with('/');
    let inner = inner.trim_end_matches('/');

    let mut cursor = Cursor::new(inner);
    let name = cursor
        .take_while(|c| !c.is_whitespace() && c != '/')
        .to_ascii_lowercase();

    let mut attrs = Vec::new();
    loop {
        cursor.skip_while(|c| c.is_whitespace() || c == '/');
        if cursor.eof() {
            break;
        }
        let key = cursor
            .take_while(|c| !c.is_whitespace() && c != '=')
            .to_ascii_lowercase();
        cursor.skip_while(char::is_whitespace);
        let value = if cursor.eat('=') {
            cursor.skip_while(char::is_whitespace);
            match cursor.peek() {
                Some(quote @ ('"' | '\'')) => {
                    cursor.bump();
                    let value = cursor.take_while(|c| c != quote);
                    cursor.bump();
                    value
                }
                _ => cursor.take_while(|c| !c.is_whitespace()),
            }
        } else {
            ""
        };
        if !key.is_empty() {
            attrs.push((key, html_escape::decode_html_entities(value).into_owned()));
        }
    }

    StartTag {
        name,
        attrs,
        self_closing,
    }
}

/// Char cursor over a tag body.
struct Cursor<'a> {
    s: &'a str,
    i: usize,
}

impl<'a> Cursor<'a> {
    fn new(s: &'a str) -> Self {
        Self { s, i: 0 }
    }

    fn eof(&self) -> bool {
        self.i >= self.s.len()
    }

    fn peek(&self) -> Option<char> {
        self.s[self.i..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.i += c.len_utf8();
        Some(c)
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn take_while(&mut self, pred: impl Fn(char) -> bool) -> &'a str {
        let start = self.i;
        while let Some(c) = self.peek() {
            if !pred(c) {
                break;
            }
            self.i += c.len_utf8();
        }
        &self.s[start..self.i]
    }

    fn skip_while(&mut self, pred: impl Fn(char) -> bool) {
        self.take_while(pred);
    }
}
