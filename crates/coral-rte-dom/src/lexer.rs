//! # Lexer - Tokenizing Markup
//!
//! Breaks markup into a flat token stream with [Logos]. The lexer is context
//! free: it recognises tag shapes, comments and character runs, and leaves
//! nesting to the [`parser`](crate::parser).
//!
//! [Logos]: https://docs.rs/logos
//!
//! Every byte of the input ends up in exactly one token. Characters Logos
//! cannot place (a lone `<` that does not start a tag) come back as
//! [`TokenKind::Text`], so malformed markup degrades into text rather than
//! failing.
//!
//! ```
//! use coral_rte_dom::lexer::{lex, TokenKind};
//!
//! let tokens = lex("<p>a &lt; b</p>");
//! let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
//! assert_eq!(kinds, vec![TokenKind::StartTag, TokenKind::Text, TokenKind::EndTag]);
//! ```

use logos::Logos;

#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// `<!-- ... -->`
    #[regex(r"<!--([^-]|-[^-])*-->")]
    Comment,

    /// `<!DOCTYPE ...>` and similar declarations
    #[regex(r"<![a-zA-Z][^>]*>")]
    Declaration,

    /// `</tag>`
    #[regex(r"</[a-zA-Z][a-zA-Z0-9-]*[ \t\r\n]*>")]
    EndTag,

    /// `<tag attr="value">` or `<tag/>`; quoted values may contain `>`
    #[regex(r#"<[a-zA-Z][a-zA-Z0-9-]*([^>"']|"[^"]*"|'[^']*')*>"#)]
    StartTag,

    /// Character data up to the next `<`
    #[regex(r"[^<]+")]
    Text,
}

/// A lexed token with its kind and the source slice it covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub text: &'a str,
    pub span: std::ops::Range<usize>,
}

/// Lex the input into a sequence of tokens.
pub fn lex(input: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut lexer = TokenKind::lexer(input);

    while let Some(result) = lexer.next() {
        // Unrecognised input, e.g. a stray `<`, is kept as text
        let kind = result.unwrap_or(TokenKind::Text);
        tokens.push(Token {
            kind,
            text: lexer.slice(),
            span: lexer.span(),
        });
    }

    tokens
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn kinds(input: &str) -> Vec<(TokenKind, &str)> {
        lex(input).into_iter().map(|t| (t.kind, t.text)).collect()
    }

    #[test]
    fn lex_simple_paragraph() {
        assert_eq!(
            kinds("<p>hello</p>"),
            vec![
                (TokenKind::StartTag, "<p>"),
                (TokenKind::Text, "hello"),
                (TokenKind::EndTag, "</p>"),
            ]
        );
    }

    #[test]
    fn quoted_attribute_may_contain_angle_bracket() {
        assert_eq!(
            kinds(r#"<a title="a > b">x</a>"#),
            vec![
                (TokenKind::StartTag, r#"<a title="a > b">"#),
                (TokenKind::Text, "x"),
                (TokenKind::EndTag, "</a>"),
            ]
        );
    }

    #[test]
    fn comments_and_declarations() {
        assert_eq!(
            kinds("<!DOCTYPE html><!-- note -->x"),
            vec![
                (TokenKind::Declaration, "<!DOCTYPE html>"),
                (TokenKind::Comment, "<!-- note -->"),
                (TokenKind::Text, "x"),
            ]
        );
    }

    #[test]
    fn self_closing_tag_is_a_start_tag() {
        assert_eq!(kinds("<br/>"), vec![(TokenKind::StartTag, "<br/>")]);
    }

    #[test]
    fn all_bytes_preserved() {
        let input = "<p class=\"x\">a <b>bold</b> 1 < 2</p><!-- c -->";
        let reconstructed: String = lex(input).iter().map(|t| t.text).collect();
        assert_eq!(input, reconstructed);
    }

    #[test]
    fn spans_are_correct() {
        let input = "<div>text</div>";
        for token in lex(input) {
            assert_eq!(token.text, &input[token.span.clone()]);
        }
    }
}
