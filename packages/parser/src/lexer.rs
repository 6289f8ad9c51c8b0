//! Lexer for Enso source using logos
//!
//! Horizontal whitespace is skipped by logos and recovered from the gaps
//! between tokens, so every token knows the whitespace that precedes it.
//! Newlines are tokens: indentation is the whitespace of a line's first token.

use crate::tree::{Span, Token, TokenKind};
use logos::Logos;

#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
#[logos(skip r"[ \t]+")]
enum RawToken {
    #[regex(r"\r?\n")]
    Newline,

    #[regex(r"##[^\n]*", priority = 10)]
    DocComment,

    #[regex(r"#[^\n]*")]
    Comment,

    #[regex(r"[A-Za-z_][A-Za-z0-9_]*")]
    Ident,

    #[token("_", priority = 10)]
    Wildcard,

    #[regex(r"[0-9][0-9_]*(\.[0-9]+)?")]
    Number,

    #[regex(r#""([^"\\\n]|\\[^\n])*"?"#)]
    #[regex(r"'([^'\\\n]|\\[^\n])*'?")]
    Text,

    #[regex(r"[!$%&*+\-/<>?^~|:\\=]+")]
    Operator,

    #[token("=", priority = 10)]
    Equals,

    #[token(".")]
    Dot,

    #[token(",")]
    Comma,

    #[token("(")]
    OpenParen,

    #[token(")")]
    CloseParen,

    #[token("[")]
    OpenBracket,

    #[token("]")]
    CloseBracket,
}

impl From<RawToken> for TokenKind {
    fn from(raw: RawToken) -> Self {
        match raw {
            RawToken::Newline => TokenKind::Newline,
            RawToken::DocComment => TokenKind::DocComment,
            RawToken::Comment => TokenKind::Comment,
            RawToken::Ident => TokenKind::Ident,
            RawToken::Wildcard => TokenKind::Wildcard,
            RawToken::Number => TokenKind::Number,
            // Split into start/section/end by `lex`.
            RawToken::Text => TokenKind::TextSection,
            RawToken::Operator => TokenKind::Operator,
            RawToken::Equals => TokenKind::Equals,
            RawToken::Dot => TokenKind::Dot,
            RawToken::Comma => TokenKind::Comma,
            RawToken::OpenParen => TokenKind::OpenParen,
            RawToken::CloseParen => TokenKind::CloseParen,
            RawToken::OpenBracket => TokenKind::OpenBracket,
            RawToken::CloseBracket => TokenKind::CloseBracket,
        }
    }
}

/// Result of lexing: the tokens plus any whitespace after the last token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lexed {
    pub tokens: Vec<Token>,
    pub trailing_whitespace: Span,
}

/// Lex source code into tokens with spans. Never fails: characters that do not
/// start any token become [`TokenKind::Invalid`] tokens.
pub fn lex(source: &str) -> Lexed {
    let mut tokens = Vec::new();
    let mut prev_end = 0;
    for (result, range) in RawToken::lexer(source).spanned() {
        // Error spans are widened to whole characters; the remainder of a
        // character already covered is dropped.
        if range.start < prev_end {
            continue;
        }
        let mut end = range.end;
        while !source.is_char_boundary(end) {
            end += 1;
        }
        let whitespace = Span::new(prev_end, range.start);
        let code = Span::new(range.start, end);
        prev_end = end;
        match result {
            Ok(RawToken::Text) => split_text(source, whitespace, code, &mut tokens),
            Ok(raw) => tokens.push(Token::new(raw.into(), whitespace, code)),
            Err(()) => tokens.push(Token::new(TokenKind::Invalid, whitespace, code)),
        }
    }
    Lexed {
        tokens,
        trailing_whitespace: Span::new(prev_end, source.len()),
    }
}

/// Split a text literal into its opening quote, contents and closing quote
/// (the latter two only if present).
fn split_text(source: &str, whitespace: Span, code: Span, out: &mut Vec<Token>) {
    let open = Span::new(code.start, code.start + 1);
    out.push(Token::new(TokenKind::TextStart, whitespace, open));

    let closed = is_closed_text(code.slice(source));
    let section_end = if closed { code.end - 1 } else { code.end };
    if section_end > open.end {
        let section = Span::new(open.end, section_end);
        out.push(Token::new(TokenKind::TextSection, Span::point(open.end), section));
    }
    if closed {
        let close = Span::new(code.end - 1, code.end);
        out.push(Token::new(TokenKind::TextEnd, Span::point(close.start), close));
    }
}

fn is_closed_text(literal: &str) -> bool {
    let mut chars = literal.char_indices();
    let Some((_, quote)) = chars.next() else {
        return false;
    };
    while let Some((i, c)) = chars.next() {
        if c == '\\' {
            chars.next();
        } else if c == quote {
            return i + c.len_utf8() == literal.len();
        }
    }
    false
}
