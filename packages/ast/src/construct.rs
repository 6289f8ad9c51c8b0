//! Constructors for new nodes.
//!
//! Created nodes are detached ([`Owned`]) and carry no whitespace; the printer
//! supplies conventional spacing.

use crate::error::{AstError, AstResult};
use crate::module::MutableModule;
use crate::node::{Child, NodeKind, Owned};
use enso_parser::{lex, TokenKind};

pub(crate) fn is_identifier(name: &str) -> bool {
    let lexed = lex(name);
    matches!(
        lexed.tokens.as_slice(),
        [token] if token.kind == TokenKind::Ident && token.whitespace.is_empty() && token.code.len() == name.len()
    )
}

pub struct Ident;

impl Ident {
    pub fn new(module: &mut MutableModule, name: &str) -> AstResult<Owned> {
        if !is_identifier(name) {
            return Err(AstError::InvalidIdentifier(name.to_string()));
        }
        Ok(module.insert_node(NodeKind::Ident, vec![Child::token(TokenKind::Ident, name)]))
    }
}

pub struct Wildcard;

impl Wildcard {
    pub fn new(module: &mut MutableModule) -> Owned {
        module.insert_node(NodeKind::Wildcard, vec![Child::token(TokenKind::Wildcard, "_")])
    }
}

/// Single-quoted text literal.
pub struct TextLiteral;

impl TextLiteral {
    pub fn new(module: &mut MutableModule, text: &str) -> Owned {
        let mut children = vec![Child::token(TokenKind::TextStart, "'")];
        if !text.is_empty() {
            children.push(Child::token(TokenKind::TextSection, escape_text(text)));
        }
        children.push(Child::token(TokenKind::TextEnd, "'"));
        module.insert_node(NodeKind::Text, children)
    }
}

pub struct Vector;

impl Vector {
    pub fn new(module: &mut MutableModule, elements: Vec<Owned>) -> Owned {
        let mut children = vec![Child::token(TokenKind::OpenBracket, "[")];
        for (i, element) in elements.into_iter().enumerate() {
            if i > 0 {
                children.push(Child::token(TokenKind::Comma, ","));
            }
            children.push(Child::ast(element.id()));
        }
        children.push(Child::token(TokenKind::CloseBracket, "]"));
        module.insert_node(NodeKind::Vector, children)
    }
}

pub struct App;

impl App {
    pub fn positional(module: &mut MutableModule, function: Owned, argument: Owned) -> Owned {
        module.insert_node(
            NodeKind::App,
            vec![Child::ast(function.id()), Child::ast(argument.id())],
        )
    }
}

pub struct PropertyAccess;

impl PropertyAccess {
    pub fn new(module: &mut MutableModule, lhs: Owned, name: &str) -> AstResult<Owned> {
        let name = Ident::new(module, name)?;
        Ok(module.insert_node(
            NodeKind::PropertyAccess,
            vec![
                Child::ast(lhs.id()),
                Child::token(TokenKind::Dot, "."),
                Child::ast(name.id()),
            ],
        ))
    }
}

/// Escape text for a single-quoted literal.
pub fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => out.push_str(&format!("\\u{{{:x}}}", c as u32)),
            c => out.push(c),
        }
    }
    out
}

/// Resolve the escapes of a text literal's contents. Unknown escapes are kept verbatim.
pub fn unescape_text(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some('0') => out.push('\0'),
            Some('\\') => out.push('\\'),
            Some('\'') => out.push('\''),
            Some('"') => out.push('"'),
            Some('u') if chars.peek() == Some(&'{') => {
                chars.next();
                let hex: String = chars.by_ref().take_while(|c| *c != '}').collect();
                match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                    Some(decoded) => out.push(decoded),
                    None => {
                        out.push_str("\\u{");
                        out.push_str(&hex);
                        out.push('}');
                    }
                }
            }
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ident_validation() {
        let mut edit = MutableModule::transient();
        assert!(Ident::new(&mut edit, "foo_1").is_ok());
        for bad in ["", "1x", "a b", "a.b", "_", "x="] {
            assert_eq!(
                Ident::new(&mut edit, bad),
                Err(AstError::InvalidIdentifier(bad.to_string()))
            );
        }
    }

    #[test]
    fn test_text_literal_escaping() {
        let mut edit = MutableModule::transient();
        let text = TextLiteral::new(&mut edit, "it's \"a\"\nb\\");
        let node = edit.get_version(text.id()).unwrap();
        assert_eq!(node.code(), r#"'it\'s "a"\nb\\'"#);
        assert_eq!(node.text_value().unwrap(), "it's \"a\"\nb\\");

        let empty = TextLiteral::new(&mut edit, "");
        assert_eq!(edit.get_version(empty.id()).unwrap().code(), "''");
    }

    #[test]
    fn test_control_characters_use_unicode_escapes() {
        assert_eq!(escape_text("\u{1b}"), "\\u{1b}");
        assert_eq!(unescape_text("\\u{1b}"), "\u{1b}");
    }

    #[test]
    fn test_build_expression() {
        let mut edit = MutableModule::transient();
        let table = Ident::new(&mut edit, "Table").unwrap();
        let access = PropertyAccess::new(&mut edit, table, "input").unwrap();
        let one = TextLiteral::new(&mut edit, "1");
        let nothing = Ident::new(&mut edit, "Nothing").unwrap();
        let vector = Vector::new(&mut edit, vec![one, nothing]);
        let app = App::positional(&mut edit, access, vector);
        assert_eq!(edit.get_version(app.id()).unwrap().code(), "Table.input ['1', Nothing]");
    }
}
