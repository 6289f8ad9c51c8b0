//! # Concrete Syntax Tree
//!
//! The raw tree produced by the parser. Nodes hold spans into the source rather
//! than text; every token carries the whitespace span that precedes it, so
//! printing leading whitespace and code of all tokens in order reproduces the
//! input exactly.

use serde::{Deserialize, Serialize};

/// A half-open byte range into the parsed source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn point(pos: usize) -> Self {
        Self { start: pos, end: pos }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn slice<'s>(&self, source: &'s str) -> &'s str {
        &source[self.start..self.end]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TokenKind {
    /// Line break. At the end of input, an empty newline token carries trailing whitespace.
    Newline,
    /// `##` documentation comment, including its indented continuation lines.
    DocComment,
    Comment,
    Ident,
    Wildcard,
    Number,
    TextStart,
    TextSection,
    TextEnd,
    Operator,
    Equals,
    Dot,
    Comma,
    OpenParen,
    CloseParen,
    OpenBracket,
    CloseBracket,
    Invalid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub kind: TokenKind,
    pub whitespace: Span,
    pub code: Span,
}

impl Token {
    pub fn new(kind: TokenKind, whitespace: Span, code: Span) -> Self {
        Self { kind, whitespace, code }
    }

    pub fn code<'s>(&self, source: &'s str) -> &'s str {
        self.code.slice(source)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TreeKind {
    /// Sequence of lines; children are newline/comment tokens and statements.
    BodyBlock,
    Ident,
    Wildcard,
    Number,
    Text,
    /// Prefix minus applied to a number literal.
    UnaryOprApp,
    /// Binary operator application. Either operand may be missing (sections).
    OprApp,
    PropertyAccess,
    /// Application by juxtaposition: function, argument.
    App,
    Group,
    Vector,
    Assignment,
    Function,
    Documented,
    Invalid,
}

impl TreeKind {
    pub fn is_statement(&self) -> bool {
        matches!(self, TreeKind::Assignment | TreeKind::Function | TreeKind::Documented)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Item {
    Token(Token),
    Tree(Tree),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tree {
    pub kind: TreeKind,
    pub children: Vec<Item>,
}

impl Tree {
    pub fn new(kind: TreeKind, children: Vec<Item>) -> Self {
        Self { kind, children }
    }

    pub fn first_token(&self) -> Option<&Token> {
        self.children.iter().find_map(|item| match item {
            Item::Token(token) => Some(token),
            Item::Tree(tree) => tree.first_token(),
        })
    }

    pub fn last_token(&self) -> Option<&Token> {
        self.children.iter().rev().find_map(|item| match item {
            Item::Token(token) => Some(token),
            Item::Tree(tree) => tree.last_token(),
        })
    }

    /// Whitespace preceding the tree's first token.
    pub fn whitespace(&self) -> Span {
        self.first_token().map(|t| t.whitespace).unwrap_or_default()
    }

    /// Span of the tree's code, excluding its leading whitespace.
    pub fn span(&self) -> Span {
        match (self.first_token(), self.last_token()) {
            (Some(first), Some(last)) => Span::new(first.code.start, last.code.end),
            _ => Span::default(),
        }
    }

    pub fn code<'s>(&self, source: &'s str) -> &'s str {
        self.span().slice(source)
    }

    pub fn child_trees(&self) -> impl Iterator<Item = &Tree> {
        self.children.iter().filter_map(|item| match item {
            Item::Tree(tree) => Some(tree),
            Item::Token(_) => None,
        })
    }

    /// Pre-order walk over this tree and every subtree.
    pub fn walk<F: FnMut(&Tree)>(&self, f: &mut F) {
        f(self);
        for child in self.child_trees() {
            child.walk(f);
        }
    }

    /// All tokens in source order.
    pub fn tokens(&self) -> Vec<&Token> {
        let mut out = Vec::new();
        self.collect_tokens(&mut out);
        out
    }

    fn collect_tokens<'a>(&'a self, out: &mut Vec<&'a Token>) {
        for item in &self.children {
            match item {
                Item::Token(token) => out.push(token),
                Item::Tree(tree) => tree.collect_tokens(out),
            }
        }
    }

    /// Reassemble the text of the tree, including its leading whitespace.
    pub fn print(&self, source: &str) -> String {
        let mut out = String::new();
        for token in self.tokens() {
            out.push_str(token.whitespace.slice(source));
            out.push_str(token.code(source));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(kind: TokenKind, ws: (usize, usize), code: (usize, usize)) -> Item {
        Item::Token(Token::new(kind, Span::new(ws.0, ws.1), Span::new(code.0, code.1)))
    }

    #[test]
    fn test_span_excludes_leading_whitespace() {
        // " f x"
        let app = Tree::new(
            TreeKind::App,
            vec![
                Item::Tree(Tree::new(TreeKind::Ident, vec![token(TokenKind::Ident, (0, 1), (1, 2))])),
                Item::Tree(Tree::new(TreeKind::Ident, vec![token(TokenKind::Ident, (2, 3), (3, 4))])),
            ],
        );
        assert_eq!(app.span(), Span::new(1, 4));
        assert_eq!(app.whitespace(), Span::new(0, 1));
        assert_eq!(app.code(" f x"), "f x");
        assert_eq!(app.print(" f x"), " f x");
    }

    #[test]
    fn test_walk_is_preorder() {
        let tree = Tree::new(
            TreeKind::Group,
            vec![
                token(TokenKind::OpenParen, (0, 0), (0, 1)),
                Item::Tree(Tree::new(TreeKind::Number, vec![token(TokenKind::Number, (1, 1), (1, 2))])),
                token(TokenKind::CloseParen, (2, 2), (2, 3)),
            ],
        );
        let mut kinds = Vec::new();
        tree.walk(&mut |t| kinds.push(t.kind));
        assert_eq!(kinds, vec![TreeKind::Group, TreeKind::Number]);
    }

    #[test]
    fn test_empty_tree() {
        let block = Tree::new(TreeKind::BodyBlock, vec![]);
        assert_eq!(block.span(), Span::default());
        assert!(block.first_token().is_none());
    }
}
