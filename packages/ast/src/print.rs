//! Printing nodes back to source text.
//!
//! Whitespace recorded by the parser is reproduced exactly. Children created by
//! edits carry no whitespace and get a conventional spacing instead.

use crate::id::AstId;
use crate::node::{Child, ChildNode, Node, NodeKind};
use enso_common::SourceRange;
use enso_parser::TokenKind;
use std::collections::HashMap;

const INDENT: &str = "    ";

/// Printed code with the span of every node, relative to the start of the code.
#[derive(Debug, Clone, Default)]
pub struct Printed {
    pub code: String,
    pub spans: HashMap<AstId, SourceRange>,
    /// Nodes by span. Nodes sharing a span are listed outermost first.
    pub index: HashMap<SourceRange, Vec<AstId>>,
}

pub fn print(node: Node<'_>) -> String {
    let mut printer = Printer::default();
    printer.node(node, "");
    printer.out
}

pub fn print_with_spans(node: Node<'_>) -> Printed {
    let mut printer = Printer {
        track: true,
        ..Printer::default()
    };
    printer.node(node, "");

    let mut index: HashMap<SourceRange, Vec<AstId>> = HashMap::new();
    for id in &printer.order {
        if let Some(span) = printer.spans.get(id) {
            index.entry(*span).or_default().push(*id);
        }
    }
    Printed {
        code: printer.out,
        spans: printer.spans,
        index,
    }
}

#[derive(Default)]
struct Printer {
    out: String,
    track: bool,
    order: Vec<AstId>,
    spans: HashMap<AstId, SourceRange>,
}

impl Printer {
    fn node(&mut self, node: Node<'_>, indent: &str) {
        let start = self.out.len();
        if self.track {
            self.order.push(node.id());
        }
        let children = node.concrete_children();
        let mut prev: Option<&Child> = None;
        for child in children {
            match &child.whitespace {
                Some(whitespace) => self.out.push_str(whitespace),
                None => self.out.push_str(&default_whitespace(node.kind(), prev, child, indent)),
            }
            match &child.node {
                ChildNode::Token(token) => self.out.push_str(&token.code),
                ChildNode::Ast(id) => {
                    if let Some(child_node) = node.get(*id) {
                        if child_node.kind() == NodeKind::BodyBlock && node.kind() != NodeKind::BodyBlock {
                            let nested = format!("{indent}{INDENT}");
                            self.node(child_node, &nested);
                        } else {
                            self.node(child_node, indent);
                        }
                    }
                }
            }
            prev = Some(child);
        }
        if self.track {
            self.spans.insert(node.id(), SourceRange::new(start, self.out.len()));
        }
    }
}

fn token_kind(child: Option<&Child>) -> Option<TokenKind> {
    child.and_then(Child::token_data).map(|t| t.kind)
}

fn default_whitespace(parent: NodeKind, prev: Option<&Child>, child: &Child, indent: &str) -> String {
    let Some(prev) = prev else {
        return if parent == NodeKind::BodyBlock {
            indent.to_string()
        } else {
            String::new()
        };
    };
    let prev_kind = token_kind(Some(prev));
    if prev_kind == Some(TokenKind::Newline) {
        return indent.to_string();
    }
    let attaches_left = matches!(
        token_kind(Some(child)),
        Some(
            TokenKind::Dot
                | TokenKind::CloseParen
                | TokenKind::CloseBracket
                | TokenKind::Comma
                | TokenKind::TextSection
                | TokenKind::TextEnd
                | TokenKind::Newline
        )
    );
    let attaches_right = matches!(
        prev_kind,
        Some(
            TokenKind::Dot
                | TokenKind::OpenParen
                | TokenKind::OpenBracket
                | TokenKind::TextStart
                | TokenKind::TextSection
        )
    );
    let unary = parent == NodeKind::UnaryOprApp && prev_kind == Some(TokenKind::Operator);
    if attaches_left || attaches_right || unary {
        String::new()
    } else {
        " ".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::{Module, MutableModule};
    use crate::node::Child;

    #[test]
    fn test_print_is_lossless() {
        for code in [
            "x = 1",
            "main =\n    x = f  1\n\n    # comment\n    x.y   ",
            "f a b = a+b",
            "## Doc\n   more\nnode = [1,2 ,  3]",
            "x = 'text' . length",
            "  indented\nx = ( a )",
        ] {
            let module = Module::parse_with_name(code, "Main").unwrap();
            assert_eq!(module.code(), code);
        }
    }

    #[test]
    fn test_default_spacing_for_new_nodes() {
        let mut edit = MutableModule::transient();
        let a = edit.parse_expression("a").unwrap();
        let b = edit.parse_expression("b").unwrap();
        let c = edit.parse_expression("c").unwrap();
        let access = edit.insert_node(
            NodeKind::PropertyAccess,
            vec![Child::ast(a.id()), Child::token(TokenKind::Dot, "."), Child::ast(b.id())],
        );
        let vector = edit.insert_node(
            NodeKind::Vector,
            vec![
                Child::token(TokenKind::OpenBracket, "["),
                Child::ast(access.id()),
                Child::token(TokenKind::Comma, ","),
                Child::ast(c.id()),
                Child::token(TokenKind::CloseBracket, "]"),
            ],
        );
        assert_eq!(edit.get_version(vector.id()).unwrap().code(), "[a.b, c]");
    }

    #[test]
    fn test_spans_and_index() {
        let module = Module::parse_with_name("x = f y", "Main").unwrap();
        let root = module.root().unwrap();
        let printed = print_with_spans(root);
        assert_eq!(printed.code, "x = f y");

        let assignment = root.statements()[0];
        let app = assignment.assignment_expression().unwrap();
        assert_eq!(printed.spans[&app.id()], SourceRange::new(4, 7));

        // The block and its only statement share a span; the block comes first.
        let whole = &printed.index[&SourceRange::new(0, 7)];
        assert_eq!(whole, &vec![root.id(), assignment.id()]);
    }
}
