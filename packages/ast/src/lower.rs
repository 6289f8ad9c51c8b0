//! Lowering parser trees into module records.

use crate::id::AstId;
use crate::module::MutableModule;
use crate::node::{Child, ChildNode, NodeKind, Owned, TokenData};
use enso_parser::{Item, Tree};

/// Insert `tree` into the session as a detached subtree.
pub fn lower(module: &mut MutableModule, tree: &Tree, source: &str) -> Owned {
    lower_with_whitespace(module, tree, source).1
}

/// As [`lower`], also returning the whitespace that preceded the tree in `source`.
///
/// A node's leading whitespace is owned by the slot it occupies in its parent,
/// so the whitespace before the tree's first token is returned rather than
/// stored. Blocks keep the whitespace of their first line.
pub fn lower_with_whitespace(module: &mut MutableModule, tree: &Tree, source: &str) -> (String, Owned) {
    let (whitespace, id) = lower_tree(module, tree, source);
    (whitespace, Owned::new(id))
}

fn lower_tree(module: &mut MutableModule, tree: &Tree, source: &str) -> (String, AstId) {
    let mut children: Vec<Child> = tree
        .children
        .iter()
        .map(|item| match item {
            Item::Token(token) => Child {
                whitespace: Some(token.whitespace.slice(source).to_string()),
                node: ChildNode::Token(TokenData::new(token.kind, token.code(source))),
            },
            Item::Tree(subtree) => {
                let (whitespace, id) = lower_tree(module, subtree, source);
                Child {
                    whitespace: Some(whitespace),
                    node: ChildNode::Ast(id),
                }
            }
        })
        .collect();

    let leading = match children.first_mut() {
        Some(first) if tree.kind != NodeKind::BodyBlock => first.whitespace.replace(String::new()).unwrap_or_default(),
        _ => String::new(),
    };
    let owned = module.insert_node(tree.kind, children);
    (leading, owned.id())
}

#[cfg(test)]
mod tests {
    use super::*;
    use enso_parser::parse_block;

    #[test]
    fn test_leading_whitespace_moves_to_slot() {
        let source = "x =   f a";
        let tree = parse_block(source).unwrap();
        let mut edit = MutableModule::transient();
        let root = lower(&mut edit, &tree, source);
        let block = edit.get_version(root.id()).unwrap();
        let assignment = block.statements()[0];
        let app = assignment.assignment_expression().unwrap();

        assert_eq!(app.slot_whitespace(), Some("   "));
        assert_eq!(app.concrete_children()[0].whitespace.as_deref(), Some(""));
        assert_eq!(block.code(), source);
    }

    #[test]
    fn test_block_keeps_first_line_whitespace() {
        let source = "  x";
        let tree = parse_block(source).unwrap();
        let mut edit = MutableModule::transient();
        let (leading, root) = lower_with_whitespace(&mut edit, &tree, source);
        assert_eq!(leading, "");
        assert_eq!(edit.get_version(root.id()).unwrap().code(), source);
    }
}
