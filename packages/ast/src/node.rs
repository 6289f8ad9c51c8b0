//! # Node Records and Views
//!
//! A module stores its nodes as records in an arena keyed by [`AstId`]. A record
//! holds the node's fields (kind, parent, concrete children) and its metadata
//! separately, so each part can be observed and synchronized on its own.
//!
//! - [`Node`] is a borrowed, read-only view of a record in some module.
//! - [`Owned`] is a handle to a detached subtree in an edit session; it must be
//!   placed in the tree (or dropped) by the caller.

use crate::id::{AstId, ExternalId};
use crate::print;
use enso_parser::TokenKind;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

pub use enso_parser::TreeKind as NodeKind;

pub type NodeMap = HashMap<AstId, Arc<NodeRecord>>;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TokenData {
    pub kind: TokenKind,
    pub code: String,
}

impl TokenData {
    pub fn new(kind: TokenKind, code: impl Into<String>) -> Self {
        Self { kind, code: code.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChildNode {
    Token(TokenData),
    Ast(AstId),
}

/// A concrete child: leading whitespace plus a token or a node reference.
/// `None` whitespace is filled in by the printer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Child {
    pub whitespace: Option<String>,
    pub node: ChildNode,
}

impl Child {
    pub fn token(kind: TokenKind, code: impl Into<String>) -> Self {
        Self {
            whitespace: None,
            node: ChildNode::Token(TokenData::new(kind, code)),
        }
    }

    pub fn ast(id: AstId) -> Self {
        Self {
            whitespace: None,
            node: ChildNode::Ast(id),
        }
    }

    pub fn with_whitespace(mut self, whitespace: impl Into<String>) -> Self {
        self.whitespace = Some(whitespace.into());
        self
    }

    pub fn ast_id(&self) -> Option<AstId> {
        match self.node {
            ChildNode::Ast(id) => Some(id),
            ChildNode::Token(_) => None,
        }
    }

    pub fn token_data(&self) -> Option<&TokenData> {
        match &self.node {
            ChildNode::Token(token) => Some(token),
            ChildNode::Ast(_) => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeMetadata {
    pub external_id: ExternalId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
    /// Per-widget state, keyed by widget name.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub widget: BTreeMap<String, serde_json::Value>,
}

impl NodeMetadata {
    pub fn new(external_id: ExternalId) -> Self {
        Self {
            external_id,
            position: None,
            widget: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeFields {
    pub kind: NodeKind,
    pub parent: Option<AstId>,
    pub children: Vec<Child>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub id: AstId,
    pub fields: NodeFields,
    pub metadata: NodeMetadata,
}

impl NodeRecord {
    pub fn ast_children(&self) -> impl Iterator<Item = AstId> + '_ {
        self.fields.children.iter().filter_map(Child::ast_id)
    }
}

/// Handle to a detached subtree inside an edit session.
#[must_use = "a detached subtree is lost unless it is inserted into the tree"]
#[derive(Debug, PartialEq, Eq)]
pub struct Owned(AstId);

impl Owned {
    pub(crate) fn new(id: AstId) -> Self {
        Self(id)
    }

    pub fn id(&self) -> AstId {
        self.0
    }
}

/// Read-only view of a node in a module or edit session.
#[derive(Debug, Clone, Copy)]
pub struct Node<'m> {
    nodes: &'m NodeMap,
    record: &'m NodeRecord,
}

impl<'m> Node<'m> {
    pub(crate) fn lookup(nodes: &'m NodeMap, id: AstId) -> Option<Self> {
        nodes.get(&id).map(|record| Self { nodes, record })
    }

    pub fn id(&self) -> AstId {
        self.record.id
    }

    pub fn kind(&self) -> NodeKind {
        self.record.fields.kind
    }

    pub fn parent(&self) -> Option<AstId> {
        self.record.fields.parent
    }

    pub fn record(&self) -> &'m NodeRecord {
        self.record
    }

    pub fn metadata(&self) -> &'m NodeMetadata {
        &self.record.metadata
    }

    pub fn external_id(&self) -> &'m ExternalId {
        &self.record.metadata.external_id
    }

    /// Look up another node of the same module.
    pub fn get(&self, id: AstId) -> Option<Node<'m>> {
        Node::lookup(self.nodes, id)
    }

    pub fn parent_node(&self) -> Option<Node<'m>> {
        self.parent().and_then(|id| self.get(id))
    }

    pub fn concrete_children(&self) -> &'m [Child] {
        &self.record.fields.children
    }

    /// Child nodes, skipping tokens.
    pub fn children(&self) -> impl Iterator<Item = Node<'m>> + 'm {
        let nodes = self.nodes;
        self.record
            .fields
            .children
            .iter()
            .filter_map(Child::ast_id)
            .filter_map(move |id| Node::lookup(nodes, id))
    }

    pub fn child(&self, index: usize) -> Option<Node<'m>> {
        self.children().nth(index)
    }

    pub fn tokens(&self) -> impl Iterator<Item = &'m TokenData> + 'm {
        self.record.fields.children.iter().filter_map(Child::token_data)
    }

    pub fn has_token(&self, kind: TokenKind) -> bool {
        self.tokens().any(|t| t.kind == kind)
    }

    /// Whitespace of this node's slot in its parent.
    pub fn slot_whitespace(&self) -> Option<&'m str> {
        let parent = self.parent_node()?;
        parent
            .concrete_children()
            .iter()
            .find(|child| child.ast_id() == Some(self.id()))
            .and_then(|child| child.whitespace.as_deref())
    }

    pub fn code(&self) -> String {
        print::print(*self)
    }

    /// Pre-order traversal. Returning `false` from `f` skips the node's children.
    pub fn visit_recursive<F: FnMut(Node<'m>) -> bool>(&self, f: &mut F) {
        if f(*self) {
            for child in self.children() {
                child.visit_recursive(f);
            }
        }
    }

    pub fn is_expression(&self) -> bool {
        !matches!(
            self.kind(),
            NodeKind::BodyBlock | NodeKind::Assignment | NodeKind::Function | NodeKind::Documented
        )
    }

    pub fn is_statement(&self) -> bool {
        self.parent_node().is_some_and(|p| p.kind() == NodeKind::BodyBlock)
    }

    pub fn ident_name(&self) -> Option<&'m str> {
        if self.kind() != NodeKind::Ident {
            return None;
        }
        self.tokens().next().map(|t| t.code.as_str())
    }

    /// `(function, argument)` of an application.
    pub fn app_parts(&self) -> Option<(Node<'m>, Node<'m>)> {
        if self.kind() != NodeKind::App {
            return None;
        }
        Some((self.child(0)?, self.child(1)?))
    }

    /// `(lhs, name)` of a property access; the name is absent in incomplete code like `a.`.
    pub fn property_access_parts(&self) -> Option<(Node<'m>, Option<Node<'m>>)> {
        if self.kind() != NodeKind::PropertyAccess {
            return None;
        }
        Some((self.child(0)?, self.child(1)))
    }

    /// Statements of a block.
    pub fn statements(&self) -> Vec<Node<'m>> {
        if self.kind() != NodeKind::BodyBlock {
            return Vec::new();
        }
        self.children().collect()
    }

    pub fn function_name(&self) -> Option<&'m str> {
        if self.kind() != NodeKind::Function {
            return None;
        }
        self.child(0)?.ident_name()
    }

    pub fn function_body(&self) -> Option<Node<'m>> {
        if self.kind() != NodeKind::Function {
            return None;
        }
        let equals = self
            .concrete_children()
            .iter()
            .position(|c| c.token_data().is_some_and(|t| t.kind == TokenKind::Equals))?;
        self.concrete_children()[equals + 1..]
            .iter()
            .find_map(Child::ast_id)
            .and_then(|id| self.get(id))
    }

    pub fn assignment_pattern(&self) -> Option<Node<'m>> {
        if self.kind() != NodeKind::Assignment {
            return None;
        }
        self.child(0)
    }

    pub fn assignment_expression(&self) -> Option<Node<'m>> {
        if self.kind() != NodeKind::Assignment {
            return None;
        }
        self.child(1)
    }

    /// The statement wrapped by a `Documented` node.
    pub fn documented_statement(&self) -> Option<Node<'m>> {
        if self.kind() != NodeKind::Documented {
            return None;
        }
        self.child(0)
    }

    /// Value of a text literal with escapes resolved.
    pub fn text_value(&self) -> Option<String> {
        if self.kind() != NodeKind::Text {
            return None;
        }
        let raw = self
            .tokens()
            .find(|t| t.kind == TokenKind::TextSection)
            .map(|t| t.code.as_str())
            .unwrap_or("");
        Some(crate::construct::unescape_text(raw))
    }
}

#[cfg(test)]
mod tests {
    use crate::module::Module;
    use crate::node::NodeKind;

    #[test]
    fn test_accessors() {
        let module = Module::parse_with_name("main =\n    x = f 1\n    x.y", "Main").unwrap();
        let root = module.root().unwrap();
        let main = root.statements()[0];
        assert_eq!(main.function_name(), Some("main"));

        let body = main.function_body().unwrap();
        let statements = body.statements();
        assert_eq!(statements.len(), 2);

        let assignment = statements[0];
        assert_eq!(assignment.assignment_pattern().unwrap().ident_name(), Some("x"));
        let (func, arg) = assignment.assignment_expression().unwrap().app_parts().unwrap();
        assert_eq!(func.code(), "f");
        assert_eq!(arg.kind(), NodeKind::Number);

        let (lhs, name) = statements[1].property_access_parts().unwrap();
        assert_eq!(lhs.code(), "x");
        assert_eq!(name.unwrap().code(), "y");
        assert!(statements[1].is_statement());
        assert_eq!(statements[1].slot_whitespace(), Some("    "));
    }

    #[test]
    fn test_visit_recursive_can_skip_children() {
        let module = Module::parse_with_name("a = f (g x)", "Main").unwrap();
        let mut visited = Vec::new();
        module.root().unwrap().visit_recursive(&mut |node| {
            visited.push(node.kind());
            node.kind() != NodeKind::Group
        });
        assert!(visited.contains(&NodeKind::Group));
        assert_eq!(visited.iter().filter(|k| **k == NodeKind::Ident).count(), 2);
    }

    #[test]
    fn test_text_value_unescapes() {
        let module = Module::parse_with_name(r"x = 'a\'b\nc'", "Main").unwrap();
        let root = module.root().unwrap();
        let text = root.statements()[0].assignment_expression().unwrap();
        assert_eq!(text.text_value().unwrap(), "a'b\nc");
    }
}
