//! # Patterns
//!
//! A pattern is an expression template in which a placeholder identifier
//! (`__` by default) stands for an arbitrary subtree. Patterns are used both to
//! recognize expressions (`Table.input __`) and to build them.

use crate::construct::{is_identifier, Ident};
use crate::error::{AstError, AstResult};
use crate::id::AstId;
use crate::module::{Module, MutableModule};
use crate::node::{ChildNode, Node, NodeKind, Owned};

pub const DEFAULT_PLACEHOLDER: &str = "__";

#[derive(Debug, Clone)]
pub struct Pattern {
    template: Module,
    placeholder: String,
    holes: Vec<AstId>,
}

fn find_placeholders(root: Node<'_>, placeholder: &str) -> Vec<AstId> {
    let mut found = Vec::new();
    root.visit_recursive(&mut |node| {
        if node.ident_name() == Some(placeholder) {
            found.push(node.id());
        }
        true
    });
    found
}

impl Pattern {
    /// Parse an expression template using the default placeholder.
    pub fn parse_expression(template: &str) -> AstResult<Self> {
        Self::parse_expression_with(template, DEFAULT_PLACEHOLDER)
    }

    pub fn parse_expression_with(template: &str, placeholder: &str) -> AstResult<Self> {
        if !is_identifier(placeholder) {
            return Err(AstError::InvalidIdentifier(placeholder.to_string()));
        }
        let mut edit = MutableModule::transient();
        let root = edit.parse_expression(template)?;
        Self::from_session(edit, root, placeholder)
    }

    /// Build a pattern from a function that constructs an expression around a placeholder.
    pub fn new<F>(f: F, placeholder: &str) -> AstResult<Self>
    where
        F: FnOnce(&mut MutableModule, Owned) -> AstResult<Owned>,
    {
        let mut edit = MutableModule::transient();
        let hole = Ident::new(&mut edit, placeholder)?;
        let root = f(&mut edit, hole)?;
        Self::from_session(edit, root, placeholder)
    }

    fn from_session(mut edit: MutableModule, root: Owned, placeholder: &str) -> AstResult<Self> {
        edit.set_root(root);
        let ids = edit.ids().clone();
        let mut template = Module::empty(ids);
        template.apply_edit(edit);
        let holes = template
            .root()
            .map(|root| find_placeholders(root, placeholder))
            .unwrap_or_default();
        Ok(Self {
            template,
            placeholder: placeholder.to_string(),
            holes,
        })
    }

    pub fn placeholder(&self) -> &str {
        &self.placeholder
    }

    /// Number of placeholders in the template.
    pub fn arity(&self) -> usize {
        self.holes.len()
    }

    pub fn template_code(&self) -> String {
        self.template.code()
    }

    /// If `target` matches the template, the subtrees bound to each placeholder, in template order.
    ///
    /// Placeholders bind independently: a placeholder used twice may match two different subtrees.
    pub fn match_node(&self, target: Node<'_>) -> Option<Vec<AstId>> {
        let root = self.template.root()?;
        let mut bindings = vec![None; self.holes.len()];
        if !self.match_subtree(root, target, &mut bindings) {
            return None;
        }
        bindings.into_iter().collect()
    }

    pub fn test(&self, target: Node<'_>) -> bool {
        self.match_node(target).is_some()
    }

    fn match_subtree(&self, pattern: Node<'_>, target: Node<'_>, bindings: &mut [Option<AstId>]) -> bool {
        if pattern.kind() == NodeKind::Ident {
            if let Some(hole) = self.holes.iter().position(|id| *id == pattern.id()) {
                bindings[hole] = Some(target.id());
                return true;
            }
        }
        let pattern_children = pattern.concrete_children();
        let target_children = target.concrete_children();
        if pattern_children.len() != target_children.len() {
            return false;
        }
        pattern_children
            .iter()
            .zip(target_children)
            .all(|(p, t)| match (&p.node, &t.node) {
                (ChildNode::Token(a), ChildNode::Token(b)) => a.code == b.code,
                (ChildNode::Ast(a), ChildNode::Ast(b)) => match (pattern.get(*a), target.get(*b)) {
                    (Some(a), Some(b)) => self.match_subtree(a, b, bindings),
                    _ => false,
                },
                _ => false,
            })
    }

    /// Build a concrete expression in `edit`, substituting `subtrees` for the placeholders in order.
    pub fn instantiate(&self, edit: &mut MutableModule, subtrees: Vec<Owned>) -> AstResult<Owned> {
        if subtrees.len() != self.holes.len() {
            return Err(AstError::PlaceholderCountMismatch {
                expected: self.holes.len(),
                found: subtrees.len(),
            });
        }
        let template_root = self
            .template
            .root()
            .ok_or_else(|| AstError::NotAnExpression(String::new()))?;
        let instance = edit.import(template_root);
        let placeholders = find_placeholders(edit.get_version(instance.id())?, &self.placeholder);

        let mut root = instance;
        for (placeholder, subtree) in placeholders.into_iter().zip(subtrees) {
            if placeholder == root.id() {
                root = subtree;
            } else {
                let _placeholder = edit.replace(placeholder, subtree)?;
            }
        }
        Ok(root)
    }

    /// As [`Pattern::instantiate`], with copies of existing subtrees of `edit`.
    pub fn instantiate_copied(&self, edit: &mut MutableModule, subtrees: &[AstId]) -> AstResult<Owned> {
        let copies = subtrees
            .iter()
            .map(|id| edit.copy(*id))
            .collect::<AstResult<Vec<_>>>()?;
        self.instantiate(edit, copies)
    }
}
