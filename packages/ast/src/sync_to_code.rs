//! # Synchronizing a Subtree to Edited Code
//!
//! Text edits made in a code editor are applied to the tree by reparsing the
//! edited subtree and then reusing as many existing nodes as possible, so node
//! identities (and the metadata attached to them) survive the edit.
//!
//! Nodes are paired in three passes:
//!
//! 1. **Retained code.** Each old node's span is mapped through the edits; the
//!    smallest new node enclosing what is left of it is a match if it has the
//!    same kind. Matches whose span is exactly the retained code are accepted
//!    immediately, looser ones are kept as candidates.
//! 2. **Movement.** Unmatched new nodes are paired with unmatched old nodes of
//!    identical syntax, found by hashing each subtree's kinds, whitespace and
//!    token text.
//! 3. **Candidates** from the first pass whose nodes are still unmatched.
//!
//! Matched old nodes then take over the fields of their new counterparts.

use crate::error::AstResult;
use crate::id::AstId;
use crate::lower::lower_with_whitespace;
use crate::module::MutableModule;
use crate::node::{Child, ChildNode, Node, NodeKind, NodeMap, NodeMetadata, Owned};
use crate::print::{print_with_spans, Printed};
use crc32fast::Hasher;
use enso_common::text::{
    apply_text_edits, apply_text_edits_to_spans, enclosing_spans, text_change_to_edits, trim_end, SpanTree,
};
use enso_common::{SourceRange, TextEdit};
use enso_parser::{Item, Tree};
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::trace;

impl MutableModule {
    /// Update the subtree at `target` so that it prints as `code`, modifying it as little as possible.
    pub fn sync_to_code(&mut self, target: AstId, code: &str) -> AstResult<()> {
        let before = self.get_version(target)?.code();
        let edits = text_change_to_edits(&before, code);
        if edits.is_empty() {
            return Ok(());
        }
        self.apply_text_edits(target, &edits)
    }

    /// Update the whole module to `code`. An empty module is simply parsed.
    pub fn sync_root_to_code(&mut self, code: &str) -> AstResult<()> {
        match self.root_id() {
            Some(root) => self.sync_to_code(root, code),
            None => {
                let root = self.parse_block(code)?;
                self.set_root(root);
                Ok(())
            }
        }
    }

    /// Apply edits, expressed relative to the printed code of `target`, to the subtree.
    pub fn apply_text_edits(&mut self, target: AstId, edits: &[TextEdit]) -> AstResult<()> {
        let target_node = self.get_version(target)?;
        let is_block = target_node.kind() == NodeKind::BodyBlock;
        let printed = print_with_spans(target_node);
        let expression_metadata = assignment_expression_metadata(target_node);

        let code = apply_text_edits(&printed.code, edits);
        let block = enso_parser::parse_block(&code)?;
        let parsed = if is_block { &block } else { sole_tree(&block).unwrap_or(&block) };

        let (leading, new_root) = lower_with_whitespace(self, parsed, &code);
        let new_root_id = new_root.id();
        let new_spans: HashMap<AstId, SourceRange> = print_with_spans(self.get_version(new_root_id)?)
            .spans
            .into_iter()
            .map(|(id, span)| (id, span.translate(leading.len())))
            .collect();

        let to_sync = calculate_correspondence(self.nodes(), target, &printed, new_root_id, &new_spans, edits, &code);
        trace!(target = %target, matched = to_sync.len(), "synchronizing subtree to code");
        self.sync_tree(target, new_root, &to_sync, &expression_metadata)
    }

    fn sync_tree(
        &mut self,
        target: AstId,
        new_root: Owned,
        to_sync: &BTreeMap<AstId, AstId>,
        expression_metadata: &HashMap<AstId, NodeMetadata>,
    ) -> AstResult<()> {
        let new_to_old: HashMap<AstId, AstId> = to_sync.iter().map(|(old, new)| (*new, *old)).collect();
        let new_root_id = new_root.id();

        let start = if to_sync.get(&target) == Some(&new_root_id) {
            target
        } else {
            let metadata = self.get_version(target)?.metadata().clone();
            let _replaced = self.replace(target, new_root)?;
            self.set_metadata(new_root_id, metadata)?;
            let fresh = self.ids().new_external_id();
            self.set_external_id(target, fresh)?;
            new_root_id
        };

        let mut stack = vec![start];
        while let Some(id) = stack.pop() {
            let (kind, children) = match to_sync.get(&id) {
                Some(from) => {
                    let source = self.get_version(*from)?;
                    (source.kind(), source.concrete_children().to_vec())
                }
                None => {
                    let node = self.get_version(id)?;
                    (node.kind(), node.concrete_children().to_vec())
                }
            };
            let children = self.adopt_children(id, children, &new_to_old)?;
            self.set_fields(id, kind, children)?;

            if let Some(metadata) = expression_metadata.get(&id) {
                let expression = self.get_version(id)?.assignment_expression().map(|e| e.id());
                if let Some(expression) = expression {
                    self.set_metadata(expression, metadata.clone())?;
                }
            }

            let node = self.get_version(id)?;
            let mut next: Vec<AstId> = node.record().ast_children().collect();
            next.reverse();
            stack.extend(next);
        }
        Ok(())
    }

    /// Point child references at their old equivalents and make `parent` their parent.
    fn adopt_children(
        &mut self,
        parent: AstId,
        children: Vec<Child>,
        new_to_old: &HashMap<AstId, AstId>,
    ) -> AstResult<Vec<Child>> {
        children
            .into_iter()
            .map(|mut child| {
                if let ChildNode::Ast(id) = child.node {
                    let actual = new_to_old.get(&id).copied().unwrap_or(id);
                    self.set_parent(actual, Some(parent))?;
                    child.node = ChildNode::Ast(actual);
                }
                Ok(child)
            })
            .collect()
    }
}

fn sole_tree(block: &Tree) -> Option<&Tree> {
    match block.children.as_slice() {
        [Item::Tree(tree)] => Some(tree),
        _ => None,
    }
}

/// Metadata of the expression of every assignment in the subtree, keyed by assignment.
fn assignment_expression_metadata(root: Node<'_>) -> HashMap<AstId, NodeMetadata> {
    let mut out = HashMap::new();
    root.visit_recursive(&mut |node| {
        if let Some(expression) = node.assignment_expression() {
            out.insert(node.id(), expression.metadata().clone());
        }
        true
    });
    out
}

struct SpannedNode<'a> {
    nodes: &'a NodeMap,
    spans: &'a HashMap<AstId, SourceRange>,
    id: AstId,
}

impl<'a> SpanTree for SpannedNode<'a> {
    type Id = AstId;

    fn id(&self) -> AstId {
        self.id
    }

    fn span(&self) -> SourceRange {
        self.spans.get(&self.id).copied().unwrap_or(SourceRange::point(0))
    }

    fn children(&self) -> Vec<Self> {
        self.nodes
            .get(&self.id)
            .map(|record| {
                record
                    .ast_children()
                    .map(|id| SpannedNode {
                        nodes: self.nodes,
                        spans: self.spans,
                        id,
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}

fn kind_of(nodes: &NodeMap, id: AstId) -> Option<NodeKind> {
    nodes.get(&id).map(|record| record.fields.kind)
}

/// Pairs of (old node, new node) that should be treated as the same node.
fn calculate_correspondence(
    nodes: &NodeMap,
    old_root: AstId,
    old: &Printed,
    new_root: AstId,
    new_spans: &HashMap<AstId, SourceRange>,
    edits: &[TextEdit],
    code_after: &str,
) -> BTreeMap<AstId, AstId> {
    let mut to_sync = BTreeMap::new();
    let mut candidates = BTreeMap::new();
    let mut old_matched = HashSet::new();
    let mut new_matched = HashSet::new();

    let mut spans_before: Vec<SourceRange> = old.index.keys().copied().collect();
    spans_before.sort_by_key(|span| (span.from, span.to));
    let spans_before_and_after: Vec<(SourceRange, SourceRange)> = apply_text_edits_to_spans(edits, &spans_before)
        .into_iter()
        .map(|(before, after)| (before, trim_end(after, code_after)))
        .collect();

    let mut part_after_to_old: HashMap<SourceRange, Vec<AstId>> = HashMap::new();
    for (before, after) in &spans_before_and_after {
        if let Some(ids) = old.index.get(before) {
            part_after_to_old.entry(*after).or_default().extend(ids.iter().copied());
        }
    }
    let parts_after: Vec<SourceRange> = spans_before_and_after.iter().map(|(_, after)| *after).collect();

    let tree = SpannedNode {
        nodes,
        spans: new_spans,
        id: new_root,
    };
    for (new_id, parts) in enclosing_spans(&tree, parts_after) {
        let Some(new_kind) = kind_of(nodes, new_id) else {
            continue;
        };
        let new_len = new_spans.get(&new_id).map(SourceRange::len).unwrap_or_default();
        'parts: for part in parts {
            let Some(olds) = part_after_to_old.get(&part) else {
                continue;
            };
            for old_id in olds {
                if old_matched.contains(old_id) || kind_of(nodes, *old_id) != Some(new_kind) {
                    continue;
                }
                if new_len == part.len() {
                    if new_matched.insert(new_id) {
                        old_matched.insert(*old_id);
                        to_sync.insert(*old_id, new_id);
                    }
                } else {
                    candidates.entry(*old_id).or_insert(new_id);
                }
                break 'parts;
            }
        }
    }

    let new_hashes = syntax_hashes(nodes, new_root);
    let old_hashes = syntax_hashes(nodes, old_root);
    for (hash, new_ids) in &new_hashes {
        let Some(old_ids) = old_hashes.get(hash) else {
            continue;
        };
        let unmatched_new = new_ids.iter().filter(|id| !new_matched.contains(*id));
        let unmatched_old = old_ids.iter().filter(|id| !old_matched.contains(*id));
        let pairs: Vec<(AstId, AstId)> = unmatched_new.copied().zip(unmatched_old.copied()).collect();
        for (new_id, old_id) in pairs {
            if kind_of(nodes, new_id) == kind_of(nodes, old_id) {
                to_sync.insert(old_id, new_id);
                old_matched.insert(old_id);
                new_matched.insert(new_id);
            }
        }
    }

    for (old_id, new_id) in candidates {
        if old_matched.contains(&old_id) || new_matched.contains(&new_id) {
            continue;
        }
        if kind_of(nodes, old_id) == kind_of(nodes, new_id) {
            to_sync.insert(old_id, new_id);
            old_matched.insert(old_id);
            new_matched.insert(new_id);
        }
    }
    to_sync
}

/// Syntax hash of every node in the subtree: equal for subtrees that print the
/// same way and were parsed the same way, independent of ids and metadata.
fn syntax_hashes(nodes: &NodeMap, root: AstId) -> BTreeMap<u32, Vec<AstId>> {
    let mut hashes = BTreeMap::new();
    hash_subtree(nodes, root, &mut hashes);
    hashes
}

fn hash_str(input: &str) -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(input.as_bytes());
    hasher.finalize()
}

fn hash_subtree(nodes: &NodeMap, id: AstId, out: &mut BTreeMap<u32, Vec<AstId>>) -> u32 {
    let Some(record) = nodes.get(&id) else {
        return 0;
    };
    let mut content = format!("{:?}:", record.fields.kind);
    for child in &record.fields.children {
        content.push_str(child.whitespace.as_deref().unwrap_or("?"));
        match &child.node {
            ChildNode::Token(token) => {
                content.push_str(&format!("Token:{:08x}", hash_str(&token.code)));
            }
            ChildNode::Ast(child_id) => {
                let child_hash = hash_subtree(nodes, *child_id, out);
                content.push_str(&format!("{child_hash:08x}"));
            }
        }
    }
    let hash = hash_str(&content);
    out.entry(hash).or_insert_with(Vec::new).insert(0, id);
    hash
}
