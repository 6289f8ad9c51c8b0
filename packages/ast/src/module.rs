//! # Modules and Edit Sessions
//!
//! A [`Module`] is an immutable snapshot: an arena of node records plus a root.
//! [`Module::edit`] opens a copy-on-write [`MutableModule`]; records are cloned
//! only when a session writes to them, so records the session never touches stay
//! pointer-equal to the snapshot's. Committing a session garbage-collects nodes
//! unreachable from the root and reports what changed as a [`ModuleUpdate`].

use crate::construct::Wildcard;
use crate::error::{AstError, AstResult};
use crate::id::{AstId, ExternalId, IdGenerator};
use crate::lower;
use crate::node::{Child, ChildNode, Node, NodeFields, NodeKind, NodeMap, NodeMetadata, NodeRecord, Owned, Position};
use enso_common::Origin;
use enso_parser::TreeKind;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::debug;

/// Changes made by a commit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModuleUpdate {
    pub nodes_added: Vec<AstId>,
    pub fields_updated: Vec<AstId>,
    pub metadata_updated: Vec<AstId>,
    pub nodes_deleted: Vec<AstId>,
    pub root_changed: bool,
    pub origin: Option<Origin>,
}

impl ModuleUpdate {
    pub fn is_empty(&self) -> bool {
        self.nodes_added.is_empty()
            && self.fields_updated.is_empty()
            && self.metadata_updated.is_empty()
            && self.nodes_deleted.is_empty()
            && !self.root_changed
    }

    /// Nodes that were added or whose fields or metadata changed.
    pub fn nodes_changed(&self) -> impl Iterator<Item = AstId> + '_ {
        let mut seen = HashSet::new();
        self.nodes_added
            .iter()
            .chain(&self.fields_updated)
            .chain(&self.metadata_updated)
            .copied()
            .filter(move |id| seen.insert(*id))
    }
}

fn diff(old: &NodeMap, new: &NodeMap) -> ModuleUpdate {
    let mut update = ModuleUpdate::default();
    for (id, record) in new {
        match old.get(id) {
            None => update.nodes_added.push(*id),
            Some(previous) if Arc::ptr_eq(previous, record) => {}
            Some(previous) => {
                if previous.fields != record.fields {
                    update.fields_updated.push(*id);
                }
                if previous.metadata != record.metadata {
                    update.metadata_updated.push(*id);
                }
            }
        }
    }
    update.nodes_deleted = old.keys().filter(|id| !new.contains_key(id)).copied().collect();
    update.nodes_added.sort();
    update.fields_updated.sort();
    update.metadata_updated.sort();
    update.nodes_deleted.sort();
    update
}

fn reachable(nodes: &NodeMap, root: Option<AstId>) -> HashSet<AstId> {
    let mut seen = HashSet::new();
    let mut stack: Vec<AstId> = root.into_iter().collect();
    while let Some(id) = stack.pop() {
        if !seen.insert(id) {
            continue;
        }
        if let Some(record) = nodes.get(&id) {
            stack.extend(record.ast_children());
        }
    }
    seen
}

#[derive(Debug, Clone)]
pub struct Module {
    nodes: Arc<NodeMap>,
    root: Option<AstId>,
    ids: IdGenerator,
    generation: u64,
}

impl Module {
    pub fn empty(ids: IdGenerator) -> Self {
        Self {
            nodes: Arc::new(NodeMap::new()),
            root: None,
            ids,
            generation: 0,
        }
    }

    pub fn parse(code: &str, ids: IdGenerator) -> AstResult<Self> {
        let mut module = Self::empty(ids);
        let mut edit = module.edit();
        let root = edit.parse_block(code)?;
        edit.set_root(root);
        module.apply_edit(edit);
        Ok(module)
    }

    /// Parse a module whose ids are derived from `name`.
    pub fn parse_with_name(code: &str, name: &str) -> AstResult<Self> {
        Self::parse(code, IdGenerator::new(name, 0))
    }

    pub fn ids(&self) -> &IdGenerator {
        &self.ids
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn root_id(&self) -> Option<AstId> {
        self.root
    }

    pub fn root(&self) -> Option<Node<'_>> {
        self.root.and_then(|id| self.get(id))
    }

    pub fn get(&self, id: AstId) -> Option<Node<'_>> {
        Node::lookup(&self.nodes, id)
    }

    pub fn contains(&self, id: AstId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn record(&self, id: AstId) -> Option<&Arc<NodeRecord>> {
        self.nodes.get(&id)
    }

    pub fn records(&self) -> impl Iterator<Item = &Arc<NodeRecord>> {
        self.nodes.values()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn code(&self) -> String {
        self.root().map(|root| root.code()).unwrap_or_default()
    }

    /// Open a copy-on-write edit session.
    pub fn edit(&self) -> MutableModule {
        MutableModule {
            nodes: (*self.nodes).clone(),
            root: self.root,
            ids: self.ids.clone(),
        }
    }

    /// Replace this module's contents with the session's, dropping unreachable nodes.
    pub fn apply_edit(&mut self, edit: MutableModule) -> ModuleUpdate {
        self.commit(edit.nodes, edit.root, None)
    }

    /// As [`Module::apply_edit`], tagging the update with its origin.
    pub fn commit_edit(&mut self, edit: MutableModule, origin: Origin) -> ModuleUpdate {
        self.commit(edit.nodes, edit.root, Some(origin))
    }

    /// Apply records received from elsewhere (e.g. a collaborator). Records equal
    /// to the current ones are left untouched.
    pub fn apply_record_changes(
        &mut self,
        upserts: Vec<NodeRecord>,
        deletes: &[AstId],
        root: Option<AstId>,
        origin: Option<Origin>,
    ) -> ModuleUpdate {
        let mut nodes = (*self.nodes).clone();
        for id in deletes {
            nodes.remove(id);
        }
        for record in upserts {
            self.ids.observe(record.id);
            let unchanged = nodes.get(&record.id).is_some_and(|current| **current == record);
            if !unchanged {
                nodes.insert(record.id, Arc::new(record));
            }
        }
        self.commit(nodes, root, origin)
    }

    fn commit(&mut self, mut nodes: NodeMap, root: Option<AstId>, origin: Option<Origin>) -> ModuleUpdate {
        let live = reachable(&nodes, root);
        nodes.retain(|id, _| live.contains(id));

        let mut update = diff(&self.nodes, &nodes);
        update.root_changed = self.root != root;
        update.origin = origin;
        if !update.is_empty() {
            self.generation += 1;
            debug!(
                generation = self.generation,
                added = update.nodes_added.len(),
                updated = update.fields_updated.len(),
                deleted = update.nodes_deleted.len(),
                "module updated"
            );
        }
        self.nodes = Arc::new(nodes);
        self.root = root;
        update
    }
}

/// Copy-on-write edit session over a module.
#[derive(Debug, Clone)]
pub struct MutableModule {
    nodes: NodeMap,
    root: Option<AstId>,
    ids: IdGenerator,
}

impl MutableModule {
    /// A scratch session not derived from any module.
    pub fn transient() -> Self {
        Self {
            nodes: NodeMap::new(),
            root: None,
            ids: IdGenerator::transient(),
        }
    }

    pub fn ids(&self) -> &IdGenerator {
        &self.ids
    }

    pub fn root_id(&self) -> Option<AstId> {
        self.root
    }

    pub fn root(&self) -> Option<Node<'_>> {
        self.root.and_then(|id| self.try_get(id))
    }

    /// Make `root` the module root. The previous root becomes unreachable.
    pub fn set_root(&mut self, root: Owned) {
        self.root = Some(root.id());
    }

    pub fn code(&self) -> String {
        self.root().map(|root| root.code()).unwrap_or_default()
    }

    pub fn try_get(&self, id: AstId) -> Option<Node<'_>> {
        Node::lookup(&self.nodes, id)
    }

    /// Resolve a node (typically obtained from another generation of the module) in this session.
    pub fn get_version(&self, id: AstId) -> AstResult<Node<'_>> {
        self.try_get(id).ok_or(AstError::NodeNotFound(id))
    }

    pub(crate) fn nodes(&self) -> &NodeMap {
        &self.nodes
    }

    pub(crate) fn record_mut(&mut self, id: AstId) -> AstResult<&mut NodeRecord> {
        self.nodes
            .get_mut(&id)
            .map(Arc::make_mut)
            .ok_or(AstError::NodeNotFound(id))
    }

    /// Overwrite the fields of `id` unless they are already equal.
    pub(crate) fn set_fields(&mut self, id: AstId, kind: NodeKind, children: Vec<Child>) -> AstResult<()> {
        let current = self.get_version(id)?.record();
        if current.fields.kind == kind && current.fields.children == children {
            return Ok(());
        }
        let record = self.record_mut(id)?;
        record.fields.kind = kind;
        record.fields.children = children;
        Ok(())
    }

    pub(crate) fn set_parent(&mut self, id: AstId, parent: Option<AstId>) -> AstResult<()> {
        if self.get_version(id)?.parent() != parent {
            self.record_mut(id)?.fields.parent = parent;
        }
        Ok(())
    }

    /// Create a node with the given children, adopting the child nodes.
    pub fn insert_node(&mut self, kind: NodeKind, children: Vec<Child>) -> Owned {
        let id = self.ids.next_ast_id();
        for child in children.iter().filter_map(Child::ast_id) {
            if let Some(record) = self.nodes.get_mut(&child) {
                Arc::make_mut(record).fields.parent = Some(id);
            }
        }
        let record = NodeRecord {
            id,
            fields: NodeFields {
                kind,
                parent: None,
                children,
            },
            metadata: NodeMetadata::new(self.ids.new_external_id()),
        };
        self.nodes.insert(id, Arc::new(record));
        Owned::new(id)
    }

    fn replace_child_ref(&mut self, parent: AstId, old: AstId, new: AstId) -> AstResult<()> {
        let record = self.record_mut(parent)?;
        let slot = record
            .fields
            .children
            .iter_mut()
            .find(|child| child.ast_id() == Some(old))
            .ok_or(AstError::NotAChild { parent, child: old })?;
        slot.node = ChildNode::Ast(new);
        Ok(())
    }

    /// Put `replacement` where `target` is. The parent now refers to the
    /// replacement; `target` keeps its identity and is returned detached.
    pub fn replace(&mut self, target: AstId, replacement: Owned) -> AstResult<Owned> {
        let new = replacement.id();
        match self.get_version(target)?.parent() {
            Some(parent) => {
                self.replace_child_ref(parent, target, new)?;
                self.set_parent(new, Some(parent))?;
            }
            None if self.root == Some(target) => {
                self.root = Some(new);
            }
            None => return Err(AstError::Detached(target)),
        }
        self.set_parent(target, None)?;
        Ok(Owned::new(target))
    }

    /// Replace the value in `target`'s slot while keeping the slot's identity:
    /// the replacement takes over `target`'s metadata (including its external
    /// id), and the old value is returned detached with a fresh external id.
    pub fn replace_value(&mut self, target: AstId, replacement: Owned) -> AstResult<Owned> {
        let metadata = self.get_version(target)?.metadata().clone();
        let new = replacement.id();
        let old = self.replace(target, replacement)?;
        self.record_mut(new)?.metadata = metadata;
        let fresh = self.ids.new_external_id();
        self.record_mut(target)?.metadata.external_id = fresh;
        Ok(old)
    }

    /// Detach `target`, leaving a `_` placeholder in its place.
    pub fn take(&mut self, target: AstId) -> AstResult<Owned> {
        let placeholder = Wildcard::new(self);
        self.replace(target, placeholder)
    }

    /// Detach `target`'s value, leaving a `_` placeholder that keeps its metadata.
    pub fn take_value(&mut self, target: AstId) -> AstResult<Owned> {
        let placeholder = Wildcard::new(self);
        self.replace_value(target, placeholder)
    }

    /// Take the value out of `target`'s slot, transform it, and put the result
    /// back with the slot's metadata. Returns the id of the new value.
    pub fn update_value<F>(&mut self, target: AstId, f: F) -> AstResult<AstId>
    where
        F: FnOnce(&mut MutableModule, Owned) -> AstResult<Owned>,
    {
        let placeholder = Wildcard::new(self);
        let placeholder_id = placeholder.id();
        let value = self.replace_value(target, placeholder)?;
        let new_value = f(self, value)?;
        let new_id = new_value.id();
        let _placeholder = self.replace_value(placeholder_id, new_value)?;
        Ok(new_id)
    }

    /// Replace the argument of an application.
    pub fn set_argument(&mut self, app: AstId, argument: Owned) -> AstResult<()> {
        let node = self.get_version(app)?;
        if node.kind() != NodeKind::App {
            return Err(AstError::WrongKind {
                id: app,
                expected: NodeKind::App,
                found: node.kind(),
            });
        }
        let current = node.child(1).ok_or(AstError::NodeNotFound(app))?.id();
        let _old = self.replace(current, argument)?;
        Ok(())
    }

    /// Deep copy of a subtree of this session, with fresh ids.
    pub fn copy(&mut self, id: AstId) -> AstResult<Owned> {
        let records = collect_subtree(&self.nodes, id)?;
        Ok(self.insert_copies(records))
    }

    /// Deep copy of a subtree of any module into this session, with fresh ids.
    pub fn import(&mut self, node: Node<'_>) -> Owned {
        let mut records = Vec::new();
        node.visit_recursive(&mut |n| {
            records.push(n.record().clone());
            true
        });
        self.insert_copies(records)
    }

    fn insert_copies(&mut self, records: Vec<NodeRecord>) -> Owned {
        let remap: HashMap<AstId, AstId> = records
            .iter()
            .map(|record| (record.id, self.ids.next_ast_id()))
            .collect();
        let mut root = None;
        for record in records {
            let id = remap[&record.id];
            let parent = record.fields.parent.and_then(|p| remap.get(&p).copied());
            if root.is_none() {
                root = Some(id);
            }
            let children = record
                .fields
                .children
                .into_iter()
                .map(|child| Child {
                    whitespace: child.whitespace,
                    node: match child.node {
                        ChildNode::Ast(old) => ChildNode::Ast(remap.get(&old).copied().unwrap_or(old)),
                        token => token,
                    },
                })
                .collect();
            let mut metadata = record.metadata;
            metadata.external_id = self.ids.new_external_id();
            let copy = NodeRecord {
                id,
                fields: NodeFields {
                    kind: record.fields.kind,
                    parent: if root == Some(id) { None } else { parent },
                    children,
                },
                metadata,
            };
            self.nodes.insert(id, Arc::new(copy));
        }
        // `records` is never empty: it always holds at least the copied root.
        Owned::new(root.unwrap_or_else(|| self.ids.next_ast_id()))
    }

    /// Parse text as a block into a detached subtree.
    pub fn parse_block(&mut self, code: &str) -> AstResult<Owned> {
        let tree = enso_parser::parse_block(code)?;
        Ok(lower::lower(self, &tree, code))
    }

    /// Parse text as a single expression into a detached subtree.
    pub fn parse_expression(&mut self, code: &str) -> AstResult<Owned> {
        let tree = enso_parser::parse_expression(code)?
            .ok_or_else(|| AstError::NotAnExpression(code.to_string()))?;
        debug_assert!(tree.kind != TreeKind::BodyBlock);
        Ok(lower::lower(self, &tree, code))
    }

    pub fn set_external_id(&mut self, id: AstId, external_id: ExternalId) -> AstResult<()> {
        self.record_mut(id)?.metadata.external_id = external_id;
        Ok(())
    }

    pub fn set_position(&mut self, id: AstId, position: Option<Position>) -> AstResult<()> {
        if self.get_version(id)?.metadata().position != position {
            self.record_mut(id)?.metadata.position = position;
        }
        Ok(())
    }

    pub fn set_widget_metadata(&mut self, id: AstId, widget: &str, value: serde_json::Value) -> AstResult<()> {
        self.record_mut(id)?.metadata.widget.insert(widget.to_string(), value);
        Ok(())
    }

    pub(crate) fn set_metadata(&mut self, id: AstId, metadata: NodeMetadata) -> AstResult<()> {
        if self.get_version(id)?.metadata() != &metadata {
            self.record_mut(id)?.metadata = metadata;
        }
        Ok(())
    }
}

fn collect_subtree(nodes: &NodeMap, id: AstId) -> AstResult<Vec<NodeRecord>> {
    let root = Node::lookup(nodes, id).ok_or(AstError::NodeNotFound(id))?;
    let mut records = Vec::new();
    root.visit_recursive(&mut |n| {
        records.push(n.record().clone());
        true
    });
    Ok(records)
}
