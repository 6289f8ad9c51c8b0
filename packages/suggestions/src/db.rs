//! # Suggestion Database
//!
//! All entities available in the current project, from the project itself and
//! from every imported library, as reported by the language server. Used for
//! code completion and for looking up information about called methods.
//!
//! Besides the entries, the database maintains indices that are updated on
//! every insertion and removal:
//!
//! - qualified name → entry ids
//! - entry name → entry ids (entries with conflicting names)
//! - parent qualified name → child ids, from which child ↔ parent lookups are
//!   answered in both directions

use crate::entry::{entry_qn, SuggestionEntry, SuggestionId, SuggestionKind};
use crate::ls_types::MethodPointer;
use crate::qualified_name::QualifiedName;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::hash::Hash;

/// Many-to-many index that can be queried in both directions.
#[derive(Debug)]
pub struct Index<K, V> {
    forward: HashMap<K, BTreeSet<V>>,
    reverse: HashMap<V, BTreeSet<K>>,
}

impl<K, V> Default for Index<K, V> {
    fn default() -> Self {
        Self {
            forward: HashMap::new(),
            reverse: HashMap::new(),
        }
    }
}

impl<K: Clone + Eq + Hash + Ord, V: Clone + Eq + Hash + Ord> Index<K, V> {
    pub fn insert(&mut self, key: K, value: V) {
        self.forward.entry(key.clone()).or_default().insert(value.clone());
        self.reverse.entry(value).or_default().insert(key);
    }

    /// Remove every pair with the given value.
    pub fn remove_value(&mut self, value: &V) {
        for key in self.reverse.remove(value).unwrap_or_default() {
            if let Some(values) = self.forward.get_mut(&key) {
                values.remove(value);
                if values.is_empty() {
                    self.forward.remove(&key);
                }
            }
        }
    }

    pub fn lookup(&self, key: &K) -> BTreeSet<V> {
        self.forward.get(key).cloned().unwrap_or_default()
    }

    pub fn reverse_lookup(&self, value: &V) -> BTreeSet<K> {
        self.reverse.get(value).cloned().unwrap_or_default()
    }

    pub fn clear(&mut self) {
        self.forward.clear();
        self.reverse.clear();
    }
}

#[derive(Debug, Default)]
pub struct SuggestionDb {
    entries: BTreeMap<SuggestionId, SuggestionEntry>,
    name_to_id: Index<QualifiedName, SuggestionId>,
    conflicting_names: Index<String, SuggestionId>,
    children_by_parent_name: Index<QualifiedName, SuggestionId>,
}

impl SuggestionDb {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: SuggestionId) -> Option<&SuggestionEntry> {
        self.entries.get(&id)
    }

    /// Insert or replace an entry, reindexing it.
    pub fn set(&mut self, id: SuggestionId, entry: SuggestionEntry) {
        self.unindex(id);
        let qualified_name = entry_qn(&entry);
        if let Some(parent) = qualified_name.parent() {
            self.children_by_parent_name.insert(parent, id);
        }
        self.name_to_id.insert(qualified_name, id);
        self.conflicting_names.insert(entry.name.clone(), id);
        self.entries.insert(id, entry);
    }

    pub fn delete(&mut self, id: SuggestionId) -> bool {
        self.unindex(id);
        self.entries.remove(&id).is_some()
    }

    fn unindex(&mut self, id: SuggestionId) {
        self.name_to_id.remove_value(&id);
        self.conflicting_names.remove_value(&id);
        self.children_by_parent_name.remove_value(&id);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.name_to_id.clear();
        self.conflicting_names.clear();
        self.children_by_parent_name.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (SuggestionId, &SuggestionEntry)> {
        self.entries.iter().map(|(id, entry)| (*id, entry))
    }

    /// Largest id in use, for adding entries locally.
    pub fn max_id(&self) -> Option<SuggestionId> {
        self.entries.keys().next_back().copied()
    }

    pub fn name_to_id(&self, name: &QualifiedName) -> BTreeSet<SuggestionId> {
        self.name_to_id.lookup(name)
    }

    /// Ids of entries sharing the given short name.
    pub fn conflicting_names(&self, name: &str) -> BTreeSet<SuggestionId> {
        self.conflicting_names.lookup(&name.to_string())
    }

    /// Ids of the entries whose qualified name is the parent of the child's.
    pub fn child_id_to_parent_id(&self, child: SuggestionId) -> BTreeSet<SuggestionId> {
        self.children_by_parent_name
            .reverse_lookup(&child)
            .iter()
            .flat_map(|parent| self.name_to_id.lookup(parent))
            .collect()
    }

    pub fn parent_id_to_child_ids(&self, parent: SuggestionId) -> BTreeSet<SuggestionId> {
        self.name_to_id
            .reverse_lookup(&parent)
            .iter()
            .flat_map(|name| self.children_by_parent_name.lookup(name))
            .collect()
    }

    pub fn get_entry_by_qualified_name(&self, name: &QualifiedName) -> Option<&SuggestionEntry> {
        let id = self.name_to_id.lookup(name).into_iter().next()?;
        self.get(id)
    }

    /// Find the method or function a method pointer from an expression update refers to.
    pub fn find_by_method_pointer(&self, method: &MethodPointer) -> Option<SuggestionId> {
        let owner = QualifiedName::parse(&method.defined_on_type).ok()?;
        let name = QualifiedName::parse(&method.name).ok()?;
        let qualified_name = owner.normalize().join(name.as_str());
        self.name_to_id.lookup(&qualified_name).into_iter().next()
    }

    pub fn entry_by_method_pointer(&self, method: &MethodPointer) -> Option<&SuggestionEntry> {
        let entry = self.get(self.find_by_method_pointer(method)?)?;
        entry.is_callable().then_some(entry)
    }

    /// Parent types of a type entry, nearest first.
    pub fn ancestors(&self, entry: &SuggestionEntry) -> Vec<QualifiedName> {
        let mut ancestors = Vec::new();
        let mut visited = HashSet::new();
        let mut current = entry;
        while current.kind == SuggestionKind::Type {
            let Some(parent_type) = &current.parent_type else {
                break;
            };
            if !visited.insert(parent_type.clone()) {
                break;
            }
            ancestors.push(parent_type.clone());
            match self.get_entry_by_qualified_name(parent_type) {
                Some(parent) => current = parent,
                None => break,
            }
        }
        ancestors
    }
}
