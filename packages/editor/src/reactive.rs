//! # Reactive Module
//!
//! A [`Module`] mirrored into a `yrs` document. Node fields and node metadata
//! are stored under per-node keys of two separate maps (`nodes` and
//! `metadata`), and the root id in a third (`module`), so every part is an
//! independently observable container.
//!
//! Observers registered on the maps record which keys a transaction touched.
//! After the transaction those keys drive two things:
//!
//! - changed records are read back into the module, which is how remote updates
//!   reach it (for local edits the records are already there and nothing changes)
//! - effects that read a touched key are marked dirty and re-run on the next
//!   [`ReactiveModule::flush`]
//!
//! ```rust,ignore
//! let mut module = ReactiveModule::new(parse_module("x = f 1")?)?;
//! module.effect(move |view| println!("{:?}", view.code(value)));
//! module.apply_edit(edit, Origin::user_action("GraphEditor"))?;
//! module.flush(); // re-runs the effect only if `value` changed
//! ```

use crate::errors::{EditorError, EditorResult};
use enso_ast::{AstId, Module, ModuleUpdate, MutableModule, Node, NodeFields, NodeMetadata, NodeRecord, SourceDocument};
use enso_common::Origin;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};
use yrs::types::map::MapEvent;
use yrs::updates::decoder::Decode;
use yrs::updates::encoder::Encode;
use yrs::{Doc, Map, MapRef, Observable, ReadTxn, StateVector, Subscription, Transact, TransactionMut, Update};

const NODES: &str = "nodes";
const METADATA: &str = "metadata";
const MODULE: &str = "module";
const ROOT_KEY: &str = "root";

/// A piece of module state an effect can depend on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dependency {
    Root,
    Fields(AstId),
    Metadata(AstId),
}

/// Keys touched by `yrs` transactions since the last drain.
#[derive(Debug, Default)]
struct ChangeLog {
    fields: BTreeSet<String>,
    metadata: BTreeSet<String>,
    root: bool,
    origin: Option<String>,
}

type SharedLog = Arc<Mutex<ChangeLog>>;

fn observe_keys(
    log: &SharedLog,
    select: fn(&mut ChangeLog) -> &mut BTreeSet<String>,
) -> impl Fn(&TransactionMut, &MapEvent) + Send + Sync + 'static {
    let log = log.clone();
    move |txn, event| {
        let Ok(mut log) = log.lock() else { return };
        log.origin = txn
            .origin()
            .map(|origin| String::from_utf8_lossy(origin.as_ref()).into_owned());
        let keys: Vec<String> = event.keys(txn).keys().map(|key| key.to_string()).collect();
        select(&mut *log).extend(keys);
    }
}

fn observe_root(log: &SharedLog) -> impl Fn(&TransactionMut, &MapEvent) + Send + Sync + 'static {
    let log = log.clone();
    move |txn, _event| {
        if let Ok(mut log) = log.lock() {
            log.root = true;
            log.origin = txn
                .origin()
                .map(|origin| String::from_utf8_lossy(origin.as_ref()).into_owned());
        }
    }
}

fn to_json<T: Serialize>(key: &str, value: &T) -> EditorResult<String> {
    serde_json::to_string(value).map_err(|source| EditorError::InvalidRecord {
        key: key.to_string(),
        source,
    })
}

fn read_json<T: DeserializeOwned, Txn: ReadTxn>(map: &MapRef, txn: &Txn, key: &str) -> EditorResult<Option<T>> {
    let Some(value) = map.get(txn, key) else {
        return Ok(None);
    };
    let json = value.to_string(txn);
    serde_json::from_str(&json)
        .map(Some)
        .map_err(|source| EditorError::InvalidRecord {
            key: key.to_string(),
            source,
        })
}

/// Read-only view of the module that records what it was asked for.
pub struct Tracked<'a> {
    module: &'a Module,
    dependencies: RefCell<HashSet<Dependency>>,
}

impl<'a> Tracked<'a> {
    fn new(module: &'a Module) -> Self {
        Self {
            module,
            dependencies: RefCell::new(HashSet::new()),
        }
    }

    fn track(&self, dependency: Dependency) {
        self.dependencies.borrow_mut().insert(dependency);
    }

    pub fn root_id(&self) -> Option<AstId> {
        self.track(Dependency::Root);
        self.module.root_id()
    }

    pub fn fields(&self, id: AstId) -> Option<&'a NodeFields> {
        self.track(Dependency::Fields(id));
        self.module.record(id).map(|record| &record.fields)
    }

    pub fn metadata(&self, id: AstId) -> Option<&'a NodeMetadata> {
        self.track(Dependency::Metadata(id));
        self.module.record(id).map(|record| &record.metadata)
    }

    pub fn parent(&self, id: AstId) -> Option<AstId> {
        self.fields(id).and_then(|fields| fields.parent)
    }

    /// Code of a subtree; depends on the fields of every node in it.
    pub fn code(&self, id: AstId) -> Option<String> {
        self.track(Dependency::Fields(id));
        let node = self.module.get(id)?;
        node.visit_recursive(&mut |descendant| {
            self.track(Dependency::Fields(descendant.id()));
            true
        });
        Some(node.code())
    }

    /// The node itself. Only its own fields are tracked; reads through the
    /// returned view (children, parent) are not.
    pub fn node(&self, id: AstId) -> Option<Node<'a>> {
        self.track(Dependency::Fields(id));
        self.module.get(id)
    }

    fn into_dependencies(self) -> HashSet<Dependency> {
        self.dependencies.into_inner()
    }
}

pub type EffectId = usize;

type EffectFn = Box<dyn FnMut(&Tracked<'_>)>;

struct Effect {
    run: EffectFn,
    dependencies: HashSet<Dependency>,
}

fn run_tracked(module: &Module, run: &mut EffectFn) -> HashSet<Dependency> {
    let tracked = Tracked::new(module);
    run(&tracked);
    tracked.into_dependencies()
}

pub struct ReactiveModule {
    module: Module,
    doc: Doc,
    nodes: MapRef,
    metadata: MapRef,
    info: MapRef,
    log: SharedLog,
    subscriptions: Vec<Subscription>,
    source: SourceDocument,
    effects: BTreeMap<EffectId, Effect>,
    next_effect: EffectId,
    dirty: HashSet<Dependency>,
}

impl ReactiveModule {
    /// Mirror `module` into a fresh document. An empty module makes a replica
    /// that is filled by [`ReactiveModule::apply_update`].
    pub fn new(module: Module) -> EditorResult<Self> {
        let doc = Doc::new();
        let nodes = doc.get_or_insert_map(NODES);
        let metadata = doc.get_or_insert_map(METADATA);
        let info = doc.get_or_insert_map(MODULE);
        let log = SharedLog::default();
        let subscriptions = vec![
            nodes.observe(observe_keys(&log, |log| &mut log.fields)),
            metadata.observe(observe_keys(&log, |log| &mut log.metadata)),
            info.observe(observe_root(&log)),
        ];

        let mut reactive = Self {
            module,
            doc,
            nodes,
            metadata,
            info,
            log,
            subscriptions,
            source: SourceDocument::new(),
            effects: BTreeMap::new(),
            next_effect: 0,
            dirty: HashSet::new(),
        };

        let initial = ModuleUpdate {
            nodes_added: reactive.module.records().map(|record| record.id).collect(),
            root_changed: reactive.module.root_id().is_some(),
            origin: Some(Origin::Local),
            ..ModuleUpdate::default()
        };
        {
            let mut txn = reactive.doc.transact_mut_with(Origin::Local.to_string().as_str());
            reactive.write_update(&mut txn, &initial)?;
        }
        reactive.take_log()?;
        reactive.source.apply_update(&reactive.module, &initial);
        Ok(reactive)
    }

    pub fn module(&self) -> &Module {
        &self.module
    }

    pub fn source(&self) -> &SourceDocument {
        &self.source
    }

    pub fn source_mut(&mut self) -> &mut SourceDocument {
        &mut self.source
    }

    pub fn doc(&self) -> &Doc {
        &self.doc
    }

    pub fn code(&self) -> String {
        self.module.code()
    }

    pub fn generation(&self) -> u64 {
        self.module.generation()
    }

    pub fn edit(&self) -> MutableModule {
        self.module.edit()
    }

    pub fn is_disposed(&self) -> bool {
        self.subscriptions.is_empty()
    }

    /// Commit an edit session, writing the records it changed in one transaction tagged with `origin`.
    pub fn apply_edit(&mut self, edit: MutableModule, origin: Origin) -> EditorResult<ModuleUpdate> {
        let update = self.module.commit_edit(edit, origin.clone());
        if update.is_empty() {
            return Ok(update);
        }
        {
            let mut txn = self.doc.transact_mut_with(origin.to_string().as_str());
            self.write_update(&mut txn, &update)?;
        }
        let echoed = self.process_changes()?;
        if !echoed.is_empty() {
            warn!(origin = %origin, "document and module diverged while committing an edit");
        }
        self.source.apply_update(&self.module, &update);
        Ok(update)
    }

    /// Apply a `yrs` v1 update received from a collaborator.
    pub fn apply_update(&mut self, bytes: &[u8]) -> EditorResult<ModuleUpdate> {
        let update = Update::decode_v1(bytes).map_err(|err| EditorError::Crdt(err.to_string()))?;
        {
            let mut txn = self.doc.transact_mut_with(Origin::Remote.to_string().as_str());
            txn.apply_update(update)
                .map_err(|err| EditorError::Crdt(err.to_string()))?;
        }
        let update = self.process_changes()?;
        if !update.is_empty() {
            debug!(
                added = update.nodes_added.len(),
                updated = update.fields_updated.len(),
                deleted = update.nodes_deleted.len(),
                "applied collaborator update"
            );
            self.source.apply_update(&self.module, &update);
        }
        Ok(update)
    }

    /// The whole document state, for a collaborator starting from scratch.
    pub fn encode_state_as_update(&self) -> Vec<u8> {
        self.doc.transact().encode_state_as_update_v1(&StateVector::default())
    }

    pub fn state_vector(&self) -> Vec<u8> {
        self.doc.transact().state_vector().encode_v1()
    }

    /// Changes the collaborator with the given state vector has not seen.
    pub fn encode_diff(&self, state_vector: &[u8]) -> EditorResult<Vec<u8>> {
        let remote = StateVector::decode_v1(state_vector).map_err(|err| EditorError::Crdt(err.to_string()))?;
        Ok(self.doc.transact().encode_state_as_update_v1(&remote))
    }

    /// Run `f` now and again on every [`flush`](Self::flush) after something it read changed.
    pub fn effect<F>(&mut self, f: F) -> EffectId
    where
        F: FnMut(&Tracked<'_>) + 'static,
    {
        let id = self.next_effect;
        self.next_effect += 1;
        let mut run: EffectFn = Box::new(f);
        let dependencies = run_tracked(&self.module, &mut run);
        self.effects.insert(id, Effect { run, dependencies });
        id
    }

    pub fn remove_effect(&mut self, id: EffectId) -> bool {
        self.effects.remove(&id).is_some()
    }

    /// Re-run the effects whose dependencies changed since the last flush.
    /// Returns the number of effects that ran.
    pub fn flush(&mut self) -> usize {
        let dirty = std::mem::take(&mut self.dirty);
        if dirty.is_empty() {
            return 0;
        }
        let mut ran = 0;
        for effect in self.effects.values_mut() {
            if effect.dependencies.is_disjoint(&dirty) {
                continue;
            }
            effect.dependencies = run_tracked(&self.module, &mut effect.run);
            ran += 1;
        }
        ran
    }

    /// Unregister the document observers and drop all effects.
    pub fn dispose(&mut self) {
        self.subscriptions.clear();
        self.effects.clear();
        self.dirty.clear();
    }

    fn write_update(&self, txn: &mut TransactionMut, update: &ModuleUpdate) -> EditorResult<()> {
        let fields: BTreeSet<AstId> = update.nodes_added.iter().chain(&update.fields_updated).copied().collect();
        let metadata: BTreeSet<AstId> = update.nodes_added.iter().chain(&update.metadata_updated).copied().collect();
        for id in fields {
            if let Some(record) = self.module.record(id) {
                let key = id.to_string();
                let json = to_json(&key, &record.fields)?;
                self.nodes.insert(txn, key, json);
            }
        }
        for id in metadata {
            if let Some(record) = self.module.record(id) {
                let key = id.to_string();
                let json = to_json(&key, &record.metadata)?;
                self.metadata.insert(txn, key, json);
            }
        }
        for id in &update.nodes_deleted {
            let key = id.to_string();
            self.nodes.remove(txn, &key);
            self.metadata.remove(txn, &key);
        }
        if update.root_changed {
            match self.module.root_id() {
                Some(root) => {
                    self.info.insert(txn, ROOT_KEY, root.to_string());
                }
                None => {
                    self.info.remove(txn, ROOT_KEY);
                }
            }
        }
        Ok(())
    }

    fn take_log(&mut self) -> EditorResult<ChangeLog> {
        let log = self
            .log
            .lock()
            .map(|mut log| std::mem::take(&mut *log))
            .map_err(|_| EditorError::Crdt("change log poisoned".to_string()))?;
        for key in &log.fields {
            self.dirty.insert(Dependency::Fields(key.parse()?));
        }
        for key in &log.metadata {
            self.dirty.insert(Dependency::Metadata(key.parse()?));
        }
        if log.root {
            self.dirty.insert(Dependency::Root);
        }
        Ok(log)
    }

    /// Bring the module up to date with the records touched in the document.
    fn process_changes(&mut self) -> EditorResult<ModuleUpdate> {
        let log = self.take_log()?;
        let txn = self.doc.transact();
        let mut upserts = Vec::new();
        let mut deletes = Vec::new();
        for key in log.fields.union(&log.metadata) {
            let id: AstId = key.parse()?;
            let fields: Option<NodeFields> = read_json(&self.nodes, &txn, key)?;
            let metadata: Option<NodeMetadata> = read_json(&self.metadata, &txn, key)?;
            match (fields, metadata) {
                (Some(fields), Some(metadata)) => upserts.push(NodeRecord { id, fields, metadata }),
                (None, _) => deletes.push(id),
                (Some(_), None) => debug!(node = %id, "node fields arrived without metadata"),
            }
        }
        let root = match self.info.get(&txn, ROOT_KEY) {
            Some(value) => Some(value.to_string(&txn).parse()?),
            None => None,
        };
        drop(txn);

        if upserts.is_empty() && deletes.is_empty() && root == self.module.root_id() {
            return Ok(ModuleUpdate::default());
        }
        let origin = log.origin.map(Origin::from);
        Ok(self.module.apply_record_changes(upserts, &deletes, root, origin))
    }
}

impl Drop for ReactiveModule {
    fn drop(&mut self) {
        self.dispose();
    }
}
