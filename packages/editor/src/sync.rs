//! # Code Editor Synchronization
//!
//! Keeps a text editor and a module consistent in both directions.
//!
//! ```text
//!            dispatch                 run_scheduled
//!   Idle ──────────────▶ Accumulating ──────────────▶ Committing ──▶ Idle
//!                            ▲    │ dispatch                │
//!                            └────┘                         ▼ failure
//!                                                       Reverting ──▶ Idle
//! ```
//!
//! Local transactions are composed into one pending change set, and a commit
//! is (re)scheduled in a single-slot [`Debouncer`]; the host runs it once per
//! tick, so a burst of keystrokes becomes one module edit. A commit applies the
//! pending edits to a module edit session, and the result must reproduce the
//! editor text exactly. Otherwise the editor is reverted to its state before the
//! burst, and reset to the module's code if that still differs.
//!
//! Module changes from anyone else arrive as [`SourceChange`]s and are applied
//! to the editor as synchronized transactions, which are never fed back. If
//! local changes are pending at that point, they are rebased onto the new
//! module code and committed, so neither side's edits are lost.

use crate::change_set::{Assoc, ChangeSet};
use crate::debounce::Debouncer;
use crate::errors::{EditorError, EditorResult};
use crate::notification::Notifier;
use crate::reactive::ReactiveModule;
use crate::state::{EditorState, Selection, Transaction};
use enso_ast::{ModuleUpdate, SourceChange};
use enso_common::text::text_change_to_edits;
use enso_common::{CodeEditorConfig, Origin, TextEdit};
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    Idle,
    Accumulating,
    Committing,
    Reverting,
}

/// Local changes not yet applied to the module.
#[derive(Debug)]
struct PendingEdit {
    changes: ChangeSet,
    doc_before: String,
    selection_before: Selection,
}

type CommitTask = fn(&mut SyncEngine, &mut ReactiveModule);

pub struct SyncEngine {
    state: EditorState,
    sync_state: SyncState,
    pending: Option<PendingEdit>,
    debouncer: Debouncer<CommitTask>,
    origin: Origin,
    source_changes: Option<UnboundedReceiver<SourceChange>>,
    synced_generation: u64,
    notifier: Notifier,
    commits: usize,
}

impl SyncEngine {
    pub fn new(config: &CodeEditorConfig, notifier: Notifier) -> Self {
        Self {
            state: EditorState::default(),
            sync_state: SyncState::Idle,
            pending: None,
            debouncer: Debouncer::new(),
            origin: Origin::user_action(config.origin_component.clone()),
            source_changes: None,
            synced_generation: 0,
            notifier,
            commits: 0,
        }
    }

    /// Tag carried by the module edits this engine commits.
    pub fn origin(&self) -> &Origin {
        &self.origin
    }

    pub fn state(&self) -> &EditorState {
        &self.state
    }

    pub fn sync_state(&self) -> SyncState {
        self.sync_state
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Number of module edits committed so far.
    pub fn commits(&self) -> usize {
        self.commits
    }

    /// Start following `module` and show its code.
    pub fn connect(&mut self, module: &mut ReactiveModule) {
        self.source_changes = Some(module.source_mut().observe());
        self.reset_view(module);
    }

    pub fn disconnect(&mut self) {
        self.source_changes = None;
        self.pending = None;
        self.debouncer.cancel();
        self.sync_state = SyncState::Idle;
    }

    /// Apply an editor transaction. Local changes are queued for the module.
    pub fn dispatch(&mut self, transaction: Transaction) -> EditorResult<()> {
        if transaction.synchronized || !transaction.doc_changed() {
            return self.state.apply(&transaction);
        }
        let snapshot = self
            .pending
            .is_none()
            .then(|| (self.state.doc().to_string(), self.state.selection()));
        self.state.apply(&transaction)?;

        if let Some(pending) = &mut self.pending {
            pending.changes = pending.changes.compose(&transaction.changes)?;
        } else if let Some((doc_before, selection_before)) = snapshot {
            self.pending = Some(PendingEdit {
                changes: transaction.changes,
                doc_before,
                selection_before,
            });
        }
        self.sync_state = SyncState::Accumulating;
        if self.debouncer.schedule(Self::commit_pending_changes as CommitTask) {
            debug!(coalesced = self.debouncer.coalesced(), "coalescing editor changes");
        }
        Ok(())
    }

    /// Run the commit scheduled by local transactions, if any.
    pub fn run_scheduled(&mut self, module: &mut ReactiveModule) -> bool {
        match self.debouncer.take() {
            Some(task) => {
                task(self, module);
                true
            }
            None => false,
        }
    }

    /// Commit pending local changes now instead of on the next tick.
    pub fn commit_pending(&mut self, module: &mut ReactiveModule) {
        self.commit_pending_changes(module);
    }

    /// Hook run before another party edits the module: pending local changes go
    /// in first, so both edits start from the same code.
    pub fn before_module_edit(&mut self, module: &mut ReactiveModule, origin: &Origin) {
        if self.pending.is_some() && origin != &self.origin {
            debug!(%origin, "committing editor changes before module edit");
            self.commit_pending_changes(module);
        }
    }

    fn commit_pending_changes(&mut self, module: &mut ReactiveModule) {
        self.debouncer.cancel();
        self.receive_source_changes(module);
        let Some(pending) = self.pending.take() else {
            return;
        };
        self.sync_state = SyncState::Committing;
        match self.try_commit(module, &pending.changes) {
            Ok(update) => {
                self.commits += 1;
                self.synced_generation = module.generation();
                self.sync_state = SyncState::Idle;
                debug!(changed = update.nodes_changed().count(), "code editor changes committed");
                self.check_sync(module);
            }
            Err(err) => {
                error!(error = %err, "code editor failed to modify module");
                self.notifier.error(format!("Code editor failed to modify module: {err}"));
                self.revert(module, pending);
            }
        }
    }

    fn try_commit(&mut self, module: &mut ReactiveModule, changes: &ChangeSet) -> EditorResult<ModuleUpdate> {
        let current = module.generation();
        if current != self.synced_generation {
            return Err(EditorError::StaleModule {
                synced: self.synced_generation,
                current,
            });
        }
        let mut edit = module.edit();
        match edit.root_id() {
            Some(root) => edit.apply_text_edits(root, &changes.to_text_edits())?,
            None => edit.sync_root_to_code(self.state.doc())?,
        }
        if edit.code() != self.state.doc() {
            return Err(EditorError::CodeMismatch);
        }
        module.apply_edit(edit, self.origin.clone())
    }

    fn revert(&mut self, module: &mut ReactiveModule, pending: PendingEdit) {
        self.sync_state = SyncState::Reverting;
        let reverted = pending.changes.invert(&pending.doc_before).and_then(|inverse| {
            let transaction = Transaction::new(inverse)
                .with_selection(pending.selection_before)
                .synchronized();
            self.state.apply(&transaction)
        });
        if let Err(err) = reverted {
            warn!(error = %err, "could not revert editor changes");
        }
        if self.state.doc() == module.code() {
            self.synced_generation = module.generation();
            self.discard_source_changes();
        } else {
            self.reset_view(module);
        }
        self.sync_state = SyncState::Idle;
    }

    /// Drop pending changes and show the module's code, changing only what differs.
    pub fn reset_view(&mut self, module: &ReactiveModule) {
        self.pending = None;
        self.debouncer.cancel();
        let code = module.code();
        let edits = text_change_to_edits(self.state.doc(), &code);
        info!(edits = edits.len(), "resetting the editor to the module code");
        let applied = ChangeSet::of(self.state.doc().len(), &edits)
            .and_then(|changes| self.state.apply(&Transaction::new(changes).synchronized()));
        if let Err(err) = applied {
            warn!(error = %err, "minimal reset failed, replacing the editor text");
            self.state = EditorState::new(code);
        }
        self.synced_generation = module.generation();
        self.discard_source_changes();
        self.sync_state = SyncState::Idle;
    }

    /// Apply module changes made by others since the last call. Pending local
    /// changes are committed on top of them.
    pub fn handle_source_changes(&mut self, module: &mut ReactiveModule) -> usize {
        let handled = self.receive_source_changes(module);
        if handled > 0 && self.pending.is_some() {
            self.commit_pending_changes(module);
        }
        handled
    }

    fn receive_source_changes(&mut self, module: &mut ReactiveModule) -> usize {
        let mut handled = 0;
        while let Some(change) = self.source_changes.as_mut().and_then(|changes| changes.try_recv().ok()) {
            self.observe_source_change(module, change);
            handled += 1;
        }
        handled
    }

    fn observe_source_change(&mut self, module: &mut ReactiveModule, change: SourceChange) {
        if change.origin.as_ref() == Some(&self.origin) {
            self.synced_generation = module.generation();
            return;
        }
        if self.pending.is_some() {
            match self.rebase_pending(&change) {
                Ok(()) => {
                    debug!(edits = change.edits.len(), "rebased uncommitted editor changes onto module change");
                    self.synced_generation = module.generation();
                }
                Err(err) => {
                    error!(error = %err, "could not rebase editor changes onto module change");
                    self.notifier.error(format!("Code editor changes were lost: {err}"));
                    self.reset_view(module);
                }
            }
            return;
        }
        let applied = ChangeSet::of(self.state.doc().len(), &change.edits)
            .and_then(|changes| self.state.apply(&Transaction::new(changes).synchronized()));
        match applied {
            Ok(()) => self.synced_generation = module.generation(),
            Err(err) => {
                warn!(error = %err, "module change does not apply to the editor text");
                self.reset_view(module);
            }
        }
    }

    /// Apply a module change to the editor while keeping pending local changes,
    /// which then become relative to the changed code.
    fn rebase_pending(&mut self, change: &SourceChange) -> EditorResult<()> {
        let Some(pending) = &mut self.pending else {
            return Ok(());
        };
        let external = ChangeSet::of(pending.doc_before.len(), &change.edits)?;
        let doc_after = external.apply(&pending.doc_before)?;

        // Local insertions at the boundary of a replaced range stay outside it.
        let mapped: Vec<TextEdit> = external
            .iter_changes()
            .map(|edit| {
                let from = pending.changes.map_pos(edit.from_a, Assoc::Before);
                let to = pending.changes.map_pos(edit.to_a, Assoc::Before).max(from);
                TextEdit::new(from, to, edit.insert)
            })
            .collect();
        let onto_editor = ChangeSet::of(self.state.doc().len(), &mapped)?;
        self.state.apply(&Transaction::new(onto_editor).synchronized())?;

        let local = text_change_to_edits(&doc_after, self.state.doc());
        pending.changes = ChangeSet::of(doc_after.len(), &local)?;
        pending.selection_before = pending.selection_before.map(&external);
        pending.doc_before = doc_after;
        Ok(())
    }

    fn discard_source_changes(&mut self) {
        if let Some(changes) = &mut self.source_changes {
            while changes.try_recv().is_ok() {}
        }
    }

    fn check_sync(&self, module: &ReactiveModule) {
        let code = module.code();
        let uncommitted = text_change_to_edits(&code, self.state.doc());
        if !uncommitted.is_empty() {
            warn!(uncommitted = uncommitted.len(), "module source was not synced to editor content");
        }
    }
}
