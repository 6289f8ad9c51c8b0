//! # Project Module Store
//!
//! The open modules of a project, each with an optional code editor attached.
//! Every edit to a module goes through the store, which gives the attached
//! editor a chance to commit its pending changes first and delivers the
//! resulting source changes to it afterwards.

use crate::errors::{EditorError, EditorResult};
use crate::notification::Notifier;
use crate::reactive::ReactiveModule;
use crate::state::Transaction;
use crate::sync::SyncEngine;
use enso_ast::{IdGenerator, Module, ModuleUpdate, MutableModule};
use enso_common::{Config, Origin};
use std::collections::BTreeMap;
use tracing::info;

struct OpenModule {
    module: ReactiveModule,
    editor: Option<SyncEngine>,
}

impl OpenModule {
    fn before_edit(&mut self, origin: &Origin) {
        if let Some(editor) = &mut self.editor {
            editor.before_module_edit(&mut self.module, origin);
        }
    }

    fn deliver_source_changes(&mut self) {
        if let Some(editor) = &mut self.editor {
            editor.handle_source_changes(&mut self.module);
        }
    }
}

pub struct ProjectStore {
    config: Config,
    peer: u32,
    modules: BTreeMap<String, OpenModule>,
}

impl ProjectStore {
    /// `peer` distinguishes this collaborator's node ids from everyone else's.
    pub fn new(config: Config, peer: u32) -> Self {
        Self {
            config,
            peer,
            modules: BTreeMap::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Open a module from its code.
    pub fn open(&mut self, name: &str, code: &str) -> EditorResult<()> {
        let module = Module::parse(code, IdGenerator::new(name, self.peer))?;
        self.insert(name, ReactiveModule::new(module)?);
        Ok(())
    }

    /// Open a module from a collaborator's document state.
    pub fn open_replica(&mut self, name: &str, state: &[u8]) -> EditorResult<()> {
        let mut module = ReactiveModule::new(Module::empty(IdGenerator::new(name, self.peer)))?;
        module.apply_update(state)?;
        self.insert(name, module);
        Ok(())
    }

    fn insert(&mut self, name: &str, module: ReactiveModule) {
        info!(module = name, "module opened");
        self.modules.insert(name.to_string(), OpenModule { module, editor: None });
    }

    pub fn close(&mut self, name: &str) -> bool {
        match self.modules.remove(name) {
            Some(mut open) => {
                open.module.dispose();
                true
            }
            None => false,
        }
    }

    pub fn module_names(&self) -> impl Iterator<Item = &str> {
        self.modules.keys().map(String::as_str)
    }

    pub fn module(&self, name: &str) -> Option<&ReactiveModule> {
        self.modules.get(name).map(|open| &open.module)
    }

    pub fn module_mut(&mut self, name: &str) -> Option<&mut ReactiveModule> {
        self.modules.get_mut(name).map(|open| &mut open.module)
    }

    fn open_module(&mut self, name: &str) -> EditorResult<&mut OpenModule> {
        self.modules
            .get_mut(name)
            .ok_or_else(|| EditorError::ModuleNotFound(name.to_string()))
    }

    /// Attach a code editor to a module, showing its current code.
    pub fn attach_code_editor(&mut self, name: &str, notifier: Notifier) -> EditorResult<()> {
        let config = self.config.code_editor.clone();
        let open = self.open_module(name)?;
        let mut editor = SyncEngine::new(&config, notifier);
        editor.connect(&mut open.module);
        open.editor = Some(editor);
        Ok(())
    }

    pub fn editor(&self, name: &str) -> Option<&SyncEngine> {
        self.modules.get(name).and_then(|open| open.editor.as_ref())
    }

    /// Apply a transaction to the code editor of a module.
    pub fn dispatch(&mut self, name: &str, transaction: Transaction) -> EditorResult<()> {
        let open = self.open_module(name)?;
        let editor = open
            .editor
            .as_mut()
            .ok_or_else(|| EditorError::ModuleNotFound(name.to_string()))?;
        editor.dispatch(transaction)
    }

    /// Open an edit session on behalf of `origin`.
    pub fn start_edit(&mut self, name: &str, origin: &Origin) -> EditorResult<MutableModule> {
        let open = self.open_module(name)?;
        open.before_edit(origin);
        Ok(open.module.edit())
    }

    pub fn commit_edit(&mut self, name: &str, edit: MutableModule, origin: Origin) -> EditorResult<ModuleUpdate> {
        let open = self.open_module(name)?;
        let update = open.module.apply_edit(edit, origin)?;
        open.deliver_source_changes();
        Ok(update)
    }

    /// Apply a collaborator's update to a module.
    pub fn apply_remote_update(&mut self, name: &str, bytes: &[u8]) -> EditorResult<ModuleUpdate> {
        let open = self.open_module(name)?;
        open.before_edit(&Origin::Remote);
        let update = open.module.apply_update(bytes)?;
        open.deliver_source_changes();
        Ok(update)
    }

    /// One tick of the host's event loop: run scheduled editor commits, deliver
    /// module changes to editors and re-run invalidated effects.
    pub fn tick(&mut self) {
        for open in self.modules.values_mut() {
            if let Some(editor) = &mut open.editor {
                editor.run_scheduled(&mut open.module);
                editor.handle_source_changes(&mut open.module);
            }
            open.module.flush();
        }
    }
}
