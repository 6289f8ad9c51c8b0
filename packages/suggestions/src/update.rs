//! # Language Server Updates
//!
//! Turns language server messages into suggestion database entries, and applies
//! incremental database updates.
//!
//! Updates are applied one by one. When one fails, the entry it concerns is in
//! an unknown state and is removed from the database; the rest of the batch is
//! still applied.

use crate::db::SuggestionDb;
use crate::documentation::documentation_data;
use crate::entry::{Group, SuggestionEntry, SuggestionKind, Typename};
use crate::error::{SuggestionError, SuggestionResult};
use crate::ls_types::{
    ArgumentModification, EntryModification, FieldAction, FieldUpdate, LsSuggestionEntry, SuggestionArgumentUpdate,
    SuggestionEntryArgument, SuggestionsDatabaseUpdate,
};
use crate::qualified_name::{is_identifier_or_operator, QualifiedName};
use tracing::{debug, error};

#[derive(Debug, Clone, Default)]
pub struct SuggestionUpdateProcessor {
    groups: Vec<Group>,
}

impl SuggestionUpdateProcessor {
    pub fn new(groups: Vec<Group>) -> Self {
        Self { groups }
    }

    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    /// Create a database entry from a language server entry.
    pub fn entry_from_ls(&self, ls_entry: &LsSuggestionEntry) -> SuggestionResult<SuggestionEntry> {
        self.convert(ls_entry).map_err(|err| err.context("when creating entry"))
    }

    fn convert(&self, ls_entry: &LsSuggestionEntry) -> SuggestionResult<SuggestionEntry> {
        let entry = match ls_entry {
            LsSuggestionEntry::Function {
                module,
                name,
                arguments,
                return_type,
                scope,
                documentation,
            } => {
                let mut entry = new_entry(SuggestionKind::Function, module, name)?;
                self.set_return_type(&mut entry, return_type);
                self.set_documentation(&mut entry, documentation.as_deref());
                entry.scope = Some(*scope);
                entry.arguments = arguments.clone();
                entry
            }
            LsSuggestionEntry::Module {
                module,
                documentation,
                reexport,
            } => {
                let mut entry = new_entry(SuggestionKind::Module, module, "MODULE")?;
                if let Some(reexport) = reexport {
                    entry.reexported_in = Some(parse_normalized(reexport)?);
                }
                self.set_documentation(&mut entry, documentation.as_deref());
                entry
            }
            LsSuggestionEntry::Type {
                module,
                name,
                params,
                parent_type,
                reexport,
                documentation,
            } => {
                let mut entry = new_entry(SuggestionKind::Type, module, name)?;
                if let Some(reexport) = reexport {
                    entry.reexported_in = Some(parse_normalized(reexport)?);
                }
                if let Some(parent_type) = parent_type {
                    entry.parent_type = Some(parse_normalized(parent_type)?);
                }
                self.set_documentation(&mut entry, documentation.as_deref());
                entry.arguments = params.clone();
                entry
            }
            LsSuggestionEntry::Constructor {
                module,
                name,
                arguments,
                return_type,
                documentation,
                reexport,
                annotations,
            } => {
                let mut entry = new_entry(SuggestionKind::Constructor, module, name)?;
                if let Some(reexport) = reexport {
                    entry.reexported_in = Some(parse_normalized(reexport)?);
                }
                self.set_documentation(&mut entry, documentation.as_deref());
                self.set_return_type(&mut entry, return_type);
                entry.arguments = arguments.clone();
                entry.annotations = annotations.clone();
                entry
            }
            LsSuggestionEntry::Method {
                module,
                name,
                arguments,
                self_type,
                return_type,
                is_static,
                documentation,
                reexport,
                annotations,
            } => {
                let mut entry = new_entry(SuggestionKind::Method, module, name)?;
                if let Some(reexport) = reexport {
                    entry.reexported_in = Some(parse_normalized(reexport)?);
                }
                self.set_documentation(&mut entry, documentation.as_deref());
                self.set_self_type(&mut entry, self_type, *is_static);
                self.set_return_type(&mut entry, return_type);
                entry.arguments = arguments.clone();
                entry.annotations = annotations.clone();
                entry
            }
            LsSuggestionEntry::Local {
                module,
                name,
                return_type,
                scope,
                documentation,
            } => {
                let mut entry = new_entry(SuggestionKind::Local, module, name)?;
                self.set_return_type(&mut entry, return_type);
                self.set_documentation(&mut entry, documentation.as_deref());
                entry.scope = Some(*scope);
                entry
            }
        };
        Ok(entry)
    }

    fn set_self_type(&self, entry: &mut SuggestionEntry, self_type: &str, is_static: Option<bool>) {
        let is_static = is_static.unwrap_or(entry.self_type.is_none());
        if !is_static {
            entry.self_type = Some(self_type.to_string());
        }
        set_as_owner(entry, self_type);
    }

    fn set_return_type(&self, entry: &mut SuggestionEntry, return_type: &Typename) {
        entry.return_type = return_type.clone();
        if entry.kind == SuggestionKind::Constructor {
            set_as_owner(entry, return_type);
        }
    }

    fn set_documentation(&self, entry: &mut SuggestionEntry, documentation: Option<&str>) {
        let data = documentation_data(documentation, &entry.defined_in, &self.groups);
        entry.documentation = data.documentation;
        entry.aliases = data.aliases;
        entry.icon_name = data.icon_name;
        entry.group_index = data.group_index;
        entry.is_private = data.is_private;
        entry.is_unstable = data.is_unstable;
    }

    /// Apply a batch of updates, in order.
    pub fn apply_updates(&self, entries: &mut SuggestionDb, updates: &[SuggestionsDatabaseUpdate]) {
        for update in updates {
            if let Err(err) = self.apply_update(entries, update) {
                error!(id = update.id(), error = %err, "failed to apply suggestion database update");
                if entries.get(update.id()).is_some() {
                    error!(id = update.id(), "removing entry, because its state is unclear");
                    entries.delete(update.id());
                }
            }
        }
    }

    fn apply_update(&self, entries: &mut SuggestionDb, update: &SuggestionsDatabaseUpdate) -> SuggestionResult<()> {
        match update {
            SuggestionsDatabaseUpdate::Add { id, suggestion } => {
                let entry = self
                    .entry_from_ls(suggestion)
                    .map_err(|err| err.context(format!("when adding new entry {id}")))?;
                entries.set(*id, entry);
                Ok(())
            }
            SuggestionsDatabaseUpdate::Remove { id } => {
                if entries.delete(*id) {
                    Ok(())
                } else {
                    Err(SuggestionError::EntryNotFound(*id))
                }
            }
            SuggestionsDatabaseUpdate::Modify(modification) => {
                let id = modification.id;
                let mut entry = entries.get(id).cloned().ok_or(SuggestionError::EntryNotFound(id))?;
                self.modify_entry(&mut entry, modification)
                    .map_err(|err| err.context(format!("when modifying entry {id}")))?;
                debug!(id, "suggestion entry modified");
                entries.set(id, entry);
                Ok(())
            }
        }
    }

    fn modify_entry(&self, entry: &mut SuggestionEntry, modification: &EntryModification) -> SuggestionResult<()> {
        for argument_update in modification.arguments.iter().flatten() {
            apply_arguments_update(&mut entry.arguments, argument_update)?;
        }

        if let Some(module) = required_value("module", &modification.module)? {
            set_module(entry, module)?;
        }
        if let Some(self_type) = required_value("selfType", &modification.self_type)? {
            self.set_self_type(entry, self_type, None);
        }
        if let Some(return_type) = required_value("returnType", &modification.return_type)? {
            self.set_return_type(entry, return_type);
        }
        if let Some(documentation) = &modification.documentation {
            self.set_documentation(entry, documentation.value.as_deref());
        }
        if let Some(scope) = &modification.scope {
            entry.scope = optional_value(scope).copied();
        }
        if let Some(reexport) = &modification.reexport {
            entry.reexported_in = match optional_value(reexport) {
                Some(reexport) => Some(QualifiedName::parse(reexport)?),
                None => None,
            };
        }
        Ok(())
    }
}

fn new_entry(kind: SuggestionKind, module: &str, name: &str) -> SuggestionResult<SuggestionEntry> {
    if !is_identifier_or_operator(name) {
        return Err(SuggestionError::InvalidName(name.to_string()));
    }
    let defined_in = parse_normalized(module)?;
    let mut entry = SuggestionEntry::new(kind, defined_in.clone(), name);
    set_defined_in(&mut entry, defined_in);
    Ok(entry)
}

fn set_module(entry: &mut SuggestionEntry, module: &str) -> SuggestionResult<()> {
    set_defined_in(entry, parse_normalized(module)?);
    Ok(())
}

/// Set the defining module, updating the fields derived from it.
fn set_defined_in(entry: &mut SuggestionEntry, defined_in: QualifiedName) {
    match entry.kind {
        SuggestionKind::Module => {
            entry.name = defined_in.last_segment().to_string();
            entry.return_type = defined_in.to_string();
        }
        SuggestionKind::Type => entry.return_type = defined_in.join(&entry.name).to_string(),
        _ => {}
    }
    entry.defined_in = defined_in;
}

fn set_as_owner(entry: &mut SuggestionEntry, type_name: &str) {
    entry.member_of = QualifiedName::parse(type_name).ok().map(QualifiedName::normalize);
}

fn parse_normalized(name: &str) -> SuggestionResult<QualifiedName> {
    QualifiedName::parse(name).map(QualifiedName::normalize)
}

/// New value of a field that cannot be unset.
fn required_value<'a, T>(field: &'static str, update: &'a Option<FieldUpdate<T>>) -> SuggestionResult<Option<&'a T>> {
    let Some(update) = update else {
        return Ok(None);
    };
    match (update.tag, &update.value) {
        (FieldAction::Set, Some(value)) => Ok(Some(value)),
        (FieldAction::Set, None) => Err(SuggestionError::InvalidFieldUpdate {
            field,
            reason: "received \"Set\" update with no value",
        }),
        (FieldAction::Remove, _) => Err(SuggestionError::InvalidFieldUpdate {
            field,
            reason: "received \"Remove\" for non-optional field",
        }),
    }
}

fn optional_value<T>(update: &FieldUpdate<T>) -> Option<&T> {
    match update.tag {
        FieldAction::Set => update.value.as_ref(),
        FieldAction::Remove => None,
    }
}

fn apply_arguments_update(
    arguments: &mut Vec<SuggestionEntryArgument>,
    update: &SuggestionArgumentUpdate,
) -> SuggestionResult<()> {
    match update {
        SuggestionArgumentUpdate::Add { index, argument } => {
            arguments.insert((*index).min(arguments.len()), argument.clone());
        }
        SuggestionArgumentUpdate::Remove { index } => {
            if *index < arguments.len() {
                arguments.remove(*index);
            }
        }
        SuggestionArgumentUpdate::Modify(modification) => {
            let index = modification.index;
            let argument = arguments
                .get_mut(index)
                .ok_or(SuggestionError::ArgumentIndex { index })?;
            modify_argument(argument, modification)
                .map_err(|err| err.context(format!("when modifying argument with index {index}")))?;
        }
    }
    Ok(())
}

fn modify_argument(argument: &mut SuggestionEntryArgument, modification: &ArgumentModification) -> SuggestionResult<()> {
    if let Some(name) = required_value("name", &modification.name)? {
        argument.name = name.clone();
    }
    if let Some(repr_type) = required_value("reprType", &modification.repr_type)? {
        argument.repr_type = repr_type.clone();
    }
    if let Some(is_suspended) = required_value("isSuspended", &modification.is_suspended)? {
        argument.is_suspended = *is_suspended;
    }
    if let Some(has_default) = required_value("hasDefault", &modification.has_default)? {
        argument.has_default = *has_default;
    }
    if let Some(default_value) = &modification.default_value {
        argument.default_value = optional_value(default_value).cloned();
    }
    Ok(())
}
