//! Language server messages of the suggestion database API, as sent on the wire.

use crate::entry::SuggestionId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestionEntryArgument {
    pub name: String,
    pub repr_type: String,
    pub is_suspended: bool,
    pub has_default: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag_values: Option<Vec<String>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Position {
    pub line: u32,
    pub character: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SuggestionEntryScope {
    pub start: Position,
    pub end: Position,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MethodPointer {
    pub module: String,
    pub defined_on_type: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum LsSuggestionEntry {
    Module {
        module: String,
        #[serde(default)]
        documentation: Option<String>,
        #[serde(default)]
        reexport: Option<String>,
    },
    Type {
        module: String,
        name: String,
        #[serde(default)]
        params: Vec<SuggestionEntryArgument>,
        #[serde(default)]
        parent_type: Option<String>,
        #[serde(default)]
        reexport: Option<String>,
        #[serde(default)]
        documentation: Option<String>,
    },
    Constructor {
        module: String,
        name: String,
        #[serde(default)]
        arguments: Vec<SuggestionEntryArgument>,
        return_type: String,
        #[serde(default)]
        documentation: Option<String>,
        #[serde(default)]
        reexport: Option<String>,
        #[serde(default)]
        annotations: Vec<String>,
    },
    Method {
        module: String,
        name: String,
        #[serde(default)]
        arguments: Vec<SuggestionEntryArgument>,
        self_type: String,
        return_type: String,
        #[serde(default)]
        is_static: Option<bool>,
        #[serde(default)]
        documentation: Option<String>,
        #[serde(default)]
        reexport: Option<String>,
        #[serde(default)]
        annotations: Vec<String>,
    },
    Function {
        module: String,
        name: String,
        #[serde(default)]
        arguments: Vec<SuggestionEntryArgument>,
        return_type: String,
        scope: SuggestionEntryScope,
        #[serde(default)]
        documentation: Option<String>,
    },
    Local {
        module: String,
        name: String,
        return_type: String,
        scope: SuggestionEntryScope,
        #[serde(default)]
        documentation: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldAction {
    Set,
    Remove,
}

/// Update of a single entry field. `Set` normally carries a value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldUpdate<T> {
    pub tag: FieldAction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<T>,
}

impl<T> FieldUpdate<T> {
    pub fn set(value: T) -> Self {
        Self {
            tag: FieldAction::Set,
            value: Some(value),
        }
    }

    pub fn remove() -> Self {
        Self {
            tag: FieldAction::Remove,
            value: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArgumentModification {
    pub index: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<FieldUpdate<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repr_type: Option<FieldUpdate<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_suspended: Option<FieldUpdate<bool>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_default: Option<FieldUpdate<bool>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<FieldUpdate<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SuggestionArgumentUpdate {
    Add {
        index: usize,
        argument: SuggestionEntryArgument,
    },
    Remove {
        index: usize,
    },
    Modify(ArgumentModification),
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryModification {
    pub id: SuggestionId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments: Option<Vec<SuggestionArgumentUpdate>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module: Option<FieldUpdate<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub self_type: Option<FieldUpdate<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_type: Option<FieldUpdate<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub documentation: Option<FieldUpdate<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<FieldUpdate<SuggestionEntryScope>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reexport: Option<FieldUpdate<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SuggestionsDatabaseUpdate {
    Add {
        id: SuggestionId,
        suggestion: LsSuggestionEntry,
    },
    Remove {
        id: SuggestionId,
    },
    #[serde(alias = "Update")]
    Modify(EntryModification),
}

impl SuggestionsDatabaseUpdate {
    pub fn id(&self) -> SuggestionId {
        match self {
            SuggestionsDatabaseUpdate::Add { id, .. } | SuggestionsDatabaseUpdate::Remove { id } => *id,
            SuggestionsDatabaseUpdate::Modify(modification) => modification.id,
        }
    }
}

/// Payload of the `search/suggestionsDatabaseUpdates` notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestionsDatabaseUpdateNotification {
    pub updates: Vec<SuggestionsDatabaseUpdate>,
    pub current_version: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuggestionsDatabaseEntry {
    pub id: SuggestionId,
    pub suggestion: LsSuggestionEntry,
}

/// Response of `search/getSuggestionsDatabase`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestionsDatabaseSnapshot {
    pub entries: Vec<SuggestionsDatabaseEntry>,
    pub current_version: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LibraryComponent {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LibraryComponentGroup {
    pub library: String,
    pub name: String,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub exports: Vec<LibraryComponent>,
}
