//! # Enso Suggestions
//!
//! The suggestion database: every entity (module, type, constructor, method,
//! function, local) available in the current project, kept in sync with the
//! language server through versioned incremental updates.
//!
//! ## Modules
//!
//! - [`ls_types`]: language server wire types
//! - [`update`]: conversion of language server entries and updates
//! - [`db`]: indexed entry storage
//! - [`synchronizer`]: initial load and ordered application of update batches

pub mod db;
pub mod documentation;
pub mod entry;
mod error;
pub mod ls_types;
pub mod qualified_name;
pub mod synchronizer;
pub mod update;

pub use db::SuggestionDb;
pub use entry::{
    documentation_url, entry_method_pointer, entry_owner_qn, entry_qn, is_required_argument, Group, SuggestionEntry,
    SuggestionId, SuggestionKind,
};
pub use error::{SuggestionError, SuggestionResult};
pub use qualified_name::QualifiedName;
pub use synchronizer::{DatabaseState, LanguageServer, Synchronizer};
pub use update::SuggestionUpdateProcessor;
