//! Error types for the editor

use enso_ast::AstError;
use thiserror::Error;

pub type EditorResult<T> = Result<T, EditorError>;

#[derive(Error, Debug)]
pub enum EditorError {
    #[error("AST error: {0}")]
    Ast(#[from] AstError),

    #[error("Change set of length {expected} applied to a document of length {found}")]
    LengthMismatch { expected: usize, found: usize },

    #[error("Edit range {from}..{to} is out of bounds or overlaps a previous edit")]
    InvalidEdit { from: usize, to: usize },

    #[error("Position {0} is not on a character boundary")]
    NotCharBoundary(usize),

    #[error("Module changed underneath the editor (synced generation {synced}, module generation {current})")]
    StaleModule { synced: u64, current: u64 },

    #[error("Edited code does not match the editor text")]
    CodeMismatch,

    #[error("Module {0} is not open")]
    ModuleNotFound(String),

    #[error("Invalid record for node {key}: {source}")]
    InvalidRecord {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("CRDT error: {0}")]
    Crdt(String),
}
