//! # Enso AST
//!
//! Identity-preserving syntax trees for collaboratively edited Enso modules.
//!
//! Parsed code is stored as an arena of node records ([`Module`]). Edits happen
//! in copy-on-write sessions ([`MutableModule`]) that keep node ids stable across
//! structural changes and across text edits synchronized back into the tree
//! (see [`MutableModule::sync_to_code`]).
//!
//! ```ignore
//! let mut module = enso_ast::parse_module("x = 1")?;
//! let mut edit = module.edit();
//! let root = edit.root_id().unwrap();
//! edit.sync_to_code(root, "x = 2")?;
//! let update = module.apply_edit(edit);
//! ```

pub mod construct;
pub mod documentation;
pub mod error;
pub mod id;
pub mod lower;
pub mod module;
pub mod node;
pub mod pattern;
pub mod print;
pub mod source_document;
pub mod sync_to_code;
pub mod table;

pub use construct::{App, Ident, PropertyAccess, TextLiteral, Vector, Wildcard};
pub use documentation::documentation_text;
pub use error::{AstError, AstResult};
pub use id::{AstId, ExternalId, IdGenerator};
pub use module::{Module, ModuleUpdate, MutableModule};
pub use node::{Child, ChildNode, Node, NodeFields, NodeKind, NodeMetadata, NodeRecord, Owned, Position, TokenData};
pub use pattern::Pattern;
pub use print::{print_with_spans, Printed};
pub use source_document::{SourceChange, SourceDocument};
pub use table::{parse_tsv_data, rows_to_tsv, table_to_enso_expression};

/// Parse a module with ids derived from the name `Main`.
pub fn parse_module(code: &str) -> AstResult<Module> {
    Module::parse_with_name(code, "Main")
}

/// Parse a single expression into a scratch module and return its root.
pub fn parse_expression(code: &str) -> AstResult<Module> {
    let mut edit = MutableModule::transient();
    let expression = edit.parse_expression(code)?;
    edit.set_root(expression);
    let mut module = Module::empty(edit.ids().clone());
    module.apply_edit(edit);
    Ok(module)
}
