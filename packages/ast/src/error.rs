use crate::id::AstId;
use crate::node::NodeKind;
use enso_parser::ParseError;
use thiserror::Error;

pub type AstResult<T> = Result<T, AstError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AstError {
    #[error("Node {0} not found in module")]
    NodeNotFound(AstId),

    #[error("Node {0} has no parent")]
    Detached(AstId),

    #[error("Node {child} is not a child of {parent}")]
    NotAChild { parent: AstId, child: AstId },

    #[error("Node {id} is {found:?}, expected {expected:?}")]
    WrongKind {
        id: AstId,
        expected: NodeKind,
        found: NodeKind,
    },

    #[error("Invalid identifier: {0:?}")]
    InvalidIdentifier(String),

    #[error("Pattern has {expected} placeholders but {found} subtrees were given")]
    PlaceholderCountMismatch { expected: usize, found: usize },

    #[error("Text is not a single expression: {0:?}")]
    NotAnExpression(String),

    #[error("Row {row} has {found} columns, expected {expected}")]
    InconsistentColumns {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("Invalid tab-separated data: {0}")]
    InvalidTsv(String),

    #[error("Invalid AST id: {0:?}")]
    InvalidAstId(String),

    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),
}
