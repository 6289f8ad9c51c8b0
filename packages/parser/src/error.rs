use thiserror::Error;

pub type ParseResult<T> = Result<T, ParseError>;

/// Parser-level faults. Malformed Enso syntax is never an error: it is kept in
/// `Invalid` trees.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Nesting depth exceeds {limit} at {pos}")]
    NestingTooDeep { pos: usize, limit: usize },
}

impl ParseError {
    pub fn nesting_too_deep(pos: usize, limit: usize) -> Self {
        Self::NestingTooDeep { pos, limit }
    }
}
