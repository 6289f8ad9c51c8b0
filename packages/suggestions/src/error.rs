use crate::entry::SuggestionId;
use enso_common::CommonError;
use thiserror::Error;

pub type SuggestionResult<T> = Result<T, SuggestionError>;

#[derive(Error, Debug)]
pub enum SuggestionError {
    #[error("Invalid name: {0:?}")]
    InvalidName(String),

    #[error("Invalid qualified name: {0:?}")]
    InvalidQualifiedName(String),

    #[error("Invalid update of field \"{field}\": {reason}")]
    InvalidFieldUpdate { field: &'static str, reason: &'static str },

    #[error("Entry with id {0} does not exist")]
    EntryNotFound(SuggestionId),

    #[error("Wrong argument index {index}")]
    ArgumentIndex { index: usize },

    #[error("{context}: {source}")]
    Context {
        context: String,
        #[source]
        source: Box<SuggestionError>,
    },

    #[error("Language server error: {0}")]
    LanguageServer(String),

    #[error("Invalid language server message: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Common(#[from] CommonError),
}

impl SuggestionError {
    pub(crate) fn context(self, context: impl Into<String>) -> Self {
        SuggestionError::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }
}
