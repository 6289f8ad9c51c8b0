//! Dot-separated qualified names of Enso entities, such as `Standard.Base.Data.Vector`.

use crate::error::{SuggestionError, SuggestionResult};
use serde::{Deserialize, Serialize};
use std::fmt;

const OPERATOR_CHARS: &str = "!$%&*+-/<>?^~|:\\=";

/// `true` for names like `foo`, `Vector` or `_tmp1`.
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_alphabetic() || first == '_' => {
            chars.all(|c| c.is_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

/// `true` for operator names like `+` or `<=`.
pub fn is_operator_identifier(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| OPERATOR_CHARS.contains(c))
}

pub fn is_identifier_or_operator(name: &str) -> bool {
    is_identifier(name) || is_operator_identifier(name)
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct QualifiedName(String);

impl QualifiedName {
    /// Validate a qualified name. Every segment must be an identifier; the
    /// last one may also be an operator.
    pub fn parse(name: &str) -> SuggestionResult<Self> {
        let segments: Vec<&str> = name.split('.').collect();
        let (last, init) = match segments.split_last() {
            Some(split) => split,
            None => return Err(SuggestionError::InvalidQualifiedName(name.to_string())),
        };
        if init.iter().all(|s| is_identifier(s)) && is_identifier_or_operator(last) {
            Ok(Self(name.to_string()))
        } else {
            Err(SuggestionError::InvalidQualifiedName(name.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('.')
    }

    pub fn last_segment(&self) -> &str {
        self.0.rsplit('.').next().unwrap_or(&self.0)
    }

    /// The name without its last segment, if there is more than one segment.
    pub fn parent(&self) -> Option<QualifiedName> {
        self.0
            .rsplit_once('.')
            .map(|(parent, _)| QualifiedName(parent.to_string()))
    }

    pub fn join(&self, name: &str) -> QualifiedName {
        QualifiedName(format!("{}.{}", self.0, name))
    }

    /// Drop the `Main` suffix: a project's main module is referred to by the
    /// project name.
    pub fn normalize(self) -> QualifiedName {
        match self.0.strip_suffix(".Main") {
            Some(stripped) => QualifiedName(stripped.to_string()),
            None => self,
        }
    }

    /// `namespace.project` part of the name, if present.
    pub fn project(&self) -> Option<QualifiedName> {
        let mut segments = self.segments();
        match (segments.next(), segments.next()) {
            (Some(namespace), Some(project)) => Some(QualifiedName(format!("{namespace}.{project}"))),
            _ => None,
        }
    }
}

impl TryFrom<String> for QualifiedName {
    type Error = SuggestionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<QualifiedName> for String {
    fn from(name: QualifiedName) -> Self {
        name.0
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
