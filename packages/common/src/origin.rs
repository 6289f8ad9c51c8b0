//! Origin tags attached to module edits.
//!
//! Every committed edit carries an origin so that a component can recognize
//! (and ignore) changes it produced itself.

use std::fmt;

/// Component name used by the code editor when tagging its own edits.
pub const CODE_EDITOR: &str = "CodeEditor";

const LOCAL_USER_ACTION_PREFIX: &str = "local:userAction:";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Origin {
    /// A user action performed through a specific local component.
    LocalUserAction(String),
    /// A local change not attributed to a user action (e.g. initial load).
    Local,
    /// A change received from a collaborator.
    Remote,
    Other(String),
}

impl Origin {
    pub fn user_action(component: impl Into<String>) -> Self {
        Origin::LocalUserAction(component.into())
    }

    pub fn is_local_user_action(&self) -> bool {
        matches!(self, Origin::LocalUserAction(_))
    }

    pub fn is_local(&self) -> bool {
        matches!(self, Origin::LocalUserAction(_) | Origin::Local)
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Origin::LocalUserAction(component) => write!(f, "{LOCAL_USER_ACTION_PREFIX}{component}"),
            Origin::Local => write!(f, "local"),
            Origin::Remote => write!(f, "remote"),
            Origin::Other(tag) => write!(f, "{tag}"),
        }
    }
}

impl From<&str> for Origin {
    fn from(tag: &str) -> Self {
        if let Some(component) = tag.strip_prefix(LOCAL_USER_ACTION_PREFIX) {
            return Origin::LocalUserAction(component.to_string());
        }
        match tag {
            "local" => Origin::Local,
            "remote" => Origin::Remote,
            other => Origin::Other(other.to_string()),
        }
    }
}

impl From<String> for Origin {
    fn from(tag: String) -> Self {
        Origin::from(tag.as_str())
    }
}
