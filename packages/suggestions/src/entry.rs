use crate::documentation::DocSection;
use crate::ls_types::{MethodPointer, SuggestionEntryArgument, SuggestionEntryScope};
use crate::qualified_name::QualifiedName;

pub type SuggestionId = u64;

/// Type names like `returnType` are kept as plain strings, since they may be
/// unions or carry parameters.
pub type Typename = String;

const DOCUMENTATION_ROOT: &str = "https://help.enso.org/docs/api";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SuggestionKind {
    Module,
    Type,
    Constructor,
    Method,
    Function,
    Local,
}

/// A component group shown in the component browser.
#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    pub name: String,
    pub color: Option<String>,
    pub project: QualifiedName,
}

impl Group {
    pub fn new(name: impl Into<String>, project: QualifiedName) -> Self {
        Self {
            name: name.into(),
            color: None,
            project,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SuggestionEntry {
    pub kind: SuggestionKind,
    /// The module where the entity is defined.
    pub defined_in: QualifiedName,
    /// The type or module a method or constructor belongs to.
    pub member_of: Option<QualifiedName>,
    pub is_private: bool,
    pub is_unstable: bool,
    pub name: String,
    pub aliases: Vec<String>,
    /// Present only for instance methods.
    pub self_type: Option<Typename>,
    pub arguments: Vec<SuggestionEntryArgument>,
    pub return_type: Typename,
    pub parent_type: Option<QualifiedName>,
    /// The least nested module reexporting the entity.
    pub reexported_in: Option<QualifiedName>,
    pub documentation: Vec<DocSection>,
    pub scope: Option<SuggestionEntryScope>,
    pub icon_name: Option<String>,
    pub group_index: Option<usize>,
    /// Present for methods and constructors only.
    pub annotations: Vec<String>,
}

impl SuggestionEntry {
    pub fn new(kind: SuggestionKind, defined_in: QualifiedName, name: impl Into<String>) -> Self {
        Self {
            kind,
            defined_in,
            member_of: None,
            is_private: false,
            is_unstable: false,
            name: name.into(),
            aliases: Vec::new(),
            self_type: None,
            arguments: Vec::new(),
            return_type: String::new(),
            parent_type: None,
            reexported_in: None,
            documentation: Vec::new(),
            scope: None,
            icon_name: None,
            group_index: None,
            annotations: Vec::new(),
        }
    }

    pub fn is_callable(&self) -> bool {
        matches!(
            self.kind,
            SuggestionKind::Method | SuggestionKind::Constructor | SuggestionKind::Function
        )
    }
}

/// Fully qualified name of the entry, disregarding reexports.
pub fn entry_qn(entry: &SuggestionEntry) -> QualifiedName {
    match entry.kind {
        SuggestionKind::Module => entry.defined_in.clone(),
        _ => entry.member_of.as_ref().unwrap_or(&entry.defined_in).join(&entry.name),
    }
}

/// The module or type the entry belongs to.
pub fn entry_owner_qn(entry: &SuggestionEntry) -> Option<QualifiedName> {
    match entry.kind {
        SuggestionKind::Module => entry.defined_in.parent(),
        _ => Some(entry.member_of.clone().unwrap_or_else(|| entry.defined_in.clone())),
    }
}

pub fn entry_method_pointer(entry: &SuggestionEntry) -> Option<MethodPointer> {
    if entry.kind != SuggestionKind::Method {
        return None;
    }
    let member_of = entry.member_of.as_ref()?;
    Some(MethodPointer {
        module: entry.defined_in.to_string(),
        defined_on_type: member_of.to_string(),
        name: entry.name.clone(),
    })
}

/// Link to the online API documentation. Only standard library methods and
/// functions have one.
pub fn documentation_url(entry: &SuggestionEntry) -> Option<String> {
    if !matches!(entry.kind, SuggestionKind::Method | SuggestionKind::Function) {
        return None;
    }
    let location = entry.member_of.as_ref().unwrap_or(&entry.defined_in);
    let mut segments: Vec<String> = location.segments().map(str::to_string).collect();
    if segments.len() < 3 || segments[0] != "Standard" {
        return None;
    }
    segments[1] = format!("Standard.{}", segments[1]);
    segments[0] = DOCUMENTATION_ROOT.to_string();
    if let Some(last) = segments.last_mut() {
        last.push('.');
        last.push_str(&entry.name);
    }
    Some(segments.join("/"))
}

/// `true` if calling without a value for this argument results in an error.
pub fn is_required_argument(argument: &SuggestionEntryArgument) -> bool {
    argument
        .default_value
        .as_deref()
        .is_some_and(|value| value.starts_with("Missing_Argument."))
}
