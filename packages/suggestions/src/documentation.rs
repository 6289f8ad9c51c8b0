//! # Entry Documentation
//!
//! Splits a documentation comment into sections and extracts the metadata the
//! suggestion database needs from its tags.
//!
//! ```text
//! ALIAS Sum, Add           <- Tag { Alias, "Sum, Add" }
//! GROUP Standard.Base.Math <- Tag { Group, "Standard.Base.Math" }
//!
//! Adds two numbers.        <- Paragraph
//!
//! Arguments:               <- Keyed { "Arguments", "- a: ..." }
//! - a: the first number.
//!
//! > Example                <- Marked { Example, "Example", ... }
//!   1 + 2
//! ```
//!
//! Tags are only recognized in the leading lines of a comment.

use crate::entry::Group;
use crate::qualified_name::QualifiedName;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocTag {
    Added,
    Advanced,
    Alias,
    Deprecated,
    Group,
    Icon,
    Modified,
    Private,
    Removed,
    Unstable,
    Upcoming,
}

impl DocTag {
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        Some(match keyword {
            "ADDED" => DocTag::Added,
            "ADVANCED" => DocTag::Advanced,
            "ALIAS" => DocTag::Alias,
            "DEPRECATED" => DocTag::Deprecated,
            "GROUP" => DocTag::Group,
            "ICON" => DocTag::Icon,
            "MODIFIED" => DocTag::Modified,
            "PRIVATE" => DocTag::Private,
            "REMOVED" => DocTag::Removed,
            "UNSTABLE" => DocTag::Unstable,
            "UPCOMING" => DocTag::Upcoming,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mark {
    Important,
    Info,
    Example,
}

impl Mark {
    fn from_prefix(c: char) -> Option<Self> {
        match c {
            '!' => Some(Mark::Important),
            '?' => Some(Mark::Info),
            '>' => Some(Mark::Example),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocSection {
    Tag { tag: DocTag, body: String },
    Paragraph { body: String },
    Keyed { key: String, body: String },
    Marked { mark: Mark, header: String, body: String },
}

pub fn parse_docs(text: &str) -> Vec<DocSection> {
    let mut sections = Vec::new();
    let mut lines = text.lines().peekable();

    while let Some(line) = lines.peek() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            lines.next();
            continue;
        }
        let (keyword, body) = trimmed.split_once(' ').unwrap_or((trimmed, ""));
        match DocTag::from_keyword(keyword) {
            Some(tag) => {
                sections.push(DocSection::Tag {
                    tag,
                    body: body.trim().to_string(),
                });
                lines.next();
            }
            None => break,
        }
    }

    let mut block: Vec<&str> = Vec::new();
    for line in lines {
        if line.trim().is_empty() {
            if !block.is_empty() {
                sections.push(block_section(&block));
                block.clear();
            }
        } else {
            block.push(line);
        }
    }
    if !block.is_empty() {
        sections.push(block_section(&block));
    }
    sections
}

fn block_section(lines: &[&str]) -> DocSection {
    let first = lines[0].trim();
    let rest = || {
        lines[1..]
            .iter()
            .map(|line| line.trim())
            .collect::<Vec<_>>()
            .join("\n")
    };
    let mut chars = first.chars();
    if let Some(mark) = chars.next().and_then(Mark::from_prefix) {
        if chars.next().map_or(true, char::is_whitespace) {
            return DocSection::Marked {
                mark,
                header: first[1..].trim().to_string(),
                body: rest(),
            };
        }
    }
    if let Some(key) = first.strip_suffix(':') {
        if !key.is_empty() && !key.contains(char::is_whitespace) && lines.len() > 1 {
            return DocSection::Keyed {
                key: key.to_string(),
                body: rest(),
            };
        }
    }
    DocSection::Paragraph {
        body: lines.iter().map(|line| line.trim()).collect::<Vec<_>>().join("\n"),
    }
}

pub fn tag_value(sections: &[DocSection], tag: DocTag) -> Option<&str> {
    sections.iter().find_map(|section| match section {
        DocSection::Tag { tag: t, body } if *t == tag => Some(body.as_str()),
        _ => None,
    })
}

/// Resolve a `GROUP` tag value to an index in `groups`. Unqualified group names
/// refer to the project the entry is defined in.
pub fn group_index(group_name: &str, entry_module: &QualifiedName, groups: &[Group]) -> Option<usize> {
    let normalized = if group_name.contains('.') {
        group_name.to_string()
    } else {
        format!("{}.{}", entry_module.project()?, group_name)
    };
    groups
        .iter()
        .position(|group| format!("{}.{}", group.project, group.name) == normalized)
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct DocumentationData {
    pub documentation: Vec<DocSection>,
    pub aliases: Vec<String>,
    pub icon_name: Option<String>,
    pub group_index: Option<usize>,
    pub is_private: bool,
    pub is_unstable: bool,
}

pub fn documentation_data(documentation: Option<&str>, defined_in: &QualifiedName, groups: &[Group]) -> DocumentationData {
    let parsed = documentation.map(parse_docs).unwrap_or_default();
    let group_index = tag_value(&parsed, DocTag::Group)
        .filter(|name| !name.is_empty())
        .and_then(|name| group_index(name, defined_in, groups));
    let icon_name = tag_value(&parsed, DocTag::Icon).map(str::to_string);
    let aliases = tag_value(&parsed, DocTag::Alias)
        .map(|aliases| aliases.split(',').map(|alias| alias.trim().to_string()).collect())
        .unwrap_or_default();
    let is_private = tag_value(&parsed, DocTag::Private).is_some();
    let is_unstable = tag_value(&parsed, DocTag::Unstable).is_some() || tag_value(&parsed, DocTag::Advanced).is_some();
    DocumentationData {
        documentation: parsed,
        aliases,
        icon_name,
        group_index,
        is_private,
        is_unstable,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn groups() -> Vec<Group> {
        vec![
            Group::new("Test1", QualifiedName::parse("Standard.Base").unwrap()),
            Group::new("Test2", QualifiedName::parse("Standard.Base").unwrap()),
            Group::new("Test1", QualifiedName::parse("local.Project").unwrap()),
        ]
    }

    #[test]
    fn test_parse_sections() {
        let docs = parse_docs(
            "ALIAS Sum, Add\nGROUP Standard.Base.Test2\n\nAdds two numbers.\nReally.\n\nArguments:\n- a: the first.\n\n> Example\n  Add one and two.\n  1 + 2",
        );
        assert_eq!(
            docs,
            vec![
                DocSection::Tag { tag: DocTag::Alias, body: "Sum, Add".into() },
                DocSection::Tag { tag: DocTag::Group, body: "Standard.Base.Test2".into() },
                DocSection::Paragraph { body: "Adds two numbers.\nReally.".into() },
                DocSection::Keyed { key: "Arguments".into(), body: "- a: the first.".into() },
                DocSection::Marked {
                    mark: Mark::Example,
                    header: "Example".into(),
                    body: "Add one and two.\n1 + 2".into(),
                },
            ]
        );
    }

    #[test]
    fn test_tags_only_lead() {
        let docs = parse_docs("Some text\n\nPRIVATE");
        assert_eq!(tag_value(&docs, DocTag::Private), None);
    }

    #[test]
    fn test_group_index() {
        let module = QualifiedName::parse("Standard.Base.Data").unwrap();
        assert_eq!(group_index("Test2", &module, &groups()), Some(1));
        assert_eq!(group_index("local.Project.Test1", &module, &groups()), Some(2));
        assert_eq!(group_index("Missing", &module, &groups()), None);
        let main = QualifiedName::parse("Main").unwrap();
        assert_eq!(group_index("Test1", &main, &groups()), None);
    }

    #[test]
    fn test_documentation_data() {
        let module = QualifiedName::parse("Standard.Base").unwrap();
        let data = documentation_data(Some("ALIAS Test Type,  Other \nICON data_input\nGROUP Test1\nADVANCED\n\nA Test type"), &module, &groups());
        assert_eq!(data.aliases, vec!["Test Type", "Other"]);
        assert_eq!(data.icon_name.as_deref(), Some("data_input"));
        assert_eq!(data.group_index, Some(0));
        assert!(data.is_unstable);
        assert!(!data.is_private);

        let empty = documentation_data(None, &module, &groups());
        assert_eq!(empty, DocumentationData::default());
    }
}
