//! Documentation comments attached to statements.
//!
//! A `##` comment on the line before a statement documents it; continuation
//! lines are indented past the `##`.

use crate::error::AstResult;
use crate::id::AstId;
use crate::module::MutableModule;
use crate::node::{Child, ChildNode, Node, NodeKind, TokenData};
use enso_parser::TokenKind;

/// The `Documented` node wrapping `statement`, or `statement` itself if it is one.
fn documented_wrapper(statement: Node<'_>) -> Option<Node<'_>> {
    if statement.kind() == NodeKind::Documented {
        return Some(statement);
    }
    statement.parent_node().filter(|p| p.kind() == NodeKind::Documented)
}

fn doc_token(documented: Node<'_>) -> Option<&TokenData> {
    documented.tokens().find(|t| t.kind == TokenKind::DocComment)
}

/// Text of the documentation attached to `statement`, without the `##` marker
/// and continuation indentation.
pub fn documentation_text(statement: Node<'_>) -> Option<String> {
    let token = doc_token(documented_wrapper(statement)?)?;
    let raw = token.code.strip_prefix("##").unwrap_or(&token.code);
    let mut lines = raw.split('\n');
    let first = lines.next().unwrap_or("").trim_start().trim_end_matches('\r');
    let mut text = first.to_string();
    for line in lines {
        text.push('\n');
        text.push_str(line.trim_start_matches([' ', '\t']).trim_end_matches('\r'));
    }
    Some(text)
}

fn doc_comment_code(text: &str, indent: &str) -> String {
    let mut lines = text.split('\n');
    let mut code = String::from("##");
    if let Some(first) = lines.next().filter(|l| !l.is_empty()) {
        code.push(' ');
        code.push_str(first);
    }
    for line in lines {
        code.push('\n');
        if !line.is_empty() {
            code.push_str(indent);
            code.push_str("   ");
            code.push_str(line);
        }
    }
    code
}

impl MutableModule {
    /// Set the documentation of `statement`. Empty text removes the comment.
    pub fn set_documentation_text(&mut self, statement: AstId, text: &str) -> AstResult<()> {
        let node = self.get_version(statement)?;
        let wrapper = documented_wrapper(node).map(|n| n.id());
        let indent = wrapper
            .and_then(|id| self.try_get(id))
            .unwrap_or(node)
            .slot_whitespace()
            .unwrap_or("")
            .to_string();
        let inner = match wrapper {
            Some(id) => self.get_version(id)?.documented_statement().map(|n| n.id()),
            None => Some(statement),
        };

        match (wrapper, text.is_empty()) {
            (None, true) => Ok(()),
            (Some(documented), true) => self.remove_documentation(documented, inner),
            (Some(documented), false) => {
                let code = doc_comment_code(text, &indent);
                let node = self.get_version(documented)?;
                let kind = node.kind();
                let children = node
                    .concrete_children()
                    .iter()
                    .cloned()
                    .map(|mut child| {
                        if let ChildNode::Token(token) = &mut child.node {
                            if token.kind == TokenKind::DocComment {
                                token.code = code.clone();
                            }
                        }
                        child
                    })
                    .collect();
                self.set_fields(documented, kind, children)
            }
            (None, false) => {
                let code = doc_comment_code(text, &indent);
                let placeholder = crate::construct::Wildcard::new(self);
                let placeholder_id = placeholder.id();
                let statement = self.replace(statement, placeholder)?;
                let documented = self.insert_node(
                    NodeKind::Documented,
                    vec![
                        Child::token(TokenKind::DocComment, code).with_whitespace(""),
                        Child::token(TokenKind::Newline, "\n").with_whitespace(""),
                        Child::ast(statement.id()).with_whitespace(indent),
                    ],
                );
                let _placeholder = self.replace(placeholder_id, documented)?;
                Ok(())
            }
        }
    }

    fn remove_documentation(&mut self, documented: AstId, inner: Option<AstId>) -> AstResult<()> {
        match inner {
            Some(inner) => {
                let statement = self.take(inner)?;
                let _documented = self.replace(documented, statement)?;
                Ok(())
            }
            None => {
                // A comment that documents nothing: drop the line holding it.
                let Some(parent) = self.get_version(documented)?.parent() else {
                    return Ok(());
                };
                let parent_node = self.get_version(parent)?;
                let kind = parent_node.kind();
                let mut children = parent_node.concrete_children().to_vec();
                if let Some(index) = children.iter().position(|c| c.ast_id() == Some(documented)) {
                    children.remove(index);
                    let preceded_by_newline = index > 0
                        && children[index - 1].token_data().is_some_and(|t| t.kind == TokenKind::Newline);
                    if preceded_by_newline {
                        children.remove(index - 1);
                    }
                }
                self.set_fields(parent, kind, children)?;
                self.set_parent(documented, None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::Module;

    #[test]
    fn test_multiline_documentation() {
        let code = "main =\n    ## A multiline\n       component comment\n    x";
        let module = Module::parse_with_name(code, "Main").unwrap();
        let main = module.root().unwrap().statements()[0];
        let documented = main.function_body().unwrap().statements()[0];
        let statement = documented.documented_statement().unwrap();

        assert_eq!(
            documentation_text(statement).as_deref(),
            Some("A multiline\ncomponent comment")
        );

        let mut edit = module.edit();
        edit.set_documentation_text(statement.id(), "A multiline\ncomponent comment")
            .unwrap();
        assert_eq!(edit.code(), code);
    }

    #[test]
    fn test_add_documentation() {
        let module = Module::parse_with_name("## Simple\nnode", "Main").unwrap();
        let documented = module.root().unwrap().statements()[0];
        assert_eq!(documentation_text(documented).as_deref(), Some("Simple"));

        let plain = Module::parse_with_name("node", "Main").unwrap();
        let statement = plain.root().unwrap().statements()[0].id();
        let mut edit = plain.edit();
        edit.set_documentation_text(statement, "Simple").unwrap();
        assert_eq!(edit.code(), "## Simple\nnode");
        let statement = edit.get_version(statement).unwrap();
        assert_eq!(documentation_text(statement).as_deref(), Some("Simple"));
    }

    #[test]
    fn test_indented_statement_gets_indented_comment() {
        let module = Module::parse_with_name("main =\n    x = 1\n    x", "Main").unwrap();
        let main = module.root().unwrap().statements()[0];
        let x = main.function_body().unwrap().statements()[0].id();
        let mut edit = module.edit();
        edit.set_documentation_text(x, "First\nSecond").unwrap();
        assert_eq!(edit.code(), "main =\n    ## First\n       Second\n    x = 1\n    x");
    }

    #[test]
    fn test_empty_text_removes_documentation() {
        let module = Module::parse_with_name("## Simple\nnode", "Main").unwrap();
        let statement = module.root().unwrap().statements()[0].documented_statement().unwrap().id();
        let mut edit = module.edit();
        edit.set_documentation_text(statement, "").unwrap();
        assert_eq!(edit.code(), "node");
        assert!(documentation_text(edit.get_version(statement).unwrap()).is_none());
    }
}
