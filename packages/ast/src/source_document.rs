//! Text view of a module, kept up to date from module updates.

use crate::id::AstId;
use crate::module::{Module, ModuleUpdate};
use crate::print::print_with_spans;
use enso_common::text::text_change_to_edits;
use enso_common::{Origin, SourceRange, TextEdit};
use std::collections::HashMap;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tracing::trace;

/// Edits to the document text, relative to the text before the change.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceChange {
    pub edits: Vec<TextEdit>,
    pub origin: Option<Origin>,
}

/// The printed code of a module and the span of each of its nodes.
#[derive(Debug, Default)]
pub struct SourceDocument {
    text: String,
    spans: HashMap<AstId, SourceRange>,
    observers: Vec<UnboundedSender<SourceChange>>,
}

impl SourceDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn get_span(&self, id: AstId) -> Option<SourceRange> {
        self.spans.get(&id).copied()
    }

    /// Reset to an empty document.
    pub fn clear(&mut self) {
        self.spans.clear();
        if !self.text.is_empty() {
            let edit = TextEdit::deletion(0, self.text.len());
            self.text.clear();
            self.notify(SourceChange {
                edits: vec![edit],
                origin: None,
            });
        }
    }

    /// Bring the document up to date with `module` after `update` was applied to it.
    pub fn apply_update(&mut self, module: &Module, update: &ModuleUpdate) {
        for id in &update.nodes_deleted {
            self.spans.remove(id);
        }
        let Some(root) = module.root() else {
            self.clear();
            return;
        };
        let printed = print_with_spans(root);
        self.spans = printed.spans;
        if printed.code != self.text {
            let edits = text_change_to_edits(&self.text, &printed.code);
            trace!(edits = edits.len(), "source document changed");
            self.text = printed.code;
            self.notify(SourceChange {
                edits,
                origin: update.origin.clone(),
            });
        }
    }

    /// Subscribe to text changes. The current text, if any, is sent first as an insertion.
    pub fn observe(&mut self) -> UnboundedReceiver<SourceChange> {
        let (tx, rx) = unbounded_channel();
        if !self.text.is_empty() {
            let _ = tx.send(SourceChange {
                edits: vec![TextEdit::insertion(0, self.text.clone())],
                origin: None,
            });
        }
        self.observers.push(tx);
        rx
    }

    fn notify(&mut self, change: SourceChange) {
        self.observers.retain(|observer| observer.send(change.clone()).is_ok());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::construct::Ident;
    use enso_common::text::apply_text_edits;

    #[test]
    fn test_observer_receives_edits() {
        let mut module = Module::parse_with_name("x = 1", "Main").unwrap();
        let mut document = SourceDocument::new();
        let initial = ModuleUpdate::default();
        document.apply_update(&module, &initial);
        assert_eq!(document.text(), "x = 1");

        let mut changes = document.observe();
        let first = changes.try_recv().unwrap();
        assert_eq!(first.edits, vec![TextEdit::insertion(0, "x = 1")]);

        let target = module.root().unwrap().statements()[0].assignment_expression().unwrap().id();
        let mut edit = module.edit();
        let value = Ident::new(&mut edit, "y").unwrap();
        let _old = edit.replace(target, value).unwrap();
        let update = module.commit_edit(edit, Origin::Remote);
        document.apply_update(&module, &update);

        let change = changes.try_recv().unwrap();
        assert_eq!(change.origin, Some(Origin::Remote));
        assert_eq!(apply_text_edits("x = 1", &change.edits), "x = y");
        assert!(document.get_span(target).is_none());
    }

    #[test]
    fn test_spans_track_nodes() {
        let module = Module::parse_with_name("a = b", "Main").unwrap();
        let mut document = SourceDocument::new();
        document.apply_update(&module, &ModuleUpdate::default());
        let b = module.root().unwrap().statements()[0].assignment_expression().unwrap();
        assert_eq!(document.get_span(b.id()), Some(SourceRange::new(4, 5)));
    }

    #[test]
    fn test_clear_notifies_deletion() {
        let module = Module::parse_with_name("abc", "Main").unwrap();
        let mut document = SourceDocument::new();
        document.apply_update(&module, &ModuleUpdate::default());
        let mut changes = document.observe();
        let _initial = changes.try_recv().unwrap();
        document.clear();
        assert_eq!(changes.try_recv().unwrap().edits, vec![TextEdit::deletion(0, 3)]);
        assert_eq!(document.text(), "");
    }
}
