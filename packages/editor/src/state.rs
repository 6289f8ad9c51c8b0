//! Editor document state and the transactions that change it.

use crate::change_set::{Assoc, ChangeSet};
use crate::errors::EditorResult;
use enso_common::TextEdit;

/// A selection range; `anchor == head` is a cursor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Selection {
    pub anchor: usize,
    pub head: usize,
}

impl Selection {
    pub fn cursor(pos: usize) -> Self {
        Self { anchor: pos, head: pos }
    }

    pub fn range(anchor: usize, head: usize) -> Self {
        Self { anchor, head }
    }

    pub fn from(&self) -> usize {
        self.anchor.min(self.head)
    }

    pub fn to(&self) -> usize {
        self.anchor.max(self.head)
    }

    pub fn is_empty(&self) -> bool {
        self.anchor == self.head
    }

    pub fn map(&self, changes: &ChangeSet) -> Self {
        Self {
            anchor: changes.map_pos(self.anchor, Assoc::After),
            head: changes.map_pos(self.head, Assoc::After),
        }
    }

    fn clamp(self, len: usize) -> Self {
        Self {
            anchor: self.anchor.min(len),
            head: self.head.min(len),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    pub changes: ChangeSet,
    /// Selection after the transaction; mapped through the changes when `None`.
    pub selection: Option<Selection>,
    /// Set on transactions that bring the editor in line with the module.
    /// The synchronization engine never feeds these back into the module.
    pub synchronized: bool,
}

impl Transaction {
    pub fn new(changes: ChangeSet) -> Self {
        Self {
            changes,
            selection: None,
            synchronized: false,
        }
    }

    /// A transaction applying `edits` (relative to the current document) to `state`.
    pub fn edits(state: &EditorState, edits: &[TextEdit]) -> EditorResult<Self> {
        Ok(Self::new(ChangeSet::of(state.doc().len(), edits)?))
    }

    pub fn with_selection(mut self, selection: Selection) -> Self {
        self.selection = Some(selection);
        self
    }

    pub fn synchronized(mut self) -> Self {
        self.synchronized = true;
        self
    }

    pub fn doc_changed(&self) -> bool {
        !self.changes.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditorState {
    doc: String,
    selection: Selection,
}

impl EditorState {
    pub fn new(doc: impl Into<String>) -> Self {
        Self {
            doc: doc.into(),
            selection: Selection::default(),
        }
    }

    pub fn doc(&self) -> &str {
        &self.doc
    }

    pub fn selection(&self) -> Selection {
        self.selection
    }

    /// Apply a transaction. On error the state is left unchanged.
    pub fn apply(&mut self, transaction: &Transaction) -> EditorResult<()> {
        let doc = transaction.changes.apply(&self.doc)?;
        let selection = transaction
            .selection
            .unwrap_or_else(|| self.selection.map(&transaction.changes));
        self.selection = selection.clamp(doc.len());
        self.doc = doc;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selection_follows_typing() {
        let mut state = EditorState::new("x = 1");
        let place = Transaction::new(ChangeSet::empty(5)).with_selection(Selection::cursor(5));
        state.apply(&place).unwrap();

        let typed = Transaction::edits(&state, &[TextEdit::insertion(5, "23")]).unwrap();
        state.apply(&typed).unwrap();
        assert_eq!(state.doc(), "x = 123");
        assert_eq!(state.selection(), Selection::cursor(7));
    }

    #[test]
    fn test_failed_transaction_leaves_state() {
        let mut state = EditorState::new("abc");
        let wrong = Transaction::new(ChangeSet::empty(10));
        assert!(state.apply(&wrong).is_err());
        assert_eq!(state.doc(), "abc");
    }

    #[test]
    fn test_selection_range_accessors() {
        let selection = Selection::range(8, 3);
        assert_eq!((selection.from(), selection.to()), (3, 8));
        assert!(!selection.is_empty());
        assert!(!Transaction::new(ChangeSet::empty(2)).synchronized().doc_changed());
    }
}
