//! # Change Sets
//!
//! A [`ChangeSet`] describes how a document A turns into a document B as a run
//! of retained, deleted and inserted stretches of text. The change sets of
//! consecutive transactions compose into one, which lets a burst of keystrokes
//! reach the module as a single edit.
//!
//! Positions and lengths are byte offsets, like [`TextEdit`] ranges.

use crate::errors::{EditorError, EditorResult};
use enso_common::TextEdit;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Op {
    Retain(usize),
    Delete(usize),
    Insert(String),
}

/// Which side of text inserted exactly at a position the mapped position ends up on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Assoc {
    Before,
    After,
}

/// One contiguous replacement: `from_a..to_a` of document A became `from_b..to_b` of document B.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Change {
    pub from_a: usize,
    pub to_a: usize,
    pub from_b: usize,
    pub to_b: usize,
    pub insert: String,
}

impl Change {
    fn at(pos_a: usize, pos_b: usize) -> Self {
        Self {
            from_a: pos_a,
            to_a: pos_a,
            from_b: pos_b,
            to_b: pos_b,
            insert: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ChangeSet {
    ops: Vec<Op>,
    len: usize,
    new_len: usize,
}

fn slice(doc: &str, from: usize, to: usize) -> EditorResult<&str> {
    doc.get(from..to).ok_or_else(|| {
        let pos = if doc.is_char_boundary(from) { to } else { from };
        EditorError::NotCharBoundary(pos)
    })
}

fn split_at(text: &str, at: usize) -> EditorResult<(&str, &str)> {
    if text.is_char_boundary(at) {
        Ok(text.split_at(at))
    } else {
        Err(EditorError::NotCharBoundary(at))
    }
}

impl ChangeSet {
    /// A change set that leaves a document of length `len` untouched.
    pub fn empty(len: usize) -> Self {
        let mut set = Self::default();
        set.retain(len);
        set
    }

    /// Build a change set from edits, all expressed relative to a document of length `len`.
    /// Edits may come in any order but must not overlap.
    pub fn of(len: usize, edits: &[TextEdit]) -> EditorResult<Self> {
        let mut ordered: Vec<&TextEdit> = edits.iter().collect();
        ordered.sort_by_key(|edit| edit.range.from);

        let mut set = Self::default();
        let mut pos = 0;
        for edit in ordered {
            let (from, to) = (edit.range.from, edit.range.to);
            if from < pos || to < from || to > len {
                return Err(EditorError::InvalidEdit { from, to });
            }
            set.retain(from - pos);
            set.delete(to - from);
            set.insert(&edit.insert);
            pos = to;
        }
        set.retain(len - pos);
        Ok(set)
    }

    /// Length of the document the change set applies to.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Length of the document the change set produces.
    pub fn new_len(&self) -> usize {
        self.new_len
    }

    /// True if applying the change set does not change the document.
    pub fn is_empty(&self) -> bool {
        self.ops.iter().all(|op| matches!(op, Op::Retain(_)))
    }

    fn retain(&mut self, n: usize) {
        if n == 0 {
            return;
        }
        self.len += n;
        self.new_len += n;
        match self.ops.last_mut() {
            Some(Op::Retain(last)) => *last += n,
            _ => self.ops.push(Op::Retain(n)),
        }
    }

    fn delete(&mut self, n: usize) {
        if n == 0 {
            return;
        }
        self.len += n;
        match self.ops.last_mut() {
            Some(Op::Delete(last)) => *last += n,
            _ => self.ops.push(Op::Delete(n)),
        }
    }

    // Insertions are kept in front of an adjacent deletion, so equal change sets
    // have equal op sequences.
    fn insert(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        self.new_len += text.len();
        let merge_at = match self.ops.as_slice() {
            [.., Op::Insert(_)] => Some(self.ops.len() - 1),
            [.., Op::Insert(_), Op::Delete(_)] => Some(self.ops.len() - 2),
            _ => None,
        };
        match merge_at {
            Some(index) => {
                if let Op::Insert(existing) = &mut self.ops[index] {
                    existing.push_str(text);
                }
            }
            None if matches!(self.ops.last(), Some(Op::Delete(_))) => {
                let index = self.ops.len() - 1;
                self.ops.insert(index, Op::Insert(text.to_string()));
            }
            None => self.ops.push(Op::Insert(text.to_string())),
        }
    }

    pub fn apply(&self, doc: &str) -> EditorResult<String> {
        if doc.len() != self.len {
            return Err(EditorError::LengthMismatch {
                expected: self.len,
                found: doc.len(),
            });
        }
        let mut out = String::with_capacity(self.new_len);
        let mut pos = 0;
        for op in &self.ops {
            match op {
                Op::Retain(n) => {
                    out.push_str(slice(doc, pos, pos + n)?);
                    pos += n;
                }
                Op::Delete(n) => {
                    slice(doc, pos, pos + n)?;
                    pos += n;
                }
                Op::Insert(text) => out.push_str(text),
            }
        }
        Ok(out)
    }

    /// Combine with a change set applying to this one's output. The result maps
    /// this change set's input straight to `other`'s output.
    pub fn compose(&self, other: &ChangeSet) -> EditorResult<ChangeSet> {
        if self.new_len != other.len {
            return Err(EditorError::LengthMismatch {
                expected: self.new_len,
                found: other.len,
            });
        }
        let mut result = ChangeSet::default();
        let mut first = self.ops.iter().cloned();
        let mut second = other.ops.iter().cloned();
        let mut a = first.next();
        let mut b = second.next();

        loop {
            match (a.take(), b.take()) {
                (None, None) => break,
                (Some(Op::Delete(n)), next_b) => {
                    result.delete(n);
                    a = first.next();
                    b = next_b;
                }
                (next_a, Some(Op::Insert(text))) => {
                    result.insert(&text);
                    a = next_a;
                    b = second.next();
                }
                (Some(Op::Retain(n)), Some(Op::Retain(m))) => {
                    let k = n.min(m);
                    result.retain(k);
                    a = if n > k { Some(Op::Retain(n - k)) } else { first.next() };
                    b = if m > k { Some(Op::Retain(m - k)) } else { second.next() };
                }
                (Some(Op::Retain(n)), Some(Op::Delete(m))) => {
                    let k = n.min(m);
                    result.delete(k);
                    a = if n > k { Some(Op::Retain(n - k)) } else { first.next() };
                    b = if m > k { Some(Op::Delete(m - k)) } else { second.next() };
                }
                (Some(Op::Insert(text)), Some(Op::Retain(m))) => {
                    let k = text.len().min(m);
                    let (head, tail) = split_at(&text, k)?;
                    result.insert(head);
                    a = if tail.is_empty() { first.next() } else { Some(Op::Insert(tail.to_string())) };
                    b = if m > k { Some(Op::Retain(m - k)) } else { second.next() };
                }
                (Some(Op::Insert(text)), Some(Op::Delete(m))) => {
                    let k = text.len().min(m);
                    let (_, tail) = split_at(&text, k)?;
                    a = if tail.is_empty() { first.next() } else { Some(Op::Insert(tail.to_string())) };
                    b = if m > k { Some(Op::Delete(m - k)) } else { second.next() };
                }
                (Some(_), None) | (None, Some(_)) => {
                    return Err(EditorError::LengthMismatch {
                        expected: self.new_len,
                        found: other.len,
                    })
                }
            }
        }
        Ok(result)
    }

    /// The change set undoing this one. `doc` is the document this one applies to.
    pub fn invert(&self, doc: &str) -> EditorResult<ChangeSet> {
        if doc.len() != self.len {
            return Err(EditorError::LengthMismatch {
                expected: self.len,
                found: doc.len(),
            });
        }
        let mut inverse = ChangeSet::default();
        let mut pos = 0;
        for op in &self.ops {
            match op {
                Op::Retain(n) => {
                    inverse.retain(*n);
                    pos += n;
                }
                Op::Delete(n) => {
                    inverse.insert(slice(doc, pos, pos + n)?);
                    pos += n;
                }
                Op::Insert(text) => inverse.delete(text.len()),
            }
        }
        Ok(inverse)
    }

    /// The replacements made by the change set, in document order.
    pub fn iter_changes(&self) -> impl Iterator<Item = Change> {
        let mut changes = Vec::new();
        let (mut pos_a, mut pos_b) = (0, 0);
        let mut current: Option<Change> = None;
        for op in &self.ops {
            match op {
                Op::Retain(n) => {
                    changes.extend(current.take());
                    pos_a += n;
                    pos_b += n;
                }
                Op::Delete(n) => {
                    let change = current.get_or_insert_with(|| Change::at(pos_a, pos_b));
                    pos_a += n;
                    change.to_a = pos_a;
                }
                Op::Insert(text) => {
                    let change = current.get_or_insert_with(|| Change::at(pos_a, pos_b));
                    pos_b += text.len();
                    change.to_b = pos_b;
                    change.insert.push_str(text);
                }
            }
        }
        changes.extend(current);
        changes.into_iter()
    }

    /// Edits relative to document A, suitable for [`enso_common::text::apply_text_edits`].
    pub fn to_text_edits(&self) -> Vec<TextEdit> {
        self.iter_changes()
            .map(|change| TextEdit::new(change.from_a, change.to_a, change.insert))
            .collect()
    }

    /// Map a position in document A to document B. Positions inside deleted
    /// text map to the end of the text replacing it.
    pub fn map_pos(&self, pos: usize, assoc: Assoc) -> usize {
        let (mut pos_a, mut pos_b) = (0, 0);
        for op in &self.ops {
            match op {
                Op::Retain(n) => {
                    if pos < pos_a + n {
                        return pos_b + (pos - pos_a);
                    }
                    pos_a += n;
                    pos_b += n;
                }
                Op::Insert(text) => {
                    if pos == pos_a && assoc == Assoc::Before {
                        return pos_b;
                    }
                    pos_b += text.len();
                }
                Op::Delete(n) => {
                    if pos < pos_a + n {
                        return pos_b;
                    }
                    pos_a += n;
                }
            }
        }
        (pos_b + pos.saturating_sub(pos_a)).min(self.new_len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(doc: &str, edits: &[TextEdit]) -> ChangeSet {
        ChangeSet::of(doc.len(), edits).unwrap()
    }

    #[test]
    fn test_apply_unordered_edits() {
        let doc = "main = 42";
        let changes = set(doc, &[TextEdit::new(7, 9, "23"), TextEdit::new(0, 4, "func")]);
        assert_eq!(changes.apply(doc).unwrap(), "func = 23");
        assert_eq!(changes.len(), 9);
        assert_eq!(changes.new_len(), 9);
    }

    #[test]
    fn test_overlapping_edits_rejected() {
        let result = ChangeSet::of(10, &[TextEdit::new(0, 5, "a"), TextEdit::new(3, 6, "b")]);
        assert!(matches!(result, Err(EditorError::InvalidEdit { from: 3, to: 6 })));
        assert!(ChangeSet::of(3, &[TextEdit::new(2, 4, "")]).is_err());
    }

    #[test]
    fn test_compose_matches_sequential_application() {
        let doc = "x = f 1";
        let first = set(doc, &[TextEdit::insertion(7, "0")]);
        let after_first = first.apply(doc).unwrap();
        let second = set(&after_first, &[TextEdit::new(4, 5, "g"), TextEdit::insertion(8, " 2")]);
        let after_second = second.apply(&after_first).unwrap();
        let third = set(&after_second, &[TextEdit::deletion(0, 4)]);
        let expected = third.apply(&after_second).unwrap();

        let composed = first.compose(&second).unwrap().compose(&third).unwrap();
        assert_eq!(composed.apply(doc).unwrap(), expected);
        assert_eq!(expected, "g 10 2");
    }

    #[test]
    fn test_compose_typing_then_backspace() {
        let doc = "ab";
        let typed = set(doc, &[TextEdit::insertion(1, "xyz")]);
        let erased = set("axyzb", &[TextEdit::deletion(2, 4)]);
        let composed = typed.compose(&erased).unwrap();
        assert_eq!(composed.apply(doc).unwrap(), "axb");
        assert_eq!(composed.to_text_edits(), vec![TextEdit::insertion(1, "x")]);
    }

    #[test]
    fn test_compose_length_mismatch() {
        let a = ChangeSet::empty(3);
        let b = ChangeSet::empty(4);
        assert!(matches!(a.compose(&b), Err(EditorError::LengthMismatch { .. })));
    }

    #[test]
    fn test_invert_restores_document() {
        let doc = "node1 = Data.read 'x'";
        let changes = set(doc, &[TextEdit::new(0, 5, "table"), TextEdit::new(18, 21, "'y.csv'")]);
        let changed = changes.apply(doc).unwrap();
        let inverse = changes.invert(doc).unwrap();
        assert_eq!(inverse.apply(&changed).unwrap(), doc);
    }

    #[test]
    fn test_iter_changes_positions() {
        let doc = "abcdef";
        let changes = set(doc, &[TextEdit::new(1, 2, "XY"), TextEdit::deletion(4, 6)]);
        let collected: Vec<Change> = changes.iter_changes().collect();
        assert_eq!(
            collected,
            vec![
                Change { from_a: 1, to_a: 2, from_b: 1, to_b: 3, insert: "XY".into() },
                Change { from_a: 4, to_a: 6, from_b: 5, to_b: 5, insert: String::new() },
            ]
        );
    }

    #[test]
    fn test_map_pos() {
        let changes = set("hello world", &[TextEdit::insertion(5, ","), TextEdit::deletion(6, 11)]);
        assert_eq!(changes.map_pos(2, Assoc::After), 2);
        assert_eq!(changes.map_pos(5, Assoc::Before), 5);
        assert_eq!(changes.map_pos(5, Assoc::After), 6);
        assert_eq!(changes.map_pos(8, Assoc::After), 7);
        assert_eq!(changes.map_pos(11, Assoc::After), 7);
    }

    #[test]
    fn test_multibyte_boundaries() {
        let doc = "a = 'é'";
        let bad = ChangeSet::of(doc.len(), &[TextEdit::deletion(5, 6)]).unwrap();
        assert!(matches!(bad.apply(doc), Err(EditorError::NotCharBoundary(6))));
        assert!(ChangeSet::empty(doc.len()).is_empty());
    }
}
