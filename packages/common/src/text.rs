//! # Source Ranges and Text Edits
//!
//! All offsets are byte offsets into UTF-8 text and all ranges are half-open
//! (`[from, to)`).

use crate::error::CommonError;
use crate::result::CommonResult;
use serde::{Deserialize, Serialize};
use similar::{ChangeTag, TextDiff};
use std::fmt;

/// A half-open byte range in a source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SourceRange {
    pub from: usize,
    pub to: usize,
}

impl SourceRange {
    pub fn new(from: usize, to: usize) -> Self {
        debug_assert!(from <= to, "inverted range {from}..{to}");
        Self { from, to }
    }

    /// Empty range at `pos`.
    pub fn point(pos: usize) -> Self {
        Self { from: pos, to: pos }
    }

    pub fn len(&self) -> usize {
        self.to - self.from
    }

    pub fn is_empty(&self) -> bool {
        self.from == self.to
    }

    /// Whether the point `pos` is within the range (both ends inclusive).
    pub fn includes(&self, pos: usize) -> bool {
        self.from <= pos && self.to >= pos
    }

    /// Whether `self` fully contains `other`.
    pub fn encloses(&self, other: &SourceRange) -> bool {
        self.from <= other.from && self.to >= other.to
    }

    /// Whether the ranges meet.
    pub fn intersects(&self, other: &SourceRange) -> bool {
        self.from <= other.to && self.to >= other.from
    }

    pub fn is_before(&self, other: &SourceRange) -> bool {
        self.to <= other.from
    }

    pub fn translate(&self, offset: usize) -> Self {
        Self::new(self.from + offset, self.to + offset)
    }

    /// Serialize to a compact key usable in maps (`from:to`, hexadecimal).
    pub fn key(&self) -> String {
        format!("{:x}:{:x}", self.from, self.to)
    }

    /// Inverse of [`SourceRange::key`].
    pub fn from_key(key: &str) -> CommonResult<Self> {
        let (from, to) = key
            .split_once(':')
            .ok_or_else(|| CommonError::InvalidRangeKey(key.to_string()))?;
        let parse = |s: &str| {
            usize::from_str_radix(s, 16).map_err(|_| CommonError::InvalidRangeKey(key.to_string()))
        };
        Ok(Self::new(parse(from)?, parse(to)?))
    }

    pub fn slice<'a>(&self, text: &'a str) -> &'a str {
        &text[self.from..self.to]
    }
}

impl fmt::Display for SourceRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.from, self.to)
    }
}

/// A change that can be applied to text: replace `range` with `insert`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextEdit {
    pub range: SourceRange,
    pub insert: String,
}

impl TextEdit {
    pub fn new(from: usize, to: usize, insert: impl Into<String>) -> Self {
        Self {
            range: SourceRange::new(from, to),
            insert: insert.into(),
        }
    }

    pub fn insertion(pos: usize, insert: impl Into<String>) -> Self {
        Self::new(pos, pos, insert)
    }

    pub fn deletion(from: usize, to: usize) -> Self {
        Self::new(from, to, "")
    }

    /// Net change in text length caused by the edit.
    pub fn delta(&self) -> isize {
        self.insert.len() as isize - self.range.len() as isize
    }

    pub fn translate(&self, offset: usize) -> Self {
        Self {
            range: self.range.translate(offset),
            insert: self.insert.clone(),
        }
    }
}

/// Shift an edit expressed relative to a subtree so that it is relative to the whole text.
pub fn offset_edit(edit: &TextEdit, offset: usize) -> TextEdit {
    edit.translate(offset)
}

/// Apply non-overlapping edits (in any order) to `text`.
pub fn apply_text_edits(text: &str, edits: &[TextEdit]) -> String {
    let mut ordered: Vec<&TextEdit> = edits.iter().collect();
    ordered.sort_by_key(|edit| edit.range.from);

    let mut out = String::with_capacity(text.len());
    let mut start = 0;
    for edit in ordered {
        out.push_str(&text[start..edit.range.from]);
        out.push_str(&edit.insert);
        start = edit.range.to;
    }
    out.push_str(&text[start..]);
    out
}

/// Given text before and after a change, return one possible set of edits describing the change.
///
/// Adjacent deletions and insertions are merged, so the result never contains two
/// edits that touch without an unchanged character between them.
pub fn text_change_to_edits(before: &str, after: &str) -> Vec<TextEdit> {
    if before == after {
        return Vec::new();
    }
    let diff = TextDiff::from_chars(before, after);

    let mut edits = Vec::new();
    let mut pending: Option<TextEdit> = None;
    let mut pos = 0;
    for change in diff.iter_all_changes() {
        let value = change.value();
        match change.tag() {
            ChangeTag::Equal => {
                if let Some(edit) = pending.take() {
                    edits.push(edit);
                }
                pos += value.len();
            }
            ChangeTag::Delete => {
                let edit = pending.get_or_insert_with(|| TextEdit::insertion(pos, ""));
                edit.range.to += value.len();
                pos += value.len();
            }
            ChangeTag::Insert => {
                let edit = pending.get_or_insert_with(|| TextEdit::insertion(pos, ""));
                edit.insert.push_str(value);
            }
        }
    }
    if let Some(edit) = pending {
        edits.push(edit);
    }
    edits
}

fn map_start(pos: usize, edits: &[&TextEdit]) -> usize {
    let mut offset: isize = 0;
    for edit in edits {
        if pos < edit.range.from {
            break;
        }
        if pos <= edit.range.to {
            return (edit.range.from as isize + offset) as usize + edit.insert.len();
        }
        offset += edit.delta();
    }
    (pos as isize + offset) as usize
}

fn map_end(pos: usize, edits: &[&TextEdit]) -> usize {
    let mut offset: isize = 0;
    for edit in edits {
        if pos <= edit.range.from {
            break;
        }
        if pos <= edit.range.to {
            return (edit.range.from as isize + offset) as usize;
        }
        offset += edit.delta();
    }
    (pos as isize + offset) as usize
}

/// For each span in the text before `edits`, find the smallest span of the text after the edits
/// that contains all the text of the original span that was not deleted.
///
/// Spans whose content was deleted entirely are omitted from the result.
pub fn apply_text_edits_to_spans(
    edits: &[TextEdit],
    spans_before: &[SourceRange],
) -> Vec<(SourceRange, SourceRange)> {
    let mut ordered: Vec<&TextEdit> = edits.iter().collect();
    ordered.sort_by_key(|edit| edit.range.from);

    spans_before
        .iter()
        .filter_map(|before| {
            let start = map_start(before.from, &ordered);
            let end = map_end(before.to, &ordered);
            (end > start).then(|| (*before, SourceRange::new(start, end)))
        })
        .collect()
}

/// A tree whose nodes have spans; children spans are enclosed by their parents'.
pub trait SpanTree: Sized {
    type Id: Clone;

    fn id(&self) -> Self::Id;
    fn span(&self) -> SourceRange;
    fn children(&self) -> Vec<Self>;
}

/// For each range find the smallest node that fully encloses it.
///
/// Returns nodes paired with the ranges that are most closely enclosed by them.
pub fn enclosing_spans<T: SpanTree>(tree: &T, ranges: Vec<SourceRange>) -> Vec<(T::Id, Vec<SourceRange>)> {
    let mut results = Vec::new();
    collect_enclosing(tree, ranges, &mut results);
    results
}

fn collect_enclosing<T: SpanTree>(
    tree: &T,
    mut ranges: Vec<SourceRange>,
    results: &mut Vec<(T::Id, Vec<SourceRange>)>,
) {
    for child in tree.children() {
        let child_span = child.span();
        let (inside, outside): (Vec<_>, Vec<_>) =
            ranges.into_iter().partition(|range| child_span.encloses(range));
        ranges = outside;
        if !inside.is_empty() {
            collect_enclosing(&child, inside, results);
        }
    }
    if !ranges.is_empty() {
        results.push((tree.id(), ranges));
    }
}

/// Return the given range with any trailing spaces stripped.
pub fn trim_end(range: SourceRange, text: &str) -> SourceRange {
    let slice = range.slice(text);
    let trimmed = slice.trim_end_matches(' ');
    SourceRange::new(range.from, range.from + trimmed.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_key_roundtrip() {
        let range = SourceRange::new(10, 255);
        assert_eq!(range.key(), "a:ff");
        assert_eq!(SourceRange::from_key("a:ff").unwrap(), range);
        assert!(SourceRange::from_key("nope").is_err());
    }

    #[test]
    fn test_range_relations() {
        let outer = SourceRange::new(0, 10);
        let inner = SourceRange::new(2, 5);
        assert!(outer.encloses(&inner));
        assert!(!inner.encloses(&outer));
        assert!(inner.intersects(&SourceRange::new(5, 7)));
        assert!(inner.is_before(&SourceRange::new(5, 7)));
        assert!(outer.includes(10));
    }

    #[test]
    fn test_apply_text_edits_unordered() {
        let edits = vec![TextEdit::new(6, 11, "there"), TextEdit::new(0, 5, "Hi")];
        assert_eq!(apply_text_edits("hello world", &edits), "Hi there");
    }

    #[test]
    fn test_text_change_to_edits_reproduces_target() {
        let cases = [
            ("main = 23", "main = 42"),
            ("func arg1 arg2", "func arg1 newArg"),
            ("", "abc"),
            ("abc", ""),
            ("a\nb\nc", "a\nc\nb"),
            ("x = ünïcödé", "x = unicode"),
        ];
        for (before, after) in cases {
            let edits = text_change_to_edits(before, after);
            assert_eq!(apply_text_edits(before, &edits), after, "{before:?} -> {after:?}");
        }
    }

    #[test]
    fn test_text_change_to_edits_identical() {
        assert!(text_change_to_edits("same", "same").is_empty());
    }

    #[test]
    fn test_text_change_merges_replace() {
        let edits = text_change_to_edits("a = 1", "a = 2");
        assert_eq!(edits, vec![TextEdit::new(4, 5, "2")]);
    }

    #[test]
    fn test_spans_follow_edits() {
        // "main = 23" -> "main = 123"
        let edits = vec![TextEdit::insertion(7, "1")];
        let spans = vec![SourceRange::new(0, 4), SourceRange::new(7, 9), SourceRange::new(0, 9)];
        let mapped = apply_text_edits_to_spans(&edits, &spans);
        assert_eq!(
            mapped,
            vec![
                (SourceRange::new(0, 4), SourceRange::new(0, 4)),
                (SourceRange::new(7, 9), SourceRange::new(8, 10)),
                (SourceRange::new(0, 9), SourceRange::new(0, 10)),
            ]
        );
    }

    #[test]
    fn test_fully_deleted_span_dropped() {
        let edits = vec![TextEdit::deletion(2, 6)];
        let mapped = apply_text_edits_to_spans(&edits, &[SourceRange::new(3, 5)]);
        assert!(mapped.is_empty());
    }

    #[test]
    fn test_trim_end() {
        let text = "abc   ";
        assert_eq!(trim_end(SourceRange::new(0, 6), text), SourceRange::new(0, 3));
    }

    struct Tree {
        id: u32,
        span: SourceRange,
        children: Vec<Tree>,
    }

    impl<'a> SpanTree for &'a Tree {
        type Id = u32;
        fn id(&self) -> u32 {
            self.id
        }
        fn span(&self) -> SourceRange {
            self.span
        }
        fn children(&self) -> Vec<Self> {
            let tree: &'a Tree = *self;
            tree.children.iter().collect()
        }
    }

    #[test]
    fn test_enclosing_spans() {
        let tree = Tree {
            id: 0,
            span: SourceRange::new(0, 10),
            children: vec![
                Tree { id: 1, span: SourceRange::new(0, 4), children: vec![] },
                Tree { id: 2, span: SourceRange::new(5, 10), children: vec![] },
            ],
        };
        let results = enclosing_spans(
            &&tree,
            vec![SourceRange::new(1, 3), SourceRange::new(3, 6), SourceRange::new(6, 9)],
        );
        assert_eq!(
            results,
            vec![
                (1, vec![SourceRange::new(1, 3)]),
                (2, vec![SourceRange::new(6, 9)]),
                (0, vec![SourceRange::new(3, 6)]),
            ]
        );
    }
}
