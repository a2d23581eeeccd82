//! Immutable script snapshots.

use rustc_hash::FxHashMap;
use std::cell::RefCell;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_SNAPSHOT_ID: AtomicU64 = AtomicU64::new(0);

/// A contiguous span of an old snapshot's text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextSpan {
    pub start: usize,
    pub length: usize,
}

/// The edit turning one snapshot's text into another's.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextChangeRange {
    /// The replaced span in the old text.
    pub span: TextSpan,
    /// The length of the replacement in the new text.
    pub new_length: usize,
}

/// An immutable snapshot of one script's text.
///
/// The TGT service sees snapshots through `get_text`, `get_length`, and
/// `get_change_range` only. Change ranges are memoised per old-snapshot
/// identity: the service compares snapshot objects by identity, so asking
/// twice must yield the same answer without re-diffing.
#[derive(Debug)]
pub struct ScriptSnapshot {
    id: u64,
    text: String,
    change_ranges: RefCell<FxHashMap<u64, TextChangeRange>>,
}

impl ScriptSnapshot {
    /// Creates a snapshot over the given text.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            id: NEXT_SNAPSHOT_ID.fetch_add(1, Ordering::Relaxed),
            text: text.into(),
            change_ranges: RefCell::new(FxHashMap::default()),
        }
    }

    /// A process-unique identity for this snapshot.
    #[inline]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// The slice of text in `[start, end)`, clamped to the snapshot.
    pub fn get_text(&self, start: usize, end: usize) -> &str {
        let len = self.text.len();
        let start = start.min(len);
        let end = end.clamp(start, len);
        &self.text[start..end]
    }

    /// The full text length in bytes.
    #[inline]
    pub fn get_length(&self) -> usize {
        self.text.len()
    }

    /// The whole text.
    #[inline]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// The edit that turns `old`'s text into this snapshot's text.
    pub fn get_change_range(&self, old: &ScriptSnapshot) -> TextChangeRange {
        if let Some(range) = self.change_ranges.borrow().get(&old.id) {
            return *range;
        }
        let range = diff_change_range(&old.text, &self.text);
        self.change_ranges.borrow_mut().insert(old.id, range);
        range
    }
}

/// Finds the single edit between two texts as the span left over after the
/// longest common prefix and suffix.
fn diff_change_range(old: &str, new: &str) -> TextChangeRange {
    let old_bytes = old.as_bytes();
    let new_bytes = new.as_bytes();

    let max_prefix = old_bytes.len().min(new_bytes.len());
    let mut prefix = 0;
    while prefix < max_prefix && old_bytes[prefix] == new_bytes[prefix] {
        prefix += 1;
    }

    let max_suffix = max_prefix - prefix;
    let mut suffix = 0;
    while suffix < max_suffix
        && old_bytes[old_bytes.len() - 1 - suffix] == new_bytes[new_bytes.len() - 1 - suffix]
    {
        suffix += 1;
    }

    TextChangeRange {
        span: TextSpan {
            start: prefix,
            length: old.len() - prefix - suffix,
        },
        new_length: new.len() - prefix - suffix,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_text_clamps() {
        let snap = ScriptSnapshot::new("hello");
        assert_eq!(snap.get_text(0, 5), "hello");
        assert_eq!(snap.get_text(1, 3), "el");
        assert_eq!(snap.get_text(3, 99), "lo");
        assert_eq!(snap.get_text(99, 120), "");
        assert_eq!(snap.get_length(), 5);
    }

    #[test]
    fn test_change_range_middle_edit() {
        let old = ScriptSnapshot::new("let x = 1;");
        let new = ScriptSnapshot::new("let xyz = 1;");

        let range = new.get_change_range(&old);
        assert_eq!(range.span.start, 5);
        assert_eq!(range.span.length, 0);
        assert_eq!(range.new_length, 2);
    }

    #[test]
    fn test_change_range_identical_texts() {
        let old = ScriptSnapshot::new("same");
        let new = ScriptSnapshot::new("same");

        let range = new.get_change_range(&old);
        assert_eq!(range.span.length, 0);
        assert_eq!(range.new_length, 0);
    }

    #[test]
    fn test_change_range_full_replacement() {
        let old = ScriptSnapshot::new("abc");
        let new = ScriptSnapshot::new("xyzw");

        let range = new.get_change_range(&old);
        assert_eq!(range.span, TextSpan { start: 0, length: 3 });
        assert_eq!(range.new_length, 4);
    }

    #[test]
    fn test_change_range_memoised() {
        let old = ScriptSnapshot::new("one");
        let new = ScriptSnapshot::new("two");

        let first = new.get_change_range(&old);
        let second = new.get_change_range(&old);
        assert_eq!(first, second);
        assert_eq!(new.change_ranges.borrow().len(), 1);
    }

    #[test]
    fn test_overlapping_prefix_suffix() {
        // "aa" -> "aaa": prefix must not be double-counted by the suffix.
        let old = ScriptSnapshot::new("aa");
        let new = ScriptSnapshot::new("aaa");

        let range = new.get_change_range(&old);
        assert_eq!(range.span, TextSpan { start: 2, length: 0 });
        assert_eq!(range.new_length, 1);
    }
}
