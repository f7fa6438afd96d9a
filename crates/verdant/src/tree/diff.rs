//! Changed-range computation between an edited tree and its reparse.

use crate::syntax::{GreenNode, TextRange};
use crate::tree::Tree;
use std::sync::Arc;

impl Tree {
    /// Byte ranges whose syntactic structure differs between `self`, an
    /// edited tree, and `new`, the tree produced by reparsing it. Ranges
    /// are in the coordinates of the new text, sorted and disjoint.
    ///
    /// Subtrees shared between the two trees are skipped without being
    /// visited.
    #[must_use]
    pub fn changed_ranges(&self, new: &Self) -> Vec<TextRange> {
        let mut ranges = Vec::new();
        compare(&self.root, 0, &new.root, 0, &mut ranges);
        ranges.sort_unstable();

        let mut merged: Vec<TextRange> = Vec::with_capacity(ranges.len());
        for range in ranges {
            match merged.last_mut() {
                Some(last) if last.touches(range) => *last = last.cover(range),
                _ => merged.push(range),
            }
        }
        merged
    }
}

fn compare(
    old: &Arc<GreenNode>,
    old_start: u32,
    new: &Arc<GreenNode>,
    new_start: u32,
    out: &mut Vec<TextRange>,
) {
    if old_start == new_start && (Arc::ptr_eq(old, new) || old.structurally_eq(new)) {
        return;
    }
    let old_range = TextRange::at(old_start, old.size().bytes);
    let new_range = TextRange::at(new_start, new.size().bytes);
    if old.symbol() != new.symbol()
        || old.is_leaf()
        || new.is_leaf()
        || old.child_count() != new.child_count()
        || old_start != new_start
    {
        out.push(old_range.cover(new_range));
        return;
    }

    let mut old_offset = old_start;
    let mut new_offset = new_start;
    for (old_child, new_child) in old.children().iter().zip(new.children()) {
        compare(old_child, old_offset, new_child, new_offset, out);
        old_offset += old_child.size().bytes;
        new_offset += new_child.size().bytes;
    }
}

#[cfg(test)]
mod tests {
    use crate::Parser;
    use crate::syntax::TextRange;
    use crate::testing::grammars;
    use crate::tree::InputEdit;

    #[test]
    fn test_changed_ranges_localized() {
        let mut parser = Parser::new();
        parser.set_language(grammars::toy()).unwrap();
        let options = Default::default();
        let text = "fn a() { x }\nfn b() { y }";
        let tree = parser.parse(text, None, &options).unwrap();

        let edit = InputEdit::for_replacement(text.as_bytes(), TextRange::new(9, 10), b"1");
        let edited = tree.edit(&edit).unwrap();
        let new_text = "fn a() { 1 }\nfn b() { y }";
        let reparsed = parser.parse(new_text, Some(&edited), &options).unwrap();

        let ranges = edited.changed_ranges(&reparsed);
        assert_eq!(ranges.len(), 1);
        assert!(ranges[0].contains_range(TextRange::new(9, 10)));
        assert!(ranges[0].end() <= 13);
    }

    #[test]
    fn test_identical_trees_have_no_changes() {
        let mut parser = Parser::new();
        parser.set_language(grammars::toy()).unwrap();
        let tree = parser
            .parse("fn a() {}", None, &Default::default())
            .unwrap();
        assert!(tree.changed_ranges(&tree.clone()).is_empty());
    }
}
