//! # Tree Editing
//!
//! [`Tree::edit`] shifts a tree's ranges to account for a text change
//! without reparsing. Only nodes whose range, lookahead reach included,
//! touches the edit are copied; they are flagged as changed so that the next
//! parse does not reuse them. Every other subtree is shared with the
//! original tree.

use crate::error::EditError;
use crate::syntax::{GreenNode, Length, LineIndex, Point, TextRange};
use crate::tree::Tree;
#[cfg(feature = "serialize")]
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// One text change, described in byte offsets and points.
///
/// `start` and `old_end` are positions in the text before the change;
/// `new_end` is where the replacement ends in the text after it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct InputEdit {
    pub start_byte: u32,
    pub old_end_byte: u32,
    pub new_end_byte: u32,
    pub start_position: Point,
    pub old_end_position: Point,
    pub new_end_position: Point,
}

impl InputEdit {
    /// Edit that replaces `range` of `old_text` with `replacement`.
    ///
    /// ```rust
    /// use verdant::syntax::{Point, TextRange};
    /// use verdant::tree::InputEdit;
    ///
    /// let edit = InputEdit::for_replacement(b"fn a() {}", TextRange::new(3, 4), b"b\n");
    /// assert_eq!(edit.new_end_byte, 5);
    /// assert_eq!(edit.new_end_position, Point::new(1, 0));
    /// ```
    #[must_use]
    pub fn for_replacement(old_text: &[u8], range: TextRange, replacement: &[u8]) -> Self {
        let index = LineIndex::new(old_text);
        let start_position = index.point(range.start());
        let inserted = Length::of(replacement);
        Self {
            start_byte: range.start(),
            old_end_byte: range.end(),
            new_end_byte: range.start().saturating_add(inserted.bytes),
            start_position,
            old_end_position: index.point(range.end()),
            new_end_position: start_position + inserted.extent,
        }
    }

    const fn start(&self) -> Length {
        Length::new(self.start_byte, self.start_position)
    }

    const fn old_end(&self) -> Length {
        Length::new(self.old_end_byte, self.old_end_position)
    }

    const fn new_end(&self) -> Length {
        Length::new(self.new_end_byte, self.new_end_position)
    }

    fn validate(&self, previous: Option<&Self>, len: u32) -> Result<(), EditError> {
        if let Some(previous) = previous
            && self.start_byte < previous.start_byte
        {
            return Err(EditError::OutOfOrder {
                previous: previous.start_byte,
                start: self.start_byte,
            });
        }
        if self.old_end_byte < self.start_byte || self.new_end_byte < self.start_byte {
            return Err(EditError::InvalidRange {
                start: self.start_byte,
                old_end: self.old_end_byte,
                new_end: self.new_end_byte,
            });
        }
        if self.old_end_byte > len {
            return Err(EditError::OutOfBounds {
                old_end: self.old_end_byte,
                len,
            });
        }
        Ok(())
    }
}

/// An edit expressed relative to the start of the node it is applied to.
#[derive(Debug, Clone, Copy)]
struct RelativeEdit {
    start: Length,
    old_end: Length,
    new_end: Length,
}

impl Tree {
    /// Return a copy of this tree whose ranges account for `edit`.
    ///
    /// Edits must be applied in non-decreasing start order, each in the
    /// coordinates produced by the edits before it.
    ///
    /// # Errors
    ///
    /// [`EditError`] when the edit starts before the previous one, has an
    /// inverted range, or ends past the end of the tree.
    pub fn edit(&self, edit: &InputEdit) -> Result<Self, EditError> {
        edit.validate(self.edits.last(), self.len())?;
        let root = edit_node(
            &self.root,
            RelativeEdit {
                start: edit.start(),
                old_end: edit.old_end(),
                new_end: edit.new_end(),
            },
        );
        let mut edits = self.edits.clone();
        edits.push(*edit);
        tracing::trace!(
            start = edit.start_byte,
            old_end = edit.old_end_byte,
            new_end = edit.new_end_byte,
            "edited tree"
        );
        Ok(Self {
            root,
            language: self.language.clone(),
            edits,
        })
    }
}

fn edit_node(node: &Arc<GreenNode>, edit: RelativeEdit) -> Arc<GreenNode> {
    let size = node.size();
    let is_noop = edit.old_end.bytes == edit.start.bytes && edit.start.bytes == edit.new_end.bytes;
    let mut is_pure_insertion = edit.old_end.bytes == edit.start.bytes;
    let reach = size.bytes.saturating_add(node.lookahead_bytes());
    if edit.start.bytes > reach || (is_noop && edit.start.bytes == reach) {
        return Arc::clone(node);
    }

    let new_size = if edit.start.bytes < size.bytes
        || (edit.start.bytes == size.bytes && is_pure_insertion)
    {
        edit.new_end + size.saturating_sub(edit.old_end)
    } else {
        size
    };

    if node.is_leaf() {
        return node.edited(new_size, None);
    }

    let mut edit = edit;
    let mut children = node.children().to_vec();
    let mut right = Length::zero();
    for (index, child) in children.iter_mut().enumerate() {
        let child_size = child.size();
        let left = right;
        right = left + child_size;

        if right.bytes.saturating_add(child.lookahead_bytes()) < edit.start.bytes {
            continue;
        }
        if left.bytes > edit.old_end.bytes
            || (left.bytes == edit.old_end.bytes && child_size.bytes > 0 && index > 0)
        {
            break;
        }

        let mut child_edit = RelativeEdit {
            start: edit.start.saturating_sub(left),
            old_end: edit.old_end.saturating_sub(left),
            new_end: edit.new_end.saturating_sub(left),
        };
        // The first child touching the edit takes all inserted text; later
        // ones only shrink.
        if right.bytes > edit.start.bytes || (right.bytes == edit.start.bytes && is_pure_insertion)
        {
            edit.new_end = edit.start;
            is_pure_insertion = false;
        } else {
            child_edit.old_end = child_edit.start;
            child_edit.new_end = child_edit.start;
        }
        *child = edit_node(child, child_edit);
    }
    node.edited(new_size, Some(children))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Parser;
    use crate::testing::grammars;

    fn parse(text: &str) -> Tree {
        let mut parser = Parser::new();
        parser.set_language(grammars::toy()).unwrap();
        parser.parse(text, None, &Default::default()).unwrap()
    }

    fn ranges(tree: &Tree) -> Vec<(u32, u32, Point, Point)> {
        let mut out = Vec::new();
        let mut pending = vec![tree.root_node()];
        while let Some(node) = pending.pop() {
            out.push((
                node.start_byte(),
                node.end_byte(),
                node.start_point(),
                node.end_point(),
            ));
            pending.extend(node.children());
        }
        out
    }

    #[test]
    fn test_insertion_shifts_later_nodes() {
        let text = "fn a() { 1 }\nfn b() { 2 }";
        let tree = parse(text);
        let edit = InputEdit::for_replacement(text.as_bytes(), TextRange::new(9, 10), b"100");
        let edited = tree.edit(&edit).unwrap();
        assert_eq!(edited.len(), tree.len() + 2);

        let second = edited.root_node().child(1).unwrap();
        assert_eq!(second.start_byte(), 15);
        assert_eq!(second.start_point(), Point::new(1, 0));
        assert!(!second.has_changes());
        assert!(Arc::ptr_eq(
            second.green(),
            tree.root_node().child(1).unwrap().green()
        ));

        let first = edited.root_node().child(0).unwrap();
        assert!(first.has_changes());
        let number = first
            .child_by_field_name("body")
            .and_then(|body| body.named_child(0))
            .unwrap();
        assert_eq!(number.byte_range(), TextRange::new(9, 12));
        assert!(number.has_changes());
    }

    #[test]
    fn test_deletion_spanning_nodes() {
        let text = "fn a() { 1 + 2 }";
        let tree = parse(text);
        let edited = tree
            .edit(&InputEdit::for_replacement(
                text.as_bytes(),
                TextRange::new(9, 14),
                b"",
            ))
            .unwrap();
        assert_eq!(edited.len(), 11);
        let body = edited
            .root_node()
            .child(0)
            .and_then(|function| function.child_by_field_name("body"))
            .unwrap();
        assert_eq!(body.byte_range(), TextRange::new(7, 11));
        for leaf in edited.leaves() {
            assert!(leaf.end_byte() <= 11);
        }
    }

    #[test]
    fn test_noop_edit_keeps_ranges() {
        let text = "fn a(x, y) {\n  x * y\n}";
        let tree = parse(text);
        let edited = tree
            .edit(&InputEdit::for_replacement(
                text.as_bytes(),
                TextRange::empty(17),
                b"",
            ))
            .unwrap();
        assert_eq!(ranges(&tree), ranges(&edited));
        assert_eq!(edited.edits().len(), 1);
    }

    #[test]
    fn test_edit_validation() {
        let text = "fn a() {}";
        let tree = parse(text);
        let late = InputEdit::for_replacement(text.as_bytes(), TextRange::new(6, 7), b" ");
        let early = InputEdit::for_replacement(text.as_bytes(), TextRange::new(3, 4), b"b");
        let edited = tree.edit(&late).unwrap();
        assert_eq!(
            edited.edit(&early).err(),
            Some(EditError::OutOfOrder {
                previous: 6,
                start: 3
            })
        );

        let inverted = InputEdit {
            old_end_byte: 2,
            ..early
        };
        assert!(matches!(
            tree.edit(&inverted),
            Err(EditError::InvalidRange { .. })
        ));

        let past_end = InputEdit {
            old_end_byte: 20,
            ..early
        };
        assert_eq!(
            tree.edit(&past_end).err(),
            Some(EditError::OutOfBounds { old_end: 20, len: 9 })
        );
    }

    #[test]
    fn test_append_at_end() {
        let text = "fn a() {}";
        let tree = parse(text);
        let edited = tree
            .edit(&InputEdit::for_replacement(
                text.as_bytes(),
                TextRange::empty(9),
                b" fn b() {}",
            ))
            .unwrap();
        assert_eq!(edited.len(), 19);
        assert!(edited.root_node().has_changes());
    }
}
