//! # Tree Cursor
//!
//! Stateful depth-first navigation over the visible nodes of a [`Tree`].
//!
//! The cursor keeps the path from its starting node to the current node.
//! Parent and sibling moves use that path instead of back-pointers, so green
//! nodes stay immutable and freely shared. Every move returns `false` and
//! leaves the cursor untouched when it is not possible.
//!
//! ```rust
//! use verdant::testing::grammars;
//! use verdant::Parser;
//!
//! let mut parser = Parser::new();
//! parser.set_language(grammars::toy()).unwrap();
//! let tree = parser.parse("fn main() {}", None, &Default::default()).unwrap();
//!
//! let mut cursor = tree.walk();
//! assert!(cursor.goto_first_child());
//! assert_eq!(cursor.node().kind(), "function_definition");
//! assert!(cursor.goto_first_child_for_byte(3));
//! assert_eq!(cursor.node().kind(), "identifier");
//! assert_eq!(cursor.current_field_name(), Some("name"));
//! ```

use crate::language::FieldId;
use crate::tree::{Node, Tree};
use smallvec::SmallVec;

#[derive(Clone, Copy)]
struct Frame<'tree> {
    node: Node<'tree>,
    /// Position among the parent's visible children.
    index: usize,
}

/// Cursor over the visible nodes of a tree.
#[derive(Clone)]
pub struct TreeCursor<'tree> {
    stack: SmallVec<[Frame<'tree>; 16]>,
}

impl<'tree> TreeCursor<'tree> {
    /// Cursor whose root is `node`; it never moves above it.
    #[must_use]
    pub fn new(node: Node<'tree>) -> Self {
        Self {
            stack: smallvec::smallvec![Frame { node, index: 0 }],
        }
    }

    fn current(&self) -> &Frame<'tree> {
        &self.stack[self.stack.len() - 1]
    }

    fn siblings(&self) -> Option<Vec<Node<'tree>>> {
        let parent = self.stack.len().checked_sub(2)?;
        Some(self.stack[parent].node.children())
    }

    #[must_use]
    pub fn node(&self) -> Node<'tree> {
        self.current().node
    }

    #[must_use]
    pub fn tree(&self) -> &'tree Tree {
        self.node().tree()
    }

    /// Distance from the cursor's root.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.stack.len() - 1
    }

    #[must_use]
    pub fn current_field(&self) -> Option<FieldId> {
        self.node().field_id()
    }

    #[must_use]
    pub fn current_field_name(&self) -> Option<&'tree str> {
        self.node().field_name()
    }

    /// Restart at `node`.
    pub fn reset(&mut self, node: Node<'tree>) {
        self.stack.clear();
        self.stack.push(Frame { node, index: 0 });
    }

    pub fn goto_first_child(&mut self) -> bool {
        let Some(first) = self.node().children().into_iter().next() else {
            return false;
        };
        self.stack.push(Frame {
            node: first,
            index: 0,
        });
        true
    }

    pub fn goto_last_child(&mut self) -> bool {
        let children = self.node().children();
        let Some(index) = children.len().checked_sub(1) else {
            return false;
        };
        self.stack.push(Frame {
            node: children[index],
            index,
        });
        true
    }

    pub fn goto_next_sibling(&mut self) -> bool {
        let index = self.current().index + 1;
        let Some(next) = self.siblings().and_then(|siblings| siblings.get(index).copied()) else {
            return false;
        };
        let last = self.stack.len() - 1;
        self.stack[last] = Frame { node: next, index };
        true
    }

    pub fn goto_previous_sibling(&mut self) -> bool {
        let Some(index) = self.current().index.checked_sub(1) else {
            return false;
        };
        let Some(previous) = self.siblings().and_then(|siblings| siblings.get(index).copied())
        else {
            return false;
        };
        let last = self.stack.len() - 1;
        self.stack[last] = Frame {
            node: previous,
            index,
        };
        true
    }

    pub fn goto_parent(&mut self) -> bool {
        if self.stack.len() <= 1 {
            return false;
        }
        self.stack.pop();
        true
    }

    /// Descend to the deepest visible node whose half-open byte range
    /// contains `offset`. Fails when no child of the current node contains
    /// it.
    pub fn goto_first_child_for_byte(&mut self, offset: u32) -> bool {
        let mut moved = false;
        loop {
            let children = self.node().children();
            let Some((index, child)) = children
                .iter()
                .enumerate()
                .find(|(_, child)| child.byte_range().contains(offset))
            else {
                return moved;
            };
            self.stack.push(Frame {
                node: *child,
                index,
            });
            moved = true;
        }
    }
}

impl std::fmt::Debug for TreeCursor<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TreeCursor")
            .field("node", &self.node())
            .field("depth", &self.depth())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use crate::Parser;
    use crate::testing::grammars;

    fn parse(text: &str) -> crate::Tree {
        let mut parser = Parser::new();
        parser.set_language(grammars::toy()).unwrap();
        parser.parse(text, None, &Default::default()).unwrap()
    }

    #[test]
    fn test_sibling_navigation_flattens_hidden_nodes() {
        let tree = parse("fn a() {} fn b() {}");
        let mut cursor = tree.walk();
        assert!(cursor.goto_first_child());
        assert_eq!(cursor.node().kind(), "function_definition");
        assert!(cursor.goto_next_sibling());
        assert_eq!(cursor.node().start_byte(), 10);
        assert!(!cursor.goto_next_sibling());
        assert!(cursor.goto_previous_sibling());
        assert_eq!(cursor.node().start_byte(), 0);
        assert!(!cursor.goto_previous_sibling());
        assert!(cursor.goto_parent());
        assert_eq!(cursor.node().kind(), "source_file");
        assert!(!cursor.goto_parent());
    }

    #[test]
    fn test_fields_through_hidden_parents() {
        let tree = parse("fn f() { 1 * x }");
        let mut cursor = tree.walk();
        assert!(cursor.goto_first_child_for_byte(9));
        assert_eq!(cursor.node().kind(), "number");
        assert_eq!(cursor.current_field_name(), Some("left"));
        assert!(cursor.goto_next_sibling());
        assert_eq!(cursor.node().kind(), "*");
        assert_eq!(cursor.current_field_name(), Some("operator"));
        assert!(!cursor.goto_last_child());
        assert!(cursor.goto_next_sibling());
        assert_eq!(cursor.current_field_name(), Some("right"));
        assert_eq!(cursor.depth(), 4);
    }

    #[test]
    fn test_goto_first_child_for_byte_outside_tree() {
        let tree = parse("fn f() {}");
        let mut cursor = tree.walk();
        assert!(!cursor.goto_first_child_for_byte(100));
        assert_eq!(cursor.depth(), 0);
        // Whitespace between children belongs to no visible child.
        assert!(cursor.goto_first_child_for_byte(2));
        assert_eq!(cursor.node().kind(), "function_definition");
    }

    #[test]
    fn test_reset_and_last_child() {
        let tree = parse("fn f(a, b) {}");
        let mut cursor = tree.walk();
        assert!(cursor.goto_first_child());
        assert!(cursor.goto_last_child());
        assert_eq!(cursor.node().kind(), "block");
        cursor.reset(tree.root_node());
        assert_eq!(cursor.depth(), 0);
        let params = tree
            .root_node()
            .child(0)
            .and_then(|function| function.child_by_field_name("parameters"))
            .unwrap();
        let mut inner = params.walk();
        assert!(inner.goto_first_child());
        assert_eq!(inner.node().kind(), "(");
        assert!(inner.goto_parent());
        assert_eq!(inner.node().kind(), "parameter_list");
        assert!(!inner.goto_parent());
        assert_eq!(inner.depth(), 0);
    }
}
