//! # Syntax Trees
//!
//! The result of a parse: a shared green root plus the language that built
//! it and the edits applied since.
//!
//! ## Overview
//!
//! - [`Tree`] owns its root and is cheap to clone. [`Tree::edit`] returns a
//!   new tree whose ranges account for a text change, sharing every subtree
//!   the change does not touch.
//! - [`Node`] is a positioned view borrowed from a tree. Hidden and
//!   auxiliary nodes are flattened away.
//! - [`TreeCursor`] walks visible nodes depth first.
//!
//! ```rust
//! use verdant::testing::grammars;
//! use verdant::Parser;
//!
//! let mut parser = Parser::new();
//! parser.set_language(grammars::toy()).unwrap();
//! let tree = parser.parse("fn f() { 1 + }", None, &Default::default()).unwrap();
//! assert!(tree.has_error());
//! assert_eq!(
//!     tree.to_sexp(),
//!     "(source_file (function_definition name: (identifier) parameters: (parameter_list) \
//!      body: (block (binary_expression left: (number) right: (MISSING identifier)))))"
//! );
//! ```

mod cursor;
mod diff;
mod edit;
mod node;
mod sexp;

pub use cursor::TreeCursor;
pub use edit::InputEdit;
pub use node::Node;

use crate::language::Language;
use crate::syntax::{GreenNode, Length};
use std::fmt;
use std::sync::Arc;

/// A parsed syntax tree.
#[derive(Clone)]
pub struct Tree {
    root: Arc<GreenNode>,
    language: Language,
    edits: Vec<InputEdit>,
}

impl Tree {
    pub(crate) const fn new(root: Arc<GreenNode>, language: Language) -> Self {
        Self {
            root,
            language,
            edits: Vec::new(),
        }
    }

    #[must_use]
    pub fn root_node(&self) -> Node<'_> {
        Node::new(self, &self.root, Length::zero(), None)
    }

    /// The shared green root.
    #[must_use]
    pub const fn root_green(&self) -> &Arc<GreenNode> {
        &self.root
    }

    #[must_use]
    pub const fn language(&self) -> &Language {
        &self.language
    }

    /// Edits applied since the tree was produced, in application order.
    #[must_use]
    pub fn edits(&self) -> &[InputEdit] {
        &self.edits
    }

    /// Length of the text the tree currently describes, in bytes.
    #[must_use]
    pub fn len(&self) -> u32 {
        self.root.size().bytes
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn has_error(&self) -> bool {
        self.root.has_error()
    }

    #[must_use]
    pub fn walk(&self) -> TreeCursor<'_> {
        self.root_node().walk()
    }

    #[must_use]
    pub fn to_sexp(&self) -> String {
        self.root_node().to_sexp()
    }

    /// Every leaf in document order, hidden extras and error leaves
    /// included.
    #[must_use]
    pub fn leaves(&self) -> Leaves<'_> {
        Leaves {
            tree: self,
            stack: vec![(&self.root, Length::zero())],
        }
    }

    /// Same shape, symbols, sizes and visible flags, ignoring parse
    /// bookkeeping.
    #[must_use]
    pub fn structurally_eq(&self, other: &Self) -> bool {
        self.root.structurally_eq(&other.root)
    }
}

impl fmt::Debug for Tree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{Tree {} {}}}", self.language.name(), self.to_sexp())
    }
}

/// Iterator returned by [`Tree::leaves`].
pub struct Leaves<'tree> {
    tree: &'tree Tree,
    stack: Vec<(&'tree Arc<GreenNode>, Length)>,
}

impl<'tree> Iterator for Leaves<'tree> {
    type Item = Node<'tree>;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some((green, start)) = self.stack.pop() {
            if green.is_leaf() {
                return Some(Node::new(self.tree, green, start, None));
            }
            let mut offset = start;
            let base = self.stack.len();
            for child in green.children() {
                self.stack.push((child, offset));
                offset += child.size();
            }
            self.stack[base..].reverse();
        }
        None
    }
}
