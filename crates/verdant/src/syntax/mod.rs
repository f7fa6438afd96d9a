//! # Syntax Storage
//!
//! Immutable green nodes and the position types they are measured in.
//!
//! A [`GreenNode`] records its symbol, flags, children and its own
//! [`Length`]. It never stores an absolute offset, which is what lets an
//! edited tree share every untouched subtree with the tree it came from.
//! Absolute byte and point ranges are computed by [`crate::tree`] views
//! while walking down from the root.

pub(crate) mod builder;
pub(crate) mod green;
mod length;
mod line_col;
mod text;

pub use builder::{
    ERROR_COST_PER_MISSING_TREE, ERROR_COST_PER_RECOVERY, ERROR_COST_PER_SKIPPED_CHAR,
    ERROR_COST_PER_SKIPPED_LINE, ERROR_COST_PER_SKIPPED_TREE,
};
pub use green::{GreenNode, NodeFlags};
pub use length::{Length, Point};
pub use line_col::LineIndex;
pub use text::TextRange;
