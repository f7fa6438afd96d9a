use crate::language::{FieldId, Symbol};
use crate::syntax::{GreenNode, Length, Point, TextRange};
use crate::tree::{Tree, TreeCursor, sexp};
use std::fmt;
use std::sync::Arc;

/// A positioned view of one node in a [`Tree`].
///
/// Hidden and auxiliary nodes never appear as `Node`s: their visible
/// descendants are surfaced in their place. Fields on a hidden node carry
/// over to what it surfaces.
#[derive(Clone, Copy)]
pub struct Node<'tree> {
    tree: &'tree Tree,
    green: &'tree Arc<GreenNode>,
    start: Length,
    field: Option<FieldId>,
}

impl<'tree> Node<'tree> {
    pub(crate) const fn new(
        tree: &'tree Tree,
        green: &'tree Arc<GreenNode>,
        start: Length,
        field: Option<FieldId>,
    ) -> Self {
        Self {
            tree,
            green,
            start,
            field,
        }
    }

    #[must_use]
    pub const fn tree(&self) -> &'tree Tree {
        self.tree
    }

    /// The underlying shared green node.
    #[must_use]
    pub const fn green(&self) -> &'tree Arc<GreenNode> {
        self.green
    }

    #[must_use]
    pub fn symbol(&self) -> Symbol {
        self.green.symbol()
    }

    /// Grammar name of the node's symbol.
    #[must_use]
    pub fn kind(&self) -> &'tree str {
        self.tree
            .language()
            .symbol_name(self.green.symbol())
            .unwrap_or("ERROR")
    }

    #[must_use]
    pub const fn start_byte(&self) -> u32 {
        self.start.bytes
    }

    #[must_use]
    pub fn end_byte(&self) -> u32 {
        self.start.bytes + self.green.size().bytes
    }

    #[must_use]
    pub fn byte_range(&self) -> TextRange {
        TextRange::new(self.start_byte(), self.end_byte())
    }

    #[must_use]
    pub const fn start_point(&self) -> Point {
        self.start.extent
    }

    #[must_use]
    pub fn end_point(&self) -> Point {
        (self.start + self.green.size()).extent
    }

    /// Field of this node within its parent.
    #[must_use]
    pub const fn field_id(&self) -> Option<FieldId> {
        self.field
    }

    #[must_use]
    pub fn field_name(&self) -> Option<&'tree str> {
        self.tree.language().field_name_for_id(self.field?)
    }

    #[must_use]
    pub fn is_named(&self) -> bool {
        self.green.is_named()
    }

    #[must_use]
    pub fn is_missing(&self) -> bool {
        self.green.is_missing()
    }

    #[must_use]
    pub fn is_extra(&self) -> bool {
        self.green.is_extra()
    }

    #[must_use]
    pub fn is_error(&self) -> bool {
        self.green.symbol().is_error()
    }

    #[must_use]
    pub fn has_error(&self) -> bool {
        self.green.has_error()
    }

    #[must_use]
    pub fn has_changes(&self) -> bool {
        self.green.has_changes()
    }

    /// Visible children in order.
    #[must_use]
    pub fn children(&self) -> Vec<Node<'tree>> {
        let mut out = Vec::new();
        collect_visible(self.tree, self.green, self.start, None, &mut out);
        out
    }

    #[must_use]
    pub fn child_count(&self) -> usize {
        self.children().len()
    }

    #[must_use]
    pub fn child(&self, index: usize) -> Option<Node<'tree>> {
        self.children().into_iter().nth(index)
    }

    #[must_use]
    pub fn named_child_count(&self) -> usize {
        self.children().iter().filter(|child| child.is_named()).count()
    }

    #[must_use]
    pub fn named_child(&self, index: usize) -> Option<Node<'tree>> {
        self.children()
            .into_iter()
            .filter(Node::is_named)
            .nth(index)
    }

    #[must_use]
    pub fn child_by_field_id(&self, field: FieldId) -> Option<Node<'tree>> {
        self.children()
            .into_iter()
            .find(|child| child.field == Some(field))
    }

    #[must_use]
    pub fn child_by_field_name(&self, name: &str) -> Option<Node<'tree>> {
        let field = self.tree.language().field_id_for_name(name)?;
        self.child_by_field_id(field)
    }

    /// Text of this node within `source`, the text the tree was parsed from.
    #[must_use]
    pub fn utf8_text<'s>(&self, source: &'s [u8]) -> Option<&'s str> {
        let bytes = source.get(self.byte_range().to_usize())?;
        std::str::from_utf8(bytes).ok()
    }

    /// S-expression of the named nodes below and including this one.
    #[must_use]
    pub fn to_sexp(&self) -> String {
        let mut out = String::new();
        sexp::write_node(*self, &mut out);
        out
    }

    /// Cursor rooted at this node.
    #[must_use]
    pub fn walk(&self) -> TreeCursor<'tree> {
        TreeCursor::new(*self)
    }
}

impl PartialEq for Node<'_> {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(self.green, other.green) && self.start == other.start
    }
}

impl Eq for Node<'_> {}

impl fmt::Debug for Node<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{Node {} {} - {}}}",
            self.kind(),
            self.start_point(),
            self.end_point()
        )
    }
}

/// Append the children of `parent` that surface through the cursor,
/// descending into hidden nodes. `inherited` is the field of the hidden
/// node being flattened.
pub(crate) fn collect_visible<'t>(
    tree: &'t Tree,
    parent: &'t GreenNode,
    start: Length,
    inherited: Option<FieldId>,
    out: &mut Vec<Node<'t>>,
) {
    let production = tree
        .language()
        .parse_table()
        .production(parent.production_id())
        .filter(|_| !parent.is_leaf());
    let mut position = start;
    let mut structural_index = 0u16;
    for child in parent.children() {
        let field = if child.is_extra() {
            None
        } else {
            let own = production.and_then(|production| production.field_at(structural_index));
            structural_index += 1;
            own.or(inherited)
        };
        if child.is_visible() {
            out.push(Node::new(tree, child, position, field));
        } else if !child.is_leaf() {
            collect_visible(tree, child, position, field, out);
        }
        position += child.size();
    }
}
