use crate::language::{StateId, Symbol};
use crate::syntax::Length;
use bitflags::bitflags;
use smallvec::SmallVec;
use std::sync::Arc;

bitflags! {
    /// Summary bits stored on every green node.
    #[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
    pub struct NodeFlags: u16 {
        /// Named grammar category (not an anonymous literal).
        const NAMED = 1 << 0;
        /// Surfaces through the cursor; hidden and auxiliary nodes do not.
        const VISIBLE = 1 << 1;
        /// Shifted outside the grammar rules (whitespace, comments, `ERROR`).
        const EXTRA = 1 << 2;
        /// Zero-width leaf inserted by error recovery.
        const MISSING = 1 << 3;
        /// This node is, or contains, an error or missing node.
        const HAS_ERROR = 1 << 4;
        /// Touched by an edit since it was parsed.
        const HAS_CHANGES = 1 << 5;
        /// Built while several parse heads were alive; never reused.
        const FRAGILE = 1 << 6;
        /// Leaf produced by the lexer.
        const TOKEN = 1 << 7;
        /// Contains a token produced by an external scanner.
        const HAS_EXTERNAL_TOKENS = 1 << 8;
    }
}

impl NodeFlags {
    /// Flags that take part in structural comparison.
    pub const STRUCTURAL: Self = Self::NAMED
        .union(Self::VISIBLE)
        .union(Self::EXTRA)
        .union(Self::MISSING)
        .union(Self::HAS_ERROR)
        .union(Self::TOKEN);

    /// Flags a parent inherits from any child.
    pub(crate) const INHERITED: Self = Self::HAS_ERROR
        .union(Self::FRAGILE)
        .union(Self::HAS_EXTERNAL_TOKENS)
        .union(Self::HAS_CHANGES);
}

/// Children storage optimized for different sizes.
#[derive(Debug, Clone)]
enum GreenChildren {
    Empty,
    Inline(SmallVec<[Arc<GreenNode>; 4]>),
    Many(Arc<[Arc<GreenNode>]>),
}

const INLINE_CHILDREN_THRESHOLD: usize = 4;

/// Immutable, shareable syntax tree node.
///
/// Leaves and internal nodes share one representation. A node records only
/// its own [`Length`]; absolute positions come from the path used to reach
/// it, so an unchanged subtree can be shared by any number of trees.
#[derive(Debug, Clone)]
pub struct GreenNode {
    symbol: Symbol,
    size: Length,
    children: GreenChildren,
    flags: NodeFlags,
    production_id: u16,
    parse_state: StateId,
    lookahead_bytes: u32,
    error_cost: u32,
    descendant_count: u32,
    external_state: Option<Arc<[u8]>>,
}

/// Everything needed to create a leaf.
#[derive(Debug, Clone)]
pub(crate) struct LeafSpec {
    pub symbol: Symbol,
    pub size: Length,
    pub flags: NodeFlags,
    pub parse_state: StateId,
    pub lookahead_bytes: u32,
    pub error_cost: u32,
    pub external_state: Option<Arc<[u8]>>,
}

impl GreenNode {
    pub(crate) fn leaf(spec: LeafSpec) -> Arc<Self> {
        let mut flags = spec.flags | NodeFlags::TOKEN;
        if spec.external_state.is_some() {
            flags |= NodeFlags::HAS_EXTERNAL_TOKENS;
        }
        Arc::new(Self {
            symbol: spec.symbol,
            size: spec.size,
            children: GreenChildren::Empty,
            flags,
            production_id: 0,
            parse_state: spec.parse_state,
            lookahead_bytes: spec.lookahead_bytes,
            error_cost: spec.error_cost,
            descendant_count: 0,
            external_state: spec.external_state,
        })
    }

    /// Create an internal node. Size, inherited flags, error cost and the
    /// lookahead reach are summarized from `children`; `min_lookahead`
    /// extends the reach past the node's end when its construction depended
    /// on text after it.
    pub(crate) fn branch(
        symbol: Symbol,
        own_flags: NodeFlags,
        production_id: u16,
        parse_state: StateId,
        children: Vec<Arc<Self>>,
        own_error_cost: u32,
        min_lookahead: u32,
    ) -> Arc<Self> {
        let mut size = Length::zero();
        let mut flags = own_flags;
        let mut error_cost = own_error_cost;
        let mut descendant_count = 0u32;
        let mut reach_end = 0u32;
        for child in &children {
            size += child.size;
            flags |= child.flags & NodeFlags::INHERITED;
            error_cost = error_cost.saturating_add(child.error_cost);
            descendant_count = descendant_count.saturating_add(child.descendant_count + 1);
            reach_end = reach_end.max(size.bytes.saturating_add(child.lookahead_bytes));
        }
        let lookahead_bytes = reach_end.saturating_sub(size.bytes).max(min_lookahead);

        let children = match children.len() {
            0 => GreenChildren::Empty,
            1..=INLINE_CHILDREN_THRESHOLD => GreenChildren::Inline(SmallVec::from_vec(children)),
            _ => GreenChildren::Many(Arc::from(children)),
        };

        Arc::new(Self {
            symbol,
            size,
            children,
            flags,
            production_id,
            parse_state,
            lookahead_bytes,
            error_cost,
            descendant_count,
            external_state: None,
        })
    }

    /// Copy of this node with a new size, new children and extra flags.
    /// Used by the edit transform; bookkeeping is kept as is.
    pub(crate) fn edited(&self, size: Length, children: Option<Vec<Arc<Self>>>) -> Arc<Self> {
        let mut node = self.clone();
        node.size = size;
        node.flags |= NodeFlags::HAS_CHANGES;
        if let Some(children) = children {
            node.children = match children.len() {
                0 => GreenChildren::Empty,
                1..=INLINE_CHILDREN_THRESHOLD => {
                    GreenChildren::Inline(SmallVec::from_vec(children))
                }
                _ => GreenChildren::Many(Arc::from(children)),
            };
        }
        Arc::new(node)
    }

    #[inline]
    #[must_use]
    pub const fn symbol(&self) -> Symbol {
        self.symbol
    }

    #[inline]
    #[must_use]
    pub const fn size(&self) -> Length {
        self.size
    }

    #[inline]
    #[must_use]
    pub const fn flags(&self) -> NodeFlags {
        self.flags
    }

    #[inline]
    #[must_use]
    pub fn children(&self) -> &[Arc<Self>] {
        match &self.children {
            GreenChildren::Empty => &[],
            GreenChildren::Inline(children) => children,
            GreenChildren::Many(children) => children,
        }
    }

    #[inline]
    #[must_use]
    pub fn child_count(&self) -> usize {
        self.children().len()
    }

    #[inline]
    #[must_use]
    pub const fn is_leaf(&self) -> bool {
        self.flags.contains(NodeFlags::TOKEN)
    }

    #[inline]
    #[must_use]
    pub const fn production_id(&self) -> u16 {
        self.production_id
    }

    /// State on top of the stack when this node was pushed.
    #[inline]
    #[must_use]
    pub const fn parse_state(&self) -> StateId {
        self.parse_state
    }

    /// How many bytes past its end this node's construction examined.
    #[inline]
    #[must_use]
    pub const fn lookahead_bytes(&self) -> u32 {
        self.lookahead_bytes
    }

    #[inline]
    #[must_use]
    pub const fn error_cost(&self) -> u32 {
        self.error_cost
    }

    #[inline]
    #[must_use]
    pub const fn descendant_count(&self) -> u32 {
        self.descendant_count
    }

    /// Serialized scanner state after this token, for external tokens.
    #[must_use]
    pub fn external_state(&self) -> Option<&Arc<[u8]>> {
        self.external_state.as_ref()
    }

    #[inline]
    #[must_use]
    pub const fn is_named(&self) -> bool {
        self.flags.contains(NodeFlags::NAMED)
    }

    #[inline]
    #[must_use]
    pub const fn is_visible(&self) -> bool {
        self.flags.contains(NodeFlags::VISIBLE)
    }

    #[inline]
    #[must_use]
    pub const fn is_extra(&self) -> bool {
        self.flags.contains(NodeFlags::EXTRA)
    }

    #[inline]
    #[must_use]
    pub const fn is_missing(&self) -> bool {
        self.flags.contains(NodeFlags::MISSING)
    }

    #[inline]
    #[must_use]
    pub const fn has_error(&self) -> bool {
        self.flags.contains(NodeFlags::HAS_ERROR)
    }

    #[inline]
    #[must_use]
    pub const fn has_changes(&self) -> bool {
        self.flags.contains(NodeFlags::HAS_CHANGES)
    }

    #[inline]
    #[must_use]
    pub const fn is_fragile(&self) -> bool {
        self.flags.contains(NodeFlags::FRAGILE)
    }

    #[inline]
    #[must_use]
    pub const fn has_external_tokens(&self) -> bool {
        self.flags.contains(NodeFlags::HAS_EXTERNAL_TOKENS)
    }

    /// Leftmost leaf, or the node itself when it is a leaf.
    #[must_use]
    pub fn first_leaf(&self) -> &Self {
        let mut node = self;
        while let Some(first) = node.children().first() {
            node = first;
        }
        node
    }

    /// Scanner state after the last external token in this subtree.
    #[must_use]
    pub fn last_external_state(&self) -> Option<&Arc<[u8]>> {
        if !self.has_external_tokens() {
            return None;
        }
        if let Some(state) = &self.external_state {
            return Some(state);
        }
        self.children()
            .iter()
            .rev()
            .find_map(|child| child.last_external_state())
    }

    /// Compare two subtrees while ignoring parse bookkeeping (lookahead
    /// reach, pre-states, change and fragility flags).
    #[must_use]
    pub fn structurally_eq(&self, other: &Self) -> bool {
        if std::ptr::eq(self, other) {
            return true;
        }
        self.symbol == other.symbol
            && self.size == other.size
            && self.flags & NodeFlags::STRUCTURAL == other.flags & NodeFlags::STRUCTURAL
            && self.production_id == other.production_id
            && self.children().len() == other.children().len()
            && self
                .children()
                .iter()
                .zip(other.children())
                .all(|(a, b)| a.structurally_eq(b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::Point;

    fn token(symbol: u16, text: &str) -> Arc<GreenNode> {
        GreenNode::leaf(LeafSpec {
            symbol: Symbol::new(symbol),
            size: Length::of(text.as_bytes()),
            flags: NodeFlags::NAMED | NodeFlags::VISIBLE,
            parse_state: 0,
            lookahead_bytes: 1,
            error_cost: 0,
            external_state: None,
        })
    }

    #[test]
    fn test_branch_summarizes_children() {
        let a = token(1, "ab\n");
        let b = token(2, "cd");
        let node = GreenNode::branch(
            Symbol::new(5),
            NodeFlags::NAMED,
            3,
            7,
            vec![a, b],
            0,
            0,
        );
        assert_eq!(node.size(), Length::new(5, Point::new(1, 2)));
        assert_eq!(node.child_count(), 2);
        assert_eq!(node.descendant_count(), 2);
        assert_eq!(node.lookahead_bytes(), 1);
        assert_eq!(node.production_id(), 3);
        assert_eq!(node.parse_state(), 7);
        assert!(!node.is_leaf());
    }

    #[test]
    fn test_error_flag_propagates() {
        let broken = GreenNode::leaf(LeafSpec {
            symbol: Symbol::new(1),
            size: Length::zero(),
            flags: NodeFlags::MISSING | NodeFlags::HAS_ERROR,
            parse_state: 0,
            lookahead_bytes: 0,
            error_cost: 110,
            external_state: None,
        });
        let parent = GreenNode::branch(
            Symbol::new(4),
            NodeFlags::empty(),
            0,
            0,
            vec![token(2, "x"), broken],
            0,
            0,
        );
        assert!(parent.has_error());
        assert_eq!(parent.error_cost(), 110);
        assert!(!parent.is_missing());
    }

    #[test]
    fn test_many_children_storage() {
        let children: Vec<_> = (0..10).map(|_| token(1, "a")).collect();
        let node = GreenNode::branch(Symbol::new(3), NodeFlags::empty(), 0, 0, children, 0, 0);
        assert_eq!(node.child_count(), 10);
        assert_eq!(node.size().bytes, 10);
    }

    #[test]
    fn test_structural_equality_ignores_bookkeeping() {
        let a = GreenNode::branch(Symbol::new(3), NodeFlags::NAMED, 0, 1, vec![token(1, "x")], 0, 4);
        let b = GreenNode::branch(Symbol::new(3), NodeFlags::NAMED, 0, 9, vec![token(1, "x")], 0, 0);
        assert!(a.structurally_eq(&b));
        let edited = a.edited(a.size(), None);
        assert!(edited.has_changes());
        assert!(edited.structurally_eq(&b));
        let c = GreenNode::branch(Symbol::new(3), NodeFlags::NAMED, 0, 1, vec![token(1, "y!")], 0, 0);
        assert!(!a.structurally_eq(&c));
    }
}
