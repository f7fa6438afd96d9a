//! Persistent parse stacks.
//!
//! A stack is a chain of reference-counted links. Forking a head clones one
//! `Arc`, and every fork shares the prefix it was created from. Each link
//! caches running totals (end position, error cost, scanner state and a
//! state-sequence hash) so heads can be compared without walking the chain.

use crate::language::StateId;
use crate::syntax::{GreenNode, Length};
use std::sync::Arc;

#[derive(Debug)]
struct Link {
    state: StateId,
    node: Option<Arc<GreenNode>>,
    prev: Option<Arc<Link>>,
    depth: usize,
    end: Length,
    error_cost: u32,
    external_state: Option<Arc<[u8]>>,
    signature: u64,
}

/// One parse stack. Clones share structure.
#[derive(Debug, Clone)]
pub(crate) struct ParseStack {
    top: Arc<Link>,
}

fn mix(signature: u64, state: StateId) -> u64 {
    (signature.rotate_left(5) ^ u64::from(state)).wrapping_mul(0x517c_c1b7_2722_0a95)
}

impl ParseStack {
    pub(crate) fn new(initial_state: StateId) -> Self {
        Self {
            top: Arc::new(Link {
                state: initial_state,
                node: None,
                prev: None,
                depth: 0,
                end: Length::zero(),
                error_cost: 0,
                external_state: None,
                signature: mix(0, initial_state),
            }),
        }
    }

    /// Parse state on top of the stack.
    pub(crate) fn state(&self) -> StateId {
        self.top.state
    }

    /// Number of nodes on the stack.
    pub(crate) fn depth(&self) -> usize {
        self.top.depth
    }

    /// Position just past the last node.
    pub(crate) fn end(&self) -> Length {
        self.top.end
    }

    /// Sum of the error costs of every node on the stack.
    pub(crate) fn error_cost(&self) -> u32 {
        self.top.error_cost
    }

    /// Scanner state after the last external token on the stack.
    pub(crate) fn external_state(&self) -> Option<&Arc<[u8]>> {
        self.top.external_state.as_ref()
    }

    /// Hash of the state sequence. Equal sequences have equal signatures.
    pub(crate) fn signature(&self) -> u64 {
        self.top.signature
    }

    pub(crate) fn top_node(&self) -> Option<&Arc<GreenNode>> {
        self.top.node.as_ref()
    }

    pub(crate) fn push(&mut self, state: StateId, node: Arc<GreenNode>) {
        let external_state = node
            .last_external_state()
            .cloned()
            .or_else(|| self.top.external_state.clone());
        let link = Link {
            state,
            depth: self.top.depth + 1,
            end: self.top.end + node.size(),
            error_cost: self.top.error_cost.saturating_add(node.error_cost()),
            external_state,
            signature: mix(self.top.signature, state),
            node: Some(node),
            prev: Some(Arc::clone(&self.top)),
        };
        self.top = Arc::new(link);
    }

    /// Remove and return the top node. `None` at the bottom of the stack.
    pub(crate) fn pop(&mut self) -> Option<Arc<GreenNode>> {
        let node = self.top.node.clone()?;
        let prev = self.top.prev.clone()?;
        self.top = prev;
        Some(node)
    }

    /// Whether both stacks hold the same state sequence.
    pub(crate) fn same_states(&self, other: &Self) -> bool {
        if self.top.depth != other.top.depth || self.top.signature != other.top.signature {
            return false;
        }
        let mut left = Some(&self.top);
        let mut right = Some(&other.top);
        while let (Some(a), Some(b)) = (left, right) {
            if Arc::ptr_eq(a, b) {
                return true;
            }
            if a.state != b.state {
                return false;
            }
            left = a.prev.as_ref();
            right = b.prev.as_ref();
        }
        left.is_none() && right.is_none()
    }

    /// Nodes from bottom to top.
    pub(crate) fn nodes(&self) -> Vec<Arc<GreenNode>> {
        let mut nodes = Vec::with_capacity(self.top.depth);
        let mut link = Some(&self.top);
        while let Some(current) = link {
            if let Some(node) = &current.node {
                nodes.push(Arc::clone(node));
            }
            link = current.prev.as_ref();
        }
        nodes.reverse();
        nodes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language::Symbol;
    use crate::syntax::NodeFlags;
    use crate::syntax::green::LeafSpec;

    fn leaf(text: &str, error_cost: u32) -> Arc<GreenNode> {
        GreenNode::leaf(LeafSpec {
            symbol: Symbol::new(1),
            size: Length::of(text.as_bytes()),
            flags: NodeFlags::NAMED | NodeFlags::VISIBLE,
            parse_state: 0,
            lookahead_bytes: 1,
            error_cost,
            external_state: None,
        })
    }

    #[test]
    fn test_push_pop_totals() {
        let mut stack = ParseStack::new(0);
        stack.push(3, leaf("ab", 0));
        stack.push(5, leaf("c\nd", 110));
        assert_eq!(stack.depth(), 2);
        assert_eq!(stack.state(), 5);
        assert_eq!(stack.end().bytes, 5);
        assert_eq!(stack.end().extent.row, 1);
        assert_eq!(stack.error_cost(), 110);

        let popped = stack.pop().unwrap();
        assert_eq!(popped.size().bytes, 3);
        assert_eq!(stack.state(), 3);
        assert_eq!(stack.error_cost(), 0);
        stack.pop();
        assert!(stack.pop().is_none());
        assert_eq!(stack.state(), 0);
    }

    #[test]
    fn test_forks_share_prefix_and_compare_states() {
        let mut base = ParseStack::new(0);
        base.push(1, leaf("a", 0));
        let mut left = base.clone();
        let mut right = base.clone();
        left.push(2, leaf("b", 0));
        right.push(2, leaf("bb", 0));
        assert!(left.same_states(&right));
        right.push(4, leaf("c", 0));
        assert!(!left.same_states(&right));
        assert_eq!(base.nodes().len(), 1);
        assert_eq!(right.nodes().len(), 3);
    }
}
