//! Walk over an old tree offering subtrees for reuse.
//!
//! The cursor moves through the old tree in document order, in the edited
//! tree's coordinates. The parser descends into a subtree it cannot take
//! whole and advances past one that lies behind its position.

use crate::syntax::GreenNode;
use std::sync::Arc;

#[derive(Debug, Clone)]
struct Entry {
    node: Arc<GreenNode>,
    child_index: usize,
    byte_offset: u32,
}

#[derive(Debug, Clone)]
pub(crate) struct ReusableNode {
    stack: Vec<Entry>,
    last_external_state: Option<Arc<[u8]>>,
}

impl ReusableNode {
    pub(crate) fn new(root: Arc<GreenNode>) -> Self {
        Self {
            stack: vec![Entry {
                node: root,
                child_index: 0,
                byte_offset: 0,
            }],
            last_external_state: None,
        }
    }

    /// Current candidate and its start offset.
    pub(crate) fn current(&self) -> Option<(&Arc<GreenNode>, u32)> {
        self.stack
            .last()
            .map(|entry| (&entry.node, entry.byte_offset))
    }

    /// Scanner state after the last external token before the candidate.
    pub(crate) fn external_state(&self) -> Option<&Arc<[u8]>> {
        self.last_external_state.as_ref()
    }

    /// Skip the current candidate and move to whatever follows it.
    pub(crate) fn advance(&mut self) {
        let Some(last) = self.stack.pop() else {
            return;
        };
        if let Some(state) = last.node.last_external_state() {
            self.last_external_state = Some(Arc::clone(state));
        }
        let offset = last.byte_offset + last.node.size().bytes;
        let mut child_index = last.child_index;
        while let Some(parent) = self.stack.last() {
            let next = child_index + 1;
            if let Some(sibling) = parent.node.children().get(next) {
                let sibling = Arc::clone(sibling);
                self.stack.push(Entry {
                    node: sibling,
                    child_index: next,
                    byte_offset: offset,
                });
                return;
            }
            child_index = parent.child_index;
            self.stack.pop();
        }
    }

    /// Move to the first child of the current candidate. Returns `false`
    /// for leaves and empty nodes.
    pub(crate) fn descend(&mut self) -> bool {
        let Some(top) = self.stack.last() else {
            return false;
        };
        let Some(first) = top.node.children().first() else {
            return false;
        };
        let entry = Entry {
            node: Arc::clone(first),
            child_index: 0,
            byte_offset: top.byte_offset,
        };
        self.stack.push(entry);
        true
    }
}
