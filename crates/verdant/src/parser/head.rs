//! Parse heads: one stack plus the per-head state needed to advance it.

use crate::language::StateId;
use crate::lexer::LexedToken;
use crate::parser::StackPruningStrategy;
use crate::parser::stack::ParseStack;
use crate::syntax::{GreenNode, Length};
use std::sync::Arc;

/// Progress counters used to rank heads when the frontier is pruned.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct StackQuality {
    pub tokens_consumed: usize,
    pub reductions: usize,
    pub errors: usize,
}

impl StackQuality {
    pub(crate) fn score(&self, strategy: StackPruningStrategy, depth: usize) -> usize {
        match strategy {
            StackPruningStrategy::None => depth,
            StackPruningStrategy::PreferDeeper => depth * 2 + self.reductions,
            StackPruningStrategy::PreferProgress => {
                (self.tokens_consumed * 2 + depth).saturating_sub(self.errors)
            }
            StackPruningStrategy::QualityWeighted => (self.tokens_consumed
                + self.reductions
                + depth)
                .saturating_sub(self.errors * 2),
        }
    }
}

/// One live interpretation of the input.
#[derive(Debug, Clone)]
pub(crate) struct StackHead {
    pub stack: ParseStack,
    /// Creation order; lower ranks come from earlier-listed actions.
    pub rank: u64,
    /// Token that triggered the last reduction, kept until it is shifted.
    pub lookahead: Option<LexedToken>,
    pub quality: StackQuality,
    reductions_at_position: usize,
    recoveries_at_position: usize,
    counted_position: u32,
}

impl StackHead {
    pub(crate) fn new(stack: ParseStack, rank: u64) -> Self {
        Self {
            stack,
            rank,
            lookahead: None,
            quality: StackQuality::default(),
            reductions_at_position: 0,
            recoveries_at_position: 0,
            counted_position: 0,
        }
    }

    pub(crate) fn state(&self) -> StateId {
        self.stack.state()
    }

    pub(crate) fn position(&self) -> Length {
        self.stack.end()
    }

    pub(crate) fn error_cost(&self) -> u32 {
        self.stack.error_cost()
    }

    pub(crate) fn external_state(&self) -> Option<&Arc<[u8]>> {
        self.stack.external_state()
    }

    /// Push a shifted node and count it as progress.
    pub(crate) fn shift(&mut self, state: StateId, node: Arc<GreenNode>) {
        if node.has_error() {
            self.quality.errors += 1;
        }
        self.stack.push(state, node);
        self.quality.tokens_consumed += 1;
        self.lookahead = None;
    }

    fn sync_counters(&mut self) {
        let position = self.position().bytes;
        if position != self.counted_position {
            self.counted_position = position;
            self.reductions_at_position = 0;
            self.recoveries_at_position = 0;
        }
    }

    /// Count a reduction at the current position and return the total.
    pub(crate) fn record_reduction(&mut self) -> usize {
        self.sync_counters();
        self.reductions_at_position += 1;
        self.quality.reductions += 1;
        self.reductions_at_position
    }

    pub(crate) fn recoveries_at_position(&mut self) -> usize {
        self.sync_counters();
        self.recoveries_at_position
    }

    pub(crate) fn record_recovery(&mut self) {
        self.sync_counters();
        self.recoveries_at_position += 1;
        self.quality.errors += 1;
    }

    /// Whether two heads can no longer diverge: same position, same scanner
    /// state and the same state sequence.
    pub(crate) fn mergeable_with(&self, other: &Self) -> bool {
        self.position().bytes == other.position().bytes
            && self.external_state().map(|state| &state[..])
                == other.external_state().map(|state| &state[..])
            && self.lookahead.is_none()
            && other.lookahead.is_none()
            && self.stack.same_states(&other.stack)
    }

    /// Ordering used when two heads merge or when the final tree is chosen:
    /// lower error cost first, then lower rank.
    pub(crate) fn preference(&self) -> (u32, u64) {
        (self.error_cost(), self.rank)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quality_scores() {
        let quality = StackQuality {
            tokens_consumed: 4,
            reductions: 2,
            errors: 1,
        };
        assert_eq!(quality.score(StackPruningStrategy::None, 3), 3);
        assert_eq!(quality.score(StackPruningStrategy::PreferDeeper, 3), 8);
        assert_eq!(quality.score(StackPruningStrategy::PreferProgress, 3), 10);
        assert_eq!(quality.score(StackPruningStrategy::QualityWeighted, 3), 7);
    }

    #[test]
    fn test_merge_requires_same_states() {
        let mut left = StackHead::new(ParseStack::new(0), 0);
        let right = StackHead::new(ParseStack::new(0), 1);
        assert!(left.mergeable_with(&right));
        assert_eq!(left.preference(), (0, 0));
        left.record_recovery();
        assert_eq!(left.recoveries_at_position(), 1);
        assert_eq!(left.record_reduction(), 1);
    }
}
