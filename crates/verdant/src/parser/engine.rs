//! The GLR parse loop.
//!
//! Heads advance in rounds. Each round takes the heads at the smallest
//! position and drives each one until it shifts a token, accepts or fails.
//! Heads that end a round in the same configuration are merged, and the
//! frontier is pruned when it grows too large.

use crate::error::{CancelReason, ParseError};
use crate::language::{Language, ParseAction, StateId};
use crate::lexer::{LexedToken, Lexer, SourceBuffer};
use crate::parser::head::StackHead;
use crate::parser::reuse::ReusableNode;
use crate::parser::stack::ParseStack;
use crate::parser::{GlrConfig, ParseOptions, ParseStats};
use crate::syntax::GreenNode;
use crate::syntax::builder::TreeBuilder;
use crate::tree::Tree;
use hashbrown::HashMap;
use smallvec::SmallVec;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Instant;

/// Operations between two deadline checks.
const DEADLINE_CHECK_INTERVAL: u64 = 32;

/// A head waiting to be advanced. Forks carry the action they were
/// created for.
pub(super) struct Pending {
    pub head: StackHead,
    pub forced: Option<ParseAction>,
}

pub(super) enum Step {
    Shifted(StackHead),
    Accepted,
    Failed(StackHead),
}

/// Where a head ends up after applying the reductions a token triggers.
pub(super) enum Ready {
    Shift(StateId),
    Extra,
    Accept,
    Stuck,
}

pub(super) struct Accepted {
    pub root: Arc<GreenNode>,
    pub cost: u32,
    pub rank: u64,
}

pub(crate) struct Engine<'p, 's> {
    pub(super) language: Language,
    pub(super) config: &'p GlrConfig,
    options: &'p ParseOptions,
    pub(super) lexer: Lexer<'s>,
    pub(super) builder: TreeBuilder,
    reusable: Option<ReusableNode>,
    heads: Vec<StackHead>,
    pub(super) accepted: Vec<Accepted>,
    next_rank: u64,
    alive: usize,
    pub(super) stats: ParseStats,
}

impl<'p, 's> Engine<'p, 's> {
    pub(crate) fn new(
        language: Language,
        config: &'p GlrConfig,
        options: &'p ParseOptions,
        source: SourceBuffer<'s>,
        old_tree: Option<&Tree>,
    ) -> Self {
        let lexer = Lexer::new(language.clone(), source, config.token_cache_capacity);
        Self {
            builder: TreeBuilder::new(language.clone()),
            language,
            config,
            options,
            lexer,
            reusable: old_tree.map(|tree| ReusableNode::new(Arc::clone(tree.root_green()))),
            heads: Vec::new(),
            accepted: Vec::new(),
            next_rank: 0,
            alive: 0,
            stats: ParseStats::default(),
        }
    }

    pub(crate) fn into_stats(self) -> ParseStats {
        let cache = self.lexer.cache_stats();
        ParseStats {
            tokens_lexed: self.lexer.tokens_lexed(),
            cache_hits: cache.hits,
            cache_misses: cache.misses,
            ..self.stats
        }
    }

    pub(super) fn take_rank(&mut self) -> u64 {
        let rank = self.next_rank;
        self.next_rank += 1;
        rank
    }

    /// Count one operation and enforce the caller's budget.
    pub(super) fn tick(&mut self) -> Result<(), ParseError> {
        self.stats.operations += 1;
        let cancelled = |reason| Err(ParseError::Cancelled { reason });
        if self
            .options
            .cancel_flag
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
        {
            return cancelled(CancelReason::Flag);
        }
        if self
            .options
            .max_operations
            .is_some_and(|limit| self.stats.operations > limit)
        {
            return cancelled(CancelReason::OperationLimit);
        }
        if let Some(deadline) = self.options.deadline
            && self.stats.operations % DEADLINE_CHECK_INTERVAL == 1
            && Instant::now() >= deadline
        {
            return cancelled(CancelReason::Deadline);
        }
        Ok(())
    }

    pub(super) fn lex(&mut self, head: &StackHead) -> LexedToken {
        let mode = self.language.parse_table().lex_mode(head.state());
        self.lexer
            .next_token(head.position(), mode, head.external_state())
    }

    pub(crate) fn run(&mut self) -> Result<Arc<GreenNode>, ParseError> {
        let rank = self.take_rank();
        self.heads.push(StackHead::new(ParseStack::new(0), rank));

        while !self.heads.is_empty() {
            self.tick()?;
            let Some(min) = self.heads.iter().map(|head| head.position().bytes).min() else {
                break;
            };
            let (active, waiting): (Vec<_>, Vec<_>) = std::mem::take(&mut self.heads)
                .into_iter()
                .partition(|head| head.position().bytes == min);
            self.alive = active.len() + waiting.len();
            self.stats.max_heads = self.stats.max_heads.max(self.alive);

            let mut pending: Vec<Pending> = active
                .into_iter()
                .rev()
                .map(|head| Pending { head, forced: None })
                .collect();
            let mut next = waiting;
            let mut failed = Vec::new();
            while let Some(item) = pending.pop() {
                match self.advance(item, &mut pending)? {
                    Step::Shifted(head) => next.push(head),
                    Step::Accepted => {}
                    Step::Failed(head) => failed.push(head),
                }
            }

            if next.is_empty() && self.accepted.is_empty() {
                let best = failed.into_iter().min_by_key(StackHead::preference);
                if let Some(head) = best
                    && let Some(recovered) = self.recover(head)?
                {
                    next.push(recovered);
                }
            }
            self.heads = next;
            self.merge_heads();
            self.prune_heads();
        }
        Ok(self.finish())
    }

    fn advance(&mut self, item: Pending, pending: &mut Vec<Pending>) -> Result<Step, ParseError> {
        let Pending {
            mut head,
            mut forced,
        } = item;
        let language = self.language.clone();
        let table = language.parse_table();
        loop {
            if forced.is_none()
                && head.lookahead.is_none()
                && self.alive == 1
                && self.reusable.is_some()
                && self.try_reuse(&mut head)?
            {
                return Ok(Step::Shifted(head));
            }
            let token = match head.lookahead.take() {
                Some(token) => token,
                None => {
                    self.tick()?;
                    self.lex(&head)
                }
            };
            let state = head.state();
            let action = match forced.take() {
                Some(action) => action,
                None => {
                    let actions = table.actions(state, token.symbol);
                    let Some((&first, rest)) = actions.split_first() else {
                        tracing::trace!(state, symbol = %token.symbol, "no action for lookahead");
                        head.lookahead = Some(token);
                        return Ok(Step::Failed(head));
                    };
                    for &action in rest {
                        let mut fork = head.clone();
                        fork.rank = self.take_rank();
                        fork.lookahead = Some(token.clone());
                        self.alive += 1;
                        self.stats.forks += 1;
                        tracing::debug!(
                            state,
                            symbol = %token.symbol,
                            position = head.position().bytes,
                            ?action,
                            "forked head"
                        );
                        pending.push(Pending {
                            head: fork,
                            forced: Some(action),
                        });
                    }
                    first
                }
            };

            self.tick()?;
            tracing::trace!(state, symbol = %token.symbol, ?action, "apply action");
            match action {
                ParseAction::Shift { state: next } => {
                    let leaf = self.builder.leaf(&token, state);
                    head.shift(next, leaf);
                    return Ok(Step::Shifted(head));
                }
                ParseAction::ShiftExtra => {
                    let leaf = self.builder.leaf(&token, state);
                    head.shift(state, leaf);
                    return Ok(Step::Shifted(head));
                }
                ParseAction::Reduce { production } => {
                    if head.record_reduction() > self.config.max_reductions_per_token {
                        tracing::debug!(
                            position = head.position().bytes,
                            "reduction limit reached, dropping head"
                        );
                        head.lookahead = Some(token);
                        return Ok(Step::Failed(head));
                    }
                    let fragile = self.alive > 1;
                    let reduced = self.reduce(&mut head, production, &token, fragile);
                    head.lookahead = Some(token);
                    if !reduced {
                        return Ok(Step::Failed(head));
                    }
                }
                ParseAction::Accept => {
                    self.accept(&head);
                    return Ok(Step::Accepted);
                }
            }
        }
    }

    /// Pop a production's children and push the node built from them.
    /// Extras on top of the stack stay outside the new node.
    pub(super) fn reduce(
        &self,
        head: &mut StackHead,
        production_id: u16,
        lookahead: &LexedToken,
        fragile: bool,
    ) -> bool {
        let table = self.language.parse_table();
        let Some(production) = table.production(production_id) else {
            return false;
        };
        let stack = &mut head.stack;

        let mut trailing = Vec::new();
        if production.child_count > 0 {
            while stack.top_node().is_some_and(|node| node.is_extra()) {
                if let Some(extra) = stack.pop() {
                    trailing.push(extra);
                }
            }
        }
        let mut children = Vec::with_capacity(usize::from(production.child_count));
        let mut remaining = production.child_count;
        while remaining > 0 {
            let Some(node) = stack.pop() else {
                return false;
            };
            if !node.is_extra() {
                remaining -= 1;
            }
            children.push(node);
        }
        children.reverse();

        let pre_state = stack.state();
        let Some(next) = table.goto(pre_state, production.lhs) else {
            return false;
        };
        let node_end = children
            .iter()
            .fold(stack.end(), |end, child| end + child.size());
        let reach = (lookahead.end().bytes + lookahead.lookahead_bytes).saturating_sub(node_end.bytes);
        let node = self.builder.reduce(
            production.lhs,
            production_id,
            pre_state,
            children,
            fragile,
            reach,
        );
        stack.push(next, node);
        for extra in trailing.into_iter().rev() {
            stack.push(next, extra);
        }
        true
    }

    /// Apply the first-listed reductions `token` triggers until the head
    /// can shift it, accept, or is stuck. Used to vet recovery candidates.
    pub(super) fn reduce_until_ready(&self, head: &mut StackHead, token: &LexedToken) -> Ready {
        let table = self.language.parse_table();
        for _ in 0..=self.config.max_reductions_per_token {
            match table.actions(head.state(), token.symbol).first() {
                None => return Ready::Stuck,
                Some(ParseAction::Shift { state }) => return Ready::Shift(*state),
                Some(ParseAction::ShiftExtra) => return Ready::Extra,
                Some(ParseAction::Accept) => return Ready::Accept,
                Some(ParseAction::Reduce { production }) => {
                    if !self.reduce(head, *production, token, false) {
                        return Ready::Stuck;
                    }
                }
            }
        }
        Ready::Stuck
    }

    fn accept(&mut self, head: &StackHead) {
        let nodes = head.stack.nodes();
        let root = match nodes.iter().position(|node| !node.is_extra()) {
            Some(index) => self.builder.splice_root(
                nodes[..index].to_vec(),
                &nodes[index],
                nodes[index + 1..].to_vec(),
            ),
            None => self.builder.recovery_root(nodes),
        };
        tracing::debug!(
            cost = head.error_cost(),
            rank = head.rank,
            "head accepted"
        );
        self.accepted.push(Accepted {
            root,
            cost: head.error_cost(),
            rank: head.rank,
        });
    }

    fn try_reuse(&mut self, head: &mut StackHead) -> Result<bool, ParseError> {
        let language = self.language.clone();
        let table = language.parse_table();
        let position = head.position().bytes;
        loop {
            let Some(reusable) = self.reusable.as_mut() else {
                return Ok(false);
            };
            let Some((node, offset)) = reusable.current() else {
                self.reusable = None;
                return Ok(false);
            };
            let node = Arc::clone(node);
            if offset < position {
                if offset + node.size().bytes > position && reusable.descend() {
                    continue;
                }
                reusable.advance();
                continue;
            }
            if offset > position {
                return Ok(false);
            }

            if reusable.external_state().map(|state| &state[..])
                != head.external_state().map(|state| &state[..])
            {
                tracing::trace!(offset, "cannot reuse node: external scanner state differs");
                reusable.advance();
                continue;
            }
            let rejection = if node.has_changes() {
                Some("changed")
            } else if node.has_error() {
                Some("contains an error")
            } else if node.is_fragile() {
                Some("fragile")
            } else if node.size().is_zero() {
                Some("empty")
            } else if node.is_leaf() {
                Some("token")
            } else {
                None
            };
            if let Some(reason) = rejection {
                tracing::trace!(offset, reason, "cannot reuse node");
                if !reusable.descend() {
                    reusable.advance();
                }
                continue;
            }

            self.tick()?;
            let token = self.lex(head);
            let first = node.first_leaf();
            if !first.is_leaf()
                || first.symbol() != token.symbol
                || first.size().bytes != token.size.bytes
            {
                tracing::trace!(offset, "cannot reuse node: first token differs");
                head.lookahead = Some(token);
                return Ok(false);
            }

            while let [ParseAction::Reduce { production }] = table.actions(head.state(), token.symbol)
            {
                self.tick()?;
                if head.record_reduction() > self.config.max_reductions_per_token
                    || !self.reduce(head, *production, &token, false)
                {
                    head.lookahead = Some(token);
                    return Ok(false);
                }
            }

            let state = head.state();
            let shiftable = matches!(
                table.actions(state, token.symbol),
                [ParseAction::Shift { .. }]
            );
            if shiftable
                && node.parse_state() == state
                && let Some(next) = table.goto(state, node.symbol())
            {
                tracing::debug!(
                    symbol = %node.symbol(),
                    start = offset,
                    len = node.size().bytes,
                    "reused node"
                );
                self.stats.reused_nodes += 1;
                self.stats.reused_bytes += node.size().bytes as usize;
                head.shift(next, node);
                if let Some(reusable) = self.reusable.as_mut() {
                    reusable.advance();
                }
                return Ok(true);
            }

            tracing::trace!(offset, "cannot reuse node: state differs");
            if let Some(reusable) = self.reusable.as_mut()
                && !reusable.descend()
            {
                reusable.advance();
            }
        }
    }

    fn merge_heads(&mut self) {
        if let Some(best) = self.accepted.iter().map(|accepted| accepted.cost).min() {
            self.heads.retain(|head| head.error_cost() <= best);
        }
        if self.heads.len() < 2 {
            return;
        }
        let mut merged: Vec<StackHead> = Vec::with_capacity(self.heads.len());
        let mut index: HashMap<(u32, u64), SmallVec<[usize; 2]>, ahash::RandomState> =
            HashMap::with_hasher(ahash::RandomState::new());
        for head in std::mem::take(&mut self.heads) {
            let key = (head.position().bytes, head.stack.signature());
            let slots = index.entry(key).or_default();
            let existing = slots
                .iter()
                .copied()
                .find(|&slot| merged[slot].mergeable_with(&head));
            match existing {
                Some(slot) => {
                    self.stats.merges += 1;
                    tracing::debug!(
                        position = key.0,
                        kept = merged[slot].rank.min(head.rank),
                        "merged heads"
                    );
                    if head.preference() < merged[slot].preference() {
                        merged[slot] = head;
                    }
                }
                None => {
                    slots.push(merged.len());
                    merged.push(head);
                }
            }
        }
        self.heads = merged;
    }

    fn prune_heads(&mut self) {
        if self.heads.len() <= self.config.max_stacks {
            return;
        }
        let strategy = self.config.pruning_strategy;
        let limit = self
            .config
            .max_stacks
            .min(self.config.pruning_beam_width)
            .max(1);
        self.heads.sort_by(|a, b| {
            let score_a = a.quality.score(strategy, a.stack.depth());
            let score_b = b.quality.score(strategy, b.stack.depth());
            score_b
                .cmp(&score_a)
                .then(a.error_cost().cmp(&b.error_cost()))
                .then(a.rank.cmp(&b.rank))
        });
        let removed = self.heads.len().saturating_sub(limit);
        self.heads.truncate(limit);
        self.stats.pruned += removed;
        tracing::warn!(
            limit = self.config.max_stacks,
            removed,
            "GLR frontier hit the stack limit, some parse paths pruned"
        );
    }

    fn finish(&mut self) -> Arc<GreenNode> {
        let best = self
            .accepted
            .iter()
            .min_by_key(|accepted| (accepted.cost, accepted.rank));
        match best {
            Some(accepted) => Arc::clone(&accepted.root),
            None => {
                debug_assert!(false, "parse ended without an accepted tree");
                self.builder.recovery_root(Vec::new())
            }
        }
    }
}
