//! Error recovery.
//!
//! Runs when every head failed on its lookahead. Candidates are tried
//! cheapest first:
//!
//! 1. insert one zero-width missing token
//! 2. wrap skipped tokens and popped subtrees in an `ERROR` node, fewest
//!    skipped tokens first, then fewest popped entries
//! 3. wrap the rest of the input and finish the parse

use crate::error::ParseError;
use crate::language::{LexMode, Symbol};
use crate::lexer::LexedToken;
use crate::parser::engine::{Accepted, Engine, Ready};
use crate::parser::head::StackHead;
use crate::syntax::{GreenNode, Length};
use std::sync::Arc;

impl Engine<'_, '_> {
    /// Recover `head` from the failure recorded in its lookahead. Returns
    /// the head to continue with, or `None` when the parse was finished by
    /// wrapping the remaining input.
    pub(super) fn recover(&mut self, mut head: StackHead) -> Result<Option<StackHead>, ParseError> {
        self.stats.recoveries += 1;
        let token = match head.lookahead.take() {
            Some(token) => token,
            None => self.lex(&head),
        };
        let exhausted =
            head.recoveries_at_position() >= self.config.max_recoveries_per_position;
        head.record_recovery();
        tracing::debug!(
            position = head.position().bytes,
            state = head.state(),
            symbol = %token.symbol,
            exhausted,
            "recovering from syntax error"
        );

        if !exhausted && let Some(recovered) = self.insert_missing(&head, &token) {
            self.stats.missing_inserted += 1;
            return Ok(Some(recovered));
        }
        if let Some(recovered) = self.skip_and_pop(&head, exhausted)? {
            return Ok(Some(recovered));
        }
        self.wrap_remaining(&head)?;
        Ok(None)
    }

    fn insert_missing(&self, head: &StackHead, token: &LexedToken) -> Option<StackHead> {
        let language = &self.language;
        let position = head.position();
        let reach = (token.end().bytes + token.lookahead_bytes).saturating_sub(position.bytes);
        let placeholder = |symbol| LexedToken {
            symbol,
            start: position,
            size: Length::zero(),
            lookahead_bytes: reach,
            external_state: None,
        };

        for symbol in language.parse_table().expected_symbols(head.state()) {
            if symbol == Symbol::END
                || symbol.is_error()
                || !language.is_terminal(symbol)
                || language.is_extra(symbol)
                || language.is_external(symbol)
            {
                continue;
            }
            let mut candidate = head.clone();
            let Ready::Shift(next) = self.reduce_until_ready(&mut candidate, &placeholder(symbol))
            else {
                continue;
            };
            let missing = self.builder.missing_leaf(symbol, candidate.state(), reach);
            candidate.shift(next, missing);

            let mut trial = candidate.clone();
            if matches!(self.reduce_until_ready(&mut trial, token), Ready::Stuck) {
                continue;
            }
            tracing::debug!(
                symbol = language.symbol_name(symbol).unwrap_or("?"),
                position = position.bytes,
                "inserted missing token"
            );
            return Some(candidate);
        }
        None
    }

    fn skip_and_pop(
        &mut self,
        head: &StackHead,
        must_skip: bool,
    ) -> Result<Option<StackHead>, ParseError> {
        // Tokens after the error, lexed without state restrictions.
        // `prefix[k]` is how many of them cover the first `k` non-extra ones.
        let mut skippable = Vec::new();
        let mut prefix = vec![0];
        let mut position = head.position();
        let mut external_state = head.external_state().cloned();
        while prefix.len() <= self.config.max_skip_tokens {
            self.tick()?;
            let token = self
                .lexer
                .next_token(position, LexMode::ERROR, external_state.as_ref());
            if token.is_end() {
                break;
            }
            position = token.end();
            if token.external_state.is_some() {
                external_state.clone_from(&token.external_state);
            }
            let is_extra = self.language.is_extra(token.symbol);
            skippable.push(token);
            if !is_extra {
                prefix.push(skippable.len());
            }
        }

        for (skipped, &count) in prefix.iter().enumerate().skip(usize::from(must_skip)) {
            let taken = &skippable[..count];
            let mut base = head.clone();
            let mut popped: Vec<Arc<GreenNode>> = Vec::new();
            for depth in 0..=self.config.max_pop_depth {
                if depth > 0 && !pop_entry(&mut base, &mut popped) {
                    break;
                }
                if skipped == 0 && depth == 0 {
                    continue;
                }
                if let Some(recovered) = self.try_resume(&base, &popped, taken)? {
                    self.stats.skipped_tokens += skipped;
                    tracing::debug!(
                        skipped,
                        popped = depth,
                        position = recovered.position().bytes,
                        "wrapped input in ERROR node"
                    );
                    return Ok(Some(recovered));
                }
            }
        }
        Ok(None)
    }

    /// Push an `ERROR` node over `popped` and `taken` onto `base` and check
    /// that the following token can be handled from the exposed state.
    fn try_resume(
        &mut self,
        base: &StackHead,
        popped: &[Arc<GreenNode>],
        taken: &[LexedToken],
    ) -> Result<Option<StackHead>, ParseError> {
        let state = base.state();
        let mut children: Vec<Arc<GreenNode>> = popped.iter().rev().cloned().collect();
        children.extend(taken.iter().map(|token| self.builder.leaf(token, state)));
        let mut candidate = base.clone();
        candidate.shift(state, self.builder.error_node(state, children));

        let mode = self.language.parse_table().lex_mode(state);
        let mut position = candidate.position();
        let mut external_state = candidate.external_state().cloned();
        let resume = loop {
            self.tick()?;
            let token = self.lexer.next_token(position, mode, external_state.as_ref());
            if token.is_end() || !self.language.is_extra(token.symbol) {
                break token;
            }
            position = token.end();
            if token.external_state.is_some() {
                external_state.clone_from(&token.external_state);
            }
        };

        let mut trial = candidate.clone();
        match self.reduce_until_ready(&mut trial, &resume) {
            Ready::Stuck => Ok(None),
            Ready::Shift(_) | Ready::Extra | Ready::Accept => Ok(Some(candidate)),
        }
    }

    /// Finish the parse with a root holding the stack contents and an
    /// `ERROR` node over everything that is left, possibly empty.
    fn wrap_remaining(&mut self, head: &StackHead) -> Result<(), ParseError> {
        let state = head.state();
        let mut rest = Vec::new();
        let mut position = head.position();
        let mut external_state = head.external_state().cloned();
        loop {
            self.tick()?;
            let token = self
                .lexer
                .next_token(position, LexMode::ERROR, external_state.as_ref());
            if token.is_end() {
                break;
            }
            position = token.end();
            if token.external_state.is_some() {
                external_state.clone_from(&token.external_state);
            }
            rest.push(self.builder.leaf(&token, state));
        }

        let mut children = head.stack.nodes();
        children.push(self.builder.error_node(state, rest));
        let root = self.builder.recovery_root(children);
        tracing::warn!(
            position = head.position().bytes,
            cost = root.error_cost(),
            "recovery exhausted, wrapping remaining input"
        );
        self.accepted.push(Accepted {
            cost: root.error_cost(),
            rank: head.rank,
            root,
        });
        Ok(())
    }
}

/// Pop one non-extra entry, along with the extras above it.
fn pop_entry(head: &mut StackHead, popped: &mut Vec<Arc<GreenNode>>) -> bool {
    while let Some(node) = head.stack.pop() {
        let is_extra = node.is_extra();
        popped.push(node);
        if !is_extra {
            return true;
        }
    }
    false
}
