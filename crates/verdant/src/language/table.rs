//! The parse table: actions, gotos, productions and lex modes.
//!
//! The table is built once at language load and never mutated afterwards.
//! The parser treats it as a pure lookup.

use crate::language::{FieldId, StateId, Symbol, SymbolSet};
use hashbrown::HashMap;
#[cfg(feature = "serialize")]
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// One LR action for a (state, lookahead) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serialize", serde(tag = "type", rename_all = "snake_case"))]
pub enum ParseAction {
    /// Push the lookahead and move to `state`.
    Shift { state: StateId },
    /// Push the lookahead as an extra without changing state.
    ShiftExtra,
    /// Pop the production's children and push its left-hand side.
    Reduce { production: u16 },
    /// The start symbol is complete and the lookahead is end of input.
    Accept,
}

/// Actions for one (state, lookahead) pair in table order. More than one
/// entry is an unresolved conflict that the parser explores by forking.
pub type ActionList = SmallVec<[ParseAction; 2]>;

/// Which tokens the lexer may produce in a state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct LexMode {
    /// Index into the lex state table.
    pub lex_state: u16,
    /// Index into the external lex state table; 0 means no external tokens.
    pub external_lex_state: u16,
}

impl LexMode {
    /// Every token and every external token is valid.
    pub const ERROR: Self = Self {
        lex_state: u16::MAX,
        external_lex_state: u16::MAX,
    };

    #[must_use]
    pub const fn is_error(self) -> bool {
        self.lex_state == u16::MAX
    }
}

/// A grammar production as seen by the parser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Production {
    pub lhs: Symbol,
    /// Number of non-extra children a reduction pops.
    pub child_count: u16,
    /// Field assignments keyed by non-extra child index, in index order.
    pub fields: SmallVec<[(u16, FieldId); 2]>,
}

impl Production {
    /// Field of the non-extra child at `index`.
    #[must_use]
    pub fn field_at(&self, index: u16) -> Option<FieldId> {
        self.fields
            .iter()
            .find(|(child, _)| *child == index)
            .map(|(_, field)| *field)
    }
}

#[derive(Debug, Clone, Default)]
pub(crate) struct ParseState {
    pub actions: HashMap<Symbol, ActionList, ahash::RandomState>,
    pub gotos: HashMap<Symbol, StateId, ahash::RandomState>,
    pub lex_mode: LexMode,
}

/// Immutable action, goto and lex-mode tables.
#[derive(Debug, Clone)]
pub struct ParseTable {
    states: Vec<ParseState>,
    productions: Vec<Production>,
    lex_states: Vec<SymbolSet>,
    external_lex_states: Vec<SymbolSet>,
    all_tokens: SymbolSet,
    all_external_tokens: SymbolSet,
}

impl ParseTable {
    pub(crate) fn new(
        states: Vec<ParseState>,
        productions: Vec<Production>,
        lex_states: Vec<SymbolSet>,
        external_lex_states: Vec<SymbolSet>,
        all_tokens: SymbolSet,
        all_external_tokens: SymbolSet,
    ) -> Self {
        Self {
            states,
            productions,
            lex_states,
            external_lex_states,
            all_tokens,
            all_external_tokens,
        }
    }

    #[must_use]
    pub fn state_count(&self) -> usize {
        self.states.len()
    }

    #[must_use]
    pub fn production_count(&self) -> usize {
        self.productions.len()
    }

    /// Actions for `symbol` in `state`, in table order. Empty means error.
    #[must_use]
    pub fn actions(&self, state: StateId, symbol: Symbol) -> &[ParseAction] {
        self.states
            .get(usize::from(state))
            .and_then(|entry| entry.actions.get(&symbol))
            .map(ActionList::as_slice)
            .unwrap_or_default()
    }

    /// State reached after pushing the non-terminal `symbol` on `state`.
    #[must_use]
    pub fn goto(&self, state: StateId, symbol: Symbol) -> Option<StateId> {
        self.states
            .get(usize::from(state))
            .and_then(|entry| entry.gotos.get(&symbol))
            .copied()
    }

    #[must_use]
    pub fn production(&self, id: u16) -> Option<&Production> {
        self.productions.get(usize::from(id))
    }

    #[must_use]
    pub fn lex_mode(&self, state: StateId) -> LexMode {
        self.states
            .get(usize::from(state))
            .map_or(LexMode::ERROR, |entry| entry.lex_mode)
    }

    /// Tokens the lexer may produce in `mode`.
    #[must_use]
    pub fn valid_tokens(&self, mode: LexMode) -> &SymbolSet {
        if mode.is_error() {
            return &self.all_tokens;
        }
        self.lex_states
            .get(usize::from(mode.lex_state))
            .unwrap_or(&self.all_tokens)
    }

    /// External tokens the scanner may produce in `mode`.
    #[must_use]
    pub fn valid_external_tokens(&self, mode: LexMode) -> &SymbolSet {
        if mode.is_error() {
            return &self.all_external_tokens;
        }
        self.external_lex_states
            .get(usize::from(mode.external_lex_state))
            .unwrap_or(&self.all_external_tokens)
    }

    /// Terminals with at least one action in `state`, in symbol order.
    pub fn expected_symbols(&self, state: StateId) -> impl Iterator<Item = Symbol> + '_ {
        let mut symbols: SmallVec<[Symbol; 16]> = self
            .states
            .get(usize::from(state))
            .map(|entry| entry.actions.keys().copied().collect())
            .unwrap_or_default();
        symbols.sort_unstable();
        symbols.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smallvec::smallvec;

    fn table() -> ParseTable {
        let mut state = ParseState::default();
        state.actions.insert(
            Symbol::new(1),
            smallvec![
                ParseAction::Shift { state: 1 },
                ParseAction::Reduce { production: 0 }
            ],
        );
        state.gotos.insert(Symbol::new(3), 2);
        let production = Production {
            lhs: Symbol::new(3),
            child_count: 1,
            fields: smallvec![(0, FieldId::new(1).unwrap())],
        };
        let tokens: SymbolSet = [Symbol::new(1)].into_iter().collect();
        ParseTable::new(
            vec![state],
            vec![production],
            vec![tokens.clone()],
            vec![SymbolSet::default()],
            tokens,
            SymbolSet::default(),
        )
    }

    #[test]
    fn test_lookups() {
        let table = table();
        assert_eq!(table.state_count(), 1);
        assert_eq!(table.actions(0, Symbol::new(1)).len(), 2);
        assert!(table.actions(0, Symbol::new(2)).is_empty());
        assert!(table.actions(9, Symbol::new(1)).is_empty());
        assert_eq!(table.goto(0, Symbol::new(3)), Some(2));
        assert_eq!(table.goto(0, Symbol::new(4)), None);
        assert_eq!(table.expected_symbols(0).collect::<Vec<_>>(), vec![Symbol::new(1)]);
    }

    #[test]
    fn test_error_mode_allows_all_tokens() {
        let table = table();
        assert!(table.valid_tokens(LexMode::ERROR).contains(Symbol::new(1)));
        assert_eq!(table.lex_mode(42), LexMode::ERROR);
    }

    #[test]
    fn test_production_field_lookup() {
        let table = table();
        let production = table.production(0).unwrap();
        assert_eq!(production.field_at(0).map(FieldId::get), Some(1));
        assert_eq!(production.field_at(1), None);
    }
}
