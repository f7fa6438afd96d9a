//! The compiled grammar artifact consumed by [`Language::load`].
//!
//! A descriptor is plain data. It can be assembled in memory by
//! [`LanguageBuilder`](crate::language::LanguageBuilder) or, with the
//! `serialize` feature, read from JSON.
//!
//! [`Language::load`]: crate::language::Language::load

use crate::language::{FieldId, LexMode, ParseAction, StateId, Symbol};
use crate::lexer::Pattern;
use compact_str::CompactString;
#[cfg(feature = "serialize")]
use serde::{Deserialize, Serialize};

/// Name and visibility of one symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct SymbolInfo {
    pub name: CompactString,
    pub named: bool,
    pub visible: bool,
}

/// Lex rule for one internal terminal.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct TokenRule {
    pub symbol: Symbol,
    pub pattern: Pattern,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct ProductionInfo {
    pub lhs: Symbol,
    pub child_count: u16,
    /// `(non-extra child index, field)` pairs.
    #[cfg_attr(feature = "serialize", serde(default))]
    pub fields: Vec<(u16, FieldId)>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct StateInfo {
    pub actions: Vec<(Symbol, Vec<ParseAction>)>,
    #[cfg_attr(feature = "serialize", serde(default))]
    pub gotos: Vec<(Symbol, StateId)>,
    pub lex_mode: LexMode,
}

/// Everything the engine needs to know about a grammar.
///
/// Symbol ids are indices into `symbols`. Ids below `terminal_count` are
/// terminals and id 0 is end of input. Field ids are 1-based indices into
/// `fields`. Index 0 of `external_lex_states` is the empty set.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct LanguageDescriptor {
    pub name: CompactString,
    pub version: u32,
    pub symbols: Vec<SymbolInfo>,
    pub terminal_count: u16,
    #[cfg_attr(feature = "serialize", serde(default))]
    pub external_tokens: Vec<Symbol>,
    pub tokens: Vec<TokenRule>,
    #[cfg_attr(feature = "serialize", serde(default))]
    pub word_token: Option<Symbol>,
    #[cfg_attr(feature = "serialize", serde(default))]
    pub extras: Vec<Symbol>,
    pub start_symbol: Symbol,
    #[cfg_attr(feature = "serialize", serde(default))]
    pub fields: Vec<CompactString>,
    pub productions: Vec<ProductionInfo>,
    pub states: Vec<StateInfo>,
    pub lex_states: Vec<Vec<Symbol>>,
    pub external_lex_states: Vec<Vec<Symbol>>,
}

impl LanguageDescriptor {
    /// Id of the first symbol called `name`.
    #[must_use]
    pub fn symbol_named(&self, name: &str) -> Option<Symbol> {
        self.symbols
            .iter()
            .position(|info| info.name == name)
            .and_then(|index| u16::try_from(index).ok())
            .map(Symbol::new)
    }

    #[cfg(feature = "serialize")]
    pub fn from_json(json: &str) -> Result<Self, crate::error::LoadError> {
        serde_json::from_str(json).map_err(|error| crate::error::LoadError::malformed(error.to_string()))
    }

    #[cfg(feature = "serialize")]
    pub fn to_json(&self) -> Result<String, crate::error::LoadError> {
        serde_json::to_string_pretty(self).map_err(|error| crate::error::LoadError::malformed(error.to_string()))
    }
}
