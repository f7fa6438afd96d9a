//! # Languages
//!
//! A [`Language`] is a loaded grammar: symbol and field tables, the parse
//! table, lex rules and an optional external scanner factory. It is created
//! once from a [`LanguageDescriptor`], validated, and then shared read-only by
//! every parser and tree that uses it.
//!
//! ```rust
//! use verdant::language::{LanguageBuilder, Rule};
//! use verdant::lexer::{CharSet, Pattern};
//!
//! let language = LanguageBuilder::new("digits")
//!     .token("number", Pattern::repeat1(Pattern::chars(CharSet::digits())))
//!     .rule("list", Rule::repeat1(Rule::sym("number")))
//!     .extra("_space", Pattern::repeat1(Pattern::literal(" ")))
//!     .load()?;
//!
//! let number = language.symbol_for_name("number", true).unwrap();
//! assert_eq!(language.symbol_name(number), Some("number"));
//! # Ok::<(), verdant::error::LoadError>(())
//! ```

pub mod builder;
mod descriptor;
mod symbol;
mod table;

pub use builder::{Associativity, LanguageBuilder, Rule};
pub use descriptor::{LanguageDescriptor, ProductionInfo, StateInfo, SymbolInfo, TokenRule};
pub use symbol::{FieldId, StateId, Symbol, SymbolSet, SymbolType};
pub use table::{ActionList, LexMode, ParseAction, ParseTable, Production};

use crate::error::LoadError;
use crate::lexer::ScannerFactory;
use compact_str::CompactString;
use hashbrown::HashMap;
use lasso::{Rodeo, RodeoReader, Spur};
use smallvec::SmallVec;
use std::fmt;
use std::sync::Arc;
use table::ParseState;

/// ABI version produced by this crate.
pub const LANGUAGE_VERSION: u32 = 14;
/// Oldest ABI version still accepted by [`Language::load`].
pub const MIN_COMPATIBLE_LANGUAGE_VERSION: u32 = 13;

#[derive(Debug, Clone, Copy)]
struct SymbolEntry {
    name: Spur,
    symbol_type: SymbolType,
}

struct LanguageData {
    name: CompactString,
    version: u32,
    names: RodeoReader,
    symbols: Vec<SymbolEntry>,
    symbol_lookup: HashMap<(Spur, bool), Symbol, ahash::RandomState>,
    fields: Vec<Spur>,
    field_lookup: HashMap<Spur, FieldId, ahash::RandomState>,
    terminal_count: u16,
    table: ParseTable,
    tokens: Vec<TokenRule>,
    keywords: HashMap<CompactString, Symbol, ahash::RandomState>,
    keyword_set: SymbolSet,
    word_token: Option<Symbol>,
    extras: SymbolSet,
    external_tokens: SymbolSet,
    start_symbol: Symbol,
    scanner_factory: Option<ScannerFactory>,
}

/// Shared handle to a loaded grammar.
///
/// Cloning is cheap. Two handles are equal only when they come from the same
/// [`load`](Self::load) call.
#[derive(Clone)]
pub struct Language(Arc<LanguageData>);

impl Language {
    /// Validate `descriptor` and load it. Fails with
    /// [`LoadError::MissingExternalScanner`] if the grammar declares external
    /// tokens; use [`load_with_scanner`](Self::load_with_scanner) for those.
    pub fn load(descriptor: LanguageDescriptor) -> Result<Self, LoadError> {
        Self::load_inner(descriptor, None)
    }

    /// Load a grammar together with the factory for its external scanner.
    pub fn load_with_scanner(
        descriptor: LanguageDescriptor,
        factory: ScannerFactory,
    ) -> Result<Self, LoadError> {
        Self::load_inner(descriptor, Some(factory))
    }

    fn load_inner(
        descriptor: LanguageDescriptor,
        scanner_factory: Option<ScannerFactory>,
    ) -> Result<Self, LoadError> {
        check_version(&descriptor)?;
        let symbol_count = descriptor.symbols.len();
        if symbol_count == 0 || symbol_count >= usize::from(u16::MAX) {
            return Err(LoadError::malformed(format!(
                "symbol count {symbol_count} is out of range"
            )));
        }
        let terminal_count = descriptor.terminal_count;
        if terminal_count == 0 || usize::from(terminal_count) > symbol_count {
            return Err(LoadError::malformed(format!(
                "terminal count {terminal_count} is out of range"
            )));
        }
        if !descriptor.external_tokens.is_empty() && scanner_factory.is_none() {
            return Err(LoadError::MissingExternalScanner {
                name: descriptor.name.clone(),
                count: u16::try_from(descriptor.external_tokens.len()).unwrap_or(u16::MAX),
            });
        }

        let is_terminal = |symbol: Symbol| symbol.id() < terminal_count;
        let is_non_terminal =
            |symbol: Symbol| symbol.id() >= terminal_count && symbol.index() < symbol_count;
        let unknown = |symbol: Symbol, context: &str| LoadError::UnknownSymbol {
            symbol: symbol.id(),
            context: context.into(),
        };

        let mut external_tokens = SymbolSet::with_capacity(usize::from(terminal_count));
        for &symbol in &descriptor.external_tokens {
            if !is_terminal(symbol) || symbol == Symbol::END {
                return Err(unknown(symbol, "external token list"));
            }
            external_tokens.insert(symbol);
        }

        let mut all_tokens = SymbolSet::with_capacity(usize::from(terminal_count));
        for rule in &descriptor.tokens {
            if !is_terminal(rule.symbol)
                || rule.symbol == Symbol::END
                || external_tokens.contains(rule.symbol)
            {
                return Err(unknown(rule.symbol, "token rules"));
            }
            if !all_tokens.insert(rule.symbol) {
                return Err(LoadError::malformed(format!(
                    "symbol {} has more than one token rule",
                    rule.symbol.id()
                )));
            }
        }
        let mut tokens = descriptor.tokens.clone();
        tokens.sort_by_key(|rule| rule.symbol);

        let mut extras = SymbolSet::with_capacity(usize::from(terminal_count));
        for &symbol in &descriptor.extras {
            if !is_terminal(symbol) || symbol == Symbol::END {
                return Err(unknown(symbol, "extras"));
            }
            extras.insert(symbol);
        }

        let word_pattern = match descriptor.word_token {
            Some(word) => Some(
                tokens
                    .iter()
                    .find(|rule| rule.symbol == word)
                    .map(|rule| &rule.pattern)
                    .ok_or_else(|| unknown(word, "word token"))?,
            ),
            None => None,
        };
        let mut keywords = HashMap::with_hasher(ahash::RandomState::new());
        let mut keyword_set = SymbolSet::with_capacity(usize::from(terminal_count));
        if let Some(word_pattern) = word_pattern {
            for rule in &tokens {
                if let Some(text) = rule.pattern.literal_text()
                    && Some(rule.symbol) != descriptor.word_token
                    && word_pattern.matches_exactly(text)
                {
                    keywords.entry(CompactString::from(text)).or_insert(rule.symbol);
                    keyword_set.insert(rule.symbol);
                }
            }
        }

        if !is_non_terminal(descriptor.start_symbol) {
            return Err(unknown(descriptor.start_symbol, "start symbol"));
        }

        let mut rodeo = Rodeo::default();
        let symbols: Vec<SymbolEntry> = descriptor
            .symbols
            .iter()
            .map(|info| SymbolEntry {
                name: rodeo.get_or_intern(info.name.as_str()),
                symbol_type: SymbolType::from_flags(info.named, info.visible),
            })
            .collect();
        let mut symbol_lookup = HashMap::with_hasher(ahash::RandomState::new());
        for (id, (entry, info)) in (0u16..).zip(symbols.iter().zip(&descriptor.symbols)) {
            if info.visible {
                symbol_lookup
                    .entry((entry.name, info.named))
                    .or_insert(Symbol::new(id));
            }
        }
        let fields: Vec<Spur> = descriptor
            .fields
            .iter()
            .map(|name| rodeo.get_or_intern(name.as_str()))
            .collect();
        let mut field_lookup = HashMap::with_hasher(ahash::RandomState::new());
        for (id, &name) in (1u16..).zip(&fields) {
            if let Some(field) = FieldId::new(id) {
                field_lookup.entry(name).or_insert(field);
            }
        }

        let productions = load_productions(&descriptor, &is_non_terminal)?;
        let lex_states = load_lex_states(&descriptor.lex_states, terminal_count, |symbol| {
            is_terminal(symbol) && !external_tokens.contains(symbol)
        })?;
        let mut external_lex_states =
            load_lex_states(&descriptor.external_lex_states, terminal_count, |symbol| {
                external_tokens.contains(symbol)
            })?;
        if external_lex_states.is_empty() {
            external_lex_states.push(SymbolSet::default());
        }
        let states = load_states(
            &descriptor,
            &productions,
            lex_states.len(),
            external_lex_states.len(),
            &is_terminal,
            &is_non_terminal,
        )?;

        let table = ParseTable::new(
            states,
            productions,
            lex_states,
            external_lex_states,
            all_tokens,
            external_tokens.clone(),
        );

        Ok(Self(Arc::new(LanguageData {
            name: descriptor.name,
            version: descriptor.version,
            names: rodeo.into_reader(),
            symbols,
            symbol_lookup,
            fields,
            field_lookup,
            terminal_count,
            table,
            tokens,
            keywords,
            keyword_set,
            word_token: descriptor.word_token,
            extras,
            external_tokens,
            start_symbol: descriptor.start_symbol,
            scanner_factory,
        })))
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.0.name
    }

    /// ABI version the descriptor was generated for.
    #[must_use]
    pub fn version(&self) -> u32 {
        self.0.version
    }

    /// Number of symbols, excluding the built-in `ERROR`.
    #[must_use]
    pub fn symbol_count(&self) -> usize {
        self.0.symbols.len()
    }

    /// Name of `symbol`; `"ERROR"` for [`Symbol::ERROR`].
    #[must_use]
    pub fn symbol_name(&self, symbol: Symbol) -> Option<&str> {
        if symbol.is_error() {
            return Some("ERROR");
        }
        self.0
            .symbols
            .get(symbol.index())
            .map(|entry| self.0.names.resolve(&entry.name))
    }

    /// First visible symbol called `name` with the given namedness.
    #[must_use]
    pub fn symbol_for_name(&self, name: &str, is_named: bool) -> Option<Symbol> {
        if name == "ERROR" {
            return is_named.then_some(Symbol::ERROR);
        }
        let spur = self.0.names.get(name)?;
        self.0.symbol_lookup.get(&(spur, is_named)).copied()
    }

    #[must_use]
    pub fn symbol_type(&self, symbol: Symbol) -> Option<SymbolType> {
        if symbol.is_error() {
            return Some(SymbolType::Regular);
        }
        self.0
            .symbols
            .get(symbol.index())
            .map(|entry| entry.symbol_type)
    }

    #[must_use]
    pub fn is_named(&self, symbol: Symbol) -> bool {
        matches!(
            self.symbol_type(symbol),
            Some(SymbolType::Regular | SymbolType::Hidden)
        )
    }

    #[must_use]
    pub fn is_visible(&self, symbol: Symbol) -> bool {
        matches!(
            self.symbol_type(symbol),
            Some(SymbolType::Regular | SymbolType::Anonymous)
        )
    }

    #[must_use]
    pub fn is_terminal(&self, symbol: Symbol) -> bool {
        symbol.id() < self.0.terminal_count
    }

    #[must_use]
    pub fn terminal_count(&self) -> usize {
        usize::from(self.0.terminal_count)
    }

    #[must_use]
    pub fn field_count(&self) -> usize {
        self.0.fields.len()
    }

    #[must_use]
    pub fn field_name_for_id(&self, id: FieldId) -> Option<&str> {
        self.0
            .fields
            .get(usize::from(id.get()) - 1)
            .map(|spur| self.0.names.resolve(spur))
    }

    #[must_use]
    pub fn field_id_for_name(&self, name: &str) -> Option<FieldId> {
        let spur = self.0.names.get(name)?;
        self.0.field_lookup.get(&spur).copied()
    }

    #[must_use]
    pub fn state_count(&self) -> usize {
        self.0.table.state_count()
    }

    /// State after consuming `symbol` in `state`: the shift target for a
    /// terminal, the goto target for a non-terminal.
    #[must_use]
    pub fn next_state(&self, state: StateId, symbol: Symbol) -> Option<StateId> {
        if self.is_terminal(symbol) {
            self.0
                .table
                .actions(state, symbol)
                .iter()
                .find_map(|action| match action {
                    ParseAction::Shift { state } => Some(*state),
                    _ => None,
                })
        } else {
            self.0.table.goto(state, symbol)
        }
    }

    #[must_use]
    pub fn parse_table(&self) -> &ParseTable {
        &self.0.table
    }

    #[must_use]
    pub fn start_symbol(&self) -> Symbol {
        self.0.start_symbol
    }

    #[must_use]
    pub fn word_token(&self) -> Option<Symbol> {
        self.0.word_token
    }

    #[must_use]
    pub fn is_extra(&self, symbol: Symbol) -> bool {
        self.0.extras.contains(symbol)
    }

    #[must_use]
    pub fn is_keyword(&self, symbol: Symbol) -> bool {
        self.0.keyword_set.contains(symbol)
    }

    #[must_use]
    pub fn is_external(&self, symbol: Symbol) -> bool {
        self.0.external_tokens.contains(symbol)
    }

    #[must_use]
    pub fn has_external_scanner(&self) -> bool {
        self.0.scanner_factory.is_some()
    }

    pub(crate) fn token_rules(&self) -> &[TokenRule] {
        &self.0.tokens
    }

    pub(crate) fn keyword_for(&self, text: &[u8]) -> Option<Symbol> {
        let text = std::str::from_utf8(text).ok()?;
        self.0.keywords.get(text).copied()
    }

    pub(crate) fn scanner_factory(&self) -> Option<&ScannerFactory> {
        self.0.scanner_factory.as_ref()
    }
}

impl PartialEq for Language {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Language {}

impl fmt::Debug for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Language")
            .field("name", &self.0.name)
            .field("version", &self.0.version)
            .field("symbols", &self.0.symbols.len())
            .field("states", &self.0.table.state_count())
            .finish_non_exhaustive()
    }
}

fn check_version(descriptor: &LanguageDescriptor) -> Result<(), LoadError> {
    if descriptor.version < MIN_COMPATIBLE_LANGUAGE_VERSION {
        return Err(LoadError::VersionTooOld {
            name: descriptor.name.clone(),
            version: descriptor.version,
            min: MIN_COMPATIBLE_LANGUAGE_VERSION,
            current: LANGUAGE_VERSION,
        });
    }
    if descriptor.version > LANGUAGE_VERSION {
        return Err(LoadError::VersionTooNew {
            name: descriptor.name.clone(),
            version: descriptor.version,
            current: LANGUAGE_VERSION,
        });
    }
    Ok(())
}

fn load_productions(
    descriptor: &LanguageDescriptor,
    is_non_terminal: &dyn Fn(Symbol) -> bool,
) -> Result<Vec<Production>, LoadError> {
    let field_count = descriptor.fields.len();
    descriptor
        .productions
        .iter()
        .zip(0u16..)
        .map(|(info, id)| {
            if !is_non_terminal(info.lhs) {
                return Err(LoadError::UnknownSymbol {
                    symbol: info.lhs.id(),
                    context: format!("production {id}").into(),
                });
            }
            let mut fields: SmallVec<[(u16, FieldId); 2]> = SmallVec::new();
            for &(child, field) in &info.fields {
                if usize::from(field.get()) > field_count || child >= info.child_count {
                    return Err(LoadError::UnknownField {
                        field: field.get(),
                        production: id,
                    });
                }
                fields.push((child, field));
            }
            fields.sort_unstable();
            Ok(Production {
                lhs: info.lhs,
                child_count: info.child_count,
                fields,
            })
        })
        .collect()
}

fn load_lex_states(
    sets: &[Vec<Symbol>],
    terminal_count: u16,
    allowed: impl Fn(Symbol) -> bool,
) -> Result<Vec<SymbolSet>, LoadError> {
    sets.iter()
        .enumerate()
        .map(|(index, symbols)| {
            let mut set = SymbolSet::with_capacity(usize::from(terminal_count));
            for &symbol in symbols {
                if !allowed(symbol) {
                    return Err(LoadError::UnknownSymbol {
                        symbol: symbol.id(),
                        context: format!("lex state {index}").into(),
                    });
                }
                set.insert(symbol);
            }
            Ok(set)
        })
        .collect()
}

fn load_states(
    descriptor: &LanguageDescriptor,
    productions: &[Production],
    lex_state_count: usize,
    external_lex_state_count: usize,
    is_terminal: &dyn Fn(Symbol) -> bool,
    is_non_terminal: &dyn Fn(Symbol) -> bool,
) -> Result<Vec<ParseState>, LoadError> {
    let state_count = descriptor.states.len();
    if state_count == 0 || state_count > usize::from(u16::MAX) {
        return Err(LoadError::malformed(format!(
            "state count {state_count} is out of range"
        )));
    }
    let check_state = |target: StateId, context: String| {
        if usize::from(target) < state_count {
            Ok(())
        } else {
            Err(LoadError::UnknownState {
                state: target,
                context: context.into(),
            })
        }
    };

    let mut states = Vec::with_capacity(state_count);
    for (info, id) in descriptor.states.iter().zip(0u16..) {
        let mut state = ParseState::default();
        for (symbol, actions) in &info.actions {
            if !is_terminal(*symbol) {
                return Err(LoadError::UnknownSymbol {
                    symbol: symbol.id(),
                    context: format!("actions of state {id}").into(),
                });
            }
            let mut list = ActionList::new();
            for &action in actions {
                match action {
                    ParseAction::Shift { state: target } => {
                        check_state(target, format!("shift in state {id}"))?;
                    }
                    ParseAction::Reduce { production } => {
                        if usize::from(production) >= productions.len() {
                            return Err(LoadError::UnknownProduction {
                                production,
                                state: id,
                            });
                        }
                    }
                    ParseAction::ShiftExtra | ParseAction::Accept => {}
                }
                list.push(action);
            }
            if !list.is_empty() {
                state.actions.insert(*symbol, list);
            }
        }
        for &(symbol, target) in &info.gotos {
            if !is_non_terminal(symbol) {
                return Err(LoadError::UnknownSymbol {
                    symbol: symbol.id(),
                    context: format!("gotos of state {id}").into(),
                });
            }
            check_state(target, format!("goto in state {id}"))?;
            state.gotos.insert(symbol, target);
        }
        let mode = info.lex_mode;
        if !mode.is_error()
            && (usize::from(mode.lex_state) >= lex_state_count
                || usize::from(mode.external_lex_state) >= external_lex_state_count)
        {
            return Err(LoadError::malformed(format!(
                "state {id} uses an unknown lex mode"
            )));
        }
        state.lex_mode = mode;
        states.push(state);
    }
    Ok(states)
}
