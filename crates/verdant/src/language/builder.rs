//! In-process parse table assembly.
//!
//! [`LanguageBuilder`] turns a small rule list into a [`LanguageDescriptor`]
//! with canonical LR(1) construction. Declared precedence and associativity
//! resolve conflicts; anything left unresolved stays in the table as several
//! actions and is explored by the GLR parser at runtime.
//!
//! # Symbol layout
//!
//! Ids are assigned in this order: end of input, declared tokens (extras
//! included), literal tokens in order of first appearance, external tokens,
//! rules, then generated repetition helpers.

use crate::error::{GrammarError, LoadError};
use crate::language::{
    FieldId, LANGUAGE_VERSION, Language, LanguageDescriptor, LexMode, ParseAction,
    ProductionInfo, StateId, StateInfo, Symbol, SymbolInfo, SymbolSet, TokenRule,
};
use crate::lexer::{Pattern, ScannerFactory};
use compact_str::{CompactString, format_compact};
use hashbrown::HashMap;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, btree_map};

/// How operators of equal precedence group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Associativity {
    #[default]
    None,
    Left,
    Right,
}

type Precedence = (i32, Associativity);

/// Right-hand side of a grammar rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rule {
    /// Reference to a token, external token or rule by name.
    Symbol(CompactString),
    /// Anonymous literal token.
    Literal(CompactString),
    Field {
        name: CompactString,
        rule: Box<Rule>,
    },
    Seq(Vec<Rule>),
    Choice(Vec<Rule>),
    Optional(Box<Rule>),
    Repeat(Box<Rule>),
    Repeat1(Box<Rule>),
    Prec {
        level: i32,
        assoc: Associativity,
        rule: Box<Rule>,
    },
}

impl Rule {
    #[must_use]
    pub fn sym(name: &str) -> Self {
        Self::Symbol(name.into())
    }

    #[must_use]
    pub fn lit(text: &str) -> Self {
        Self::Literal(text.into())
    }

    #[must_use]
    pub fn field(name: &str, rule: Self) -> Self {
        Self::Field {
            name: name.into(),
            rule: Box::new(rule),
        }
    }

    #[must_use]
    pub fn seq(rules: impl IntoIterator<Item = Self>) -> Self {
        Self::Seq(rules.into_iter().collect())
    }

    #[must_use]
    pub fn choice(rules: impl IntoIterator<Item = Self>) -> Self {
        Self::Choice(rules.into_iter().collect())
    }

    #[must_use]
    pub fn optional(rule: Self) -> Self {
        Self::Optional(Box::new(rule))
    }

    #[must_use]
    pub fn repeat(rule: Self) -> Self {
        Self::Repeat(Box::new(rule))
    }

    #[must_use]
    pub fn repeat1(rule: Self) -> Self {
        Self::Repeat1(Box::new(rule))
    }

    #[must_use]
    pub fn prec(level: i32, rule: Self) -> Self {
        Self::Prec {
            level,
            assoc: Associativity::None,
            rule: Box::new(rule),
        }
    }

    #[must_use]
    pub fn prec_left(level: i32, rule: Self) -> Self {
        Self::Prec {
            level,
            assoc: Associativity::Left,
            rule: Box::new(rule),
        }
    }

    #[must_use]
    pub fn prec_right(level: i32, rule: Self) -> Self {
        Self::Prec {
            level,
            assoc: Associativity::Right,
            rule: Box::new(rule),
        }
    }

    fn collect_literals(&self, out: &mut Vec<CompactString>) {
        match self {
            Self::Literal(text) => {
                if !out.contains(text) {
                    out.push(text.clone());
                }
            }
            Self::Symbol(_) => {}
            Self::Field { rule, .. }
            | Self::Optional(rule)
            | Self::Repeat(rule)
            | Self::Repeat1(rule)
            | Self::Prec { rule, .. } => rule.collect_literals(out),
            Self::Seq(rules) | Self::Choice(rules) => {
                for rule in rules {
                    rule.collect_literals(out);
                }
            }
        }
    }
}

/// Grammar definition that compiles into a [`LanguageDescriptor`].
///
/// The first rule is the start symbol. Names starting with `_` are hidden:
/// they stay in the tree but the cursor looks through them.
#[derive(Default)]
pub struct LanguageBuilder {
    name: CompactString,
    tokens: Vec<(CompactString, Pattern)>,
    extras: Vec<CompactString>,
    externals: Vec<CompactString>,
    word: Option<CompactString>,
    rules: Vec<(CompactString, Rule)>,
    scanner: Option<ScannerFactory>,
}

impl LanguageBuilder {
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Declare a lexical token.
    #[must_use]
    pub fn token(mut self, name: &str, pattern: Pattern) -> Self {
        self.tokens.push((name.into(), pattern));
        self
    }

    /// Declare a token that may appear anywhere, such as whitespace.
    #[must_use]
    pub fn extra(mut self, name: &str, pattern: Pattern) -> Self {
        self.tokens.push((name.into(), pattern));
        self.extras.push(name.into());
        self
    }

    /// Declare a token produced by the external scanner.
    #[must_use]
    pub fn external(mut self, name: &str) -> Self {
        self.externals.push(name.into());
        self
    }

    /// Use the token `name` to recognize keywords.
    #[must_use]
    pub fn word(mut self, name: &str) -> Self {
        self.word = Some(name.into());
        self
    }

    #[must_use]
    pub fn rule(mut self, name: &str, rule: Rule) -> Self {
        self.rules.push((name.into(), rule));
        self
    }

    /// Attach the external scanner used by [`load`](Self::load).
    #[must_use]
    pub fn external_scanner(mut self, factory: ScannerFactory) -> Self {
        self.scanner = Some(factory);
        self
    }

    /// Compile and load the grammar.
    pub fn load(self) -> Result<Language, LoadError> {
        let descriptor = self.build()?;
        match self.scanner {
            Some(factory) => Language::load_with_scanner(descriptor, factory),
            None => Language::load(descriptor),
        }
    }

    /// Compile the grammar into a descriptor.
    pub fn build(&self) -> Result<LanguageDescriptor, GrammarError> {
        if self.rules.is_empty() {
            return Err(GrammarError::NoRules);
        }
        let mut symbols = vec![SymbolInfo {
            name: "end".into(),
            named: true,
            visible: false,
        }];
        let mut by_name: HashMap<CompactString, Symbol, ahash::RandomState> = HashMap::default();
        let mut declare = |symbols: &mut Vec<SymbolInfo>,
                           name: &CompactString,
                           named: bool,
                           visible: bool|
         -> Result<Symbol, GrammarError> {
            let symbol = next_symbol(symbols.as_slice())?;
            symbols.push(SymbolInfo {
                name: name.clone(),
                named,
                visible,
            });
            if named && by_name.insert(name.clone(), symbol).is_some() {
                return Err(GrammarError::DuplicateSymbol(name.clone()));
            }
            Ok(symbol)
        };

        let mut tokens = Vec::new();
        for (name, pattern) in &self.tokens {
            let symbol = declare(&mut symbols, name, true, !name.starts_with('_'))?;
            tokens.push(TokenRule {
                symbol,
                pattern: pattern.clone(),
            });
        }
        let mut literal_texts = Vec::new();
        for (_, rule) in &self.rules {
            rule.collect_literals(&mut literal_texts);
        }
        let mut literals = HashMap::with_hasher(ahash::RandomState::new());
        for text in literal_texts {
            let symbol = declare(&mut symbols, &text, false, true)?;
            tokens.push(TokenRule {
                symbol,
                pattern: Pattern::Literal(text.clone()),
            });
            literals.insert(text, symbol);
        }
        let mut external_tokens = Vec::new();
        for name in &self.externals {
            external_tokens.push(declare(&mut symbols, name, true, !name.starts_with('_'))?);
        }
        let terminal_count = symbols.len();
        let mut rule_symbols = Vec::new();
        for (name, _) in &self.rules {
            rule_symbols.push(declare(&mut symbols, name, true, !name.starts_with('_'))?);
        }

        let token_symbol = |name: &CompactString| {
            by_name
                .get(name)
                .copied()
                .filter(|symbol| symbol.index() < terminal_count)
                .filter(|symbol| !external_tokens.contains(symbol))
        };
        let word_token = match &self.word {
            Some(name) => Some(
                token_symbol(name).ok_or_else(|| GrammarError::InvalidWordToken(name.clone()))?,
            ),
            None => None,
        };
        let mut extras = Vec::new();
        for name in &self.extras {
            extras.push(token_symbol(name).ok_or_else(|| GrammarError::InvalidExtra(name.clone()))?);
        }

        let mut expander = Expander {
            symbols,
            by_name: &by_name,
            literals: &literals,
            productions: Vec::new(),
            field_names: BTreeSet::new(),
            repeat_counts: HashMap::default(),
        };
        let start_symbol = rule_symbols[0];
        // Production 0 is the augmented start rule; it becomes `Accept`.
        expander.productions.push(Draft {
            lhs: Symbol::new(u16::MAX - 1),
            rhs: vec![start_symbol],
            fields: Vec::new(),
            prec: None,
        });
        for ((name, rule), &lhs) in self.rules.iter().zip(&rule_symbols) {
            for alt in expander.expand(name, rule)? {
                expander.productions.push(Draft::from_alt(lhs, alt));
            }
        }

        let Expander {
            symbols,
            productions,
            field_names,
            ..
        } = expander;
        let fields: Vec<CompactString> = field_names.into_iter().collect();
        let field_ids: HashMap<&str, FieldId, ahash::RandomState> = fields
            .iter()
            .zip(1u16..)
            .filter_map(|(name, id)| Some((name.as_str(), FieldId::new(id)?)))
            .collect();

        let automaton = Automaton::build(&productions, symbols.len(), terminal_count)?;
        let tables = automaton.tables(&productions, &extras, &external_tokens);

        let descriptor_productions = productions
            .iter()
            .skip(1)
            .map(|draft| ProductionInfo {
                lhs: draft.lhs,
                child_count: u16::try_from(draft.rhs.len()).unwrap_or(u16::MAX),
                fields: draft
                    .fields
                    .iter()
                    .filter_map(|(index, name)| Some((*index, *field_ids.get(name.as_str())?)))
                    .collect(),
            })
            .collect();
        drop(field_ids);

        tracing::debug!(
            language = %self.name,
            symbols = symbols.len(),
            states = tables.states.len(),
            conflicts = tables.conflicts,
            "built parse table"
        );

        Ok(LanguageDescriptor {
            name: self.name.clone(),
            version: LANGUAGE_VERSION,
            symbols,
            terminal_count: u16::try_from(terminal_count)
                .map_err(|_| GrammarError::TooManySymbols(terminal_count))?,
            external_tokens,
            tokens,
            word_token,
            extras,
            start_symbol,
            fields,
            productions: descriptor_productions,
            states: tables.states,
            lex_states: tables.lex_states,
            external_lex_states: tables.external_lex_states,
        })
    }
}

fn next_symbol(symbols: &[SymbolInfo]) -> Result<Symbol, GrammarError> {
    u16::try_from(symbols.len())
        .ok()
        .filter(|id| *id < u16::MAX - 1)
        .map(Symbol::new)
        .ok_or(GrammarError::TooManySymbols(symbols.len() + 1))
}

/// One expanded alternative: a flat symbol sequence with field labels.
#[derive(Debug, Clone, Default)]
struct Alt {
    items: Vec<(Symbol, Option<CompactString>)>,
    prec: Option<Precedence>,
}

#[derive(Debug, Clone)]
struct Draft {
    lhs: Symbol,
    rhs: Vec<Symbol>,
    fields: Vec<(u16, CompactString)>,
    prec: Option<Precedence>,
}

impl Draft {
    fn from_alt(lhs: Symbol, alt: Alt) -> Self {
        let mut rhs = Vec::with_capacity(alt.items.len());
        let mut fields = Vec::new();
        for (index, (symbol, field)) in (0u16..).zip(alt.items) {
            rhs.push(symbol);
            if let Some(field) = field {
                fields.push((index, field));
            }
        }
        Self {
            lhs,
            rhs,
            fields,
            prec: alt.prec,
        }
    }
}

struct Expander<'g> {
    symbols: Vec<SymbolInfo>,
    by_name: &'g HashMap<CompactString, Symbol, ahash::RandomState>,
    literals: &'g HashMap<CompactString, Symbol, ahash::RandomState>,
    productions: Vec<Draft>,
    field_names: BTreeSet<CompactString>,
    repeat_counts: HashMap<CompactString, u32, ahash::RandomState>,
}

impl Expander<'_> {
    fn expand(&mut self, owner: &CompactString, rule: &Rule) -> Result<Vec<Alt>, GrammarError> {
        Ok(match rule {
            Rule::Symbol(name) => {
                let symbol = self
                    .by_name
                    .get(name)
                    .copied()
                    .ok_or_else(|| GrammarError::UndefinedSymbol(name.clone()))?;
                vec![Alt {
                    items: vec![(symbol, None)],
                    prec: None,
                }]
            }
            Rule::Literal(text) => {
                let symbol = self
                    .literals
                    .get(text)
                    .copied()
                    .ok_or_else(|| GrammarError::UndefinedSymbol(text.clone()))?;
                vec![Alt {
                    items: vec![(symbol, None)],
                    prec: None,
                }]
            }
            Rule::Field { name, rule } => {
                self.field_names.insert(name.clone());
                let mut alts = self.expand(owner, rule)?;
                for alt in &mut alts {
                    for (_, field) in &mut alt.items {
                        field.get_or_insert_with(|| name.clone());
                    }
                }
                alts
            }
            Rule::Seq(parts) => {
                let mut result = vec![Alt::default()];
                for part in parts {
                    let tails = self.expand(owner, part)?;
                    let mut next = Vec::with_capacity(result.len() * tails.len());
                    for head in &result {
                        for tail in &tails {
                            let mut items = head.items.clone();
                            items.extend(tail.items.iter().cloned());
                            next.push(Alt {
                                items,
                                prec: head.prec.or(tail.prec),
                            });
                        }
                    }
                    result = next;
                }
                result
            }
            Rule::Choice(options) => {
                let mut result = Vec::new();
                for option in options {
                    result.extend(self.expand(owner, option)?);
                }
                result
            }
            Rule::Optional(inner) => {
                let mut result = vec![Alt::default()];
                result.extend(self.expand(owner, inner)?);
                result
            }
            Rule::Repeat1(inner) => {
                let helper = self.repeat_helper(owner, inner)?;
                vec![Alt {
                    items: vec![(helper, None)],
                    prec: None,
                }]
            }
            Rule::Repeat(inner) => {
                let helper = self.repeat_helper(owner, inner)?;
                vec![
                    Alt::default(),
                    Alt {
                        items: vec![(helper, None)],
                        prec: None,
                    },
                ]
            }
            Rule::Prec { level, assoc, rule } => {
                let mut alts = self.expand(owner, rule)?;
                for alt in &mut alts {
                    alt.prec = Some((*level, *assoc));
                }
                alts
            }
        })
    }

    /// Hidden left-recursive helper `owner_repeatN -> owner_repeatN item | item`.
    fn repeat_helper(&mut self, owner: &CompactString, inner: &Rule) -> Result<Symbol, GrammarError> {
        let alts = self.expand(owner, inner)?;
        let count = self.repeat_counts.entry(owner.clone()).or_insert(0);
        *count += 1;
        let name = format_compact!("{owner}_repeat{count}");
        let helper = next_symbol(&self.symbols)?;
        self.symbols.push(SymbolInfo {
            name,
            named: false,
            visible: false,
        });
        for alt in &alts {
            self.productions.push(Draft::from_alt(helper, alt.clone()));
        }
        for alt in alts {
            let mut items = Vec::with_capacity(alt.items.len() + 1);
            items.push((helper, None));
            items.extend(alt.items);
            self.productions.push(Draft::from_alt(
                helper,
                Alt {
                    items,
                    prec: alt.prec,
                },
            ));
        }
        Ok(helper)
    }
}

/// Item cores mapped to their lookahead sets.
type ItemSet = BTreeMap<(usize, usize), SymbolSet>;

struct BuiltState {
    closure: ItemSet,
    transitions: BTreeMap<Symbol, usize>,
}

struct Automaton {
    states: Vec<BuiltState>,
    terminal_count: usize,
}

struct Tables {
    states: Vec<StateInfo>,
    lex_states: Vec<Vec<Symbol>>,
    external_lex_states: Vec<Vec<Symbol>>,
    conflicts: usize,
}

struct FirstSets {
    first: Vec<SymbolSet>,
    nullable: Vec<bool>,
    terminal_count: usize,
}

impl FirstSets {
    fn compute(productions: &[Draft], symbol_count: usize, terminal_count: usize) -> Self {
        let mut first = vec![SymbolSet::with_capacity(terminal_count); symbol_count];
        for (index, set) in first.iter_mut().enumerate().take(terminal_count) {
            if let Ok(id) = u16::try_from(index) {
                set.insert(Symbol::new(id));
            }
        }
        let mut nullable = vec![false; symbol_count];
        let mut changed = true;
        while changed {
            changed = false;
            for production in productions {
                let lhs = production.lhs.index();
                if lhs >= symbol_count {
                    continue;
                }
                let mut all_nullable = true;
                for symbol in &production.rhs {
                    let addition = first[symbol.index()].clone();
                    changed |= first[lhs].union_with(&addition);
                    if !nullable[symbol.index()] {
                        all_nullable = false;
                        break;
                    }
                }
                if all_nullable && !nullable[lhs] {
                    nullable[lhs] = true;
                    changed = true;
                }
            }
        }
        Self {
            first,
            nullable,
            terminal_count,
        }
    }

    /// FIRST of `rhs[start..]` followed by `lookahead`.
    fn of_suffix(&self, rhs: &[Symbol], start: usize, lookahead: &SymbolSet) -> SymbolSet {
        let mut result = SymbolSet::with_capacity(self.terminal_count);
        for symbol in rhs.iter().skip(start) {
            result.union_with(&self.first[symbol.index()]);
            if !self.nullable[symbol.index()] {
                return result;
            }
        }
        result.union_with(lookahead);
        result
    }
}

impl Automaton {
    fn build(
        productions: &[Draft],
        symbol_count: usize,
        terminal_count: usize,
    ) -> Result<Self, GrammarError> {
        let first = FirstSets::compute(productions, symbol_count, terminal_count);
        let mut by_lhs: Vec<Vec<usize>> = vec![Vec::new(); symbol_count];
        for (index, production) in productions.iter().enumerate().skip(1) {
            by_lhs[production.lhs.index()].push(index);
        }

        let mut initial = ItemSet::new();
        let mut end = SymbolSet::with_capacity(terminal_count);
        end.insert(Symbol::END);
        initial.insert((0, 0), end);

        let mut kernels = vec![initial.clone()];
        let mut index: HashMap<ItemSet, usize, ahash::RandomState> = HashMap::default();
        index.insert(initial, 0);
        let mut states = Vec::new();

        let mut current = 0;
        while current < kernels.len() {
            let closure = Self::closure(&kernels[current], productions, &by_lhs, &first);
            let mut advanced: BTreeMap<Symbol, ItemSet> = BTreeMap::new();
            for (&(production, dot), lookahead) in &closure {
                if let Some(&symbol) = productions[production].rhs.get(dot) {
                    advanced
                        .entry(symbol)
                        .or_default()
                        .entry((production, dot + 1))
                        .or_insert_with(|| SymbolSet::with_capacity(terminal_count))
                        .union_with(lookahead);
                }
            }
            let mut transitions = BTreeMap::new();
            for (symbol, kernel) in advanced {
                let target = match index.get(&kernel) {
                    Some(&target) => target,
                    None => {
                        let target = kernels.len();
                        if target >= usize::from(u16::MAX) {
                            return Err(GrammarError::TooManyStates(target + 1));
                        }
                        index.insert(kernel.clone(), target);
                        kernels.push(kernel);
                        target
                    }
                };
                transitions.insert(symbol, target);
            }
            states.push(BuiltState {
                closure,
                transitions,
            });
            current += 1;
        }

        Ok(Self {
            states,
            terminal_count,
        })
    }

    fn closure(
        kernel: &ItemSet,
        productions: &[Draft],
        by_lhs: &[Vec<usize>],
        first: &FirstSets,
    ) -> ItemSet {
        let mut items = kernel.clone();
        let mut pending: Vec<(usize, usize)> = items.keys().copied().collect();
        while let Some((production, dot)) = pending.pop() {
            let rhs = &productions[production].rhs;
            let Some(&next) = rhs.get(dot) else {
                continue;
            };
            if next.index() < first.terminal_count {
                continue;
            }
            let Some(parent) = items.get(&(production, dot)) else {
                continue;
            };
            let lookahead = first.of_suffix(rhs, dot + 1, parent);
            for &candidate in &by_lhs[next.index()] {
                match items.entry((candidate, 0)) {
                    btree_map::Entry::Vacant(entry) => {
                        entry.insert(lookahead.clone());
                        pending.push((candidate, 0));
                    }
                    btree_map::Entry::Occupied(mut entry) => {
                        if entry.get_mut().union_with(&lookahead) {
                            pending.push((candidate, 0));
                        }
                    }
                }
            }
        }
        items
    }

    fn tables(&self, productions: &[Draft], extras: &[Symbol], external_tokens: &[Symbol]) -> Tables {
        let mut lex_state_ids: HashMap<Vec<Symbol>, u16, ahash::RandomState> = HashMap::default();
        let mut lex_states = Vec::new();
        let mut external_state_ids: HashMap<Vec<Symbol>, u16, ahash::RandomState> =
            HashMap::default();
        let mut external_lex_states = vec![Vec::new()];
        external_state_ids.insert(Vec::new(), 0);
        let mut conflicts = 0;

        let states = self
            .states
            .iter()
            .map(|state| {
                let (actions, conflict_count) = self.state_actions(state, productions, extras);
                conflicts += conflict_count;

                let mut internal = Vec::new();
                let mut external = Vec::new();
                for (symbol, _) in &actions {
                    if *symbol == Symbol::END {
                        continue;
                    }
                    if external_tokens.contains(symbol) {
                        external.push(*symbol);
                    } else {
                        internal.push(*symbol);
                    }
                }
                let lex_state = *lex_state_ids.entry(internal.clone()).or_insert_with(|| {
                    lex_states.push(internal);
                    u16::try_from(lex_states.len() - 1).unwrap_or(u16::MAX)
                });
                let external_lex_state =
                    *external_state_ids.entry(external.clone()).or_insert_with(|| {
                        external_lex_states.push(external);
                        u16::try_from(external_lex_states.len() - 1).unwrap_or(u16::MAX)
                    });

                let gotos = state
                    .transitions
                    .iter()
                    .filter(|(symbol, _)| symbol.index() >= self.terminal_count)
                    .filter_map(|(symbol, target)| Some((*symbol, StateId::try_from(*target).ok()?)))
                    .collect();

                StateInfo {
                    actions,
                    gotos,
                    lex_mode: LexMode {
                        lex_state,
                        external_lex_state,
                    },
                }
            })
            .collect();

        Tables {
            states,
            lex_states,
            external_lex_states,
            conflicts,
        }
    }

    /// Actions of one state after conflict resolution, in symbol order.
    fn state_actions(
        &self,
        state: &BuiltState,
        productions: &[Draft],
        extras: &[Symbol],
    ) -> (Vec<(Symbol, Vec<ParseAction>)>, usize) {
        let mut reduces: BTreeMap<Symbol, Vec<usize>> = BTreeMap::new();
        let mut shift_prec: BTreeMap<Symbol, i32> = BTreeMap::new();
        for (&(production, dot), lookahead) in &state.closure {
            let draft = &productions[production];
            match draft.rhs.get(dot) {
                None => {
                    for symbol in lookahead.iter() {
                        reduces.entry(symbol).or_default().push(production);
                    }
                }
                Some(&next) if next.index() < self.terminal_count => {
                    if let Some((level, _)) = draft.prec {
                        let entry = shift_prec.entry(next).or_insert(level);
                        *entry = (*entry).max(level);
                    }
                }
                Some(_) => {}
            }
        }

        let mut symbols: BTreeSet<Symbol> = reduces.keys().copied().collect();
        symbols.extend(
            state
                .transitions
                .keys()
                .filter(|symbol| symbol.index() < self.terminal_count),
        );

        let mut conflicts = 0;
        let mut actions = Vec::new();
        for symbol in symbols {
            let shift = state
                .transitions
                .get(&symbol)
                .and_then(|target| StateId::try_from(*target).ok());
            let candidates = reduces.remove(&symbol).unwrap_or_default();
            let list = resolve(
                shift,
                shift_prec.get(&symbol).copied(),
                candidates,
                productions,
            );
            if list.len() > 1 {
                conflicts += 1;
                tracing::trace!(?symbol, ?list, "conflict kept for GLR");
            }
            actions.push((symbol, list));
        }
        for &extra in extras {
            if !actions.iter().any(|(symbol, _)| *symbol == extra) {
                actions.push((extra, vec![ParseAction::ShiftExtra]));
            }
        }
        actions.sort_by_key(|(symbol, _)| *symbol);
        (actions, conflicts)
    }
}

/// Apply precedence and associativity to the candidate actions of one
/// lookahead. The result lists the shift first, then accept, then reductions
/// by production id.
fn resolve(
    shift: Option<StateId>,
    shift_prec: Option<i32>,
    mut reduces: Vec<usize>,
    productions: &[Draft],
) -> Vec<ParseAction> {
    reduces.sort_unstable();
    reduces.dedup();
    let mut keep_shift = shift.is_some();
    if shift.is_some() {
        reduces.retain(|&production| {
            let reduce_prec = productions[production].prec;
            if shift_prec.is_none() && reduce_prec.is_none() {
                return true;
            }
            let (level, assoc) = reduce_prec.unwrap_or((0, Associativity::None));
            match level.cmp(&shift_prec.unwrap_or(0)) {
                Ordering::Greater => {
                    keep_shift = false;
                    true
                }
                Ordering::Less => false,
                Ordering::Equal => match assoc {
                    Associativity::Left => {
                        keep_shift = false;
                        true
                    }
                    Associativity::Right => false,
                    Associativity::None => true,
                },
            }
        });
    }
    if reduces.len() > 1 && reduces.iter().any(|&p| productions[p].prec.is_some()) {
        let level_of = |p: usize| productions[p].prec.map_or(0, |(level, _)| level);
        let best = reduces.iter().map(|&p| level_of(p)).max().unwrap_or(0);
        reduces.retain(|&p| level_of(p) == best);
    }

    let mut actions = Vec::with_capacity(reduces.len() + 1);
    if let Some(state) = shift
        && keep_shift
    {
        actions.push(ParseAction::Shift { state });
    }
    for production in reduces {
        if production == 0 {
            actions.push(ParseAction::Accept);
        } else if let Ok(production) = u16::try_from(production - 1) {
            actions.push(ParseAction::Reduce { production });
        }
    }
    actions.sort_by_key(|action| match action {
        ParseAction::Shift { .. } | ParseAction::ShiftExtra => 0,
        ParseAction::Accept => 1,
        ParseAction::Reduce { .. } => 2,
    });
    actions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::CharSet;

    fn expressions(assoc: Option<Associativity>) -> LanguageBuilder {
        let binary = Rule::seq([Rule::sym("expression"), Rule::lit("+"), Rule::sym("expression")]);
        let binary = match assoc {
            Some(Associativity::Left) => Rule::prec_left(1, binary),
            Some(Associativity::Right) => Rule::prec_right(1, binary),
            _ => binary,
        };
        LanguageBuilder::new("expressions")
            .token("number", Pattern::repeat1(Pattern::chars(CharSet::digits())))
            .rule("program", Rule::sym("expression"))
            .rule("expression", Rule::choice([binary, Rule::sym("number")]))
    }

    fn plus_actions(descriptor: &LanguageDescriptor) -> Vec<Vec<ParseAction>> {
        let plus = descriptor.symbol_named("+").unwrap();
        descriptor
            .states
            .iter()
            .flat_map(|state| {
                state
                    .actions
                    .iter()
                    .filter(|(symbol, _)| *symbol == plus)
                    .map(|(_, actions)| actions.clone())
            })
            .collect()
    }

    #[test]
    fn test_symbol_layout() {
        let descriptor = LanguageBuilder::new("layout")
            .token("identifier", Pattern::identifier())
            .extra("_space", Pattern::repeat1(Pattern::chars(CharSet::whitespace())))
            .external("label")
            .rule("list", Rule::repeat(Rule::seq([Rule::sym("identifier"), Rule::lit(",")])))
            .build()
            .unwrap();
        let names: Vec<&str> = descriptor.symbols.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["end", "identifier", "_space", ",", "label", "list", "list_repeat1"]
        );
        assert_eq!(descriptor.terminal_count, 5);
        assert_eq!(descriptor.external_tokens, vec![Symbol::new(4)]);
        assert_eq!(descriptor.extras, vec![Symbol::new(2)]);
        assert_eq!(descriptor.start_symbol, Symbol::new(5));
        assert!(!descriptor.symbols[6].named && !descriptor.symbols[6].visible);
        assert!(descriptor.symbols[2].named && !descriptor.symbols[2].visible);
        assert!(!descriptor.symbols[3].named && descriptor.symbols[3].visible);
    }

    #[test]
    fn test_fields_sorted_by_name() {
        let descriptor = LanguageBuilder::new("fields")
            .token("identifier", Pattern::identifier())
            .rule(
                "pair",
                Rule::seq([
                    Rule::field("value", Rule::sym("identifier")),
                    Rule::lit("="),
                    Rule::field("key", Rule::sym("identifier")),
                ]),
            )
            .build()
            .unwrap();
        assert_eq!(descriptor.fields, vec!["key", "value"]);
        let production = &descriptor.productions[0];
        assert_eq!(production.child_count, 3);
        assert_eq!(
            production.fields,
            vec![(0, FieldId::new(2).unwrap()), (2, FieldId::new(1).unwrap())]
        );
    }

    #[test]
    fn test_unresolved_conflict_lists_shift_first() {
        let descriptor = expressions(None).build().unwrap();
        let conflicted: Vec<_> = plus_actions(&descriptor)
            .into_iter()
            .filter(|actions| actions.len() > 1)
            .collect();
        assert!(!conflicted.is_empty());
        for actions in conflicted {
            assert!(matches!(actions[0], ParseAction::Shift { .. }));
            assert!(matches!(actions[1], ParseAction::Reduce { .. }));
        }
    }

    #[test]
    fn test_associativity_resolves_conflict() {
        for assoc in [Associativity::Left, Associativity::Right] {
            let descriptor = expressions(Some(assoc)).build().unwrap();
            let binary = descriptor
                .productions
                .iter()
                .position(|production| production.child_count == 3)
                .and_then(|index| u16::try_from(index).ok())
                .unwrap();
            let actions = plus_actions(&descriptor);
            assert!(actions.iter().all(|list| list.len() == 1));
            let reduces_binary = actions
                .iter()
                .any(|list| list[0] == ParseAction::Reduce { production: binary });
            assert_eq!(reduces_binary, assoc == Associativity::Left);
        }
    }

    #[test]
    fn test_extras_shift_everywhere() {
        let descriptor = expressions(None)
            .extra("_space", Pattern::repeat1(Pattern::literal(" ")))
            .build()
            .unwrap();
        let space = descriptor.symbol_named("_space").unwrap();
        for state in &descriptor.states {
            let entry = state.actions.iter().find(|(symbol, _)| *symbol == space);
            assert_eq!(entry.map(|(_, a)| a.as_slice()), Some(&[ParseAction::ShiftExtra][..]));
        }
    }

    #[test]
    fn test_accept_on_end() {
        let descriptor = expressions(None).build().unwrap();
        let accepts = descriptor
            .states
            .iter()
            .filter(|state| {
                state.actions.iter().any(|(symbol, actions)| {
                    *symbol == Symbol::END && actions.contains(&ParseAction::Accept)
                })
            })
            .count();
        assert_eq!(accepts, 1);
    }

    #[test]
    fn test_grammar_errors() {
        assert!(matches!(
            LanguageBuilder::new("empty").build(),
            Err(GrammarError::NoRules)
        ));
        assert!(matches!(
            LanguageBuilder::new("undefined")
                .rule("a", Rule::sym("b"))
                .build(),
            Err(GrammarError::UndefinedSymbol(name)) if name == "b"
        ));
        assert!(matches!(
            LanguageBuilder::new("duplicate")
                .token("a", Pattern::literal("a"))
                .rule("a", Rule::sym("a"))
                .build(),
            Err(GrammarError::DuplicateSymbol(name)) if name == "a"
        ));
        assert!(matches!(
            LanguageBuilder::new("word")
                .token("a", Pattern::literal("a"))
                .word("rule")
                .rule("rule", Rule::sym("a"))
                .build(),
            Err(GrammarError::InvalidWordToken(name)) if name == "rule"
        ));
    }

    #[test]
    fn test_nullable_start_rule() {
        let descriptor = LanguageBuilder::new("nullable")
            .token("identifier", Pattern::identifier())
            .rule("file", Rule::repeat(Rule::sym("identifier")))
            .build()
            .unwrap();
        let on_end = descriptor.states[0]
            .actions
            .iter()
            .find(|(symbol, _)| *symbol == Symbol::END)
            .map(|(_, actions)| actions.clone())
            .unwrap();
        let [ParseAction::Reduce { production }] = on_end.as_slice() else {
            panic!("expected a single reduction, got {on_end:?}");
        };
        let production = &descriptor.productions[usize::from(*production)];
        assert_eq!(production.lhs, descriptor.start_symbol);
        assert_eq!(production.child_count, 0);
    }
}
