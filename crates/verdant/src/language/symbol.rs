#[cfg(feature = "serialize")]
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;
use std::num::NonZeroU16;

/// Index of a parse state in the table.
pub type StateId = u16;

/// A terminal or non-terminal grammar category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serialize", serde(transparent))]
pub struct Symbol(u16);

impl Symbol {
    /// End of input. Always symbol 0.
    pub const END: Self = Self(0);
    /// Built-in error category.
    pub const ERROR: Self = Self(u16::MAX);

    #[inline]
    #[must_use]
    pub const fn new(id: u16) -> Self {
        Self(id)
    }

    #[inline]
    #[must_use]
    pub const fn id(self) -> u16 {
        self.0
    }

    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    #[inline]
    #[must_use]
    pub const fn is_error(self) -> bool {
        self.0 == u16::MAX
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_error() {
            f.write_str("ERROR")
        } else {
            write!(f, "#{}", self.0)
        }
    }
}

/// How a symbol surfaces in trees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolType {
    /// Named and visible.
    Regular,
    /// Visible literal token such as `"+"`.
    Anonymous,
    /// Named but skipped by the cursor, such as `_expression`.
    Hidden,
    /// Generated helper such as a repetition; never surfaces.
    Auxiliary,
}

impl SymbolType {
    #[must_use]
    pub const fn from_flags(named: bool, visible: bool) -> Self {
        match (named, visible) {
            (true, true) => Self::Regular,
            (false, true) => Self::Anonymous,
            (true, false) => Self::Hidden,
            (false, false) => Self::Auxiliary,
        }
    }
}

/// Role of a child within its parent. Ids start at 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct FieldId(NonZeroU16);

impl FieldId {
    #[must_use]
    pub const fn new(id: u16) -> Option<Self> {
        match NonZeroU16::new(id) {
            Some(id) => Some(Self(id)),
            None => None,
        }
    }

    #[inline]
    #[must_use]
    pub const fn get(self) -> u16 {
        self.0.get()
    }
}

const WORD_BITS: usize = 64;

/// Fixed-capacity bitset over terminal symbols.
#[derive(Debug, Clone, Default)]
pub struct SymbolSet {
    words: SmallVec<[u64; 4]>,
}

impl SymbolSet {
    /// Words up to the last non-zero one; equality and hashing ignore capacity.
    fn significant(&self) -> &[u64] {
        let len = self
            .words
            .iter()
            .rposition(|word| *word != 0)
            .map_or(0, |last| last + 1);
        &self.words[..len]
    }
}

impl PartialEq for SymbolSet {
    fn eq(&self, other: &Self) -> bool {
        self.significant() == other.significant()
    }
}

impl Eq for SymbolSet {}

impl std::hash::Hash for SymbolSet {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.significant().hash(state);
    }
}

impl SymbolSet {
    /// Empty set able to hold symbols `0..capacity`.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            words: smallvec::smallvec![0; capacity.div_ceil(WORD_BITS)],
        }
    }

    /// Set holding every symbol in `0..capacity`.
    #[must_use]
    pub fn full(capacity: usize) -> Self {
        let mut set = Self::with_capacity(capacity);
        for id in 0..capacity {
            set.insert_index(id);
        }
        set
    }

    fn insert_index(&mut self, index: usize) -> bool {
        let (word, bit) = (index / WORD_BITS, index % WORD_BITS);
        if word >= self.words.len() {
            self.words.resize(word + 1, 0);
        }
        let mask = 1u64 << bit;
        let fresh = self.words[word] & mask == 0;
        self.words[word] |= mask;
        fresh
    }

    /// Insert `symbol`; returns whether it was absent.
    pub fn insert(&mut self, symbol: Symbol) -> bool {
        self.insert_index(symbol.index())
    }

    #[must_use]
    pub fn contains(&self, symbol: Symbol) -> bool {
        let index = symbol.index();
        self.words
            .get(index / WORD_BITS)
            .is_some_and(|word| word & (1u64 << (index % WORD_BITS)) != 0)
    }

    /// Add every member of `other`; returns whether anything was added.
    pub fn union_with(&mut self, other: &Self) -> bool {
        if other.words.len() > self.words.len() {
            self.words.resize(other.words.len(), 0);
        }
        let mut changed = false;
        for (word, theirs) in self.words.iter_mut().zip(&other.words) {
            let merged = *word | theirs;
            changed |= merged != *word;
            *word = merged;
        }
        changed
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|word| *word == 0)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.words.iter().map(|word| word.count_ones() as usize).sum()
    }

    /// Members in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = Symbol> + '_ {
        self.words.iter().enumerate().flat_map(|(index, &word)| {
            let mut bits = word;
            std::iter::from_fn(move || {
                if bits == 0 {
                    return None;
                }
                let bit = bits.trailing_zeros() as usize;
                bits &= bits - 1;
                u16::try_from(index * WORD_BITS + bit).ok().map(Symbol::new)
            })
        })
    }
}

impl FromIterator<Symbol> for SymbolSet {
    fn from_iter<I: IntoIterator<Item = Symbol>>(iter: I) -> Self {
        let mut set = Self::default();
        for symbol in iter {
            set.insert(symbol);
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbol_constants() {
        assert_eq!(Symbol::END.id(), 0);
        assert!(Symbol::ERROR.is_error());
        assert_eq!(Symbol::ERROR.to_string(), "ERROR");
        assert_eq!(Symbol::new(7).to_string(), "#7");
    }

    #[test]
    fn test_symbol_type_from_flags() {
        assert_eq!(SymbolType::from_flags(true, true), SymbolType::Regular);
        assert_eq!(SymbolType::from_flags(false, true), SymbolType::Anonymous);
        assert_eq!(SymbolType::from_flags(true, false), SymbolType::Hidden);
        assert_eq!(SymbolType::from_flags(false, false), SymbolType::Auxiliary);
    }

    #[test]
    fn test_field_id_is_non_zero() {
        assert!(FieldId::new(0).is_none());
        assert_eq!(FieldId::new(3).map(FieldId::get), Some(3));
    }

    #[test]
    fn test_symbol_set_operations() {
        let mut set = SymbolSet::with_capacity(130);
        assert!(set.is_empty());
        assert!(set.insert(Symbol::new(3)));
        assert!(!set.insert(Symbol::new(3)));
        set.insert(Symbol::new(129));
        set.insert(Symbol::new(64));

        assert!(set.contains(Symbol::new(64)));
        assert!(!set.contains(Symbol::new(65)));
        assert!(!set.contains(Symbol::new(1000)));
        assert_eq!(set.len(), 3);
        assert_eq!(
            set.iter().map(Symbol::id).collect::<Vec<_>>(),
            vec![3, 64, 129]
        );

        let other: SymbolSet = [Symbol::new(1), Symbol::new(3)].into_iter().collect();
        assert!(set.union_with(&other));
        assert!(!set.union_with(&other));
        assert_eq!(set.len(), 4);
    }

    #[test]
    fn test_equality_ignores_capacity() {
        let mut small = SymbolSet::default();
        let mut large = SymbolSet::with_capacity(512);
        assert_eq!(small, large);
        small.insert(Symbol::new(2));
        large.insert(Symbol::new(2));
        assert_eq!(small, large);
    }

    #[test]
    fn test_full_set() {
        let set = SymbolSet::full(5);
        assert_eq!(set.len(), 5);
        assert!(set.contains(Symbol::new(4)));
        assert!(!set.contains(Symbol::new(5)));
    }
}
