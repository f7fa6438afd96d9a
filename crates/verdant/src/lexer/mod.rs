//! # Lexer Module
//!
//! On-demand tokenization driven by the parser.
//!
//! ## Overview
//!
//! The parser asks for one token at a time, passing the lex mode of the
//! state it is in. Only tokens valid in that mode are tried, so the same
//! bytes can lex differently for different parse heads:
//!
//! - **Maximal munch**: the longest match wins; on a tie a literal beats a
//!   pattern and then the lower symbol id wins
//! - **Keywords**: when the language has a word token, keywords are found by
//!   matching the word token and looking its text up, so `fnord` never lexes
//!   as `fn` followed by `ord`
//! - **External scanner**: consulted first whenever external tokens are valid
//! - **Error mode**: when nothing valid matches, every token is tried; when
//!   even that fails a one-character `ERROR` token is produced
//!
//! Every token records how far past its end the lexer looked, which decides
//! whether an edit invalidates it.

mod cache;
mod external;
mod input;
mod pattern;

pub use cache::TokenCacheStats;
pub use external::{ExternalScanner, ScanCursor, ScannerFactory};
pub use input::{InputSource, SourceBuffer};
pub use pattern::{CharSet, Pattern};

use crate::error::LexError;
use crate::language::{Language, LexMode, Symbol, SymbolSet};
use crate::syntax::Length;
use cache::TokenCache;
use std::sync::Arc;

/// One token produced for a parse head.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexedToken {
    pub symbol: Symbol,
    pub start: Length,
    pub size: Length,
    /// Bytes examined past the end of the token, at least one.
    pub lookahead_bytes: u32,
    /// Scanner state after this token, for external tokens.
    pub external_state: Option<Arc<[u8]>>,
}

impl LexedToken {
    #[must_use]
    pub fn end(&self) -> Length {
        self.start + self.size
    }

    #[must_use]
    pub const fn is_end(&self) -> bool {
        self.symbol.id() == Symbol::END.id()
    }
}

#[derive(Clone, Copy)]
struct Candidate {
    symbol: Symbol,
    end: u32,
    literal: bool,
}

impl Candidate {
    fn beats(self, other: Option<Self>) -> bool {
        let Some(other) = other else {
            return true;
        };
        (self.end, self.literal, std::cmp::Reverse(self.symbol))
            > (other.end, other.literal, std::cmp::Reverse(other.symbol))
    }
}

/// Tokenizer for one parse.
pub(crate) struct Lexer<'a> {
    language: Language,
    source: SourceBuffer<'a>,
    scanner: Option<Box<dyn ExternalScanner>>,
    cache: TokenCache,
    state_buf: Vec<u8>,
    tokens_lexed: usize,
}

impl<'a> Lexer<'a> {
    pub(crate) fn new(language: Language, source: SourceBuffer<'a>, cache_capacity: usize) -> Self {
        let scanner = language.scanner_factory().map(|factory| factory());
        Self {
            language,
            source,
            scanner,
            cache: TokenCache::new(cache_capacity),
            state_buf: Vec::new(),
            tokens_lexed: 0,
        }
    }

    pub(crate) const fn tokens_lexed(&self) -> usize {
        self.tokens_lexed
    }

    pub(crate) const fn cache_stats(&self) -> TokenCacheStats {
        self.cache.stats()
    }

    /// Lex the token at `position` for a head in `mode` whose scanner state
    /// is `external_state`.
    pub(crate) fn next_token(
        &mut self,
        position: Length,
        mode: LexMode,
        external_state: Option<&Arc<[u8]>>,
    ) -> LexedToken {
        if self.source.is_eof(position.bytes) {
            return LexedToken {
                symbol: Symbol::END,
                start: position,
                size: Length::zero(),
                lookahead_bytes: 1,
                external_state: None,
            };
        }
        if let Some(token) = self.cache.get(position.bytes, mode, external_state) {
            return token;
        }
        self.tokens_lexed += 1;

        let token = match self.lex_in_mode(position, mode, external_state) {
            Ok(token) => token,
            Err(_) if !mode.is_error() => self
                .lex_in_mode(position, LexMode::ERROR, external_state)
                .unwrap_or_else(|error| self.error_token(position, &error)),
            Err(error) => self.error_token(position, &error),
        };
        tracing::trace!(
            symbol = %token.symbol,
            start = token.start.bytes,
            len = token.size.bytes,
            "lexed token"
        );
        self.cache
            .insert(position.bytes, mode, external_state, token.clone());
        token
    }

    fn lex_in_mode(
        &mut self,
        position: Length,
        mode: LexMode,
        external_state: Option<&Arc<[u8]>>,
    ) -> Result<LexedToken, LexError> {
        let language = self.language.clone();
        let table = language.parse_table();
        let mut examined = position.bytes;

        let valid_external = table.valid_external_tokens(mode);
        if !valid_external.is_empty()
            && let Some((symbol, end, state)) =
                self.scan_external(position, valid_external, external_state, &mut examined)
        {
            return Ok(self.token(position, symbol, end, examined, Some(state)));
        }

        let valid = table.valid_tokens(mode);
        match self.lex_internal(&language, position.bytes, valid, &mut examined) {
            Some(candidate) => Ok(self.token(position, candidate.symbol, candidate.end, examined, None)),
            None => Err(LexError {
                position: position.bytes,
            }),
        }
    }

    fn scan_external(
        &mut self,
        position: Length,
        valid: &SymbolSet,
        state: Option<&Arc<[u8]>>,
        examined: &mut u32,
    ) -> Option<(Symbol, u32, Arc<[u8]>)> {
        let scanner = self.scanner.as_mut()?;
        scanner.deserialize(state.map_or(&[][..], |state| state));
        let mut cursor = ScanCursor::new(&mut self.source, position);
        let symbol = scanner.scan(&mut cursor, valid);
        let end = cursor.token_end();
        *examined = (*examined).max(cursor.examined());
        let symbol = symbol.filter(|symbol| valid.contains(*symbol) && end > position.bytes)?;
        self.state_buf.clear();
        scanner.serialize(&mut self.state_buf);
        Some((symbol, end, Arc::from(self.state_buf.as_slice())))
    }

    fn lex_internal(
        &mut self,
        language: &Language,
        start: u32,
        valid: &SymbolSet,
        examined: &mut u32,
    ) -> Option<Candidate> {
        let word = language.word_token();
        let mut best: Option<Candidate> = None;
        let mut word_rule = None;
        for rule in language.token_rules() {
            if Some(rule.symbol) == word {
                word_rule = Some(rule);
                continue;
            }
            if !valid.contains(rule.symbol) || (word.is_some() && language.is_keyword(rule.symbol)) {
                continue;
            }
            if let Some(end) = rule.pattern.longest_match(&mut self.source, start, examined) {
                let candidate = Candidate {
                    symbol: rule.symbol,
                    end,
                    literal: rule.pattern.literal_text().is_some(),
                };
                if candidate.beats(best) {
                    best = Some(candidate);
                }
            }
        }

        if let (Some(word), Some(rule)) = (word, word_rule) {
            let word_valid = valid.contains(word);
            let keyword_valid = valid.iter().any(|symbol| language.is_keyword(symbol));
            if (word_valid || keyword_valid)
                && let Some(end) = rule.pattern.longest_match(&mut self.source, start, examined)
            {
                let keyword = language.keyword_for(self.source.slice(start, end));
                let candidate = match keyword {
                    Some(keyword) if valid.contains(keyword) => Some(Candidate {
                        symbol: keyword,
                        end,
                        literal: true,
                    }),
                    _ if word_valid => Some(Candidate {
                        symbol: word,
                        end,
                        literal: false,
                    }),
                    _ => None,
                };
                if let Some(candidate) = candidate
                    && candidate.beats(best)
                {
                    best = Some(candidate);
                }
            }
        }
        best
    }

    fn token(
        &mut self,
        position: Length,
        symbol: Symbol,
        end: u32,
        examined: u32,
        external_state: Option<Arc<[u8]>>,
    ) -> LexedToken {
        let size = Length::of(self.source.slice(position.bytes, end));
        LexedToken {
            symbol,
            start: position,
            size,
            lookahead_bytes: examined.saturating_sub(end).max(1),
            external_state,
        }
    }

    fn error_token(&mut self, position: Length, error: &LexError) -> LexedToken {
        tracing::debug!(%error, "emitting single-character error token");
        let width = self.source.char_at(position.bytes).map_or(1, |(_, width)| width);
        self.token(position, Symbol::ERROR, position.bytes + width, position.bytes + width, None)
    }
}
